//! Response-side policy: certificate-risk handling and content-scan
//! driven sanitization.

use std::time::Duration;

use crate::aggregate::AggregateVerdict;

/// A four-level certificate-validation risk ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CertificateRisk {
    /// No validation issue.
    Low,
    /// A validation issue a user can choose to proceed past.
    Medium,
    /// A serious validation issue; proceeding is gated behind a delay.
    High,
    /// Unrecoverable: the connection must not be shown to the user.
    Critical,
}

/// What to do with a response, derived from either a certificate risk
/// level or a content-scan verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseAction {
    /// Serve the response unmodified.
    PassThrough,
    /// Serve the response with a warning banner injected into
    /// `text/html` bodies.
    PassThroughWithBanner,
    /// Block navigation with an interstitial the user may dismiss to
    /// proceed anyway.
    InterstitialWithProceed,
    /// Block navigation with an interstitial that cannot be proceeded
    /// past until `delay` has elapsed.
    InterstitialTimedDelay(Duration),
    /// Replace the response entirely with a secure error page; no path
    /// to proceed.
    SecureErrorPage,
}

/// Map a certificate-validation risk level to the action the gateway
/// takes on the response.
#[must_use]
pub fn action_for_certificate_risk(risk: CertificateRisk) -> ResponseAction {
    match risk {
        CertificateRisk::Low => ResponseAction::PassThroughWithBanner,
        CertificateRisk::Medium => ResponseAction::InterstitialWithProceed,
        CertificateRisk::High => ResponseAction::InterstitialTimedDelay(Duration::from_secs(10)),
        CertificateRisk::Critical => ResponseAction::SecureErrorPage,
    }
}

/// Map a content-scan verdict to the action the gateway takes on the
/// response body.
#[must_use]
pub fn action_for_scan_verdict(verdict: &AggregateVerdict) -> ResponseAction {
    if verdict.block {
        ResponseAction::SecureErrorPage
    } else if verdict.severity > 0.0 {
        ResponseAction::PassThroughWithBanner
    } else {
        ResponseAction::PassThrough
    }
}
