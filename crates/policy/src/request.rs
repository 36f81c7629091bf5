//! The request-side half of the policy gateway: admit/block a request
//! and annotate it with the security headers its domain policy level
//! requires.

use std::collections::HashSet;

use http::HeaderMap;
use url::Url;

use crate::aggregate::{aggregate, ScanThresholds};
use crate::domain::DomainPolicyTable;
use crate::scanner::{ScanInput, ScannerKind};

/// What kind of resource is being requested, used only to decide
/// whether maliciousness scanning applies (e.g. a navigation is scanned
/// more aggressively than a subresource fetch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// A top-level document navigation.
    Navigation,
    /// An embedded subresource (script, stylesheet, image, ...).
    Subresource,
    /// A background fetch not tied to a visible navigation.
    Background,
}

/// Inputs to a request-side policy decision.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    /// The request's target URL.
    pub url: &'a str,
    /// The referring page's URL, if any.
    pub referrer: Option<&'a str>,
    /// What kind of resource this request is for.
    pub request_type: RequestType,
    /// The chain of URLs redirected through to reach `url`, oldest
    /// first, for the redirect-analyzer scanner. Empty for a direct
    /// request.
    pub redirect_chain: &'a [String],
}

/// The outcome of a request-side policy evaluation.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Admit the request. `header_rewrites` should be merged into the
    /// outgoing request/response headers.
    Allow { header_rewrites: HeaderMap },
    /// Reject the request outright; it must not reach the network.
    Block {
        /// Human-readable reason, for logging.
        reason: String,
        /// Which rule category matched, reported to the caller as
        /// `block_type`.
        block_type: ScannerKind,
    },
}

/// The request-side policy gateway: whitelist short-circuit, domain
/// policy header emission, and maliciousness-rule blocking.
#[derive(Debug, Clone)]
pub struct PolicyGate {
    level: DomainPolicyTable,
    exception_origins: HashSet<String>,
    thresholds: ScanThresholds,
}

impl PolicyGate {
    /// A gate enforcing `level`, exempting `exception_origins` (exact
    /// host matches) from all scanning and header rewrites.
    #[must_use]
    pub fn new(level: DomainPolicyTable, exception_origins: HashSet<String>) -> Self {
        Self {
            level,
            exception_origins,
            thresholds: ScanThresholds::default(),
        }
    }

    /// Override the default block thresholds used for maliciousness
    /// scanning of the request target.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ScanThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Evaluate `ctx` and decide whether the request is admitted.
    #[must_use]
    pub fn evaluate(&self, ctx: &RequestContext<'_>) -> Decision {
        if let Some(host) = host_of(ctx.url) {
            if self.exception_origins.contains(&host) {
                return Decision::Allow {
                    header_rewrites: HeaderMap::new(),
                };
            }
        }

        let scan = ScanInput {
            body: &[],
            content_type: None,
            url: ctx.url,
            redirect_chain: ctx.redirect_chain,
        };
        let verdict = aggregate(&scan, self.thresholds);
        if verdict.block {
            return Decision::Block {
                reason: format!(
                    "request target matched maliciousness rules (severity {:.2}, confidence {:.2})",
                    verdict.severity, verdict.confidence
                ),
                block_type: verdict.worst_kind,
            };
        }

        let mut header_rewrites = HeaderMap::new();
        self.level.apply(&mut header_rewrites);
        Decision::Allow { header_rewrites }
    }

    /// The enforced domain-policy level.
    #[must_use]
    pub fn level(&self) -> &DomainPolicyTable {
        &self.level
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|parsed| parsed.host_str().map(str::to_string))
}
