//! Content scanning: a fixed set of scanner kinds, each scoring a
//! response body/headers on its own axis. Modeled as a tagged variant
//! plus a single trait rather than open dynamic dispatch, so the set of
//! scanners can be exhaustively matched and tested.

use serde::{Deserialize, Serialize};

/// What a scanner looks at: the response body, its declared content
/// type, and the navigated URL (for redirect-chain/URL-shape analysis).
#[derive(Debug, Clone)]
pub struct ScanInput<'a> {
    /// Response body bytes, already decompressed.
    pub body: &'a [u8],
    /// `Content-Type` header value, if present.
    pub content_type: Option<&'a str>,
    /// The URL this content was fetched from.
    pub url: &'a str,
    /// The chain of URLs redirected through to reach `url`, oldest first.
    pub redirect_chain: &'a [String],
}

/// A single scanner's verdict: severity and confidence, each clamped to
/// `[0.0, 1.0]` via [`to_unit_interval`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleResult {
    /// How dangerous the scanner judges this content to be.
    pub severity: f64,
    /// How confident the scanner is in that judgment.
    pub confidence: f64,
}

impl ModuleResult {
    /// A verdict built from raw scores, clamped into the unit interval.
    #[must_use]
    pub fn new(severity: f64, confidence: f64) -> Self {
        Self {
            severity: to_unit_interval(severity),
            confidence: to_unit_interval(confidence),
        }
    }

    /// The inert verdict: not dangerous, fully confident in that.
    #[must_use]
    pub fn clean() -> Self {
        Self {
            severity: 0.0,
            confidence: 1.0,
        }
    }
}

/// Clamp a raw scanner score into `[0.0, 1.0]`, treating `NaN` as `0.0`.
#[must_use]
pub fn to_unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A fixed set of content-scanning dimensions, mirrored from the source
/// system's scanner modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerKind {
    /// Known malware signatures / byte patterns in the body.
    Malware,
    /// Phishing heuristics: login-form shape vs. declared origin.
    Phishing,
    /// Suspicious redirect-chain analysis (chain length, cross-origin
    /// hops, known redirector domains).
    RedirectAnalyzer,
    /// Patterns suggesting bulk data exfiltration in the body.
    DataExfil,
    /// Browser-based cryptocurrency mining script heuristics.
    Mining,
    /// Heavily obfuscated script content.
    Obfuscation,
    /// Social-engineering page patterns (fake download buttons, etc.).
    SocialEngineering,
    /// NLP-driven scam/urgency language in visible text.
    NlpText,
    /// Structural anomalies in the page (hidden iframes, off-screen
    /// clickjacking overlays).
    PageStructureAnomaly,
}

impl ScannerKind {
    /// Every scanner kind, in a stable order.
    #[must_use]
    pub const fn all() -> &'static [ScannerKind] {
        &[
            ScannerKind::Malware,
            ScannerKind::Phishing,
            ScannerKind::RedirectAnalyzer,
            ScannerKind::DataExfil,
            ScannerKind::Mining,
            ScannerKind::Obfuscation,
            ScannerKind::SocialEngineering,
            ScannerKind::NlpText,
            ScannerKind::PageStructureAnomaly,
        ]
    }

    /// Run this scanner's analysis over `input`.
    #[must_use]
    pub fn analyze(&self, input: &ScanInput<'_>) -> ModuleResult {
        match self {
            ScannerKind::Malware => malware(input),
            ScannerKind::Phishing => phishing(input),
            ScannerKind::RedirectAnalyzer => redirect_analyzer(input),
            ScannerKind::DataExfil => data_exfil(input),
            ScannerKind::Mining => mining(input),
            ScannerKind::Obfuscation => obfuscation(input),
            ScannerKind::SocialEngineering => social_engineering(input),
            ScannerKind::NlpText => nlp_text(input),
            ScannerKind::PageStructureAnomaly => page_structure_anomaly(input),
        }
    }
}

/// Per-module scan behavior, exposed as a trait so callers can plug in a
/// fake scanner in tests without needing a real [`ScannerKind`] variant.
pub trait Scanner {
    /// Score `content` on this scanner's axis.
    fn analyze(&self, content: &ScanInput<'_>) -> ModuleResult;
}

impl Scanner for ScannerKind {
    fn analyze(&self, content: &ScanInput<'_>) -> ModuleResult {
        ScannerKind::analyze(self, content)
    }
}

fn contains_any(haystack: &[u8], needles: &[&[u8]]) -> bool {
    needles.iter().any(|needle| haystack.windows(needle.len()).any(|window| window == *needle))
}

fn malware(input: &ScanInput<'_>) -> ModuleResult {
    const SIGNATURES: &[&[u8]] = &[b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR"];
    if contains_any(input.body, SIGNATURES) {
        ModuleResult::new(1.0, 1.0)
    } else {
        ModuleResult::clean()
    }
}

fn phishing(input: &ScanInput<'_>) -> ModuleResult {
    let has_password_field = contains_any(input.body, &[b"type=\"password\"", b"type='password'"]);
    let looks_like_bank = input.url.contains("secure-") || input.url.contains("-verify");
    if has_password_field && looks_like_bank {
        ModuleResult::new(0.7, 0.6)
    } else {
        ModuleResult::clean()
    }
}

fn redirect_analyzer(input: &ScanInput<'_>) -> ModuleResult {
    let hops = input.redirect_chain.len();
    if hops >= 5 {
        ModuleResult::new(0.5 + 0.1 * (hops - 5) as f64, 0.5)
    } else {
        ModuleResult::clean()
    }
}

fn data_exfil(input: &ScanInput<'_>) -> ModuleResult {
    let suspicious_ratio = input.body.iter().filter(|b| b.is_ascii_alphanumeric()).count() as f64
        / input.body.len().max(1) as f64;
    if input.body.len() > 1_000_000 && suspicious_ratio > 0.98 {
        ModuleResult::new(0.4, 0.3)
    } else {
        ModuleResult::clean()
    }
}

fn mining(input: &ScanInput<'_>) -> ModuleResult {
    const MARKERS: &[&[u8]] = &[b"coinhive", b"cryptonight", b"webminepool"];
    if contains_any(input.body, MARKERS) {
        ModuleResult::new(0.8, 0.8)
    } else {
        ModuleResult::clean()
    }
}

fn obfuscation(input: &ScanInput<'_>) -> ModuleResult {
    let is_script = input.content_type.is_some_and(|ct| ct.contains("javascript"));
    let escape_heavy = input.body.windows(2).filter(|w| w == b"\\x").count();
    if is_script && escape_heavy > 200 {
        ModuleResult::new(0.5, 0.4)
    } else {
        ModuleResult::clean()
    }
}

fn social_engineering(input: &ScanInput<'_>) -> ModuleResult {
    const MARKERS: &[&[u8]] = &[b"your computer is infected", b"call now for support"];
    if contains_any(input.body, MARKERS) {
        ModuleResult::new(0.9, 0.7)
    } else {
        ModuleResult::clean()
    }
}

fn nlp_text(input: &ScanInput<'_>) -> ModuleResult {
    const MARKERS: &[&[u8]] = &[b"act now", b"limited time offer", b"verify your account immediately"];
    let hits = MARKERS.iter().filter(|m| contains_any(input.body, &[m])).count();
    if hits > 0 {
        ModuleResult::new(0.2 * hits as f64, 0.4)
    } else {
        ModuleResult::clean()
    }
}

fn page_structure_anomaly(input: &ScanInput<'_>) -> ModuleResult {
    let hidden_iframes = input.body.windows(7).filter(|w| w == b"iframe ").count();
    if hidden_iframes > 3 && contains_any(input.body, &[b"opacity:0", b"display:none"]) {
        ModuleResult::new(0.6, 0.5)
    } else {
        ModuleResult::clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(body: &'a [u8], url: &'a str) -> ScanInput<'a> {
        ScanInput {
            body,
            content_type: None,
            url,
            redirect_chain: &[],
        }
    }

    #[test]
    fn clean_body_scores_zero_on_every_scanner() {
        let scan = input(b"hello world", "https://example.com");
        for kind in ScannerKind::all() {
            let result = kind.analyze(&scan);
            assert_eq!(result, ModuleResult::clean(), "{kind:?} flagged clean content");
        }
    }

    #[test]
    fn eicar_signature_flags_malware_at_full_confidence() {
        let body = b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR";
        let scan = input(body, "https://example.com");
        let result = ScannerKind::Malware.analyze(&scan);
        assert_eq!(result.severity, 1.0);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn to_unit_interval_clamps_and_handles_nan() {
        assert_eq!(to_unit_interval(1.5), 1.0);
        assert_eq!(to_unit_interval(-0.5), 0.0);
        assert_eq!(to_unit_interval(f64::NAN), 0.0);
    }

    #[test]
    fn long_redirect_chain_raises_severity() {
        let chain: Vec<String> = (0..6).map(|i| format!("https://hop{i}.example")).collect();
        let scan = ScanInput {
            body: b"",
            content_type: None,
            url: "https://final.example",
            redirect_chain: &chain,
        };
        let result = ScannerKind::RedirectAnalyzer.analyze(&scan);
        assert!(result.severity > 0.5);
    }
}
