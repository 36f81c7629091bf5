//! The request-side domain policy table: a closed set of enforcement
//! levels, each knowing which headers to emit on an admitted request.

use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// A single security header rewrite: the header to set and the value to
/// give it.
#[derive(Debug, Clone)]
pub struct HeaderRewrite {
    /// Header name, lowercase.
    pub name: &'static str,
    /// Header value to set (overwriting any existing value).
    pub value: String,
}

/// A custom policy level's rule set: which standard headers to emit and
/// at what strictness, without going through a plugin system.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomPolicy {
    /// `Content-Security-Policy` value. `None` omits the header.
    pub csp: Option<String>,
    /// `Referrer-Policy` value.
    pub referrer_policy: Option<String>,
    /// Whether to mask fingerprinting-prone headers (e.g. strip
    /// `Accept-Language` down to a coarse value). The actual masking
    /// policy lives outside this crate; this only toggles the header
    /// rewrite hook.
    pub mask_fingerprint_headers: bool,
}

/// Domain-policy enforcement level. A closed enum rather than an open
/// plugin system, per the policy gateway's fixed-scanner-set design.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "level")]
pub enum DomainPolicyTable {
    /// Baseline protections: CSP `default-src 'self'`, standard
    /// `Referrer-Policy`, no fingerprint masking.
    Standard,
    /// Stricter CSP, `Referrer-Policy: no-referrer`, fingerprint masking
    /// on.
    High,
    /// Tightest built-in level: CSP with no inline/eval, `no-referrer`,
    /// fingerprint masking on, `X-Frame-Options: DENY`.
    Maximum,
    /// A user-supplied rule set.
    Custom(CustomPolicy),
}

impl Default for DomainPolicyTable {
    fn default() -> Self {
        Self::Standard
    }
}

impl DomainPolicyTable {
    /// The security headers this level emits on an admitted response.
    #[must_use]
    pub fn header_rewrites(&self) -> Vec<HeaderRewrite> {
        let mut headers = vec![
            HeaderRewrite {
                name: "x-content-type-options",
                value: "nosniff".to_string(),
            },
        ];
        match self {
            Self::Standard => {
                headers.push(csp("default-src 'self'"));
                headers.push(referrer_policy("strict-origin-when-cross-origin"));
                headers.push(frame_options("SAMEORIGIN"));
            }
            Self::High => {
                headers.push(csp("default-src 'self'; object-src 'none'"));
                headers.push(referrer_policy("no-referrer"));
                headers.push(frame_options("SAMEORIGIN"));
            }
            Self::Maximum => {
                headers.push(csp(
                    "default-src 'none'; script-src 'self'; style-src 'self'; object-src 'none'",
                ));
                headers.push(referrer_policy("no-referrer"));
                headers.push(frame_options("DENY"));
            }
            Self::Custom(custom) => {
                if let Some(csp_value) = &custom.csp {
                    headers.push(csp(csp_value));
                }
                if let Some(rp) = &custom.referrer_policy {
                    headers.push(referrer_policy(rp));
                }
            }
        }
        headers
    }

    /// Whether this level masks fingerprinting-prone request headers.
    #[must_use]
    pub fn masks_fingerprint_headers(&self) -> bool {
        match self {
            Self::Standard => false,
            Self::High | Self::Maximum => true,
            Self::Custom(custom) => custom.mask_fingerprint_headers,
        }
    }

    /// Apply [`Self::header_rewrites`] onto `headers`, overwriting any
    /// existing values for the same name.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for rewrite in self.header_rewrites() {
            if let Ok(value) = HeaderValue::from_str(&rewrite.value) {
                headers.insert(rewrite.name, value);
            }
        }
    }
}

fn csp(value: &str) -> HeaderRewrite {
    HeaderRewrite {
        name: "content-security-policy",
        value: value.to_string(),
    }
}

fn referrer_policy(value: &str) -> HeaderRewrite {
    HeaderRewrite {
        name: "referrer-policy",
        value: value.to_string(),
    }
}

fn frame_options(value: &str) -> HeaderRewrite {
    HeaderRewrite {
        name: "x-frame-options",
        value: value.to_string(),
    }
}
