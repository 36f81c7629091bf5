//! Connection/security policy gateway: request-side admission and
//! header annotation, and response-side certificate-risk and
//! content-scan handling.

mod aggregate;
mod domain;
mod error;
mod request;
mod response;
mod scanner;

pub use aggregate::{aggregate, AggregateVerdict, ScanThresholds};
pub use domain::{CustomPolicy, DomainPolicyTable, HeaderRewrite};
pub use error::Error;
pub use request::{Decision, PolicyGate, RequestContext, RequestType};
pub use response::{action_for_certificate_risk, action_for_scan_verdict, CertificateRisk, ResponseAction};
pub use scanner::{to_unit_interval, ModuleResult, ScanInput, Scanner, ScannerKind};
