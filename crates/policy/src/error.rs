use thiserror::Error;

/// Errors raised while evaluating policy, as distinct from a block
/// decision (which is a normal outcome, not an error).
#[derive(Debug, Error)]
pub enum Error {
    /// A configured exception-origin or whitelist entry was not a valid
    /// URL/host.
    #[error("invalid policy configuration entry: {0}")]
    InvalidConfig(String),
}
