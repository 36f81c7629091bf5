use thiserror::Error;

/// Errors surfaced by the 0-RTT ticket store.
///
/// Every one of these is meant to be *caught* by the caller and treated
/// as a cache miss (fall back to a full 1-RTT handshake) rather than
/// surfaced to the application. 0-RTT is an optimization, never a
/// correctness requirement.
#[derive(Debug, Error)]
pub enum Error {
    /// The AEAD seal rejected a ticket's ciphertext or authentication tag.
    #[error("ticket decryption failed")]
    DecryptionFailed,
    /// The underlying secret store could not be reached or returned
    /// malformed data.
    #[error("secret store error: {0}")]
    SecretStore(String),
    /// Persisting the ticket store to disk failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),
    /// The on-disk ticket store was corrupt or in an unrecognized format.
    #[error("corrupt ticket store: {0}")]
    Corrupt(String),
    /// The ticket was rejected as a replay (nonce already seen, or
    /// monotonic counter went backwards).
    #[error("replay detected")]
    ReplayDetected,
}
