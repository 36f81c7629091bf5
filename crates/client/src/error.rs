use thiserror::Error;

/// The façade's composed error type. Each sub-crate's error type
/// converts in via `#[from]`, the way `salvo_core::Error` composes
/// `hyper::Error`, `ParseError`, and friends rather than flattening
/// everything into one enum.
///
/// A policy block is deliberately *not* a variant here: per the
/// propagation rule, it is a normal outcome ([`crate::Outcome::Blocked`]),
/// not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A framing or structural violation from the codec layer.
    #[error(transparent)]
    Proto(#[from] nyx_proto::Error),
    /// A stream-level state or flow-control violation.
    #[error(transparent)]
    Stream(#[from] nyx_stream::Error),
    /// A connection-level violation (phase, settings, unknown stream).
    #[error(transparent)]
    Connection(#[from] nyx_connection::Error),
    /// A 0-RTT ticket store fault severe enough to not be silently
    /// absorbed as a handshake fallback (e.g. persistence I/O failing
    /// for a caller that explicitly requested durability).
    #[error(transparent)]
    ZeroRtt(#[from] nyx_zero_rtt::Error),
    /// A cache fault that also took down the underlying fetch.
    #[error(transparent)]
    Cache(#[from] nyx_cache::Error),
    /// The connection was closed (by us or the peer) before the request
    /// completed, and is not retriable on this connection.
    #[error("connection closed before the request completed: {0}")]
    ConnectionClosed(String),
    /// The peer sent `GOAWAY` and this request's stream id was never
    /// opened; the caller should retry against a new connection.
    #[error("request is retriable on a new connection: {0}")]
    RetriableConnectionClosed(String),
    /// The configured request or connect timeout elapsed.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}
