//! 0-RTT session resumption: a ranked, replay-guarded ticket store with
//! encrypted-at-rest persistence.
//!
//! Cryptographic primitives are injected behind [`AeadSeal`]; the store
//! never implements AEAD or KDF constructions itself. Faults anywhere in
//! this crate are meant to degrade to a full handshake, never to surface
//! as a hard error to the application. See each method's docs for what
//! it treats as a miss versus a genuine error.

mod aead_seal;
mod error;
mod origin;
mod replay;
mod secret_store;
mod store;
mod ticket;

pub use aead_seal::{AeadSeal, AesGcmSeal, ChaChaSeal};
pub use error::Error;
pub use origin::Origin;
pub use replay::{ReplayGuard, DEFAULT_NONCE_RING_CAPACITY};
pub use secret_store::{FileBackedSecretStore, SecretStoreHandle};
pub use store::{TicketStore, DEFAULT_PRECOMPUTED_REQUESTS};
pub use ticket::{CryptoSnapshot, PrecomputedRequest, SessionTicket, TransportSnapshot};
