//! Cross-device sync contract.
//!
//! Defines the wire messages exchanged with the companion device and the
//! reachability-aware delivery path. Only the contract lives here; real
//! transports are provided by the embedding application.

pub mod codec;
pub mod transport;
pub mod types;

#[cfg(test)]
mod transport_tests;

pub use codec::{decode, encode_action, encode_settings, encode_sleep_state, SyncMessage};
pub use transport::{LoopbackTransport, SyncPeer, Transport};
pub use types::{AlarmAction, Envelope, MessageType, SyncError};
