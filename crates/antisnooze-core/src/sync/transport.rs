//! Transport abstraction and peer-facing send/receive surface.
//!
//! An envelope goes out as a direct message when the peer is immediately
//! reachable, or as a durable "last known context" update when it is
//! not. The actual radio/session plumbing lives behind [`Transport`].

use chrono::{DateTime, Utc};

use crate::alarm::AlarmSettings;
use crate::classifier::SleepState;
use crate::sync::codec::{self, SyncMessage};
use crate::sync::types::{AlarmAction, Envelope, SyncError};

/// Cross-device message transport.
pub trait Transport {
    fn is_reachable(&self) -> bool;

    /// Deliver immediately. Only valid while the peer is reachable.
    fn send_message(&mut self, envelope: &Envelope) -> Result<(), SyncError>;

    /// Replace the durable last-known-context payload; the peer picks it
    /// up whenever it next connects.
    fn update_context(&mut self, envelope: &Envelope) -> Result<(), SyncError>;
}

/// Send/receive surface bound to one peer device.
pub struct SyncPeer<T: Transport> {
    transport: T,
}

impl<T: Transport> SyncPeer<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn send_settings(
        &mut self,
        settings: &AlarmSettings,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let envelope = codec::encode_settings(settings, at)?;
        self.deliver(&envelope)
    }

    pub fn send_sleep_state(
        &mut self,
        state: &SleepState,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let envelope = codec::encode_sleep_state(state, at)?;
        self.deliver(&envelope)
    }

    pub fn send_action(&mut self, action: AlarmAction, at: DateTime<Utc>) -> Result<(), SyncError> {
        let envelope = codec::encode_action(action, at)?;
        self.deliver(&envelope)
    }

    /// Decode an envelope received from the peer.
    pub fn receive(&self, envelope: &Envelope) -> Result<SyncMessage, SyncError> {
        codec::decode(envelope)
    }

    fn deliver(&mut self, envelope: &Envelope) -> Result<(), SyncError> {
        if self.transport.is_reachable() {
            self.transport.send_message(envelope)
        } else {
            self.transport.update_context(envelope)
        }
    }
}

/// In-memory transport for tests: records direct sends and keeps the
/// latest context update.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    pub reachable: bool,
    pub sent: Vec<Envelope>,
    pub context: Option<Envelope>,
}

impl LoopbackTransport {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable,
            sent: Vec::new(),
            context: None,
        }
    }
}

impl Transport for LoopbackTransport {
    fn is_reachable(&self) -> bool {
        self.reachable
    }

    fn send_message(&mut self, envelope: &Envelope) -> Result<(), SyncError> {
        self.sent.push(envelope.clone());
        Ok(())
    }

    fn update_context(&mut self, envelope: &Envelope) -> Result<(), SyncError> {
        self.context = Some(envelope.clone());
        Ok(())
    }
}
