//! Wire types for cross-device synchronization.
//!
//! Two cooperating devices (the wrist-worn sensor unit and its companion)
//! exchange alarm settings, sleep state and remote actions. Payloads are
//! JSON-encoded and wrapped in an [`Envelope`]; field and variant names
//! are camelCase to stay compatible with the companion's encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message kind carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    AlarmSettings,
    SleepState,
    AlarmAction,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::AlarmSettings => "alarmSettings",
            MessageType::SleepState => "sleepState",
            MessageType::AlarmAction => "alarmAction",
        }
    }
}

/// Remote alarm operation sent between devices.
///
/// `Snooze` remains on the wire for compatibility with older peers; it is
/// dispatched as a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmAction {
    Stop,
    Snooze,
    StartMonitoring,
    StopMonitoring,
}

/// Transport-level wrapper: message kind, send time, opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    /// JSON encoding of the payload type named by `message_type`.
    pub data: Vec<u8>,
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Payload does not match message type '{0}'")]
    PayloadMismatch(&'static str),

    #[error("Transport error: {0}")]
    Transport(String),
}
