//! Encoding/decoding between envelopes and domain types.

use chrono::{DateTime, Utc};

use crate::alarm::AlarmSettings;
use crate::classifier::SleepState;
use crate::sync::types::{AlarmAction, Envelope, MessageType, SyncError};

/// A decoded, typed sync message ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    Settings(AlarmSettings),
    SleepState(SleepState),
    Action(AlarmAction),
}

/// Wrap alarm settings for transmission.
pub fn encode_settings(
    settings: &AlarmSettings,
    at: DateTime<Utc>,
) -> Result<Envelope, SyncError> {
    Ok(Envelope {
        message_type: MessageType::AlarmSettings,
        timestamp: at,
        data: serde_json::to_vec(settings)?,
    })
}

/// Wrap the classifier's published state for transmission.
pub fn encode_sleep_state(state: &SleepState, at: DateTime<Utc>) -> Result<Envelope, SyncError> {
    Ok(Envelope {
        message_type: MessageType::SleepState,
        timestamp: at,
        data: serde_json::to_vec(state)?,
    })
}

/// Wrap a remote action for transmission.
pub fn encode_action(action: AlarmAction, at: DateTime<Utc>) -> Result<Envelope, SyncError> {
    Ok(Envelope {
        message_type: MessageType::AlarmAction,
        timestamp: at,
        data: serde_json::to_vec(&action)?,
    })
}

/// Decode a received envelope by its message type.
///
/// A failure here is logged and dropped by the caller -- the next
/// periodic state push supersedes whatever was lost.
pub fn decode(envelope: &Envelope) -> Result<SyncMessage, SyncError> {
    match envelope.message_type {
        MessageType::AlarmSettings => serde_json::from_slice(&envelope.data)
            .map(SyncMessage::Settings)
            .map_err(|_| SyncError::PayloadMismatch(MessageType::AlarmSettings.as_str())),
        MessageType::SleepState => serde_json::from_slice(&envelope.data)
            .map(SyncMessage::SleepState)
            .map_err(|_| SyncError::PayloadMismatch(MessageType::SleepState.as_str())),
        MessageType::AlarmAction => serde_json::from_slice(&envelope.data)
            .map(SyncMessage::Action)
            .map_err(|_| SyncError::PayloadMismatch(MessageType::AlarmAction.as_str())),
    }
}
