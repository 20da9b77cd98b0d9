//! Notification collaborator interface.
//!
//! The engine mirrors its next fire time as a system wall-clock
//! notification. The notification is redundant with the in-process
//! deadline on purpose: it still reaches the user if the process is
//! suspended when the deadline passes.

use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// Schedules and cancels the mirrored wall-clock notification.
pub trait NotificationScheduler {
    fn schedule(&mut self, fire_at: DateTime<Utc>) -> Result<(), CoreError>;

    fn cancel(&mut self);
}

/// No-op scheduler for tests and headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationScheduler for NullNotifier {
    fn schedule(&mut self, _fire_at: DateTime<Utc>) -> Result<(), CoreError> {
        Ok(())
    }

    fn cancel(&mut self) {}
}
