use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::VibrationIntensity;

/// Which signal path confirmed that the user is upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeSource {
    /// Filtered tilt angle stayed below the stand threshold for the
    /// confirmation duration.
    Posture,
    /// Enough consecutive significant-motion samples while lying down.
    MotionBurst,
    /// Step count over the trailing window reached the walking threshold.
    Steps,
}

/// Every state change in the system produces an Event.
///
/// The classifier, controller and lifecycle return events from their
/// mutation paths instead of broadcasting; the engine routes them and the
/// runtime forwards them to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    MonitoringStarted {
        at: DateTime<Utc>,
    },
    MonitoringStopped {
        at: DateTime<Utc>,
    },
    /// Debounced posture flip. `lying_down` is the new state.
    PostureChanged {
        lying_down: bool,
        tilt_deg: f64,
        at: DateTime<Utc>,
    },
    /// A single sample exceeded the significant-motion threshold.
    SignificantMotion {
        level: f64,
        at: DateTime<Utc>,
    },
    /// Debounced determination that the user is upright and/or walking.
    WakeConfirmed {
        source: WakeSource,
        at: DateTime<Utc>,
    },
    /// The user stayed lying down past the doze-off duration after the
    /// alarm fired. Emitted exactly once per lying-down episode.
    DozeOffDetected {
        at: DateTime<Utc>,
    },
    AlarmScheduled {
        fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AlarmFired {
        at: DateTime<Utc>,
    },
    AlarmCompleted {
        woke_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AlarmCancelled {
        at: DateTime<Utc>,
    },
    VibrationStarted {
        intensity: VibrationIntensity,
        at: DateTime<Utc>,
    },
    /// The controller escalated to continuous vibration.
    VibrationEscalated {
        at: DateTime<Utc>,
    },
    VibrationPaused {
        at: DateTime<Utc>,
    },
    VibrationResumed {
        at: DateTime<Utc>,
    },
    VibrationStopped {
        at: DateTime<Utc>,
    },
}
