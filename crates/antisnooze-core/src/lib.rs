//! # AntiSnooze Core Library
//!
//! This library provides the core logic for a wrist-worn wake-up alarm
//! that keeps vibrating until the wearer actually gets out of bed. It is
//! CLI-first: everything is available through a standalone binary, with
//! device applications being thin shells over the same core.
//!
//! ## Architecture
//!
//! - **Classifier**: Turns raw accelerometer and pedometer samples into a
//!   debounced lying-down/upright determination
//! - **Vibration Controller**: Escalation state machine from a single
//!   pulse up to continuous vibration with pause/resume
//! - **Alarm Lifecycle**: Wall-clock state machine driven by a periodic
//!   `tick()`; scheduling survives sensor failure
//! - **Sync**: Wire contract for the companion device
//! - **Storage**: SQLite history, TOML configuration, JSON settings
//!
//! ## Key Components
//!
//! - [`AntiSnoozeEngine`]: The wired-up engine routing events between
//!   the classifier, controller and lifecycle
//! - [`EngineRuntime`]: Tokio loop that owns the engine
//! - [`PostureClassifier`]: Posture/motion classification
//! - [`HistoryDb`]: Alarm history persistence

pub mod alarm;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod events;
pub mod haptics;
pub mod notify;
pub mod runtime;
pub mod storage;
pub mod sync;

pub use alarm::{
    next_alarm_date, AlarmHistory, AlarmLifecycle, AlarmPhase, AlarmSettings, HistoryStore,
    MemoryHistory, VibrationIntensity,
};
pub use classifier::{
    AccelSample, ClassifierConfig, PostureClassifier, ScriptedSource, SensorReading, SensorSource,
    SleepState, StepSample, UnavailableSource,
};
pub use engine::{AntiSnoozeEngine, EngineConfig};
pub use error::{ConfigError, CoreError, SensorError, StorageError};
pub use events::{Event, WakeSource};
pub use haptics::{
    HapticDriver, HapticPulse, NullHaptics, RecordingHaptics, VibrationConfig,
    VibrationController, VibrationState,
};
pub use notify::{NotificationScheduler, NullNotifier};
pub use runtime::{Command, EngineRuntime};
pub use storage::{data_dir, Config, HistoryDb, SettingsStore};
pub use sync::{AlarmAction, Envelope, LoopbackTransport, MessageType, SyncError, SyncMessage, SyncPeer, Transport};
