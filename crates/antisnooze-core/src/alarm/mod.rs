mod history;
mod lifecycle;
mod settings;

pub use history::{AlarmHistory, HistoryStore, MemoryHistory};
pub use lifecycle::{AlarmLifecycle, AlarmPhase};
pub use settings::{next_alarm_date, AlarmSettings, VibrationIntensity};
