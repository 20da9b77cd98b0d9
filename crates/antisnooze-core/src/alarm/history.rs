use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// One fired alarm. Append-only list; the last entry is mutated in place
/// when the alarm completes or a doze-off is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmHistory {
    pub id: Uuid,
    pub alarm_time: DateTime<Utc>,
    pub wake_up_time: Option<DateTime<Utc>>,
    /// Incremented once per confirmed relapse-into-lying-down episode.
    pub doze_off_count: u32,
}

impl AlarmHistory {
    pub fn new(alarm_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alarm_time,
            wake_up_time: None,
            doze_off_count: 0,
        }
    }
}

/// History collaborator interface.
///
/// The engine appends one entry per fired alarm and mutates the last entry
/// on completion or doze-off. Backed by sqlite in production and by
/// [`MemoryHistory`] in tests.
pub trait HistoryStore {
    fn append(&mut self, entry: AlarmHistory) -> Result<(), StorageError>;

    /// Update the most recent entry. `wake_up_time` stamps the completion
    /// time; `increment_doze_off` bumps the doze-off counter. A missing
    /// last entry is a no-op.
    fn update_last(
        &mut self,
        wake_up_time: Option<DateTime<Utc>>,
        increment_doze_off: bool,
    ) -> Result<(), StorageError>;

    fn list(&self) -> Result<Vec<AlarmHistory>, StorageError>;
}

/// In-memory history store.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<AlarmHistory>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, entry: AlarmHistory) -> Result<(), StorageError> {
        self.entries.push(entry);
        Ok(())
    }

    fn update_last(
        &mut self,
        wake_up_time: Option<DateTime<Utc>>,
        increment_doze_off: bool,
    ) -> Result<(), StorageError> {
        if let Some(last) = self.entries.last_mut() {
            if let Some(woke_at) = wake_up_time {
                last.wake_up_time = Some(woke_at);
            }
            if increment_doze_off {
                last.doze_off_count += 1;
            }
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<AlarmHistory>, StorageError> {
        Ok(self.entries.clone())
    }
}
