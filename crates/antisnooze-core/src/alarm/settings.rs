use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Haptic intensity selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VibrationIntensity {
    Light,
    Medium,
    Strong,
}

/// Alarm configuration owned by the settings collaborator.
///
/// The engine treats this as an immutable snapshot read at schedule time.
/// `repeat_days` is Sunday-first. Wire field names are camelCase to match
/// the companion device's JSON encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSettings {
    pub wake_up_time: NaiveTime,
    pub is_active: bool,
    pub vibration_intensity: VibrationIntensity,
    #[serde(default)]
    pub repeat_days: [bool; 7],
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            wake_up_time: NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"),
            is_active: false,
            vibration_intensity: VibrationIntensity::Medium,
            repeat_days: [false; 7],
        }
    }
}

/// Compute the next fire time for `settings` as seen from `now`.
///
/// Returns `None` when the alarm is inactive. With no repeat day set the
/// alarm is one-shot: today at `wake_up_time` if that is still in the
/// future, else tomorrow. With at least one repeat day set, the nearest
/// future day (today included) whose weekday flag is set wins.
pub fn next_alarm_date(settings: &AlarmSettings, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !settings.is_active {
        return None;
    }

    let today_at_alarm = now.date_naive().and_time(settings.wake_up_time).and_utc();

    if !settings.repeat_days.iter().any(|&set| set) {
        return Some(if today_at_alarm > now {
            today_at_alarm
        } else {
            today_at_alarm + Duration::days(1)
        });
    }

    // Sunday-first index, matching repeat_days.
    let weekday = now.weekday().num_days_from_sunday() as usize;

    if settings.repeat_days[weekday] && today_at_alarm > now {
        return Some(today_at_alarm);
    }

    for offset in 1..=7 {
        if settings.repeat_days[(weekday + offset) % 7] {
            return Some(today_at_alarm + Duration::days(offset as i64));
        }
    }

    None
}
