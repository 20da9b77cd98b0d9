//! Alarm lifecycle state machine.
//!
//! The lifecycle is a wall-clock-based state machine. It does not use
//! internal threads -- the caller is responsible for calling `tick()`
//! periodically with the current time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle/Scheduled -> Scheduled   (settings change, recompute fire time)
//! Scheduled      -> Firing      (deadline reached)
//! Firing         -> Scheduled | Idle  (complete-stop, then reschedule)
//! Scheduled      -> Idle        (deactivation)
//! ```
//!
//! Wake confirmation is delegated entirely to the classifier's debounce
//! and cooldown logic, so this state machine never sees raw sensor noise.
//! It only reacts to already-debounced signals and its own deadline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::{next_alarm_date, AlarmSettings};
use crate::events::Event;

/// Current phase of the alarm lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum AlarmPhase {
    /// No alarm armed.
    Idle,
    /// Deadline armed for a future fire time.
    Scheduled { fire_at: DateTime<Utc> },
    /// Alarm presented to the user; classifier and controller are active.
    Firing { since: DateTime<Utc> },
}

/// Alarm lifecycle state machine.
///
/// Pure state: side effects on the classifier, controller, history and
/// notification collaborators are performed by the engine in response to
/// the events returned here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmLifecycle {
    settings: AlarmSettings,
    phase: AlarmPhase,
}

impl AlarmLifecycle {
    pub fn new(settings: AlarmSettings, now: DateTime<Utc>) -> Self {
        let mut lifecycle = Self {
            settings: settings.clone(),
            phase: AlarmPhase::Idle,
        };
        lifecycle.apply_settings(settings, now);
        lifecycle
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> AlarmPhase {
        self.phase
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.phase, AlarmPhase::Firing { .. })
    }

    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            AlarmPhase::Scheduled { fire_at } => Some(fire_at),
            _ => None,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Take a fresh settings snapshot, cancel any armed deadline and
    /// recompute the next fire time.
    ///
    /// While `Firing`, only the snapshot is replaced; the rearm happens
    /// when the firing episode completes, so a settings push cannot
    /// silently kill an alarm that is already sounding.
    pub fn apply_settings(&mut self, settings: AlarmSettings, now: DateTime<Utc>) -> Vec<Event> {
        self.settings = settings;

        if self.is_firing() {
            return Vec::new();
        }

        let was_armed = matches!(self.phase, AlarmPhase::Scheduled { .. });
        match next_alarm_date(&self.settings, now) {
            Some(fire_at) => {
                self.phase = AlarmPhase::Scheduled { fire_at };
                vec![Event::AlarmScheduled { fire_at, at: now }]
            }
            None => {
                self.phase = AlarmPhase::Idle;
                if was_armed {
                    vec![Event::AlarmCancelled { at: now }]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Call periodically. Returns `Event::AlarmFired` when the armed
    /// deadline is reached.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if let AlarmPhase::Scheduled { fire_at } = self.phase {
            if now >= fire_at {
                self.phase = AlarmPhase::Firing { since: fire_at };
                return vec![Event::AlarmFired { at: now }];
            }
        }
        Vec::new()
    }

    /// Complete-stop: terminate the firing episode at `woke_at`, then
    /// immediately recompute the next occurrence.
    ///
    /// Triggered by a confirmed-wake signal or an explicit stop request.
    /// No-op outside `Firing`.
    pub fn complete(&mut self, woke_at: DateTime<Utc>) -> Vec<Event> {
        if !self.is_firing() {
            return Vec::new();
        }

        let mut events = vec![Event::AlarmCompleted {
            woke_at,
            at: woke_at,
        }];
        self.phase = AlarmPhase::Idle;
        events.extend(self.apply_settings(self.settings.clone(), woke_at));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::VibrationIntensity;
    use chrono::{NaiveTime, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        // 2026-03-02 is a Monday.
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn active_settings() -> AlarmSettings {
        AlarmSettings {
            wake_up_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            is_active: true,
            vibration_intensity: VibrationIntensity::Medium,
            repeat_days: [false; 7],
        }
    }

    #[test]
    fn inactive_settings_stay_idle() {
        let lifecycle = AlarmLifecycle::new(AlarmSettings::default(), at(6, 0));
        assert_eq!(lifecycle.phase(), AlarmPhase::Idle);
    }

    #[test]
    fn active_settings_arm_the_deadline() {
        let lifecycle = AlarmLifecycle::new(active_settings(), at(6, 0));
        assert_eq!(lifecycle.next_fire_at(), Some(at(7, 0)));
    }

    #[test]
    fn deadline_expiry_enters_firing() {
        let mut lifecycle = AlarmLifecycle::new(active_settings(), at(6, 0));
        assert!(lifecycle.tick(at(6, 59)).is_empty());

        let events = lifecycle.tick(at(7, 0));
        assert!(matches!(events[0], Event::AlarmFired { .. }));
        assert_eq!(lifecycle.phase(), AlarmPhase::Firing { since: at(7, 0) });
    }

    #[test]
    fn complete_reschedules_next_occurrence() {
        let mut lifecycle = AlarmLifecycle::new(active_settings(), at(6, 0));
        lifecycle.tick(at(7, 0));

        let events = lifecycle.complete(at(7, 3));
        assert!(matches!(events[0], Event::AlarmCompleted { woke_at, .. } if woke_at == at(7, 3)));
        // One-shot alarm: next occurrence is tomorrow 07:00.
        assert_eq!(
            lifecycle.next_fire_at(),
            Some(at(7, 0) + chrono::Duration::days(1))
        );
    }

    #[test]
    fn complete_outside_firing_is_noop() {
        let mut lifecycle = AlarmLifecycle::new(active_settings(), at(6, 0));
        assert!(lifecycle.complete(at(6, 30)).is_empty());
        assert_eq!(lifecycle.next_fire_at(), Some(at(7, 0)));
    }

    #[test]
    fn deactivation_cancels_without_history_side_effects() {
        let mut lifecycle = AlarmLifecycle::new(active_settings(), at(6, 0));
        let mut settings = active_settings();
        settings.is_active = false;

        let events = lifecycle.apply_settings(settings, at(6, 30));
        assert!(matches!(events[0], Event::AlarmCancelled { .. }));
        assert_eq!(lifecycle.phase(), AlarmPhase::Idle);
    }

    #[test]
    fn settings_push_while_firing_does_not_kill_the_episode() {
        let mut lifecycle = AlarmLifecycle::new(active_settings(), at(6, 0));
        lifecycle.tick(at(7, 0));

        let mut settings = active_settings();
        settings.wake_up_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(lifecycle.apply_settings(settings, at(7, 1)).is_empty());
        assert!(lifecycle.is_firing());

        // The new time takes effect on completion.
        lifecycle.complete(at(7, 2));
        assert_eq!(lifecycle.next_fire_at(), Some(at(8, 0)));
    }
}
