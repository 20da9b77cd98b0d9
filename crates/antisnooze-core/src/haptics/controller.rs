//! Vibration escalation controller.
//!
//! Translates intensity plus classifier state into a haptic output
//! pattern without letting the device vibrate indefinitely.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Continuous -> Paused -> Continuous (resumed) | Idle (stopped)
//! ```
//!
//! Light and medium intensities play introductory pulses and escalate to
//! continuous after a delay; strong escalates immediately. Continuous
//! auto-pauses after a maximum duration; paused auto-resumes on a timeout
//! or earlier when a recheck still finds the user lying down. `stop`
//! collapses to idle from any state and cancels every deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::driver::{HapticDriver, HapticPulse};
use crate::alarm::VibrationIntensity;
use crate::events::Event;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VibrationState {
    Idle,
    Continuous,
    Paused,
}

/// Controller tunables, TOML-overridable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationConfig {
    /// Delay between the second medium pulse and the first.
    #[serde(default = "default_second_pulse_secs")]
    pub second_pulse_secs: f64,
    /// Delay before light/medium escalate to continuous.
    #[serde(default = "default_escalation_secs")]
    pub escalation_secs: f64,
    /// Interval between pulses while continuous.
    #[serde(default = "default_pulse_interval_secs")]
    pub pulse_interval_secs: f64,
    /// Maximum continuous run before the auto-pause.
    #[serde(default = "default_max_continuous_secs")]
    pub max_continuous_secs: f64,
    /// Paused this long auto-resumes (if still lying down).
    #[serde(default = "default_pause_timeout_secs")]
    pub pause_timeout_secs: f64,
    /// Early recheck after pausing: resume if still lying down.
    #[serde(default = "default_lying_recheck_secs")]
    pub lying_recheck_secs: f64,
}

fn default_second_pulse_secs() -> f64 {
    1.0
}
fn default_escalation_secs() -> f64 {
    5.0
}
fn default_pulse_interval_secs() -> f64 {
    2.0
}
fn default_max_continuous_secs() -> f64 {
    60.0
}
fn default_pause_timeout_secs() -> f64 {
    30.0
}
fn default_lying_recheck_secs() -> f64 {
    5.0
}

impl Default for VibrationConfig {
    fn default() -> Self {
        Self {
            second_pulse_secs: default_second_pulse_secs(),
            escalation_secs: default_escalation_secs(),
            pulse_interval_secs: default_pulse_interval_secs(),
            max_continuous_secs: default_max_continuous_secs(),
            pause_timeout_secs: default_pause_timeout_secs(),
            lying_recheck_secs: default_lying_recheck_secs(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::milliseconds((value * 1000.0).round() as i64)
}

/// Vibration escalation controller.
///
/// Wall-clock deadlines only -- the caller ticks it with the current
/// time and the classifier's debounced lying-down flag. Each logical
/// timer is a single `Option` deadline, invalidated before replacement,
/// so at most one instance of each is outstanding.
pub struct VibrationController {
    config: VibrationConfig,
    driver: Box<dyn HapticDriver + Send>,
    state: VibrationState,
    intensity: VibrationIntensity,
    second_pulse_at: Option<DateTime<Utc>>,
    escalate_at: Option<DateTime<Utc>>,
    next_pulse_at: Option<DateTime<Utc>>,
    /// Auto-pause deadline for the running continuous window.
    pause_at: Option<DateTime<Utc>>,
    /// Pause-timeout resume deadline.
    resume_at: Option<DateTime<Utc>>,
    /// Early lying-down recheck deadline.
    lying_recheck_at: Option<DateTime<Utc>>,
}

impl VibrationController {
    pub fn new(config: VibrationConfig, driver: Box<dyn HapticDriver + Send>) -> Self {
        Self {
            config,
            driver,
            state: VibrationState::Idle,
            intensity: VibrationIntensity::Medium,
            second_pulse_at: None,
            escalate_at: None,
            next_pulse_at: None,
            pause_at: None,
            resume_at: None,
            lying_recheck_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> VibrationState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == VibrationState::Idle
            && self.second_pulse_at.is_none()
            && self.escalate_at.is_none()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the alarm pattern for `intensity`.
    pub fn start(&mut self, intensity: VibrationIntensity, now: DateTime<Utc>) -> Vec<Event> {
        self.intensity = intensity;
        let mut events = vec![Event::VibrationStarted { intensity, at: now }];

        match intensity {
            VibrationIntensity::Light => {
                self.driver.play(HapticPulse::Notification);
                self.escalate_at = Some(now + secs(self.config.escalation_secs));
            }
            VibrationIntensity::Medium => {
                self.driver.play(HapticPulse::Click);
                self.second_pulse_at = Some(now + secs(self.config.second_pulse_secs));
                self.escalate_at = Some(now + secs(self.config.escalation_secs));
            }
            VibrationIntensity::Strong => {
                events.extend(self.start_continuous(now));
            }
        }

        events
    }

    /// Enter continuous vibration. Idempotent: calling while already
    /// continuous changes nothing and arms no duplicate deadlines.
    pub fn start_continuous(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state == VibrationState::Continuous {
            return Vec::new();
        }
        self.state = VibrationState::Continuous;
        self.second_pulse_at = None;
        self.escalate_at = None;
        self.resume_at = None;
        self.lying_recheck_at = None;

        self.driver.play(HapticPulse::for_intensity(self.intensity));
        self.next_pulse_at = Some(now + secs(self.config.pulse_interval_secs));
        self.pause_at = Some(now + secs(self.config.max_continuous_secs));

        vec![Event::VibrationEscalated { at: now }]
    }

    /// Pause the continuous pattern (battery conservation, or the user
    /// may be getting up). No-op unless continuous.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state != VibrationState::Continuous {
            return Vec::new();
        }
        self.state = VibrationState::Paused;
        self.next_pulse_at = None;
        self.pause_at = None;
        self.resume_at = Some(now + secs(self.config.pause_timeout_secs));
        self.lying_recheck_at = Some(now + secs(self.config.lying_recheck_secs));

        vec![Event::VibrationPaused { at: now }]
    }

    /// Resume continuous vibration with a fresh window. No-op unless
    /// paused.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state != VibrationState::Paused {
            return Vec::new();
        }
        self.state = VibrationState::Continuous;
        self.resume_at = None;
        self.lying_recheck_at = None;

        self.driver.play(HapticPulse::for_intensity(self.intensity));
        self.next_pulse_at = Some(now + secs(self.config.pulse_interval_secs));
        self.pause_at = Some(now + secs(self.config.max_continuous_secs));

        vec![Event::VibrationResumed { at: now }]
    }

    /// Collapse to idle from any state, cancelling all pending deadlines.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.is_idle() {
            return Vec::new();
        }
        self.state = VibrationState::Idle;
        self.second_pulse_at = None;
        self.escalate_at = None;
        self.next_pulse_at = None;
        self.pause_at = None;
        self.resume_at = None;
        self.lying_recheck_at = None;

        vec![Event::VibrationStopped { at: now }]
    }

    /// Call periodically with the classifier's debounced lying-down flag.
    pub fn tick(&mut self, now: DateTime<Utc>, lying_down: bool) -> Vec<Event> {
        let mut events = Vec::new();

        if let Some(due) = self.second_pulse_at {
            if now >= due {
                self.second_pulse_at = None;
                if self.state == VibrationState::Idle {
                    self.driver.play(HapticPulse::Click);
                }
            }
        }

        if let Some(due) = self.escalate_at {
            if now >= due {
                self.escalate_at = None;
                if self.state == VibrationState::Idle {
                    events.extend(self.start_continuous(now));
                }
            }
        }

        match self.state {
            VibrationState::Continuous => {
                if self.pause_at.is_some_and(|due| now >= due) {
                    events.extend(self.pause(now));
                } else if let Some(due) = self.next_pulse_at {
                    if now >= due {
                        self.driver.play(HapticPulse::for_intensity(self.intensity));
                        self.driver.play(HapticPulse::Start);
                        self.next_pulse_at = Some(now + secs(self.config.pulse_interval_secs));
                    }
                }
            }
            VibrationState::Paused => {
                if self.lying_recheck_at.is_some_and(|due| now >= due) {
                    self.lying_recheck_at = None;
                    if lying_down {
                        events.extend(self.resume(now));
                    }
                }
                if self.state == VibrationState::Paused
                    && self.resume_at.is_some_and(|due| now >= due)
                    && lying_down
                {
                    events.extend(self.resume(now));
                }
            }
            VibrationState::Idle => {}
        }

        events
    }
}

impl std::fmt::Debug for VibrationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VibrationController")
            .field("state", &self.state)
            .field("intensity", &self.intensity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::driver::RecordingHaptics;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn controller() -> (VibrationController, RecordingHaptics) {
        let haptics = RecordingHaptics::new();
        let controller =
            VibrationController::new(VibrationConfig::default(), Box::new(haptics.clone()));
        (controller, haptics)
    }

    #[test]
    fn strong_escalates_immediately() {
        let (mut c, haptics) = controller();
        let events = c.start(VibrationIntensity::Strong, t(0));
        assert_eq!(c.state(), VibrationState::Continuous);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::VibrationEscalated { .. })));
        assert_eq!(haptics.pulses(), vec![HapticPulse::Success]);
    }

    #[test]
    fn light_escalates_after_delay() {
        let (mut c, _haptics) = controller();
        c.start(VibrationIntensity::Light, t(0));
        assert_eq!(c.state(), VibrationState::Idle);

        assert!(c.tick(t(4), true).is_empty());
        let events = c.tick(t(5), true);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::VibrationEscalated { .. })));
        assert_eq!(c.state(), VibrationState::Continuous);
    }

    #[test]
    fn medium_plays_second_pulse_then_escalates() {
        let (mut c, haptics) = controller();
        c.start(VibrationIntensity::Medium, t(0));
        c.tick(t(1), true);
        assert_eq!(haptics.pulses(), vec![HapticPulse::Click, HapticPulse::Click]);

        c.tick(t(5), true);
        assert_eq!(c.state(), VibrationState::Continuous);
    }

    #[test]
    fn stop_before_escalation_prevents_it() {
        let (mut c, _haptics) = controller();
        c.start(VibrationIntensity::Light, t(0));
        c.stop(t(1));
        assert!(c.tick(t(10), true).is_empty());
        assert_eq!(c.state(), VibrationState::Idle);
        assert!(c.is_idle());
    }

    #[test]
    fn start_continuous_twice_is_idempotent() {
        let (mut c, haptics) = controller();
        c.start_continuous(t(0));
        assert!(c.start_continuous(t(1)).is_empty());
        // The second call armed no duplicate pulse deadline: one pulse at
        // start plus one per interval.
        c.tick(t(2), true);
        c.tick(t(3), true);
        c.tick(t(4), true);
        let pulses = haptics
            .pulses()
            .iter()
            .filter(|p| **p == HapticPulse::DirectionUp)
            .count();
        assert_eq!(pulses, 3); // t(0) start, t(2), t(4)
    }

    #[test]
    fn continuous_auto_pauses_after_max_duration() {
        let (mut c, _haptics) = controller();
        c.start_continuous(t(0));
        for i in 1..60 {
            c.tick(t(i), true);
            assert_eq!(c.state(), VibrationState::Continuous);
        }
        let events = c.tick(t(60), true);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::VibrationPaused { .. })));
        assert_eq!(c.state(), VibrationState::Paused);
    }

    #[test]
    fn recheck_resumes_early_when_still_lying() {
        let (mut c, _haptics) = controller();
        c.start_continuous(t(0));
        c.tick(t(60), true); // paused
        assert_eq!(c.state(), VibrationState::Paused);

        assert!(c.tick(t(64), true).is_empty());
        let events = c.tick(t(65), true);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::VibrationResumed { .. })));
        assert_eq!(c.state(), VibrationState::Continuous);
    }

    #[test]
    fn recheck_upright_waits_for_pause_timeout() {
        let (mut c, _haptics) = controller();
        c.start_continuous(t(0));
        c.tick(t(60), true); // paused

        // Upright at the recheck: no resume.
        c.tick(t(65), false);
        assert_eq!(c.state(), VibrationState::Paused);

        // Lying again at the pause timeout: resume.
        c.tick(t(90), true);
        assert_eq!(c.state(), VibrationState::Continuous);
    }

    #[test]
    fn pause_timeout_does_not_resume_while_upright() {
        let (mut c, _haptics) = controller();
        c.start_continuous(t(0));
        c.tick(t(60), true); // paused
        c.tick(t(95), false);
        assert_eq!(c.state(), VibrationState::Paused);
    }

    #[test]
    fn stop_collapses_from_any_state() {
        let (mut c, _haptics) = controller();
        c.start_continuous(t(0));
        c.tick(t(60), true); // paused
        let events = c.stop(t(61));
        assert!(matches!(events[0], Event::VibrationStopped { .. }));
        assert!(c.is_idle());
        // All deadlines cancelled: nothing ever fires again.
        assert!(c.tick(t(120), true).is_empty());
    }
}
