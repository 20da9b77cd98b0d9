//! Posture/motion classifier.
//!
//! Converts a ~1 Hz stream of 3-axis acceleration samples plus a
//! periodically-polled trailing-window step count into a stable
//! lying-down / upright classification. Three independent signal paths
//! feed the classification:
//!
//! - the filtered tilt angle, guarded by hysteresis, debounce and a
//!   cooldown window (the anti-oscillation contract);
//! - a consecutive significant-motion counter that can confirm a wake
//!   immediately, bypassing the angle path;
//! - the step count, treated as unambiguous proof of being awake.
//!
//! All methods take explicit timestamps, so tests drive synthetic time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{Event, WakeSource};

/// One accelerometer sample in g units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub at: DateTime<Utc>,
}

/// Steps observed over the trailing window, polled periodically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSample {
    pub steps_in_window: u32,
    pub at: DateTime<Utc>,
}

/// Debounced sleep/posture state.
///
/// Owned and mutated exclusively by the classifier; everything else
/// reads. Mirrored to the companion device over the sync contract, hence
/// the camelCase wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepState {
    pub is_lying_down: bool,
    /// Acceleration magnitude with gravity's unit contribution removed.
    pub motion_level: f64,
    pub last_significant_motion_time: DateTime<Utc>,
    pub is_walking: bool,
    /// Steps observed in the trailing window.
    pub step_count: u32,
    pub last_step_time: DateTime<Utc>,
}

impl SleepState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_lying_down: false,
            motion_level: 0.0,
            last_significant_motion_time: now,
            is_walking: false,
            step_count: 0,
            last_step_time: now,
        }
    }
}

/// Classifier tunables.
///
/// The historical firmware changed several of these between revisions, so
/// they are configuration rather than constants. Defaults are the values
/// the engine ships with; the TOML config can override any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Filtered tilt at or above this enters lying-down (hysteresis high).
    #[serde(default = "default_lying_enter_deg")]
    pub lying_enter_deg: f64,
    /// Filtered tilt at or below this leaves lying-down (hysteresis low).
    #[serde(default = "default_lying_exit_deg")]
    pub lying_exit_deg: f64,
    /// One-pole low-pass factor applied to the raw tilt angle.
    #[serde(default = "default_tilt_smoothing")]
    pub tilt_smoothing: f64,
    /// A candidate transition must hold this long before the state flips.
    #[serde(default = "default_confirmation_secs")]
    pub confirmation_secs: f64,
    /// Angle-driven transitions are suppressed this long after any flip.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,
    /// Motion magnitude above this counts as significant.
    #[serde(default = "default_significant_motion")]
    pub significant_motion: f64,
    /// Gap above this between qualifying samples resets the burst counter.
    #[serde(default = "default_motion_reset_secs")]
    pub motion_reset_secs: f64,
    /// Burst counter value that confirms a wake while lying down.
    #[serde(default = "default_wake_confirmation_count")]
    pub wake_confirmation_count: u32,
    /// Trailing-window step count that forces an upright flip.
    #[serde(default = "default_steps_required_for_wake")]
    pub steps_required_for_wake: u32,
    /// Lying down this long after the alarm fired counts as a doze-off.
    #[serde(default = "default_doze_off_secs")]
    pub doze_off_secs: f64,
}

fn default_lying_enter_deg() -> f64 {
    70.0
}
fn default_lying_exit_deg() -> f64 {
    50.0
}
fn default_tilt_smoothing() -> f64 {
    0.3
}
fn default_confirmation_secs() -> f64 {
    3.0
}
fn default_cooldown_secs() -> f64 {
    10.0
}
fn default_significant_motion() -> f64 {
    0.3
}
fn default_motion_reset_secs() -> f64 {
    2.0
}
fn default_wake_confirmation_count() -> u32 {
    5
}
fn default_steps_required_for_wake() -> u32 {
    10
}
fn default_doze_off_secs() -> f64 {
    180.0
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lying_enter_deg: default_lying_enter_deg(),
            lying_exit_deg: default_lying_exit_deg(),
            tilt_smoothing: default_tilt_smoothing(),
            confirmation_secs: default_confirmation_secs(),
            cooldown_secs: default_cooldown_secs(),
            significant_motion: default_significant_motion(),
            motion_reset_secs: default_motion_reset_secs(),
            wake_confirmation_count: default_wake_confirmation_count(),
            steps_required_for_wake: default_steps_required_for_wake(),
            doze_off_secs: default_doze_off_secs(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::milliseconds((value * 1000.0).round() as i64)
}

/// Posture/motion classifier. Single writer of [`SleepState`].
#[derive(Debug, Clone)]
pub struct PostureClassifier {
    config: ClassifierConfig,
    state: SleepState,
    monitoring: bool,
    /// Exponentially smoothed tilt angle, degrees. None until first sample.
    filtered_tilt: Option<f64>,
    /// Candidate lying-down flag and the time it was first observed.
    pending_since: Option<(bool, DateTime<Utc>)>,
    /// Last confirmed flip; anchors the cooldown window.
    last_flip_at: Option<DateTime<Utc>>,
    /// Consecutive significant-motion samples within the reset interval.
    burst_count: u32,
    last_burst_at: Option<DateTime<Utc>>,
    /// Doze-off deadline; armed on a confirmed flip to lying-down.
    doze_off_at: Option<DateTime<Utc>>,
}

impl PostureClassifier {
    pub fn new(config: ClassifierConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            state: SleepState::new(now),
            monitoring: false,
            filtered_tilt: None,
            pending_since: None,
            last_flip_at: None,
            burst_count: 0,
            last_burst_at: None,
            doze_off_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn sleep_state(&self) -> &SleepState {
        &self.state
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_monitoring(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.monitoring {
            return Vec::new();
        }
        self.monitoring = true;
        self.reset_anchors();
        vec![Event::MonitoringStarted { at: now }]
    }

    /// Stop monitoring and invalidate every pending anchor and deadline.
    /// Leaving any of them armed would be a partial shutdown.
    pub fn stop_monitoring(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.monitoring {
            return Vec::new();
        }
        self.monitoring = false;
        self.reset_anchors();
        vec![Event::MonitoringStopped { at: now }]
    }

    /// Process one accelerometer sample. Samples arriving while monitoring
    /// is off are dropped.
    pub fn process_sample(&mut self, sample: &AccelSample) -> Vec<Event> {
        if !self.monitoring {
            return Vec::new();
        }

        let now = sample.at;
        let mut events = Vec::new();

        let magnitude = (sample.x * sample.x + sample.y * sample.y + sample.z * sample.z).sqrt();
        let motion = (magnitude - 1.0).abs();
        self.state.motion_level = motion;

        // Motion-burst path: can confirm a wake without waiting on the
        // angle debounce.
        if motion > self.config.significant_motion {
            self.state.last_significant_motion_time = now;
            self.burst_count = match self.last_burst_at {
                Some(prev) if now - prev < secs(self.config.motion_reset_secs) => {
                    self.burst_count + 1
                }
                _ => 1,
            };
            self.last_burst_at = Some(now);
            events.push(Event::SignificantMotion { level: motion, at: now });

            if self.state.is_lying_down && self.burst_count >= self.config.wake_confirmation_count
            {
                self.flip(false, now, &mut events);
                events.push(Event::WakeConfirmed {
                    source: WakeSource::MotionBurst,
                    at: now,
                });
                return events;
            }
        }

        // Angle path.
        let raw_tilt = (sample.x * sample.x + sample.y * sample.y)
            .sqrt()
            .atan2(sample.z)
            .to_degrees();
        let alpha = self.config.tilt_smoothing;
        let filtered = match self.filtered_tilt {
            Some(prev) => prev * (1.0 - alpha) + raw_tilt * alpha,
            None => raw_tilt,
        };
        self.filtered_tilt = Some(filtered);

        // Cooldown: suppress angle-driven transitions entirely right
        // after a confirmed flip.
        if let Some(flipped_at) = self.last_flip_at {
            if now - flipped_at < secs(self.config.cooldown_secs) {
                self.pending_since = None;
                return events;
            }
        }

        // Hysteresis: different thresholds per direction.
        let candidate = if self.state.is_lying_down {
            (filtered <= self.config.lying_exit_deg).then_some(false)
        } else {
            (filtered >= self.config.lying_enter_deg).then_some(true)
        };

        // Debounce: the candidate must hold continuously for the
        // confirmation duration. Any sample that breaks it cancels the
        // pending transition.
        match (candidate, self.pending_since) {
            (None, _) => self.pending_since = None,
            (Some(target), Some((pending, anchor))) if pending == target => {
                if now - anchor >= secs(self.config.confirmation_secs) {
                    self.flip(target, now, &mut events);
                    if !target {
                        events.push(Event::WakeConfirmed {
                            source: WakeSource::Posture,
                            at: now,
                        });
                    }
                }
            }
            (Some(target), _) => self.pending_since = Some((target, now)),
        }

        events
    }

    /// Process a trailing-window step count. Walking while lying down
    /// forces an immediate upright flip, regardless of angle state.
    pub fn process_steps(&mut self, sample: &StepSample) -> Vec<Event> {
        if !self.monitoring {
            return Vec::new();
        }

        let mut events = Vec::new();
        self.state.step_count = sample.steps_in_window;
        if sample.steps_in_window > 0 {
            self.state.last_step_time = sample.at;
        }
        self.state.is_walking = sample.steps_in_window >= self.config.steps_required_for_wake;

        if self.state.is_walking && self.state.is_lying_down {
            self.flip(false, sample.at, &mut events);
            events.push(Event::WakeConfirmed {
                source: WakeSource::Steps,
                at: sample.at,
            });
        }

        events
    }

    /// Re-anchor the doze-off window at `now` if currently lying down.
    ///
    /// Called when the alarm fires: a lying-down episode that began
    /// before the fire time must not count as an instant doze-off.
    pub fn rearm_doze(&mut self, now: DateTime<Utc>) {
        if self.monitoring && self.state.is_lying_down {
            self.doze_off_at = Some(now + secs(self.config.doze_off_secs));
        }
    }

    /// Evaluate the doze-off deadline. Emits `DozeOffDetected` exactly
    /// once per lying-down episode.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.monitoring || !self.state.is_lying_down {
            return Vec::new();
        }
        if let Some(deadline) = self.doze_off_at {
            if now >= deadline {
                self.doze_off_at = None;
                return vec![Event::DozeOffDetected { at: now }];
            }
        }
        Vec::new()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flip(&mut self, lying_down: bool, now: DateTime<Utc>, events: &mut Vec<Event>) {
        self.state.is_lying_down = lying_down;
        self.last_flip_at = Some(now);
        self.pending_since = None;

        if lying_down {
            self.doze_off_at = Some(now + secs(self.config.doze_off_secs));
        } else {
            self.doze_off_at = None;
            self.burst_count = 0;
            self.last_burst_at = None;
        }

        events.push(Event::PostureChanged {
            lying_down,
            tilt_deg: self.filtered_tilt.unwrap_or_default(),
            at: now,
        });
    }

    fn reset_anchors(&mut self) {
        self.filtered_tilt = None;
        self.pending_since = None;
        self.last_flip_at = None;
        self.burst_count = 0;
        self.last_burst_at = None;
        self.doze_off_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn classifier() -> PostureClassifier {
        let mut c = PostureClassifier::new(ClassifierConfig::default(), t(0));
        c.start_monitoring(t(0));
        c
    }

    /// Flat on the back: tilt ~90 degrees, no motion.
    fn lying_sample(at: DateTime<Utc>) -> AccelSample {
        AccelSample { x: 1.0, y: 0.0, z: 0.0, at }
    }

    /// Upright: tilt ~0 degrees, no motion.
    fn upright_sample(at: DateTime<Utc>) -> AccelSample {
        AccelSample { x: 0.0, y: 0.0, z: 1.0, at }
    }

    /// Drive the classifier into a confirmed lying-down state and past
    /// the cooldown window. Returns the next free second.
    fn settle_lying(c: &mut PostureClassifier) -> i64 {
        for i in 0..30 {
            c.process_sample(&lying_sample(t(i)));
        }
        assert!(c.sleep_state().is_lying_down);
        30
    }

    #[test]
    fn single_noisy_sample_does_not_flip() {
        // Unfiltered tilt so a single sample really crosses the threshold;
        // the debounce alone must reject it.
        let config = ClassifierConfig {
            tilt_smoothing: 1.0,
            ..ClassifierConfig::default()
        };
        let mut c = PostureClassifier::new(config, t(0));
        c.start_monitoring(t(0));

        c.process_sample(&upright_sample(t(0)));
        // One sample past the lying threshold, then back upright.
        c.process_sample(&lying_sample(t(1)));
        c.process_sample(&upright_sample(t(2)));
        c.process_sample(&upright_sample(t(3)));
        c.process_sample(&upright_sample(t(4)));
        assert!(!c.sleep_state().is_lying_down);
    }

    #[test]
    fn sustained_crossing_flips_exactly_once() {
        let mut c = classifier();
        let mut flips = 0;
        for i in 0..30 {
            for event in c.process_sample(&lying_sample(t(i))) {
                if matches!(event, Event::PostureChanged { .. }) {
                    flips += 1;
                }
            }
        }
        assert!(c.sleep_state().is_lying_down);
        assert_eq!(flips, 1);
    }

    #[test]
    fn cooldown_suppresses_angle_flips() {
        let mut c = classifier();
        // Flip to lying at t(3).
        for i in 0..4 {
            c.process_sample(&lying_sample(t(i)));
        }
        assert!(c.sleep_state().is_lying_down);

        // Sustained upright immediately after the flip: held far longer
        // than the confirmation duration, but inside the cooldown window,
        // so no second angle-driven flip may occur.
        for i in 4..13 {
            let events = c.process_sample(&upright_sample(t(i)));
            assert!(!events
                .iter()
                .any(|e| matches!(e, Event::PostureChanged { .. })));
        }
        assert!(c.sleep_state().is_lying_down);

        // Once the cooldown has elapsed the same condition flips normally.
        for i in 13..20 {
            c.process_sample(&upright_sample(t(i)));
        }
        assert!(!c.sleep_state().is_lying_down);
    }

    #[test]
    fn upright_after_cooldown_confirms_wake() {
        let mut c = classifier();
        let start = settle_lying(&mut c);

        // Wait out the cooldown, then hold upright.
        let mut wake = None;
        for i in 0..30 {
            for event in c.process_sample(&upright_sample(t(start + 15 + i))) {
                if let Event::WakeConfirmed { source, .. } = event {
                    wake = Some(source);
                }
            }
        }
        assert_eq!(wake, Some(WakeSource::Posture));
        assert!(!c.sleep_state().is_lying_down);
    }

    #[test]
    fn motion_burst_confirms_wake_bypassing_angle() {
        let mut c = classifier();
        let start = settle_lying(&mut c);

        // Five strong shakes one second apart while the angle still reads
        // lying-down.
        let mut wake = None;
        for i in 0..5 {
            let shake = AccelSample {
                x: 1.0,
                y: 1.0,
                z: 0.0,
                at: t(start + i),
            };
            for event in c.process_sample(&shake) {
                if let Event::WakeConfirmed { source, .. } = event {
                    wake = Some(source);
                }
            }
        }
        assert_eq!(wake, Some(WakeSource::MotionBurst));
        assert!(!c.sleep_state().is_lying_down);
    }

    #[test]
    fn burst_counter_resets_after_gap() {
        let mut c = classifier();
        let start = settle_lying(&mut c);

        // Four shakes, a 5 s gap, then four more: never reaches five
        // consecutive, so no wake.
        let mut woke = false;
        for i in 0..4 {
            let shake = AccelSample { x: 1.0, y: 1.0, z: 0.0, at: t(start + i) };
            woke |= c
                .process_sample(&shake)
                .iter()
                .any(|e| matches!(e, Event::WakeConfirmed { .. }));
        }
        for i in 0..4 {
            let shake = AccelSample { x: 1.0, y: 1.0, z: 0.0, at: t(start + 9 + i) };
            woke |= c
                .process_sample(&shake)
                .iter()
                .any(|e| matches!(e, Event::WakeConfirmed { .. }));
        }
        assert!(!woke);
        assert!(c.sleep_state().is_lying_down);
    }

    #[test]
    fn walking_forces_upright() {
        let mut c = classifier();
        let start = settle_lying(&mut c);

        let events = c.process_steps(&StepSample {
            steps_in_window: 12,
            at: t(start),
        });
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::WakeConfirmed { source: WakeSource::Steps, .. })));
        assert!(!c.sleep_state().is_lying_down);
        assert!(c.sleep_state().is_walking);
    }

    #[test]
    fn doze_off_fires_once_after_duration() {
        let mut c = classifier();
        let start = settle_lying(&mut c);

        assert!(c.tick(t(start + 60)).is_empty());
        // The flip happened before t(30), so 180 s past t(30) is safely
        // beyond the doze-off deadline.
        let events = c.tick(t(start + 181));
        assert!(matches!(events[0], Event::DozeOffDetected { .. }));
        // Exactly once per episode.
        assert!(c.tick(t(start + 182)).is_empty());
    }

    #[test]
    fn stop_monitoring_clears_all_anchors() {
        let mut c = classifier();
        settle_lying(&mut c);
        c.stop_monitoring(t(31));

        // Doze-off must never fire after a stop.
        assert!(c.tick(t(300)).is_empty());
        // Dropped samples leave no trace.
        assert!(c.process_sample(&upright_sample(t(301))).is_empty());
    }

    #[test]
    fn sensor_silence_means_no_state_change() {
        let mut c = classifier();
        let before = c.sleep_state().clone();
        assert!(c.tick(t(100)).is_empty());
        assert_eq!(c.sleep_state(), &before);
    }
}
