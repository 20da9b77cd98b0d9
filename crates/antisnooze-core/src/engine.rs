//! Engine wiring.
//!
//! [`AntiSnoozeEngine`] owns the classifier, the vibration controller and
//! the alarm lifecycle, and routes events between them. Components are
//! constructor-injected -- no process-wide singletons -- so each one is
//! unit-testable in isolation and the whole engine runs against synthetic
//! time and scripted sensors.
//!
//! Single-writer rule: the classifier is the only writer of `SleepState`,
//! the lifecycle the only writer of the alarm phase, and the controller
//! only reads. Everything below executes on one scheduling context (see
//! `runtime`), so there is no shared mutable state to race on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmHistory, AlarmLifecycle, AlarmPhase, AlarmSettings, HistoryStore};
use crate::classifier::{PostureClassifier, SensorReading, SleepState};
use crate::error::Result;
use crate::events::Event;
use crate::haptics::{VibrationController, VibrationState};
use crate::notify::NotificationScheduler;
use crate::sync::AlarmAction;

/// Engine-level tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Start monitoring this long before the fire time so the classifier
    /// is warm when the alarm sounds.
    #[serde(default = "default_pre_alarm_lead_secs")]
    pub pre_alarm_lead_secs: f64,
    /// Runtime tick interval.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: f64,
    /// Resume vibration after this much stillness while lying down.
    #[serde(default = "default_stillness_resume_secs")]
    pub stillness_resume_secs: f64,
    /// Backoff before retrying a sensor session that failed to start.
    #[serde(default = "default_sensor_retry_secs")]
    pub sensor_retry_secs: f64,
}

fn default_pre_alarm_lead_secs() -> f64 {
    300.0
}
fn default_tick_interval_secs() -> f64 {
    1.0
}
fn default_stillness_resume_secs() -> f64 {
    10.0
}
fn default_sensor_retry_secs() -> f64 {
    1.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pre_alarm_lead_secs: default_pre_alarm_lead_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            stillness_resume_secs: default_stillness_resume_secs(),
            sensor_retry_secs: default_sensor_retry_secs(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::milliseconds((value * 1000.0).round() as i64)
}

/// The wired-up alarm engine.
pub struct AntiSnoozeEngine {
    config: EngineConfig,
    classifier: PostureClassifier,
    controller: VibrationController,
    lifecycle: AlarmLifecycle,
    history: Box<dyn HistoryStore + Send>,
    notifier: Box<dyn NotificationScheduler + Send>,
}

impl AntiSnoozeEngine {
    pub fn new(
        config: EngineConfig,
        classifier: PostureClassifier,
        controller: VibrationController,
        settings: AlarmSettings,
        history: Box<dyn HistoryStore + Send>,
        notifier: Box<dyn NotificationScheduler + Send>,
        now: DateTime<Utc>,
    ) -> Self {
        let lifecycle = AlarmLifecycle::new(settings, now);
        let mut engine = Self {
            config,
            classifier,
            controller,
            lifecycle,
            history,
            notifier,
        };
        engine.mirror_notification();
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> AlarmPhase {
        self.lifecycle.phase()
    }

    pub fn sleep_state(&self) -> &SleepState {
        self.classifier.sleep_state()
    }

    pub fn settings(&self) -> &AlarmSettings {
        self.lifecycle.settings()
    }

    pub fn vibration_state(&self) -> VibrationState {
        self.controller.state()
    }

    pub fn is_monitoring(&self) -> bool {
        self.classifier.is_monitoring()
    }

    pub fn history(&self) -> &dyn HistoryStore {
        &*self.history
    }

    /// How often the runtime should call [`tick`](Self::tick).
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.config.tick_interval_secs)
    }

    /// Backoff before the runtime retries a failed sensor-session start.
    pub fn sensor_retry_interval(&self) -> Duration {
        secs(self.config.sensor_retry_secs)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply a fresh settings snapshot and rearm.
    pub fn apply_settings(&mut self, settings: AlarmSettings, now: DateTime<Utc>) -> Vec<Event> {
        let events = self.lifecycle.apply_settings(settings, now);
        self.mirror_notification();
        events
    }

    /// Call periodically (the runtime ticks at `tick_interval_secs`).
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut events = Vec::new();

        // Pre-arm monitoring shortly before the fire time.
        if let AlarmPhase::Scheduled { fire_at } = self.lifecycle.phase() {
            if !self.classifier.is_monitoring()
                && fire_at - now <= secs(self.config.pre_alarm_lead_secs)
            {
                events.extend(self.classifier.start_monitoring(now));
            }
        }

        for event in self.lifecycle.tick(now) {
            events.push(event);
            // Firing: mark active, start classifier and controller,
            // append the history entry stamped with the fire time.
            if let AlarmPhase::Firing { since } = self.lifecycle.phase() {
                events.extend(self.classifier.start_monitoring(now));
                // A lying episode that predates the fire time starts its
                // doze-off window now, not retroactively.
                self.classifier.rearm_doze(now);
                events.extend(
                    self.controller
                        .start(self.lifecycle.settings().vibration_intensity, now),
                );
                self.history.append(AlarmHistory::new(since))?;
            }
        }

        for event in self.classifier.tick(now) {
            events.push(event);
            // A confirmed doze-off bumps the history counter and restarts
            // continuous vibration; the lifecycle phase is unchanged.
            if self.lifecycle.is_firing() {
                self.history.update_last(None, true)?;
                events.extend(self.controller.start_continuous(now));
            }
        }

        let lying = self.classifier.sleep_state().is_lying_down;
        events.extend(self.controller.tick(now, lying));

        Ok(events)
    }

    /// Feed one sensor reading through the classifier and route the
    /// resulting events.
    pub fn process_reading(&mut self, reading: &SensorReading, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let classified = match reading {
            SensorReading::Accel(sample) => self.classifier.process_sample(sample),
            SensorReading::Steps(sample) => self.classifier.process_steps(sample),
        };

        let mut events = Vec::new();
        for event in classified {
            let mut routed = Vec::new();
            match &event {
                // Wake confirmation terminates the firing episode.
                Event::WakeConfirmed { at, .. } if self.lifecycle.is_firing() => {
                    routed = self.complete_stop(*at)?;
                }
                // Motion while lying down and vibrating: the user may be
                // getting up, so back off. The controller's own recheck
                // and timeout decide what happens next.
                Event::SignificantMotion { at, .. }
                    if self.lifecycle.is_firing()
                        && self.classifier.sleep_state().is_lying_down
                        && self.controller.state() == VibrationState::Continuous =>
                {
                    routed = self.controller.pause(*at);
                }
                _ => {}
            }
            events.push(event);
            events.extend(routed);
        }

        // Prolonged stillness while lying down means the pause was a
        // false hope; bring the vibration back.
        if self.lifecycle.is_firing()
            && self.classifier.sleep_state().is_lying_down
            && self.controller.state() == VibrationState::Paused
        {
            let still_for = now - self.classifier.sleep_state().last_significant_motion_time;
            if still_for >= secs(self.config.stillness_resume_secs) {
                events.extend(self.controller.resume(now));
            }
        }

        Ok(events)
    }

    /// Explicit stop request (crown tap, companion action). Completes the
    /// firing episode; no-op otherwise.
    pub fn stop_alarm(&mut self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        if !self.lifecycle.is_firing() {
            return Ok(Vec::new());
        }
        self.complete_stop(now)
    }

    /// Dispatch a remote action from the companion device.
    pub fn handle_action(&mut self, action: AlarmAction, now: DateTime<Utc>) -> Result<Vec<Event>> {
        match action {
            // Snooze was removed from the product; peers still sending it
            // get the stop behavior.
            AlarmAction::Stop | AlarmAction::Snooze => self.stop_alarm(now),
            AlarmAction::StartMonitoring => Ok(self.classifier.start_monitoring(now)),
            AlarmAction::StopMonitoring => {
                if self.lifecycle.is_firing() {
                    // Monitoring is load-bearing while firing.
                    Ok(Vec::new())
                } else {
                    Ok(self.classifier.stop_monitoring(now))
                }
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Complete-stop: controller idle, classifier stopped, history
    /// stamped, next occurrence rescheduled.
    fn complete_stop(&mut self, woke_at: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        events.extend(self.controller.stop(woke_at));
        events.extend(self.classifier.stop_monitoring(woke_at));
        self.history.update_last(Some(woke_at), false)?;
        events.extend(self.lifecycle.complete(woke_at));
        self.mirror_notification();
        Ok(events)
    }

    fn mirror_notification(&mut self) {
        self.notifier.cancel();
        if let Some(fire_at) = self.lifecycle.next_fire_at() {
            if let Err(e) = self.notifier.schedule(fire_at) {
                eprintln!("warning: failed to schedule wall-clock notification: {e}");
            }
        }
    }
}

impl std::fmt::Debug for AntiSnoozeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiSnoozeEngine")
            .field("phase", &self.lifecycle.phase())
            .field("vibration", &self.controller.state())
            .field("monitoring", &self.classifier.is_monitoring())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{MemoryHistory, VibrationIntensity};
    use crate::classifier::{AccelSample, ClassifierConfig};
    use crate::haptics::{NullHaptics, VibrationConfig};
    use crate::notify::NullNotifier;
    use chrono::{NaiveTime, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
    }

    fn engine() -> AntiSnoozeEngine {
        let now = at(6, 0, 0);
        let settings = AlarmSettings {
            wake_up_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            is_active: true,
            vibration_intensity: VibrationIntensity::Strong,
            repeat_days: [false; 7],
        };
        AntiSnoozeEngine::new(
            EngineConfig::default(),
            PostureClassifier::new(ClassifierConfig::default(), now),
            VibrationController::new(VibrationConfig::default(), Box::new(NullHaptics)),
            settings,
            Box::new(MemoryHistory::new()),
            Box::new(NullNotifier),
            now,
        )
    }

    fn lying(at: DateTime<Utc>) -> SensorReading {
        SensorReading::Accel(AccelSample { x: 1.0, y: 0.0, z: 0.0, at })
    }

    fn upright(at: DateTime<Utc>) -> SensorReading {
        SensorReading::Accel(AccelSample { x: 0.0, y: 0.0, z: 1.0, at })
    }

    /// Fire the alarm with the user lying down.
    fn fire(engine: &mut AntiSnoozeEngine) {
        engine.tick(at(6, 55, 30)).unwrap(); // pre-arm monitoring
        for i in 0..10 {
            engine.process_reading(&lying(at(6, 56, i)), at(6, 56, i)).unwrap();
        }
        assert!(engine.sleep_state().is_lying_down);
        engine.tick(at(7, 0, 0)).unwrap();
        assert!(matches!(engine.phase(), AlarmPhase::Firing { .. }));
    }

    #[test]
    fn pre_arm_starts_monitoring_before_fire_time() {
        let mut e = engine();
        e.tick(at(6, 50, 0)).unwrap();
        assert!(!e.is_monitoring());
        e.tick(at(6, 55, 0)).unwrap();
        assert!(e.is_monitoring());
    }

    #[test]
    fn firing_appends_history_stamped_with_fire_time() {
        let mut e = engine();
        fire(&mut e);

        let entries = e.history().list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].alarm_time, at(7, 0, 0));
        assert_eq!(entries[0].wake_up_time, None);
        assert_eq!(e.vibration_state(), VibrationState::Continuous);
    }

    #[test]
    fn confirmed_wake_completes_exactly_once() {
        let mut e = engine();
        fire(&mut e);

        // Hold upright past cooldown + confirmation.
        let mut completions = 0;
        for i in 0..30 {
            let now = at(7, 0, 30 + i);
            for event in e.process_reading(&upright(now), now).unwrap() {
                if matches!(event, Event::AlarmCompleted { .. }) {
                    completions += 1;
                }
            }
        }
        assert_eq!(completions, 1);

        let entries = e.history().list().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].wake_up_time.is_some());
        assert_eq!(e.vibration_state(), VibrationState::Idle);
        assert!(!e.is_monitoring());
        // Exactly one recomputed schedule: tomorrow 07:00.
        assert_eq!(
            e.phase(),
            AlarmPhase::Scheduled { fire_at: at(7, 0, 0) + Duration::days(1) }
        );
    }

    #[test]
    fn doze_off_increments_history_and_restarts_vibration() {
        let mut e = engine();
        fire(&mut e);

        // The controller pauses after its max continuous window; the user
        // stays down past the doze-off duration.
        let mut doze_events = 0;
        for i in 1..200 {
            let now = at(7, 0, 0) + Duration::seconds(i);
            for event in e.tick(now).unwrap() {
                if matches!(event, Event::DozeOffDetected { .. }) {
                    doze_events += 1;
                }
            }
        }
        assert_eq!(doze_events, 1);
        assert_eq!(e.history().list().unwrap()[0].doze_off_count, 1);
        assert_eq!(e.vibration_state(), VibrationState::Continuous);
    }

    #[test]
    fn motion_while_lying_pauses_vibration() {
        let mut e = engine();
        fire(&mut e);
        assert_eq!(e.vibration_state(), VibrationState::Continuous);

        let shake = SensorReading::Accel(AccelSample {
            x: 1.0,
            y: 1.0,
            z: 0.0,
            at: at(7, 0, 5),
        });
        e.process_reading(&shake, at(7, 0, 5)).unwrap();
        assert_eq!(e.vibration_state(), VibrationState::Paused);
    }

    #[test]
    fn stillness_after_pause_resumes_vibration() {
        let mut e = engine();
        fire(&mut e);

        let shake = SensorReading::Accel(AccelSample {
            x: 1.0,
            y: 1.0,
            z: 0.0,
            at: at(7, 0, 5),
        });
        e.process_reading(&shake, at(7, 0, 5)).unwrap();
        assert_eq!(e.vibration_state(), VibrationState::Paused);

        // Quiet lying samples with no ticks in between, so the
        // controller's own recheck never runs; the engine's stillness
        // path brings the vibration back on its own.
        for i in 6..20 {
            e.process_reading(&lying(at(7, 0, i)), at(7, 0, i)).unwrap();
        }
        assert_eq!(e.vibration_state(), VibrationState::Continuous);
    }

    #[test]
    fn external_stop_completes_the_episode() {
        let mut e = engine();
        fire(&mut e);

        let events = e.stop_alarm(at(7, 2, 0)).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::AlarmCompleted { .. })));
        assert_eq!(e.history().list().unwrap()[0].wake_up_time, Some(at(7, 2, 0)));
        assert!(matches!(e.phase(), AlarmPhase::Scheduled { .. }));
    }

    #[test]
    fn snooze_action_maps_to_stop() {
        let mut e = engine();
        fire(&mut e);
        e.handle_action(AlarmAction::Snooze, at(7, 1, 0)).unwrap();
        assert!(!e.lifecycle.is_firing());
        assert_eq!(e.vibration_state(), VibrationState::Idle);
    }

    #[test]
    fn stop_monitoring_action_is_ignored_while_firing() {
        let mut e = engine();
        fire(&mut e);
        e.handle_action(AlarmAction::StopMonitoring, at(7, 0, 30)).unwrap();
        assert!(e.is_monitoring());
    }
}
