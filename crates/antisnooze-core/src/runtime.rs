//! Tokio runtime loop around the engine.
//!
//! All engine state is owned by a single task: sensor readings, periodic
//! ticks and external commands are serialized through one `select!` loop,
//! so no engine method ever races another. Callers talk to the loop over
//! channels and observe it through the event stream.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::alarm::AlarmSettings;
use crate::classifier::SensorSource;
use crate::engine::AntiSnoozeEngine;
use crate::error::SensorError;
use crate::events::Event;
use crate::sync::AlarmAction;

/// External request to the engine loop.
#[derive(Debug, Clone)]
pub enum Command {
    ApplySettings(AlarmSettings),
    StopAlarm,
    Action(AlarmAction),
    Shutdown,
}

/// Owns the engine and its sensor source and drives both until shutdown.
pub struct EngineRuntime<S: SensorSource> {
    engine: AntiSnoozeEngine,
    source: S,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
    sensors_live: bool,
    /// Armed while a transient start failure is waiting for its retry.
    sensor_retry_at: Option<DateTime<Utc>>,
}

impl<S: SensorSource> EngineRuntime<S> {
    pub fn new(
        engine: AntiSnoozeEngine,
        source: S,
        commands: mpsc::Receiver<Command>,
        events: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            engine,
            source,
            commands,
            events,
            sensors_live: false,
            sensor_retry_at: None,
        }
    }

    pub fn engine(&self) -> &AntiSnoozeEngine {
        &self.engine
    }

    /// Run until a `Shutdown` command arrives or the command channel
    /// closes. A sensor with nothing behind it degrades the loop to the
    /// wall-clock-only path; a transient start failure is retried after a
    /// fixed backoff. Neither aborts the alarm.
    pub async fn run(mut self) {
        self.start_sensors(Utc::now());

        let mut ticker = tokio::time::interval(self.engine.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    if self.sensor_retry_at.is_some_and(|due| now >= due) {
                        self.start_sensors(now);
                    }
                    self.drain_sensor(now).await;
                    match self.engine.tick(now) {
                        Ok(events) => self.emit(events).await,
                        Err(e) => eprintln!("warning: engine tick failed: {e}"),
                    }
                }
                cmd = self.commands.recv() => {
                    let now = Utc::now();
                    match cmd {
                        Some(Command::ApplySettings(settings)) => {
                            let events = self.engine.apply_settings(settings, now);
                            self.emit(events).await;
                        }
                        Some(Command::StopAlarm) => match self.engine.stop_alarm(now) {
                            Ok(events) => self.emit(events).await,
                            Err(e) => eprintln!("warning: stop failed: {e}"),
                        },
                        Some(Command::Action(action)) => {
                            match self.engine.handle_action(action, now) {
                                Ok(events) => self.emit(events).await,
                                Err(e) => eprintln!("warning: action failed: {e}"),
                            }
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }
            }
        }

        if self.sensors_live {
            self.source.stop();
        }
    }

    /// Start the sensor session. `Unavailable` is permanent: there is no
    /// sensor to come back, so the retry is disarmed. Any other start
    /// failure is a transient session interruption and gets another
    /// attempt one backoff later.
    fn start_sensors(&mut self, now: DateTime<Utc>) {
        match self.source.start() {
            Ok(()) => {
                self.sensors_live = true;
                self.sensor_retry_at = None;
            }
            Err(SensorError::Unavailable) => {
                self.sensor_retry_at = None;
                eprintln!("warning: sensor unavailable, alarm will rely on the wall clock only");
            }
            Err(e) => {
                self.sensor_retry_at = Some(now + self.engine.sensor_retry_interval());
                eprintln!("warning: sensor failed to start, will retry: {e}");
            }
        }
    }

    async fn drain_sensor(&mut self, now: DateTime<Utc>) {
        if !self.sensors_live {
            return;
        }
        loop {
            match self.source.poll(now) {
                Ok(Some(reading)) => match self.engine.process_reading(&reading, now) {
                    Ok(events) => self.emit(events).await,
                    Err(e) => eprintln!("warning: reading dropped: {e}"),
                },
                Ok(None) => break,
                Err(e) => {
                    // One bad reading; keep the loop alive.
                    eprintln!("warning: sensor poll failed: {e}");
                    break;
                }
            }
        }
    }

    async fn emit(&mut self, events: Vec<Event>) {
        for event in events {
            // A dropped event receiver means nobody is listening; the
            // engine keeps running regardless.
            let _ = self.events.send(event).await;
        }
    }
}
