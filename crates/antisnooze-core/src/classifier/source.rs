//! Sensor source abstraction.
//!
//! The classifier never talks to device APIs directly: it consumes
//! readings from a [`SensorSource`], a lazy, restartable sequence of
//! samples. Production wires a real accelerometer/pedometer behind this
//! trait; tests and the CLI replay recorded sequences through
//! [`ScriptedSource`].

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::posture::{AccelSample, StepSample};
use crate::error::SensorError;

/// One reading delivered by a sensor source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SensorReading {
    Accel(AccelSample),
    Steps(StepSample),
}

impl SensorReading {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            SensorReading::Accel(sample) => sample.at,
            SensorReading::Steps(sample) => sample.at,
        }
    }

    fn shift(&mut self, delta: Duration) {
        match self {
            SensorReading::Accel(sample) => sample.at += delta,
            SensorReading::Steps(sample) => sample.at += delta,
        }
    }
}

/// A restartable sequence of sensor readings.
///
/// `start` returning [`SensorError::Unavailable`] means monitoring never
/// begins and the alarm relies solely on the wall clock. A `poll` error
/// drops that reading; the caller logs it and keeps going.
pub trait SensorSource {
    fn start(&mut self) -> Result<(), SensorError>;

    fn stop(&mut self);

    /// Next reading due at or before `now`, if any. Readings are
    /// delivered in arrival order.
    fn poll(&mut self, now: DateTime<Utc>) -> Result<Option<SensorReading>, SensorError>;
}

/// Replays a recorded sequence of readings on their embedded timestamps.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    readings: VecDeque<SensorReading>,
    started: bool,
}

impl ScriptedSource {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        Self {
            readings: readings.into(),
            started: false,
        }
    }

    /// Shift every timestamp so the first reading lands at `start`.
    /// Lets a recorded trace replay against the live wall clock.
    pub fn rebase(&mut self, start: DateTime<Utc>) {
        let Some(first) = self.readings.front() else {
            return;
        };
        let delta = start - first.at();
        for reading in &mut self.readings {
            reading.shift(delta);
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.readings.is_empty()
    }
}

impl SensorSource for ScriptedSource {
    fn start(&mut self) -> Result<(), SensorError> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn poll(&mut self, now: DateTime<Utc>) -> Result<Option<SensorReading>, SensorError> {
        if !self.started {
            return Ok(None);
        }
        match self.readings.front() {
            Some(reading) if reading.at() <= now => Ok(self.readings.pop_front()),
            _ => Ok(None),
        }
    }
}

/// A source with no sensor behind it. `start` always fails, so the
/// engine degrades to the wall-clock-only path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

impl SensorSource for UnavailableSource {
    fn start(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Unavailable)
    }

    fn stop(&mut self) {}

    fn poll(&mut self, _now: DateTime<Utc>) -> Result<Option<SensorReading>, SensorError> {
        Ok(None)
    }
}
