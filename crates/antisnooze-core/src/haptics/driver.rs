use serde::{Deserialize, Serialize};

use crate::alarm::VibrationIntensity;

/// Haptic pulse kinds, mirroring the device's built-in patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticPulse {
    Notification,
    Click,
    DirectionUp,
    Success,
    Start,
}

impl HapticPulse {
    /// The pulse used for continuous vibration at a given intensity.
    pub fn for_intensity(intensity: VibrationIntensity) -> Self {
        match intensity {
            VibrationIntensity::Light => HapticPulse::Notification,
            VibrationIntensity::Medium => HapticPulse::DirectionUp,
            VibrationIntensity::Strong => HapticPulse::Success,
        }
    }
}

/// Haptic collaborator. Each `play` is a fire-and-forget device
/// invocation; the controller never blocks on it.
pub trait HapticDriver {
    fn play(&mut self, pulse: HapticPulse);
}

/// Discards every pulse. For headless runs and tests that only care
/// about controller state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHaptics;

impl HapticDriver for NullHaptics {
    fn play(&mut self, _pulse: HapticPulse) {}
}

/// Records pulses for assertion in tests. The shared handle stays
/// readable after the driver moves into the controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingHaptics {
    log: std::sync::Arc<std::sync::Mutex<Vec<HapticPulse>>>,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> Vec<HapticPulse> {
        self.log.lock().expect("haptics log poisoned").clone()
    }
}

impl HapticDriver for RecordingHaptics {
    fn play(&mut self, pulse: HapticPulse) {
        self.log.lock().expect("haptics log poisoned").push(pulse);
    }
}
