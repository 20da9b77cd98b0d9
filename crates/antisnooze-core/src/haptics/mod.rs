mod controller;
mod driver;

pub use controller::{VibrationConfig, VibrationController, VibrationState};
pub use driver::{HapticDriver, HapticPulse, NullHaptics, RecordingHaptics};
