mod posture;
mod source;

pub use posture::{AccelSample, ClassifierConfig, PostureClassifier, SleepState, StepSample};
pub use source::{ScriptedSource, SensorReading, SensorSource, UnavailableSource};
