pub mod detector;
pub mod landmark;
#[cfg(feature = "onnx")]
pub mod movenet;

pub use detector::LandmarkDetector;
pub use landmark::{Landmark, LandmarkName, LandmarkSet};
#[cfg(feature = "onnx")]
pub use movenet::{MoveNetDetector, MoveNetThresholds};
