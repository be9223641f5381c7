mod annotate;
mod decision;
mod detector;
mod geometry;
mod inference;
#[cfg(feature = "onnx")]
mod object;
mod remote;

pub use decision::Command;
pub use detector::Detector;
pub use inference::spawn_inference;
#[cfg(feature = "onnx")]
pub use object::OnnxDetector;
pub use remote::RemoteDetector;
