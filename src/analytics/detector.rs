use thiserror::Error;

use super::geometry::Polygon;
use crate::buffer::Frame;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("detector responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed detector response: {0}")]
    Response(#[from] serde_json::Error),
    #[error("failed to encode frame for detector: {0}")]
    Encode(#[from] crate::codec::EncodeError),
    #[error("model inference failed: {0}")]
    Model(String),
}

/// Output of one detector call.
#[derive(Debug)]
pub struct Detection {
    pub annotated: Frame,
    /// `None` when the model reported no region output at all.
    pub regions: Option<Vec<Polygon>>,
}

impl Detection {
    pub fn regions(&self) -> &[Polygon] {
        self.regions.as_deref().unwrap_or_default()
    }
}

/// Black-box hazard detector. Only the inference loop calls it, one frame at a time.
pub trait Detector: Send {
    fn detect(&mut self, frame: Frame) -> Result<Detection, DetectorError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: Frame) -> Result<Detection, DetectorError> {
        (**self).detect(frame)
    }
}
