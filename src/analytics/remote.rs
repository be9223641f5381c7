use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use super::annotate::draw_regions;
use super::detector::{Detection, Detector, DetectorError};
use super::geometry::{Point, Polygon};
use crate::buffer::Frame;
use crate::codec;
use crate::config::{DetectorConfig, InferenceConfig};

/// Wire format returned by the detection endpoint. Coordinates may be fractional.
#[derive(Debug, Deserialize)]
struct RegionsResponse {
    #[serde(default)]
    regions: Option<Vec<Vec<[f64; 2]>>>,
}

/// Detector backed by an HTTP inference endpoint. The frame is posted as JPEG
/// and the returned polygons are drawn onto the frame locally.
pub struct RemoteDetector {
    client: Client,
    url: String,
    jpeg_quality: u8,
    outline_thickness: u32,
}

impl RemoteDetector {
    /// Builds a blocking client, so it must not be called from async context.
    pub fn new(
        detector: &DetectorConfig,
        inference: &InferenceConfig,
    ) -> Result<Self, DetectorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(detector.connect_timeout_ms))
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self {
            client,
            url: detector.url.clone(),
            jpeg_quality: inference.jpeg_quality,
            outline_thickness: inference.outline_thickness,
        })
    }
}

impl Detector for RemoteDetector {
    fn detect(&mut self, frame: Frame) -> Result<Detection, DetectorError> {
        let jpeg = codec::encode_jpeg(frame.image(), self.jpeg_quality)?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "image/jpeg")
            .body(jpeg)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectorError::Status(status));
        }

        let body = response.bytes()?;
        let regions = parse_regions(&body)?;

        let mut annotated = frame;
        if let Some(regions) = &regions {
            draw_regions(annotated.image_mut(), regions, self.outline_thickness);
        }

        tracing::trace!(
            regions = regions.as_ref().map(Vec::len).unwrap_or(0),
            "remote detection complete"
        );

        Ok(Detection { annotated, regions })
    }
}

fn parse_regions(body: &[u8]) -> Result<Option<Vec<Polygon>>, serde_json::Error> {
    let response: RegionsResponse = serde_json::from_slice(body)?;
    Ok(response.regions.map(|regions| {
        regions
            .into_iter()
            .map(|points| {
                Polygon::new(
                    points
                        .into_iter()
                        .map(|[x, y]| Point::new(x as i32, y as i32))
                        .collect(),
                )
            })
            .collect()
    }))
}
