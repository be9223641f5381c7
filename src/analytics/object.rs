use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::{Array4, ArrayViewD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;

use super::annotate::draw_regions;
use super::detector::{Detection, Detector, DetectorError};
use super::geometry::Polygon;
use crate::buffer::Frame;
use crate::config::{DetectorConfig, InferenceConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const YOLO_INPUT_SIZE: u32 = 640;
const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Hazard boxes from a YOLO-style ONNX model, reported as rectangle regions.
pub struct OnnxDetector {
    session: Session,
    confidence_threshold: f32,
    class_ids: Vec<usize>,
    outline_thickness: u32,
}

impl OnnxDetector {
    pub fn new(detector: &DetectorConfig, inference: &InferenceConfig) -> Result<Self, BoxError> {
        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        let model_path = detector.model_path.as_str();
        let session = if model_path.starts_with("http://") || model_path.starts_with("https://") {
            builder.commit_from_url(model_path)?
        } else {
            builder.commit_from_file(model_path)?
        };

        tracing::info!(model = %model_path, "onnx model loaded");

        Ok(Self {
            session,
            confidence_threshold: detector.confidence_threshold,
            class_ids: detector.class_ids.clone(),
            outline_thickness: inference.outline_thickness,
        })
    }

    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Polygon>, BoxError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, letterbox) = preprocess(image);

        let tensor_ref = TensorRef::from_array_view(input_tensor.view())?.into_dyn();
        let outputs = self.session.run(ort::inputs![tensor_ref])?;

        let (Some(logits_val), Some(boxes_val)) =
            (outputs.get("logits"), outputs.get("pred_boxes"))
        else {
            return Err("unsupported model: expected 'logits' and 'pred_boxes' outputs".into());
        };

        let logits = logits_val.try_extract_array::<f32>()?.to_owned();
        let boxes = boxes_val.try_extract_array::<f32>()?.to_owned();
        drop(outputs);

        postprocess(
            &logits.view(),
            &boxes.view(),
            self.confidence_threshold,
            &self.class_ids,
            letterbox,
            width as f32,
            height as f32,
        )
    }
}

impl Detector for OnnxDetector {
    fn detect(&mut self, frame: Frame) -> Result<Detection, DetectorError> {
        let regions = self
            .infer(frame.image())
            .map_err(|e| DetectorError::Model(e.to_string()))?;

        let mut annotated = frame;
        draw_regions(annotated.image_mut(), &regions, self.outline_thickness);

        Ok(Detection {
            annotated,
            regions: Some(regions),
        })
    }
}

fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let (cols, rows) = (image.width() as f32, image.height() as f32);
    let input_size = YOLO_INPUT_SIZE as f32;

    let scale = (input_size / cols).min(input_size / rows);
    let new_w = ((cols * scale).round() as u32).clamp(1, YOLO_INPUT_SIZE);
    let new_h = ((rows * scale).round() as u32).clamp(1, YOLO_INPUT_SIZE);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let pad_x = (YOLO_INPUT_SIZE - new_w) / 2;
    let pad_y = (YOLO_INPUT_SIZE - new_h) / 2;

    let mut padded = RgbImage::from_pixel(YOLO_INPUT_SIZE, YOLO_INPUT_SIZE, LETTERBOX_FILL);
    imageops::replace(&mut padded, &resized, pad_x as i64, pad_y as i64);

    let size = YOLO_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in padded.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

fn postprocess(
    logits: &ArrayViewD<f32>,
    boxes: &ArrayViewD<f32>,
    confidence_threshold: f32,
    class_ids: &[usize],
    letterbox: Letterbox,
    orig_w: f32,
    orig_h: f32,
) -> Result<Vec<Polygon>, BoxError> {
    let logits_shape = logits.shape();
    let boxes_shape = boxes.shape();

    // Expected shapes: logits [1, N, C], boxes [1, N, 4]
    if logits_shape.len() < 2 || boxes_shape.len() < 2 {
        return Ok(Vec::new());
    }

    let (num_detections, num_classes) = if logits_shape.len() == 3 {
        (logits_shape[1], logits_shape[2])
    } else {
        (logits_shape[0], logits_shape[1])
    };

    let logits_flat = logits.as_slice().ok_or("cannot get logits slice")?;
    let boxes_flat = boxes.as_slice().ok_or("cannot get boxes slice")?;
    if boxes_flat.len() < num_detections * 4 || logits_flat.len() < num_detections * num_classes {
        return Err("model outputs are shorter than their declared shape".into());
    }

    let input_size = YOLO_INPUT_SIZE as f32;
    let Letterbox {
        scale,
        pad_x,
        pad_y,
    } = letterbox;
    let mut regions = Vec::new();

    for i in 0..num_detections {
        let mut max_score = 0.0f32;
        let mut max_class = 0usize;

        for j in 0..num_classes {
            let logit = logits_flat[i * num_classes + j];
            let score = 1.0 / (1.0 + (-logit).exp()); // sigmoid
            if score > max_score {
                max_score = score;
                max_class = j;
            }
        }

        if max_score < confidence_threshold {
            continue;
        }
        if !class_ids.is_empty() && !class_ids.contains(&max_class) {
            continue;
        }

        // (cx, cy, w, h) normalized to the letterboxed input
        let cx = boxes_flat[i * 4] * input_size;
        let cy = boxes_flat[i * 4 + 1] * input_size;
        let w = boxes_flat[i * 4 + 2] * input_size;
        let h = boxes_flat[i * 4 + 3] * input_size;

        let x1 = (((cx - w / 2.0) - pad_x) / scale).clamp(0.0, orig_w);
        let y1 = (((cy - h / 2.0) - pad_y) / scale).clamp(0.0, orig_h);
        let x2 = (((cx + w / 2.0) - pad_x) / scale).clamp(0.0, orig_w);
        let y2 = (((cy + h / 2.0) - pad_y) / scale).clamp(0.0, orig_h);

        regions.push(Polygon::rectangle(
            x1 as i32, y1 as i32, x2 as i32, y2 as i32,
        ));
    }

    Ok(regions)
}
