use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    LandmarkSource, LandmarkSourceConfig,
    common::{self, HANDPOSE_INPUT_SIZE},
    palm::{PalmDetector, crop_from_palm},
};
use crate::types::{Frame, HandLandmarks};

/// MediaPipe palm detector followed by the hand-pose estimator, both on ONNX Runtime.
pub struct OrtLandmarkSource {
    handpose: Session,
    palm_detector: PalmDetector,
    min_hand_confidence: f32,
}

impl OrtLandmarkSource {
    pub fn new(
        handpose_model_path: &Path,
        palm_detector_model_path: &Path,
        cfg: LandmarkSourceConfig,
    ) -> Result<Self> {
        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(handpose_model_path)
            .with_context(|| {
                format!(
                    "failed to load hand-pose model from {}",
                    handpose_model_path.display()
                )
            })?;

        let palm_detector = PalmDetector::new(palm_detector_model_path, cfg.palm)?;

        log::info!(
            "landmark source ready: hand-pose {} / palm {}",
            handpose_model_path.display(),
            palm_detector_model_path.display()
        );

        Ok(Self {
            handpose,
            palm_detector,
            min_hand_confidence: cfg.min_hand_confidence,
        })
    }
}

impl LandmarkSource for OrtLandmarkSource {
    fn detect(&mut self, frame: &Frame) -> Result<Option<HandLandmarks>> {
        let palms = self.palm_detector.detect(frame)?;
        // Regions come back best-first; only the first hand drives the pointer.
        let Some(palm) = palms.first() else {
            return Ok(None);
        };

        let (center, side, angle) = crop_from_palm(palm);
        let (input, transform) =
            common::prepare_rotated_crop(frame, center, side, angle, HANDPOSE_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .handpose
            .run(ort::inputs![tensor])
            .context("failed to run hand-pose session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "hand-pose model returned {} outputs, expected at least 2",
                outputs.len()
            ));
        }

        let confidence = outputs[1]
            .try_extract_array::<f32>()?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);
        if confidence < self.min_hand_confidence {
            log::trace!("hand-pose confidence {confidence:.2} below threshold");
            return Ok(None);
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let projected: Vec<(f32, f32)> = common::decode_landmarks(&flattened)?
            .iter()
            .map(|[x, y, _z]| transform.project(*x, *y))
            .collect();

        Ok(HandLandmarks::from_pixels(&projected, frame.width, frame.height))
    }
}
