mod common;
mod ort;
mod palm;

use crate::types::{Frame, HandLandmarks};

pub use self::ort::OrtLandmarkSource;
pub use self::palm::PalmDetectorConfig;

/// Finds the first hand in a frame.
///
/// `Ok(None)` is the normal "no hand" answer; `Err` is a failure confined to
/// this frame.
pub trait LandmarkSource {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<HandLandmarks>>;
}

#[derive(Clone, Debug)]
pub struct LandmarkSourceConfig {
    pub palm: PalmDetectorConfig,
    /// Minimum hand-pose confidence for the landmarks to count as a hand.
    pub min_hand_confidence: f32,
}

impl Default for LandmarkSourceConfig {
    fn default() -> Self {
        Self {
            palm: PalmDetectorConfig::default(),
            min_hand_confidence: 0.7,
        }
    }
}
