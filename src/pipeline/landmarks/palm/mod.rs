mod anchors;

use std::{cmp::Ordering, f32::consts::PI, path::Path};

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use crate::types::{Frame, PalmRegion};

use super::common::{LetterboxInfo, PALM_INPUT_SIZE, prepare_frame_with_size};

const PALM_LANDMARKS: usize = 7;

#[derive(Clone, Debug)]
pub struct PalmDetectorConfig {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
}

impl Default for PalmDetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            nms_threshold: 0.3,
            top_k: 1,
        }
    }
}

pub struct PalmDetector {
    session: Session,
    anchors: Vec<[f32; 2]>,
    cfg: PalmDetectorConfig,
}

impl PalmDetector {
    pub fn new(model_path: &Path, cfg: PalmDetectorConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load palm detector from {}", model_path.display())
            })?;

        Ok(Self {
            session,
            anchors: anchors::generate_anchors(PALM_INPUT_SIZE),
            cfg,
        })
    }

    /// Palm regions in frame pixels, best score first.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>> {
        let (input, letterbox) = prepare_frame_with_size(frame, PALM_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run palm detector session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "palm detector returned {} outputs, expected at least 2",
                outputs.len()
            ));
        }

        let boxes = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;

        let raw = RawPalmOutput {
            boxes: boxes
                .as_slice()
                .ok_or_else(|| anyhow!("palm boxes not contiguous"))?,
            box_shape: boxes.shape(),
            scores: scores
                .as_slice()
                .ok_or_else(|| anyhow!("palm scores not contiguous"))?,
            score_shape: scores.shape(),
        };

        decode_palm_outputs(&raw, &self.anchors, &letterbox, &self.cfg)
    }
}

struct RawPalmOutput<'a> {
    boxes: &'a [f32],
    box_shape: &'a [usize],
    scores: &'a [f32],
    score_shape: &'a [usize],
}

fn trailing_dims(shape: &[usize], what: &str) -> Result<(usize, usize)> {
    match shape {
        [.., anchors, features] => Ok((*anchors, *features)),
        _ => Err(anyhow!(
            "unexpected palm {what} shape {shape:?}, need [batch, anchors, features]"
        )),
    }
}

fn decode_palm_outputs(
    raw: &RawPalmOutput<'_>,
    anchors: &[[f32; 2]],
    letterbox: &LetterboxInfo,
    cfg: &PalmDetectorConfig,
) -> Result<Vec<PalmRegion>> {
    let (anchor_dim, feature_dim) = trailing_dims(raw.box_shape, "box")?;
    let (score_anchor_dim, score_feature_dim) = trailing_dims(raw.score_shape, "score")?;

    if feature_dim < 4 + PALM_LANDMARKS * 2 {
        return Err(anyhow!(
            "palm box feature dimension too small: {feature_dim}"
        ));
    }
    if score_feature_dim == 0 {
        return Err(anyhow!("palm score tensor has no features"));
    }
    if anchor_dim != score_anchor_dim {
        return Err(anyhow!(
            "anchor dimension mismatch between boxes ({anchor_dim}) and scores ({score_anchor_dim})"
        ));
    }
    if raw.boxes.len() < anchor_dim * feature_dim || raw.scores.len() < anchor_dim * score_feature_dim
    {
        return Err(anyhow!("palm detector outputs shorter than their shapes"));
    }

    let scale = letterbox.orig_w.max(letterbox.orig_h) as f32;
    let pad_bias_x = letterbox.pad_x / letterbox.scale;
    let pad_bias_y = letterbox.pad_y / letterbox.scale;
    let target_input = PALM_INPUT_SIZE as f32;
    let to_frame = |v: f32, anchor: f32, bias: f32| (v / target_input + anchor) * scale - bias;

    let mut candidates = Vec::new();
    for (anchor_idx, anchor) in anchors.iter().enumerate().take(anchor_dim) {
        let score = sigmoid(raw.scores[anchor_idx * score_feature_dim]);
        if score < cfg.score_threshold {
            continue;
        }

        let f = &raw.boxes[anchor_idx * feature_dim..(anchor_idx + 1) * feature_dim];
        let cx = to_frame(f[0], anchor[0], pad_bias_x);
        let cy = to_frame(f[1], anchor[1], pad_bias_y);
        let hw = f[2] / target_input * scale / 2.0;
        let hh = f[3] / target_input * scale / 2.0;
        if hw <= 0.0 || hh <= 0.0 {
            continue;
        }

        let mut bbox = [cx - hw, cy - hh, cx + hw, cy + hh];
        clamp_box(&mut bbox, letterbox.orig_w, letterbox.orig_h);

        let landmarks = f[4..4 + PALM_LANDMARKS * 2]
            .chunks_exact(2)
            .map(|p| {
                (
                    to_frame(p[0], anchor[0], pad_bias_x),
                    to_frame(p[1], anchor[1], pad_bias_y),
                )
            })
            .collect();

        candidates.push(PalmRegion {
            bbox,
            landmarks,
            score,
        });
    }

    let kept = nms(&candidates, cfg.nms_threshold, cfg.top_k);
    Ok(kept.into_iter().map(|idx| candidates[idx].clone()).collect())
}

/// Rotated square crop `(center, side, angle)` covering the whole hand.
pub fn crop_from_palm(region: &PalmRegion) -> ((f32, f32), f32, f32) {
    let center = if region.landmarks.is_empty() {
        (
            (region.bbox[0] + region.bbox[2]) * 0.5,
            (region.bbox[1] + region.bbox[3]) * 0.5,
        )
    } else {
        let (sum_x, sum_y) = region
            .landmarks
            .iter()
            .fold((0.0_f32, 0.0_f32), |acc, p| (acc.0 + p.0, acc.1 + p.1));
        (
            sum_x / region.landmarks.len() as f32,
            sum_y / region.landmarks.len() as f32,
        )
    };

    let base_w = (region.bbox[2] - region.bbox[0]).abs();
    let base_h = (region.bbox[3] - region.bbox[1]).abs();
    let landmark_span = if region.landmarks.is_empty() {
        0.0
    } else {
        let (min_x, max_x, min_y, max_y) = region
            .landmarks
            .iter()
            .fold((f32::MAX, f32::MIN, f32::MAX, f32::MIN), |acc, (x, y)| {
                (acc.0.min(*x), acc.1.max(*x), acc.2.min(*y), acc.3.max(*y))
            });
        (max_x - min_x).max(max_y - min_y)
    };
    // Expand generously to avoid cropping fingers away.
    let side = base_w.max(base_h).max(landmark_span).max(80.0) * 2.4;

    (center, side, estimate_orientation(region))
}

fn estimate_orientation(region: &PalmRegion) -> f32 {
    if region.landmarks.len() < 2 {
        return 0.0;
    }

    let n = region.landmarks.len() as f32;
    let (sx, sy) = region
        .landmarks
        .iter()
        .fold((0.0_f32, 0.0_f32), |acc, (x, y)| (acc.0 + x, acc.1 + y));
    let mean = (sx / n, sy / n);

    // Principal axis of the palm keypoints from their 2x2 covariance.
    let (mut cov_xx, mut cov_xy, mut cov_yy) = (0.0, 0.0, 0.0);
    for (x, y) in &region.landmarks {
        let dx = x - mean.0;
        let dy = y - mean.1;
        cov_xx += dx * dx;
        cov_xy += dx * dy;
        cov_yy += dy * dy;
    }
    cov_xx /= n;
    cov_xy /= n;
    cov_yy /= n;

    let trace = cov_xx + cov_yy;
    let det = cov_xx * cov_yy - cov_xy * cov_xy;
    let lambda1 = (trace * 0.5 + ((trace * 0.5).powi(2) - det).max(0.0).sqrt()).max(1e-6);
    let (vx, vy) = if cov_xy.abs() > 1e-6 {
        (lambda1 - cov_yy, cov_xy)
    } else if cov_xx >= cov_yy {
        (1.0, 0.0)
    } else {
        (0.0, 1.0)
    };

    // Rotate so the fingers point up in the crop.
    vy.atan2(vx) - PI * 0.5
}

fn nms(candidates: &[PalmRegion], threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| {
        candidates[*b]
            .score
            .partial_cmp(&candidates[*a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for idx in order {
        if keep.len() >= top_k {
            break;
        }
        let overlaps = keep
            .iter()
            .any(|&k| iou(&candidates[idx].bbox, &candidates[k].bbox) >= threshold);
        if !overlaps {
            keep.push(idx);
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;
    if inter <= 0.0 {
        return 0.0;
    }

    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn clamp_box(bbox: &mut [f32; 4], w: u32, h: u32) {
    let max_w = (w.saturating_sub(1)) as f32;
    let max_h = (h.saturating_sub(1)) as f32;
    bbox[0] = bbox[0].clamp(0.0, max_w);
    bbox[1] = bbox[1].clamp(0.0, max_h);
    bbox[2] = bbox[2].clamp(0.0, max_w);
    bbox[3] = bbox[3].clamp(0.0, max_h);
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    const FEATURES: usize = 18;

    fn region(bbox: [f32; 4], score: f32) -> PalmRegion {
        PalmRegion {
            bbox,
            landmarks: Vec::new(),
            score,
        }
    }

    fn square_letterbox() -> LetterboxInfo {
        LetterboxInfo {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_w: 192,
            orig_h: 192,
        }
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_approx_eq!(iou(&a, &a), 1.0);
        assert_approx_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert_approx_eq!(iou(&a, &[5.0, 0.0, 15.0, 10.0]), 50.0 / 150.0);
    }

    #[test]
    fn nms_keeps_best_of_overlapping_boxes() {
        let candidates = vec![
            region([0.0, 0.0, 10.0, 10.0], 0.8),
            region([1.0, 1.0, 11.0, 11.0], 0.9),
            region([50.0, 50.0, 60.0, 60.0], 0.75),
        ];
        assert_eq!(nms(&candidates, 0.3, 8), vec![1, 2]);
        assert_eq!(nms(&candidates, 0.3, 1), vec![1]);
    }

    #[test]
    fn decodes_a_confident_anchor() {
        let anchors = anchors::generate_anchors(PALM_INPUT_SIZE);
        let count = 4;
        let mut boxes = vec![0.0; count * FEATURES];
        let mut scores = vec![-10.0; count];

        // Anchor 2 sits at (1.5/24, 0.5/24) of the input; offset it and give it a 48px box.
        scores[2] = 5.0;
        boxes[2 * FEATURES..2 * FEATURES + 4].copy_from_slice(&[12.0, 24.0, 48.0, 48.0]);

        let raw = RawPalmOutput {
            boxes: &boxes,
            box_shape: &[1, count, FEATURES],
            scores: &scores,
            score_shape: &[1, count, 1],
        };
        let regions =
            decode_palm_outputs(&raw, &anchors, &square_letterbox(), &PalmDetectorConfig::default())
                .unwrap();

        assert_eq!(regions.len(), 1);
        let palm = &regions[0];
        let cx = 1.5 / 24.0 * 192.0 + 12.0;
        let cy = 0.5 / 24.0 * 192.0 + 24.0;
        assert_approx_eq!(palm.bbox[0], cx - 24.0, 1e-3);
        assert_approx_eq!(palm.bbox[1], cy - 24.0, 1e-3);
        assert_approx_eq!(palm.bbox[2], cx + 24.0, 1e-3);
        assert_eq!(palm.landmarks.len(), PALM_LANDMARKS);
        assert!(palm.score > 0.99);
    }

    #[test]
    fn rejects_narrow_feature_vectors() {
        let anchors = anchors::generate_anchors(PALM_INPUT_SIZE);
        let raw = RawPalmOutput {
            boxes: &[0.0; 8],
            box_shape: &[1, 2, 4],
            scores: &[0.0; 2],
            score_shape: &[1, 2, 1],
        };
        let err = decode_palm_outputs(
            &raw,
            &anchors,
            &square_letterbox(),
            &PalmDetectorConfig::default(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_score_features() {
        let anchors = anchors::generate_anchors(PALM_INPUT_SIZE);
        let boxes = vec![0.0; 2 * FEATURES];
        let raw = RawPalmOutput {
            boxes: &boxes,
            box_shape: &[1, 2, FEATURES],
            scores: &[],
            score_shape: &[1, 2, 0],
        };
        let err = decode_palm_outputs(
            &raw,
            &anchors,
            &square_letterbox(),
            &PalmDetectorConfig::default(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn crop_covers_the_palm_generously() {
        let palm = PalmRegion {
            bbox: [100.0, 100.0, 200.0, 200.0],
            landmarks: vec![(150.0, 120.0), (150.0, 180.0)],
            score: 0.9,
        };
        let (center, side, angle) = crop_from_palm(&palm);
        assert_approx_eq!(center.0, 150.0);
        assert_approx_eq!(center.1, 150.0);
        assert_approx_eq!(side, 240.0);
        // Vertical keypoints need no rotation.
        assert_approx_eq!(angle, 0.0, 1e-5);
    }
}
