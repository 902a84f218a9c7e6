use std::time::Instant;

pub const NUM_LANDMARKS: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}

/// The 21 landmarks of one hand, normalized to `[0, 1]` of the frame size.
///
/// Construction checks the point count, so every value of this type is a
/// complete hand and the classifier can index it freely.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [(f32, f32); NUM_LANDMARKS],
}

impl HandLandmarks {
    /// Returns `None` for anything but exactly 21 finite points.
    pub fn from_normalized(points: &[(f32, f32)]) -> Option<Self> {
        let points: [(f32, f32); NUM_LANDMARKS] = points.try_into().ok()?;
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return None;
        }
        Some(Self { points })
    }

    /// Builds a landmark set from frame-pixel coordinates.
    pub fn from_pixels(points: &[(f32, f32)], width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (width as f32, height as f32);
        let normalized: Vec<(f32, f32)> = points.iter().map(|&(x, y)| (x / w, y / h)).collect();
        Self::from_normalized(&normalized)
    }

    pub fn point(&self, idx: usize) -> (f32, f32) {
        self.points[idx]
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<(f32, f32)> {
        let (w, h) = (width as f32, height as f32);
        self.points().iter().map(|&(x, y)| (x * w, y * h)).collect()
    }
}
