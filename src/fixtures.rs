//! Synthetic hands for tests, in normalized coordinates of a mirrored 4:3 frame.

use crate::types::{
    HandLandmarks, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP,
    RING_TIP, THUMB_IP, THUMB_TIP, WRIST,
};

#[derive(Clone, Copy, Debug)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    fn tip(self) -> usize {
        match self {
            Finger::Thumb => THUMB_TIP,
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }
}

pub fn open_points() -> Vec<(f32, f32)> {
    vec![
        (0.50, 0.85),
        // thumb
        (0.56, 0.80),
        (0.61, 0.75),
        (0.65, 0.70),
        (0.69, 0.66),
        // index
        (0.57, 0.60),
        (0.58, 0.50),
        (0.59, 0.44),
        (0.60, 0.38),
        // middle
        (0.50, 0.58),
        (0.50, 0.47),
        (0.50, 0.41),
        (0.50, 0.35),
        // ring
        (0.44, 0.60),
        (0.43, 0.50),
        (0.425, 0.45),
        (0.42, 0.40),
        // pinky
        (0.39, 0.64),
        (0.37, 0.57),
        (0.36, 0.53),
        (0.35, 0.49),
    ]
}

pub fn hand(points: &[(f32, f32)]) -> HandLandmarks {
    HandLandmarks::from_normalized(points).expect("fixture has 21 points")
}

pub fn open_hand() -> HandLandmarks {
    hand(&open_points())
}

/// Folds the tip below its PIP joint, or tucks the thumb across the palm.
pub fn curl(mut points: Vec<(f32, f32)>, finger: Finger) -> Vec<(f32, f32)> {
    match finger {
        Finger::Thumb => {
            points[THUMB_IP] = (0.62, 0.72);
            points[THUMB_TIP] = (0.58, 0.70);
        }
        Finger::Index => fold(&mut points, INDEX_PIP),
        Finger::Middle => fold(&mut points, MIDDLE_PIP),
        Finger::Ring => fold(&mut points, RING_PIP),
        Finger::Pinky => fold(&mut points, PINKY_PIP),
    }
    points
}

fn fold(points: &mut [(f32, f32)], pip: usize) {
    let mcp = points[pip - 1];
    let (_, pip_y) = points[pip];
    points[pip + 1] = (mcp.0 + 0.01, pip_y + 0.04);
    points[pip + 2] = (mcp.0, pip_y + 0.06);
}

pub fn fist() -> HandLandmarks {
    let mut points = open_points();
    for finger in [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ] {
        points = curl(points, finger);
    }
    hand(&points)
}

pub fn thumbs_up() -> HandLandmarks {
    let mut points = open_points();
    for finger in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
        points = curl(points, finger);
    }
    hand(&points)
}

/// Moves the first fingertip next to the second one on an otherwise open hand.
pub fn pinch(moving: Finger, target: Finger) -> HandLandmarks {
    let mut points = open_points();
    let (x, y) = points[target.tip()];
    points[moving.tip()] = (x + 0.01, y + 0.01);
    hand(&points)
}

/// Open hand shifted so the index fingertip sits at `(x, y)`.
pub fn pinch_at(moving: Finger, target: Finger, x: f32, y: f32) -> HandLandmarks {
    let base = pinch(moving, target);
    let (tip_x, tip_y) = base.point(INDEX_TIP);
    let shifted: Vec<(f32, f32)> = base
        .points()
        .iter()
        .map(|&(px, py)| (px + x - tip_x, py + y - tip_y))
        .collect();
    hand(&shifted)
}

/// Same pose scaled about the wrist, as if the hand moved toward or away from the camera.
pub fn scaled(hand: &HandLandmarks, factor: f32) -> HandLandmarks {
    let (wx, wy) = hand.point(WRIST);
    let points: Vec<(f32, f32)> = hand
        .points()
        .iter()
        .map(|&(x, y)| (wx + (x - wx) * factor, wy + (y - wy) * factor))
        .collect();
    self::hand(&points)
}
