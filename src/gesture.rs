use crate::types::{
    HandLandmarks, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP,
    RING_TIP, THUMB_IP, THUMB_TIP,
};

/// Two fingertips touch when their pixel distance is below this fraction of the
/// hand's pixel extent, so the threshold follows camera resolution and hand distance.
const TOUCH_SPAN_RATIO: f32 = 0.2;

// (tip, pip) for index, middle, ring, pinky.
const FINGER_JOINTS: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GesturePredicates {
    /// Thumb, index, middle, ring, pinky.
    pub fingers_up: [bool; 5],
    pub thumb_index_touching: bool,
    pub index_middle_touching: bool,
    pub thumb_ring_touching: bool,
    pub is_fist: bool,
    pub is_thumb_up: bool,
}

impl GesturePredicates {
    pub fn all_fingers_up(&self) -> bool {
        self.fingers_up.iter().all(|up| *up)
    }

    /// Five-character pattern such as `01100`, thumb first.
    pub fn finger_pattern(&self) -> String {
        self.fingers_up
            .iter()
            .map(|up| if *up { '1' } else { '0' })
            .collect()
    }
}

pub fn classify(landmarks: &HandLandmarks, frame_width: u32, frame_height: u32) -> GesturePredicates {
    let projected = landmarks.to_pixels(frame_width, frame_height);
    let touch_threshold = projected_span(&projected) * TOUCH_SPAN_RATIO;
    let touching = |a: usize, b: usize| distance(projected[a], projected[b]) < touch_threshold;

    let fingers_up = fingers_up(landmarks);
    let others_curled = fingers_up[1..].iter().all(|up| !up);

    GesturePredicates {
        fingers_up,
        thumb_index_touching: touching(THUMB_TIP, INDEX_TIP),
        index_middle_touching: touching(INDEX_TIP, MIDDLE_TIP),
        thumb_ring_touching: touching(THUMB_TIP, RING_TIP),
        is_fist: others_curled,
        is_thumb_up: fingers_up[0] && others_curled,
    }
}

fn fingers_up(landmarks: &HandLandmarks) -> [bool; 5] {
    let mut up = [false; 5];

    // The image is mirrored, so an extended thumb points to the right of its IP joint.
    up[0] = landmarks.point(THUMB_TIP).0 > landmarks.point(THUMB_IP).0;

    for (slot, (tip, pip)) in up[1..].iter_mut().zip(FINGER_JOINTS) {
        *slot = landmarks.point(tip).1 < landmarks.point(pip).1;
    }

    up
}

fn projected_span(points: &[(f32, f32)]) -> f32 {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;

    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    (max_x - min_x).max(max_y - min_y).max(1.0)
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Finger};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn open_hand_has_all_fingers_up() {
        let predicates = classify(&fixtures::open_hand(), 640, 480);
        assert_eq!(predicates.fingers_up, [true; 5]);
        assert!(predicates.all_fingers_up());
        assert_eq!(predicates.finger_pattern(), "11111");
        assert!(!predicates.is_fist);
        assert!(!predicates.is_thumb_up);
        assert!(!predicates.thumb_index_touching);
        assert!(!predicates.index_middle_touching);
        assert!(!predicates.thumb_ring_touching);
    }

    #[test]
    fn curled_finger_is_reported_down() {
        let hand = fixtures::hand(&fixtures::curl(fixtures::open_points(), Finger::Middle));
        let predicates = classify(&hand, 640, 480);
        assert_eq!(predicates.fingers_up, [true, true, false, true, true]);
        assert_eq!(predicates.finger_pattern(), "11011");
        assert!(!predicates.is_fist);
    }

    #[test]
    fn thumb_tucked_left_of_its_joint_is_down() {
        let hand = fixtures::hand(&fixtures::curl(fixtures::open_points(), Finger::Thumb));
        let predicates = classify(&hand, 640, 480);
        assert_eq!(predicates.fingers_up, [false, true, true, true, true]);
    }

    #[test]
    fn fist_curls_all_four_fingers() {
        let predicates = classify(&fixtures::fist(), 640, 480);
        assert_eq!(predicates.fingers_up, [false; 5]);
        assert!(predicates.is_fist);
        assert!(!predicates.is_thumb_up);
    }

    #[test]
    fn thumbs_up_is_also_a_fist() {
        let predicates = classify(&fixtures::thumbs_up(), 640, 480);
        assert_eq!(predicates.fingers_up, [true, false, false, false, false]);
        assert!(predicates.is_thumb_up);
        assert!(predicates.is_fist);
    }

    #[test]
    fn pinches_are_detected_per_pair() {
        let cases = [
            (fixtures::pinch(Finger::Thumb, Finger::Index), (true, false, false)),
            (fixtures::pinch(Finger::Index, Finger::Middle), (false, true, false)),
            (fixtures::pinch(Finger::Thumb, Finger::Ring), (false, false, true)),
        ];

        for (hand, (thumb_index, index_middle, thumb_ring)) in cases {
            let predicates = classify(&hand, 640, 480);
            assert_eq!(predicates.thumb_index_touching, thumb_index);
            assert_eq!(predicates.index_middle_touching, index_middle);
            assert_eq!(predicates.thumb_ring_touching, thumb_ring);
        }
    }

    #[test]
    fn touch_threshold_does_not_depend_on_resolution() {
        let hand = fixtures::pinch(Finger::Thumb, Finger::Index);
        for (w, h) in [(320, 240), (640, 480), (1920, 1440)] {
            let predicates = classify(&hand, w, h);
            assert!(predicates.thumb_index_touching, "missed pinch at {w}x{h}");
        }

        let open = fixtures::open_hand();
        for (w, h) in [(320, 240), (640, 480), (1920, 1440)] {
            assert!(!classify(&open, w, h).thumb_index_touching);
        }
    }

    #[test]
    fn touch_threshold_follows_hand_distance() {
        let pairs = [
            (Finger::Thumb, Finger::Index),
            (Finger::Index, Finger::Middle),
        ];
        for factor in [0.4, 1.0, 1.6] {
            let open = classify(&fixtures::scaled(&fixtures::open_hand(), factor), 640, 480);
            assert!(!open.thumb_index_touching, "open hand at {factor}x");
            assert!(!open.index_middle_touching, "open hand at {factor}x");

            for (moving, target) in pairs {
                let pinch = fixtures::scaled(&fixtures::pinch(moving, target), factor);
                let predicates = classify(&pinch, 640, 480);
                let touching = match moving {
                    Finger::Thumb => predicates.thumb_index_touching,
                    _ => predicates.index_middle_touching,
                };
                assert!(touching, "{moving:?}-{target:?} pinch at {factor}x");
            }
        }
    }

    #[test]
    fn classify_is_deterministic() {
        let hand = fixtures::pinch(Finger::Thumb, Finger::Ring);
        let first = classify(&hand, 640, 480);
        for _ in 0..10 {
            assert_eq!(classify(&hand, 640, 480), first);
        }
    }

    #[test]
    fn span_uses_the_larger_side() {
        let span = projected_span(&[(10.0, 10.0), (110.0, 40.0)]);
        assert_approx_eq!(span, 100.0);
        assert_approx_eq!(projected_span(&[(5.0, 5.0)]), 1.0);
    }
}
