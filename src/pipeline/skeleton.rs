use crate::types::{Frame, HandLandmarks};

pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

const LINE_COLOR: [u8; 4] = [56, 189, 248, 255];
const POINT_COLOR: [u8; 4] = [248, 113, 113, 255];
const LINE_THICKNESS: i32 = 3;
const POINT_RADIUS: i32 = 4;

/// Draws the hand skeleton onto the frame's RGBA buffer.
pub fn draw_hand(frame: &mut Frame, hand: &HandLandmarks) {
    let (width, height) = (frame.width, frame.height);
    let points: Vec<(i32, i32)> = hand
        .to_pixels(width, height)
        .into_iter()
        .map(|(x, y)| (within_reach(x, width), within_reach(y, height)))
        .collect();
    let mut canvas = Canvas {
        buffer: &mut frame.rgba,
        width: frame.width,
        height: frame.height,
    };

    for &(a, b) in CONNECTIONS {
        canvas.line(points[a], points[b], LINE_COLOR, LINE_THICKNESS);
    }
    for &point in &points {
        canvas.circle(point, POINT_RADIUS, POINT_COLOR);
    }
}

// Keeps line walks short for landmarks far off the frame.
fn within_reach(v: f32, extent: u32) -> i32 {
    let extent = extent as f32;
    v.clamp(-extent, 2.0 * extent) as i32
}

struct Canvas<'a> {
    buffer: &'a mut [u8],
    width: u32,
    height: u32,
}

impl Canvas<'_> {
    fn line(
        &mut self,
        (mut x0, mut y0): (i32, i32),
        (x1, y1): (i32, i32),
        color: [u8; 4],
        thickness: i32,
    ) {
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let radius = (thickness.max(1) - 1) / 2;

        loop {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox.abs() + oy.abs() <= radius {
                        self.put(x0 + ox, y0 + oy, color);
                    }
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn circle(&mut self, (cx, cy): (i32, i32), radius: i32, color: [u8; 4]) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) as usize) * 4;
        if let Some(px) = self.buffer.get_mut(idx..idx + 4) {
            px.copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::{fixtures, types::INDEX_TIP};

    fn blank(width: u32, height: u32) -> Frame {
        Frame {
            rgba: vec![0; (width * height * 4) as usize],
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn marks_landmark_pixels() {
        let mut frame = blank(64, 48);
        let hand = fixtures::open_hand();
        draw_hand(&mut frame, &hand);

        let (x, y) = hand.to_pixels(64, 48)[INDEX_TIP];
        let idx = ((y as u32 * 64 + x as u32) as usize) * 4;
        assert_eq!(&frame.rgba[idx..idx + 4], &POINT_COLOR);
    }

    #[test]
    fn clips_points_outside_the_frame() {
        let mut frame = blank(8, 8);
        let points = vec![(1.5, -0.5); 21];
        let hand = fixtures::hand(&points);
        draw_hand(&mut frame, &hand);
        assert!(frame.rgba.iter().all(|b| *b == 0));
    }

    #[test]
    fn far_away_points_are_drawn_quickly() {
        let mut frame = blank(8, 8);
        let mut points = vec![(1.0e6, -1.0e6); 21];
        points[0] = (-1.0e6, 1.0e6);
        let hand = fixtures::hand(&points);
        draw_hand(&mut frame, &hand);

        // The wrist-to-thumb segment crosses the frame diagonally.
        assert!(frame.rgba.chunks_exact(4).any(|px| px == LINE_COLOR));
    }
}
