use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, NUM_LANDMARKS};

pub const HANDPOSE_INPUT_SIZE: u32 = 224;
pub const PALM_INPUT_SIZE: u32 = 192;

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Maps hand-pose model coordinates in a rotated square crop back to frame pixels.
#[derive(Clone, Debug)]
pub struct CropTransform {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
    pub output_size: u32,
    pub orig_w: u32,
    pub orig_h: u32,
}

impl CropTransform {
    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let half = self.output_size as f32 / 2.0;
        let scale = self.side / self.output_size as f32;
        let dx = (x - half) * scale;
        let dy = (y - half) * scale;
        let (sin, cos) = self.angle.sin_cos();
        let ox = self.center.0 + dx * cos - dy * sin;
        let oy = self.center.1 + dx * sin + dy * cos;
        (
            ox.clamp(0.0, (self.orig_w.saturating_sub(1)) as f32),
            oy.clamp(0.0, (self.orig_h.saturating_sub(1)) as f32),
        )
    }
}

fn check_frame(frame: &Frame) -> Result<()> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len || expected_len == 0 {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }
    Ok(())
}

/// Letterboxes the frame into a `target_size` square NHWC tensor in `[0, 1]`.
pub fn prepare_frame_with_size(
    frame: &Frame,
    target_size: u32,
) -> Result<(Array4<f32>, LetterboxInfo)> {
    check_frame(frame)?;

    let scale = target_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, target_size);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size - new_w) / 2) as usize;
    let pad_y = ((target_size - new_h) / 2) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 4];
    let dst_stride = target_size as usize * 4;
    let src_stride = new_w as usize * 4;
    for (row, src_row) in resized.chunks_exact(src_stride).enumerate() {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        canvas[dst_offset..dst_offset + src_stride].copy_from_slice(src_row);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

/// Samples a rotated square around `center` into an `output_size` NHWC tensor.
pub fn prepare_rotated_crop(
    frame: &Frame,
    center: (f32, f32),
    side: f32,
    angle: f32,
    output_size: u32,
) -> Result<(Array4<f32>, CropTransform)> {
    check_frame(frame)?;

    let half = output_size as f32 / 2.0;
    let scale = side / output_size as f32;
    let (sin, cos) = angle.sin_cos();

    let data: Vec<f32> = (0..output_size)
        .into_par_iter()
        .flat_map_iter(|y| {
            let dy = (y as f32 + 0.5 - half) * scale;
            (0..output_size).flat_map(move |x| {
                let dx = (x as f32 + 0.5 - half) * scale;
                let src_x = center.0 + dx * cos - dy * sin;
                let src_y = center.1 + dx * sin + dy * cos;
                sample_rgb(frame, src_x, src_y)
            })
        })
        .collect();

    let array =
        Array4::<f32>::from_shape_vec((1, output_size as usize, output_size as usize, 3), data)
            .map_err(|err| anyhow!("failed to build rotated crop tensor: {err}"))?;

    let transform = CropTransform {
        center,
        side,
        angle,
        output_size,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((array, transform))
}

pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

fn sample_rgb(frame: &Frame, x: f32, y: f32) -> [f32; 3] {
    if x.is_nan() || y.is_nan() {
        return [0.0, 0.0, 0.0];
    }
    let x0 = x.floor();
    let y0 = y.floor();

    let (w, h) = (frame.width as i32, frame.height as i32);
    let fetch = |cx: f32, cy: f32| -> [f32; 3] {
        let (ix, iy) = (cx as i32, cy as i32);
        if ix < 0 || iy < 0 || ix >= w || iy >= h {
            return [0.0, 0.0, 0.0];
        }
        let idx = ((iy as u32 * frame.width + ix as u32) as usize) * 4;
        match frame.rgba.get(idx..idx + 3) {
            Some(px) => [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ],
            None => [0.0, 0.0, 0.0],
        }
    };

    let fx = x - x0;
    let fy = y - y0;
    let c00 = fetch(x0, y0);
    let c10 = fetch(x0 + 1.0, y0);
    let c01 = fetch(x0, y0 + 1.0);
    let c11 = fetch(x0 + 1.0, y0 + 1.0);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    std::array::from_fn(|c| lerp(lerp(c00[c], c10[c], fx), lerp(c01[c], c11[c], fx), fy))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Frame {
        Frame {
            rgba: vec![value; (width * height * 4) as usize],
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn letterbox_pads_the_short_side() {
        let (input, letterbox) = prepare_frame_with_size(&solid(64, 48, 255), 32).unwrap();
        assert_eq!(input.shape(), &[1, 32, 32, 3]);
        assert_approx_eq!(letterbox.scale, 0.5);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 4.0);
        assert_approx_eq!(input[[0, 0, 0, 0]], 0.0);
        assert_approx_eq!(input[[0, 16, 16, 1]], 1.0);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut frame = solid(4, 4, 0);
        frame.rgba.pop();
        assert!(prepare_frame_with_size(&frame, 8).is_err());
        assert!(prepare_rotated_crop(&frame, (2.0, 2.0), 4.0, 0.0, 8).is_err());
    }

    #[test]
    fn unrotated_crop_maps_center_to_center() {
        let (crop, transform) =
            prepare_rotated_crop(&solid(100, 80, 128), (50.0, 40.0), 40.0, 0.0, 20).unwrap();
        assert_eq!(crop.shape(), &[1, 20, 20, 3]);
        assert_approx_eq!(crop[[0, 10, 10, 2]], 128.0 / 255.0);

        let (x, y) = transform.project(10.0, 10.0);
        assert_approx_eq!(x, 50.0);
        assert_approx_eq!(y, 40.0);
        let (x, _) = transform.project(20.0, 10.0);
        assert_approx_eq!(x, 70.0);
    }

    #[test]
    fn quarter_turn_rotates_offsets() {
        let transform = CropTransform {
            center: (50.0, 50.0),
            side: 20.0,
            angle: std::f32::consts::FRAC_PI_2,
            output_size: 20,
            orig_w: 100,
            orig_h: 100,
        };
        let (x, y) = transform.project(20.0, 10.0);
        assert_approx_eq!(x, 50.0, 1e-4);
        assert_approx_eq!(y, 60.0, 1e-4);
    }

    #[test]
    fn decodes_first_twenty_one_points() {
        let flat: Vec<f32> = (0..70).map(|v| v as f32).collect();
        let points = decode_landmarks(&flat).unwrap();
        assert_eq!(points.len(), NUM_LANDMARKS);
        assert_eq!(points[20], [60.0, 61.0, 62.0]);
        assert!(decode_landmarks(&flat[..60]).is_err());
    }
}
