use std::convert::TryFrom;

use anyhow::{Result, anyhow};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

#[derive(Debug)]
pub struct RgbaFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RgbaFrame {
    /// Flips the image left-to-right so the preview behaves like a mirror.
    pub fn mirror(&mut self) {
        let row_len = self.width as usize * 4;
        if row_len == 0 {
            return;
        }
        self.rgba.par_chunks_exact_mut(row_len).for_each(|row| {
            let pixels = row.len() / 4;
            for left in 0..pixels / 2 {
                let right = pixels - 1 - left;
                for c in 0..4 {
                    row.swap(left * 4 + c, right * 4 + c);
                }
            }
        });
    }
}

pub fn convert_camera_frame(frame: &Buffer) -> Result<RgbaFrame> {
    let resolution = frame.resolution();
    let width = resolution.width_x;
    let height = resolution.height_y;
    let data = frame.buffer();

    let rgba = match frame.source_frame_format() {
        FrameFormat::NV12 => nv12_to_rgba(data, width, height)?,
        FrameFormat::YUYV => yuyv_to_rgba(data, width, height)?,
        FrameFormat::MJPEG => mjpeg_to_rgba(data, width, height)?,
        FrameFormat::RAWRGB => rgb_like_to_rgba(data, width, height, false)?,
        FrameFormat::RAWBGR => rgb_like_to_rgba(data, width, height, true)?,
        FrameFormat::GRAY => gray_to_rgba(data, width, height)?,
    };

    Ok(RgbaFrame {
        rgba,
        width,
        height,
    })
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn expect_len(label: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(anyhow!(
            "{label} buffer too small: got {}, expected {expected}",
            data.len()
        ));
    }
    Ok(())
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = pixel_count(width, height);
    let uv_plane_len = y_plane_len / 2;
    expect_len("NV12", data, y_plane_len + uv_plane_len)?;

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgba = vec![0u8; y_plane_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    expect_len("YUYV", data, pixel_count(width, height) * 2)?;

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let (decoded_w, decoded_h) = decoder
        .info()
        .map(|info| (info.width as u32, info.height as u32))
        .unwrap_or((width, height));
    if (decoded_w, decoded_h) != (width, height) {
        return Err(anyhow!(
            "MJPEG frame is {decoded_w}x{decoded_h}, camera reported {width}x{height}"
        ));
    }

    let expected_len = usize::try_from(u64::from(width) * u64::from(height) * 4)
        .map_err(|_| anyhow!("MJPEG dimensions do not fit usize"))?;
    expect_len("MJPEG", &rgba, expected_len)?;

    Ok(rgba)
}

fn rgb_like_to_rgba(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    expect_len("RGB", data, pixel_count(width, height) * 3)?;

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let (r, b) = if swap_rb { (src[2], src[0]) } else { (src[0], src[2]) };
            dst.copy_from_slice(&[r, src[1], b, 255]);
        });

    Ok(rgba)
}

fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let len = pixel_count(width, height);
    expect_len("GRAY", data, len)?;

    let mut rgba = vec![0u8; len * 4];
    rgba.par_chunks_mut(4)
        .zip(data[..len].par_iter().copied())
        .for_each(|(dst, value)| dst.copy_from_slice(&[value, value, value, 255]));

    Ok(rgba)
}
