use std::sync::Arc;

use gpui::RenderImage;
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::types::Frame;

pub(super) fn frame_to_image(frame: &Frame) -> Option<Arc<RenderImage>> {
    let mut pixels = frame.rgba.clone();
    rgba_to_bgra(&mut pixels);

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(frame.width, frame.height, pixels)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

// GPUI uploads render images as BGRA.
fn rgba_to_bgra(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}
