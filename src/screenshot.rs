use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;

use crate::{
    pipeline::skeleton,
    types::{Frame, HandLandmarks},
};

/// Saves annotated camera frames as `screenshot_{n}.png`.
#[derive(Clone, Debug)]
pub struct ScreenshotWriter {
    dir: PathBuf,
}

impl ScreenshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("screenshot_{index}.png"))
    }

    pub fn save(&self, frame: &Frame, hand: Option<&HandLandmarks>, index: u64) -> Result<PathBuf> {
        let mut annotated = frame.clone();
        if let Some(hand) = hand {
            skeleton::draw_hand(&mut annotated, hand);
        }

        let Some(img) = RgbaImage::from_raw(annotated.width, annotated.height, annotated.rgba)
        else {
            return Err(anyhow!(
                "frame buffer does not match {}x{}",
                frame.width,
                frame.height
            ));
        };

        ensure_dir(&self.dir)?;
        let path = self.path_for(index);
        img.save(&path)
            .with_context(|| format!("failed to write screenshot {}", path.display()))?;
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create screenshot directory {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::fixtures;

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame {
            rgba: vec![90; (width * height * 4) as usize],
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn writes_numbered_png() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ScreenshotWriter::new(dir.path().join("shots"));

        let first = writer
            .save(&gray_frame(32, 24), Some(&fixtures::fist()), 0)
            .unwrap();
        let second = writer.save(&gray_frame(32, 24), None, 1).unwrap();

        assert_eq!(first, dir.path().join("shots").join("screenshot_0.png"));
        assert_eq!(second.file_name().unwrap(), "screenshot_1.png");

        let img = image::open(&first).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (32, 24));
    }

    #[test]
    fn rejects_truncated_frames() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ScreenshotWriter::new(dir.path());
        let mut frame = gray_frame(16, 16);
        frame.rgba.truncate(10);
        assert!(writer.save(&frame, None, 0).is_err());
        assert!(!writer.path_for(0).exists());
    }
}
