use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    HandposeEstimator,
    PalmDetector,
}

impl ModelKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "handpose_estimation_mediapipe_2023feb.onnx",
            ModelKind::PalmDetector => "palm_detection_mediapipe_2023feb.onnx",
        }
    }

    fn url(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => {
                "https://github.com/opencv/opencv_zoo/raw/main/models/handpose_estimation_mediapipe/handpose_estimation_mediapipe_2023feb.onnx"
            }
            ModelKind::PalmDetector => {
                "https://github.com/opencv/opencv_zoo/raw/main/models/palm_detection_mediapipe/palm_detection_mediapipe_2023feb.onnx"
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "hand-pose estimator",
            ModelKind::PalmDetector => "palm detector",
        }
    }

    pub fn path_in(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.file_name())
    }
}

/// Makes sure the model file exists under `models_dir`, downloading it on first use.
pub fn ensure_model_ready(kind: ModelKind, models_dir: &Path) -> anyhow::Result<PathBuf> {
    let model_path = kind.path_in(models_dir);
    if model_path.exists() {
        log::debug!("{} model present at {}", kind.label(), model_path.display());
        return Ok(model_path);
    }

    fs::create_dir_all(models_dir)
        .with_context(|| format!("failed to create model directory {}", models_dir.display()))?;

    download_to_path(kind, &model_path).with_context(|| {
        format!(
            "failed to download {} model to {}",
            kind.label(),
            model_path.display()
        )
    })?;
    Ok(model_path)
}

fn download_to_path(kind: ModelKind, dest: &Path) -> anyhow::Result<()> {
    let url = kind.url();
    log::info!(
        "downloading {} model from {url} to {}",
        kind.label(),
        dest.display()
    );

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("failed to build HTTP client")?;
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let progress = create_progress_bar(response.content_length());

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        progress.set_position(downloaded);
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    progress.finish_with_message(format!("{} model ready", kind.label()));
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} downloading model") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}
