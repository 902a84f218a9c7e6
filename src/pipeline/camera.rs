use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

use super::rgba_converter;
use crate::types::Frame;

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl CaptureSettings {
    fn requested_formats(&self) -> [RequestedFormat<'static>; 4] {
        let wanted = CameraFormat::new(
            Resolution::new(self.width, self.height),
            FrameFormat::MJPEG,
            self.fps,
        );
        [
            RequestedFormat::with_formats(
                RequestedFormatType::Closest(wanted),
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
                Resolution::new(self.width, self.height),
            )),
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestFrameRate,
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }
}

/// Owns the capture thread. Dropping it stops capture and joins the thread.
#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_camera(settings: &CaptureSettings) -> Result<Camera> {
    let index = CameraIndex::Index(settings.index);
    let mut last_err: Option<anyhow::Error> = None;

    for requested in settings.requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Starts capturing mirrored RGBA frames into `frame_tx`.
///
/// The first read or decode failure ends the thread and drops the sender, which
/// the receiving side observes as a disconnected channel.
pub fn start_camera_stream(settings: CaptureSettings, frame_tx: Sender<Frame>) -> Result<CameraStream> {
    let mut camera = build_camera(&settings)
        .with_context(|| format!("failed to open camera {}", settings.index))?;
    let format = camera.camera_format();
    log::info!(
        "camera {} streaming {}x{} {:?} @ {} fps",
        settings.index,
        format.width(),
        format.height(),
        format.format(),
        format.frame_rate()
    );
    // The camera is reopened on the capture thread; release this handle first.
    camera
        .stop_stream()
        .context("failed to pause camera before handing it to the capture thread")?;
    drop(camera);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut camera = match build_camera(&settings) {
            Ok(cam) => cam,
            Err(err) => {
                log::error!("failed to open camera: {err:?}");
                return;
            }
        };

        while !stop_flag.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            let buffer = match camera.frame() {
                Ok(buffer) => buffer,
                Err(err) => {
                    log::error!(
                        "camera frame read failed (after {:?}): {err:?}",
                        frame_start.elapsed()
                    );
                    break;
                }
            };

            let mut converted = match rgba_converter::convert_camera_frame(&buffer) {
                Ok(rgba) => rgba,
                Err(err) => {
                    log::error!("failed to decode camera frame: {err:?}");
                    break;
                }
            };
            converted.mirror();

            let frame = Frame {
                rgba: converted.rgba,
                width: converted.width,
                height: converted.height,
                timestamp: Instant::now(),
            };

            // Drop if the session loop is busy; it only wants the latest frame.
            if let Err(err) = frame_tx.try_send(frame) {
                if err.is_disconnected() {
                    break;
                }
            }
        }

        if let Err(err) = camera.stop_stream() {
            log::warn!("failed to stop camera stream: {err:?}");
        }
    });

    Ok(CameraStream {
        stop,
        handle: Some(handle),
    })
}
