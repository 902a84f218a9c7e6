use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use gpui::Application;

use crate::{
    config::AppConfig,
    error::SessionError,
    model_download::{ModelKind, ensure_model_ready},
    mouse::{ActionSink, EnigoSink},
    pipeline::{
        CaptureSettings, LandmarkSource, LandmarkSourceConfig, OrtLandmarkSource, skeleton,
        start_camera_stream,
    },
    screenshot::ScreenshotWriter,
    session::{self, Action, HandReading, ScreenSize, SessionState, SessionStatus},
    types::{Frame, HandLandmarks},
    ui,
};

// Upper bound on how long a quit request waits for the next frame.
const FRAME_WAIT: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    ThumbsUp,
    QuitRequested,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: ExitReason,
    pub frames_seen: u64,
    pub frames_processed: u64,
    pub state: SessionState,
}

/// One frame for the preview window. `status` is set only on classified
/// frames; skipped frames are shown as captured.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    pub frame: Frame,
    pub status: Option<SessionStatus>,
}

struct ModelPaths {
    handpose: PathBuf,
    palm: PathBuf,
}

/// Runs one session until thumbs-up, the quit key, Ctrl-C or a capture failure.
///
/// With the preview enabled the session runs on its own thread and the main
/// thread drives the window; the window closes when the session ends.
pub fn run(config: &AppConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();
    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let models = ModelPaths {
        handpose: ensure_model_ready(ModelKind::HandposeEstimator, &config.models_dir)?,
        palm: ensure_model_ready(ModelKind::PalmDetector, &config.models_dir)?,
    };

    if !config.preview {
        return run_session(config, &models, running, None);
    }

    let (preview_tx, preview_rx) = bounded(1);
    let session = {
        let config = config.clone();
        let running = running.clone();
        thread::Builder::new()
            .name("session".into())
            .spawn(move || run_session(&config, &models, running, Some(preview_tx)))
            .context("failed to spawn session thread")?
    };

    let ui_running = running.clone();
    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_preview(app, preview_rx, ui_running.clone()) {
                log::error!("failed to open preview window: {err:?}");
                ui_running.store(false, Ordering::SeqCst);
                app.quit();
            }
        });

    running.store(false, Ordering::SeqCst);
    session
        .join()
        .map_err(|_| anyhow!("session thread panicked"))?
}

fn run_session(
    config: &AppConfig,
    models: &ModelPaths,
    running: Arc<AtomicBool>,
    preview: Option<Sender<PreviewFrame>>,
) -> Result<()> {
    let sink = EnigoSink::new()?;
    let screen = sink.screen_size()?;
    log::info!("controlling a {}x{} screen", screen.width, screen.height);

    let source = OrtLandmarkSource::new(
        &models.handpose,
        &models.palm,
        LandmarkSourceConfig::default(),
    )?;

    let (frame_tx, frame_rx) = bounded(1);
    let camera = start_camera_stream(
        CaptureSettings {
            index: config.camera_index,
            width: config.frame_width,
            height: config.frame_height,
            fps: config.target_fps,
        },
        frame_tx,
    )?;

    let mut runner = SessionRunner {
        source,
        sink,
        screenshots: ScreenshotWriter::new(&config.screenshot_dir),
        screen,
        process_interval: config.process_interval,
        running,
        preview,
    };
    let result = runner.run(&frame_rx);
    camera.stop();

    let summary = result?;
    log::info!(
        "session ended ({:?}) after {} frames, {} classified, {} screenshots",
        summary.reason,
        summary.frames_seen,
        summary.frames_processed,
        summary.state.screenshot_counter
    );
    Ok(())
}

pub struct SessionRunner<S, A> {
    pub source: S,
    pub sink: A,
    pub screenshots: ScreenshotWriter,
    pub screen: ScreenSize,
    pub process_interval: u32,
    pub running: Arc<AtomicBool>,
    pub preview: Option<Sender<PreviewFrame>>,
}

impl<S: LandmarkSource, A: ActionSink> SessionRunner<S, A> {
    /// Processes frames until the session ends. A held drag is released on
    /// every exit path, including capture failure.
    pub fn run(&mut self, frames: &Receiver<Frame>) -> Result<SessionSummary, SessionError> {
        let interval = u64::from(self.process_interval.max(1));
        let mut state = SessionState::default();
        let mut last_status = Some(SessionStatus::AwaitingStart);
        let mut frames_seen = 0u64;
        let mut frames_processed = 0u64;

        log::info!("{}", SessionStatus::AwaitingStart.label());

        let exit = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(ExitReason::QuitRequested);
            }

            let frame = match frames.recv_timeout(FRAME_WAIT) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break Err(SessionError::CaptureFailure),
            };

            frames_seen += 1;
            if frames_seen % interval != 0 {
                self.show(frame, None, None);
                continue;
            }
            frames_processed += 1;

            let hand = match self.source.detect(&frame) {
                Ok(hand) => hand,
                Err(err) => {
                    log::warn!("hand detection failed: {err:?}");
                    None
                }
            };
            let reading = hand
                .as_ref()
                .map(|h| HandReading::from_landmarks(h, frame.width, frame.height));

            let (next, decision) = session::step(state, reading.as_ref(), self.screen);
            state = next;

            if last_status != Some(decision.status) && decision.status != SessionStatus::NoHand {
                log::info!("{}", decision.status.label());
            }
            last_status = Some(decision.status);
            if let Some(reading) = &reading {
                log::trace!("fingers {}", reading.predicates.finger_pattern());
            }

            for action in &decision.actions {
                self.apply(*action, &frame, hand.as_ref());
            }
            log::debug!("frame handled {:?} after capture", frame.timestamp.elapsed());
            self.show(frame, hand.as_ref(), Some(decision.status));

            if decision.terminates() {
                break Ok(ExitReason::ThumbsUp);
            }
        };

        let (state, release) = state.finish();
        for action in release {
            self.apply_pointer(action);
        }

        exit.map(|reason| SessionSummary {
            reason,
            frames_seen,
            frames_processed,
            state,
        })
    }

    fn show(
        &self,
        mut frame: Frame,
        hand: Option<&HandLandmarks>,
        status: Option<SessionStatus>,
    ) {
        let Some(preview) = &self.preview else {
            return;
        };
        if let Some(hand) = hand {
            skeleton::draw_hand(&mut frame, hand);
        }
        // A busy window just misses this frame.
        let _ = preview.try_send(PreviewFrame { frame, status });
    }

    fn apply(&mut self, action: Action, frame: &Frame, hand: Option<&HandLandmarks>) {
        match action {
            Action::Screenshot { index } => match self.screenshots.save(frame, hand, index) {
                Ok(path) => log::info!("saved {}", path.display()),
                Err(err) => log::warn!("screenshot {index} failed: {err:?}"),
            },
            Action::Terminate => log::info!("thumbs up, stopping"),
            pointer => self.apply_pointer(pointer),
        }
    }

    fn apply_pointer(&mut self, action: Action) {
        log::debug!("dispatch {action:?}");
        match action {
            Action::MoveCursor { x, y } => self.sink.move_cursor(x, y),
            Action::LeftClick => self.sink.left_click(),
            Action::RightClick => self.sink.right_click(),
            Action::MouseDown => self.sink.mouse_down(),
            Action::MouseUp => self.sink.mouse_up(),
            Action::Screenshot { .. } | Action::Terminate => {}
        }
    }
}
