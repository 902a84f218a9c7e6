use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crossbeam_channel::{Receiver, TryRecvError};
use gpui::{
    AnyElement, App, AppContext, Context, FocusHandle, InteractiveElement, IntoElement,
    KeyDownEvent, ObjectFit, ParentElement, Render, RenderImage, Rgba, Styled, StyledImage,
    TitlebarOptions, Window, WindowOptions, div, img, px,
};
use gpui_component::{Root, StyledExt, h_flex, v_flex};

use crate::{app::PreviewFrame, session::SessionStatus};

mod render_util;

const WINDOW_TITLE: &str = "Virtual Mouse";
const QUIT_KEY: &str = "q";

/// Opens the camera window. Closing it or pressing `q` clears `running`; the
/// window itself quits the app once the session drops its preview sender.
pub fn launch_preview(
    app: &mut App,
    preview_rx: Receiver<PreviewFrame>,
    running: Arc<AtomicBool>,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some(WINDOW_TITLE.into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let close_flag = running.clone();
        window.on_window_should_close(app, move |_, app| {
            close_flag.store(false, Ordering::SeqCst);
            app.quit();
            true
        });

        let view = app.new(|cx| PreviewView::new(preview_rx, running, cx));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct PreviewView {
    preview_rx: Receiver<PreviewFrame>,
    running: Arc<AtomicBool>,
    focus_handle: FocusHandle,
    focused: bool,
    closing: bool,
    latest_image: Option<Arc<RenderImage>>,
    frame_size: Option<(u32, u32)>,
    status: Option<SessionStatus>,
}

impl PreviewView {
    fn new(
        preview_rx: Receiver<PreviewFrame>,
        running: Arc<AtomicBool>,
        cx: &mut Context<'_, Self>,
    ) -> Self {
        Self {
            preview_rx,
            running,
            focus_handle: cx.focus_handle(),
            focused: false,
            closing: false,
            latest_image: None,
            frame_size: None,
            status: None,
        }
    }

    fn drain_previews(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        loop {
            match self.preview_rx.try_recv() {
                Ok(preview) => {
                    if preview.status.is_some() {
                        self.status = preview.status;
                    }
                    self.frame_size = Some((preview.frame.width, preview.frame.height));
                    if let Some(image) = render_util::frame_to_image(&preview.frame) {
                        self.replace_latest_image(image, window, cx);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closing {
                        log::info!("session finished, closing preview");
                        self.closing = true;
                        cx.quit();
                    }
                    break;
                }
            }
        }
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // The sprite atlas keeps every frame unless the old texture is dropped.
            cx.drop_image(old_image, Some(window));
        }
    }

    fn on_key_down(&mut self, event: &KeyDownEvent, _: &mut Window, _: &mut Context<'_, Self>) {
        if event.keystroke.key.eq_ignore_ascii_case(QUIT_KEY) {
            log::info!("quit key pressed");
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

impl Render for PreviewView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        if !self.focused {
            self.focus_handle.focus(window);
            self.focused = true;
        }
        self.drain_previews(window, cx);

        let frame_view: AnyElement = if let Some(image) = &self.latest_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element()
        } else {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child("Waiting for camera...")
                .into_any_element()
        };

        let mut stage = div()
            .relative()
            .flex_1()
            .w_full()
            .overflow_hidden()
            .bg(gpui::rgb(0x000000))
            .child(frame_view);

        if let Some(status) = self.status.filter(|s| *s != SessionStatus::NoHand) {
            stage = stage.child(
                div()
                    .absolute()
                    .top(px(12.0))
                    .left(px(16.0))
                    .text_lg()
                    .font_semibold()
                    .text_color(status_color(status))
                    .child(status.label()),
            );
        }

        let frame_info = self
            .frame_size
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "no frames yet".to_string());

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .track_focus(&self.focus_handle)
            .on_key_down(cx.listener(Self::on_key_down))
            .child(stage)
            .child(
                h_flex()
                    .justify_between()
                    .items_center()
                    .px_3()
                    .py_2()
                    .text_xs()
                    .text_color(gpui::rgb(0xa0aab8))
                    .child(frame_info)
                    .child("press q to quit"),
            )
    }
}

fn status_color(status: SessionStatus) -> Rgba {
    match status {
        SessionStatus::AwaitingStart => gpui::rgb(0xf87171),
        SessionStatus::Started => gpui::rgb(0x4ade80),
        SessionStatus::LeftClick => gpui::rgb(0x22d3ee),
        SessionStatus::RightClick => gpui::rgb(0x60a5fa),
        SessionStatus::Dragging => gpui::rgb(0xfacc15),
        SessionStatus::Screenshot => gpui::rgb(0xfca5a5),
        SessionStatus::Exiting => gpui::rgb(0xe2e8f0),
        SessionStatus::Tracking | SessionStatus::NoHand => gpui::rgb(0xa0aab8),
    }
}
