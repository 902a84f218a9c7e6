use anyhow::{Result, anyhow};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::session::ScreenSize;

/// OS pointer control. Calls are fire-and-forget: failures are logged by the
/// implementation and never reach the session loop.
pub trait ActionSink {
    fn move_cursor(&mut self, x: i32, y: i32);
    fn left_click(&mut self);
    fn right_click(&mut self);
    fn mouse_down(&mut self);
    fn mouse_up(&mut self);
}

pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|err| anyhow!("failed to connect to the input system: {err:?}"))?;
        Ok(Self { enigo })
    }

    pub fn screen_size(&self) -> Result<ScreenSize> {
        let (width, height) = self
            .enigo
            .main_display()
            .map_err(|err| anyhow!("failed to query main display size: {err:?}"))?;
        if width <= 0 || height <= 0 {
            return Err(anyhow!("main display reported size {width}x{height}"));
        }
        Ok(ScreenSize {
            width: width as u32,
            height: height as u32,
        })
    }

    fn button(&mut self, button: Button, direction: Direction) {
        if let Err(err) = self.enigo.button(button, direction) {
            log::warn!("mouse {button:?} {direction:?} failed: {err:?}");
        }
    }
}

impl ActionSink for EnigoSink {
    fn move_cursor(&mut self, x: i32, y: i32) {
        if let Err(err) = self.enigo.move_mouse(x, y, Coordinate::Abs) {
            log::warn!("cursor move to ({x}, {y}) failed: {err:?}");
        }
    }

    fn left_click(&mut self) {
        self.button(Button::Left, Direction::Click);
    }

    fn right_click(&mut self) {
        self.button(Button::Right, Direction::Click);
    }

    fn mouse_down(&mut self) {
        self.button(Button::Left, Direction::Press);
    }

    fn mouse_up(&mut self) {
        self.button(Button::Left, Direction::Release);
    }
}
