//! Per-frame session state machine: gesture predicates in, mouse actions out.
//!
//! The state is a plain value. [`step`] takes the previous state and returns the
//! next one together with the actions for the frame, so nothing outside the
//! caller's loop holds session data.

use crate::{
    gesture::{self, GesturePredicates},
    types::{HandLandmarks, INDEX_TIP},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingStart,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    pub dragging: bool,
    pub screenshot_counter: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::AwaitingStart,
            dragging: false,
            screenshot_counter: 0,
        }
    }
}

impl SessionState {
    pub fn started(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Releases a held drag button. Called once on every exit path.
    pub fn finish(self) -> (SessionState, Vec<Action>) {
        if self.dragging {
            let next = SessionState {
                dragging: false,
                ..self
            };
            (next, vec![Action::MouseUp])
        } else {
            (self, Vec::new())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerGesture {
    LeftClick,
    RightClick,
    Drag,
}

/// Pointer gestures in evaluation order; the first one whose predicate holds is
/// the only one that fires in a frame.
pub const POINTER_PRIORITY: [PointerGesture; 3] = [
    PointerGesture::LeftClick,
    PointerGesture::RightClick,
    PointerGesture::Drag,
];

impl PointerGesture {
    fn matches(self, predicates: &GesturePredicates) -> bool {
        match self {
            PointerGesture::LeftClick => predicates.thumb_index_touching,
            PointerGesture::RightClick => predicates.index_middle_touching,
            PointerGesture::Drag => predicates.thumb_ring_touching,
        }
    }
}

pub fn select_pointer_gesture(predicates: &GesturePredicates) -> Option<PointerGesture> {
    POINTER_PRIORITY
        .into_iter()
        .find(|gesture| gesture.matches(predicates))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    MoveCursor { x: i32, y: i32 },
    LeftClick,
    RightClick,
    MouseDown,
    MouseUp,
    Screenshot { index: u64 },
    Terminate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    NoHand,
    AwaitingStart,
    Started,
    Tracking,
    LeftClick,
    RightClick,
    Dragging,
    Screenshot,
    Exiting,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::NoHand => "No hand",
            SessionStatus::AwaitingStart => "Show 5 fingers to start",
            SessionStatus::Started => "System started",
            SessionStatus::Tracking => "Tracking",
            SessionStatus::LeftClick => "Left click",
            SessionStatus::RightClick => "Right click",
            SessionStatus::Dragging => "Dragging...",
            SessionStatus::Screenshot => "Screenshot",
            SessionStatus::Exiting => "Exiting...",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDecision {
    pub actions: Vec<Action>,
    pub status: SessionStatus,
}

impl FrameDecision {
    fn idle(status: SessionStatus) -> Self {
        Self {
            actions: Vec::new(),
            status,
        }
    }

    pub fn terminates(&self) -> bool {
        self.actions.contains(&Action::Terminate)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Maps a normalized frame position onto screen pixels.
    pub fn project(&self, (x, y): (f32, f32)) -> (i32, i32) {
        let sx = (x.clamp(0.0, 1.0) * self.width as f32).round() as i32;
        let sy = (y.clamp(0.0, 1.0) * self.height as f32).round() as i32;
        (
            sx.min(self.width.saturating_sub(1) as i32),
            sy.min(self.height.saturating_sub(1) as i32),
        )
    }
}

/// What the state machine needs from one detected hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandReading {
    pub index_tip: (f32, f32),
    pub predicates: GesturePredicates,
}

impl HandReading {
    pub fn from_landmarks(landmarks: &HandLandmarks, frame_width: u32, frame_height: u32) -> Self {
        Self {
            index_tip: landmarks.point(INDEX_TIP),
            predicates: gesture::classify(landmarks, frame_width, frame_height),
        }
    }
}

pub fn step(
    state: SessionState,
    hand: Option<&HandReading>,
    screen: ScreenSize,
) -> (SessionState, FrameDecision) {
    let Some(hand) = hand else {
        return (state, FrameDecision::idle(SessionStatus::NoHand));
    };
    let predicates = &hand.predicates;

    if state.phase == Phase::AwaitingStart {
        if predicates.all_fingers_up() {
            let next = SessionState {
                phase: Phase::Active,
                ..state
            };
            return (next, FrameDecision::idle(SessionStatus::Started));
        }
        return (state, FrameDecision::idle(SessionStatus::AwaitingStart));
    }

    let mut next = state;
    let (x, y) = screen.project(hand.index_tip);
    let mut actions = vec![Action::MoveCursor { x, y }];

    let pointer = select_pointer_gesture(predicates);

    // A held button is released before any click so the two never overlap.
    if next.dragging && pointer != Some(PointerGesture::Drag) {
        actions.push(Action::MouseUp);
        next.dragging = false;
    }

    match pointer {
        Some(PointerGesture::LeftClick) => actions.push(Action::LeftClick),
        Some(PointerGesture::RightClick) => actions.push(Action::RightClick),
        Some(PointerGesture::Drag) if !next.dragging => {
            actions.push(Action::MouseDown);
            next.dragging = true;
        }
        Some(PointerGesture::Drag) | None => {}
    }

    if predicates.is_fist {
        actions.push(Action::Screenshot {
            index: next.screenshot_counter,
        });
        next.screenshot_counter += 1;
    }

    if predicates.is_thumb_up {
        actions.push(Action::Terminate);
    }

    let status = if predicates.is_thumb_up {
        SessionStatus::Exiting
    } else if predicates.is_fist {
        SessionStatus::Screenshot
    } else {
        match pointer {
            Some(PointerGesture::LeftClick) => SessionStatus::LeftClick,
            Some(PointerGesture::RightClick) => SessionStatus::RightClick,
            Some(PointerGesture::Drag) => SessionStatus::Dragging,
            None => SessionStatus::Tracking,
        }
    };

    (next, FrameDecision { actions, status })
}
