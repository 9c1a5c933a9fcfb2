//! Classification of raw touch input by capture region

use serde::{Deserialize, Serialize};

use crate::core::Touch;

/// Capture region that received a touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchSource {
    /// Area around the large window, including the handle bar
    Background,
    /// The mirrored content itself
    Content,
    Mini,
    MaskedMini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchAction {
    Down,
    Up,
    Move,
    Cancel,
    PointerDown,
    PointerUp,
    /// Any platform code without a dedicated variant
    Other(i32),
}

impl TouchAction {
    /// Map a platform masked action code
    pub fn from_masked(code: i32) -> Self {
        match code {
            0 => TouchAction::Down,
            1 => TouchAction::Up,
            2 => TouchAction::Move,
            3 => TouchAction::Cancel,
            5 => TouchAction::PointerDown,
            6 => TouchAction::PointerUp,
            other => TouchAction::Other(other),
        }
    }

    /// Up or Cancel
    pub fn ends_gesture(self) -> bool {
        matches!(self, TouchAction::Up | TouchAction::Cancel)
    }
}

/// One sample as delivered by a capture region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawTouch {
    pub action: TouchAction,
    /// Coordinates local to the capture region
    pub x: f32,
    pub y: f32,
    /// Screen coordinates
    pub raw_x: f32,
    pub raw_y: f32,
    pub time_ms: u64,
}

impl RawTouch {
    pub fn new(action: TouchAction, x: f32, y: f32, raw_x: f32, raw_y: f32, time_ms: u64) -> Self {
        Self { action, x, y, raw_x, raw_y, time_ms }
    }

    /// Sample whose local and screen coordinates coincide
    pub fn at_screen(action: TouchAction, raw_x: f32, raw_y: f32, time_ms: u64) -> Self {
        Self::new(action, raw_x, raw_y, raw_x, raw_y, time_ms)
    }
}

pub fn classify(source: TouchSource, raw: &RawTouch) -> Touch {
    Touch::Motion {
        source,
        action: raw.action,
    }
}
