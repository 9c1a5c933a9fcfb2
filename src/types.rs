//! Small geometric value types shared across the engine

use serde::{Deserialize, Serialize};

/// Top-left corner of a window, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
}

impl Dimensions {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Clip rectangle in layer-local coordinates (right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClipRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ClipRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Clip covering a full `width` x `height` layer
    pub fn full(dimensions: Dimensions) -> Self {
        Self::new(0, 0, dimensions.width, dimensions.height)
    }

    pub fn lerp(start: ClipRect, end: ClipRect, progress: f32) -> ClipRect {
        ClipRect::new(
            lerp_i32(start.left, end.left, progress),
            lerp_i32(start.top, end.top, progress),
            lerp_i32(start.right, end.right, progress),
            lerp_i32(start.bottom, end.bottom, progress),
        )
    }
}

/// Screen-space rectangle used for hit testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl HitRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    pub fn inflate(self, padding: f32) -> Self {
        Self {
            left: self.left - padding,
            top: self.top - padding,
            right: self.right + padding,
            bottom: self.bottom + padding,
        }
    }
}

pub fn lerp_i32(start: i32, end: i32, progress: f32) -> i32 {
    (start as f32 + (end - start) as f32 * progress).round() as i32
}

pub fn lerp_f32(start: f32, end: f32, progress: f32) -> f32 {
    start + (end - start) * progress
}
