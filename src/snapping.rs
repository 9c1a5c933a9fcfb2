//! Edge docking and masking decisions for the mini window

use crate::core::DockSide;

/// Horizontal extent of the mini window against the screen
#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub x: i32,
    pub width: i32,
    pub screen_width: i32,
}

impl Span {
    pub fn new(x: i32, width: i32, screen_width: i32) -> Self {
        Self { x, width, screen_width }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn center(&self) -> i32 {
        self.x + self.width / 2
    }

    /// How far the span sticks out past the left edge
    pub fn overhang_left(&self) -> i32 {
        -self.left()
    }

    /// How far the span sticks out past the right edge
    pub fn overhang_right(&self) -> i32 {
        self.right() - self.screen_width
    }
}

/// Outcome of releasing a free mini drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiniRelease {
    /// Pushed far enough past an edge to hide behind it
    Mask(DockSide),
    /// Snapped flush against the nearest edge
    Dock(DockSide),
}

impl MiniRelease {
    pub fn side(self) -> DockSide {
        match self {
            MiniRelease::Mask(side) | MiniRelease::Dock(side) => side,
        }
    }
}

/// Edge nearest to the window center
pub fn resolve_dock_side(x: i32, mini_size: i32, screen_width: i32) -> DockSide {
    if Span::new(x, mini_size, screen_width).center() < screen_width / 2 {
        DockSide::Left
    } else {
        DockSide::Right
    }
}

/// Flush, fully visible x for `side`
pub fn docked_x(side: DockSide, mini_size: i32, screen_width: i32) -> i32 {
    match side {
        DockSide::Left => 0,
        DockSide::Right => screen_width - mini_size,
    }
}

/// Half hidden x for `side`
pub fn masked_x(side: DockSide, mini_size: i32, screen_width: i32) -> i32 {
    match side {
        DockSide::Left => -mini_size / 2,
        DockSide::Right => screen_width - mini_size / 2,
    }
}

/// Docked coordinate remembered for a window last seen at `x`
pub fn remembered_x(x: i32, mini_size: i32, screen_width: i32) -> i32 {
    if x <= screen_width / 2 {
        0
    } else {
        screen_width - mini_size
    }
}

pub fn resolve_mini_release(x: i32, mini_size: i32, screen_width: i32, mask_threshold: i32) -> MiniRelease {
    let span = Span::new(x, mini_size, screen_width);
    if span.overhang_left() >= mask_threshold {
        MiniRelease::Mask(DockSide::Left)
    } else if span.overhang_right() >= mask_threshold {
        MiniRelease::Mask(DockSide::Right)
    } else {
        MiniRelease::Dock(resolve_dock_side(x, mini_size, screen_width))
    }
}

/// Whether a masked drag moved back toward the screen far enough to unmask
pub fn is_inward_restore(side: DockSide, delta_x: f32, mini_size: i32, restore_ratio: f32) -> bool {
    let threshold = mini_size as f32 * restore_ratio;
    match side {
        DockSide::Left => delta_x > threshold,
        DockSide::Right => delta_x < -threshold,
    }
}
