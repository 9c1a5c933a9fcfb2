//! Application-wide constants
//!
//! Default tunables for the overlay engine. Most of these seed the
//! configuration file and can be overridden there; the rest are protocol
//! values that must stay fixed.

/// Window geometry defaults
pub mod geometry {
    /// Aspect ratio (width / height) of the mirrored surface (9:16 portrait)
    pub const VIRTUAL_ASPECT: f32 = 9.0 / 16.0;

    /// Large window width as a fraction of the screen width
    pub const LARGE_WIDTH_RATIO: f32 = 0.70;

    /// Upper bound for the large window height as a fraction of the screen height
    pub const MAX_LARGE_HEIGHT_RATIO: f32 = 0.80;

    /// Corner radius of the large window (dp)
    pub const LARGE_CORNER_RADIUS_DP: f32 = 24.0;

    /// Mini window width as a fraction of the screen width
    pub const MINI_WIDTH_RATIO: f32 = 0.10;

    /// Lower bound for the mini window width (dp)
    pub const MINI_MIN_SIZE_DP: f32 = 80.0;

    /// Corner radius of the mini window (dp)
    pub const MINI_CORNER_RADIUS_DP: f32 = 24.0;

    /// Bottom handle bar size (dp)
    pub const HANDLE_BAR_WIDTH_DP: f32 = 50.0;
    pub const HANDLE_BAR_HEIGHT_DP: f32 = 4.0;

    /// Gap between the large window and its handle bar (dp)
    pub const HANDLE_BAR_MARGIN_DP: f32 = 6.0;

    /// Extra hit area around the handle bar on every side (dp)
    pub const HANDLE_TOUCH_PADDING_DP: f32 = 20.0;

    /// Edge grab handle shown on a masked mini window (dp)
    pub const MINI_HANDLE_WIDTH_DP: f32 = 4.0;
    pub const MINI_HANDLE_HEIGHT_DP: f32 = 36.0;
}

/// Gesture thresholds and drag feel
pub mod gesture {
    /// Movement below this (in pixels, per axis) is still a tap
    pub const TOUCH_SLOP_PX: f32 = 10.0;

    /// Handle drag distance that commits Large -> Mini, as a fraction of the screen height
    pub const MINI_TRIGGER_DISTANCE_RATIO: f32 = 0.2;

    /// How far past a screen edge a mini window must be released to mask it, as a fraction of the mini size
    pub const MINI_MASK_TRIGGER_RATIO: f32 = 0.15;

    /// Inward drag that restores a masked window, as a fraction of the mini size
    pub const MASK_INWARD_RESTORE_RATIO: f32 = 0.12;

    /// Exponent of the ease-out resistance applied to handle drag progress
    pub const DRAG_DAMPING_POWER: f32 = 1.8;

    /// Fraction of the distance past the trigger that still moves the window
    pub const DRAG_OVERSHOOT_RESISTANCE: f32 = 0.20;

    /// Exponential smoothing factor for raw drag distance
    pub const DRAG_SMOOTHING_ALPHA: f32 = 0.35;

    /// Vertical position of the first mini window, as a fraction of the screen height
    pub const FIRST_MINI_Y_RATIO: f32 = 0.35;

    /// Visible center of the masked edge handle, as a fraction of the mini width
    pub const MASKED_HANDLE_CENTER_LEFT: f32 = 0.75;
    pub const MASKED_HANDLE_CENTER_RIGHT: f32 = 0.25;
}

/// Animation durations and frame pacing (milliseconds)
pub mod timing {
    /// Large <-> Mini switch
    pub const SIZE_SWITCH_DURATION_MS: u64 = 380;

    /// Snap back / re-dock
    pub const SNAP_DURATION_MS: u64 = 260;

    /// Mini <-> MiniMasked
    pub const MASK_DURATION_MS: u64 = 260;

    /// Delay between a stop request and session shutdown
    pub const STOP_GRACE_MS: u64 = 500;

    /// Event loop frame interval while animating (~60 Hz)
    pub const FRAME_INTERVAL_MS: u64 = 16;
}

/// Headless screen defaults (used when no platform reports metrics)
pub mod screen {
    pub const DEFAULT_WIDTH: i32 = 1080;
    pub const DEFAULT_HEIGHT: i32 = 2400;
    pub const DEFAULT_DENSITY: f32 = 2.625;
}

/// Target launch defaults
pub mod launch {
    /// Package launched when a start request names none
    pub const DEFAULT_TARGET_PACKAGE: &str = "com.android.dialer";
}

/// Command protocol constants
pub mod protocol {
    /// Version carried in every request envelope
    pub const PROTOCOL_VERSION: u32 = 1;

    /// Maximum frame size (10 MB) to prevent memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

    /// Socket file name below the runtime directory
    pub const SOCKET_DIR: &str = "mirror-overlay";
    pub const SOCKET_FILENAME: &str = "overlay.sock";
}

/// Config file location
pub mod config {
    pub const APP_DIR: &str = "mirror-overlay";
    pub const FILENAME: &str = "overlay.toml";
}

/// Validation limits applied to loaded config values
pub mod validation {
    pub const MIN_RATIO: f32 = 0.01;
    pub const MAX_RATIO: f32 = 1.0;
    pub const MIN_SCREEN_DIMENSION: i32 = 64;
    pub const MAX_SCREEN_DIMENSION: i32 = 16384;
    pub const MIN_DENSITY: f32 = 0.5;
    pub const MAX_DENSITY: f32 = 8.0;
    pub const MAX_DURATION_MS: u64 = 5000;
    pub const MIN_FRAME_INTERVAL_MS: u64 = 1;
    pub const MAX_FRAME_INTERVAL_MS: u64 = 100;
    pub const MAX_DAMPING_POWER: f32 = 8.0;
    pub const MAX_TOUCH_SLOP_PX: f32 = 200.0;
    pub const MAX_DP: f32 = 512.0;
}
