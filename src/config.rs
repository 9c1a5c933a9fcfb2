use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::geometry::{GeometryRatios, ScreenMetrics};

/// Tunables loaded once at startup from `overlay.toml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default)]
    pub geometry: GeometryRatios,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
}

/// Drag thresholds and feel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_touch_slop_px")]
    pub touch_slop_px: f32,
    #[serde(default = "default_mini_trigger_distance_ratio")]
    pub mini_trigger_distance_ratio: f32,
    #[serde(default = "default_mini_mask_trigger_ratio")]
    pub mini_mask_trigger_ratio: f32,
    #[serde(default = "default_mask_inward_restore_ratio")]
    pub mask_inward_restore_ratio: f32,
    #[serde(default = "default_drag_damping_power")]
    pub drag_damping_power: f32,
    #[serde(default = "default_drag_overshoot_resistance")]
    pub drag_overshoot_resistance: f32,
    #[serde(default = "default_drag_smoothing_alpha")]
    pub drag_smoothing_alpha: f32,
    #[serde(default = "default_first_mini_y_ratio")]
    pub first_mini_y_ratio: f32,
}

/// Animation durations and loop pacing, all in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_size_switch_ms")]
    pub size_switch_ms: u64,
    #[serde(default = "default_snap_ms")]
    pub snap_ms: u64,
    #[serde(default = "default_mask_ms")]
    pub mask_ms: u64,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// Screen reported by the headless compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: i32,
    #[serde(default = "default_screen_height")]
    pub height: i32,
    #[serde(default)]
    pub top_inset: i32,
    #[serde(default)]
    pub bottom_inset: i32,
    #[serde(default = "default_density")]
    pub density: f32,
}

fn default_touch_slop_px() -> f32 {
    crate::constants::gesture::TOUCH_SLOP_PX
}

fn default_mini_trigger_distance_ratio() -> f32 {
    crate::constants::gesture::MINI_TRIGGER_DISTANCE_RATIO
}

fn default_mini_mask_trigger_ratio() -> f32 {
    crate::constants::gesture::MINI_MASK_TRIGGER_RATIO
}

fn default_mask_inward_restore_ratio() -> f32 {
    crate::constants::gesture::MASK_INWARD_RESTORE_RATIO
}

fn default_drag_damping_power() -> f32 {
    crate::constants::gesture::DRAG_DAMPING_POWER
}

fn default_drag_overshoot_resistance() -> f32 {
    crate::constants::gesture::DRAG_OVERSHOOT_RESISTANCE
}

fn default_drag_smoothing_alpha() -> f32 {
    crate::constants::gesture::DRAG_SMOOTHING_ALPHA
}

fn default_first_mini_y_ratio() -> f32 {
    crate::constants::gesture::FIRST_MINI_Y_RATIO
}

fn default_size_switch_ms() -> u64 {
    crate::constants::timing::SIZE_SWITCH_DURATION_MS
}

fn default_snap_ms() -> u64 {
    crate::constants::timing::SNAP_DURATION_MS
}

fn default_mask_ms() -> u64 {
    crate::constants::timing::MASK_DURATION_MS
}

fn default_stop_grace_ms() -> u64 {
    crate::constants::timing::STOP_GRACE_MS
}

fn default_frame_interval_ms() -> u64 {
    crate::constants::timing::FRAME_INTERVAL_MS
}

fn default_screen_width() -> i32 {
    crate::constants::screen::DEFAULT_WIDTH
}

fn default_screen_height() -> i32 {
    crate::constants::screen::DEFAULT_HEIGHT
}

fn default_density() -> f32 {
    crate::constants::screen::DEFAULT_DENSITY
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch_slop_px: default_touch_slop_px(),
            mini_trigger_distance_ratio: default_mini_trigger_distance_ratio(),
            mini_mask_trigger_ratio: default_mini_mask_trigger_ratio(),
            mask_inward_restore_ratio: default_mask_inward_restore_ratio(),
            drag_damping_power: default_drag_damping_power(),
            drag_overshoot_resistance: default_drag_overshoot_resistance(),
            drag_smoothing_alpha: default_drag_smoothing_alpha(),
            first_mini_y_ratio: default_first_mini_y_ratio(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            size_switch_ms: default_size_switch_ms(),
            snap_ms: default_snap_ms(),
            mask_ms: default_mask_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
            top_inset: 0,
            bottom_inset: 0,
            density: default_density(),
        }
    }
}

impl ScreenConfig {
    pub fn metrics(&self) -> ScreenMetrics {
        ScreenMetrics {
            width: self.width,
            height: self.height,
            top_inset: self.top_inset,
            bottom_inset: self.bottom_inset,
        }
    }
}

/// Clamp `value` into `[min, max]`, warning when it had to move
fn clamp_field<T: PartialOrd + Copy + Debug>(field: &'static str, value: &mut T, min: T, max: T) {
    if *value < min {
        warn!(field, value = ?*value, min = ?min, "value below minimum, clamping");
        *value = min;
    } else if *value > max {
        warn!(field, value = ?*value, max = ?max, "value exceeds maximum, clamping");
        *value = max;
    }
}

impl OverlayConfig {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from the default location, generating the file on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Parse errors are returned, the broken file is left untouched
    pub fn load_from(path: &Path) -> Result<Self> {
        if let Ok(contents) = fs::read_to_string(path) {
            let mut config = Self::parse(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            config.apply_env_overrides();
            config.validate_and_clamp();
            return Ok(config);
        }

        let mut config = Self::default();
        if let Err(e) = config.save_to(path) {
            error!(error = ?e, "Failed to save config");
        } else {
            info!(path = %path.display(), "Generated config file for user to edit (env vars still override)");
        }

        config.apply_env_overrides();
        config.validate_and_clamp();
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid TOML in overlay config")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, contents)
            .context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    /// Keep every tunable inside a range the engine can work with
    pub fn validate_and_clamp(&mut self) {
        use crate::constants::validation::*;

        let g = &mut self.geometry;
        clamp_field("geometry.virtual_aspect", &mut g.virtual_aspect, 0.1, 10.0);
        clamp_field("geometry.large_width_ratio", &mut g.large_width_ratio, MIN_RATIO, MAX_RATIO);
        clamp_field("geometry.max_large_height_ratio", &mut g.max_large_height_ratio, MIN_RATIO, MAX_RATIO);
        clamp_field("geometry.mini_width_ratio", &mut g.mini_width_ratio, MIN_RATIO, MAX_RATIO);
        for (field, value) in [
            ("geometry.large_corner_radius_dp", &mut g.large_corner_radius_dp),
            ("geometry.mini_min_size_dp", &mut g.mini_min_size_dp),
            ("geometry.mini_corner_radius_dp", &mut g.mini_corner_radius_dp),
            ("geometry.handle_bar_width_dp", &mut g.handle_bar_width_dp),
            ("geometry.handle_bar_height_dp", &mut g.handle_bar_height_dp),
            ("geometry.handle_bar_margin_dp", &mut g.handle_bar_margin_dp),
            ("geometry.handle_touch_padding_dp", &mut g.handle_touch_padding_dp),
            ("geometry.mini_handle_width_dp", &mut g.mini_handle_width_dp),
            ("geometry.mini_handle_height_dp", &mut g.mini_handle_height_dp),
        ] {
            clamp_field(field, value, 0.0, MAX_DP);
        }

        let gesture = &mut self.gesture;
        clamp_field("gesture.touch_slop_px", &mut gesture.touch_slop_px, 0.0, MAX_TOUCH_SLOP_PX);
        clamp_field(
            "gesture.mini_trigger_distance_ratio",
            &mut gesture.mini_trigger_distance_ratio,
            MIN_RATIO,
            MAX_RATIO,
        );
        clamp_field("gesture.mini_mask_trigger_ratio", &mut gesture.mini_mask_trigger_ratio, 0.0, MAX_RATIO);
        clamp_field("gesture.mask_inward_restore_ratio", &mut gesture.mask_inward_restore_ratio, 0.0, MAX_RATIO);
        clamp_field("gesture.drag_damping_power", &mut gesture.drag_damping_power, MIN_RATIO, MAX_DAMPING_POWER);
        clamp_field("gesture.drag_overshoot_resistance", &mut gesture.drag_overshoot_resistance, 0.0, MAX_RATIO);
        clamp_field("gesture.drag_smoothing_alpha", &mut gesture.drag_smoothing_alpha, MIN_RATIO, MAX_RATIO);
        clamp_field("gesture.first_mini_y_ratio", &mut gesture.first_mini_y_ratio, 0.0, MAX_RATIO);

        let timing = &mut self.timing;
        clamp_field("timing.size_switch_ms", &mut timing.size_switch_ms, 0, MAX_DURATION_MS);
        clamp_field("timing.snap_ms", &mut timing.snap_ms, 0, MAX_DURATION_MS);
        clamp_field("timing.mask_ms", &mut timing.mask_ms, 0, MAX_DURATION_MS);
        clamp_field("timing.stop_grace_ms", &mut timing.stop_grace_ms, 0, MAX_DURATION_MS);
        clamp_field(
            "timing.frame_interval_ms",
            &mut timing.frame_interval_ms,
            MIN_FRAME_INTERVAL_MS,
            MAX_FRAME_INTERVAL_MS,
        );

        let screen = &mut self.screen;
        clamp_field("screen.width", &mut screen.width, MIN_SCREEN_DIMENSION, MAX_SCREEN_DIMENSION);
        clamp_field("screen.height", &mut screen.height, MIN_SCREEN_DIMENSION, MAX_SCREEN_DIMENSION);
        clamp_field("screen.top_inset", &mut screen.top_inset, 0, screen.height / 2);
        clamp_field("screen.bottom_inset", &mut screen.bottom_inset, 0, screen.height / 2);
        clamp_field("screen.density", &mut screen.density, MIN_DENSITY, MAX_DENSITY);
    }

    fn parse_num<T: FromStr>(var: &str) -> Option<T>
    where
        <T as FromStr>::Err: Debug,
    {
        let s = env::var(var).ok()?;
        s.trim()
            .parse::<T>()
            .inspect_err(|e| error!(var = %var, error = ?e, "failed to parse env var"))
            .ok()
    }

    fn apply_env_overrides(&mut self) {
        if let Some(width) = Self::parse_num("OVERLAY_SCREEN_WIDTH") {
            self.screen.width = width;
        }
        if let Some(height) = Self::parse_num("OVERLAY_SCREEN_HEIGHT") {
            self.screen.height = height;
        }
        if let Some(density) = Self::parse_num("OVERLAY_DENSITY") {
            self.screen.density = density;
        }
    }
}
