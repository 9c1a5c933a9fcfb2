//! Window geometry derived from screen metrics
//!
//! Everything here is pure: the orchestration layer computes one [`Geometry`]
//! when the overlay is attached and reuses it for every frame.

use serde::{Deserialize, Serialize};

use crate::types::{ClipRect, Dimensions, HitRect, Position};

/// Screen size and system bar insets as reported by the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMetrics {
    pub width: i32,
    pub height: i32,
    pub top_inset: i32,
    pub bottom_inset: i32,
}

/// Ratios and dp sizes the calculator works from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryRatios {
    pub virtual_aspect: f32,
    pub large_width_ratio: f32,
    pub max_large_height_ratio: f32,
    pub large_corner_radius_dp: f32,
    pub mini_width_ratio: f32,
    pub mini_min_size_dp: f32,
    pub mini_corner_radius_dp: f32,
    pub handle_bar_width_dp: f32,
    pub handle_bar_height_dp: f32,
    pub handle_bar_margin_dp: f32,
    pub handle_touch_padding_dp: f32,
    pub mini_handle_width_dp: f32,
    pub mini_handle_height_dp: f32,
}

impl Default for GeometryRatios {
    fn default() -> Self {
        use crate::constants::geometry as g;
        Self {
            virtual_aspect: g::VIRTUAL_ASPECT,
            large_width_ratio: g::LARGE_WIDTH_RATIO,
            max_large_height_ratio: g::MAX_LARGE_HEIGHT_RATIO,
            large_corner_radius_dp: g::LARGE_CORNER_RADIUS_DP,
            mini_width_ratio: g::MINI_WIDTH_RATIO,
            mini_min_size_dp: g::MINI_MIN_SIZE_DP,
            mini_corner_radius_dp: g::MINI_CORNER_RADIUS_DP,
            handle_bar_width_dp: g::HANDLE_BAR_WIDTH_DP,
            handle_bar_height_dp: g::HANDLE_BAR_HEIGHT_DP,
            handle_bar_margin_dp: g::HANDLE_BAR_MARGIN_DP,
            handle_touch_padding_dp: g::HANDLE_TOUCH_PADDING_DP,
            mini_handle_width_dp: g::MINI_HANDLE_WIDTH_DP,
            mini_handle_height_dp: g::MINI_HANDLE_HEIGHT_DP,
        }
    }
}

/// Handle sizes in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleMetrics {
    pub bar_width: i32,
    pub bar_height: i32,
    pub bar_margin: i32,
    pub touch_padding: i32,
    pub mini_handle_width: i32,
    pub mini_handle_height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub screen_width: i32,
    pub screen_height: i32,
    pub top_inset: i32,
    pub bottom_inset: i32,
    pub large_x: i32,
    pub large_y: i32,
    pub large_width: i32,
    pub large_height: i32,
    pub large_corner_radius: i32,
    pub mini_size: i32,
    pub mini_height: i32,
    pub mini_scale: f32,
    pub mini_clip: ClipRect,
    pub mini_corner_radius: i32,
    pub handle: HandleMetrics,
}

/// Converts density-independent pixels using the display density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Density(pub f32);

impl Density {
    pub fn dp_to_px(self, dp: f32) -> i32 {
        (dp * self.0).round() as i32
    }
}

pub fn calculate(
    metrics: ScreenMetrics,
    ratios: &GeometryRatios,
    dp_to_px: impl Fn(f32) -> i32,
) -> Geometry {
    let mut large_width = (metrics.width as f32 * ratios.large_width_ratio).round() as i32;
    let mut large_height = (large_width as f32 / ratios.virtual_aspect).round() as i32;

    let max_large_height = (metrics.height as f32 * ratios.max_large_height_ratio).round() as i32;
    if large_height > max_large_height {
        large_height = max_large_height;
        large_width = (large_height as f32 * ratios.virtual_aspect).round() as i32;
    }

    let large_width = large_width.max(1);
    let large_height = large_height.max(1);

    let large_x = ((metrics.width - large_width) / 2).max(0);
    let large_y = ((metrics.height - large_height) / 2).max(metrics.top_inset);

    let min_mini = dp_to_px(ratios.mini_min_size_dp);
    let mini_size = ((metrics.width as f32 * ratios.mini_width_ratio).round() as i32).max(min_mini);
    let mini_scale = mini_size as f32 / large_width as f32;
    let mini_height = ((large_height as f32 * mini_scale).round() as i32).max(1);

    Geometry {
        screen_width: metrics.width,
        screen_height: metrics.height,
        top_inset: metrics.top_inset,
        bottom_inset: metrics.bottom_inset,
        large_x,
        large_y,
        large_width,
        large_height,
        large_corner_radius: dp_to_px(ratios.large_corner_radius_dp),
        mini_size,
        mini_height,
        mini_scale,
        mini_clip: ClipRect::new(0, 0, large_width, large_height),
        mini_corner_radius: dp_to_px(ratios.mini_corner_radius_dp),
        handle: HandleMetrics {
            bar_width: dp_to_px(ratios.handle_bar_width_dp),
            bar_height: dp_to_px(ratios.handle_bar_height_dp),
            bar_margin: dp_to_px(ratios.handle_bar_margin_dp),
            touch_padding: dp_to_px(ratios.handle_touch_padding_dp),
            mini_handle_width: dp_to_px(ratios.mini_handle_width_dp),
            mini_handle_height: dp_to_px(ratios.mini_handle_height_dp),
        },
    }
}

/// Visual top-left -> pre-scale layer coordinate for a layer pivoted at its far edge
pub fn visual_to_content(visual: i32, dimension: i32, scale: f32) -> i32 {
    (visual as f32 - dimension as f32 * (1.0 - scale)).round() as i32
}

/// Inverse of [`visual_to_content`]
pub fn content_to_visual(content: i32, dimension: i32, scale: f32) -> i32 {
    (content as f32 + dimension as f32 * (1.0 - scale)).round() as i32
}

impl Geometry {
    pub fn large_position(&self) -> Position {
        Position::new(self.large_x, self.large_y)
    }

    pub fn large_dimensions(&self) -> Dimensions {
        Dimensions::new(self.large_width, self.large_height)
    }

    pub fn mini_dimensions(&self) -> Dimensions {
        Dimensions::new(self.mini_size, self.mini_height)
    }

    pub fn full_clip(&self) -> ClipRect {
        ClipRect::full(self.large_dimensions())
    }

    /// Visual position -> content layer position at `scale`
    pub fn to_content(&self, visual: Position, scale: f32) -> Position {
        Position::new(
            visual_to_content(visual.x, self.large_width, scale),
            visual_to_content(visual.y, self.large_height, scale),
        )
    }

    /// Content layer position -> visual position at `scale`
    pub fn to_visual(&self, content: Position, scale: f32) -> Position {
        Position::new(
            content_to_visual(content.x, self.large_width, scale),
            content_to_visual(content.y, self.large_height, scale),
        )
    }

    /// Keeps a mini window between the system bars
    pub fn clamp_mini_y(&self, y: i32) -> i32 {
        let min_y = self.top_inset;
        let max_y = (self.screen_height - self.bottom_inset - self.mini_height).max(min_y);
        y.clamp(min_y, max_y)
    }

    /// Horizontal range a mini window may be dragged through
    pub fn clamp_mini_drag_x(&self, x: i32) -> i32 {
        x.clamp(-self.mini_size / 2, self.screen_width - self.mini_size / 2)
    }

    /// Handle bar top-left for a content window at visual `(x, y)` and `scale`
    pub fn handle_position(&self, visual: Position, scale: f32) -> Position {
        let scaled_width = self.large_width as f32 * scale;
        let scaled_height = self.large_height as f32 * scale;
        Position::new(
            (visual.x as f32 + (scaled_width - self.handle.bar_width as f32) / 2.0).round() as i32,
            (visual.y as f32 + scaled_height + self.handle.bar_margin as f32).round() as i32,
        )
    }

    /// Hit area of the handle bar at `handle` including touch padding
    pub fn handle_hit_rect(&self, handle: Position) -> HitRect {
        HitRect {
            left: handle.x as f32,
            top: handle.y as f32,
            right: (handle.x + self.handle.bar_width) as f32,
            bottom: (handle.y + self.handle.bar_height) as f32,
        }
        .inflate(self.handle.touch_padding as f32)
    }

    /// Drag distance that commits Large -> Mini
    pub fn mini_trigger_distance(&self, ratio: f32) -> f32 {
        self.screen_height as f32 * ratio
    }

    /// Distance past a screen edge that masks a mini window
    pub fn mask_threshold(&self, ratio: f32) -> i32 {
        (self.mini_size as f32 * ratio).round() as i32
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn default_ratios() -> GeometryRatios {
        GeometryRatios::default()
    }

    fn px(dp: f32) -> i32 {
        Density(1.0).dp_to_px(dp)
    }

    fn metrics(width: i32, height: i32) -> ScreenMetrics {
        ScreenMetrics { width, height, top_inset: 0, bottom_inset: 0 }
    }

    #[test]
    fn test_tall_screen_uses_width_ratio() {
        let geo = calculate(metrics(1080, 2400), &default_ratios(), px);
        assert_eq!(geo.large_width, 756);
        assert_eq!(geo.large_height, 1344);
        assert_eq!(geo.large_x, 162);
        assert_eq!(geo.large_y, 528);
    }

    #[test]
    fn test_short_screen_clamps_height_and_keeps_aspect() {
        let geo = calculate(metrics(1080, 1200), &default_ratios(), px);
        assert_eq!(geo.large_height, 960);
        assert_eq!(geo.large_width, 540);
        assert_eq!(geo.large_x, 270);
        assert_eq!(geo.large_y, 120);
    }

    #[test]
    fn test_large_y_never_above_top_inset() {
        let geo = calculate(
            ScreenMetrics { width: 1080, height: 1200, top_inset: 200, bottom_inset: 0 },
            &default_ratios(),
            px,
        );
        assert_eq!(geo.large_y, 200);
    }

    #[test]
    fn test_mini_size_respects_dp_minimum() {
        // 10% of 1080 is 108px but 80dp at 2.625 is 210px
        let geo = calculate(metrics(1080, 2400), &default_ratios(), |dp| Density(2.625).dp_to_px(dp));
        assert_eq!(geo.mini_size, 210);
        assert!((geo.mini_scale - 210.0 / 756.0).abs() < 1e-6);
        assert_eq!(geo.mini_height, (1344.0_f32 * geo.mini_scale).round() as i32);
        assert_eq!(geo.mini_clip, ClipRect::new(0, 0, 756, 1344));
        assert_eq!(geo.mini_corner_radius, 63);
    }

    #[test]
    fn test_degenerate_screen_floors_at_one_pixel() {
        let geo = calculate(metrics(1, 1), &default_ratios(), |_| 0);
        assert!(geo.large_width >= 1);
        assert!(geo.large_height >= 1);
        assert!(geo.mini_height >= 1);
    }

    #[test]
    fn test_visual_content_round_trip_within_one_pixel() {
        let dimension = 1344;
        for step in 1..=20 {
            let scale = step as f32 / 20.0;
            for visual in (-600..=2400).step_by(37) {
                let content = visual_to_content(visual, dimension, scale);
                let back = content_to_visual(content, dimension, scale);
                assert!((back - visual).abs() <= 1, "visual={visual} scale={scale} back={back}");
            }
        }
    }

    #[test]
    fn test_identity_at_full_scale() {
        assert_eq!(visual_to_content(123, 756, 1.0), 123);
        assert_eq!(content_to_visual(-45, 756, 1.0), -45);
    }

    #[test]
    fn test_clamp_mini_y_between_insets() {
        let geo = calculate(
            ScreenMetrics { width: 1080, height: 2400, top_inset: 80, bottom_inset: 120 },
            &default_ratios(),
            px,
        );
        assert_eq!(geo.clamp_mini_y(0), 80);
        assert_eq!(geo.clamp_mini_y(5000), 2400 - 120 - geo.mini_height);
        assert_eq!(geo.clamp_mini_y(900), 900);
    }

    #[test]
    fn test_handle_sits_below_large_window() {
        let geo = calculate(metrics(1080, 2400), &default_ratios(), px);
        let handle = geo.handle_position(geo.large_position(), 1.0);
        assert_eq!(handle, Position::new(162 + (756 - 50) / 2, 528 + 1344 + 6));
        let hit = geo.handle_hit_rect(handle);
        assert!(hit.contains(540.0, 1878.0 + 2.0));
        assert!(!hit.contains(540.0, 1800.0));
    }
}
