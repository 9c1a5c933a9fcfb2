//! Layer bookkeeping and per-mode visual states

use tracing::warn;

use super::OverlayService;
use crate::constants::gesture::{MASKED_HANDLE_CENTER_LEFT, MASKED_HANDLE_CENTER_RIGHT};
use crate::core::{DockSide, OverlayMode};
use crate::geometry::Geometry;
use crate::host::{LayerKind, LayerParams, LayerStyle};
use crate::types::{ClipRect, Dimensions, Position};

/// Last parameters pushed to the compositor for every attached layer
#[derive(Debug, Clone)]
pub(crate) struct Layers {
    pub background: LayerParams,
    pub handle_bar: LayerParams,
    pub content: LayerParams,
    pub mini: LayerParams,
    pub content_style: LayerStyle,
    pub mini_style: LayerStyle,
}

impl Layers {
    /// Initial layout: large window centered, mini layer hidden at `mini_at`
    pub fn build(geo: &Geometry, mini_at: Position, trusted: bool) -> Self {
        let background = LayerParams::new(
            Position::new(0, 0),
            Dimensions::new(geo.screen_width, geo.screen_height),
            trusted,
        );

        let mut handle_bar = LayerParams::new(
            geo.handle_position(geo.large_position(), 1.0),
            Dimensions::new(geo.handle.bar_width, geo.handle.bar_height),
            trusted,
        );
        // Hit-tested through the background layer
        handle_bar.touchable = false;

        let content = LayerParams::new(geo.large_position(), geo.large_dimensions(), trusted);

        let mut mini = LayerParams::new(mini_at, geo.mini_dimensions(), trusted);
        mini.touchable = false;
        mini.visible = false;

        Self {
            background,
            handle_bar,
            content,
            mini,
            content_style: LayerStyle {
                corner_radius: geo.large_corner_radius,
                ..LayerStyle::default()
            },
            mini_style: LayerStyle {
                corner_radius: geo.mini_corner_radius,
                ..LayerStyle::default()
            },
        }
    }

    pub fn params(&self, kind: LayerKind) -> &LayerParams {
        match kind {
            LayerKind::Background => &self.background,
            LayerKind::HandleBar => &self.handle_bar,
            LayerKind::Content => &self.content,
            LayerKind::MiniTouch => &self.mini,
        }
    }

    pub fn params_mut(&mut self, kind: LayerKind) -> &mut LayerParams {
        match kind {
            LayerKind::Background => &mut self.background,
            LayerKind::HandleBar => &mut self.handle_bar,
            LayerKind::Content => &mut self.content,
            LayerKind::MiniTouch => &mut self.mini,
        }
    }

    pub fn style_mut(&mut self, kind: LayerKind) -> Option<&mut LayerStyle> {
        match kind {
            LayerKind::Content => Some(&mut self.content_style),
            LayerKind::MiniTouch => Some(&mut self.mini_style),
            LayerKind::Background | LayerKind::HandleBar => None,
        }
    }
}

/// Top-left of the edge grab handle inside a masked mini window
pub(crate) fn edge_handle_position(geo: &Geometry, side: DockSide) -> Position {
    let ratio = match side {
        DockSide::Left => MASKED_HANDLE_CENTER_LEFT,
        DockSide::Right => MASKED_HANDLE_CENTER_RIGHT,
    };
    let width = geo.handle.mini_handle_width;
    let height = geo.handle.mini_handle_height;
    let left = (geo.mini_size as f32 * ratio - width as f32 / 2.0).round() as i32;
    let top = ((geo.mini_height - height) as f32 / 2.0).round() as i32;
    Position::new(left.clamp(0, (geo.mini_size - width).max(0)), top.max(0))
}

impl OverlayService {
    /// Mutate one layer and push it. Placement failures are logged and dropped.
    pub(crate) fn modify_layer(&mut self, kind: LayerKind, f: impl FnOnce(&mut LayerParams)) {
        let Some(layers) = self.layers.as_mut() else {
            return;
        };
        let params = layers.params_mut(kind);
        f(params);
        let params = *params;
        if let Err(e) = self.host.compositor.update_layer(kind, &params) {
            warn!(layer = ?kind, error = %e, "Failed to update overlay layer");
        }
    }

    pub(crate) fn style_layer(&mut self, kind: LayerKind, f: impl FnOnce(&mut LayerStyle)) {
        let Some(style) = self.layers.as_mut().and_then(|layers| layers.style_mut(kind)) else {
            return;
        };
        f(style);
        let style = *style;
        if let Err(e) = self.host.compositor.apply_style(kind, &style) {
            warn!(layer = ?kind, error = %e, "Failed to style overlay layer");
        }
    }

    pub(crate) fn set_touchable(&mut self, kind: LayerKind, touchable: bool) {
        self.modify_layer(kind, |p| p.touchable = touchable);
    }

    pub(crate) fn set_visible(&mut self, kind: LayerKind, visible: bool) {
        self.modify_layer(kind, |p| p.visible = visible);
    }

    /// Place the content window at visual `position`, converting to content coordinates
    pub(crate) fn apply_content_frame(&mut self, visual: Position, scale: f32, clip: Option<ClipRect>) {
        let Some(geo) = self.geometry else {
            return;
        };
        let position = geo.to_content(visual, scale);
        let handle_visible = self
            .layers
            .as_ref()
            .is_some_and(|layers| layers.handle_bar.visible);

        if handle_visible {
            self.update_handle_bar(visual, scale);
        }
        self.modify_layer(LayerKind::Content, |p| {
            p.position = position;
            p.scale = scale;
            p.clip = clip;
        });
    }

    pub(crate) fn apply_mini_frame(&mut self, position: Position) {
        self.modify_layer(LayerKind::MiniTouch, |p| p.position = position);
    }

    pub(crate) fn update_handle_bar(&mut self, visual: Position, scale: f32) {
        let Some(geo) = self.geometry else {
            return;
        };
        let position = geo.handle_position(visual, scale);
        self.modify_layer(LayerKind::HandleBar, |p| p.position = position);
    }

    /// Visual position, scale and clip of the content window as last applied
    pub(crate) fn content_visual(&self) -> Option<(Position, f32, ClipRect)> {
        let geo = self.geometry?;
        let content = self.layers.as_ref()?.content;
        Some((
            geo.to_visual(content.position, content.scale),
            content.scale,
            content.clip.unwrap_or_else(|| geo.full_clip()),
        ))
    }

    pub(crate) fn mini_position(&self) -> Option<Position> {
        self.layers.as_ref().map(|layers| layers.mini.position)
    }

    pub(crate) fn apply_large_visual_state(&mut self, immediate: bool) {
        let Some(geo) = self.geometry else {
            return;
        };
        self.update_mode(OverlayMode::Large);

        self.set_visible(LayerKind::Background, true);
        self.clear_masked_visuals();
        self.set_visible(LayerKind::HandleBar, true);
        self.style_layer(LayerKind::Content, |s| s.corner_radius = geo.large_corner_radius);

        let passthrough = self.store.with_state(|s| s.context.touch_passthrough);
        self.set_touchable(LayerKind::Background, true);
        self.set_touchable(LayerKind::Content, !passthrough);
        self.set_touchable(LayerKind::MiniTouch, false);
        self.set_visible(LayerKind::MiniTouch, false);

        let scale = self.layers.as_ref().map_or(1.0, |layers| layers.content.scale);
        self.update_handle_bar(geo.large_position(), scale);

        if immediate {
            self.apply_content_frame(geo.large_position(), 1.0, None);
        }
    }

    pub(crate) fn apply_mini_visual_state(&mut self, masked: bool) {
        let Some(geo) = self.geometry else {
            return;
        };
        self.set_visible(LayerKind::Background, false);
        self.set_visible(LayerKind::HandleBar, false);
        self.style_layer(LayerKind::Content, |s| s.corner_radius = geo.mini_corner_radius);

        self.set_touchable(LayerKind::Background, false);
        self.set_touchable(LayerKind::Content, false);
        self.set_touchable(LayerKind::MiniTouch, true);
        self.set_visible(LayerKind::MiniTouch, true);

        if masked {
            let side = self.store.with_state(|s| s.context.dock_side);
            let handle = edge_handle_position(&geo, side);
            self.style_layer(LayerKind::Content, |s| s.masked = true);
            self.style_layer(LayerKind::MiniTouch, |s| {
                s.masked = true;
                s.edge_handle = Some(handle);
            });
        } else {
            self.clear_masked_visuals();
        }
    }

    pub(crate) fn clear_masked_visuals(&mut self) {
        self.style_layer(LayerKind::Content, |s| s.masked = false);
        self.style_layer(LayerKind::MiniTouch, |s| {
            s.masked = false;
            s.edge_handle = None;
        });
    }
}
