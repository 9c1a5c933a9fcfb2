//! Animated moves between window modes
//!
//! Every transition goes through [`OverlayService::run_transition`], which
//! brackets it with `ActiveTransitionChanged` so the store always knows
//! whether an animation is in flight.

use tracing::{debug, warn};

use super::OverlayService;
use crate::animation::{self, AnimationCallbacks};
use crate::core::{OverlayMode, SystemEvent};
use crate::host::LayerKind;
use crate::snapping;
use crate::types::{ClipRect, Position, lerp_f32, lerp_i32};

type Hook = Box<dyn FnMut(&mut OverlayService)>;

fn hook(f: impl FnMut(&mut OverlayService) + 'static) -> Hook {
    Box::new(f)
}

/// Transition tag as reported in the state, e.g. `large_to_mini_380ms`
pub fn transition_tag(name: &str, duration_ms: u64) -> String {
    format!("{name}_{duration_ms}ms")
}

impl OverlayService {
    fn run_transition(
        &mut self,
        name: &str,
        duration_ms: u64,
        mut on_start: Hook,
        on_frame: impl FnMut(&mut OverlayService, f32) + 'static,
        mut on_end: Hook,
    ) {
        let tag = transition_tag(name, duration_ms);
        debug!(transition = %tag, "Starting transition");

        let callbacks = AnimationCallbacks::new()
            .on_start(move |svc: &mut OverlayService| {
                svc.dispatch(SystemEvent::ActiveTransitionChanged(Some(tag.clone())));
                on_start(svc);
            })
            .on_frame(on_frame)
            .on_end(move |svc: &mut OverlayService| {
                svc.dispatch(SystemEvent::ActiveTransitionChanged(None));
                on_end(svc);
            })
            .on_cancel(|svc: &mut OverlayService| {
                svc.dispatch(SystemEvent::ActiveTransitionChanged(None));
            });

        let now = self.host.clock.now_ms();
        animation::start(self, now, duration_ms, callbacks);
    }

    /// Move, scale and clip the content window from wherever it is now
    #[allow(clippy::too_many_arguments)]
    fn animate_content_window(
        &mut self,
        name: &str,
        target: Position,
        target_scale: f32,
        target_clip: Option<ClipRect>,
        duration_ms: u64,
        on_start: Hook,
        mut on_end: Hook,
    ) {
        let (Some(geo), Some((start, start_scale, start_clip))) = (self.geometry, self.content_visual()) else {
            warn!(transition = name, "Overlay not attached, skipping transition");
            return;
        };
        let end_clip = target_clip.unwrap_or_else(|| geo.full_clip());

        self.run_transition(
            name,
            duration_ms,
            on_start,
            move |svc, progress| {
                let position = Position::new(
                    lerp_i32(start.x, target.x, progress),
                    lerp_i32(start.y, target.y, progress),
                );
                let scale = lerp_f32(start_scale, target_scale, progress);
                let clip = ClipRect::lerp(start_clip, end_clip, progress);
                svc.apply_content_frame(position, scale, Some(clip));
            },
            hook(move |svc| {
                svc.apply_content_frame(target, target_scale, target_clip);
                on_end(svc);
            }),
        );
    }

    /// Move the mini touch layer and the mini-scaled content together
    fn animate_mini_pair(
        &mut self,
        name: &str,
        target: Position,
        duration_ms: u64,
        mut on_start: Hook,
        mut on_end: Hook,
    ) {
        let (Some(geo), Some(start_mini), Some((start_content, _, _))) =
            (self.geometry, self.mini_position(), self.content_visual())
        else {
            warn!(transition = name, "Overlay not attached, skipping transition");
            return;
        };

        self.run_transition(
            name,
            duration_ms,
            hook(move |svc| {
                on_start(svc);
                svc.set_touchable(LayerKind::Content, false);
                svc.set_touchable(LayerKind::Background, false);
                svc.set_touchable(LayerKind::MiniTouch, true);
                svc.set_visible(LayerKind::MiniTouch, true);
            }),
            move |svc, progress| {
                svc.apply_mini_frame(Position::new(
                    lerp_i32(start_mini.x, target.x, progress),
                    lerp_i32(start_mini.y, target.y, progress),
                ));
                svc.apply_content_frame(
                    Position::new(
                        lerp_i32(start_content.x, target.x, progress),
                        lerp_i32(start_content.y, target.y, progress),
                    ),
                    geo.mini_scale,
                    Some(geo.mini_clip),
                );
            },
            hook(move |svc| {
                svc.apply_mini_frame(target);
                svc.apply_content_frame(target, geo.mini_scale, Some(geo.mini_clip));
                on_end(svc);
            }),
        );
    }

    pub(crate) fn animate_large_to_mini(&mut self, target: Position) {
        let Some(geo) = self.geometry else {
            return;
        };
        let target = Position::new(target.x, geo.clamp_mini_y(target.y));

        self.animate_content_window(
            "large_to_mini",
            target,
            geo.mini_scale,
            Some(geo.mini_clip),
            self.timing.size_switch_ms,
            hook(|svc| {
                svc.set_touchable(LayerKind::Content, false);
                svc.set_touchable(LayerKind::Background, false);
                svc.set_touchable(LayerKind::MiniTouch, false);
                svc.set_visible(LayerKind::MiniTouch, false);
                svc.set_visible(LayerKind::HandleBar, false);
                svc.clear_masked_visuals();
            }),
            hook(move |svc| {
                svc.update_mode(OverlayMode::Mini);
                svc.remember_mini_position(target);
                svc.apply_mini_frame(target);
                svc.apply_mini_visual_state(false);
            }),
        );
    }

    pub(crate) fn animate_mini_to_large(&mut self) {
        let Some(geo) = self.geometry else {
            return;
        };
        self.animate_content_window(
            "mini_to_large",
            geo.large_position(),
            1.0,
            None,
            self.timing.size_switch_ms,
            hook(|svc| {
                svc.set_touchable(LayerKind::MiniTouch, false);
                svc.set_visible(LayerKind::MiniTouch, false);
                svc.clear_masked_visuals();
                svc.set_touchable(LayerKind::Background, true);
            }),
            hook(|svc| {
                svc.update_mode(OverlayMode::Large);
                svc.apply_large_visual_state(false);
            }),
        );
    }

    /// Snap back after a handle drag that did not reach the trigger
    pub(crate) fn animate_back_to_large(&mut self) {
        let Some(geo) = self.geometry else {
            return;
        };
        self.animate_content_window(
            "snap_to_large",
            geo.large_position(),
            1.0,
            None,
            self.timing.snap_ms,
            hook(|svc| {
                svc.set_touchable(LayerKind::Content, false);
                svc.set_touchable(LayerKind::Background, true);
                svc.set_touchable(LayerKind::MiniTouch, false);
                svc.set_visible(LayerKind::MiniTouch, false);
                svc.clear_masked_visuals();
            }),
            hook(|svc| {
                svc.update_mode(OverlayMode::Large);
                svc.apply_large_visual_state(false);
            }),
        );
    }

    pub(crate) fn animate_mini_to_docked(&mut self, target: Position) {
        let Some(geo) = self.geometry else {
            return;
        };
        let target = Position::new(target.x, geo.clamp_mini_y(target.y));

        self.animate_mini_pair(
            "mini_to_docked",
            target,
            self.timing.snap_ms,
            hook(|svc| {
                svc.update_mode(OverlayMode::Mini);
                svc.apply_mini_visual_state(false);
            }),
            hook(move |svc| {
                svc.remember_mini_position(target);
                svc.update_mode(OverlayMode::Mini);
                svc.apply_mini_visual_state(false);
            }),
        );
    }

    /// Hide half the window behind the current dock edge
    pub(crate) fn animate_mini_to_masked(&mut self, y: i32) {
        let Some(geo) = self.geometry else {
            return;
        };
        let y = geo.clamp_mini_y(y);
        let side = self.store.with_state(|s| s.context.dock_side);
        let target = Position::new(snapping::masked_x(side, geo.mini_size, geo.screen_width), y);
        let visible = Position::new(snapping::docked_x(side, geo.mini_size, geo.screen_width), y);
        self.remember_mini_position(visible);

        self.animate_mini_pair(
            "mini_to_masked",
            target,
            self.timing.mask_ms,
            hook(|svc| {
                svc.update_mode(OverlayMode::Mini);
                svc.apply_mini_visual_state(false);
            }),
            hook(|svc| {
                svc.update_mode(OverlayMode::MiniMasked);
                svc.apply_mini_visual_state(true);
            }),
        );
    }

    pub(crate) fn animate_masked_to_mini(&mut self) {
        let Some(geo) = self.geometry else {
            return;
        };
        let side = self.store.with_state(|s| s.context.dock_side);
        let x = snapping::docked_x(side, geo.mini_size, geo.screen_width);
        let y = match self.mini_position() {
            Some(current) => current.y,
            None => self.resolve_mini_target().y,
        };
        let target = Position::new(x, geo.clamp_mini_y(y));

        self.animate_mini_pair(
            "masked_to_mini",
            target,
            self.timing.mask_ms,
            hook(|svc| {
                svc.update_mode(OverlayMode::Mini);
                svc.apply_mini_visual_state(false);
            }),
            hook(move |svc| {
                svc.update_mode(OverlayMode::Mini);
                svc.remember_mini_position(target);
                svc.apply_mini_visual_state(false);
            }),
        );
    }

    /// Re-anchor a masked window that was dragged but not pulled back in
    pub(crate) fn animate_masked_stay(&mut self, y: i32) {
        let Some(geo) = self.geometry else {
            return;
        };
        let side = self.store.with_state(|s| s.context.dock_side);
        let target = Position::new(
            snapping::masked_x(side, geo.mini_size, geo.screen_width),
            geo.clamp_mini_y(y),
        );

        self.animate_mini_pair(
            "masked_stay",
            target,
            self.timing.snap_ms,
            hook(|svc| {
                svc.update_mode(OverlayMode::MiniMasked);
                svc.apply_mini_visual_state(true);
            }),
            hook(|svc| {
                svc.update_mode(OverlayMode::MiniMasked);
                svc.apply_mini_visual_state(true);
            }),
        );
    }

    /// Command-driven size switch, ignored mid-animation
    pub(crate) fn toggle_window_size(&mut self) {
        if self.is_animating() {
            debug!("Toggle ignored while animating");
            return;
        }
        match self.current_mode() {
            OverlayMode::Large => {
                let target = self.resolve_mini_target();
                self.animate_large_to_mini(target);
            }
            OverlayMode::Mini | OverlayMode::MiniMasked => self.animate_mini_to_large(),
        }
    }
}
