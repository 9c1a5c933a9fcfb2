//! Touch handling per capture region: taps, handle drags, mini drags

use tracing::{debug, warn};

use super::OverlayService;
use crate::config::GestureConfig;
use crate::core::{DockSide, OverlayMode, SystemEvent, TouchSubState};
use crate::geometry::Geometry;
use crate::gesture::{self, RawTouch, TouchAction, TouchSource};
use crate::snapping::{self, MiniRelease};
use crate::types::{ClipRect, Position, lerp_f32};

/// In-progress gesture, one variant per capture region
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DragSession {
    /// Press on the background outside the handle
    Background { down_x: f32, down_y: f32 },
    /// Press on the handle bar of the large window
    Handle {
        start_y: f32,
        distance: f32,
        preview: f32,
        detected: bool,
    },
    Mini {
        down_x: f32,
        down_y: f32,
        start: Position,
        dragging: bool,
    },
    Masked { down_x: f32, down_y: f32, dragging: bool },
}

/// Last docked, fully visible mini position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiniPlacement {
    pub x: i32,
    pub y: i32,
}

/// Content frame for a handle drag with smoothed distance `distance`
pub(crate) fn drag_preview(geo: &Geometry, gesture: &GestureConfig, distance: f32) -> (Position, f32, ClipRect) {
    let trigger = geo.mini_trigger_distance(gesture.mini_trigger_distance_ratio);
    let progress = (distance / trigger).clamp(0.0, 1.0);
    let damped = 1.0 - (1.0 - progress).powf(gesture.drag_damping_power);
    let overshoot = (distance - trigger).max(0.0) * gesture.drag_overshoot_resistance;
    let lift = trigger * damped + overshoot;

    let scale = lerp_f32(1.0, geo.mini_scale, damped);
    let scaled_width = geo.large_width as f32 * scale;
    let scaled_height = geo.large_height as f32 * scale;

    let x = (geo.large_x as f32 + (geo.large_width as f32 - scaled_width) / 2.0).round() as i32;
    let bottom = (geo.large_y + geo.large_height) as f32;
    let y = (bottom - lift - scaled_height).round() as i32;
    let clip = ClipRect::lerp(geo.full_clip(), geo.mini_clip, damped);

    (Position::new(x, y), scale, clip)
}

/// Exponential smoothing of the raw drag distance, seeded by the first sample
pub(crate) fn smooth(previous: f32, sample: f32, alpha: f32) -> f32 {
    if previous == 0.0 {
        sample
    } else {
        previous + (sample - previous) * alpha
    }
}

fn beyond_slop(dx: f32, dy: f32, slop: f32) -> bool {
    dx.abs() > slop || dy.abs() > slop
}

impl OverlayService {
    pub(crate) fn handle_background_touch(&mut self, raw: &RawTouch) {
        if self.current_mode() != OverlayMode::Large || self.is_animating() {
            return;
        }

        if matches!(self.drag, Some(DragSession::Handle { .. })) || self.is_touch_on_handle(raw) {
            self.handle_large_window_drag(raw);
            return;
        }

        match raw.action {
            TouchAction::Down => {
                self.drag = Some(DragSession::Background {
                    down_x: raw.raw_x,
                    down_y: raw.raw_y,
                });
            }
            TouchAction::Up => {
                if let Some(DragSession::Background { down_x, down_y }) = self.drag.take() {
                    let slop = self.gesture.touch_slop_px;
                    if (raw.raw_x - down_x).abs() < slop && (raw.raw_y - down_y).abs() < slop {
                        let target = self.resolve_mini_target();
                        self.animate_large_to_mini(target);
                    }
                }
            }
            TouchAction::Cancel => self.drag = None,
            _ => {}
        }
    }

    pub(crate) fn handle_content_touch(&mut self, raw: &RawTouch) {
        if self.current_mode() != OverlayMode::Large || self.is_animating() {
            return;
        }
        if !self.store.with_state(|s| s.context.touch_passthrough) {
            self.inject_touch(raw);
        }
    }

    fn inject_touch(&mut self, raw: &RawTouch) {
        let Some(surface) = self.surface else {
            return;
        };
        let Some(geo) = self.geometry else {
            return;
        };
        if !matches!(
            raw.action,
            TouchAction::Down | TouchAction::Move | TouchAction::Up | TouchAction::Cancel
        ) {
            return;
        }
        if raw.action == TouchAction::Down {
            self.touch_down_time = self.host.clock.now_ms();
        }

        let x = raw.x.clamp(0.0, geo.large_width as f32);
        let y = raw.y.clamp(0.0, geo.large_height as f32);
        if let Err(e) = self
            .host
            .injector
            .inject(surface, x, y, raw.action, self.touch_down_time)
        {
            warn!(surface = surface.0, error = %e, "Failed to inject touch");
        }
    }

    fn is_touch_on_handle(&self, raw: &RawTouch) -> bool {
        let (Some(geo), Some(layers)) = (self.geometry, self.layers.as_ref()) else {
            return false;
        };
        layers.handle_bar.visible
            && geo
                .handle_hit_rect(layers.handle_bar.position)
                .contains(raw.raw_x, raw.raw_y)
    }

    fn handle_large_window_drag(&mut self, raw: &RawTouch) {
        match raw.action {
            TouchAction::Down => {
                self.drag = Some(DragSession::Handle {
                    start_y: raw.raw_y,
                    distance: 0.0,
                    preview: 0.0,
                    detected: false,
                });
            }
            TouchAction::Move => {
                let slop = self.gesture.touch_slop_px;
                let alpha = self.gesture.drag_smoothing_alpha;
                let Some(DragSession::Handle {
                    start_y,
                    distance,
                    preview,
                    detected,
                }) = self.drag.as_mut()
                else {
                    return;
                };

                *distance = (*start_y - raw.raw_y).max(0.0);
                let newly_detected = !*detected && *distance > slop;
                if newly_detected {
                    *detected = true;
                }
                let preview_distance = if *detected {
                    *preview = smooth(*preview, *distance, alpha);
                    Some(*preview)
                } else {
                    None
                };

                if newly_detected {
                    self.dispatch(SystemEvent::TouchSubStateChanged(TouchSubState::HandleDragging));
                }
                if let Some(preview) = preview_distance {
                    self.update_large_drag_preview(preview);
                }
            }
            action if action.ends_gesture() => {
                let Some(DragSession::Handle { distance, detected, .. }) = self.drag.take() else {
                    return;
                };
                let trigger = self.geometry.map_or(f32::INFINITY, |geo| {
                    geo.mini_trigger_distance(self.gesture.mini_trigger_distance_ratio)
                });

                self.dispatch(SystemEvent::TouchSubStateChanged(TouchSubState::Idle));
                if detected && distance >= trigger {
                    debug!(distance, trigger, "Handle drag committed");
                    let target = self.resolve_mini_target();
                    self.animate_large_to_mini(target);
                } else {
                    self.animate_back_to_large();
                }
            }
            _ => {}
        }
    }

    fn update_large_drag_preview(&mut self, distance: f32) {
        let Some(geo) = self.geometry else {
            return;
        };
        let (position, scale, clip) = drag_preview(&geo, &self.gesture, distance);
        self.apply_content_frame(position, scale, Some(clip));
    }

    /// Touches on the mini layer are interpreted by the current mode
    pub(crate) fn handle_mini_layer_touch(&mut self, raw: &RawTouch) {
        let source = match self.current_mode() {
            OverlayMode::Mini => TouchSource::Mini,
            OverlayMode::MiniMasked => TouchSource::MaskedMini,
            OverlayMode::Large => return,
        };
        self.dispatch(gesture::classify(source, raw));
        if self.is_animating() {
            return;
        }

        match source {
            TouchSource::Mini => self.handle_mini_window_touch(raw),
            _ => self.handle_masked_mini_touch(raw),
        }
    }

    fn handle_mini_window_touch(&mut self, raw: &RawTouch) {
        let Some(geo) = self.geometry else {
            return;
        };
        match raw.action {
            TouchAction::Down => {
                let Some(start) = self.mini_position() else {
                    return;
                };
                self.drag = Some(DragSession::Mini {
                    down_x: raw.raw_x,
                    down_y: raw.raw_y,
                    start,
                    dragging: false,
                });
            }
            TouchAction::Move => {
                let slop = self.gesture.touch_slop_px;
                let Some(DragSession::Mini {
                    down_x,
                    down_y,
                    start,
                    dragging,
                }) = self.drag.as_mut()
                else {
                    return;
                };

                let dx = raw.raw_x - *down_x;
                let dy = raw.raw_y - *down_y;
                let newly_dragging = !*dragging && beyond_slop(dx, dy, slop);
                if newly_dragging {
                    *dragging = true;
                }
                if !*dragging {
                    return;
                }
                let start = *start;

                if newly_dragging {
                    self.dispatch(SystemEvent::TouchSubStateChanged(TouchSubState::MiniDragging));
                }
                let next = Position::new(
                    geo.clamp_mini_drag_x((start.x as f32 + dx).round() as i32),
                    geo.clamp_mini_y((start.y as f32 + dy).round() as i32),
                );
                self.apply_mini_frame(next);
                self.apply_content_frame(next, geo.mini_scale, Some(geo.mini_clip));
            }
            action if action.ends_gesture() => {
                let Some(DragSession::Mini { dragging, .. }) = self.drag.take() else {
                    return;
                };
                if !dragging {
                    self.animate_mini_to_large();
                    return;
                }

                let Some(current) = self.mini_position() else {
                    return;
                };
                let y = geo.clamp_mini_y(current.y);
                let threshold = geo.mask_threshold(self.gesture.mini_mask_trigger_ratio);
                let release = snapping::resolve_mini_release(current.x, geo.mini_size, geo.screen_width, threshold);
                debug!(x = current.x, y, release = ?release, "Mini drag released");

                self.update_dock_side(release.side());
                self.dispatch(SystemEvent::TouchSubStateChanged(TouchSubState::Idle));
                match release {
                    MiniRelease::Mask(_) => self.animate_mini_to_masked(y),
                    MiniRelease::Dock(side) => {
                        let x = snapping::docked_x(side, geo.mini_size, geo.screen_width);
                        self.animate_mini_to_docked(Position::new(x, y));
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_masked_mini_touch(&mut self, raw: &RawTouch) {
        let Some(geo) = self.geometry else {
            return;
        };
        match raw.action {
            TouchAction::Down => {
                self.drag = Some(DragSession::Masked {
                    down_x: raw.raw_x,
                    down_y: raw.raw_y,
                    dragging: false,
                });
            }
            TouchAction::Move => {
                let slop = self.gesture.touch_slop_px;
                let Some(DragSession::Masked {
                    down_x,
                    down_y,
                    dragging,
                }) = self.drag.as_mut()
                else {
                    return;
                };

                let dx = raw.raw_x - *down_x;
                let dy = raw.raw_y - *down_y;
                let newly_dragging = !*dragging && beyond_slop(dx, dy, slop);
                if newly_dragging {
                    *dragging = true;
                }
                if !*dragging {
                    return;
                }
                // Vertical movement is applied incrementally
                *down_y = raw.raw_y;

                if newly_dragging {
                    self.dispatch(SystemEvent::TouchSubStateChanged(TouchSubState::MaskedMiniDragging));
                }
                let Some(current) = self.mini_position() else {
                    return;
                };
                let side = self.store.with_state(|s| s.context.dock_side);
                let next = Position::new(
                    snapping::masked_x(side, geo.mini_size, geo.screen_width),
                    geo.clamp_mini_y((current.y as f32 + dy).round() as i32),
                );
                self.apply_mini_frame(next);
                self.apply_content_frame(next, geo.mini_scale, Some(geo.mini_clip));
            }
            action if action.ends_gesture() => {
                let Some(DragSession::Masked { down_x, dragging, .. }) = self.drag.take() else {
                    return;
                };
                if !dragging {
                    self.animate_masked_to_mini();
                    return;
                }

                let side = self.store.with_state(|s| s.context.dock_side);
                let restore = snapping::is_inward_restore(
                    side,
                    raw.raw_x - down_x,
                    geo.mini_size,
                    self.gesture.mask_inward_restore_ratio,
                );
                self.dispatch(SystemEvent::TouchSubStateChanged(TouchSubState::Idle));
                if restore {
                    self.animate_masked_to_mini();
                } else {
                    let y = geo.clamp_mini_y(self.mini_position().map_or(0, |p| p.y));
                    self.animate_masked_stay(y);
                }
            }
            _ => {}
        }
    }

    /// Where the window goes when it next becomes mini. Updates the dock side.
    pub(crate) fn resolve_mini_target(&mut self) -> Position {
        let Some(geo) = self.geometry else {
            return Position::default();
        };
        let Some(placement) = self.placement else {
            let y = geo.clamp_mini_y((geo.screen_height as f32 * self.gesture.first_mini_y_ratio).round() as i32);
            self.update_dock_side(DockSide::Right);
            return Position::new(geo.screen_width - geo.mini_size, y);
        };

        let side = if placement.x <= 0 {
            DockSide::Left
        } else {
            DockSide::Right
        };
        self.update_dock_side(side);
        Position::new(
            snapping::docked_x(side, geo.mini_size, geo.screen_width),
            geo.clamp_mini_y(placement.y),
        )
    }

    /// Always stores the docked coordinate, never a masked one
    pub(crate) fn remember_mini_position(&mut self, position: Position) {
        let Some(geo) = self.geometry else {
            return;
        };
        let x = snapping::remembered_x(position.x, geo.mini_size, geo.screen_width);
        self.placement = Some(MiniPlacement {
            x,
            y: geo.clamp_mini_y(position.y),
        });
        let side = if x == 0 {
            DockSide::Left
        } else {
            DockSide::Right
        };
        self.update_dock_side(side);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Density, ScreenMetrics, calculate, tests::default_ratios};

    fn geometry() -> Geometry {
        let metrics = ScreenMetrics { width: 1080, height: 2400, top_inset: 0, bottom_inset: 0 };
        calculate(metrics, &default_ratios(), |dp| Density(2.625).dp_to_px(dp))
    }

    #[test]
    fn test_preview_at_rest_is_large_frame() {
        let geo = geometry();
        let (position, scale, clip) = drag_preview(&geo, &GestureConfig::default(), 0.0);
        assert_eq!(position, geo.large_position());
        assert_eq!(scale, 1.0);
        assert_eq!(clip, geo.full_clip());
    }

    #[test]
    fn test_preview_at_trigger_reaches_mini_scale() {
        let geo = geometry();
        let trigger = geo.mini_trigger_distance(0.2);
        let (position, scale, _) = drag_preview(&geo, &GestureConfig::default(), trigger);

        assert!((scale - geo.mini_scale).abs() < 1e-4);
        // bottom edge lifted by exactly the trigger distance
        let bottom = position.y as f32 + geo.large_height as f32 * scale;
        let expected = (geo.large_y + geo.large_height) as f32 - trigger;
        assert!((bottom - expected).abs() <= 1.0);
    }

    #[test]
    fn test_preview_overshoot_is_resisted() {
        let geo = geometry();
        let gesture = GestureConfig::default();
        let trigger = geo.mini_trigger_distance(gesture.mini_trigger_distance_ratio);
        let (at_trigger, _, _) = drag_preview(&geo, &gesture, trigger);
        let (past, scale, _) = drag_preview(&geo, &gesture, trigger + 100.0);

        assert!((scale - geo.mini_scale).abs() < 1e-4);
        assert_eq!(at_trigger.y - past.y, 20);
    }

    #[test]
    fn test_preview_is_monotonic() {
        let geo = geometry();
        let gesture = GestureConfig::default();
        let mut last_scale = f32::MAX;
        for step in 0..=24 {
            let (_, scale, _) = drag_preview(&geo, &gesture, step as f32 * 20.0);
            assert!(scale <= last_scale);
            last_scale = scale;
        }
    }

    #[test]
    fn test_smoothing_seeds_then_follows() {
        assert_eq!(smooth(0.0, 40.0, 0.35), 40.0);
        let next = smooth(40.0, 140.0, 0.35);
        assert!((next - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_slop_is_strict() {
        assert!(!beyond_slop(10.0, -10.0, 10.0));
        assert!(beyond_slop(10.5, 0.0, 10.0));
        assert!(beyond_slop(0.0, -11.0, 10.0));
    }
}
