//! Overlay service: executes reducer effects against the host collaborators
//! and choreographs drags, docking and masking.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::animation::{self, Animated, AnimationEngine};
use crate::config::{GestureConfig, OverlayConfig, TimingConfig};
use crate::core::{
    Command, DockSide, EffectExecutor, OverlayEffect, OverlayEvent, OverlayMode, OverlayState,
    OverlayStore, SystemEvent, TargetRequest,
};
use crate::geometry::{self, Density, Geometry, GeometryRatios};
use crate::gesture::{self, RawTouch, TouchSource};
use crate::host::{Collaborators, LayerKind, LayerParams, SurfaceId};
use crate::trace::OverlayTraceLogger;
use crate::types::Dimensions;

mod drag;
mod layers;
mod transitions;

pub use drag::MiniPlacement;
pub use transitions::transition_tag;

use drag::DragSession;
use layers::Layers;

pub struct OverlayService {
    store: Arc<OverlayStore>,
    host: Collaborators,
    animator: AnimationEngine<OverlayService>,
    tracer: OverlayTraceLogger,

    ratios: GeometryRatios,
    gesture: GestureConfig,
    timing: TimingConfig,

    /// Set once the layers are attached
    geometry: Option<Geometry>,
    layers: Option<Layers>,
    surface: Option<SurfaceId>,

    drag: Option<DragSession>,
    placement: Option<MiniPlacement>,
    touch_down_time: u64,
}

impl Animated for OverlayService {
    fn animator(&mut self) -> &mut AnimationEngine<Self> {
        &mut self.animator
    }
}

impl OverlayService {
    /// Service with its own store, traced through [`OverlayTraceLogger`]
    pub fn new(config: &OverlayConfig, host: Collaborators) -> Self {
        let tracer = OverlayTraceLogger::default();
        let store = Arc::new(OverlayStore::new(tracer.into_observer()));
        Self::with_store(config, host, store)
    }

    pub fn with_store(config: &OverlayConfig, host: Collaborators, store: Arc<OverlayStore>) -> Self {
        let mut service = Self {
            store,
            host,
            animator: AnimationEngine::new(),
            tracer: OverlayTraceLogger::default(),
            ratios: config.geometry.clone(),
            gesture: config.gesture.clone(),
            timing: config.timing.clone(),
            geometry: None,
            layers: None,
            surface: None,
            drag: None,
            placement: None,
            touch_down_time: 0,
        };
        service.dispatch(SystemEvent::DockSideChanged(DockSide::Right));
        service.dispatch(SystemEvent::PassthroughChanged(false));
        service
    }

    /// Shared handle for readers on other threads
    pub fn store(&self) -> Arc<OverlayStore> {
        Arc::clone(&self.store)
    }

    pub fn state(&self) -> OverlayState {
        self.store.snapshot()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Parameters last pushed for `kind`, `None` before attach
    pub fn layer(&self, kind: LayerKind) -> Option<LayerParams> {
        self.layers.as_ref().map(|layers| *layers.params(kind))
    }

    pub fn mini_placement(&self) -> Option<MiniPlacement> {
        self.placement
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    pub fn is_attached(&self) -> bool {
        self.layers.is_some()
    }

    pub(crate) fn dispatch(&mut self, event: impl Into<OverlayEvent>) {
        let store = Arc::clone(&self.store);
        store.dispatch(event, self);
    }

    pub(crate) fn current_mode(&self) -> OverlayMode {
        self.store.with_state(|s| s.mode)
    }

    pub(crate) fn update_mode(&mut self, next: OverlayMode) {
        if self.current_mode() != next {
            self.dispatch(SystemEvent::ModeChanged(next));
        }
    }

    pub(crate) fn update_dock_side(&mut self, next: DockSide) {
        if self.store.with_state(|s| s.context.dock_side) != next {
            self.dispatch(SystemEvent::DockSideChanged(next));
        }
    }

    /// Raw input from one of the capture regions
    pub fn on_touch(&mut self, source: TouchSource, raw: &RawTouch) {
        match source {
            TouchSource::Background => {
                self.dispatch(gesture::classify(source, raw));
                self.handle_background_touch(raw);
            }
            TouchSource::Content => {
                self.dispatch(gesture::classify(source, raw));
                self.handle_content_touch(raw);
            }
            TouchSource::Mini | TouchSource::MaskedMini => self.handle_mini_layer_touch(raw),
        }
    }

    /// Advance the running animation. Returns whether one is still in flight.
    pub fn on_frame(&mut self) -> bool {
        let now = self.host.clock.now_ms();
        animation::tick(self, now)
    }

    /// The content layer has a drawing surface of `size`
    pub fn on_surface_available(&mut self, size: Dimensions) {
        if let Some(surface) = self.surface {
            if let Err(e) = self.host.launcher.rebind_surface(surface, size) {
                warn!(surface = surface.0, error = %e, "Failed to rebind virtual surface");
            }
            self.dispatch(SystemEvent::VirtualDisplayReady(true));
            return;
        }

        match self.host.launcher.create_surface(size) {
            Ok(surface) => {
                self.surface = Some(surface);
                self.dispatch(SystemEvent::VirtualDisplayReady(true));
                self.launch_target();
            }
            Err(e) => warn!(width = size.width, height = size.height, error = %e, "Failed to create virtual surface"),
        }
    }

    pub fn on_surface_destroyed(&mut self) {
        self.dispatch(SystemEvent::SurfaceDestroyed);
        self.dispatch(SystemEvent::VirtualDisplayReady(false));
    }

    /// Remove every layer and release the surface. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        animation::cancel(self);
        self.drag = None;

        if self.layers.take().is_some() {
            for kind in LayerKind::ALL.into_iter().rev() {
                if let Err(e) = self.host.compositor.remove_layer(kind) {
                    warn!(layer = ?kind, error = %e, "Failed to remove overlay layer");
                }
            }
        }
        if let Some(surface) = self.surface.take() {
            if let Err(e) = self.host.launcher.release_surface(surface) {
                warn!(surface = surface.0, error = %e, "Failed to release virtual surface");
            }
        }
        self.dispatch(SystemEvent::VirtualDisplayReady(false));
    }

    fn ensure_overlay(&mut self) {
        if self.layers.is_some() {
            self.launch_target();
            return;
        }

        let metrics = self.host.compositor.screen_metrics();
        let density = Density(self.host.compositor.density());
        let geo = geometry::calculate(metrics, &self.ratios, |dp| density.dp_to_px(dp));
        self.geometry = Some(geo);
        info!(
            width = geo.large_width,
            height = geo.large_height,
            mini = geo.mini_size,
            "Overlay geometry calculated"
        );

        let trusted = self.host.compositor.supports_trusted_overlay();
        if !trusted {
            info!("Trusted overlay unavailable, falling back to untrusted window type");
        }

        let mini_at = self.resolve_mini_target();
        let layers = Layers::build(&geo, mini_at, trusted);

        let mut attached = Vec::with_capacity(LayerKind::ALL.len());
        for kind in LayerKind::ALL {
            if let Err(e) = self.host.compositor.add_layer(kind, layers.params(kind)) {
                error!(layer = ?kind, error = %e, "Failed to attach overlay layer");
                for added in attached.into_iter().rev() {
                    if let Err(e) = self.host.compositor.remove_layer(added) {
                        warn!(layer = ?added, error = %e, "Failed to roll back overlay layer");
                    }
                }
                return;
            }
            attached.push(kind);
        }
        self.layers = Some(layers);
        self.dispatch(SystemEvent::WindowAttached);

        self.apply_large_visual_state(true);

        match self.host.compositor.content_surface() {
            Some(size) => self.on_surface_available(size),
            None => self.launch_target(),
        }
    }

    fn launch_target(&mut self) {
        let Some(surface) = self.surface else {
            return;
        };
        let Some(request) = self.store.with_state(|s| s.context.target_request.clone()) else {
            return;
        };

        match self.host.launcher.launch(surface, &request) {
            Ok(true) => debug!(package = %request.target_package, "Target launched"),
            Ok(false) => warn!(package = %request.target_package, "No launchable target found"),
            Err(e) => warn!(package = %request.target_package, error = %e, "Failed to launch target"),
        }
    }

    fn apply_touch_passthrough(&mut self, enabled: bool) {
        self.dispatch(SystemEvent::PassthroughChanged(enabled));
        if self.current_mode() == OverlayMode::Large && !self.is_animating() {
            self.set_touchable(LayerKind::Content, !enabled);
        }
    }

    fn stop_overlay(&mut self) {
        animation::cancel(self);

        let request = self.store.with_state(|s| s.context.target_request.clone());
        if let Some(request) = request.filter(|r| !r.is_default_package()) {
            info!(package = %request.target_package, "Force stopping package");
            if let Err(e) = self.host.launcher.force_stop(&request.target_package) {
                warn!(package = %request.target_package, error = %e, "Failed to force stop package");
            }
        }

        self.host.session.request_shutdown(self.timing.stop_grace_ms);
    }
}

impl EffectExecutor for OverlayService {
    fn execute(&mut self, effect: OverlayEffect, _store: &OverlayStore) {
        match effect {
            OverlayEffect::EnsureOverlay(_) => self.ensure_overlay(),
            OverlayEffect::ApplyTouchPassthrough(enabled) => self.apply_touch_passthrough(enabled),
            OverlayEffect::ToggleOverlaySize => self.toggle_window_size(),
            OverlayEffect::StopOverlay => self.stop_overlay(),
            OverlayEffect::Trace(message) => self.tracer.log_effect(&message),
        }
    }
}

/// The four external commands, each mapping 1:1 onto a [`Command`] event
pub trait OverlayCommands {
    fn submit(&mut self, command: Command);

    fn start(&mut self, request: TargetRequest) {
        self.submit(Command::Start(request));
    }

    fn stop(&mut self) {
        self.submit(Command::Stop);
    }

    fn toggle_size(&mut self) {
        self.submit(Command::ToggleSize);
    }

    fn set_touch_passthrough(&mut self, enabled: bool) {
        self.submit(Command::SetTouchPassthrough(enabled));
    }
}

impl OverlayCommands for OverlayService {
    fn submit(&mut self, command: Command) {
        self.dispatch(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TouchSubState;
    use crate::geometry::ScreenMetrics;
    use crate::host::{ManualClock, ShutdownHandle};
    use crate::types::Position;

    fn service() -> (OverlayService, ManualClock, ShutdownHandle) {
        let clock = ManualClock::new();
        let metrics = ScreenMetrics { width: 1080, height: 2400, top_inset: 0, bottom_inset: 0 };
        let (host, shutdown) = Collaborators::headless(metrics, 2.625, Box::new(clock.clone()));
        let service = OverlayService::new(&OverlayConfig::default(), host);
        (service, clock, shutdown)
    }

    fn finish_animation(service: &mut OverlayService, clock: &ManualClock) {
        clock.advance(1_000);
        assert!(!service.on_frame());
    }

    #[test]
    fn test_initial_state_before_start() {
        let (service, _, _) = service();
        let state = service.state();
        assert_eq!(state.mode, OverlayMode::Large);
        assert_eq!(state.context.dock_side, DockSide::Right);
        assert!(!service.is_attached());
        assert!(service.layer(LayerKind::Content).is_none());
    }

    #[test]
    fn test_start_attaches_layers_and_surface() {
        let (mut service, _, _) = service();
        service.start(TargetRequest::default());

        let state = service.state();
        assert!(service.is_attached());
        assert!(state.context.virtual_display_ready);
        assert!(!state.context.touch_passthrough);
        assert_eq!(state.mode, OverlayMode::Large);
        assert_eq!(state.touch_sub_state, TouchSubState::Idle);

        let content = service.layer(LayerKind::Content).unwrap();
        assert!(content.touchable);
        assert_eq!(content.position, Position::new(162, 528));
        assert!(!service.layer(LayerKind::MiniTouch).unwrap().visible);
    }

    #[test]
    fn test_second_start_keeps_layers() {
        let (mut service, _, _) = service();
        service.start(TargetRequest::default());
        service.start(TargetRequest::new(None, Some("org.example.app".to_string()), None));

        assert!(service.is_attached());
        assert_eq!(
            service.state().context.target_request.unwrap().target_package,
            "org.example.app"
        );
    }

    #[test]
    fn test_toggle_to_mini_and_back() {
        let (mut service, clock, _) = service();
        service.start(TargetRequest::default());

        service.toggle_size();
        let state = service.state();
        assert!(service.is_animating());
        assert_eq!(state.touch_sub_state, TouchSubState::Animating);
        assert_eq!(state.context.active_transition.as_deref(), Some("large_to_mini_380ms"));

        finish_animation(&mut service, &clock);
        let state = service.state();
        assert_eq!(state.mode, OverlayMode::Mini);
        assert_eq!(state.touch_sub_state, TouchSubState::Idle);
        assert!(state.context.active_transition.is_none());
        assert_eq!(service.mini_placement(), Some(MiniPlacement { x: 870, y: 840 }));

        let mini = service.layer(LayerKind::MiniTouch).unwrap();
        assert!(mini.visible && mini.touchable);
        assert!(!service.layer(LayerKind::Content).unwrap().touchable);

        service.toggle_size();
        assert_eq!(
            service.state().context.active_transition.as_deref(),
            Some("mini_to_large_380ms")
        );
        finish_animation(&mut service, &clock);
        assert_eq!(service.state().mode, OverlayMode::Large);
        assert!(!service.layer(LayerKind::MiniTouch).unwrap().visible);
    }

    #[test]
    fn test_toggle_ignored_while_animating() {
        let (mut service, clock, _) = service();
        service.start(TargetRequest::default());
        service.toggle_size();
        clock.advance(100);
        assert!(service.on_frame());

        service.toggle_size();
        assert_eq!(
            service.state().context.active_transition.as_deref(),
            Some("large_to_mini_380ms")
        );
        finish_animation(&mut service, &clock);
        assert_eq!(service.state().mode, OverlayMode::Mini);
    }

    #[test]
    fn test_passthrough_flips_content_touchability() {
        let (mut service, _, _) = service();
        service.start(TargetRequest::default());

        service.set_touch_passthrough(true);
        assert!(service.state().context.touch_passthrough);
        assert!(!service.layer(LayerKind::Content).unwrap().touchable);

        service.set_touch_passthrough(false);
        assert!(service.layer(LayerKind::Content).unwrap().touchable);
    }

    #[test]
    fn test_stop_requests_shutdown() {
        let (mut service, _, shutdown) = service();
        service.start(TargetRequest::default());
        service.stop();
        assert_eq!(shutdown.requested(), Some(500));
    }

    #[test]
    fn test_stop_cancels_running_transition() {
        let (mut service, _, _) = service();
        service.start(TargetRequest::default());
        service.toggle_size();
        service.stop();

        let state = service.state();
        assert!(!service.is_animating());
        assert!(state.is_consistent());
        assert_eq!(state.touch_sub_state, TouchSubState::Idle);
    }

    #[test]
    fn test_teardown_is_repeatable() {
        let (mut service, _, _) = service();
        service.start(TargetRequest::default());
        service.teardown();
        service.teardown();

        assert!(!service.is_attached());
        assert!(!service.state().context.virtual_display_ready);
    }

    #[test]
    fn test_surface_destroyed_clears_ready_flag() {
        let (mut service, _, _) = service();
        service.start(TargetRequest::default());
        service.on_surface_destroyed();
        assert!(!service.state().context.virtual_display_ready);

        service.on_surface_available(service.geometry().unwrap().large_dimensions());
        assert!(service.state().context.virtual_display_ready);
    }
}
