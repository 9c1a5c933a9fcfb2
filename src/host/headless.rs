//! Collaborators without a display: state is tracked in memory and every
//! operation is logged

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Result, bail};
use tracing::{debug, info, trace};

use super::{
    FrameClock, LayerKind, LayerParams, LayerStyle, SessionControl, SurfaceId, TargetLauncher,
    TouchInjector, WindowCompositor,
};
use crate::core::TargetRequest;
use crate::geometry::ScreenMetrics;
use crate::gesture::TouchAction;
use crate::types::Dimensions;

pub struct HeadlessCompositor {
    metrics: ScreenMetrics,
    density: f32,
    layers: BTreeMap<LayerKind, LayerParams>,
}

impl HeadlessCompositor {
    pub fn new(metrics: ScreenMetrics, density: f32) -> Self {
        Self {
            metrics,
            density,
            layers: BTreeMap::new(),
        }
    }
}

impl WindowCompositor for HeadlessCompositor {
    fn screen_metrics(&self) -> ScreenMetrics {
        self.metrics
    }

    fn density(&self) -> f32 {
        self.density
    }

    fn supports_trusted_overlay(&self) -> bool {
        false
    }

    fn add_layer(&mut self, kind: LayerKind, params: &LayerParams) -> Result<()> {
        if self.layers.contains_key(&kind) {
            bail!("Layer {kind:?} is already attached");
        }
        debug!(layer = ?kind, x = params.position.x, y = params.position.y, "Layer added");
        self.layers.insert(kind, *params);
        Ok(())
    }

    fn update_layer(&mut self, kind: LayerKind, params: &LayerParams) -> Result<()> {
        let Some(slot) = self.layers.get_mut(&kind) else {
            bail!("Layer {kind:?} is not attached");
        };
        trace!(
            layer = ?kind,
            x = params.position.x,
            y = params.position.y,
            scale = params.scale,
            touchable = params.touchable,
            visible = params.visible,
            "Layer updated"
        );
        *slot = *params;
        Ok(())
    }

    fn remove_layer(&mut self, kind: LayerKind) -> Result<()> {
        if self.layers.remove(&kind).is_none() {
            bail!("Layer {kind:?} is not attached");
        }
        debug!(layer = ?kind, "Layer removed");
        Ok(())
    }

    fn apply_style(&mut self, kind: LayerKind, style: &LayerStyle) -> Result<()> {
        if !self.layers.contains_key(&kind) {
            bail!("Layer {kind:?} is not attached");
        }
        trace!(layer = ?kind, corner_radius = style.corner_radius, masked = style.masked, "Layer styled");
        Ok(())
    }

    fn content_surface(&self) -> Option<Dimensions> {
        self.layers.get(&LayerKind::Content).map(|params| params.size)
    }
}

pub struct HeadlessInjector;

impl TouchInjector for HeadlessInjector {
    fn inject(
        &mut self,
        surface: SurfaceId,
        x: f32,
        y: f32,
        action: TouchAction,
        down_time_ms: u64,
    ) -> Result<()> {
        trace!(surface = surface.0, x, y, action = ?action, down_time_ms, "Touch injected");
        Ok(())
    }
}

#[derive(Default)]
pub struct HeadlessLauncher {
    next_id: u32,
}

impl TargetLauncher for HeadlessLauncher {
    fn create_surface(&mut self, size: Dimensions) -> Result<SurfaceId> {
        self.next_id += 1;
        info!(surface = self.next_id, width = size.width, height = size.height, "Virtual surface created");
        Ok(SurfaceId(self.next_id))
    }

    fn rebind_surface(&mut self, surface: SurfaceId, size: Dimensions) -> Result<()> {
        debug!(surface = surface.0, width = size.width, height = size.height, "Virtual surface rebound");
        Ok(())
    }

    fn release_surface(&mut self, surface: SurfaceId) -> Result<()> {
        info!(surface = surface.0, "Virtual surface released");
        Ok(())
    }

    fn launch(&mut self, surface: SurfaceId, request: &TargetRequest) -> Result<bool> {
        info!(
            surface = surface.0,
            package = %request.target_package,
            activity = request.target_activity.as_deref().unwrap_or("<launcher>"),
            "Launching target"
        );
        Ok(true)
    }

    fn force_stop(&mut self, package: &str) -> Result<()> {
        info!(package, "Force stopping target");
        Ok(())
    }
}

/// Lets the owner of the event loop see that a shutdown was requested
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    delay_ms: Arc<Mutex<Option<u64>>>,
}

impl ShutdownHandle {
    /// Grace delay of the pending shutdown, if one was requested
    pub fn requested(&self) -> Option<u64> {
        *self.delay_ms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
pub struct HeadlessSession {
    handle: ShutdownHandle,
}

impl HeadlessSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }
}

impl SessionControl for HeadlessSession {
    fn request_shutdown(&mut self, delay_ms: u64) {
        info!(delay_ms, "Session shutdown requested");
        *self.handle.delay_ms.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay_ms);
    }
}

/// Milliseconds since construction
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock advanced explicitly. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl FrameClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn metrics() -> ScreenMetrics {
        ScreenMetrics { width: 1080, height: 2400, top_inset: 0, bottom_inset: 0 }
    }

    #[test]
    fn test_compositor_tracks_layers() {
        let mut compositor = HeadlessCompositor::new(metrics(), 2.0);
        let params = LayerParams::new(Position::new(10, 20), Dimensions::new(756, 1344), false);

        assert!(compositor.content_surface().is_none());
        assert!(compositor.update_layer(LayerKind::Content, &params).is_err());

        compositor.add_layer(LayerKind::Content, &params).unwrap();
        assert_eq!(compositor.content_surface(), Some(Dimensions::new(756, 1344)));
        assert!(compositor.add_layer(LayerKind::Content, &params).is_err());

        compositor.remove_layer(LayerKind::Content).unwrap();
        assert!(compositor.remove_layer(LayerKind::Content).is_err());
    }

    #[test]
    fn test_launcher_hands_out_distinct_surfaces() {
        let mut launcher = HeadlessLauncher::default();
        let a = launcher.create_surface(Dimensions::new(1, 1)).unwrap();
        let b = launcher.create_surface(Dimensions::new(1, 1)).unwrap();
        assert_ne!(a, b);
        assert!(launcher.launch(a, &TargetRequest::default()).unwrap());
    }

    #[test]
    fn test_session_handle_sees_request() {
        let mut session = HeadlessSession::new();
        let handle = session.handle();
        assert_eq!(handle.requested(), None);
        session.request_shutdown(500);
        assert_eq!(handle.requested(), Some(500));
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(16);
        clock.advance(4);
        assert_eq!(view.now_ms(), 20);
        view.set(100);
        assert_eq!(clock.now_ms(), 100);
    }
}
