//! Platform collaborators the overlay engine drives
//!
//! The engine never touches windows, input devices or processes directly.
//! Everything goes through these traits; [`headless`] provides logging
//! implementations for the daemon and replay tool.

use anyhow::Result;
use serde::Serialize;

use crate::core::TargetRequest;
use crate::geometry::ScreenMetrics;
use crate::gesture::TouchAction;
use crate::types::{ClipRect, Dimensions, Position};

pub mod headless;

pub use headless::{
    HeadlessCompositor, HeadlessInjector, HeadlessLauncher, HeadlessSession, ManualClock,
    ShutdownHandle, SystemClock,
};

/// Windows the overlay is built from, bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Full-screen touch catcher behind the large window
    Background,
    /// Handle bar drawn under the large window
    HandleBar,
    /// Scaled window showing the mirrored surface
    Content,
    /// Input window stacked over the mini content
    MiniTouch,
}

impl LayerKind {
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Background,
        LayerKind::HandleBar,
        LayerKind::Content,
        LayerKind::MiniTouch,
    ];
}

/// Placement and input flags of one layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerParams {
    /// Window position. For the content layer this is in content coordinates.
    pub position: Position,
    pub size: Dimensions,
    pub scale: f32,
    pub clip: Option<ClipRect>,
    pub touchable: bool,
    pub visible: bool,
    /// Trusted overlays are not obscured-touch filtered by the platform
    pub trusted: bool,
}

impl LayerParams {
    pub fn new(position: Position, size: Dimensions, trusted: bool) -> Self {
        Self {
            position,
            size,
            scale: 1.0,
            clip: None,
            touchable: true,
            visible: true,
            trusted,
        }
    }
}

/// Decoration of a layer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LayerStyle {
    pub corner_radius: i32,
    /// Blur over the content plus a dim mask
    pub masked: bool,
    /// Edge grab handle inside the mini layer, `None` when hidden
    pub edge_handle: Option<Position>,
}

/// Id of a virtual surface the target renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceId(pub u32);

pub trait WindowCompositor {
    fn screen_metrics(&self) -> ScreenMetrics;

    /// Pixels per density-independent pixel
    fn density(&self) -> f32;

    fn supports_trusted_overlay(&self) -> bool;

    fn add_layer(&mut self, kind: LayerKind, params: &LayerParams) -> Result<()>;

    fn update_layer(&mut self, kind: LayerKind, params: &LayerParams) -> Result<()>;

    fn remove_layer(&mut self, kind: LayerKind) -> Result<()>;

    fn apply_style(&mut self, kind: LayerKind, style: &LayerStyle) -> Result<()>;

    /// Size of the drawing surface behind the content layer, once it exists
    fn content_surface(&self) -> Option<Dimensions>;
}

pub trait TouchInjector {
    fn inject(
        &mut self,
        surface: SurfaceId,
        x: f32,
        y: f32,
        action: TouchAction,
        down_time_ms: u64,
    ) -> Result<()>;
}

pub trait TargetLauncher {
    fn create_surface(&mut self, size: Dimensions) -> Result<SurfaceId>;

    /// Point an existing surface at a new drawing buffer
    fn rebind_surface(&mut self, surface: SurfaceId, size: Dimensions) -> Result<()>;

    fn release_surface(&mut self, surface: SurfaceId) -> Result<()>;

    /// Returns false when no launchable target was found
    fn launch(&mut self, surface: SurfaceId, request: &TargetRequest) -> Result<bool>;

    fn force_stop(&mut self, package: &str) -> Result<()>;
}

pub trait SessionControl {
    fn request_shutdown(&mut self, delay_ms: u64);
}

/// Monotonic milliseconds
pub trait FrameClock {
    fn now_ms(&self) -> u64;
}

/// Everything the overlay service talks to
pub struct Collaborators {
    pub compositor: Box<dyn WindowCompositor>,
    pub injector: Box<dyn TouchInjector>,
    pub launcher: Box<dyn TargetLauncher>,
    pub session: Box<dyn SessionControl>,
    pub clock: Box<dyn FrameClock>,
}

impl Collaborators {
    /// Headless set backed by `metrics`, returning the shutdown handle
    pub fn headless(
        metrics: ScreenMetrics,
        density: f32,
        clock: Box<dyn FrameClock>,
    ) -> (Self, ShutdownHandle) {
        let session = HeadlessSession::new();
        let handle = session.handle();
        let collaborators = Self {
            compositor: Box::new(HeadlessCompositor::new(metrics, density)),
            injector: Box::new(HeadlessInjector),
            launcher: Box::new(HeadlessLauncher::default()),
            session: Box::new(session),
            clock,
        };
        (collaborators, handle)
    }
}
