//! Structured trace of every committed overlay transition

use tracing::debug;

use crate::core::{OverlayEvent, OverlayState, StateObserver};

/// Target used for all transition trace output
pub const TRACE_TARGET: &str = "overlay_trace";

#[derive(Debug, Clone, Copy)]
pub struct OverlayTraceLogger {
    enabled: bool,
}

impl OverlayTraceLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn log(&self, state: &OverlayState, event: &OverlayEvent) {
        if !self.enabled {
            return;
        }
        debug!(
            target: TRACE_TARGET,
            event = event.name(),
            mode = ?state.mode,
            touch = ?state.touch_sub_state,
            dock = ?state.context.dock_side,
            passthrough = state.context.touch_passthrough,
            display_ready = state.context.virtual_display_ready,
            transition = state.context.active_transition.as_deref().unwrap_or("none"),
            "state committed"
        );
    }

    pub fn log_effect(&self, message: &str) {
        if self.enabled {
            debug!(target: TRACE_TARGET, message, "effect");
        }
    }

    /// Observer for [`OverlayStore`](crate::core::OverlayStore)
    pub fn into_observer(self) -> StateObserver {
        Box::new(move |state, event| self.log(state, event))
    }
}

impl Default for OverlayTraceLogger {
    fn default() -> Self {
        Self::new(true)
    }
}
