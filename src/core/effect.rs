use super::state::TargetRequest;

/// Work requested by the reducer, carried out by an [`EffectExecutor`](super::store::EffectExecutor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEffect {
    /// Materialize the window layers (if needed) and begin mirroring `request`
    EnsureOverlay(TargetRequest),
    /// Toggle whether the content region consumes or forwards touches
    ApplyTouchPassthrough(bool),
    ToggleOverlaySize,
    /// Tear down and terminate the session
    StopOverlay,
    /// Diagnostic only
    Trace(String),
}
