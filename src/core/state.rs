use serde::{Deserialize, Serialize};

use crate::constants::launch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlayMode {
    /// Full content, fixed position, shrinkable through the handle
    #[default]
    Large,
    /// Small draggable thumbnail docked to a screen edge
    Mini,
    /// Mini window pushed half off-screen, only the grab handle is visible
    MiniMasked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TouchSubState {
    #[default]
    Idle,
    HandleDragging,
    MiniDragging,
    MaskedMiniDragging,
    /// Held for the whole lifetime of a transition
    Animating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DockSide {
    Left,
    #[default]
    Right,
}

/// What to mirror. Carried through the engine untouched, only the launch
/// collaborator interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequest {
    pub question: Option<String>,
    pub target_package: String,
    pub target_activity: Option<String>,
}

impl TargetRequest {
    pub fn new(
        question: Option<String>,
        target_package: Option<String>,
        target_activity: Option<String>,
    ) -> Self {
        Self {
            question,
            target_package: target_package
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| launch::DEFAULT_TARGET_PACKAGE.to_string()),
            target_activity: target_activity.filter(|a| !a.trim().is_empty()),
        }
    }

    pub fn is_default_package(&self) -> bool {
        self.target_package == launch::DEFAULT_TARGET_PACKAGE
    }
}

impl Default for TargetRequest {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeContext {
    pub touch_passthrough: bool,
    pub dock_side: DockSide,
    pub target_request: Option<TargetRequest>,
    pub virtual_display_ready: bool,
    /// Tag of the in-flight transition, `None` while idle
    pub active_transition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverlayState {
    pub mode: OverlayMode,
    pub touch_sub_state: TouchSubState,
    pub context: RuntimeContext,
}

impl OverlayState {
    /// `Animating` is held exactly while a transition is active
    pub fn is_consistent(&self) -> bool {
        (self.touch_sub_state == TouchSubState::Animating) == self.context.active_transition.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.context.active_transition.is_some()
    }
}
