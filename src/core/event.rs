use serde::{Deserialize, Serialize};

use super::state::{DockSide, OverlayMode, TargetRequest, TouchSubState};
use crate::gesture::{TouchAction, TouchSource};

/// Everything the reducer understands
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    Command(Command),
    Touch(Touch),
    System(SystemEvent),
}

/// Issued by the external control surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Start(TargetRequest),
    SetTouchPassthrough(bool),
    ToggleSize,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Motion { source: TouchSource, action: TouchAction },
}

/// Facts established by the orchestration layer or its collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    ModeChanged(OverlayMode),
    TouchSubStateChanged(TouchSubState),
    DockSideChanged(DockSide),
    VirtualDisplayReady(bool),
    /// Raised by the animation engine on start (`Some`) and on end/cancel (`None`)
    ActiveTransitionChanged(Option<String>),
    PassthroughChanged(bool),
    WindowAttached,
    SurfaceDestroyed,
}

impl OverlayEvent {
    /// Short name for trace output
    pub fn name(&self) -> &'static str {
        match self {
            OverlayEvent::Command(Command::Start(_)) => "Start",
            OverlayEvent::Command(Command::SetTouchPassthrough(_)) => "SetTouchPassthrough",
            OverlayEvent::Command(Command::ToggleSize) => "ToggleSize",
            OverlayEvent::Command(Command::Stop) => "Stop",
            OverlayEvent::Touch(Touch::Motion { .. }) => "Motion",
            OverlayEvent::System(event) => match event {
                SystemEvent::ModeChanged(_) => "ModeChanged",
                SystemEvent::TouchSubStateChanged(_) => "TouchSubStateChanged",
                SystemEvent::DockSideChanged(_) => "DockSideChanged",
                SystemEvent::VirtualDisplayReady(_) => "VirtualDisplayReady",
                SystemEvent::ActiveTransitionChanged(_) => "ActiveTransitionChanged",
                SystemEvent::PassthroughChanged(_) => "PassthroughChanged",
                SystemEvent::WindowAttached => "WindowAttached",
                SystemEvent::SurfaceDestroyed => "SurfaceDestroyed",
            },
        }
    }
}

impl From<Command> for OverlayEvent {
    fn from(command: Command) -> Self {
        OverlayEvent::Command(command)
    }
}

impl From<SystemEvent> for OverlayEvent {
    fn from(event: SystemEvent) -> Self {
        OverlayEvent::System(event)
    }
}

impl From<Touch> for OverlayEvent {
    fn from(touch: Touch) -> Self {
        OverlayEvent::Touch(touch)
    }
}
