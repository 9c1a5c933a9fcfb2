//! Pure transition function of the overlay state machine

use super::effect::OverlayEffect;
use super::event::{Command, OverlayEvent, SystemEvent, Touch};
use super::state::{OverlayState, TouchSubState};
use crate::gesture::{TouchAction, TouchSource};

#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub state: OverlayState,
    pub effects: Vec<OverlayEffect>,
}

impl Reduction {
    fn state(state: OverlayState) -> Self {
        Self { state, effects: Vec::new() }
    }

    fn with_effects(state: OverlayState, effects: Vec<OverlayEffect>) -> Self {
        Self { state, effects }
    }
}

/// Total over the event space, never fails and performs no I/O
pub fn reduce(previous: &OverlayState, event: &OverlayEvent) -> Reduction {
    match event {
        OverlayEvent::Command(command) => reduce_command(previous, command),
        OverlayEvent::Touch(Touch::Motion { source, action }) => {
            let mut next = previous.clone();
            next.touch_sub_state = map_touch_sub_state(previous, *source, *action);
            Reduction::state(next)
        }
        OverlayEvent::System(event) => reduce_system(previous, event),
    }
}

fn reduce_command(previous: &OverlayState, command: &Command) -> Reduction {
    match command {
        Command::Start(request) => {
            let mut next = previous.clone();
            next.context.target_request = Some(request.clone());
            // A session always begins interactive
            next.context.touch_passthrough = false;
            Reduction::with_effects(
                next,
                vec![
                    OverlayEffect::EnsureOverlay(request.clone()),
                    OverlayEffect::ApplyTouchPassthrough(false),
                ],
            )
        }
        Command::SetTouchPassthrough(enabled) => {
            let mut next = previous.clone();
            next.context.touch_passthrough = *enabled;
            Reduction::with_effects(next, vec![OverlayEffect::ApplyTouchPassthrough(*enabled)])
        }
        Command::ToggleSize => {
            Reduction::with_effects(previous.clone(), vec![OverlayEffect::ToggleOverlaySize])
        }
        Command::Stop => Reduction::with_effects(previous.clone(), vec![OverlayEffect::StopOverlay]),
    }
}

fn reduce_system(previous: &OverlayState, event: &SystemEvent) -> Reduction {
    let mut next = previous.clone();
    match event {
        SystemEvent::ModeChanged(mode) => next.mode = *mode,
        SystemEvent::TouchSubStateChanged(sub_state) => {
            // Animating is owned by ActiveTransitionChanged
            if !previous.is_animating() && *sub_state != TouchSubState::Animating {
                next.touch_sub_state = *sub_state;
            }
        }
        SystemEvent::DockSideChanged(side) => next.context.dock_side = *side,
        SystemEvent::VirtualDisplayReady(ready) => next.context.virtual_display_ready = *ready,
        SystemEvent::ActiveTransitionChanged(transition) => {
            next.touch_sub_state = if transition.is_some() {
                TouchSubState::Animating
            } else {
                TouchSubState::Idle
            };
            next.context.active_transition = transition.clone();
        }
        SystemEvent::PassthroughChanged(enabled) => next.context.touch_passthrough = *enabled,
        SystemEvent::WindowAttached => {
            return Reduction::with_effects(
                next,
                vec![OverlayEffect::Trace("overlay windows attached".to_string())],
            );
        }
        SystemEvent::SurfaceDestroyed => {
            return Reduction::with_effects(
                next,
                vec![OverlayEffect::Trace("mirrored surface destroyed".to_string())],
            );
        }
    }
    Reduction::state(next)
}

fn map_touch_sub_state(previous: &OverlayState, source: TouchSource, action: TouchAction) -> TouchSubState {
    if previous.touch_sub_state == TouchSubState::Animating {
        return TouchSubState::Animating;
    }

    match (source, action) {
        (TouchSource::Background, TouchAction::Move) => TouchSubState::HandleDragging,
        (TouchSource::Mini, TouchAction::Move) => TouchSubState::MiniDragging,
        (TouchSource::MaskedMini, TouchAction::Move) => TouchSubState::MaskedMiniDragging,
        _ => TouchSubState::Idle,
    }
}
