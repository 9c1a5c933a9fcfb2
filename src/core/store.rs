//! Owner of the committed overlay state

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::effect::OverlayEffect;
use super::event::OverlayEvent;
use super::reducer::reduce;
use super::state::OverlayState;

/// Called after every commit with the new state and the event that produced it
pub type StateObserver = Box<dyn Fn(&OverlayState, &OverlayEvent) + Send + Sync>;

/// Carries out effects emitted by the reducer.
///
/// The store is handed back so an effect can dispatch follow-up events. Those
/// are reduced and executed before the next effect of the outer dispatch runs.
pub trait EffectExecutor {
    fn execute(&mut self, effect: OverlayEffect, store: &OverlayStore);
}

pub struct OverlayStore {
    state: Mutex<OverlayState>,
    observer: StateObserver,
}

impl OverlayStore {
    pub fn new(observer: StateObserver) -> Self {
        Self::with_initial(OverlayState::default(), observer)
    }

    pub fn with_initial(initial: OverlayState, observer: StateObserver) -> Self {
        Self {
            state: Mutex::new(initial),
            observer,
        }
    }

    /// Store without an observer, mostly for tests and tools
    pub fn silent() -> Self {
        Self::new(Box::new(|_, _| {}))
    }

    pub fn dispatch(&self, event: impl Into<OverlayEvent>, executor: &mut dyn EffectExecutor) {
        let event = event.into();

        let (committed, effects) = {
            let mut state = self.lock();
            let reduction = reduce(&state, &event);
            *state = reduction.state;
            debug_assert!(
                state.is_consistent(),
                "touch sub-state out of sync with active transition after {}",
                event.name()
            );
            (state.clone(), reduction.effects)
        };

        (self.observer)(&committed, &event);

        for effect in effects {
            executor.execute(effect, self);
        }
    }

    /// Copy of the committed state
    pub fn snapshot(&self) -> OverlayState {
        self.lock().clone()
    }

    /// Borrow the committed state without cloning it. `f` must not dispatch.
    pub fn with_state<R>(&self, f: impl FnOnce(&OverlayState) -> R) -> R {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, OverlayState> {
        // A panicking observer must not wedge the engine
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OverlayStore {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::event::{Command, SystemEvent};
    use crate::core::state::{OverlayMode, TargetRequest, TouchSubState};

    #[derive(Default)]
    struct Recorder {
        executed: Vec<OverlayEffect>,
    }

    impl EffectExecutor for Recorder {
        fn execute(&mut self, effect: OverlayEffect, _store: &OverlayStore) {
            self.executed.push(effect);
        }
    }

    /// Re-dispatches from inside effects the way the overlay service does
    struct Chaining {
        log: Vec<String>,
    }

    impl EffectExecutor for Chaining {
        fn execute(&mut self, effect: OverlayEffect, store: &OverlayStore) {
            match effect {
                OverlayEffect::EnsureOverlay(_) => {
                    self.log.push("ensure".to_string());
                    store.dispatch(SystemEvent::VirtualDisplayReady(true), self);
                    self.log.push(format!(
                        "ready={}",
                        store.with_state(|s| s.context.virtual_display_ready)
                    ));
                }
                OverlayEffect::ApplyTouchPassthrough(enabled) => {
                    self.log.push(format!("passthrough={enabled}"));
                }
                other => self.log.push(format!("{other:?}")),
            }
        }
    }

    #[test]
    fn test_effects_run_in_order_after_commit() {
        let store = OverlayStore::silent();
        let mut recorder = Recorder::default();
        let request = TargetRequest::default();

        store.dispatch(Command::Start(request.clone()), &mut recorder);

        assert_eq!(
            recorder.executed,
            vec![OverlayEffect::EnsureOverlay(request.clone()), OverlayEffect::ApplyTouchPassthrough(false)]
        );
        assert_eq!(store.snapshot().context.target_request, Some(request));
    }

    #[test]
    fn test_reentrant_dispatch_is_depth_first() {
        let store = OverlayStore::silent();
        let mut chaining = Chaining { log: Vec::new() };

        store.dispatch(Command::Start(TargetRequest::default()), &mut chaining);

        assert_eq!(chaining.log, vec!["ensure", "ready=true", "passthrough=false"]);
        assert!(store.snapshot().context.virtual_display_ready);
    }

    #[test]
    fn test_observer_sees_every_commit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let store = OverlayStore::new(Box::new(move |state, event| {
            sink.lock()
                .unwrap()
                .push((event.name(), state.mode, state.touch_sub_state));
        }));
        let mut recorder = Recorder::default();

        store.dispatch(SystemEvent::ModeChanged(OverlayMode::Mini), &mut recorder);
        store.dispatch(
            SystemEvent::ActiveTransitionChanged(Some("mini_to_large_380ms".to_string())),
            &mut recorder,
        );

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("ModeChanged", OverlayMode::Mini, TouchSubState::Idle),
                ("ActiveTransitionChanged", OverlayMode::Mini, TouchSubState::Animating),
            ]
        );
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let store = OverlayStore::silent();
        let mut recorder = Recorder::default();
        let before = store.snapshot();

        store.dispatch(Command::SetTouchPassthrough(true), &mut recorder);

        assert!(!before.context.touch_passthrough);
        assert!(store.snapshot().context.touch_passthrough);
        assert!(store.with_state(|s| s.context.touch_passthrough));
    }

    #[test]
    fn test_snapshot_from_another_thread() {
        let store = Arc::new(OverlayStore::silent());
        let mut recorder = Recorder::default();
        store.dispatch(SystemEvent::ModeChanged(OverlayMode::MiniMasked), &mut recorder);

        let reader = Arc::clone(&store);
        let mode = std::thread::spawn(move || reader.snapshot().mode).join().unwrap();
        assert_eq!(mode, OverlayMode::MiniMasked);
    }
}
