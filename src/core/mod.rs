//! Event-driven overlay state machine: state, events, effects, reducer, store

pub mod effect;
pub mod event;
pub mod reducer;
pub mod state;
pub mod store;

pub use effect::OverlayEffect;
pub use event::{Command, OverlayEvent, SystemEvent, Touch};
pub use reducer::{Reduction, reduce};
pub use state::{DockSide, OverlayMode, OverlayState, RuntimeContext, TargetRequest, TouchSubState};
pub use store::{EffectExecutor, OverlayStore, StateObserver};
