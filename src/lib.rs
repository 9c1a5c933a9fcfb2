//! Floating overlay that mirrors a target app in a resizable, dockable window.
//!
//! State lives in [`core`]: a pure reducer behind [`core::OverlayStore`].
//! [`overlay::OverlayService`] carries out the reducer's effects against the
//! [`host`] collaborators and drives drag, dock and mask choreography.

#![forbid(unsafe_code)]

pub mod animation;
pub mod config;
pub mod constants;
pub mod core;
pub mod geometry;
pub mod gesture;
pub mod host;
pub mod ipc;
pub mod overlay;
pub mod replay;
pub mod snapping;
pub mod trace;
pub mod types;
