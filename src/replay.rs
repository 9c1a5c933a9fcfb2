//! Scripted sessions against headless collaborators and a manual clock

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::core::OverlayState;
use crate::gesture::{RawTouch, TouchSource};
use crate::host::{Collaborators, ManualClock};
use crate::ipc::OverlayRequest;
use crate::overlay::{OverlayCommands, OverlayService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStep {
    /// Same request shape as the command socket
    Command(OverlayRequest),
    Touch { source: TouchSource, raw: RawTouch },
    /// Let time pass, ticking frames at the configured interval
    AdvanceMs(u64),
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub state: OverlayState,
    pub elapsed_ms: u64,
    pub shutdown_requested: Option<u64>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read replay script at {}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse replay script")
    }
}

pub fn run(script: &ReplayScript, config: &OverlayConfig) -> Result<ReplayReport> {
    let clock = ManualClock::new();
    let (host, shutdown) = Collaborators::headless(
        config.screen.metrics(),
        config.screen.density,
        Box::new(clock.clone()),
    );
    let mut service = OverlayService::new(config, host);
    let frame_interval = config.timing.frame_interval_ms.max(1);
    let mut elapsed_ms = 0;

    for (index, step) in script.steps.iter().enumerate() {
        debug!(step = index, ?step, "Replay step");
        match step {
            ReplayStep::Command(request) => match request.clone().into_command() {
                Some(command) => service.submit(command),
                None => warn!(step = index, "Replay step is a query, skipping"),
            },
            ReplayStep::Touch { source, raw } => service.on_touch(*source, raw),
            ReplayStep::AdvanceMs(ms) => {
                let mut remaining = *ms;
                while remaining > 0 {
                    let step_ms = remaining.min(frame_interval);
                    clock.advance(step_ms);
                    remaining -= step_ms;
                    service.on_frame();
                }
                elapsed_ms += ms;
            }
        }
    }

    let shutdown_requested = shutdown.requested();
    if shutdown_requested.is_some() {
        service.teardown();
    }

    let state = service.state();
    info!(
        steps = script.steps.len(),
        mode = ?state.mode,
        elapsed_ms,
        "Replay finished"
    );
    Ok(ReplayReport {
        state,
        elapsed_ms,
        shutdown_requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OverlayMode;

    const START_TO_MINI: &str = r#"{
        "steps": [
            { "command": { "Start": { "question": null, "target_package": null, "target_activity": null } } },
            { "command": "ToggleSize" },
            { "advance_ms": 400 }
        ]
    }"#;

    #[test]
    fn test_parse_script() {
        let script = ReplayScript::parse(START_TO_MINI).unwrap();
        assert_eq!(script.steps.len(), 3);
        assert_eq!(script.steps[1], ReplayStep::Command(OverlayRequest::ToggleSize));
        assert_eq!(script.steps[2], ReplayStep::AdvanceMs(400));
    }

    #[test]
    fn test_toggle_script_ends_in_mini() {
        let script = ReplayScript::parse(START_TO_MINI).unwrap();
        let report = run(&script, &OverlayConfig::default()).unwrap();

        assert_eq!(report.state.mode, OverlayMode::Mini);
        assert!(report.state.context.active_transition.is_none());
        assert_eq!(report.elapsed_ms, 400);
        assert_eq!(report.shutdown_requested, None);
    }

    #[test]
    fn test_touch_steps_parse() {
        let script = ReplayScript::parse(
            r#"{ "steps": [ { "touch": { "source": "background",
                "raw": { "action": "down", "x": 10.0, "y": 20.0, "raw_x": 10.0, "raw_y": 20.0, "time_ms": 0 } } } ] }"#,
        )
        .unwrap();
        let ReplayStep::Touch { source, raw } = &script.steps[0] else {
            panic!("expected touch step");
        };
        assert_eq!(*source, TouchSource::Background);
        assert_eq!(raw.raw_y, 20.0);
    }

    #[test]
    fn test_stop_script_tears_down() {
        let script = ReplayScript::parse(
            r#"{ "steps": [ { "command": { "Start": { "question": null, "target_package": null, "target_activity": null } } },
                            { "command": "Stop" } ] }"#,
        )
        .unwrap();
        let report = run(&script, &OverlayConfig::default()).unwrap();
        assert_eq!(report.shutdown_requested, Some(500));
        assert!(!report.state.context.virtual_display_ready);
    }

    #[test]
    fn test_malformed_script_is_error() {
        assert!(ReplayScript::parse(r#"{ "steps": [ { "teleport": 3 } ] }"#).is_err());
    }
}
