//! Wire types for the overlay command socket

use serde::{Deserialize, Serialize};

use crate::constants::protocol::PROTOCOL_VERSION;
use crate::core::{Command, OverlayState, TargetRequest};

/// Every frame a client sends
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub version: u32,
    pub request: OverlayRequest,
}

impl Envelope {
    pub fn new(request: OverlayRequest) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            request,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum OverlayRequest {
    /// Open the overlay (or retarget it) on a package
    Start {
        question: Option<String>,
        target_package: Option<String>,
        target_activity: Option<String>,
    },

    Stop,

    ToggleSize,

    SetTouchPassthrough { enabled: bool },

    /// Snapshot of the committed state
    GetState,

    /// Health check
    Ping,
}

impl OverlayRequest {
    /// The overlay command this request drives, `None` for queries
    pub fn into_command(self) -> Option<Command> {
        match self {
            OverlayRequest::Start {
                question,
                target_package,
                target_activity,
            } => Some(Command::Start(TargetRequest::new(
                question,
                target_package,
                target_activity,
            ))),
            OverlayRequest::Stop => Some(Command::Stop),
            OverlayRequest::ToggleSize => Some(Command::ToggleSize),
            OverlayRequest::SetTouchPassthrough { enabled } => {
                Some(Command::SetTouchPassthrough(enabled))
            }
            OverlayRequest::GetState | OverlayRequest::Ping => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum OverlayResponse {
    /// Command accepted by the event loop
    Ack,

    State(OverlayState),

    Pong,

    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::launch::DEFAULT_TARGET_PACKAGE;

    #[test]
    fn test_envelope_wire_shape() {
        let json = serde_json::to_value(Envelope::new(OverlayRequest::SetTouchPassthrough {
            enabled: true,
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": 1,
                "request": { "SetTouchPassthrough": { "enabled": true } }
            })
        );
    }

    #[test]
    fn test_start_with_blank_package_uses_default() {
        let request = OverlayRequest::Start {
            question: Some("what is this".to_string()),
            target_package: Some("  ".to_string()),
            target_activity: None,
        };
        let Some(Command::Start(target)) = request.into_command() else {
            panic!("expected a start command");
        };
        assert_eq!(target.target_package, DEFAULT_TARGET_PACKAGE);
        assert_eq!(target.question.as_deref(), Some("what is this"));
    }

    #[test]
    fn test_queries_carry_no_command() {
        assert_eq!(OverlayRequest::GetState.into_command(), None);
        assert_eq!(OverlayRequest::Ping.into_command(), None);
        assert_eq!(OverlayRequest::ToggleSize.into_command(), Some(Command::ToggleSize));
    }
}
