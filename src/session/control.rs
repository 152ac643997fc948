//! Local control surface.
//!
//! The messages the extension's own UI exchanges with the session.
//!
//! | Request | Response |
//! |---------|----------|
//! | `update_config {url?, token?, enabled?}` | `{success}` |
//! | `set_control_enabled {enabled}` | `{success}` |
//! | `reconnect` | `{success}` |
//! | `status` | `{connected, connecting, enabled}` |
//! | `logs` | `{rows}` |
//! | `execute {cmd}` | `{ok, data?, error?}` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SettingsPatch;
use crate::error::Result;
use crate::log_sink::LogRow;
use crate::protocol::InboundCommand;

use super::Status;

// ============================================================================
// ControlRequest
// ============================================================================

/// A request from the local UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Change settings, then restart the connection.
    UpdateConfig {
        /// New endpoint URL.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// New token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// New enabled flag.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enabled: Option<bool>,
    },

    /// Turn control on or off.
    SetControlEnabled {
        /// Desired state.
        enabled: bool,
    },

    /// Restart the connection with a fresh attempt counter.
    Reconnect,

    /// Report connection status.
    Status,

    /// Return the log buffer.
    Logs,

    /// Run a command and return its result without transmitting it.
    Execute {
        /// The command.
        cmd: InboundCommand,
    },
}

impl ControlRequest {
    /// The settings an `update_config` request carries.
    #[must_use]
    pub fn settings_patch(&self) -> Option<SettingsPatch> {
        let Self::UpdateConfig {
            url,
            token,
            enabled,
        } = self
        else {
            return None;
        };

        Some(SettingsPatch {
            server_url: url.clone(),
            token: token.clone(),
            control_enabled: *enabled,
        })
    }
}

// ============================================================================
// ControlResponse
// ============================================================================

/// Answer to a [`ControlRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlResponse {
    /// Outcome of a state-changing request.
    Ack {
        /// Whether the request was applied.
        success: bool,
        /// Failure detail.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Connection status.
    Status(Status),

    /// Buffered log rows, oldest first.
    Logs {
        /// The rows.
        rows: Vec<LogRow>,
    },

    /// Outcome of an `execute` request.
    Executed {
        /// Whether the command succeeded.
        ok: bool,
        /// Success payload.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        /// Failure text.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ControlResponse {
    /// Acknowledgment for a state-changing request.
    #[must_use]
    pub fn ack(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Ack {
                success: true,
                error: None,
            },
            Err(e) => Self::Ack {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Answer for an `execute` request.
    #[must_use]
    pub fn executed(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::Executed {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self::Executed {
                ok: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::error::Error;

    #[test]
    fn test_parse_requests() {
        let req: ControlRequest =
            serde_json::from_value(json!({"action": "update_config", "token": "t"}))
                .expect("parse");
        assert_eq!(
            req,
            ControlRequest::UpdateConfig {
                url: None,
                token: Some("t".into()),
                enabled: None,
            }
        );

        let req: ControlRequest =
            serde_json::from_value(json!({"action": "set_control_enabled", "enabled": false}))
                .expect("parse");
        assert_eq!(req, ControlRequest::SetControlEnabled { enabled: false });

        let req: ControlRequest = serde_json::from_value(json!({"action": "status"})).expect("parse");
        assert_eq!(req, ControlRequest::Status);
    }

    #[test]
    fn test_parse_execute() {
        let req: ControlRequest = serde_json::from_value(json!({
            "action": "execute",
            "cmd": {"action": "click", "selector": "#queue-button"}
        }))
        .expect("parse");

        let ControlRequest::Execute { cmd } = req else {
            panic!("expected execute");
        };
        assert_eq!(cmd.action, "click");
        assert_eq!(cmd.param("selector"), Some(&json!("#queue-button")));
    }

    #[test]
    fn test_unknown_request_rejected() {
        let result: std::result::Result<ControlRequest, _> =
            serde_json::from_value(json!({"action": "format_disk"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_patch() {
        let req = ControlRequest::UpdateConfig {
            url: Some("ws://10.0.0.2:8000/ws".into()),
            token: None,
            enabled: Some(true),
        };
        let patch = req.settings_patch().expect("patch");
        assert_eq!(patch.server_url.as_deref(), Some("ws://10.0.0.2:8000/ws"));
        assert_eq!(patch.token, None);
        assert_eq!(patch.control_enabled, Some(true));

        assert!(ControlRequest::Logs.settings_patch().is_none());
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(ControlResponse::ack(Ok(()))).expect("json"),
            json!({"success": true})
        );
        assert_eq!(
            serde_json::to_value(ControlResponse::executed(Ok(json!({"ok": true})))).expect("json"),
            json!({"ok": true, "data": {"ok": true}})
        );
        assert_eq!(
            serde_json::to_value(ControlResponse::executed(Err(Error::NoResult))).expect("json"),
            json!({"ok": false, "error": Error::NoResult.to_string()})
        );
    }
}
