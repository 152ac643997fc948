//! Channel frames.
//!
//! Every frame is a single JSON object sent as one WebSocket text message.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{Error, Result};

use super::InboundCommand;

// ============================================================================
// InboundFrame
// ============================================================================

/// A classified frame received from the controller.
///
/// # Classification
///
/// | Shape | Variant |
/// |-------|---------|
/// | `{"type":"pong"}` | [`InboundFrame::Pong`] |
/// | `{"error":..., "message"?:...}` | [`InboundFrame::ServerError`] |
/// | anything else | [`InboundFrame::Command`] |
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Keepalive acknowledgment.
    Pong,

    /// Error reported by the controller.
    ServerError {
        /// Error text.
        error: String,
        /// Optional detail.
        message: Option<String>,
    },

    /// A command to dispatch.
    Command(InboundCommand),
}

impl InboundFrame {
    /// Parses and classifies a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            from_str(text).map_err(|e| Error::protocol(format!("JSON parse error: {e}")))?;

        let Value::Object(fields) = value else {
            return Err(Error::protocol("frame is not a JSON object"));
        };

        if fields.get("type").and_then(Value::as_str) == Some("pong") {
            return Ok(Self::Pong);
        }

        if let Some(error) = fields.get("error").filter(|v| is_truthy(v)) {
            let error = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok(Self::ServerError { error, message });
        }

        let command = from_value(Value::Object(fields))
            .map_err(|e| Error::protocol(format!("malformed command: {e}")))?;
        Ok(Self::Command(command))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Wire type of a successful read-action result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Result of `dump_dom`.
    DomDump,
    /// Result of `get_nodes_map`.
    NodesMap,
    /// Result of `get_workflow`.
    Workflow,
}

impl ResponseType {
    /// Returns the `type` string used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DomDump => "dom_dump",
            Self::NodesMap => "nodes_map",
            Self::Workflow => "workflow",
        }
    }

    /// Wraps `data` into the frame for this type.
    #[must_use]
    pub fn into_frame(self, data: Value) -> OutboundFrame {
        match self {
            Self::DomDump => OutboundFrame::DomDump { data },
            Self::NodesMap => OutboundFrame::NodesMap { data },
            Self::Workflow => OutboundFrame::Workflow { data },
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// OutboundFrame
// ============================================================================

/// A frame sent to the controller.
///
/// # Format
///
/// ```json
/// {"type": "ping"}
/// {"type": "error", "message": "No controlled tab found (port 8188)"}
/// {"type": "workflow", "data": { ... }}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Keepalive.
    Ping,

    /// Execution failure.
    Error {
        /// Human-readable description.
        message: String,
    },

    /// `dump_dom` result.
    DomDump {
        /// Page payload.
        data: Value,
    },

    /// `get_nodes_map` result.
    NodesMap {
        /// Page payload.
        data: Value,
    },

    /// `get_workflow` result.
    Workflow {
        /// Page payload.
        data: Value,
    },
}

impl OutboundFrame {
    /// Creates an error frame.
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serializes the frame to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    #[inline]
    pub fn to_text(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_pong() {
        assert_eq!(InboundFrame::parse(r#"{"type":"pong"}"#).expect("parse"), InboundFrame::Pong);
    }

    #[test]
    fn test_parse_server_error() {
        let frame = InboundFrame::parse(r#"{"error":"unauthorized","message":"bad token"}"#)
            .expect("parse");
        assert_eq!(
            frame,
            InboundFrame::ServerError {
                error: "unauthorized".into(),
                message: Some("bad token".into())
            }
        );
    }

    #[test]
    fn test_falsy_error_is_a_command() {
        let frame = InboundFrame::parse(r#"{"action":"get_workflow","error":null}"#)
            .expect("parse");
        assert!(matches!(frame, InboundFrame::Command(cmd) if cmd.action == "get_workflow"));
    }

    #[test]
    fn test_parse_command() {
        let frame = InboundFrame::parse(r##"{"action":"click","selector":"#run"}"##)
            .expect("parse");
        let InboundFrame::Command(cmd) = frame else {
            panic!("expected command");
        };
        assert_eq!(cmd.action, "click");
        assert_eq!(cmd.param("selector"), Some(&json!("#run")));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(InboundFrame::parse("not json"), Err(Error::Protocol { .. })));
        assert!(matches!(InboundFrame::parse("[1,2]"), Err(Error::Protocol { .. })));
    }

    #[test]
    fn test_action_must_be_string() {
        let err = InboundFrame::parse(r#"{"action":42}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_outbound_shapes() {
        assert_eq!(OutboundFrame::Ping.to_text().expect("ping"), r#"{"type":"ping"}"#);

        let err = serde_json::to_value(OutboundFrame::error("boom")).expect("error");
        assert_eq!(err, json!({"type": "error", "message": "boom"}));

        let wf = ResponseType::Workflow.into_frame(json!({"node_count": 2}));
        assert_eq!(
            serde_json::to_value(wf).expect("workflow"),
            json!({"type": "workflow", "data": {"node_count": 2}})
        );
    }

    #[test]
    fn test_response_type_names() {
        assert_eq!(ResponseType::DomDump.to_string(), "dom_dump");
        assert_eq!(ResponseType::NodesMap.as_str(), "nodes_map");
    }
}
