//! Inbound commands and typed page actions.
//!
//! # Actions
//!
//! | Action | Parameters | Response type |
//! |--------|------------|---------------|
//! | `click` | `selector` | - |
//! | `fill` | `selector`, `text?` | - |
//! | `dump_dom` | `maxItems?` (default 100) | `dom_dump` |
//! | `get_nodes_map` | - | `nodes_map` |
//! | `get_workflow` | - | `workflow` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::ResponseType;

// ============================================================================
// Constants
// ============================================================================

/// Items returned by `dump_dom` when `maxItems` is absent or zero.
pub const DEFAULT_DUMP_MAX_ITEMS: u32 = 100;

// ============================================================================
// InboundCommand
// ============================================================================

/// A decoded request, from the channel or from a local caller.
///
/// Parameters stay untyped until [`Action::parse`] validates them.
///
/// # Format
///
/// ```json
/// { "action": "fill", "selector": "#prompt", "text": "a cat" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundCommand {
    /// Action name. Empty when the frame carried none.
    #[serde(default)]
    pub action: String,

    /// Remaining fields.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl InboundCommand {
    /// Creates a command with no parameters.
    #[inline]
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Map::new(),
        }
    }

    /// Adds a parameter.
    #[inline]
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter, treating JSON `null` as absent.
    #[inline]
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    fn required_str(&self, key: &str) -> Result<String> {
        self.optional_str(key)?.ok_or_else(|| {
            Error::invalid_argument(format!("'{}' requires a '{key}' string", self.action))
        })
    }

    fn optional_str(&self, key: &str) -> Result<Option<String>> {
        match self.param(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Error::invalid_argument(format!(
                "'{key}' must be a string, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Action
// ============================================================================

/// A validated action to run in the controlled tab.
///
/// Serializes to the argument handed to the page:
/// `{"action":"dump_dom","maxItems":100}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Click the first element matching `selector`.
    Click {
        /// CSS selector.
        selector: String,
    },

    /// Set the value of the first element matching `selector`.
    Fill {
        /// CSS selector.
        selector: String,
        /// New value.
        text: String,
    },

    /// Snapshot the interactive elements on the page.
    DumpDom {
        /// Maximum number of elements returned.
        #[serde(rename = "maxItems")]
        max_items: u32,
    },

    /// List graph nodes.
    GetNodesMap,

    /// Serialize the whole graph.
    GetWorkflow,
}

impl Action {
    /// Validates a command into an action.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAction`] if the action name is not recognized
    /// - [`Error::InvalidArgument`] if a parameter is missing or mistyped
    pub fn parse(command: &InboundCommand) -> Result<Self> {
        match command.action.as_str() {
            "click" => Ok(Self::Click {
                selector: command.required_str("selector")?,
            }),
            "fill" => Ok(Self::Fill {
                selector: command.required_str("selector")?,
                text: command.optional_str("text")?.unwrap_or_default(),
            }),
            "dump_dom" => Ok(Self::DumpDom {
                max_items: parse_max_items(command.param("maxItems"))?,
            }),
            "get_nodes_map" => Ok(Self::GetNodesMap),
            "get_workflow" => Ok(Self::GetWorkflow),
            other => Err(Error::unknown_action(other)),
        }
    }

    /// Returns the wire name of the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::Fill { .. } => "fill",
            Self::DumpDom { .. } => "dump_dom",
            Self::GetNodesMap => "get_nodes_map",
            Self::GetWorkflow => "get_workflow",
        }
    }

    /// Returns the response type the result is sent back under.
    ///
    /// `None` means the result is only returned to local callers.
    #[must_use]
    pub const fn response_type(&self) -> Option<ResponseType> {
        match self {
            Self::Click { .. } | Self::Fill { .. } => None,
            Self::DumpDom { .. } => Some(ResponseType::DomDump),
            Self::GetNodesMap => Some(ResponseType::NodesMap),
            Self::GetWorkflow => Some(ResponseType::Workflow),
        }
    }

    /// Returns `true` if the page must wait for the graph to be ready.
    #[inline]
    #[must_use]
    pub const fn needs_graph(&self) -> bool {
        matches!(self, Self::GetNodesMap | Self::GetWorkflow)
    }
}

impl TryFrom<&InboundCommand> for Action {
    type Error = Error;

    fn try_from(command: &InboundCommand) -> Result<Self> {
        Self::parse(command)
    }
}

fn parse_max_items(value: Option<&Value>) -> Result<u32> {
    let count = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_DUMP_MAX_ITEMS),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let count = count
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| {
            Error::invalid_argument(format!(
                "'maxItems' must be a count, got {}",
                value.unwrap_or(&Value::Null)
            ))
        })?;

    // Fractional counts truncate; anything past u32 saturates.
    match count.trunc() as u32 {
        0 => Ok(DEFAULT_DUMP_MAX_ITEMS),
        n => Ok(n),
    }
}

// ============================================================================
// Tests
// ============================================================================
