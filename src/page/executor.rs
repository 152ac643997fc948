//! Page action execution.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::Action;

use super::{PageHost, TabInfo, TabPattern};

// ============================================================================
// Constants
// ============================================================================

/// Port the node-graph application is served on.
pub const DEFAULT_APP_PORT: u16 = 8188;

/// How long graph actions wait for the application to become ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Error kind the page reports when the graph never became ready.
const GRAPH_NOT_READY: &str = "graph_not_ready";

// ============================================================================
// PageExecutor
// ============================================================================

/// Runs a named action against the controlled tab.
///
/// This is the seam the dispatcher depends on.
#[async_trait]
pub trait PageExecutor: Send + Sync + 'static {
    /// Executes `action` and returns its success payload.
    ///
    /// # Errors
    ///
    /// - [`Error::NoControlledTab`] if no tab runs the application
    /// - [`Error::NoResult`] if the page returned nothing
    /// - [`Error::NotReady`] if the application did not become ready
    /// - [`Error::PageAction`] for any other page-reported error
    async fn execute(&self, action: &Action) -> Result<Value>;
}

// ============================================================================
// PageActionExecutor
// ============================================================================

/// [`PageExecutor`] over browser primitives.
///
/// Picks the first tab whose URL matches the controlled-tab patterns and
/// translates the page's structured `{error, message?}` answers into
/// [`Error`]s.
#[derive(Debug)]
pub struct PageActionExecutor<H> {
    host: H,
    port: u16,
    patterns: Vec<TabPattern>,
    ready_timeout: Duration,
}

impl<H: PageHost> PageActionExecutor<H> {
    /// Creates an executor for the application on [`DEFAULT_APP_PORT`].
    #[must_use]
    pub fn new(host: H) -> Self {
        Self::with_port(host, DEFAULT_APP_PORT)
    }

    /// Creates an executor for the application on `port`.
    #[must_use]
    pub fn with_port(host: H, port: u16) -> Self {
        Self {
            host,
            port,
            patterns: TabPattern::local_app(port).unwrap_or_default(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Sets how long graph actions wait for the application.
    #[inline]
    #[must_use]
    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    /// Returns the underlying host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Finds the controlled tab.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoControlledTab`] if no open tab matches.
    pub async fn controlled_tab(&self) -> Result<TabInfo> {
        let tabs = self.host.tabs().await?;
        trace!(count = tabs.len(), "Tabs listed");

        tabs.into_iter()
            .find(|tab| self.patterns.iter().any(|p| p.matches(&tab.url)))
            .ok_or_else(|| Error::no_controlled_tab(self.port))
    }

    /// Converts the page's raw answer into a result.
    fn interpret(&self, raw: Option<Value>) -> Result<Value> {
        let value = match raw {
            None | Some(Value::Null) => return Err(Error::NoResult),
            Some(value) => value,
        };

        let kind = match value.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        let Some(kind) = kind else {
            return Ok(value);
        };

        if kind == GRAPH_NOT_READY {
            return Err(Error::not_ready(self.ready_timeout.as_millis() as u64));
        }

        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        Err(Error::page_action(kind, message))
    }
}

#[async_trait]
impl<H: PageHost> PageExecutor for PageActionExecutor<H> {
    async fn execute(&self, action: &Action) -> Result<Value> {
        let tab = self.controlled_tab().await?;
        debug!(tab_id = %tab.id, action = action.name(), "Running page action");

        let raw = self.host.run_action(&tab, action, self.ready_timeout).await?;
        self.interpret(raw)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::page::TabId;

    /// Host with fixed tabs and a canned page answer.
    struct FakeHost {
        tabs: Vec<TabInfo>,
        answer: Option<Value>,
        calls: Mutex<Vec<(TabInfo, Action, Duration)>>,
    }

    impl FakeHost {
        fn new(tabs: Vec<TabInfo>, answer: Option<Value>) -> Self {
            Self {
                tabs,
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageHost for FakeHost {
        async fn tabs(&self) -> Result<Vec<TabInfo>> {
            Ok(self.tabs.clone())
        }

        async fn run_action(
            &self,
            tab: &TabInfo,
            action: &Action,
            ready_timeout: Duration,
        ) -> Result<Option<Value>> {
            self.calls
                .lock()
                .push((tab.clone(), action.clone(), ready_timeout));
            Ok(self.answer.clone())
        }
    }

    fn app_tabs() -> Vec<TabInfo> {
        vec![
            TabInfo::new(1, "https://example.com/"),
            TabInfo::new(7, "http://localhost:8188/"),
            TabInfo::new(9, "http://127.0.0.1:8188/"),
        ]
    }

    #[tokio::test]
    async fn test_no_controlled_tab() {
        let host = FakeHost::new(vec![TabInfo::new(1, "https://example.com/")], None);
        let executor = PageActionExecutor::new(host);

        let err = executor.execute(&Action::GetWorkflow).await.unwrap_err();
        assert!(matches!(err, Error::NoControlledTab { port: 8188 }));
        assert!(executor.host().calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_first_matching_tab_is_used() {
        let host = FakeHost::new(app_tabs(), Some(json!({"ok": true})));
        let executor = PageActionExecutor::new(host);

        let action = Action::Click {
            selector: "#queue-button".into(),
        };
        let value = executor.execute(&action).await.expect("execute");

        assert_eq!(value, json!({"ok": true}));
        let calls = executor.host().calls.lock();
        assert_eq!(calls[0].0.id, TabId::new(7));
        assert_eq!(calls[0].2, DEFAULT_READY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_custom_port() {
        let host = FakeHost::new(app_tabs(), Some(json!({})));
        let executor = PageActionExecutor::with_port(host, 9000);

        let err = executor.execute(&Action::GetNodesMap).await.unwrap_err();
        assert!(matches!(err, Error::NoControlledTab { port: 9000 }));
    }

    #[tokio::test]
    async fn test_no_result() {
        let executor = PageActionExecutor::new(FakeHost::new(app_tabs(), None));
        let err = executor.execute(&Action::GetNodesMap).await.unwrap_err();
        assert!(matches!(err, Error::NoResult));
    }

    #[tokio::test]
    async fn test_null_answer_is_no_result() {
        let executor = PageActionExecutor::new(FakeHost::new(app_tabs(), Some(Value::Null)));
        let err = executor.execute(&Action::GetWorkflow).await.unwrap_err();
        assert!(matches!(err, Error::NoResult));
    }

    #[tokio::test]
    async fn test_graph_not_ready() {
        let host = FakeHost::new(app_tabs(), Some(json!({"error": "graph_not_ready"})));
        let executor = PageActionExecutor::new(host)
            .with_ready_timeout(Duration::from_millis(250));

        let err = executor.execute(&Action::GetWorkflow).await.unwrap_err();
        assert!(matches!(err, Error::NotReady { timeout_ms: 250 }));
    }

    #[tokio::test]
    async fn test_page_error_with_message() {
        let host = FakeHost::new(
            app_tabs(),
            Some(json!({"error": "serialize_failed", "message": "TypeError"})),
        );
        let executor = PageActionExecutor::new(host);

        let err = executor.execute(&Action::GetWorkflow).await.unwrap_err();
        assert_eq!(err.to_string(), "serialize_failed: TypeError");
    }

    #[tokio::test]
    async fn test_null_error_field_is_success() {
        let host = FakeHost::new(app_tabs(), Some(json!({"error": null, "count": 0})));
        let executor = PageActionExecutor::new(host);

        let value = executor
            .execute(&Action::DumpDom { max_items: 10 })
            .await
            .expect("execute");
        assert_eq!(value["count"], 0);
    }
}
