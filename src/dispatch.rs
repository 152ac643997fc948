//! Command dispatch.
//!
//! Turns an [`InboundCommand`] into a page action, runs it, and reports the
//! outcome.
//!
//! # Entry Points
//!
//! | Method | Caller | Transmits |
//! |--------|--------|-----------|
//! | [`Dispatcher::dispatch`] | channel | `{type, data}` or `{type:"error"}` when open |
//! | [`Dispatcher::dispatch_and_return`] | local UI | never |
//!
//! Both return the raw success payload or the error. Execution errors never
//! close the channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::log_sink::LogSink;
use crate::page::PageExecutor;
use crate::protocol::{Action, InboundCommand, OutboundFrame};
use crate::transport::ChannelLink;

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes commands to the page executor and results back to the channel.
///
/// Cheap to clone; clones share the executor, log, and link.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn PageExecutor>,
    log: LogSink,
    link: ChannelLink,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(executor: Arc<dyn PageExecutor>, log: LogSink, link: ChannelLink) -> Self {
        Self {
            executor,
            log,
            link,
        }
    }

    /// Executes `command` and reports the outcome on the channel.
    ///
    /// Read actions send `{type: <response type>, data}`; `click` and `fill`
    /// send nothing on success. Any failure is logged and, if the channel is
    /// open, sent as `{type: "error", message}`.
    ///
    /// # Errors
    ///
    /// Returns the execution error after reporting it.
    pub async fn dispatch(&self, command: &InboundCommand) -> Result<Value> {
        match self.run(command).await {
            Ok((action, data)) => {
                if let Some(response_type) = action.response_type()
                    && self.link.send(&response_type.into_frame(data.clone()))
                {
                    self.log
                        .info(format!("Response '{response_type}' sent to controller"));
                }
                Ok(data)
            }
            Err(e) => {
                self.log.error(format!("Command execution failed: {e}"));
                self.link.send(&OutboundFrame::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Executes `command` for a local caller.
    ///
    /// Same execution path as [`dispatch`](Self::dispatch), but nothing is
    /// wrapped or transmitted, whatever the channel state.
    ///
    /// # Errors
    ///
    /// Returns the execution error.
    pub async fn dispatch_and_return(&self, command: &InboundCommand) -> Result<Value> {
        self.run(command).await.map(|(_, data)| data)
    }

    async fn run(&self, command: &InboundCommand) -> Result<(Action, Value)> {
        let action = Action::parse(command)?;
        debug!(action = action.name(), "Executing command");

        let data = self.executor.execute(&action).await?;
        Ok((action, data))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::error::Error;
    use crate::log_sink::LogLevel;
    use crate::page::{PageActionExecutor, PageHost, TabInfo};
    use crate::transport::{Channel, ChannelPeer};

    /// Application tab whose graph becomes ready after a few polls.
    struct GraphHost {
        tabs: Vec<TabInfo>,
        ready_after: Duration,
        actions: Mutex<Vec<Action>>,
    }

    impl GraphHost {
        fn with_app() -> Self {
            Self {
                tabs: vec![TabInfo::new(3, "http://127.0.0.1:8188/")],
                ready_after: Duration::from_millis(20),
                actions: Mutex::new(Vec::new()),
            }
        }

        fn without_app() -> Self {
            Self {
                tabs: vec![TabInfo::new(1, "https://example.com/")],
                ..Self::with_app()
            }
        }
    }

    #[async_trait]
    impl PageHost for GraphHost {
        async fn tabs(&self) -> Result<Vec<TabInfo>> {
            Ok(self.tabs.clone())
        }

        async fn run_action(
            &self,
            _tab: &TabInfo,
            action: &Action,
            ready_timeout: Duration,
        ) -> Result<Option<Value>> {
            self.actions.lock().push(action.clone());

            if action.needs_graph() {
                if self.ready_after > ready_timeout {
                    return Ok(Some(json!({"error": "graph_not_ready"})));
                }
                tokio::time::sleep(self.ready_after).await;
            }

            let answer = match action {
                Action::Click { .. } | Action::Fill { .. } => json!({"ok": true}),
                Action::DumpDom { .. } => json!({"url": "http://127.0.0.1:8188/", "count": 0, "items": []}),
                Action::GetNodesMap => json!({"url": "http://127.0.0.1:8188/", "count": 1, "nodes": [{"id": 1}]}),
                Action::GetWorkflow => json!({
                    "url": "http://127.0.0.1:8188/",
                    "node_count": 2,
                    "workflow": {"nodes": [{"id": 1}, {"id": 2}], "links": []}
                }),
            };
            Ok(Some(answer))
        }
    }

    fn dispatcher(host: GraphHost) -> (Dispatcher, LogSink, ChannelLink) {
        let log = LogSink::new();
        let link = ChannelLink::new();
        let executor = Arc::new(PageActionExecutor::new(host));
        (Dispatcher::new(executor, log.clone(), link.clone()), log, link)
    }

    fn open_channel(link: &ChannelLink) -> ChannelPeer {
        let (channel, peer) = Channel::pair();
        let (writer, _events) = channel.split();
        link.attach(writer);
        peer
    }

    #[tokio::test]
    async fn test_get_workflow_sends_wrapped_result() {
        let (dispatcher, log, link) = dispatcher(GraphHost::with_app());
        let mut peer = open_channel(&link);

        let data = dispatcher
            .dispatch(&InboundCommand::new("get_workflow"))
            .await
            .expect("dispatch");
        assert_eq!(data["node_count"], 2);

        let sent: Value = serde_json::from_str(&peer.next_text().await.expect("frame"))
            .expect("json");
        assert_eq!(sent["type"], "workflow");
        assert_eq!(sent["data"]["node_count"], 2);
        assert_eq!(sent["data"]["url"], "http://127.0.0.1:8188/");
        assert!(sent["data"]["workflow"]["nodes"].is_array());

        assert!(
            log.rows()
                .iter()
                .any(|r| r.level == LogLevel::Info && r.message.contains("'workflow'"))
        );
    }

    #[tokio::test]
    async fn test_mutations_are_not_transmitted() {
        let (dispatcher, _log, link) = dispatcher(GraphHost::with_app());
        let mut peer = open_channel(&link);

        let cmd = InboundCommand::new("fill")
            .with_param("selector", "textarea")
            .with_param("text", "a castle");
        let data = dispatcher.dispatch(&cmd).await.expect("dispatch");
        assert_eq!(data, json!({"ok": true}));

        // Only the marker ping below should be on the wire.
        link.send(&OutboundFrame::Ping);
        assert_eq!(peer.next_text().await.as_deref(), Some(r#"{"type":"ping"}"#));
    }

    #[tokio::test]
    async fn test_unknown_action_reports_error() {
        let (dispatcher, log, link) = dispatcher(GraphHost::with_app());
        let mut peer = open_channel(&link);

        let err = dispatcher
            .dispatch(&InboundCommand::new("self_destruct"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAction { .. }));

        let sent: Value = serde_json::from_str(&peer.next_text().await.expect("frame"))
            .expect("json");
        assert_eq!(sent, json!({"type": "error", "message": "Unknown action: self_destruct"}));
        assert!(log.rows().iter().any(|r| r.level == LogLevel::Error));
    }

    #[tokio::test]
    async fn test_no_controlled_tab_resolves() {
        let (dispatcher, _log, _link) = dispatcher(GraphHost::without_app());

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.dispatch(&InboundCommand::new("get_nodes_map")),
        )
        .await
        .expect("must not hang");

        assert!(matches!(result, Err(Error::NoControlledTab { .. })));
    }

    #[tokio::test]
    async fn test_failure_without_channel_is_only_logged() {
        let (dispatcher, log, link) = dispatcher(GraphHost::without_app());
        assert!(!link.is_open());

        let result = dispatcher.dispatch(&InboundCommand::new("dump_dom")).await;
        assert!(result.is_err());
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_and_return_never_transmits() {
        let (dispatcher, log, link) = dispatcher(GraphHost::with_app());
        let mut peer = open_channel(&link);

        let data = dispatcher
            .dispatch_and_return(&InboundCommand::new("get_nodes_map"))
            .await
            .expect("dispatch");
        assert_eq!(data["count"], 1);

        let err = dispatcher
            .dispatch_and_return(&InboundCommand::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAction { .. }));

        link.send(&OutboundFrame::Ping);
        assert_eq!(peer.next_text().await.as_deref(), Some(r#"{"type":"ping"}"#));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_dump_dom_argument_reaches_page() {
        let host = GraphHost::with_app();
        let log = LogSink::new();
        let executor = Arc::new(PageActionExecutor::new(host));
        let dispatcher = Dispatcher::new(executor.clone(), log, ChannelLink::new());

        dispatcher
            .dispatch_and_return(&InboundCommand::new("dump_dom").with_param("maxItems", 200))
            .await
            .expect("dispatch");

        assert_eq!(
            executor.host().actions.lock().as_slice(),
            [Action::DumpDom { max_items: 200 }]
        );
    }
}
