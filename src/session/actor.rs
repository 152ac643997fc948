//! The connection state machine.
//!
//! One task owns every piece of mutable connection state and processes
//! [`Input`]s one at a time. Handshakes, the channel pump, keepalive and
//! timers run as their own tasks and only post inputs back. Inputs from a
//! handshake or channel are tagged with the generation that started them, and
//! anything from a stale generation is ignored; that is how a disconnect
//! cancels work already in flight.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::log_sink::LogSink;
use crate::protocol::{InboundCommand, InboundFrame, OutboundFrame};
use crate::transport::{
    Channel, ChannelEvent, ChannelLink, CloseInfo, Connector, Outgoing, authenticated_url,
};

use super::backoff::{CONSTRUCTION_RETRY, KEEPALIVE_INTERVAL, MAX_ATTEMPTS, backoff_delay};
use super::state::{ConnectionState, SessionSnapshot};

// ============================================================================
// Inputs
// ============================================================================

/// Requests from the [`Session`](super::Session) handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Connect if allowed; `reset` zeroes the attempt counter first.
    Connect { reset: bool },
    /// Connect after `delay`, using the retry slot.
    ConnectAfter(Duration),
    /// Tear down whatever is in progress.
    Disconnect,
    /// Disconnect, reset the counter, connect.
    Reconnect,
    /// Disconnect and end the task.
    Stop,
}

/// Everything the actor reacts to.
pub(crate) enum Input {
    /// A request; `done` fires once it is applied and published.
    Command {
        command: Command,
        done: oneshot::Sender<()>,
    },
    Event(Event),
}

/// Completions posted back by spawned tasks.
pub(crate) enum Event {
    Handshake {
        generation: u64,
        result: Result<Channel>,
    },
    Channel {
        generation: u64,
        event: ChannelEvent,
    },
    RetryElapsed {
        ticket: u64,
    },
}

/// Posts `event` if the actor is still running.
fn post(inputs: &mpsc::WeakUnboundedSender<Input>, event: Event) -> bool {
    inputs
        .upgrade()
        .is_some_and(|inputs| inputs.send(Input::Event(event)).is_ok())
}

// ============================================================================
// SessionActor
// ============================================================================

/// Owner of the connection state.
pub(crate) struct SessionActor {
    config: Arc<ConfigStore>,
    connector: Arc<dyn Connector>,
    link: ChannelLink,
    log: LogSink,
    commands: mpsc::UnboundedSender<InboundCommand>,

    inputs: mpsc::UnboundedReceiver<Input>,
    inputs_tx: mpsc::WeakUnboundedSender<Input>,
    snapshot: watch::Sender<SessionSnapshot>,

    state: ConnectionState,
    attempts: u32,
    generation: u64,
    last_close: Option<CloseInfo>,

    retry_ticket: u64,
    retry_delay: Option<Duration>,
    retry_timer: Option<JoinHandle<()>>,
    connect_task: Option<JoinHandle<()>>,
    pump_task: Option<JoinHandle<()>>,
    keepalive_task: Option<JoinHandle<()>>,
}

impl SessionActor {
    /// Spawns the actor.
    ///
    /// Returns the input sender and the snapshot receiver. The task ends on
    /// [`Command::Stop`] or once every sender is dropped. Inbound commands are
    /// forwarded to `commands` in arrival order.
    pub(crate) fn spawn(
        config: Arc<ConfigStore>,
        connector: Arc<dyn Connector>,
        link: ChannelLink,
        log: LogSink,
        commands: mpsc::UnboundedSender<InboundCommand>,
    ) -> (mpsc::UnboundedSender<Input>, watch::Receiver<SessionSnapshot>) {
        let (inputs_tx, inputs) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let actor = Self {
            config,
            connector,
            link,
            log,
            commands,
            inputs,
            inputs_tx: inputs_tx.downgrade(),
            snapshot,
            state: ConnectionState::Idle,
            attempts: 0,
            generation: 0,
            last_close: None,
            retry_ticket: 0,
            retry_delay: None,
            retry_timer: None,
            connect_task: None,
            pump_task: None,
            keepalive_task: None,
        };

        tokio::spawn(actor.run());
        (inputs_tx, snapshot_rx)
    }

    async fn run(mut self) {
        debug!("Session task started");

        while let Some(input) = self.inputs.recv().await {
            match input {
                Input::Command { command, done } => {
                    let stop = self.on_command(command);
                    self.publish();
                    let _ = done.send(());
                    if stop {
                        break;
                    }
                }
                Input::Event(event) => {
                    self.on_event(event);
                    self.publish();
                }
            }
        }

        self.teardown();
        self.publish();
        debug!("Session task finished");
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Handshake { generation, result } => self.on_handshake(generation, result),
            Event::Channel { generation, event } => self.on_channel_event(generation, event),
            Event::RetryElapsed { ticket } => self.on_retry_elapsed(ticket),
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            state: self.state,
            attempts: self.attempts,
            retry_delay: self.retry_delay,
            last_close: self.last_close.clone(),
        });
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            trace!(from = %self.state, to = %state, "State transition");
            self.state = state;
        }
    }
}

// ============================================================================
// SessionActor - Commands
// ============================================================================

impl SessionActor {
    fn on_command(&mut self, command: Command) -> bool {
        trace!(?command, "Session command");

        match command {
            Command::Connect { reset } => {
                if reset {
                    self.attempts = 0;
                }
                self.connect();
            }
            Command::ConnectAfter(delay) => self.schedule_retry(delay),
            Command::Disconnect => self.disconnect(),
            Command::Reconnect => {
                self.disconnect();
                self.attempts = 0;
                self.connect();
            }
            Command::Stop => {
                self.disconnect();
                return true;
            }
        }

        false
    }

    /// Starts a connection attempt if one is allowed.
    fn connect(&mut self) {
        let settings = self.config.snapshot();

        if !settings.control_enabled {
            self.log.info("Connection cancelled (control disabled)");
            return;
        }

        let Some(token) = settings.token() else {
            self.log
                .warn("No token configured, not attempting a connection");
            return;
        };

        if self.state.is_active() {
            trace!(state = %self.state, "Connect ignored, already active");
            return;
        }

        if self.attempts >= MAX_ATTEMPTS {
            self.log.error("Maximum reconnect attempts reached");
            self.attempts = 0;
            return;
        }

        self.cancel_retry();
        self.attempts += 1;

        let url = match authenticated_url(&settings.server_url, token) {
            Ok(url) => url,
            Err(e) => {
                self.log.error(format!("Failed to create connection: {e}"));
                self.set_state(ConnectionState::Idle);
                if settings.control_enabled && self.attempts < MAX_ATTEMPTS {
                    self.schedule_retry(CONSTRUCTION_RETRY);
                }
                return;
            }
        };

        self.generation += 1;
        self.set_state(ConnectionState::Connecting);
        self.log.info(format!(
            "Connecting to {} ({}/{})",
            settings.server_url, self.attempts, MAX_ATTEMPTS
        ));

        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let inputs = self.inputs_tx.clone();
        self.connect_task = Some(tokio::spawn(async move {
            let result = connector.connect(&url).await;
            post(&inputs, Event::Handshake { generation, result });
        }));
    }

    /// Cancels everything and returns to `Idle`.
    fn disconnect(&mut self) {
        self.teardown();
        self.log.info("Disconnected");
    }

    fn teardown(&mut self) {
        self.cancel_retry();
        self.generation += 1;

        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        self.stop_channel_tasks();

        if let Some(writer) = self.link.detach() {
            let _ = writer.send(Outgoing::Close);
        }

        self.set_state(ConnectionState::Idle);
    }

    fn stop_channel_tasks(&mut self) {
        if let Some(task) = self.keepalive_task.take() {
            task.abort();
        }
        if let Some(task) = self.pump_task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// SessionActor - Handshake and Channel
// ============================================================================

impl SessionActor {
    fn on_handshake(&mut self, generation: u64, result: Result<Channel>) {
        if generation != self.generation {
            trace!(generation, current = self.generation, "Stale handshake dropped");
            return;
        }
        self.connect_task = None;

        match result {
            Ok(channel) => self.on_open(channel),
            Err(e) => {
                self.log.warn(format!("Connection error: {e}"));
                self.set_state(ConnectionState::Idle);
                self.on_close(CloseInfo::abnormal(e.to_string()));
            }
        }
    }

    fn on_open(&mut self, channel: Channel) {
        let (writer, mut events) = channel.split();
        self.link.attach(writer);
        self.set_state(ConnectionState::Open);
        self.attempts = 0;
        self.last_close = None;
        self.log.info("Connected");

        let generation = self.generation;
        let inputs = self.inputs_tx.clone();
        self.pump_task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let closed = matches!(event, ChannelEvent::Closed(_));
                if !post(&inputs, Event::Channel { generation, event }) || closed {
                    return;
                }
            }
            let event = ChannelEvent::Closed(CloseInfo::abnormal("channel dropped"));
            post(&inputs, Event::Channel { generation, event });
        }));

        let link = self.link.clone();
        self.keepalive_task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
            loop {
                ticker.tick().await;
                if !link.send(&OutboundFrame::Ping) {
                    trace!("Keepalive stopped, channel no longer open");
                    return;
                }
            }
        }));
    }

    fn on_channel_event(&mut self, generation: u64, event: ChannelEvent) {
        if generation != self.generation {
            trace!(generation, current = self.generation, "Stale channel event dropped");
            return;
        }

        match event {
            ChannelEvent::Message(text) => self.on_message(&text),
            ChannelEvent::Error(message) => {
                self.log.warn(format!("Connection error: {message}"));
            }
            ChannelEvent::Closed(info) => {
                self.stop_channel_tasks();
                self.link.detach();
                self.generation += 1;
                self.set_state(ConnectionState::Closed);
                self.on_close(info);
            }
        }
    }

    fn on_message(&mut self, text: &str) {
        match InboundFrame::parse(text) {
            Ok(InboundFrame::Pong) => trace!("Pong received"),
            Ok(InboundFrame::ServerError { error, message }) => {
                self.log.error(format!("Server error: {error}"));
                if let Some(message) = message {
                    self.log.error(message);
                }
            }
            Ok(InboundFrame::Command(command)) => {
                let name = if command.action.is_empty() {
                    "-"
                } else {
                    command.action.as_str()
                };
                self.log.debug(format!("Command received: {name}"));
                if self.commands.send(command).is_err() {
                    debug!("Dispatch worker gone, command dropped");
                }
            }
            Err(e) => self.log.error(format!("Dropped frame: {e}")),
        }
    }

    /// Applies the close policy.
    fn on_close(&mut self, info: CloseInfo) {
        self.last_close = Some(info.clone());

        if info.is_auth_rejection() {
            self.attempts = MAX_ATTEMPTS;
            let err = Error::auth_rejected(info.reason.clone());
            self.log.error(format!("{err} (invalid or missing token)"));
            return;
        }

        self.log.warn(format!("Connection closed ({})", info.code));

        if self.config.is_enabled() && self.attempts < MAX_ATTEMPTS {
            let delay = backoff_delay(self.attempts);
            self.log
                .info(format!("Reconnecting in {}s", delay.as_secs_f64()));
            self.schedule_retry(delay);
        }
    }
}

// ============================================================================
// SessionActor - Retry Timer
// ============================================================================

impl SessionActor {
    /// Arms the retry slot, replacing any pending timer.
    fn schedule_retry(&mut self, delay: Duration) {
        self.cancel_retry();

        self.retry_ticket += 1;
        self.retry_delay = Some(delay);

        let ticket = self.retry_ticket;
        let inputs = self.inputs_tx.clone();
        self.retry_timer = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            post(&inputs, Event::RetryElapsed { ticket });
        }));
    }

    fn cancel_retry(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
        self.retry_delay = None;
    }

    fn on_retry_elapsed(&mut self, ticket: u64) {
        if ticket != self.retry_ticket || self.retry_timer.is_none() {
            trace!(ticket, "Cancelled retry timer fired");
            return;
        }

        self.retry_timer = None;
        self.retry_delay = None;
        self.connect();
    }
}
