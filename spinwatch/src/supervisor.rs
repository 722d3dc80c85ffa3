//! Connection supervisor
//!
//! Top-level state machine deciding whether spins arrive via the SSE stream
//! or via polling. Decision logic is a pure transition function over tagged
//! enums so each state and guard is testable without I/O; the async loop
//! around it owns the trigger channel, the listener/scheduler tasks, and
//! dispatches pipeline runs.

use crate::dedup::DedupGuard;
use crate::listener::{self, ListenerConfig};
use crate::pipeline::{self, TriggerKind};
use crate::publisher::SpinPublisher;
use crate::scheduler::{self, SchedulerConfig};
use spinclient::SpinClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

/// Capacity of the trigger channel
const TRIGGER_CHANNEL_CAPACITY: usize = 32;

/// Connection mode of the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// SSE stream established, events flowing
    StreamConnected,
    /// Attempting to (re)establish the SSE stream
    StreamReconnecting,
    /// Stream given up on, fetching on a timer until a probe succeeds
    Polling,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StreamConnected => write!(f, "stream-connected"),
            Self::StreamReconnecting => write!(f, "stream-reconnecting"),
            Self::Polling => write!(f, "polling"),
        }
    }
}

/// Inputs to the state machine, produced by the listener and the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// SSE stream (re)connected
    StreamUp,
    /// SSE stream announced a new spin
    SpinEvent,
    /// An established SSE stream dropped
    StreamDown,
    /// Listener exhausted its bounded reconnect attempts
    RetriesExhausted,
    /// Poll timer fired
    PollTick,
    /// Health probe found the SSE endpoint reachable
    ProbeSucceeded,
}

/// Side effects the transition function requests from the supervisor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the fetch → dedup → publish pipeline
    RunPipeline(TriggerKind),
    /// Start a fresh SSE listener task
    StartListener,
    /// Start the polling-mode timers
    StartScheduler,
    /// Stop the polling-mode timers
    StopScheduler,
}

impl ConnectionState {
    /// Pure transition function: no I/O, no clocks
    ///
    /// Stale triggers from a task that was already cancelled (a poll tick
    /// arriving after the stream resumed, a stream signal arriving while
    /// polling) leave the state untouched. A `SpinEvent` always dispatches
    /// the pipeline; the dedup guard absorbs any resulting duplicate fetch.
    pub fn on_trigger(self, trigger: Trigger) -> (ConnectionState, Vec<Action>) {
        use ConnectionState::*;

        match (self, trigger) {
            // Stream lifecycle
            (StreamConnected | StreamReconnecting, Trigger::StreamUp) => (StreamConnected, vec![]),
            (StreamConnected | StreamReconnecting, Trigger::StreamDown) => {
                (StreamReconnecting, vec![])
            }
            (StreamReconnecting, Trigger::RetriesExhausted) => {
                (Polling, vec![Action::StartScheduler])
            }

            // Recovery: a probe-only success re-attempts a real connection
            // instead of declaring the stream healthy outright
            (Polling, Trigger::ProbeSucceeded) => (
                StreamReconnecting,
                vec![Action::StopScheduler, Action::StartListener],
            ),

            // Fetch triggers
            (state, Trigger::SpinEvent) => (state, vec![Action::RunPipeline(TriggerKind::Sse)]),
            (Polling, Trigger::PollTick) => (Polling, vec![Action::RunPipeline(TriggerKind::Poll)]),

            // Stale or out-of-mode triggers
            (state, _) => (state, vec![]),
        }
    }
}

/// A spawned child task and the token that stops it
struct TaskHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

/// Connection supervisor
///
/// Owns the listener and scheduler tasks and routes every trigger through
/// the pipeline. Runs for the process lifetime; stops only when the
/// shutdown token is cancelled.
pub struct Supervisor {
    client: Arc<SpinClient>,
    dedup: Arc<DedupGuard>,
    publisher: Arc<SpinPublisher>,
    sse_url: Url,
    listener_config: ListenerConfig,
    scheduler_config: SchedulerConfig,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Create a supervisor
    ///
    /// Fails only when the configured relay base URL cannot form an SSE URL.
    pub fn new(
        client: Arc<SpinClient>,
        publisher: Arc<SpinPublisher>,
        listener_config: ListenerConfig,
        scheduler_config: SchedulerConfig,
        shutdown: CancellationToken,
    ) -> spinclient::Result<Self> {
        let sse_url = client.sse_url()?;
        Ok(Self {
            client,
            dedup: Arc::new(DedupGuard::new()),
            publisher,
            sse_url,
            listener_config,
            scheduler_config,
            shutdown,
        })
    }

    /// Identifier of the last published spin, if any
    pub fn last_published(&self) -> Option<u64> {
        self.dedup.last_published()
    }

    /// Run the supervisor loop until shutdown
    ///
    /// On shutdown the listener and scheduler are cancelled, but in-flight
    /// pipeline runs are joined, not aborted: a publish that already started
    /// completes or times out before this returns.
    pub async fn run(self) {
        let (tx, mut rx) = mpsc::channel::<Trigger>(TRIGGER_CHANNEL_CAPACITY);

        let mut state = ConnectionState::StreamReconnecting;
        info!(state = %state, url = %self.sse_url, "Supervisor starting, connecting to SSE stream");

        let mut listener = Some(self.spawn_listener(tx.clone()));
        let mut scheduler: Option<TaskHandle> = None;
        let mut pipelines: JoinSet<()> = JoinSet::new();

        loop {
            let trigger = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                // Reap finished pipeline runs so the set does not grow
                Some(_) = pipelines.join_next(), if !pipelines.is_empty() => continue,
                received = rx.recv() => match received {
                    Some(trigger) => trigger,
                    None => break,
                },
            };

            let (next, actions) = state.on_trigger(trigger);
            if next != state {
                info!(from = %state, to = %next, trigger = ?trigger, "Connection state transition");
                state = next;
            }

            for action in actions {
                match action {
                    Action::RunPipeline(kind) => {
                        // Spawned so triggers from different sources may run
                        // concurrently; the dedup guard makes that safe
                        pipelines.spawn(pipeline::run_once(
                            Arc::clone(&self.client),
                            Arc::clone(&self.dedup),
                            Arc::clone(&self.publisher),
                            kind,
                        ));
                    }
                    Action::StartListener => {
                        if let Some(old) = listener.take() {
                            old.stop().await;
                        }
                        listener = Some(self.spawn_listener(tx.clone()));
                    }
                    Action::StartScheduler => {
                        if scheduler.is_none() {
                            scheduler = Some(self.spawn_scheduler(tx.clone()));
                        }
                    }
                    Action::StopScheduler => {
                        if let Some(old) = scheduler.take() {
                            old.stop().await;
                        }
                    }
                }
            }
        }

        info!("Supervisor shutting down");
        if let Some(task) = listener.take() {
            task.stop().await;
        }
        if let Some(task) = scheduler.take() {
            task.stop().await;
        }
        // No forced abort mid-publish: wait for in-flight pipeline runs,
        // each bounded by its own fetch/publish timeouts
        while pipelines.join_next().await.is_some() {}
    }

    fn spawn_listener(&self, tx: mpsc::Sender<Trigger>) -> TaskHandle {
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(listener::run(
            self.client.http_client().clone(),
            self.sse_url.clone(),
            self.listener_config.clone(),
            tx,
            cancel.clone(),
        ));
        TaskHandle { cancel, handle }
    }

    fn spawn_scheduler(&self, tx: mpsc::Sender<Trigger>) -> TaskHandle {
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(scheduler::run(
            Arc::clone(&self.client),
            self.scheduler_config.clone(),
            tx,
            cancel.clone(),
        ));
        TaskHandle { cancel, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn connect_success_enters_connected() {
        let (state, actions) = StreamReconnecting.on_trigger(Trigger::StreamUp);
        assert_eq!(state, StreamConnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn stream_drop_enters_reconnecting() {
        let (state, actions) = StreamConnected.on_trigger(Trigger::StreamDown);
        assert_eq!(state, StreamReconnecting);
        assert!(actions.is_empty());
    }

    #[test]
    fn exhausted_retries_enter_polling_and_start_timers() {
        let (state, actions) = StreamReconnecting.on_trigger(Trigger::RetriesExhausted);
        assert_eq!(state, Polling);
        assert_eq!(actions, vec![Action::StartScheduler]);
    }

    #[test]
    fn probe_success_reattempts_connection_and_stops_timers() {
        let (state, actions) = Polling.on_trigger(Trigger::ProbeSucceeded);
        assert_eq!(state, StreamReconnecting);
        assert_eq!(actions, vec![Action::StopScheduler, Action::StartListener]);
    }

    #[test]
    fn probe_success_does_not_declare_connected_directly() {
        // A probe-only success must go through a real connection attempt
        let (state, _) = Polling.on_trigger(Trigger::ProbeSucceeded);
        assert_ne!(state, StreamConnected);
    }

    #[test]
    fn spin_event_dispatches_pipeline_in_any_state() {
        for start in [StreamConnected, StreamReconnecting, Polling] {
            let (state, actions) = start.on_trigger(Trigger::SpinEvent);
            assert_eq!(state, start);
            assert_eq!(actions, vec![Action::RunPipeline(TriggerKind::Sse)]);
        }
    }

    #[test]
    fn poll_tick_fetches_only_while_polling() {
        let (state, actions) = Polling.on_trigger(Trigger::PollTick);
        assert_eq!(state, Polling);
        assert_eq!(actions, vec![Action::RunPipeline(TriggerKind::Poll)]);

        // Stale ticks after the mode switch fetch nothing
        for start in [StreamConnected, StreamReconnecting] {
            let (state, actions) = start.on_trigger(Trigger::PollTick);
            assert_eq!(state, start);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn stale_stream_signals_are_ignored_while_polling() {
        for trigger in [
            Trigger::StreamUp,
            Trigger::StreamDown,
            Trigger::RetriesExhausted,
        ] {
            let (state, actions) = Polling.on_trigger(trigger);
            assert_eq!(state, Polling);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn probe_success_outside_polling_is_ignored() {
        for start in [StreamConnected, StreamReconnecting] {
            let (state, actions) = start.on_trigger(Trigger::ProbeSucceeded);
            assert_eq!(state, start);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn full_failover_and_recovery_walk() {
        // Startup -> connected -> drop -> exhausted -> polling -> probe ->
        // reconnecting -> connected, the normal degradation/recovery arc.
        let (s1, _) = StreamReconnecting.on_trigger(Trigger::StreamUp);
        let (s2, _) = s1.on_trigger(Trigger::StreamDown);
        let (s3, actions) = s2.on_trigger(Trigger::RetriesExhausted);
        assert_eq!(s3, Polling);
        assert_eq!(actions, vec![Action::StartScheduler]);

        let (s4, actions) = s3.on_trigger(Trigger::ProbeSucceeded);
        assert_eq!(s4, StreamReconnecting);
        assert_eq!(actions, vec![Action::StopScheduler, Action::StartListener]);

        let (s5, _) = s4.on_trigger(Trigger::StreamUp);
        assert_eq!(s5, StreamConnected);
    }
}
