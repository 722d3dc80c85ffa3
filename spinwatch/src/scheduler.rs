//! Polling-mode timers
//!
//! Active only while the supervisor is in `Polling`. One task drives both
//! timers: the poll timer triggers a fetch every few seconds, and the
//! health-probe timer periodically checks whether the relay's SSE endpoint
//! is reachable again. Cancelling the task's token stops both timers
//! immediately, so no poll fires once the stream resumes.

use crate::supervisor::Trigger;
use spinclient::SpinClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default fetch interval while polling
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Default interval between SSE reachability probes
pub const DEFAULT_HEALTH_PROBE_INTERVAL_SECS: u64 = 30;

/// Timer intervals for polling mode
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between poll-triggered fetches
    pub poll_interval: Duration,
    /// Interval between SSE endpoint reachability probes
    pub probe_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            probe_interval: Duration::from_secs(DEFAULT_HEALTH_PROBE_INTERVAL_SECS),
        }
    }
}

/// Run both polling-mode timers until cancelled
///
/// The poll timer fires immediately on entry (the stream just died; fetch
/// right away), then at the configured interval. The probe timer waits one
/// full interval before its first check. Probes run in their own task, one
/// in flight at a time, so a slow probe never stalls the poll timer; a
/// successful probe sends [`Trigger::ProbeSucceeded`] and the supervisor
/// cancels the token on leaving polling mode.
pub async fn run(
    client: Arc<SpinClient>,
    config: SchedulerConfig,
    triggers: mpsc::Sender<Trigger>,
    cancel: CancellationToken,
) {
    let mut poll = time::interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut probe = time::interval_at(
        time::Instant::now() + config.probe_interval,
        config.probe_interval,
    );
    probe.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut probe_task: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Poll scheduler cancelled");
                if let Some(task) = probe_task.take() {
                    task.abort();
                }
                return;
            }
            _ = poll.tick() => {
                if triggers.send(Trigger::PollTick).await.is_err() {
                    return;
                }
            }
            _ = probe.tick() => {
                // One probe in flight at a time; later ticks are skipped
                // until it resolves
                if probe_task.as_ref().map_or(true, |task| task.is_finished()) {
                    probe_task = Some(tokio::spawn(probe_once(
                        Arc::clone(&client),
                        triggers.clone(),
                    )));
                }
            }
        }
    }
}

/// Check SSE reachability once and report recovery
async fn probe_once(client: Arc<SpinClient>, triggers: mpsc::Sender<Trigger>) {
    match client.probe_sse_endpoint().await {
        Ok(()) => {
            info!("SSE endpoint reachable again");
            let _ = triggers.send(Trigger::ProbeSucceeded).await;
        }
        Err(e) => {
            debug!(error = %e, "SSE endpoint still unreachable");
        }
    }
}
