//! SSE listener for the relay's spin-events stream
//!
//! A cancellable task owning the stream read loop. It is pure transport: it
//! reports stream health and new-spin events as [`Trigger`] messages and
//! never decides the polling fallback itself, which belongs to the
//! supervisor. Reconnection with exponential backoff is handled here, with
//! a bounded attempt count so a dead relay does not starve the fallback.

use crate::supervisor::Trigger;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest_eventsource::{Event, EventSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Event payload the relay sends when a new spin was logged
///
/// Anything else on the stream (keep-alives, comments) is ignored.
pub const NEW_SPIN_EVENT_DATA: &str = "new spin data";

/// Default bound on consecutive reconnect attempts
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default backoff base delay
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Default backoff cap
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Listener reconnect policy
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Consecutive failed attempts tolerated before giving up
    pub max_reconnect_attempts: u32,
    /// Base delay, doubled per failed attempt
    pub backoff_base: Duration,
    /// Upper bound on the computed delay
    pub backoff_max: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        }
    }
}

impl ListenerConfig {
    /// Delay before reconnect attempt `attempt` (0-based): base * 2^attempt,
    /// capped at `backoff_max`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

/// Whether an SSE message announces a new spin
pub fn is_new_spin_event(data: &str) -> bool {
    data.trim() == NEW_SPIN_EVENT_DATA
}

/// Run the SSE read loop until cancelled or reconnects are exhausted
///
/// Emits on `triggers`:
/// - [`Trigger::StreamUp`] when the stream (re)connects,
/// - [`Trigger::SpinEvent`] per new-spin message,
/// - [`Trigger::StreamDown`] when an established stream drops,
/// - [`Trigger::RetriesExhausted`] once the attempt bound is exceeded,
///   after which the task ends.
pub async fn run(
    client: reqwest::Client,
    sse_url: Url,
    config: ListenerConfig,
    triggers: mpsc::Sender<Trigger>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let request = client
            .get(sse_url.clone())
            .header(ACCEPT, "text/event-stream");

        let mut stream = match EventSource::new(request) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to create SSE request");
                let _ = triggers.send(Trigger::RetriesExhausted).await;
                return;
            }
        };

        let mut was_connected = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("SSE listener cancelled");
                    stream.close();
                    return;
                }
                event = stream.next() => match event {
                    Some(Ok(Event::Open)) => {
                        info!(url = %sse_url, "SSE stream connected");
                        attempt = 0;
                        was_connected = true;
                        if triggers.send(Trigger::StreamUp).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Event::Message(msg))) => {
                        if is_new_spin_event(&msg.data) {
                            debug!("Received SSE: new spin data");
                            if triggers.send(Trigger::SpinEvent).await.is_err() {
                                return;
                            }
                        } else {
                            debug!(data = %msg.data, "Ignoring non-spin SSE message");
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "SSE stream dropped or failed");
                        stream.close();
                        break;
                    }
                    None => {
                        warn!("SSE stream ended");
                        break;
                    }
                }
            }
        }

        if was_connected && triggers.send(Trigger::StreamDown).await.is_err() {
            return;
        }

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            warn!(
                attempts = config.max_reconnect_attempts,
                "SSE reconnect attempts exhausted"
            );
            let _ = triggers.send(Trigger::RetriesExhausted).await;
            return;
        }

        let delay = config.backoff_delay(attempt - 1);
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Waiting before SSE reconnect"
        );
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
