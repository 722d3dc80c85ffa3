//! Fetch → dedup → publish pipeline
//!
//! Invoked per trigger (SSE event or poll tick). Fetch failures are absorbed
//! here: the next trigger retries naturally, and a failed fetch never feeds
//! back into the connection state machine, regardless of which trigger kind
//! started it.

use crate::dedup::DedupGuard;
use crate::publisher::SpinPublisher;
use spinclient::SpinClient;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Which trigger path started a pipeline run, for log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// SSE new-spin event
    Sse,
    /// Poll timer tick
    Poll,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sse => write!(f, "sse"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// Run the pipeline once
///
/// Safe for concurrent invocation; the dedup guard's atomic check-and-set
/// guarantees at most one publish per spin identifier even when an SSE
/// event and a stale poll tick race.
pub async fn run_once(
    client: Arc<SpinClient>,
    dedup: Arc<DedupGuard>,
    publisher: Arc<SpinPublisher>,
    kind: TriggerKind,
) {
    let fetched = match client.fetch_latest_spin().await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(trigger = %kind, error = %e, "Spin fetch failed on both sources");
            return;
        }
    };

    if !dedup.should_publish(fetched.spin.id) {
        debug!(
            spin_id = fetched.spin.id,
            trigger = %kind,
            "Spin already published, suppressing duplicate"
        );
        return;
    }

    if let Err(e) = publisher.publish(&fetched.spin, fetched.source).await {
        error!(
            spin_id = fetched.spin.id,
            trigger = %kind,
            source = %fetched.source,
            error = %e,
            "Failed to publish spin, dropping event"
        );
    }
}
