//! Data models for spin feed responses
//!
//! Both the relay's REST endpoint and the Spinitron API return spins in the
//! same `{"items": [...]}` envelope, newest spin first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One logged spin, the atomic unit of event relay
///
/// Spin identifiers are assigned by the source and unique; they are only ever
/// compared for equality, never ordered. Fields the relay does not interpret
/// are carried through verbatim in `extra` so downstream consumers see the
/// full source record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpinRecord {
    /// Unique spin identifier
    pub id: u64,
    /// Artist name
    pub artist: String,
    /// Track title
    pub song: String,
    /// Release / album, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Source-observed start time of the spin
    pub start: DateTime<Utc>,
    /// Unmapped source fields, passed through opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which upstream served a fetch
///
/// Recorded for observability only; it never influences behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpinSource {
    /// The station's API relay (proxy)
    Proxy,
    /// The Spinitron API itself (fallback path)
    Primary,
}

impl std::fmt::Display for SpinSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proxy => write!(f, "proxy"),
            Self::Primary => write!(f, "primary"),
        }
    }
}

/// A successfully fetched spin together with the upstream that served it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSpin {
    /// The spin record
    pub spin: SpinRecord,
    /// Upstream that answered the fetch
    pub source: SpinSource,
}

/// Envelope wrapping spin lists in feed responses
#[derive(Debug, Clone, Deserialize)]
pub struct SpinsEnvelope {
    /// Spins, newest first
    #[serde(default)]
    pub items: Vec<SpinRecord>,
}

impl SpinsEnvelope {
    /// Take the most recent spin, if the feed has any
    pub fn into_latest(mut self) -> Option<SpinRecord> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.swap_remove(0))
        }
    }
}
