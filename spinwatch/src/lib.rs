//! Watchdog relaying new Spinitron spins to RabbitMQ
//!
//! The service listens to the station API relay's SSE stream and, for each
//! "new spin" event, fetches the latest spin and publishes it to a RabbitMQ
//! topic exchange for downstream consumers (RDS encoder, now-playing pages).
//!
//! Its defining concern is availability under partial failure: the SSE
//! stream, the relay's REST endpoint, and the Spinitron API can each degrade
//! independently. The [`supervisor`] state machine keeps delivery flowing —
//! SSE while the stream is healthy, bounded reconnects with backoff when it
//! drops, timed polling when reconnects are exhausted, and probe-driven
//! recovery back to the stream. Orthogonally, every individual fetch falls
//! back from the relay to the Spinitron API (see [`spinclient`]).
//!
//! Delivery intent is at-least-once: the [`dedup`] guard suppresses
//! duplicate observations within the process, and consumers are expected to
//! be idempotent on spin identifier across restarts.

pub mod config;
pub mod dedup;
pub mod listener;
pub mod pipeline;
pub mod publisher;
pub mod scheduler;
pub mod supervisor;

pub use config::{Config, ConfigError};
pub use dedup::DedupGuard;
pub use publisher::{PublishError, PublisherConfig, SpinPublisher};
pub use supervisor::{Action, ConnectionState, Supervisor, Trigger};
