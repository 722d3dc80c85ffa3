//! Spin feed client library for the spinwatch relay
//!
//! This crate provides a Rust client for fetching "current spin" data from a
//! Spinitron-backed station, with a two-tier source fallback:
//!
//! - **Relay first**: the station's API relay mirrors the Spinitron feed and
//!   is tried on every fetch.
//! - **Spinitron fallback**: when the relay's REST endpoint is down, the
//!   Spinitron API itself is queried with a static API key.
//!
//! The crate also exposes a lightweight reachability probe for the relay's
//! SSE endpoint, used by the watchdog to detect stream recovery.
//!
//! # Example
//!
//! ```no_run
//! use spinclient::SpinClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SpinClient::builder()
//!         .primary_api_key("spinitron-key")
//!         .build()?;
//!
//!     let fetched = client.fetch_latest_spin().await?;
//!     println!(
//!         "Now spinning: {} - {} (spin {}, via {})",
//!         fetched.spin.artist, fetched.spin.song, fetched.spin.id, fetched.source
//!     );
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;

pub use client::{ClientBuilder, SpinClient};
pub use error::{Error, Result};
pub use models::{FetchedSpin, SpinRecord, SpinSource, SpinsEnvelope};
