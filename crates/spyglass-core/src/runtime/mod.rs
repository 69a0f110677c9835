//! Tracker initialization and lifecycle management.
//!
//! This module provides a unified initialization API for all tracker
//! components, suitable for embedding in wallets, payment processors, and
//! other applications that need consensus tip tracking, transaction safety
//! monitoring, and redundant broadcast without running their own node. It
//! manages component lifecycles, background tasks, and graceful shutdown
//! coordination.
//!
//! # Examples
//!
//! ```no_run
//! use spyglass_core::{config::AppConfig, runtime::Tracker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!
//!     let tracker = Tracker::builder().with_config(config).build()?;
//!
//!     // Wire a new-block event source (e.g. a ZMQ bridge) to the
//!     // notifier; without one the tracker refreshes on its timer only.
//!     let notifier = tracker.notifier();
//!
//!     let tip = tracker.current_tip()?;
//!     println!("tip: {} at height {}", tip.hash, tip.height);
//!
//!     tracker.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod lifecycle;

pub use builder::{RuntimeError, TrackerBuilder};
pub use lifecycle::Tracker;
