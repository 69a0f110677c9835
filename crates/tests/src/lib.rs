//! Integration Tests for the Spyglass Chain Tracker
//!
//! This crate contains various test modules:
//!
//! - `consensus_tests`: Tip aggregation across disagreeing, failing, and
//!   slow nodes, including the aggregator-to-cache pipeline
//! - `scheduler_tests`: Timer-driven refresh, notification burst
//!   coalescing, and degraded timer-only operation
//! - `safety_tests`: End-to-end transaction safety monitoring against
//!   scripted untrusted nodes
//! - `broadcast_tests`: Shotgun broadcast across mixed-health endpoints
//!   with retry budgets and attempt histories
//! - `runtime_tests`: Builder wiring and the tracker facade
//! - `mock_infrastructure`: Reusable mock types for testing
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! All tests run against in-process mock nodes; none require a network
//! connection or a running node.

#[cfg(test)]
mod broadcast_tests;

#[cfg(test)]
mod consensus_tests;

#[cfg(test)]
mod runtime_tests;


#[cfg(test)]
mod scheduler_tests;
