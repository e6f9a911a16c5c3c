//! War Room dashboard core
//!
//! Live conflict map state, feed synchronization and scene rendering. Every
//! component is an Actor driven by relays on one Tokio event loop; the
//! [`dashboard::Dashboard`] composition root wires them together.

// Core modules
pub mod animation_clock;
pub mod connection;
pub mod dashboard;
pub mod dataflow;
pub mod geo;
pub mod registry;
pub mod visualizer;

pub use dashboard::Dashboard;
