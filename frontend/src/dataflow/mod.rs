//! Core dataflow primitives for reactive state management
//!
//! The Actor+Relay architecture, independent of map or feed logic:
//!
//! - **[`Relay`]** - type-safe event streaming over unbounded channels
//! - **[`Actor`]** - single-value state container driven by one task
//!
//! # Architecture Principles
//!
//! 1. **Single owner** - each piece of mutable state belongs to one Actor
//! 2. **Event-Source Naming** - relays follow `{source}_{event}_relay`
//! 3. **Scoped tasks** - dropping an Actor aborts its task and everything it owns

pub mod actor;
pub mod relay;

pub use actor::Actor;
pub use relay::{Relay, RelayError, relay};
