//! Logging infrastructure.
//!
//! Subscriber initialization lives here; the runtime-adjustable level cell
//! itself is a domain model ([`crate::domain::models::LevelHandle`]) so
//! handlers can mutate it without reaching into this layer.

pub mod logger;

pub use logger::Logger;
