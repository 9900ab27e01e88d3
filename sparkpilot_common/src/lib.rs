//! Common types and utilities for the SparkPilot crates.

pub mod config;
pub mod entity;
pub mod error;
pub mod store;

// re-export the dependencies
pub use anyhow;
pub use async_trait;
pub use serde;
pub use serde_json;
pub use time;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;
pub use uuid;
