//! Background reconciliation loops for the SparkPilot control plane.
//!
//! Each loop selects a batch of non-terminal rows from the store, processes
//! the items one by one (an item failure marks that entity failed, audits it
//! and moves on) and is safe to re-run: terminal rows are never re-selected
//! and usage is unique per run.

pub mod provisioner;
pub mod reconciler;
pub mod scheduler;
pub mod usage;
