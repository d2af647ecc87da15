//! Cutover - guided, resumable checklist for a DNS provider migration
//!
//! The library holds the step catalog, the progress engine and its
//! persistence, plus the catalog HTTP server. The `cutover` binary is a thin
//! CLI over these modules.

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod render;
pub mod rest;
pub mod store;

pub use catalog::{Checkpoint, Step, StepCatalog};
pub use error::ProgressError;
pub use progress::{ProgressEngine, ProgressFraction, ProgressState, StepStatus};
pub use store::{JsonFileStore, MemoryStore, ProgressStore};
