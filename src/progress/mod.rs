//! Runtime progress through a [`crate::catalog::StepCatalog`].

pub mod engine;
pub mod state;

pub use engine::{ProgressEngine, ProgressFraction};
pub use state::{ProgressState, StepStatus};
