//! Advancement state machine and progress accounting.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::state::{ProgressState, StepStatus};
use crate::catalog::{self, CatalogSource, Step, StepCatalog};
use crate::error::ProgressError;
use crate::store::{ProgressStore, StoreError};

/// Completed versus counted steps; exempt steps appear in neither
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressFraction {
    pub completed: usize,
    pub total: usize,
}

impl ProgressFraction {
    /// Completion ratio in `0.0..=1.0`; 0 when nothing is counted
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Whole percentage, rounded half up
    pub fn percentage(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.completed * 200 + self.total) / (self.total * 2)
        }
    }
}

/// Owns the progress snapshot for one catalog and writes it through to a store.
///
/// Every mutating call either persists and commits its change or returns an
/// error with the in-memory state untouched.
pub struct ProgressEngine<S: ProgressStore> {
    catalog: Arc<StepCatalog>,
    store: S,
    state: ProgressState,
}

impl<S: ProgressStore> ProgressEngine<S> {
    /// Restore progress for an already loaded catalog
    pub fn new(catalog: Arc<StepCatalog>, store: S) -> Result<Self, ProgressError> {
        let bytes = store.load()?;
        let state = ProgressState::restore(bytes.as_deref(), &catalog);
        debug!(
            current_step = state.current_step,
            steps = catalog.len(),
            "progress engine ready"
        );
        Ok(Self {
            catalog,
            store,
            state,
        })
    }

    /// Load the catalog from `source`, then restore progress from `store`
    pub async fn open(source: &dyn CatalogSource, store: S) -> Result<Self, ProgressError> {
        let catalog = catalog::load(source).await?;
        Self::new(Arc::new(catalog), store)
    }

    // -- transitions --

    /// Jump to any index in `0..=step_count`, ignoring completion
    pub fn go_to(&mut self, index: usize) -> Result<(), ProgressError> {
        let step_count = self.step_count();
        if index > step_count {
            return Err(ProgressError::IndexOutOfRange { index, step_count });
        }
        if index == self.state.current_step {
            return Ok(());
        }

        let mut next = self.state.clone();
        next.current_step = index;
        self.commit(next)?;
        info!(step = index, "moved to step");
        Ok(())
    }

    /// Move forward one step if the current step is satisfied.
    ///
    /// Returns whether the cursor moved. Blocked and terminal calls are no-ops.
    pub fn advance(&mut self) -> Result<bool, ProgressError> {
        if !self.can_advance() {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.current_step += 1;
        self.commit(next)?;
        info!(step = self.state.current_step, "advanced");
        Ok(true)
    }

    /// Move back one step; returns false at index 0
    pub fn retreat(&mut self) -> Result<bool, ProgressError> {
        if self.state.current_step == 0 {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.current_step -= 1;
        self.commit(next)?;
        info!(step = self.state.current_step, "went back");
        Ok(true)
    }

    /// Flip a checkpoint's completion flag, returning its new value
    pub fn toggle_checkpoint(
        &mut self,
        step_id: &str,
        checkpoint_id: &str,
    ) -> Result<bool, ProgressError> {
        if !self.catalog.contains_checkpoint(step_id, checkpoint_id) {
            return Err(ProgressError::UnknownCheckpoint {
                step_id: step_id.to_string(),
                checkpoint_id: checkpoint_id.to_string(),
            });
        }

        let mut next = self.state.clone();
        let completed = next.toggle(step_id, checkpoint_id);
        self.commit(next)?;
        debug!(step_id, checkpoint_id, completed, "checkpoint toggled");
        Ok(completed)
    }

    /// Clear all completion, return to step 0 and erase the persisted copy
    pub fn reset(&mut self) -> Result<(), ProgressError> {
        self.store.clear()?;
        self.state = ProgressState::default();
        info!("progress reset");
        Ok(())
    }

    fn commit(&mut self, mut next: ProgressState) -> Result<(), ProgressError> {
        let now = Utc::now();
        next.started_at.get_or_insert(now);
        if next.current_step == self.step_count() {
            next.completed_at.get_or_insert(now);
        } else {
            next.completed_at = None;
        }
        next.catalog_digest = Some(self.catalog.digest().to_string());

        let bytes = next.to_bytes().map_err(StoreError::from)?;
        self.store.save(&bytes)?;
        self.state = next;
        Ok(())
    }

    // -- queries --

    /// True iff every required checkpoint of the step at `index` is completed.
    /// False for the terminal index and anything beyond.
    pub fn is_step_satisfied(&self, index: usize) -> bool {
        self.catalog.get(index).is_some_and(|step| {
            step.required_checkpoints()
                .all(|c| self.state.is_completed(&step.id, &c.id))
        })
    }

    pub fn can_advance(&self) -> bool {
        self.is_step_satisfied(self.state.current_step)
    }

    /// Same predicate as [`Self::is_step_satisfied`], for marking past steps
    pub fn is_step_completed(&self, index: usize) -> bool {
        self.is_step_satisfied(index)
    }

    pub fn progress_fraction(&self) -> ProgressFraction {
        let (completed, total) = (0..self.step_count())
            .filter(|&i| !self.catalog.is_progress_exempt(i))
            .fold((0, 0), |(completed, total), i| {
                (completed + usize::from(self.is_step_completed(i)), total + 1)
            });
        ProgressFraction { completed, total }
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    /// The step under the cursor, `None` when finished
    pub fn current(&self) -> Option<&Step> {
        self.catalog.get(self.state.current_step)
    }

    pub fn step_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.current_step == self.step_count()
    }

    /// The cursor's step is always `InProgress`, even once it is satisfied
    pub fn step_status(&self, index: usize) -> StepStatus {
        if index == self.state.current_step {
            StepStatus::InProgress
        } else if self.is_step_completed(index) {
            StepStatus::Completed
        } else if index < self.state.current_step {
            StepStatus::Skipped
        } else {
            StepStatus::Pending
        }
    }

    /// `(done, required)` counts of required checkpoints for the step
    pub fn required_tally(&self, index: usize) -> (usize, usize) {
        let Some(step) = self.catalog.get(index) else {
            return (0, 0);
        };
        step.required_checkpoints()
            .fold((0, 0), |(done, required), c| {
                let checked = self.state.is_completed(&step.id, &c.id);
                (done + usize::from(checked), required + 1)
            })
    }

    pub fn is_checkpoint_completed(&self, step_id: &str, checkpoint_id: &str) -> bool {
        self.state.is_completed(step_id, checkpoint_id)
    }

    pub fn has_completed_checkpoints(&self) -> bool {
        self.state.has_completed_checkpoints()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
