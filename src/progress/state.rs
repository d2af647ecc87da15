//! The persisted progress snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::StepCatalog;

/// Mutable runtime state: cursor position plus completed checkpoints.
///
/// Only positive facts are stored. Keys are stable step/checkpoint ids, and
/// ordered collections keep the encoding deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    /// Cursor in `0..=step_count`; `step_count` is the finished pseudo-step
    #[serde(default)]
    pub current_step: usize,
    /// step id -> completed checkpoint ids
    #[serde(default)]
    pub checkpoints: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Digest of the catalog this snapshot was last written against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_digest: Option<String>,
}

impl ProgressState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Rebuild state from persisted bytes, reconciled against `catalog`.
    ///
    /// Missing or undecodable bytes yield a fresh state. Ids the catalog no
    /// longer knows are dropped and the cursor is clamped to the terminal index.
    /// `completed_at` is set exactly when the restored cursor is terminal.
    pub fn restore(bytes: Option<&[u8]>, catalog: &StepCatalog) -> Self {
        let Some(bytes) = bytes else {
            debug!("no saved progress, starting fresh");
            return Self::default();
        };

        let mut state = match Self::from_bytes(bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "saved progress is unreadable, starting fresh");
                return Self::default();
            }
        };

        if let Some(digest) = state.catalog_digest.as_deref() {
            if digest != catalog.digest() {
                info!("step catalog changed since progress was saved");
            }
        }

        let dropped = state.retain_known(catalog);
        if dropped > 0 {
            debug!(dropped, "dropped saved checkpoints unknown to the catalog");
        }

        if state.current_step > catalog.len() {
            debug!(
                saved = state.current_step,
                clamped = catalog.len(),
                "saved step index beyond catalog, clamping"
            );
            state.current_step = catalog.len();
        }

        // completedAt is only meaningful at the terminal index
        if state.current_step < catalog.len() {
            state.completed_at = None;
        } else if state.completed_at.is_none() {
            state.completed_at = Some(Utc::now());
        }

        state
    }

    /// Remove completion entries the catalog does not contain; returns how many
    fn retain_known(&mut self, catalog: &StepCatalog) -> usize {
        let mut dropped = 0;
        self.checkpoints.retain(|step_id, done| {
            let before = done.len();
            done.retain(|checkpoint_id| catalog.contains_checkpoint(step_id, checkpoint_id));
            dropped += before - done.len();
            !done.is_empty()
        });
        dropped
    }

    pub fn is_completed(&self, step_id: &str, checkpoint_id: &str) -> bool {
        self.checkpoints
            .get(step_id)
            .is_some_and(|done| done.contains(checkpoint_id))
    }

    /// Flip one checkpoint, returning its new value
    pub fn toggle(&mut self, step_id: &str, checkpoint_id: &str) -> bool {
        let done = self.checkpoints.entry(step_id.to_string()).or_default();
        let now_completed = if done.remove(checkpoint_id) {
            false
        } else {
            done.insert(checkpoint_id.to_string());
            true
        };
        if done.is_empty() {
            self.checkpoints.remove(step_id);
        }
        now_completed
    }

    pub fn has_completed_checkpoints(&self) -> bool {
        self.checkpoints.values().any(|done| !done.is_empty())
    }
}

/// Display status of a step relative to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    /// Behind the cursor but with required checkpoints still open
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::three_step_catalog;

    #[test]
    fn test_toggle_twice_restores() {
        let mut state = ProgressState::default();
        assert!(state.toggle("step0", "a"));
        assert!(state.is_completed("step0", "a"));
        assert!(!state.toggle("step0", "a"));
        assert!(!state.is_completed("step0", "a"));
        assert!(state.checkpoints.is_empty());
    }

    #[test]
    fn test_restore_none_is_default() {
        let catalog = three_step_catalog();
        assert_eq!(
            ProgressState::restore(None, &catalog),
            ProgressState::default()
        );
    }

    #[test]
    fn test_restore_corrupt_is_default() {
        let catalog = three_step_catalog();
        let state = ProgressState::restore(Some(b"{not json"), &catalog);
        assert_eq!(state, ProgressState::default());
    }

    #[test]
    fn test_restore_drops_unknown_ids_and_clamps() {
        let catalog = three_step_catalog();
        let json = r#"{"currentStep":9,"checkpoints":{
            "step0":["a","gone"],"removed-step":["x"],"step2":["zzz"]}}"#;
        let state = ProgressState::restore(Some(json.as_bytes()), &catalog);

        assert_eq!(state.current_step, 3);
        assert!(state.is_completed("step0", "a"));
        assert!(!state.is_completed("step0", "gone"));
        assert!(!state.checkpoints.contains_key("removed-step"));
        assert!(!state.checkpoints.contains_key("step2"));
    }

    #[test]
    fn test_restore_clears_completion_when_catalog_grows() {
        // Finished against a two-step guide, reopened against three steps
        let catalog = three_step_catalog();
        let json = r#"{"currentStep":2,"completedAt":"2026-01-02T03:04:05Z"}"#;
        let state = ProgressState::restore(Some(json.as_bytes()), &catalog);

        assert_eq!(state.current_step, 2);
        assert!(state.completed_at.is_none());
    }

    #[test]
    fn test_restore_marks_completion_when_clamped_to_end() {
        let catalog = three_step_catalog();
        let state = ProgressState::restore(Some(br#"{"currentStep":9}"#), &catalog);
        assert_eq!(state.current_step, 3);
        assert!(state.completed_at.is_some());

        // An existing completion time at the terminal index is kept
        let json = r#"{"currentStep":3,"completedAt":"2026-01-02T03:04:05Z"}"#;
        let state = ProgressState::restore(Some(json.as_bytes()), &catalog);
        assert_eq!(
            state.completed_at.unwrap().to_rfc3339(),
            "2026-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn test_restore_tolerates_missing_fields() {
        let catalog = three_step_catalog();
        let state = ProgressState::restore(Some(b"{}"), &catalog);
        assert_eq!(state, ProgressState::default());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut state = ProgressState::default();
        state.toggle("step2", "c");
        state.toggle("step0", "a");
        let bytes = state.to_bytes().unwrap();

        let reloaded = ProgressState::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.to_bytes().unwrap(), bytes);

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.find("step0").unwrap() < text.find("step2").unwrap());
        assert!(text.contains("currentStep"));
    }

    #[test]
    fn test_step_status_display() {
        assert_eq!(StepStatus::InProgress.to_string(), "in-progress");
        assert_eq!(
            serde_json::to_string(&StepStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }
}
