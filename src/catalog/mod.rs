//! Step catalog: the immutable, ordered list of migration steps.
//!
//! The catalog is fetched once from a [`CatalogSource`], validated as a whole
//! and frozen into a [`StepCatalog`]. Nothing in this module tracks completion;
//! that lives in [`crate::progress`].

pub mod builtin;
pub mod loader;
pub mod source;

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use builtin::DocumentationIndex;
pub use loader::load;
pub use source::{source_from_config, BuiltinSource, CatalogSource, FileSource, HttpSource};

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid id pattern"));

/// A single acknowledgeable item within a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Identifier, unique within the owning step
    pub id: String,
    /// Human-readable description
    pub label: String,
    /// Optional checkpoints never gate advancement
    #[serde(default)]
    pub optional: bool,
}

/// An ordered unit of work in the migration guide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Identifier, unique within the catalog; used as the durable progress key
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    /// Reference links shown alongside the step
    #[serde(default)]
    pub documentation: Vec<String>,
    /// Screenshot paths for the visual guide
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Deep link into the provider dashboard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_link: Option<String>,
    /// Warning banner displayed before the checkpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Shell snippet displayed with the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<String>,
}

impl Step {
    /// A step is exempt from progress accounting when all of its content is optional.
    ///
    /// A step with no checkpoints is not exempt: it is trivially satisfied but
    /// still counted.
    pub fn is_progress_exempt(&self) -> bool {
        !self.checkpoints.is_empty() && self.checkpoints.iter().all(|c| c.optional)
    }

    /// Checkpoints that gate advancement
    pub fn required_checkpoints(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter().filter(|c| !c.optional)
    }

    pub fn checkpoint(&self, checkpoint_id: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.id == checkpoint_id)
    }
}

/// Wire format of a catalog, as served at `/api/steps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub steps: Vec<Step>,
}

impl CatalogDocument {
    /// Parse a catalog document from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// JSON Schema describing the catalog format
    pub fn json_schema() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(CatalogDocument);
        serde_json::to_string_pretty(&schema)
    }

    /// Check the document for structural problems, collecting all of them
    pub fn validate(&self) -> Result<(), Vec<CatalogIssue>> {
        let mut issues = Vec::new();

        if self.steps.is_empty() {
            issues.push(CatalogIssue::NoSteps);
        }

        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if !ID_PATTERN.is_match(&step.id) {
                issues.push(CatalogIssue::InvalidStepId(step.id.clone()));
            }
            if !step_ids.insert(step.id.as_str()) {
                issues.push(CatalogIssue::DuplicateStepId(step.id.clone()));
            }
            if step.title.trim().is_empty() {
                issues.push(CatalogIssue::MissingTitle(step.id.clone()));
            }

            let mut checkpoint_ids = HashSet::new();
            for checkpoint in &step.checkpoints {
                if !ID_PATTERN.is_match(&checkpoint.id) {
                    issues.push(CatalogIssue::InvalidCheckpointId {
                        step_id: step.id.clone(),
                        checkpoint_id: checkpoint.id.clone(),
                    });
                }
                if !checkpoint_ids.insert(checkpoint.id.as_str()) {
                    issues.push(CatalogIssue::DuplicateCheckpointId {
                        step_id: step.id.clone(),
                        checkpoint_id: checkpoint.id.clone(),
                    });
                }
                if checkpoint.label.trim().is_empty() {
                    issues.push(CatalogIssue::MissingLabel {
                        step_id: step.id.clone(),
                        checkpoint_id: checkpoint.id.clone(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// A structural problem found while validating a catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogIssue {
    #[error("catalog must contain at least one step")]
    NoSteps,

    #[error("step id '{0}' is not a valid identifier")]
    InvalidStepId(String),

    #[error("step id '{0}' appears more than once")]
    DuplicateStepId(String),

    #[error("step '{0}' has no title")]
    MissingTitle(String),

    #[error("checkpoint id '{checkpoint_id}' in step '{step_id}' is not a valid identifier")]
    InvalidCheckpointId {
        step_id: String,
        checkpoint_id: String,
    },

    #[error("checkpoint id '{checkpoint_id}' appears more than once in step '{step_id}'")]
    DuplicateCheckpointId {
        step_id: String,
        checkpoint_id: String,
    },

    #[error("checkpoint '{checkpoint_id}' in step '{step_id}' has no label")]
    MissingLabel {
        step_id: String,
        checkpoint_id: String,
    },
}

/// Validated, frozen catalog of steps.
///
/// Steps are only reachable through shared references, so ids, ordering and
/// `optional` flags cannot change after construction.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<Step>,
    exempt: Vec<bool>,
    digest: String,
}

impl StepCatalog {
    /// Validate a document and freeze it
    pub fn from_document(document: CatalogDocument) -> Result<Self, Vec<CatalogIssue>> {
        document.validate()?;

        let exempt = document
            .steps
            .iter()
            .map(Step::is_progress_exempt)
            .collect();
        let digest = compute_digest(&document.steps);

        Ok(Self {
            steps: document.steps,
            exempt,
            digest,
        })
    }

    /// Number of steps; also the terminal "finished" index
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn contains_checkpoint(&self, step_id: &str, checkpoint_id: &str) -> bool {
        self.step(step_id)
            .and_then(|s| s.checkpoint(checkpoint_id))
            .is_some()
    }

    /// Whether the step at `index` is excluded from progress accounting
    pub fn is_progress_exempt(&self, index: usize) -> bool {
        self.exempt.get(index).copied().unwrap_or(false)
    }

    /// SHA-256 over step ids, checkpoint ids and optional flags
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Rebuild the wire document (used for serving and export)
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            steps: self.steps.clone(),
        }
    }
}

fn compute_digest(steps: &[Step]) -> String {
    let mut hasher = Sha256::new();
    for step in steps {
        hasher.update(step.id.as_bytes());
        hasher.update([0x1e]);
        for checkpoint in &step.checkpoints {
            hasher.update(checkpoint.id.as_bytes());
            hasher.update(if checkpoint.optional { b"?" } else { b"!" });
            hasher.update([0x1f]);
        }
        hasher.update([0x1d]);
    }
    format!("{:x}", hasher.finalize())
}
