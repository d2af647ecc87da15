//! Where the step catalog comes from.
//!
//! Every source is fetched exactly once per process by [`super::load`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use super::{builtin, CatalogDocument};
use crate::config::{CatalogConfig, CatalogSourceKind};

/// Provider of catalog definitions.
///
/// Contract: idempotent, side-effect free, returns the whole catalog in one
/// response.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable origin, used in logs and error messages
    fn describe(&self) -> String;

    /// Fetch the complete catalog document
    async fn fetch(&self) -> Result<CatalogDocument>;
}

/// Catalog compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSource;

#[async_trait]
impl CatalogSource for BuiltinSource {
    fn describe(&self) -> String {
        "builtin catalog".to_string()
    }

    async fn fetch(&self) -> Result<CatalogDocument> {
        builtin::document().context("Failed to parse builtin catalog")
    }
}

/// Catalog read from a JSON file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn fetch(&self) -> Result<CatalogDocument> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read catalog file {}", self.path.display()))?;
        CatalogDocument::from_json(&contents)
            .with_context(|| format!("Failed to parse catalog file {}", self.path.display()))
    }
}

/// Catalog served over HTTP at `{base_url}/api/steps`
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cutover/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn steps_url(&self) -> String {
        format!("{}/api/steps", self.base_url)
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    fn describe(&self) -> String {
        self.steps_url()
    }

    async fn fetch(&self) -> Result<CatalogDocument> {
        let url = self.steps_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} returned HTTP {status}");
        }

        response
            .json::<CatalogDocument>()
            .await
            .with_context(|| format!("Malformed catalog returned by {url}"))
    }
}

/// Build the configured catalog source
pub fn source_from_config(config: &CatalogConfig) -> Result<Box<dyn CatalogSource>> {
    match config.source {
        CatalogSourceKind::Builtin => Ok(Box::new(BuiltinSource)),
        CatalogSourceKind::File => {
            let Some(path) = config.path.as_deref() else {
                bail!("catalog.source = \"file\" requires catalog.path");
            };
            Ok(Box::new(FileSource::new(path)))
        }
        CatalogSourceKind::Http => {
            let Some(url) = config.url.as_deref() else {
                bail!("catalog.source = \"http\" requires catalog.url");
            };
            let timeout = Duration::from_secs(config.timeout_secs);
            Ok(Box::new(HttpSource::new(url, timeout)?))
        }
    }
}
