//! Artifact storage.
//!
//! Artifacts are single files addressed by name and version. Publishing the
//! same name again creates the next version (`v0`, `v1`, ...); fetching
//! accepts `name`, `name:latest` or `name:vN`.

pub mod digest;
pub mod local;

pub use local::LocalArtifactStore;

use crate::error::{CleaningError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which version of an artifact to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Exact(u32),
}

/// A parsed artifact identifier (`name`, `name:latest`, `name:vN`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: VersionSelector,
}

impl FromStr for ArtifactRef {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = match s.rsplit_once(':') {
            Some((name, "latest")) => (name, VersionSelector::Latest),
            Some((name, tag)) => {
                let number = tag
                    .strip_prefix('v')
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(|| {
                        CleaningError::Store(format!("invalid artifact version '{tag}' in '{s}'"))
                    })?;
                (name, VersionSelector::Exact(number))
            }
            None => (s, VersionSelector::Latest),
        };
        validate_name(name)?;
        Ok(Self {
            name: name.to_owned(),
            version,
        })
    }
}

/// A concrete, published artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactId {
    pub name: String,
    pub version: u32,
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}

/// Metadata stored alongside each artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
    pub file_name: String,
    /// SHA-256 of the file, lowercase hex.
    pub digest: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactManifest {
    pub fn id(&self) -> ArtifactId {
        ArtifactId {
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// Name+version addressable file storage.
pub trait ArtifactStore {
    /// Resolve `identifier` and return the local path of its file.
    fn fetch(&self, identifier: &str) -> Result<PathBuf>;

    /// Resolve `identifier` and return its manifest.
    fn manifest(&self, identifier: &str) -> Result<ArtifactManifest>;

    /// Store a copy of `local_path` as the next version of `name`.
    fn publish(
        &self,
        name: &str,
        artifact_type: &str,
        description: &str,
        local_path: &Path,
    ) -> Result<ArtifactId>;
}

/// Names become directory names, so keep them to a safe character set.
///
/// # Errors
///
/// Returns [`CleaningError::Store`] for empty names, names starting with
/// `.`, or characters outside `[A-Za-z0-9._-]`.
pub fn validate_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if name.is_empty() || name.starts_with('.') || !valid_chars {
        return Err(CleaningError::Store(format!(
            "invalid artifact name '{name}'"
        )));
    }
    Ok(())
}
