//! Filesystem artifact store.
//!
//! Layout:
//!
//! ```text
//! <root>/artifacts/<name>/v<N>/<file>
//! <root>/artifacts/<name>/v<N>/manifest.json
//! ```
//!
//! A version only counts once its `manifest.json` exists, so an interrupted
//! publish never shows up as the latest version.

use super::digest::sha256_file;
use super::{
    ArtifactId, ArtifactManifest, ArtifactRef, ArtifactStore, VersionSelector, validate_name,
};
use crate::error::{CleaningError, Result, ResultExt as _};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

/// Artifact store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_path: PathBuf,
}

impl LocalArtifactStore {
    /// # Errors
    ///
    /// Returns an error if the artifacts directory cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(base_path.join("artifacts"))
            .context("Failed to create artifact store directory")?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.base_path.join("artifacts").join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{version}"))
    }

    fn manifest_path(&self, name: &str, version: u32) -> PathBuf {
        self.version_dir(name, version).join(MANIFEST_FILE)
    }

    /// Published versions of `name`, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact directory cannot be read.
    pub fn list_versions(&self, name: &str) -> Result<Vec<u32>> {
        let dir = self.artifact_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir).context("Failed to read artifact directory")? {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(version) = file_name
                .to_str()
                .and_then(|s| s.strip_prefix('v'))
                .and_then(|n| n.parse::<u32>().ok())
                && entry.path().join(MANIFEST_FILE).is_file()
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn resolve(&self, identifier: &str) -> Result<ArtifactManifest> {
        let artifact: ArtifactRef = identifier.parse()?;
        let versions = self.list_versions(&artifact.name)?;

        let version = match artifact.version {
            VersionSelector::Latest => versions.last().copied(),
            VersionSelector::Exact(v) => versions.contains(&v).then_some(v),
        }
        .ok_or_else(|| CleaningError::ArtifactNotFound(identifier.to_owned()))?;

        let json = fs::read_to_string(self.manifest_path(&artifact.name, version))
            .with_context(|| format!("Failed to read manifest for {identifier}"))?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn fetch(&self, identifier: &str) -> Result<PathBuf> {
        let manifest = self.resolve(identifier)?;
        let path = self
            .version_dir(&manifest.name, manifest.version)
            .join(&manifest.file_name);
        if !path.is_file() {
            return Err(CleaningError::Store(format!(
                "{} is missing its file {}",
                manifest.id(),
                path.display()
            )));
        }
        Ok(path)
    }

    fn manifest(&self, identifier: &str) -> Result<ArtifactManifest> {
        self.resolve(identifier)
    }

    fn publish(
        &self,
        name: &str,
        artifact_type: &str,
        description: &str,
        local_path: &Path,
    ) -> Result<ArtifactId> {
        validate_name(name)?;
        if !local_path.is_file() {
            return Err(CleaningError::Store(format!(
                "cannot publish {}: not a file",
                local_path.display()
            )));
        }
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CleaningError::Store(format!("invalid file name: {}", local_path.display()))
            })?
            .to_owned();
        if file_name == MANIFEST_FILE {
            return Err(CleaningError::Store(format!(
                "cannot publish a file named {MANIFEST_FILE}"
            )));
        }

        let version = self.list_versions(name)?.last().map_or(0, |v| v + 1);
        let dir = self.version_dir(name, version);
        fs::create_dir_all(&dir).context("Failed to create artifact version directory")?;

        let dest = dir.join(&file_name);
        fs::copy(local_path, &dest)
            .with_context(|| format!("Failed to copy {} into the store", local_path.display()))?;

        let manifest = ArtifactManifest {
            name: name.to_owned(),
            version,
            artifact_type: artifact_type.to_owned(),
            description: description.to_owned(),
            file_name,
            digest: sha256_file(&dest)?,
            size_bytes: fs::metadata(&dest)?.len(),
            created_at: Utc::now(),
        };
        fs::write(
            self.manifest_path(name, version),
            serde_json::to_string_pretty(&manifest)?,
        )
        .context("Failed to write artifact manifest")?;

        let id = manifest.id();
        tracing::info!(artifact = %id, digest = %manifest.digest, "Published artifact");
        Ok(id)
    }
}
