use crate::annotate::AnnotatedArtifact;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Scheme and host the caller used to reach the service.
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }
}

/// Append-only directory of annotated images.
///
/// Files are never overwritten or removed; uniqueness comes from the random
/// file name, so concurrent writers need no locking.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    url_path: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, url_path: &str) -> Result<Self, ArtifactError> {
        let store = Self {
            dir: dir.into(),
            url_path: url_path.trim_end_matches('/').to_string(),
        };
        store.ensure_dir()?;
        Ok(store)
    }

    pub fn generate_filename() -> String {
        format!("processed_{}.jpg", Uuid::new_v4().simple())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    fn ensure_dir(&self) -> Result<(), ArtifactError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    pub fn persist(&self, artifact: &AnnotatedArtifact) -> Result<PathBuf, ArtifactError> {
        self.ensure_dir()?;
        let path = self.dir.join(&artifact.filename);
        artifact
            .image
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|source| ArtifactError::Write {
                path: path.clone(),
                source,
            })?;
        log::debug!("Stored artifact {}", path.display());
        Ok(path)
    }

    pub fn url_for(&self, origin: &RequestOrigin, filename: &str) -> String {
        format!(
            "{}://{}{}/{}",
            origin.scheme, origin.host, self.url_path, filename
        )
    }
}
