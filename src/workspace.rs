use std::path::{Path, PathBuf};

use crate::error::JobError;
use crate::job::JobDescriptor;

/// A job's private working directory. The build tool always writes the same
/// artifact name, so concurrent jobs must never share one.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    config_file: PathBuf,
}

impl Workspace {
    /// Creates an empty `<root>/build_<release>_<variant>` and copies the
    /// tool's configuration file into it. Whatever an earlier run left at that
    /// path is removed first, so a stale artifact can never pass for a new one.
    pub async fn prepare(
        root: &Path,
        job: &JobDescriptor,
        config_source: &Path,
    ) -> Result<Self, JobError> {
        let path = root.join(job.work_dir_name());

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::debug!(job = %job, path = %path.display(), "Removed stale work directory");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(JobError::Workspace { path, source }),
        }

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| JobError::Workspace {
                path: path.clone(),
                source,
            })?;

        let file_name = config_source
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| JobError::Workspace {
                path: config_source.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "configuration file path has no file name",
                ),
            })?;

        tokio::fs::copy(config_source, path.join(&file_name))
            .await
            .map_err(|source| JobError::Workspace {
                path: config_source.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path,
            config_file: file_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configuration file name relative to [`Workspace::path`].
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub async fn cleanup(self) -> Result<(), JobError> {
        tokio::fs::remove_dir_all(&self.path)
            .await
            .map_err(|source| JobError::Cleanup {
                path: self.path,
                source,
            })
    }
}
