use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ImagesmithError {
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Semaphore error: {0}")]
    SemaphoreError(#[from] tokio::sync::AcquireError),
    #[error("Worker error: {0}")]
    TokioJoinError(#[from] tokio::task::JoinError),
    #[error("Std IO error: {0}")]
    StdIoError(#[from] std::io::Error),
}

/// Everything that can go wrong while running a single job.
///
/// These never unwind past the job runner; they travel inside a
/// [`JobOutcome`](crate::JobOutcome) to the result collector.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Failed to prepare work directory {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Build tool exited with {status}\nstdout: {stdout}\nstderr: {stderr}")]
    Tool {
        status: String,
        stdout: String,
        stderr: String,
    },
    #[error("Build tool succeeded but produced no artifact at {}", path.display())]
    MissingArtifact { path: PathBuf },
    #[error("Failed to move artifact to {}: {reason}", target.display())]
    Relocation { target: PathBuf, reason: String },
    #[error("Failed to normalize permissions of {}: {reason}", target.display())]
    Permissions { target: PathBuf, reason: String },
    #[error("Failed to clean up work directory {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Job was not started because dispatch stopped")]
    NotStarted,
    #[error("Job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Whether this error marks the job failed. Permission and cleanup
    /// problems are reported as warnings only.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, JobError::Permissions { .. } | JobError::Cleanup { .. })
    }
}
