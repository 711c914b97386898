use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::JobError;
use crate::job::JobDescriptor;

#[derive(Debug)]
pub struct JobOutcome {
    pub descriptor: JobDescriptor,
    pub artifact: Option<PathBuf>,
    pub error: Option<JobError>,
    pub warnings: Vec<JobError>,
    pub duration: Duration,
}

impl JobOutcome {
    pub fn succeeded(descriptor: JobDescriptor, artifact: PathBuf) -> Self {
        Self {
            descriptor,
            artifact: Some(artifact),
            error: None,
            warnings: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(descriptor: JobDescriptor, error: JobError) -> Self {
        Self {
            descriptor,
            artifact: None,
            error: Some(error),
            warnings: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<JobError>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            release_id: self.descriptor.release_id.clone(),
            variant_id: self.descriptor.variant_id.clone(),
            success: self.success(),
            artifact: self.artifact.clone(),
            error: self.error.as_ref().map(ToString::to_string),
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Serializable view of a [`JobOutcome`].
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub release_id: String,
    pub variant_id: String,
    pub success: bool,
    pub artifact: Option<PathBuf>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}
