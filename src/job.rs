use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of the build matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub release_id: String,
    pub variant_id: String,
}

impl JobDescriptor {
    pub fn new(release_id: impl Into<String>, variant_id: impl Into<String>) -> Self {
        Self {
            release_id: release_id.into(),
            variant_id: variant_id.into(),
        }
    }

    pub fn work_dir_name(&self) -> String {
        format!("build_{}_{}", self.release_id, self.variant_id)
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.release_id, self.variant_id)
    }
}

/// Cartesian product of releases and variants, release-major.
///
/// Inputs are taken as-is; callers pass deduplicated sets.
pub fn expand_matrix<R, V>(releases: &[R], variants: &[V]) -> Vec<JobDescriptor>
where
    R: AsRef<str>,
    V: AsRef<str>,
{
    releases
        .iter()
        .flat_map(|release| {
            variants
                .iter()
                .map(move |variant| JobDescriptor::new(release.as_ref(), variant.as_ref()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    pub prefix: String,
    pub architecture: String,
    pub extension: String,
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self {
            prefix: "alpine".to_string(),
            architecture: "x86_64".to_string(),
            extension: "tar.xz".to_string(),
        }
    }
}

impl ArtifactNaming {
    /// `<prefix>_<release>_<arch>_<variant>.<ext>`
    pub fn target_name(&self, job: &JobDescriptor) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.prefix, job.release_id, self.architecture, job.variant_id, self.extension
        )
    }
}
