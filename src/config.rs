use signal_hook::consts::{SIGINT, SIGTERM};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::build_tool::{BuildTool, Distrobuilder};
use crate::error::ImagesmithError;
use crate::job::{ArtifactNaming, JobDescriptor, expand_matrix};
use crate::privilege::Privilege;

pub const DEFAULT_RELEASES: &[&str] = &["3.19", "3.20", "3.21", "3.22"];
pub const DEFAULT_VARIANTS: &[&str] = &["default", "cloud"];
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What to do when the output directory already holds a file with the
/// computed target name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingArtifact {
    #[default]
    Overwrite,
    Reject,
}

#[derive(Clone)]
pub struct Config {
    pub releases: Vec<String>,
    pub variants: Vec<String>,
    pub naming: ArtifactNaming,
    pub tool: Arc<dyn BuildTool>,
    pub tool_config_file: PathBuf,
    pub privilege: Privilege,
    pub output_dir: PathBuf,
    pub work_root: PathBuf,
    pub concurrency: usize,
    pub existing_artifact: ExistingArtifact,
    pub fail_fast: bool,
    pub keep_work_dirs: bool,
    pub shutdown_signals: Vec<i32>,
    pub cancel_token: CancellationToken,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            releases: DEFAULT_RELEASES.iter().map(|r| r.to_string()).collect(),
            variants: DEFAULT_VARIANTS.iter().map(|v| v.to_string()).collect(),
            naming: ArtifactNaming::default(),
            tool: Arc::new(Distrobuilder::default()),
            tool_config_file: PathBuf::from("configs/alpine.yaml"),
            privilege: Privilege::default(),
            output_dir: PathBuf::from("output"),
            work_root: PathBuf::from("."),
            concurrency: DEFAULT_CONCURRENCY,
            existing_artifact: ExistingArtifact::default(),
            fail_fast: false,
            keep_work_dirs: false,
            shutdown_signals: vec![SIGINT, SIGTERM],
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn releases<I, S>(mut self, releases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.releases = dedup(releases);
        self
    }

    pub fn variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants = dedup(variants);
        self
    }

    pub fn architecture(mut self, architecture: impl Into<String>) -> Self {
        self.naming.architecture = architecture.into();
        self
    }

    pub fn naming(mut self, naming: ArtifactNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn tool(mut self, tool: impl BuildTool + 'static) -> Self {
        self.tool = Arc::new(tool);
        self
    }

    pub fn tool_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_config_file = path.into();
        self
    }

    pub fn privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn work_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_root = path.into();
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn existing_artifact(mut self, policy: ExistingArtifact) -> Self {
        self.existing_artifact = policy;
        self
    }

    /// Stop admitting new jobs after the first failure. Jobs already running
    /// are left to finish.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn keep_work_dirs(mut self, keep: bool) -> Self {
        self.keep_work_dirs = keep;
        self
    }

    pub fn with_graceful_shutdown(mut self, signals: impl IntoIterator<Item = i32>) -> Self {
        self.shutdown_signals = signals.into_iter().collect();
        self
    }

    pub fn jobs(&self) -> Vec<JobDescriptor> {
        expand_matrix(&self.releases, &self.variants)
    }

    pub fn validate(&self) -> Result<(), ImagesmithError> {
        if self.releases.is_empty() {
            return Err(ImagesmithError::ConfigError(
                "at least one release is required".to_string(),
            ));
        }
        if self.variants.is_empty() {
            return Err(ImagesmithError::ConfigError(
                "at least one variant is required".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ImagesmithError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }

        // `_` separates the fields of work directory and artifact names, so a
        // release or variant containing it could map two jobs onto one name.
        for id in self.releases.iter().chain(&self.variants) {
            validate_identifier(id)?;
            if id.contains('_') {
                return Err(ImagesmithError::ConfigError(format!(
                    "release and variant identifiers must not contain '_': {:?}",
                    id
                )));
            }
        }
        validate_identifier(&self.naming.architecture)?;

        for (axis, ids) in [("release", &self.releases), ("variant", &self.variants)] {
            if let Some(id) = first_duplicate(ids) {
                return Err(ImagesmithError::ConfigError(format!(
                    "duplicate {} {:?}",
                    axis, id
                )));
            }
        }

        Ok(())
    }
}

// Identifiers end up in file names, so they must stay inside one path segment.
fn validate_identifier(id: &str) -> Result<(), ImagesmithError> {
    let unsafe_char = |c: char| c == '/' || c == '\\' || c.is_whitespace();

    if id.is_empty() || id.contains("..") || id.chars().any(unsafe_char) {
        return Err(ImagesmithError::ConfigError(format!(
            "invalid identifier {:?}",
            id
        )));
    }

    Ok(())
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    ids.iter().map(String::as_str).find(|id| !seen.insert(*id))
}

fn dedup<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
