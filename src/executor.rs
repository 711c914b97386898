use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::build_tool::{BuildRequest, BuildTool};
use crate::config::Config;
use crate::error::JobError;
use crate::job::{ArtifactNaming, JobDescriptor};
use crate::job_outcome::JobOutcome;
use crate::privilege::Privilege;
use crate::relocator::Relocator;
use crate::workspace::Workspace;

/// Runs one job to completion. Shares nothing mutable with other runners.
#[derive(Clone)]
pub struct JobRunner {
    tool: Arc<dyn BuildTool>,
    relocator: Relocator,
    naming: ArtifactNaming,
    privilege: Privilege,
    work_root: PathBuf,
    tool_config_file: PathBuf,
    keep_work_dirs: bool,
}

impl JobRunner {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tool: Arc::clone(&config.tool),
            relocator: Relocator::new(
                config.output_dir.clone(),
                config.privilege.clone(),
                config.existing_artifact,
            ),
            naming: config.naming.clone(),
            privilege: config.privilege.clone(),
            work_root: config.work_root.clone(),
            tool_config_file: config.tool_config_file.clone(),
            keep_work_dirs: config.keep_work_dirs,
        }
    }

    pub async fn run(&self, descriptor: JobDescriptor) -> JobOutcome {
        tracing::info!(job = %descriptor, "Job started");
        let start = Instant::now();
        let mut warnings = Vec::new();

        let result = self.execute(&descriptor, &mut warnings).await;
        let duration = start.elapsed();

        tracing::info!(
            job = %descriptor,
            success = result.is_ok(),
            duration = duration.as_millis(),
            warnings = warnings.len(),
            "Job finished"
        );

        let outcome = match result {
            Ok(path) => JobOutcome::succeeded(descriptor, path),
            Err(e) => JobOutcome::failed(descriptor, e),
        };

        outcome.with_warnings(warnings).with_duration(duration)
    }

    async fn execute(
        &self,
        job: &JobDescriptor,
        warnings: &mut Vec<JobError>,
    ) -> Result<PathBuf, JobError> {
        let workspace = Workspace::prepare(&self.work_root, job, &self.tool_config_file).await?;
        let result = self.build_and_relocate(job, &workspace, warnings).await;

        if self.keep_work_dirs {
            tracing::debug!(
                job = %job,
                path = %workspace.path().display(),
                "Keeping work directory"
            );
        } else if let Err(e) = workspace.cleanup().await {
            tracing::warn!(job = %job, error = %e, "Work directory left behind");
            warnings.push(e);
        }

        result
    }

    async fn build_and_relocate(
        &self,
        job: &JobDescriptor,
        workspace: &Workspace,
        warnings: &mut Vec<JobError>,
    ) -> Result<PathBuf, JobError> {
        let request = BuildRequest {
            job,
            architecture: &self.naming.architecture,
            work_dir: workspace.path(),
            config_file: workspace.config_file(),
            privilege: &self.privilege,
        };

        let output = self.tool.build(&request).await?;
        tracing::debug!(
            job = %job,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "Build tool succeeded"
        );

        let artifact = workspace.path().join(self.tool.artifact_file());
        match tokio::fs::try_exists(&artifact).await {
            Ok(true) => {}
            Ok(false) => return Err(JobError::MissingArtifact { path: artifact }),
            Err(source) => {
                return Err(JobError::Workspace {
                    path: artifact,
                    source,
                });
            }
        }

        let relocated = self
            .relocator
            .relocate(&artifact, &self.naming.target_name(job))
            .await?;

        if let Some(warning) = relocated.warning {
            warnings.push(warning);
        }

        Ok(relocated.path)
    }
}
