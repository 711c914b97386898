use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::JobError;
use crate::job::JobDescriptor;
use crate::privilege::Privilege;

/// Bytes of each captured stream kept for diagnosis.
pub const CAPTURE_LIMIT: usize = 64 * 1024;

pub struct BuildRequest<'a> {
    pub job: &'a JobDescriptor,
    pub architecture: &'a str,
    /// Work directory the tool runs in. The artifact is expected here.
    pub work_dir: &'a Path,
    /// Tool configuration file, relative to `work_dir`.
    pub config_file: &'a Path,
    pub privilege: &'a Privilege,
}

#[derive(Debug, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait::async_trait]
pub trait BuildTool: Send + Sync {
    async fn build(&self, request: &BuildRequest<'_>) -> Result<ToolOutput, JobError>;

    /// Artifact left in the work directory on success, whatever the job.
    fn artifact_file(&self) -> &Path;
}

/// Runs `distrobuilder build-lxc` (or any tool sharing its argument contract).
#[derive(Debug, Clone)]
pub struct Distrobuilder {
    pub program: String,
    pub leading_args: Vec<String>,
    pub artifact_file: PathBuf,
}

impl Default for Distrobuilder {
    fn default() -> Self {
        Self {
            program: "distrobuilder".to_string(),
            leading_args: vec!["build-lxc".to_string()],
            artifact_file: PathBuf::from("rootfs.tar.xz"),
        }
    }
}

impl Distrobuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_artifact_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_file = path.into();
        self
    }

    pub fn args(&self, request: &BuildRequest<'_>) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(request.config_file.to_string_lossy().into_owned());
        args.push("-o".to_string());
        args.push(format!("image.release={}", request.job.release_id));
        args.push("-o".to_string());
        args.push(format!("image.architecture={}", request.architecture));
        args.push("-o".to_string());
        args.push(format!("image.variant={}", request.job.variant_id));
        args
    }
}

#[async_trait::async_trait]
impl BuildTool for Distrobuilder {
    async fn build(&self, request: &BuildRequest<'_>) -> Result<ToolOutput, JobError> {
        let args = self.args(request);
        tracing::debug!(job = %request.job, program = self.program, ?args, "Spawning build tool");

        let output = request
            .privilege
            .command(&self.program)
            .args(&args)
            .current_dir(request.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| JobError::Spawn {
                program: request.privilege.launcher(&self.program).to_string(),
                source,
            })?;

        let stdout = capture(&output.stdout);
        let stderr = capture(&output.stderr);

        if !output.status.success() {
            return Err(JobError::Tool {
                status: output.status.to_string(),
                stdout,
                stderr,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }

    fn artifact_file(&self) -> &Path {
        &self.artifact_file
    }
}

/// Keeps the first [`CAPTURE_LIMIT`] bytes, lossily decoded.
pub fn capture(bytes: &[u8]) -> String {
    if bytes.len() <= CAPTURE_LIMIT {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let mut text = String::from_utf8_lossy(&bytes[..CAPTURE_LIMIT]).into_owned();
    text.push_str(&format!(
        "\n[truncated {} bytes]",
        bytes.len() - CAPTURE_LIMIT
    ));
    text
}
