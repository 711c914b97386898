use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::config::ExistingArtifact;
use crate::error::JobError;
use crate::privilege::Privilege;

pub const ARTIFACT_MODE: u32 = 0o644;

#[derive(Debug)]
pub struct Relocated {
    pub path: PathBuf,
    /// Set when the artifact was moved but its mode could not be normalized.
    pub warning: Option<JobError>,
}

/// Moves finished artifacts into the shared output directory.
///
/// Concurrent callers are safe as long as they use distinct target names.
/// Nothing here locks the directory.
#[derive(Debug, Clone)]
pub struct Relocator {
    output_dir: PathBuf,
    privilege: Privilege,
    existing: ExistingArtifact,
}

impl Relocator {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        privilege: Privilege,
        existing: ExistingArtifact,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            privilege,
            existing,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn relocate(&self, source: &Path, target_name: &str) -> Result<Relocated, JobError> {
        let target = self.output_dir.join(target_name);

        match tokio::fs::try_exists(source).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(JobError::Relocation {
                    target,
                    reason: format!("source {} does not exist", source.display()),
                });
            }
            Err(e) => {
                return Err(JobError::Relocation {
                    target,
                    reason: format!("cannot inspect source {}: {}", source.display(), e),
                });
            }
        }

        if self.existing == ExistingArtifact::Reject {
            match tokio::fs::try_exists(&target).await {
                Ok(false) => {}
                Ok(true) => {
                    return Err(JobError::Relocation {
                        target,
                        reason: "target already exists".to_string(),
                    });
                }
                Err(e) => {
                    let reason = format!("cannot inspect target: {}", e);
                    return Err(JobError::Relocation { target, reason });
                }
            }
        }

        let moved = match &self.privilege {
            Privilege::Direct => move_file(source, &target).await.map_err(|e| e.to_string()),
            Privilege::Sudo { .. } => {
                let mut command = self.privilege.command("mv");
                command.arg("-f").arg(source).arg(&target);
                run_elevated(command).await
            }
        };

        if let Err(reason) = moved {
            return Err(JobError::Relocation { target, reason });
        }

        let warning = self.normalize(&target).await.err().map(|reason| {
            tracing::warn!(
                path = %target.display(),
                reason,
                "Failed to normalize artifact permissions"
            );
            JobError::Permissions {
                target: target.clone(),
                reason,
            }
        });

        Ok(Relocated {
            path: target,
            warning,
        })
    }

    async fn normalize(&self, target: &Path) -> Result<(), String> {
        match &self.privilege {
            Privilege::Direct => {
                tokio::fs::set_permissions(target, std::fs::Permissions::from_mode(ARTIFACT_MODE))
                    .await
                    .map_err(|e| e.to_string())
            }
            Privilege::Sudo { .. } => {
                let mut command = self.privilege.command("chmod");
                command.arg(format!("{:o}", ARTIFACT_MODE)).arg(target);
                run_elevated(command).await
            }
        }
    }
}

async fn move_file(source: &Path, target: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(source, target).await {
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tokio::fs::copy(source, target).await?;
            tokio::fs::remove_file(source).await
        }
        result => result,
    }
}

async fn run_elevated(mut command: tokio::process::Command) -> Result<(), String> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
