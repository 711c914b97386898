use std::process::Stdio;
use tokio::process::Command;

/// How external commands (the build tool, `mv`, `chmod`) are started.
///
/// Every command gets its own process group, so a Ctrl-C aimed at the
/// terminal's foreground group reaches the orchestrator only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Privilege {
    Direct,
    Sudo {
        program: String,
        /// Passed to `program` before the elevated command.
        options: Vec<String>,
    },
}

impl Default for Privilege {
    fn default() -> Self {
        Self::sudo()
    }
}

impl Privilege {
    /// `sudo -n`: a child outside the foreground group cannot prompt, so an
    /// expired credential fails the command instead of stopping it on SIGTTIN.
    pub fn sudo() -> Self {
        Self::Sudo {
            program: "sudo".to_string(),
            options: vec!["-n".to_string()],
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Privilege::Sudo { .. })
    }

    pub fn command(&self, program: &str) -> Command {
        let mut command = match self {
            Privilege::Direct => Command::new(program),
            Privilege::Sudo {
                program: sudo,
                options,
            } => {
                let mut command = Command::new(sudo);
                command.args(options).arg(program);
                command
            }
        };
        command.process_group(0);
        command
    }

    /// Name of the process actually spawned for `program`.
    pub fn launcher<'a>(&'a self, program: &'a str) -> &'a str {
        match self {
            Privilege::Direct => program,
            Privilege::Sudo { program: sudo, .. } => sudo,
        }
    }

    /// Caches sudo credentials from the terminal before any job starts.
    /// Returns `false` when authentication was refused.
    pub async fn authenticate(&self) -> std::io::Result<bool> {
        match self {
            Privilege::Direct => Ok(true),
            Privilege::Sudo { program, .. } => {
                let status = Command::new(program)
                    .arg("-v")
                    .stdin(Stdio::inherit())
                    .status()
                    .await?;
                Ok(status.success())
            }
        }
    }
}
