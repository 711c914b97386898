use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use imagesmith::{
    Config, DEFAULT_CONCURRENCY, DEFAULT_RELEASES, DEFAULT_VARIANTS, Distrobuilder,
    ExistingArtifact, ImagesmithError, Privilege,
};

/// Build LXC root filesystem images for every release/variant pair.
#[derive(Debug, Parser)]
#[command(name = "imagesmith", version)]
struct Cli {
    /// Release to build; repeat for several.
    #[arg(long = "release", env = "IMAGESMITH_RELEASES", value_delimiter = ',')]
    releases: Vec<String>,

    /// Image variant to build; repeat for several.
    #[arg(long = "variant", env = "IMAGESMITH_VARIANTS", value_delimiter = ',')]
    variants: Vec<String>,

    #[arg(long, env = "IMAGESMITH_ARCH", default_value = "x86_64")]
    arch: String,

    /// Maximum number of builds running at once. 1 builds sequentially.
    #[arg(long, env = "IMAGESMITH_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    #[arg(long, env = "IMAGESMITH_CONFIG_FILE", default_value = "configs/alpine.yaml")]
    config_file: PathBuf,

    #[arg(long, env = "IMAGESMITH_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Parent of the per-job work directories.
    #[arg(long, env = "IMAGESMITH_WORK_ROOT", default_value = ".")]
    work_root: PathBuf,

    #[arg(long, env = "IMAGESMITH_TOOL", default_value = "distrobuilder")]
    tool: String,

    /// Run the build tool, mv and chmod without sudo.
    #[arg(long, env = "IMAGESMITH_NO_SUDO")]
    no_sudo: bool,

    /// Fail a job instead of replacing an existing artifact.
    #[arg(long, env = "IMAGESMITH_REJECT_EXISTING")]
    reject_existing: bool,

    /// Stop starting new jobs after the first failure.
    #[arg(long, env = "IMAGESMITH_FAIL_FAST")]
    fail_fast: bool,

    #[arg(long, env = "IMAGESMITH_KEEP_WORK_DIRS")]
    keep_work_dirs: bool,

    /// Write a JSON report to this path.
    #[arg(long, env = "IMAGESMITH_SUMMARY_JSON")]
    summary_json: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Config {
        let releases = if self.releases.is_empty() {
            DEFAULT_RELEASES.iter().map(|r| r.to_string()).collect()
        } else {
            self.releases.clone()
        };
        let variants = if self.variants.is_empty() {
            DEFAULT_VARIANTS.iter().map(|v| v.to_string()).collect()
        } else {
            self.variants.clone()
        };
        let privilege = if self.no_sudo {
            Privilege::Direct
        } else {
            Privilege::sudo()
        };
        let existing = if self.reject_existing {
            ExistingArtifact::Reject
        } else {
            ExistingArtifact::Overwrite
        };

        Config::new()
            .releases(releases)
            .variants(variants)
            .architecture(self.arch.clone())
            .concurrency(self.concurrency)
            .tool(Distrobuilder::new(self.tool.clone()))
            .tool_config_file(self.config_file.clone())
            .output_dir(self.output_dir.clone())
            .work_root(self.work_root.clone())
            .privilege(privilege)
            .existing_artifact(existing)
            .fail_fast(self.fail_fast)
            .keep_work_dirs(self.keep_work_dirs)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, ImagesmithError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    if !config.privilege.authenticate().await? {
        return Err(ImagesmithError::ConfigError(
            "sudo authentication failed".to_string(),
        ));
    }

    let report = imagesmith::run(config).await?;

    print!("{}", report);

    if let Some(path) = &cli.summary_json {
        tokio::fs::write(path, report.to_json()?).await?;
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
