mod build_tool;
mod config;
mod error;
mod executor;
mod job;
mod job_outcome;
mod privilege;
mod relocator;
mod result_collector;
mod scheduler;
mod shutdown;
mod workspace;


pub use crate::build_tool::{BuildRequest, BuildTool, CAPTURE_LIMIT, Distrobuilder, ToolOutput};
pub use crate::config::{
    Config, DEFAULT_CONCURRENCY, DEFAULT_RELEASES, DEFAULT_VARIANTS, ExistingArtifact,
};
pub use crate::error::{ImagesmithError, JobError};
pub use crate::executor::JobRunner;
pub use crate::job::{ArtifactNaming, JobDescriptor, expand_matrix};
pub use crate::job_outcome::{JobOutcome, JobSummary};
pub use crate::privilege::Privilege;
pub use crate::relocator::{ARTIFACT_MODE, Relocated, Relocator};
pub use crate::result_collector::{Report, Stats};
pub use crate::scheduler::{Scheduler, SchedulerState};
pub use crate::workspace::Workspace;

/// Builds every release/variant combination in `config`.
///
/// Returns `Err` only when the run cannot start (invalid configuration,
/// output directory not creatable). Individual job failures are collected in
/// the [`Report`]; check [`Report::is_success`].
///
/// # Examples
///
/// ```rust
/// async fn build_all() -> Result<(), imagesmith::ImagesmithError> {
///     let config = imagesmith::Config::new()
///         .releases(["3.21", "3.22"])
///         .variants(["default", "cloud"])
///         .concurrency(2);
///
///     let report = imagesmith::run(config).await?;
///     println!("{}", report);
///
///     Ok(())
/// }
/// ```
pub async fn run(config: Config) -> Result<Report, ImagesmithError> {
    Scheduler::new(config).run().await
}
