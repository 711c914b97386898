use crate::shared::*;
use imagesmith::{ArtifactNaming, ExistingArtifact, ImagesmithError, JobError};
use testresult::TestResult;

fn naming() -> ArtifactNaming {
    ArtifactNaming {
        prefix: "art".to_string(),
        architecture: "amd64".to_string(),
        extension: "img".to_string(),
    }
}

#[tokio::test]
pub async fn test_all_success() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let config = sandbox
        .config()
        .tool(RecordingTool::default())
        .naming(naming())
        .releases(["A", "B"])
        .variants(["x", "y"])
        .concurrency(2);

    let report = imagesmith::run(config).await?;

    assert!(report.is_success());
    assert_eq!(report.stats.processed, 4);
    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(
        sandbox.output_files()?,
        names(&[
            "art_A_amd64_x.img",
            "art_A_amd64_y.img",
            "art_B_amd64_x.img",
            "art_B_amd64_y.img",
        ])
    );
    assert_eq!(
        std::fs::read_to_string(sandbox.output_dir().join("art_B_amd64_y.img"))?,
        "B/y"
    );
    assert_eq!(std::fs::read_dir(sandbox.work_root())?.count(), 0);

    Ok(())
}

#[tokio::test]
pub async fn test_rerun_overwrites_by_default() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let config = || {
        sandbox
            .config()
            .tool(RecordingTool::default())
            .naming(naming())
            .releases(["A"])
            .variants(["x", "y"])
    };

    imagesmith::run(config()).await?;
    std::fs::write(sandbox.output_dir().join("art_A_amd64_x.img"), "stale")?;

    let report = imagesmith::run(config()).await?;

    assert!(report.is_success());
    assert_eq!(
        std::fs::read_to_string(sandbox.output_dir().join("art_A_amd64_x.img"))?,
        "A/x"
    );

    Ok(())
}

#[tokio::test]
pub async fn test_rerun_rejects_existing_when_asked() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    std::fs::create_dir_all(sandbox.output_dir())?;
    std::fs::write(sandbox.output_dir().join("art_A_amd64_x.img"), "previous")?;

    let config = sandbox
        .config()
        .tool(RecordingTool::default())
        .naming(naming())
        .releases(["A"])
        .variants(["x", "y"])
        .existing_artifact(ExistingArtifact::Reject);

    let report = imagesmith::run(config).await?;

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].descriptor.to_string(), "A/x");
    assert!(matches!(failed[0].error, Some(JobError::Relocation { .. })));
    assert_eq!(
        std::fs::read_to_string(sandbox.output_dir().join("art_A_amd64_x.img"))?,
        "previous"
    );
    assert!(sandbox.output_dir().join("art_A_amd64_y.img").exists());

    Ok(())
}

#[tokio::test]
pub async fn test_aliasing_identifiers_are_refused_before_building() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let tool = RecordingTool::default();
    let started = tool.started.clone();
    let config = sandbox
        .config()
        .tool(tool)
        .releases(["a", "a_b"])
        .variants(["c", "b_c"])
        .concurrency(4);

    let result = imagesmith::run(config).await;

    assert!(matches!(result, Err(ImagesmithError::ConfigError(_))));
    assert_eq!(started.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(!sandbox.work_root().join("build_a_b_c").exists());

    Ok(())
}
