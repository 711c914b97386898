use crate::shared::*;
use imagesmith::{Distrobuilder, JobError};
use testresult::TestResult;

const FAKE_DISTROBUILDER: &str = r#"#!/bin/sh
[ "$1" = "build-lxc" ] || exit 64
[ -f "$2" ] || { echo "missing config $2" >&2; exit 65; }
shift 2
while [ $# -gt 0 ]; do
  case "$2" in
    image.release=*) release="${2#image.release=}" ;;
    image.architecture=*) arch="${2#image.architecture=}" ;;
    image.variant=*) variant="${2#image.variant=}" ;;
  esac
  shift 2
done
echo "building $release $arch $variant"
if [ "$release" = "B" ] && [ "$variant" = "y" ]; then
  echo "package mirror unreachable" >&2
  exit 1
fi
printf '%s-%s-%s' "$release" "$arch" "$variant" > rootfs.tar.xz
"#;

fn tool(sandbox: &Sandbox, body: &str) -> std::io::Result<Distrobuilder> {
    let script = sandbox.script(body)?;
    Ok(Distrobuilder::new("sh").leading_args([
        script.to_string_lossy().into_owned(),
        "build-lxc".to_string(),
    ]))
}

#[tokio::test]
pub async fn test_subprocess_matrix() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let config = sandbox
        .config()
        .tool(tool(&sandbox, FAKE_DISTROBUILDER)?)
        .releases(["A", "B"])
        .variants(["x", "y"])
        .concurrency(2);

    let report = imagesmith::run(config).await?;

    assert_eq!(report.stats.processed, 4);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(
        sandbox.output_files()?,
        names(&[
            "alpine_A_x86_64_x.tar.xz",
            "alpine_A_x86_64_y.tar.xz",
            "alpine_B_x86_64_x.tar.xz",
        ])
    );
    assert_eq!(
        std::fs::read_to_string(sandbox.output_dir().join("alpine_A_x86_64_y.tar.xz"))?,
        "A-x86_64-y"
    );

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].descriptor.to_string(), "B/y");
    match &failed[0].error {
        Some(JobError::Tool {
            status,
            stdout,
            stderr,
        }) => {
            assert!(status.contains('1'));
            assert_eq!(stdout, "building B x86_64 y\n");
            assert_eq!(stderr, "package mirror unreachable\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
pub async fn test_tool_without_artifact() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let config = sandbox
        .config()
        .tool(tool(&sandbox, "echo done\n")?)
        .releases(["3.22"])
        .variants(["default"]);

    let report = imagesmith::run(config).await?;

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        failed[0].error,
        Some(JobError::MissingArtifact { .. })
    ));
    assert!(sandbox.output_files()?.is_empty());

    Ok(())
}

#[tokio::test]
pub async fn test_leftover_work_dir_artifact_is_not_shipped() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let leftover = sandbox.work_root().join("build_3.22_default");
    std::fs::create_dir_all(&leftover)?;
    std::fs::write(leftover.join("rootfs.tar.xz"), "left by an earlier run")?;
    let config = sandbox
        .config()
        .tool(tool(&sandbox, "echo done\n")?)
        .releases(["3.22"])
        .variants(["default"]);

    let report = imagesmith::run(config).await?;

    assert!(!report.is_success());
    assert!(matches!(
        report.outcomes[0].error,
        Some(JobError::MissingArtifact { .. })
    ));
    assert!(sandbox.output_files()?.is_empty());

    Ok(())
}

#[tokio::test]
pub async fn test_missing_tool_fails_every_job() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let config = sandbox
        .config()
        .tool(Distrobuilder::new("imagesmith-missing-distrobuilder"))
        .releases(["3.21", "3.22"])
        .variants(["default"]);

    let report = imagesmith::run(config).await?;

    assert_eq!(report.stats.processed, 2);
    assert_eq!(report.stats.failed, 2);
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| matches!(o.error, Some(JobError::Spawn { .. })))
    );

    Ok(())
}

#[tokio::test]
pub async fn test_missing_config_file() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let config = sandbox
        .config()
        .tool(tool(&sandbox, FAKE_DISTROBUILDER)?)
        .tool_config_file(sandbox.root.path().join("configs/missing.yaml"))
        .releases(["A"])
        .variants(["x"]);

    let report = imagesmith::run(config).await?;

    assert_eq!(report.stats.failed, 1);
    assert!(matches!(
        report.outcomes[0].error,
        Some(JobError::Workspace { .. })
    ));

    Ok(())
}
