use crate::shared::*;
use std::sync::atomic::Ordering;
use testresult::TestResult;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
pub async fn test_ceiling_is_respected() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let tool = RecordingTool::default().delay_ms(25);
    let peak = tool.peak.clone();
    let running = tool.running.clone();
    let config = sandbox
        .config()
        .tool(tool)
        .releases(["3.19", "3.20", "3.21", "3.22"])
        .variants(["default", "cloud", "minimal"])
        .concurrency(4);

    let report = imagesmith::run(config).await?;

    assert!(report.is_success());
    assert_eq!(report.stats.processed, 12);
    assert!(peak.load(Ordering::SeqCst) <= 4);
    assert!(peak.load(Ordering::SeqCst) > 1);
    assert_eq!(running.load(Ordering::SeqCst), 0);
    assert_eq!(sandbox.output_files()?.len(), 12);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
pub async fn test_concurrency_one_is_sequential() -> TestResult {
    setup();
    let sandbox = Sandbox::new()?;
    let tool = RecordingTool::default().delay_ms(5);
    let peak = tool.peak.clone();
    let config = sandbox
        .config()
        .tool(tool)
        .releases(["A", "B", "C"])
        .variants(["x", "y"])
        .concurrency(1);

    let report = imagesmith::run(config).await?;

    assert!(report.is_success());
    assert_eq!(peak.load(Ordering::SeqCst), 1);

    Ok(())
}
