//! One-shot execution of a suite file.

use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};

use apitester_core::{
    AssertionStatus, CancelRegistry, CaseExecutor, CaseResult, Config, ReqwestTransport,
    SuiteRun, SuiteRunner, TestSuite,
};

/// Runs the suite in `path` and prints the outcome.
///
/// Nothing is persisted. Ctrl+C stops the run after the current case.
/// Returns true when every case passed.
pub async fn run_file(config: &Config, path: &Path, json: bool) -> Result<bool> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Could not read suite file {}", path.display()))?;
    let mut suite = TestSuite::from_yaml(&text)
        .wrap_err_with(|| format!("Invalid suite file {}", path.display()))?;

    if suite.id.is_empty() {
        suite.id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| suite.name.clone());
    }

    let transport = ReqwestTransport::new(&config.runner)?;
    let executor = CaseExecutor::new(transport)
        .with_correlation_header(config.runner.correlation_header_name());
    let runner = SuiteRunner::new(executor);

    let cancels = Arc::new(CancelRegistry::new());
    let (token, guard) = cancels.start(&suite.id);
    let interrupt = {
        let cancels = cancels.clone();
        let id = suite.id.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted, stopping after the current case...");
                cancels.cancel(&id);
            }
        })
    };

    let run = runner.run(&suite, token).await;
    interrupt.abort();
    drop(guard);

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&suite, &run);
    }

    Ok(run.is_success() && !run.cancelled)
}

fn print_run(suite: &TestSuite, run: &SuiteRun) {
    println!("Suite: {} ({} cases)", suite.name, suite.tests.len());
    println!();

    for result in &run.results {
        print_case(result);
    }

    let passed = run.results.iter().filter(|r| r.is_success()).count();
    println!();
    println!(
        "{} of {} cases passed{}",
        passed,
        run.results.len(),
        if run.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_case(result: &CaseResult) {
    if let Some(error) = &result.error {
        println!("  ERROR {}  {}", result.test_case, error);
        return;
    }

    let summary = result.summary();
    let label = if summary.failed == 0 { "PASS " } else { "FAIL " };
    let status = result.status.map(|s| s.to_string()).unwrap_or_default();
    let mut counts = format!("{} passed, {} failed", summary.passed, summary.failed);
    if summary.skipped > 0 {
        counts.push_str(&format!(", {} skipped", summary.skipped));
    }
    println!("  {} {}  [{}] {}", label, result.test_case, status, counts);

    for outcome in &result.result_set.results {
        if outcome.status != AssertionStatus::Passed {
            println!("        {}: {}", outcome.name, outcome.message);
        }
    }
}
