use crate::output::{print_json, print_table};
use anyhow::Context;
use deployer_core::config::Config;
use deployer_core::report::PassReport;
use deployer_core::run_log::{PassKind, RunStatus};
use deployer_server::PassRunner;
use kubectl_agent::Kubectl;
use std::path::Path;
use std::sync::Arc;

/// Run one pass to completion and print its report. Fails unless the pass
/// succeeded.
pub fn run(config: Config, kind: PassKind, dir: &Path, rev: &str, json: bool) -> anyhow::Result<()> {
    config.ensure_valid().context("invalid config")?;
    if !dir.is_dir() {
        anyhow::bail!("deployment directory '{}' does not exist", dir.display());
    }

    let kubectl = Kubectl::from_config(&config.kubectl);
    kubectl.locate()?;
    let runner = PassRunner::new(Arc::new(config), Arc::new(kubectl))?;

    tracing::info!(kind = %kind, dir = %dir.display(), rev, "starting pass");
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(runner.run(kind, dir)).with_rev(rev);

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    let status = report.status();
    if status != RunStatus::Succeeded {
        anyhow::bail!("{kind} pass {status}: {}", report.summary());
    }
    Ok(())
}

fn result_cell(error: Option<&str>) -> String {
    match error {
        None => "ok".to_string(),
        Some(e) => format!("failed: {e}"),
    }
}

fn print_report(report: &PassReport) {
    if !report.steps.is_empty() {
        let rows = report
            .steps
            .iter()
            .map(|s| {
                vec![
                    s.step.clone(),
                    s.context.clone().unwrap_or_else(|| "-".to_string()),
                    result_cell(s.error.as_deref()),
                ]
            })
            .collect();
        print_table(&["STEP", "CONTEXT", "RESULT"], rows);
        println!();
    }

    if !report.groups.is_empty() {
        let rows = report
            .groups
            .iter()
            .map(|g| {
                let result = match &g.failed {
                    None => "ok".to_string(),
                    Some(f) => format!("failed at '{}': {}", f.action, f.error),
                };
                vec![
                    g.group.clone(),
                    g.decision.to_string(),
                    format!("{}/{}", g.executed, g.planned),
                    result,
                ]
            })
            .collect();
        print_table(&["GROUP", "DECISION", "ACTIONS", "RESULT"], rows);
        println!();
    }

    if !report.legacy.is_empty() {
        let rows = report
            .legacy
            .iter()
            .map(|l| {
                vec![
                    l.workload.clone(),
                    l.host.clone().unwrap_or_else(|| "-".to_string()),
                    l.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                    result_cell(l.error.as_deref()),
                ]
            })
            .collect();
        print_table(&["WORKLOAD", "HOST", "STATUS", "RESULT"], rows);
        println!();
    }

    let rev = report
        .rev
        .as_deref()
        .map(|r| format!(" (rev {r})"))
        .unwrap_or_default();
    println!("{} pass{rev} {}: {}", report.kind, report.status(), report.summary());
}
