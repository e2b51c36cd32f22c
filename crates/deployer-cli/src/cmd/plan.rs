use crate::output::{print_json, print_table};
use deployer_core::catalog::PolicyCatalog;
use deployer_core::config::Config;
use deployer_core::planner::{plan_group, GroupPlan};
use deployer_core::types::WorkloadGroup;
use kubectl_agent::Kubectl;

pub fn run(config: &Config, group: Option<&str>, labels: &[String], json: bool) -> anyhow::Result<()> {
    let plans: Vec<GroupPlan> = match group {
        Some(key) => {
            let group = WorkloadGroup::with_labels(key, labels.iter().cloned());
            vec![plan_group(&group, &config.labels)]
        }
        None => {
            let kubectl = Kubectl::from_config(&config.kubectl);
            let rt = tokio::runtime::Runtime::new()?;
            let groups =
                rt.block_on(PolicyCatalog::from_config(&kubectl, config).list_groups())?;
            groups
                .values()
                .map(|g| plan_group(g, &config.labels))
                .collect()
        }
    };

    if json {
        return print_json(&plans);
    }

    if plans.is_empty() {
        println!("No policy groups found.");
        return Ok(());
    }

    let mut rows = Vec::new();
    for plan in &plans {
        if plan.actions.is_empty() {
            rows.push(vec![
                plan.group.clone(),
                plan.decision.to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
            ]);
        }
        for action in &plan.actions {
            rows.push(vec![
                plan.group.clone(),
                plan.decision.to_string(),
                action.context.name(&config.contexts).to_string(),
                action.verb.to_string(),
                action.scope.to_string(),
            ]);
        }
    }
    print_table(&["GROUP", "DECISION", "CONTEXT", "VERB", "SELECTOR"], rows);
    Ok(())
}
