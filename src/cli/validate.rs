//! `aura validate`

use crate::app::AppConfig;
use anyhow::{Context, Result};
use aura_assembly::AssemblyGraph;
use std::collections::BTreeMap;

/// Load the graph and print a summary
pub fn run(config: &AppConfig, graph: &str) -> Result<()> {
    let path = config.data.graph_path(graph);
    let graph = AssemblyGraph::from_json_file(&path)
        .with_context(|| format!("Invalid assembly graph at {}", path.display()))?;

    println!("✅ {} ({})", graph.name, graph.id);
    println!("   {} parts, {} steps", graph.parts.len(), graph.step_order.len());

    let mut handlers: BTreeMap<String, usize> = BTreeMap::new();
    for step in graph.ordered_steps() {
        *handlers.entry(step.handler.to_string()).or_default() += 1;
    }
    let breakdown: Vec<String> = handlers
        .iter()
        .map(|(handler, count)| format!("{} {}", count, handler))
        .collect();
    println!("   handlers: {}", breakdown.join(", "));
    println!();

    for (index, step) in graph.ordered_steps().enumerate() {
        let target = step
            .primitive_type
            .as_deref()
            .or(step.policy_id.as_deref())
            .unwrap_or("-");
        println!(
            "   {:>2}. {:<12} {:<32} {:<12} {:<12} {:<16} retries={}",
            index + 1,
            step.id,
            step.name,
            step.handler.as_str(),
            target,
            step.success_criteria.kind(),
            step.max_retries
        );
    }
    Ok(())
}
