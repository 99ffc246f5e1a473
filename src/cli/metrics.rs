//! `aura metrics`

use crate::app::AppConfig;
use anyhow::{Context, Result};
use aura_analytics::AnalyticsBackend;
use aura_assembly::AssemblyGraph;

/// Print per-step metrics in step order
pub async fn run(config: &AppConfig, assembly_id: &str, json: bool) -> Result<()> {
    let path = config.data.graph_path(assembly_id);
    let graph = AssemblyGraph::from_json_file(&path)
        .with_context(|| format!("Assembly '{}' not found", assembly_id))?;

    let analytics = AnalyticsBackend::from_config(&config.data.analytics())
        .await
        .context("Failed to open analytics store")?;
    let metrics = analytics
        .get_step_metrics_for(&graph.id, &graph.step_order)
        .await
        .context("Failed to compute step metrics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("📊 {} ({})", graph.name, graph.id);
    println!(
        "   {:<12} {:>8} {:>10} {:>9} {:>6}  recent",
        "step", "success", "avg ms", "attempts", "demo"
    );
    for step in &metrics {
        let recent: String = step
            .recent_runs
            .iter()
            .map(|r| if r.success { '●' } else { '○' })
            .collect();
        println!(
            "   {:<12} {:>7.0}% {:>10.1} {:>9} {:>6}  {}",
            step.step_id,
            step.success_rate * 100.0,
            step.avg_duration_ms,
            step.total_attempts,
            step.demo_count,
            recent
        );
    }
    Ok(())
}
