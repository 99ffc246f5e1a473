//! `aura run`
//!
//! Drives one assembly to completion on the simulated cell. Steps that run
//! out of retries are handed to the operator on stdin.

use super::RunArgs;
use crate::app::{init, AppConfig};
use anyhow::{bail, Context, Result};
use aura_analytics::AnalyticsBackend;
use aura_assembly::AssemblyGraph;
use aura_core::{
    format_error_for_cli, Error, EventBus, ExecutionEvent, ExecutionState, Phase, SessionError,
    StepStatus,
};
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Execute the assembly and wait for it to settle
pub async fn run(config: AppConfig, args: RunArgs) -> Result<()> {
    if let Err(e) = init::validate(&config) {
        eprintln!("{}", format_error_for_cli(&e));
        return Err(e.into());
    }

    let path = config.data.graph_path(&args.graph);
    let graph = AssemblyGraph::from_json_file(&path)
        .with_context(|| format!("Failed to load assembly graph from {}", path.display()))?;
    let assembly_id = graph.id.clone();

    let mut sequencer = config.sequencer.clone();
    sequencer.demo_mode |= args.demo;
    let fail_first = args
        .fail_first
        .unwrap_or(config.simulation.fail_first_attempts);

    let analytics = AnalyticsBackend::from_config(&config.data.analytics())
        .await
        .context("Failed to open analytics store")?;
    info!(backend = analytics.name(), "Analytics store ready");

    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let shutdown = CancellationToken::new();
    let session = init::build_session(
        &config,
        sequencer,
        bus.callback(),
        Arc::new(analytics),
        shutdown.clone(),
    );

    let router = init::build_router(&config, &assembly_id, fail_first);
    match session.launch(graph, router).await {
        Ok(_) => {}
        Err(SessionError::Core(e)) => {
            eprintln!("{}", format_error_for_cli(&e));
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    let mut answers = spawn_stdin_lines();
    let mut report = Report::default();
    let final_state = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping execution");
                if let Err(e) = session.stop().await {
                    warn!(error = %e, "Stop was not applied");
                }
                break session.state().await;
            }
            event = events.recv() => match event {
                Ok(ExecutionEvent::ExecutionState(state)) => {
                    if args.json_events {
                        println!("{}", serde_json::to_string(&state)?);
                    } else {
                        report.update(&state);
                    }
                    if matches!(state.phase, Phase::Complete | Phase::Error | Phase::Idle) {
                        break state;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event consumer lagged");
                }
                Err(RecvError::Closed) => break session.state().await,
            },
            Some(line) = answers.recv() => {
                match parse_answer(&line) {
                    Some(success) => {
                        if let Err(e) = session.complete_human_step(success).await {
                            println!("   (ignored: {})", e);
                        }
                    }
                    None => println!("   Type y when the step is done, n if it could not be done"),
                }
            }
        }
    };
    shutdown.cancel();

    print_summary(&final_state);
    if final_state.phase == Phase::Error {
        let e = Error::Execution(format!("assembly '{}' ended in error", assembly_id));
        eprintln!("{}", format_error_for_cli(&e));
        bail!(e);
    }
    Ok(())
}

/// Operator input, one line at a time
///
/// Read on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "done" => Some(true),
        "n" | "no" | "failed" => Some(false),
        _ => None,
    }
}

/// Prints step transitions as they happen
#[derive(Default)]
struct Report {
    seen: HashMap<String, (StepStatus, u32)>,
    phase: Phase,
}

impl Report {
    fn update(&mut self, state: &ExecutionState) {
        if state.phase != self.phase {
            match state.phase {
                Phase::Running if self.phase == Phase::Idle => {
                    println!(
                        "▶️  Run {} of {}",
                        state.run_number,
                        state.assembly_id.as_deref().unwrap_or("?")
                    );
                }
                Phase::Paused => println!("⏸️  Paused"),
                _ => {}
            }
            self.phase = state.phase;
        }

        let mut ids: Vec<&String> = state.step_states.keys().collect();
        ids.sort();
        for id in ids {
            let step = &state.step_states[id];
            let key = (step.status, step.attempt);
            if self.seen.get(id) == Some(&key) {
                continue;
            }
            self.seen.insert(id.clone(), key);

            match step.status {
                StepStatus::Pending => {}
                StepStatus::Running => println!("   ⏳ {}", id),
                StepStatus::Retrying => println!("   🔁 {} attempt {}", id, step.attempt),
                StepStatus::Success => println!(
                    "   ✅ {} ({:.0} ms)",
                    id,
                    step.duration_ms.unwrap_or_default()
                ),
                StepStatus::Failed => println!("   ❌ {}", id),
                StepStatus::Human => {
                    println!(
                        "   🖐  {} needs a human after {} attempts. Finish it by hand, then type y (done) or n (failed):",
                        id, step.attempt
                    );
                }
            }
        }
    }
}

fn print_summary(state: &ExecutionState) {
    println!();
    println!(
        "{} {}: {}/{} steps succeeded ({:.0}%) in {:.1} s",
        match state.phase {
            Phase::Complete => "🏁",
            Phase::Error => "💥",
            _ => "⏹️",
        },
        state.phase,
        state.count(StepStatus::Success),
        state.step_states.len(),
        state.overall_success_rate * 100.0,
        state.elapsed_ms / 1000.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y"), Some(true));
        assert_eq!(parse_answer("  YES \n"), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }
}
