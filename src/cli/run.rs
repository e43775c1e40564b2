// src/cli/run.rs — The `run` subcommand: drive a full generation session

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::core::orchestrator::Orchestrator;
use crate::core::types::{RunParams, SessionStatus};
use crate::evaluator::LlmEvaluator;
use crate::export;
use crate::generator::LlmGenerator;
use crate::infra::config::Config;
use crate::provider::openai_compat::OpenAICompatProvider;
use crate::store::{ChatlogSink, SqliteStore};

pub struct RunArgs {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub agent: String,
    pub model: Option<String>,
    pub requested_by: String,
    pub db: Option<PathBuf>,
    pub csv_out: Option<PathBuf>,
}

pub async fn run_generation(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    let api_key = std::env::var("CONVOGEN_API_KEY").unwrap_or_default();
    let generator_model = args
        .model
        .clone()
        .or_else(|| config.models.generator.clone())
        .unwrap_or_default();
    let evaluator_model = config
        .models
        .evaluator
        .clone()
        .unwrap_or_else(|| generator_model.clone());

    let params = RunParams {
        start_date: args.start_date,
        end_date: args.end_date,
        model: generator_model.clone(),
        api_key: api_key.clone(),
        requested_by: args.requested_by,
        agent_name: args.agent,
        min_per_day: config.pipeline.min_per_day,
        max_per_day: config.pipeline.max_per_day,
        min_turns: config.pipeline.min_turns,
        max_turns: config.pipeline.max_turns,
        similarity_threshold: config.pipeline.similarity_threshold,
        max_duplicate_retries: config.pipeline.max_duplicate_retries,
        request_timeout: Duration::from_secs(config.pipeline.request_timeout_secs),
    };

    let provider = Arc::new(OpenAICompatProvider::new(
        api_key,
        config.api.base_url.clone(),
    ));
    let generator = Arc::new(LlmGenerator::new(provider.clone(), generator_model));
    let evaluator = Arc::new(LlmEvaluator::new(provider, evaluator_model));
    let sink: Option<Arc<dyn ChatlogSink>> = match &args.db {
        Some(path) => Some(Arc::new(SqliteStore::open(path)?)),
        None => None,
    };

    let (orchestrator, handle) = Orchestrator::new(params, generator, evaluator, sink)?;
    let mut run = tokio::spawn(orchestrator.run());

    // Print progress once a second; Ctrl-C requests a clean stop that
    // keeps everything accepted so far.
    let final_session = loop {
        tokio::select! {
            joined = &mut run => {
                // On failure the session snapshot still carries the
                // error and everything accepted before it.
                break match joined? {
                    Ok(session) => session,
                    Err(_) => handle.snapshot(),
                };
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nstopping after the current conversation...");
                handle.stop();
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                let snap = handle.snapshot();
                eprintln!(
                    "[{}] {}/{} ({:.0}%) {} — {}",
                    snap.status,
                    snap.completed_count,
                    snap.target_count,
                    snap.percent,
                    snap.eta.as_deref().unwrap_or(""),
                    snap.current_step,
                );
            }
        }
    };

    println!(
        "{}: {} accepted, {} evaluated",
        final_session.status,
        final_session.accepted.len(),
        final_session
            .report
            .as_ref()
            .map(|r| r.evaluated_count)
            .unwrap_or(0),
    );
    if let Some(report) = &final_session.report {
        if report.evaluated_count > 0 {
            println!(
                "mean CPR {:.2}, {} escalated",
                report.mean_cpr, report.escalated_count
            );
        }
    }
    if let Some(path) = &args.csv_out {
        std::fs::write(path, export::to_csv(&final_session.accepted))?;
        println!("wrote {}", path.display());
    }

    if final_session.status == SessionStatus::Failed {
        anyhow::bail!(
            "{}",
            final_session
                .last_error
                .as_deref()
                .unwrap_or("run failed")
        );
    }

    Ok(())
}
