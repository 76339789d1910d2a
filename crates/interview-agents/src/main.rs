use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use assessment::store::{InterviewStore, MemoryStore};
use clap::Parser;
use interview_agents::providers::check_endpoint;
use interview_agents::{InterviewConfig, Interviewer, ProviderKind, ProviderManager};
use tracing::{info, warn};

/// Run an adaptive Excel interview on the console.
#[derive(Debug, Parser)]
#[command(name = "interview-agents", version)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Candidate name recorded on the interview.
    #[arg(long)]
    candidate: Option<String>,

    /// Provider for ordinary calls (gemini, groq, claude, mock).
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Model name for the selected provider.
    #[arg(long)]
    model: Option<String>,

    /// Seed for question selection.
    #[arg(long)]
    seed: Option<u64>,

    /// Allow the canned mock provider.
    #[arg(long)]
    allow_mock: bool,

    /// Print the final report as JSON instead of text.
    #[arg(long)]
    report_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = InterviewConfig::load(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        config.providers.default = provider;
    }
    if args.model.is_some() {
        config.providers.model = args.model.clone();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.allow_mock_provider |= args.allow_mock;
    config.validate().map_err(anyhow::Error::msg)?;

    let providers = Arc::new(
        ProviderManager::new(
            Arc::new(config.provider_factory()),
            config.providers.default_selection(),
            config.providers.escalation_selection(),
        )
        .context("failed to initialise LLM provider")?,
    );
    let provider_info = providers.provider_info();
    info!(
        provider = %provider_info.display_name,
        model = %provider_info.model,
        base_url = %provider_info.base_url,
        "Interviewer starting"
    );
    if provider_info.provider != ProviderKind::Mock {
        let key = config.providers.api_keys.get(&provider_info.provider);
        match check_endpoint(&provider_info.base_url, key.map(String::as_str)).await {
            Ok(status) => info!(status, "provider endpoint reachable"),
            Err(e) => warn!("provider endpoint probe failed: {e}"),
        }
    }

    let store: Arc<dyn InterviewStore> = Arc::new(MemoryStore::default());
    let interviewer = Interviewer::new(store, providers, &config);
    let session = interviewer.create_interview(args.candidate.clone())?;

    let mut response = interviewer.start_interview(session.id).await?;
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("\n[{}] {}", response.state, response.question);
        if response.is_final() {
            break;
        }
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            warn!("input closed before the interview finished");
            break;
        };
        let answer = line?;
        if answer.trim().is_empty() {
            println!("(please type an answer)");
            continue;
        }
        response = interviewer
            .process_turn(session.id, &answer, Some(response.state))
            .await?;
    }

    let report = interviewer.generate_report(session.id).await?;
    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\n{}", report.render_text());
    }
    Ok(())
}
