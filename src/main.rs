use anyhow::{Context, Result};
use clap::Parser;
use refscout::accounts;
use refscout::citations::{CitationParser, VerificationEngine};
use refscout::client::SearchOrchestrator;
use refscout::credits::CreditLedger;
use refscout::intent::IntentClassifier;
use refscout::llm::{ChatCompletionsClient, LanguageModel};
use refscout::server::{self, AppState};
use refscout::tools::{DiscoverTool, VerifyTool};
use refscout::{Config, SourceDb};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Source discovery and citation verification service
#[derive(Parser)]
#[command(name = "refscout", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(cli: &Cli) {
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("refscout={default_level},tower_http=info")));

    if cli.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!("Starting refscout v{}", env!("CARGO_PKG_VERSION"));

    let model: Arc<dyn LanguageModel> = Arc::new(
        ChatCompletionsClient::new(config.llm.clone()).context("Failed to create LLM client")?,
    );

    let orchestrator = Arc::new(
        SearchOrchestrator::from_config(&config.adapters)
            .context("Failed to initialize database adapters")?,
    );

    let (auth, store) = accounts::bootstrap(&config.auth).await;
    let ledger = Arc::new(CreditLedger::new(store));

    let classifier = IntentClassifier::new(model.clone());
    let discover = Arc::new(DiscoverTool::new(
        classifier,
        orchestrator.clone(),
        ledger.clone(),
    ));

    let doi_registry = orchestrator
        .adapter(SourceDb::Crossref)
        .context("CrossRef adapter missing")?;
    let citation_graph = orchestrator
        .adapter(SourceDb::SemanticScholar)
        .context("Semantic Scholar adapter missing")?;
    let parser = CitationParser::new(
        model,
        Duration::from_secs(config.verification.parse_timeout_secs),
    );
    let engine = VerificationEngine::new(
        parser,
        doi_registry,
        citation_graph,
        Duration::from_secs(config.verification.search_timeout_secs),
    );
    let verify = Arc::new(VerifyTool::new(
        engine,
        ledger.clone(),
        Duration::from_millis(config.verification.citation_delay_ms),
    ));

    let state = AppState {
        discover,
        verify,
        orchestrator,
        auth,
        ledger,
    };

    server::serve(state, &config.server.host, config.server.port)
        .await
        .context("Server failed")?;

    Ok(())
}
