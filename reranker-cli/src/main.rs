use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use reqwest::{redirect, ClientBuilder};
use reranker_core::{spawn_periodic, Event, FrontPage, LifecycleStore, Pipeline, RerankConfig};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "reranker", about = "Rank news articles by decaying, site-normalized engagement")]
struct Cli {
    /// Configuration file; defaults to <config dir>/reranker/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch feeds, store new articles, expire old ones and refresh scores.
    Ingest,
    /// Rank the active articles and emit the front page.
    Rank {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Ingest then rank.
    Run {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run ingest + rank every `run_interval_minutes` until Ctrl-C.
    Daemon {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration to the config path.
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "reranker failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::InitConfig = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => RerankConfig::config_file_path()?,
        };
        RerankConfig::default().save_to(&path)?;
        info!(path = %path.display(), "wrote default configuration");
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => RerankConfig::load_from(path)?,
        None => RerankConfig::load(),
    };
    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .user_agent(concat!("reranker/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let store = LifecycleStore::open(&config.database_path).await?;
    let pipeline = Pipeline::new(config, client, store);

    match cli.command {
        Command::Ingest => {
            let report = pipeline.ingest(Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Rank { output } => {
            let page = pipeline.front_page(Utc::now()).await?;
            emit(&page, output.as_ref())?;
        }
        Command::Run { output } => {
            let (_, page) = pipeline.run(Utc::now()).await?;
            emit(&page, output.as_ref())?;
        }
        Command::Daemon { output } => daemon(pipeline, output).await?,
        Command::InitConfig => {}
    }
    Ok(())
}

async fn daemon(
    pipeline: Pipeline,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = Duration::from_secs(pipeline.config().run_interval_minutes.max(1) * 60);
    let (tx, mut rx) = mpsc::channel(4);
    let handle = spawn_periodic(Arc::new(pipeline), interval, tx);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, stopping");
                break;
            }
            event = rx.recv() => {
                match event {
                    Some(Event::RunCompleted { front_page, .. }) => {
                        if let Err(err) = emit(&front_page, output.as_ref()) {
                            error!(error = %err, "could not write front page");
                        }
                    }
                    Some(Event::RunFailed(_)) => {}
                    None => break,
                }
            }
        }
    }

    handle.stop().await?;
    Ok(())
}

fn emit(page: &FrontPage, output: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(page)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
