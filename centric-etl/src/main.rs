//! Centric ETL Main Entry Point
//!
//! `run` executes one pipeline run and exits; `serve` keeps the recurring
//! schedule and the HTTP control surface running until interrupted.

use std::env;
use std::net::SocketAddr;

use centric_etl::server::{create_app, run_server, AppState};
use centric_etl::{Dependencies, EtlConfig, ServiceError};
use centric_etl_shared::{Stage, StageSet};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Trigger recorded on runs started from the command line.
const CLI_TRIGGER: &str = "cli";

#[derive(Parser)]
#[command(name = "centric-etl", version, about = "Sequence-centric search index ETL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the selected stages once and exit
    Run(StageArgs),
    /// Serve the control surface and the recurring schedule
    Serve,
}

#[derive(Args)]
struct StageArgs {
    /// Pull the Data Connect tables into the staging store
    #[arg(long)]
    extract: bool,
    /// Build the sequence-centric documents
    #[arg(long)]
    transform: bool,
    /// Index the documents and release the new index
    #[arg(long)]
    load: bool,
    /// Run every stage
    #[arg(long)]
    all: bool,
}

impl StageArgs {
    fn stages(&self) -> StageSet {
        if self.all {
            return StageSet::all();
        }
        [
            (self.extract, Stage::Extract),
            (self.transform, Stage::Transform),
            (self.load, Stage::Load),
        ]
        .into_iter()
        .filter_map(|(selected, stage)| selected.then_some(stage))
        .collect()
    }
}

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("centric_etl=info,centric_etl_repository=info"));

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "centric-etl",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "centric-etl",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

async fn run_once(deps: &Dependencies, stages: StageSet) -> Result<(), ServiceError> {
    let summary = deps.queue.submit_and_wait(stages, CLI_TRIGGER).await?;
    deps.queue.shutdown().await;

    if summary.succeeded() {
        info!(duration_ms = summary.duration, "Run completed successfully");
        Ok(())
    } else {
        Err(ServiceError::RunFailed(summary.errors.join("; ")))
    }
}

async fn serve(deps: &Dependencies) -> Result<(), ServiceError> {
    if deps.config.schedule_enabled {
        deps.schedule.activate();
    }

    let app = create_app(AppState {
        queue: deps.queue.clone(),
        schedule: deps.schedule.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], deps.config.server_port));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    };
    run_server(app, addr, shutdown).await?;

    deps.schedule.deactivate();
    deps.queue.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    // Reject an empty selection before touching any dependency
    if let Command::Run(args) = &cli.command {
        if args.stages().is_empty() {
            let e = ServiceError::RunRejected(
                "no stage selected, pass --extract, --transform, --load or --all".to_string(),
            );
            error!(error = %e, "Nothing to run");
            return Err(e);
        }
    }

    let config = match EtlConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to read configuration");
            return Err(e);
        }
    };

    info!("Starting Centric ETL");

    let deps = match Dependencies::new(config).await {
        Ok(deps) => deps,
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let result = match cli.command {
        Command::Run(args) => run_once(&deps, args.stages()).await,
        Command::Serve => serve(&deps).await,
    };

    match result {
        Ok(()) => {
            info!("Centric ETL stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Centric ETL failed");
            Err(e)
        }
    }
}
