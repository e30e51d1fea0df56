#[macro_use]
extern crate tracing;

mod config;
mod controller;
mod error;
mod keys;
mod processor;
mod routes;
mod storage;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::{get, EndpointExt, Route, Server};
use poem_openapi::OpenApiService;

use crate::config::RuntimeConfig;
use crate::controller::StorageEngine;
pub use crate::storage::template::StorageBackend;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[clap(name = "picstore", about = "An image upload service with blur-up placeholders.", version)]
struct Cli {
    /// The maximum log level of the server.
    #[clap(long, env = "PICSTORE_LOG_LEVEL", default_value = "info")]
    log_level: tracing::Level,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Writes an example configuration file for the given backend.
    Init {
        /// The target storage backend (`local` or `object-store`).
        #[clap(short, long, default_value = "local")]
        backend: String,

        /// Where to write the example configuration.
        #[clap(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Runs the server with the given configuration.
    Run {
        /// The path to the config file in YAML or JSON format.
        #[clap(short, long, env = "PICSTORE_CONFIG", default_value = "config.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    match args.command {
        Commands::Init { backend, output } => run_init(&backend, &output).await,
        Commands::Run { config } => run_server(&config).await,
    }
}

async fn run_init(backend: &str, output: &Path) -> Result<()> {
    let example = RuntimeConfig::template(backend)?;
    tokio::fs::write(output, example).await?;

    info!(
        "Wrote an example {} configuration to {}",
        backend,
        output.display(),
    );
    Ok(())
}

async fn run_server(config_file: &Path) -> Result<()> {
    let cfg = RuntimeConfig::from_file(config_file)?;

    let backend = cfg.backend.connect().await?;
    info!("Storage backend connected @ {}", backend.location());

    let engine = Arc::new(StorageEngine::new(
        cfg.processing.clone(),
        cfg.max_upload_size,
        backend,
    ));

    let api = OpenApiService::new(
        routes::PicstoreApi {
            engine: engine.clone(),
        },
        "Picstore API",
        env!("CARGO_PKG_VERSION"),
    );
    let docs = api.redoc();

    let app = Route::new()
        .nest("/v1", api)
        .nest("/docs", docs)
        .at("/media/:year/:month/:key", get(routes::fetch_media))
        .data(engine)
        .with(Tracing);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    info!("Listening @ http://{}", addr);
    Server::new(TcpListener::bind(addr)).run(app).await?;

    Ok(())
}
