//! Standalone REST server for a MySQL schema.

use anyhow::Context;
use axum::Router;
use axum_auto_rest::{AutoRestConfig, AutoRestLayer, MySqlProvider};
use clap::Parser;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Serve the tables, views, procedures and functions of a MySQL schema over HTTP.
#[derive(Debug, Parser)]
#[command(name = "auto-rest-server")]
#[command(about = "REST endpoints generated from a MySQL schema")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind; the port comes from the configuration file.
    #[arg(short, long, default_value = "0.0.0.0")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AutoRestConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    info!(
        mode = ?config.mode,
        host = %config.mysql.host,
        database = %config.mysql.database,
        "Starting auto-rest server"
    );

    let database = MySqlProvider::connect(&config.mysql)
        .await
        .context("connecting to MySQL")?;

    // Nothing is served unless the whole catalog loaded.
    let layer = AutoRestLayer::build(database, &config)
        .await
        .context("generating routes")?;
    info!(routes = layer.routes().len(), "Routes generated");

    let app = Router::new()
        .merge(layer.into_router())
        .layer(TraceLayer::new_for_http());

    let address = format!("{}:{}", args.listen, config.express.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    info!(
        "Listening on {}",
        config.express.public_url("").trim_end_matches('/')
    );

    axum::serve(listener, app).await?;

    Ok(())
}
