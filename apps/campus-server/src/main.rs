mod handlers;
mod metrics;
mod server;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use tonic::transport::Server;
use tracing::info;

use campus_proto::campus_service_server::CampusServiceServer;
use campus_store_sqlite::SqliteStore;
use server::CampusServer;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "campus-server")]
#[command(about = "Campus server CLI for serving the student-community API")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gRPC server
    Serve {
        /// Server address
        #[arg(long, default_value = "0.0.0.0:50051")]
        addr: String,

        /// Health check HTTP server address
        #[arg(long, default_value = "0.0.0.0:8080")]
        health_addr: String,
    },
}

// ────────────────────────────────────── Serve ──────────────────────────────────────

#[derive(Clone)]
struct HealthState {
    ready: tokio::sync::watch::Receiver<bool>,
    metrics: PrometheusHandle,
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn readiness_handler(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> Result<&'static str, axum::http::StatusCode> {
    // Check if gRPC server is ready
    if *state.ready.borrow() {
        Ok("ok")
    } else {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> String {
    state.metrics.render()
}

async fn shutdown_signal(readiness_tx: tokio::sync::watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
    }

    // Mark not ready on shutdown for clean traffic drain
    let _ = readiness_tx.send(false);
}

async fn cmd_serve(
    database_url: Option<String>,
    addr: &str,
    health_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db_url = database_url.unwrap_or_else(|| "sqlite://campus.db?mode=rwc".to_string());

    let store = Arc::new(SqliteStore::open(&db_url).await?);
    let server = CampusServer::new(store);

    let metrics_handle = metrics::init_metrics();

    // gRPC health service (implements the gRPC health checking protocol)
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CampusServiceServer<CampusServer>>()
        .await;

    // HTTP endpoints for liveness/readiness probes and Prometheus scraping
    let (readiness_tx, readiness_rx) = tokio::sync::watch::channel(false);
    let health_router = Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(HealthState {
            ready: readiness_rx,
            metrics: metrics_handle,
        });

    let grpc_listener = tokio::net::TcpListener::bind(addr).await?;
    let grpc_actual_addr = grpc_listener.local_addr()?;

    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    let health_actual_addr = health_listener.local_addr()?;

    info!("CampusServer listening on {}", grpc_actual_addr);
    info!("Health checks listening on {}", health_actual_addr);

    let _ = readiness_tx.send(true);

    // Broadcast channel for shutdown signaling
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let shutdown_tx_clone = shutdown_tx.clone();

    tokio::spawn(async move {
        shutdown_signal(readiness_tx).await;
        let _ = shutdown_tx_clone.send(());
    });

    // Health check server with graceful shutdown
    let mut shutdown_rx1 = shutdown_tx.subscribe();
    let health_server =
        axum::serve(health_listener, health_router).with_graceful_shutdown(async move {
            let _ = shutdown_rx1.recv().await;
        });

    // gRPC server with graceful shutdown - includes the health service
    let mut shutdown_rx2 = shutdown_tx.subscribe();
    let grpc_server = Server::builder()
        .add_service(health_service)
        .add_service(CampusServiceServer::new(server))
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(grpc_listener),
            async move {
                let _ = shutdown_rx2.recv().await;
            },
        );

    // Run both servers concurrently - ensure both complete their shutdown sequences
    let (grpc_result, health_result) = tokio::join!(grpc_server, health_server);

    grpc_result?;
    health_result?;

    Ok(())
}

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { addr, health_addr } => {
            cmd_serve(cli.database_url, &addr, &health_addr).await
        }
    }
}
