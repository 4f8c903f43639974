use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{BoxError, Router};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod jobs;
mod logging;
mod queue;
mod routes;
mod services;

use config::Config;
use jobs::JobBus;
use queue::redis::RedisTimeQueue;
use services::sender::SmtpSender;
use services::{EventService, NotifyService, Worker};

#[derive(Parser, Debug)]
#[command(name = "calendar-reminder")]
struct Cli {
    /// Path to a YAML config file. Overrides CONFIG_PATH and the default
    /// configs/config.yaml lookup.
    #[arg(long)]
    config: Option<PathBuf>,
}

pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
    pub event_service: Arc<EventService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.env.default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting calendar reminder service");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.storage.connection_url())
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let queue_backend = Arc::new(RedisTimeQueue::connect(&config.queue.connection_url()).await?);
    let sender_backend = Arc::new(SmtpSender::new(&config.smtp)?);

    let uow = db::UnitOfWork::new(pool.clone());
    let worker = Arc::new(Worker::new(
        uow.clone(),
        queue_backend,
        sender_backend,
        &config.worker,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (job_bus, job_receiver) = JobBus::new(jobs::MIN_CAPACITY, shutdown_rx.clone());
    let event_service = Arc::new(EventService::new(uow, job_bus));
    let notify_service = Arc::new(NotifyService::new(worker.clone()));

    tokio::spawn(worker.clone().run(shutdown_rx.clone()));
    tokio::spawn(notify_service.run(job_receiver, shutdown_rx.clone()));

    let app_state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        event_service,
    });

    let request_timeout = Duration::from_secs(config.server.timeout_seconds);
    let app = Router::new()
        .route("/health", axum::routing::get(routes::health::health_check))
        .nest("/events", routes::events::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(request_timeout),
        );

    let addr = format!("0.0.0.0:{}", config.server.port);
    tracing::info!("server listening on {}", addr);

    let idle_timeout = Duration::from_secs(config.server.idle_timeout_seconds);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx));

    tokio::select! {
        result = server => result?,
        _ = grace_period_elapsed(shutdown_rx, idle_timeout) => {
            tracing::warn!("idle connections did not drain within the grace period, exiting");
        }
    }

    Ok(())
}

/// Handles errors `tower::timeout::TimeoutLayer` raises when a request
/// exceeds `server.timeout_seconds`; any other error passed through
/// `HandleErrorLayer` is treated as unexpected.
async fn handle_timeout_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "unhandled internal error")
    }
}

/// Resolves once shutdown has fired and `idle_timeout` has since elapsed,
/// bounding how long the server waits for in-flight connections to drain
/// before the process exits regardless.
async fn grace_period_elapsed(mut shutdown: watch::Receiver<bool>, idle_timeout: Duration) {
    if !*shutdown.borrow() && shutdown.changed().await.is_err() {
        return;
    }
    tokio::time::sleep(idle_timeout).await;
}

/// Waits for Ctrl+C, then flips the shutdown flag every spawned task
/// selects against, letting in-flight ticks and job handlers finish before
/// the process exits.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl_c handler");
        return;
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
