mod cleanup;
mod config;
mod error;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use ledgerport_pipeline::{Dispatcher, TaskStore};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use config::{LogFormat, ServerConfig};
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("loading configuration")?;
    let _log_guard = init_tracing(&config)?;

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;

    let dispatcher = Dispatcher::new(TaskStore::new(), config.max_concurrent, config.pacing());
    let state = Arc::new(AppState {
        dispatcher,
        work_dir: config.work_dir.clone(),
        static_dir: config.static_dir.clone(),
    });

    // ── Retention sweep ───────────────────────────────────────────────────────
    let _sweeper = cleanup::spawn(
        config.work_dir.clone(),
        config.retention(),
        config.cleanup_interval(),
    );

    let app = routes::router(state, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(config.bind.as_str())
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(
        "ledgerport listening on http://{} (work dir {}, {} concurrent conversions)",
        config.bind,
        config.work_dir.display(),
        config.max_concurrent
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("ledgerport stopped");
    Ok(())
}

/// Console output (plain or bunyan JSON) plus, when `log_dir` is set, a
/// daily-rotated `app.<date>.log`. The guard flushes the file writer on drop.
fn init_tracing(config: &ServerConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.trim().to_lowercase()));

    let (file_layer, guard) = match config.log_dir() {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("app")
                .filename_suffix("log")
                .build(dir)
                .with_context(|| format!("opening log dir {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console: Box<dyn Layer<Registry> + Send + Sync> = match config.log_format {
        LogFormat::Plain => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => JsonStorageLayer
            .and_then(BunyanFormattingLayer::new(
                env!("CARGO_PKG_NAME").to_string(),
                std::io::stdout,
            ))
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(console.and_then(file_layer))
        .with(filter)
        .init();
    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
