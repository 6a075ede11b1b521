//! vocal-split: media ingestion and stem separation service.
//!
//! Starts the HTTP server, the startup update check and the optional
//! browser launch, then serves until Ctrl+C or SIGTERM.

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vocal_split::api::{build_router, AppState};
use vocal_split::browser::{spawn_open_browser, OPEN_DELAY};
use vocal_split::cli::Cli;
use vocal_split::config::ServiceConfig;
use vocal_split::pipeline::Pipeline;
use vocal_split::types::DisplayNames;
use vocal_split::update::spawn_update_check;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServiceConfig::from_env();
    cli.apply_to(&mut config);
    if let Some(err) = config.validate() {
        bail!("invalid configuration: {}", err);
    }

    let names = DisplayNames::standard();
    if let Some(err) = names.validate() {
        bail!("invalid display name table: {}", err);
    }

    let pipeline =
        Pipeline::from_config(&config, names).context("Failed to build the pipeline")?;
    pipeline
        .store()
        .ensure_roots()
        .context("Failed to create artifact directories")?;

    info!(
        tmp_dir = %pipeline.store().tmp_dir().display(),
        files_dir = %pipeline.store().files_dir().display(),
        identity = %config.job_identity,
        "artifact store ready"
    );
    match pipeline.registry().installed_models() {
        Ok(models) if models.is_empty() => warn!(
            model_dir = %pipeline.registry().model_dir().display(),
            "no separation models installed"
        ),
        Ok(models) => info!(?models, "separation models installed"),
        Err(e) => warn!(error = %e, "could not list separation models"),
    }

    let state = AppState::new(pipeline, &config);
    let cancel = CancellationToken::new();
    let mut background = Vec::new();

    if let Some(url) = config.update_url.clone() {
        background.push(spawn_update_check(
            url,
            state.update_notice.clone(),
            cancel.clone(),
        ));
    }

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.address))?;

    let public_url = config.effective_public_url();
    info!(address = %config.address, public_url = %public_url, "starting HTTP server");

    if config.open_browser {
        if state.static_dir.is_some() {
            background.push(spawn_open_browser(
                format!("{}/static/", public_url),
                OPEN_DELAY,
                cancel.clone(),
            ));
        } else {
            warn!("--open-browser needs a static directory to show, skipping");
        }
    }

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    for handle in background {
        if let Err(e) = handle.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
