use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::api;
use pulse::cli;
use pulse::membership::{DecaySweeper, MembershipTable, SweepPolicy};
use pulse::presentation::{self, NoopPresenter, Presenter, WatchPresenter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let settings = cli::Cli::parse().into_settings()?;
    let socket_address = settings.socket_address()?;

    let presenter: Arc<dyn Presenter> = if settings.render_table {
        let (presenter, rx) = WatchPresenter::channel();
        let _renderer = presentation::spawn_console_renderer(rx);
        Arc::new(presenter)
    } else {
        Arc::new(NoopPresenter)
    };

    // One table for the whole process, shared by intake and the sweeper
    let table = Arc::new(MembershipTable::new());
    let sweeper = Arc::new(DecaySweeper::new(
        table.clone(),
        SweepPolicy::from(&settings.detector),
        settings.detector.sweep_interval(),
        presenter.clone(),
    ));
    let mut sweeper_handle = sweeper.spawn();

    let state = api::AppState::new(table, &settings.detector, presenter);
    let app = api::api(state);

    info!("Serving heartbeat RPC on {}", socket_address);
    let server = axum::Server::try_bind(&socket_address)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        served = server => {
            served?;
            sweeper_handle.stop().await?;
            info!("Coordinator shut down");
        }
        swept = sweeper_handle.wait() => {
            // The sweeper only ends by itself when the table is corrupt
            if let Err(err) = swept {
                error!("Exiting: {}", err);
                return Err(err.into());
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
