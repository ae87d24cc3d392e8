use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uptime_monitor::config::ServerConfig;
use uptime_monitor::db::{self, SqliteStore, services as db_services};
use uptime_monitor::monitor::{MonitorLoop, MonitorSupervisor};
use uptime_monitor::notifications::{Notifier, TelegramSender};
use uptime_monitor::probes::DefaultProbeFactory;
use uptime_monitor::settings::SettingsHandle;
use uptime_monitor::web::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "uptime.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sqlx=warn` if RUST_LOG is not set.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    dotenv().ok();

    let config = ServerConfig::load(args.config.as_deref())?;
    init_logging(&config.log_dir);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %config.listen_addr,
        telegram = config.telegram.is_some(),
        "Starting uptime monitor."
    );

    // --- Database Setup ---
    let db_pool = match db::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to initialize the database.");
            return Err(e.into());
        }
    };
    db_services::seed_default_targets(&db_pool).await?;
    let settings = SettingsHandle::new(db_services::load_settings(&db_pool).await?);

    // --- Monitor Setup ---
    let transport = Arc::new(TelegramSender::new(config.telegram.clone()));
    let notifier = Arc::new(Notifier::new(transport));
    let store = Arc::new(SqliteStore::new(db_pool.clone()));
    let probes = Arc::new(DefaultProbeFactory);

    let monitor = MonitorLoop::new(store.clone(), store, notifier.clone(), settings.clone())
        .with_probe_factory(probes.clone());
    let supervisor = MonitorSupervisor::new(monitor);
    supervisor.start().await;

    // --- HTTP Server Setup ---
    let app_state = Arc::new(AppState {
        db_pool,
        settings,
        reset: supervisor.reset_signal(),
        notifier,
        probes,
    });
    let router = web::create_router(app_state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening.");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal.");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received.");
        })
        .await?;

    supervisor.shutdown().await;
    Ok(())
}
