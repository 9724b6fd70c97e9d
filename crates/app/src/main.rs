use std::time::Duration;

use clap::Parser;
use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
use server::ServerOptions;
use settings::{LogFormat, Settings};

mod settings;

#[derive(Debug, Parser)]
#[command(name = "expense_api", version)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long, env = "EXPENSE_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let settings = Settings::new(args.config.as_deref())?;

    init_tracing(&settings.app);
    settings.log_loaded();

    let url = settings.database.connection_url()?;
    let db = match connect(url, settings.database.max_connections).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!("failed to connect to database: {err}");
            return Err(err.into());
        }
    };

    let engine = engine::Engine::builder().database(db).build().await?;
    engine.ping().await?;
    tracing::info!("successfully connected to database");

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return Err(err.into());
        }
    };

    tracing::info!(port = settings.server.port, "starting server");
    let options = ServerOptions {
        persist_created: settings.server.persist_created,
    };
    let grace = Duration::from_secs(settings.server.shutdown_timeout_secs);
    if let Err(err) =
        server::run_with_listener(engine, options, listener, shutdown_signal(), grace).await
    {
        tracing::error!("server failed: {err}");
        return Err(err.into());
    }

    Ok(())
}

fn init_tracing(app: &settings::App) {
    let filter = format!(
        "expense_api={level},server={level},engine={level},tower_http={level},sqlx={level}",
        level = app.level
    );
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match app.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

async fn connect(
    url: String,
    max_connections: Option<u32>,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url);
    options
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);
    if let Some(max) = max_connections {
        options.max_connections(max);
    }

    sea_orm::Database::connect(options).await
}

/// Resolves on CTRL+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL+C signal"),
        _ = terminate => tracing::info!("received SIGTERM signal"),
    }
}
