mod config;
mod db;
mod error;
mod repository;
mod routes;
mod services;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::db::DbError;
use crate::db::migrate;
use crate::error::ErrorCode;
use crate::repository::PgUserRepository;
use crate::services::user::UserService;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("server i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for StartupError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Db(e) => e.error_code(),
            Self::Io(_) => "E_IO",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal outside local development.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.error_code(), "users-api exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let pool = db::Pool::create(&config.database_url, &config.pool).await?;

    // The pool is released on every path out of `serve`, including failed migrations.
    let served = serve(&config, &pool).await;
    pool.shutdown().await;
    served
}

async fn serve(config: &AppConfig, pool: &db::Pool) -> Result<(), StartupError> {
    let migrated = if config.run_migrations {
        migrate::run(pool).await?
    } else {
        migrate::ensure_current(pool).await?
    };
    migrate::apply_email_policy(&migrated, config.email_uniqueness).await?;

    let repo = Arc::new(PgUserRepository::new(&migrated));
    let state = state::AppState::new(UserService::new(repo), config.duplicate_email_status);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;

    info!(port = config.port, max_connections = pool.config().max_connections, "users-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped, draining pool");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
