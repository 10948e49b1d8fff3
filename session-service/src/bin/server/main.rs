use std::sync::Arc;

use auth::JwtHandler;
use auth::PasswordHasher;
use axum::Router;
use session_service::app::create_application;
use session_service::config::Config;
use session_service::config::DatabaseBackend;
use session_service::repositories::InMemoryRefreshTokenStore;
use session_service::repositories::InMemoryUserDirectory;
use session_service::repositories::PostgresRefreshTokenStore;
use session_service::repositories::PostgresUserDirectory;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "session-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        backend = ?config.database.backend,
        http_port = config.server.http_port,
        access_expiration_ms = config.jwt.access_expiration_ms,
        refresh_expiration_ms = config.jwt.refresh_expiration_ms,
        rotate_refresh_tokens = config.session.rotate_refresh_tokens,
        "Configuration loaded"
    );

    let jwt_handler = Arc::new(JwtHandler::new(config.jwt.secret.as_bytes())?);
    let password_hasher = PasswordHasher::new(config.password.hash_cost())?;
    let policy = config.session_policy();

    let http_application: Router = match config.database.backend {
        DatabaseBackend::Postgres => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            create_application(
                Arc::new(PostgresUserDirectory::new(pg_pool.clone())),
                Arc::new(PostgresRefreshTokenStore::new(pg_pool)),
                jwt_handler,
                password_hasher,
                policy,
            )
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory storage; all data is lost on shutdown");

            create_application(
                Arc::new(InMemoryUserDirectory::new()),
                Arc::new(InMemoryRefreshTokenStore::new()),
                jwt_handler,
                password_hasher,
                policy,
            )
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
