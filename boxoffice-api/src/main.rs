use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use boxoffice_api::{app, AppState};
use boxoffice_core::{BookingOrchestrator, BookingRepository, InMemoryBookingRepository};
use boxoffice_store::app_config::Config;
use boxoffice_store::{DbClient, RedisClient, StoreBookingRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "boxoffice_api=debug,boxoffice_core=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Boxoffice API on port {}", config.server.port);

    // Database Connection
    let repo: Arc<dyn BookingRepository> = match Config::non_empty(&config.database.url) {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            Arc::new(StoreBookingRepository::new(db.pool))
        }
        None => {
            tracing::warn!("No database configured, bookings are kept in memory only");
            Arc::new(InMemoryBookingRepository::new())
        }
    };
    tracing::warn!("Waiting lists are held in memory and do not survive a restart");

    let orchestrator = Arc::new(BookingOrchestrator::new(repo));
    let mut app_state = AppState::new(orchestrator);

    // Redis Connection
    match Config::non_empty(&config.redis.url) {
        Some(url) => {
            let redis = RedisClient::new(url)
                .await
                .context("Failed to connect to Redis")?;
            app_state = app_state.with_rate_limit(Arc::new(redis), config.rate_limit.clone());
        }
        None => tracing::info!("No Redis configured, rate limiting disabled"),
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
