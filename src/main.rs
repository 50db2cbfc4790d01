use axum::{extract::Request, ServiceExt};
use sqlx::postgres::PgPoolOptions;
use teller_quoter::{cache::start_cache_warmer, config::Config, seed, service, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teller_quoter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting Teller Quoter ({})", config.environment);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    if config.seed_on_startup {
        seed::seed(&pool).await?;
    }

    let addr = config.bind_addr()?;
    let state = AppState::new(pool, config);

    tokio::spawn(start_cache_warmer(state.cache.clone(), state.db.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service(service(state)),
    )
    .await?;

    Ok(())
}
