use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursedesk::api::router;
use coursedesk::config::{AppConfig, StoreBackend};
use coursedesk::db::{Store, sqlite::run_migrations};
use coursedesk::records::RecordsHttpClient;
use coursedesk::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "coursedesk=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store = match &config.backend {
        StoreBackend::Sqlite { database_url } => {
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            run_migrations(&pool).await?;
            info!("using sqlite store at {}", database_url);
            Store::sqlite(pool)
        }
        StoreBackend::Memory => {
            info!("using in-memory store");
            Store::in_memory()
        }
        StoreBackend::Hosted(records) => {
            info!("using hosted record store at {}", records.api_url);
            let client = RecordsHttpClient::new(records.clone())?;
            Store::hosted(Arc::new(client))
        }
    };

    let addr = config.bind_addr;
    let app = router(AppState::new(store, config));

    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
