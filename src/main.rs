// src/main.rs
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenvy::dotenv;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use voltpay::config::{Config, StorageBackend};
use voltpay::db::memory::MemoryStore;
use voltpay::db::postgres::PgStore;
use voltpay::db::{PaymentStore, UserStore};
use voltpay::plans::PlanCatalog;
use voltpay::{api, docs, AppState};

type Stores = (Arc<dyn PaymentStore>, Arc<dyn UserStore>);

async fn open_stores(config: &Config) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.storage {
        StorageBackend::Memory => {
            log::warn!("STORAGE=memory: payments and accounts are lost on restart");
            let store = Arc::new(MemoryStore::default());
            let payments: Arc<dyn PaymentStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            Ok((payments, users))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set")?;
            let store = Arc::new(PgStore::new(PgPool::connect(url).await?));
            store.migrate().await?;
            let payments: Arc<dyn PaymentStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            Ok((payments, users))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let catalog = match &config.plans_file {
        Some(path) => PlanCatalog::from_json_file(path)?,
        None => PlanCatalog::default(),
    };
    log::info!("loaded {} plans", catalog.plans().len());

    let (payments, users) = open_stores(&config).await?;
    let state = web::Data::new(AppState::new(
        Arc::new(catalog),
        payments,
        users,
        config.auth.clone(),
    ));

    log::info!("listening on {}:{}", config.host, config.port);

    let cors_origins = config.cors_origins.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(api::cors(&cors_origins))
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            .configure(api::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
