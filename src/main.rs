// src/main.rs
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use apolo_chf::api;
use apolo_chf::config::AppConfig;
use apolo_chf::context::ChfContext;
use apolo_chf::database::{create_pool, MemoryRecordStore, PgRecordStore, RecordStore};
use apolo_chf::peers::{methods, AccountClient, PeerClient, RatingClient};
use apolo_chf::services::{ChargingProcessor, RecordExporter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("🚀 Starting Apolo CHF (Rust)");

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!("Node: {} ({})", config.sbi.node_name, config.sbi.uri);

    let rating_client =
        PeerClient::from_config(&config.rating).context("Failed to create rating client")?;
    let account_client =
        PeerClient::from_config(&config.account).context("Failed to create account client")?;

    // Peers may come up after us; an unanswered ping only warns
    report_peer(&rating_client, methods::RATING_PING, &config.rating.url).await;
    report_peer(&account_client, methods::ACCOUNT_PING, &config.account.url).await;

    let rating: Arc<dyn RatingClient> = Arc::new(rating_client);
    let accounts: Arc<dyn AccountClient> = Arc::new(account_client);

    let store: Arc<dyn RecordStore> = match config.database.url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.database.max_connections)
                .await
                .context("Failed to create database pool")?;
            info!("✅ Database pool created");
            Arc::new(PgRecordStore::new(pool))
        }
        None => {
            info!("⚠️  No database configured, records kept in memory");
            Arc::new(MemoryRecordStore::new())
        }
    };

    let exporter = Arc::new(
        RecordExporter::start(&config.gateway).context("Failed to start record exporter")?,
    );

    let bind_address = config.server_addr();
    let workers = config.server.workers;
    let context = Arc::new(ChfContext::new(config));
    let processor = Arc::new(ChargingProcessor::new(
        context,
        rating,
        accounts,
        store,
        Arc::clone(&exporter),
    ));

    info!("🌐 Starting HTTP server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(web::Data::new(processor.clone()))
            .configure(api::routes::configure)
    })
    .workers(workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    exporter.shutdown().await;
    info!("🛑 Apolo CHF stopped");

    Ok(())
}

async fn report_peer(client: &PeerClient, ping: &str, url: &str) {
    match client.health_check(ping).await {
        Ok(true) => info!("✅ Peer {} answered {}", url, ping),
        Ok(false) => warn!("⚠️  Peer {} answered {} without Pong", url, ping),
        Err(e) => warn!("⚠️  Peer {} not reachable: {}", url, e),
    }
}
