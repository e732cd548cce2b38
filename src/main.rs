use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_subscriber::EnvFilter;

use conversio_studio::config::{Config, VerificationScheme};
use conversio_studio::db;
use conversio_studio::routes;
use conversio_studio::services::code_sender::{CodeSender, LogCodeSender, WebhookCodeSender};
use conversio_studio::services::media_relay::MediaRelay;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("conversio_studio=debug,actix_web=info")),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("❌ Invalid configuration: {}", e);
        io::Error::other(e)
    })?;
    if config.verification_scheme == VerificationScheme::Identity {
        tracing::warn!("⚠️  VERIFICATION_SCHEME=identity: the expected code is the user id");
    }

    tracing::info!("🔌 Connecting to database...");
    let db = db::establish_connection(&config)
        .await
        .map_err(|e| io::Error::other(format!("Failed to connect to database: {}", e)))?;
    tracing::info!("✅ Database connected!");

    let relay = MediaRelay::http(config.storage.clone(), config.relay_timeout, config.relay_max_bytes)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let sender: Arc<dyn CodeSender> = match config.verification_webhook_url.clone() {
        Some(url) => Arc::new(
            WebhookCodeSender::new(url, config.relay_timeout)
                .map_err(|e| io::Error::other(e.to_string()))?,
        ),
        None => Arc::new(LogCodeSender),
    };

    let db = web::Data::new(db);
    let relay = web::Data::new(relay);
    let sender = web::Data::from(sender);
    let bind_addr = config.bind_addr.clone();
    let config = web::Data::new(config);

    tracing::info!("🚀 Starting server on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(relay.clone())
            .app_data(sender.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
