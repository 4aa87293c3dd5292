use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use peergate::configuration::get_configuration;
use peergate::directory::PgUserDirectory;
use peergate::email_client::HttpEmailSender;
use peergate::invites::{PgInviteStore, PgReviewerRegistry};
use peergate::startup::{run, Dependencies};
use peergate::store::InMemoryKeyValueStore;
use peergate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting peergate");

    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let mailer = HttpEmailSender::new(
        configuration.email.base_url.clone(),
        configuration.email.sender.clone(),
        reqwest::Client::new(),
    );

    let deps = Dependencies {
        kv_store: Arc::new(InMemoryKeyValueStore::new()),
        users: Arc::new(PgUserDirectory::new(pool.clone())),
        mailer: Arc::new(mailer),
        invites: Arc::new(PgInviteStore::new(pool.clone())),
        registry: Arc::new(PgReviewerRegistry::new(pool)),
    };

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        configuration.application.clone(),
        configuration.jwt.clone(),
        deps,
    )?;

    server.await
}
