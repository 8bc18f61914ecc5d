//! Paywall billing worker.
//!
//! Loads configuration, prepares the database and relays outbox events
//! (confirmation emails among them) until interrupted.

use std::sync::Arc;

use paywall_billing::adapters::notification::ORDER_CONFIRMED;
use paywall_billing::adapters::{
    ConfirmationMailer, InMemoryEventBus, LoggingNotifier, OutboxPublisher, PostgresAccountLookup,
    PostgresOutbox,
};
use paywall_billing::config::{AppConfig, LoggingConfig};
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let bus = Arc::new(InMemoryEventBus::new());
    bus.subscribe(
        ORDER_CONFIRMED,
        Arc::new(ConfirmationMailer::new(
            Arc::new(PostgresAccountLookup::new(pool.clone())),
            Arc::new(LoggingNotifier),
        )),
    );

    let outbox = Arc::new(PostgresOutbox::new(pool.clone(), config.outbox.max_attempts));
    let publisher = OutboxPublisher::with_config(outbox, bus, config.outbox.publisher_config());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = tokio::spawn(async move { publisher.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    shutdown_tx.send(true)?;

    relay.await??;
    pool.close().await;
    Ok(())
}
