//! Encore Rentals backend binary.
//!
//! Wires configuration, the database pool, the HTTP routers and the
//! expiration scheduler together, then serves until interrupted.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use encore_rentals::adapters::email::ResendDispatcher;
use encore_rentals::adapters::http::admin::{admin_routes, AdminAppState};
use encore_rentals::adapters::http::payment::{payment_routes, PaymentAppState};
use encore_rentals::adapters::postgres::{PostgresInstallmentRepository, PostgresOrderStore};
use encore_rentals::application::expiration::{ExpirationScheduler, ExpirationService};
use encore_rentals::config::AppConfig;
use encore_rentals::domain::gateway::RedsysGateway;
use encore_rentals::domain::installments::InstallmentPlanner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "Starting Encore Rentals backend"
    );

    // Database
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Adapters
    let store = Arc::new(PostgresOrderStore::new(pool.clone()));
    let installments = Arc::new(PostgresInstallmentRepository::new(pool.clone()));
    let notifier = Arc::new(ResendDispatcher::new(&config.email));
    let gateway = Arc::new(RedsysGateway::from_config(&config.gateway)?);
    let planner = InstallmentPlanner::new(config.installments.policy());

    // Expiration service and scheduler
    let expiration = Arc::new(ExpirationService::new(
        store.clone(),
        notifier.clone(),
        config.lifecycle.expiration_minutes,
    ));
    let scheduler = Arc::new(ExpirationScheduler::new(
        expiration.clone(),
        &config.lifecycle,
    ));
    scheduler.start();

    // HTTP surface
    let payment_state = PaymentAppState {
        store: store.clone(),
        installments,
        notifier,
        gateway,
        planner,
    };
    let admin_state = AdminAppState {
        expiration,
        scheduler: scheduler.clone(),
    };

    let app = Router::new()
        .nest("/api/payments", payment_routes().with_state(payment_state))
        .nest("/api/admin", admin_routes().with_state(admin_state))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight sweep finish before the process exits.
    scheduler.stop();
    tokio::time::sleep(Duration::from_millis(100)).await;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
