//! Products microservice - NATS RPC server

use core_config::FromEnv;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_products::{PgProductRepository, ProductService};
use eyre::WrapErr;
use products_ms::config::AppConfig;
use products_ms::health::{self, HealthState};
use products_ms::messaging::NatsBroker;
use products_ms::server::RpcServer;
use products_ms::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = AppConfig::from_env().wrap_err("Invalid configuration")?;
    init_tracing(&config.environment);

    info!(
        servers = ?config.nats.servers,
        prefix = %config.subject_prefix,
        "Starting products microservice"
    );

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;

    let broker = Arc::new(NatsBroker::connect(&config.nats.servers, "products-ms").await?);
    info!("Connected to NATS");

    let shutdown = ShutdownCoordinator::new();
    let health_state = HealthState::new();

    let health_server = tokio::spawn({
        let server_config = config.server.clone();
        let state = health_state.clone();
        let shutdown = shutdown.clone();
        async move { health::serve(&server_config, state, shutdown).await }
    });

    let monitor = tokio::spawn(health::monitor(
        health_state,
        db.clone(),
        Arc::clone(&broker),
        HEALTH_CHECK_INTERVAL,
        shutdown.clone(),
    ));

    let signals = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.wait_for_signal().await }
    });

    let service = ProductService::new(PgProductRepository::new(db.clone()));
    let server = RpcServer::new(
        Arc::clone(&broker),
        service,
        config.subject_prefix.clone(),
        config.queue_group.clone(),
    );

    let result = server.run(shutdown.clone()).await;
    if let Err(ref e) = result {
        error!(error = %e, "RPC server failed");
    }

    // stop the probes and signal listener whichever way the server ended
    shutdown.shutdown();
    let _ = monitor.await;
    signals.abort();
    match health_server.await {
        Ok(Err(e)) => error!(error = %e, "Health server failed"),
        Err(e) => error!(error = %e, "Health server task panicked"),
        Ok(Ok(())) => {}
    }

    info!("Shutting down: closing PostgreSQL connections");
    database::postgres::close(db).await?;

    result?;
    info!("Products microservice shutdown complete");
    Ok(())
}
