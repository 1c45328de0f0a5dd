//! # glowhubd: glowhub daemon
//!
//! Composition root that wires the core components and adapters together
//! and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Construct the event bus, registry, hub and group service
//! - Start the background tasks (cleanup sweep, discovery)
//! - Build the axum router and serve it
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use glowhub_adapter_http_axum::state::AppState;
use glowhub_adapter_virtual::VirtualDiscovery;
use glowhub_app::discovery::DiscoveryRunner;
use glowhub_app::event_bus::{EventBus, LogSink, Sink};
use glowhub_app::hub::BroadcastHub;
use glowhub_app::lifecycle::Lifecycle;
use glowhub_app::ports::JsonEncoder;
use glowhub_app::registry::DeviceRegistry;
use glowhub_app::services::group_service::GroupService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let lifecycle = Arc::new(Lifecycle::new());

    // Core
    let bus = EventBus::new();
    let log_subscription = bus.subscribe(Sink::Log(LogSink));
    let registry = DeviceRegistry::new(bus.clone());
    let hub = BroadcastHub::start(&bus, JsonEncoder, config.hub_config(), lifecycle.signal());
    let group_service = GroupService::new(registry.clone(), bus.clone());

    // Background tasks
    let mut tasks = vec![registry.start_cleanup(
        config.cleanup_interval(),
        config.device_timeout(),
        lifecycle.signal(),
    )];
    if config.integrations.virtual_enabled {
        let runner = DiscoveryRunner::new(
            VirtualDiscovery::mirroring(&bus),
            registry.clone(),
            config.virtual_interval(),
        );
        tasks.push(runner.start(lifecycle.signal()));
    }

    // HTTP
    let state = AppState::new(registry, group_service, hub.clone());
    let app = glowhub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "glowhubd listening");

    let trigger = Arc::clone(&lifecycle);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            tracing::info!("shutdown requested");
            // closing the hub first lets upgraded sockets finish
            trigger.trigger();
        })
        .await;

    lifecycle.trigger();
    hub.shutdown().await;
    for task in tasks {
        if let Err(err) = task.await {
            tracing::warn!(error = %err, "background task failed");
        }
    }
    log_subscription.unsubscribe();
    tracing::info!("glowhubd stopped");

    served.context("server error")
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
