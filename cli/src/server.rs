// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server mode
//!
//! Wires repositories, the status publisher and the application services from
//! configuration, then serves the API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use proposal_desk_core::application::publisher_factory::create_event_publisher;
use proposal_desk_core::application::repository_factory::create_repositories;
use proposal_desk_core::application::{StandardContractingService, StandardProposalService, StatusEventNotifier};
use proposal_desk_core::domain::service_config::{MessagingKind, ServiceConfigManifest};
use proposal_desk_core::infrastructure::event_bus::EventBus;
use proposal_desk_core::presentation::api::{app, AppState};

pub async fn start_server(
    mut config: ServiceConfigManifest,
    bind_override: Option<String>,
    port_override: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind_override {
        config.spec.http.bind_address = bind;
    }
    if let Some(port) = port_override {
        config.spec.http.port = port;
    }

    config.validate().context("Configuration validation failed")?;

    info!(
        "Starting Proposal Desk v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.metadata.name
    );

    if config.spec.observability.metrics.enabled {
        install_metrics_exporter(config.spec.observability.metrics.port)?;
    }

    let backend = config.storage_backend()?;
    let repositories = create_repositories(&backend)
        .await
        .context("Failed to initialize repositories")?;

    let messaging = &config.spec.messaging;
    let event_bus = EventBus::new(messaging.bus_capacity);
    let publisher = create_event_publisher(messaging, &event_bus)?;
    if messaging.backend == MessagingKind::InProcess {
        spawn_event_logger(&event_bus);
    }
    let notifier = Arc::new(StatusEventNotifier::new(publisher, messaging.topic.clone()));

    let policy = config.spec.lifecycle.transition_policy;
    info!(?policy, "Status transition policy");

    let proposal_service = Arc::new(StandardProposalService::new(
        repositories.proposals.clone(),
        repositories.contracts.clone(),
        notifier.clone(),
        policy,
    ));
    let contracting_service = Arc::new(StandardContractingService::new(
        repositories.proposals,
        repositories.contracts,
        notifier,
    ));

    let router = app(AppState::new(proposal_service, contracting_service));

    let addr = format!("{}:{}", config.spec.http.bind_address, config.spec.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Proposal Desk listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Proposal Desk shutting down");

    Ok(())
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

/// Without an external receiver, the in-process bus is only observable
/// through the log.
fn spawn_event_logger(event_bus: &EventBus) {
    let mut receiver = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => info!(topic = %event.topic, payload = %event.payload, "Status event"),
                Err(proposal_desk_core::infrastructure::event_bus::EventBusError::Lagged(n)) => {
                    warn!("Event logger skipped {} events", n);
                }
                Err(_) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
