// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{anyhow, Result};
use kube::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cert_trust::config::Config;
use cert_trust::health::serve_health;
use cert_trust::kubernetes::{identity_from_env, wait_for_certificate_crds, KubeStore, LeaderElector};
use cert_trust::sync::SyncManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting cert-trust operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: reschedule_interval={}s, default_schedule='{}', immediate_sync_on_start={}",
        config.reschedule_interval.as_secs(),
        config.default_schedule,
        config.immediate_sync_on_start
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    if config.wait_for_crds {
        info!("Waiting for certificate CRDs to become available...");
        wait_for_certificate_crds(&client).await?;
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let health_address = config.health_probe_address;
    let health_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = serve_health(health_address, health_shutdown).await {
            error!("Health probe server failed: {}", e);
        }
    });

    let guard = if config.leader_elect {
        let namespace = config
            .leader_election_namespace
            .clone()
            .unwrap_or_else(|| client.default_namespace().to_string());
        let elector = Arc::new(LeaderElector::new(client.clone(), &namespace, &identity_from_env()));
        match elector.acquire(&shutdown).await {
            Some(guard) => Some(guard),
            None => {
                info!("Shutdown requested before leadership was acquired");
                return Ok(());
            }
        }
    } else {
        None
    };

    // Losing the lease stops the scheduler like a shutdown does
    let scheduler = shutdown.child_token();
    if let Some(lost) = guard.as_ref().map(|g| g.lost()) {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            lost.cancelled().await;
            scheduler.cancel();
        });
    }

    let store = Arc::new(KubeStore::new(client));
    SyncManager::new(store, config).run(scheduler).await?;

    if let Some(guard) = guard {
        let lost = guard.lost().is_cancelled();
        if let Err(e) = guard.release().await {
            warn!("Failed to release leader lease: {}", e);
        }
        if lost {
            shutdown.cancel();
            return Err(anyhow!("leader lease lost"));
        }
    }

    shutdown.cancel();
    info!("cert-trust operator stopped");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    shutdown.cancel();
}
