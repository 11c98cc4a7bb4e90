// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Leader election over a coordination.k8s.io/v1 Lease.
//!
//! The schedule table is single-writer, so with more than one replica only
//! the Lease holder may run it. Writes carry the resourceVersion that was
//! read, so two replicas racing for an expired Lease cannot both win: the
//! loser gets a 409 and keeps waiting.

use crate::constants::leader::{
    LEASE_DURATION_SECS, LEASE_NAME, RENEW_INTERVAL_SECS, RETRY_INTERVAL_SECS,
};
use crate::error::Result;
use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::{ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct LeaderElector {
    client: Client,
    namespace: String,
    identity: String,
    lease_duration: Duration,
    renew_interval: Duration,
    retry_interval: Duration,
}

impl LeaderElector {
    pub fn new(client: Client, namespace: &str, identity: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            identity: identity.to_string(),
            lease_duration: Duration::from_secs(LEASE_DURATION_SECS),
            renew_interval: Duration::from_secs(RENEW_INTERVAL_SECS),
            retry_interval: Duration::from_secs(RETRY_INTERVAL_SECS),
        }
    }

    /// Block until the Lease is held, or return `None` if `shutdown` fires first
    pub async fn acquire(self: Arc<Self>, shutdown: &CancellationToken) -> Option<LeaderGuard> {
        info!(
            identity = %self.identity,
            lease = %format!("{}/{}", self.namespace, LEASE_NAME),
            "Waiting for leadership..."
        );

        loop {
            match self.try_acquire_or_renew().await {
                Ok(true) => {
                    info!(identity = %self.identity, "Leadership acquired");
                    return Some(self.guard());
                }
                Ok(false) => debug!(identity = %self.identity, "Lease held by another replica"),
                Err(e) => warn!(
                    identity = %self.identity,
                    "Failed to acquire lease: {}, retrying in {}s",
                    e,
                    self.retry_interval.as_secs()
                ),
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(self.retry_interval) => {}
            }
        }
    }

    fn guard(self: &Arc<Self>) -> LeaderGuard {
        let lost = CancellationToken::new();
        let renewal = tokio::spawn(Arc::clone(self).renewal_loop(lost.clone()));
        LeaderGuard {
            elector: Arc::clone(self),
            lost,
            renewal,
        }
    }

    async fn renewal_loop(self: Arc<Self>, lost: CancellationToken) {
        let mut last_renewed = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(self.renew_interval).await;

            match self.try_acquire_or_renew().await {
                Ok(true) => last_renewed = tokio::time::Instant::now(),
                Ok(false) => break,
                // Transient API errors are retried until the Lease would have expired
                Err(e) if last_renewed.elapsed() < self.lease_duration => {
                    warn!(identity = %self.identity, "Failed to renew lease: {}", e);
                }
                Err(e) => {
                    warn!(identity = %self.identity, "Failed to renew lease: {}", e);
                    break;
                }
            }
        }
        warn!(identity = %self.identity, "Leadership lost");
        lost.cancel();
    }

    fn leases(&self) -> Api<Lease> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Create, renew or take over the Lease; `false` while another replica holds it
    async fn try_acquire_or_renew(&self) -> Result<bool> {
        let api = self.leases();
        let now = Utc::now();

        let Some(existing) = api.get_opt(LEASE_NAME).await? else {
            return Ok(write_outcome(api.create(&PostParams::default(), &self.lease(now, 0, None)).await)?);
        };

        let spec = existing.spec.clone().unwrap_or_default();
        let resource_version = existing.metadata.resource_version.clone();

        if spec.holder_identity.as_deref() == Some(self.identity.as_str()) {
            let mut renewed = existing;
            if let Some(spec) = renewed.spec.as_mut() {
                spec.renew_time = Some(MicroTime(now));
            }
            let outcome = write_outcome(api.replace(LEASE_NAME, &PostParams::default(), &renewed).await)?;
            debug!(identity = %self.identity, renewed = outcome, "Lease renewal");
            return Ok(outcome);
        }

        if !lease_expired(&spec, now) {
            return Ok(false);
        }

        let transitions = spec.lease_transitions.unwrap_or(0) + 1;
        let outcome = write_outcome(
            api.replace(
                LEASE_NAME,
                &PostParams::default(),
                &self.lease(now, transitions, resource_version),
            )
            .await,
        )?;
        if outcome {
            info!(
                identity = %self.identity,
                previous = spec.holder_identity.as_deref().unwrap_or("<none>"),
                transitions,
                "Took over expired lease"
            );
        }
        Ok(outcome)
    }

    fn lease(&self, now: DateTime<Utc>, transitions: i32, resource_version: Option<String>) -> Lease {
        Lease {
            metadata: ObjectMeta {
                name: Some(LEASE_NAME.to_string()),
                namespace: Some(self.namespace.clone()),
                resource_version,
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.identity.clone()),
                lease_duration_seconds: Some(self.lease_duration.as_secs() as i32),
                acquire_time: Some(MicroTime(now)),
                renew_time: Some(MicroTime(now)),
                lease_transitions: Some(transitions),
                ..Default::default()
            }),
        }
    }

    /// Clear the holder so a standby can take over without waiting for expiry
    async fn release(&self) -> Result<()> {
        let api = self.leases();
        let Some(lease) = api.get_opt(LEASE_NAME).await? else {
            return Ok(());
        };
        let holder = lease.spec.as_ref().and_then(|s| s.holder_identity.as_deref());
        if holder != Some(self.identity.as_str()) {
            debug!(identity = %self.identity, "Not the lease holder, nothing to release");
            return Ok(());
        }

        let patch = json!({ "spec": { "holderIdentity": null, "renewTime": null } });
        api.patch(LEASE_NAME, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        info!(identity = %self.identity, "Lease released");
        Ok(())
    }
}

/// A 409 means another replica wrote the Lease first
fn write_outcome(result: std::result::Result<Lease, kube::Error>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn lease_expired(spec: &LeaseSpec, now: DateTime<Utc>) -> bool {
    match (spec.renew_time.as_ref(), spec.lease_duration_seconds) {
        (Some(renewed), Some(secs)) => now > renewed.0 + TimeDelta::seconds(secs.into()),
        _ => true,
    }
}

/// Holds leadership while alive; the Lease is renewed in the background
pub struct LeaderGuard {
    elector: Arc<LeaderElector>,
    lost: CancellationToken,
    renewal: JoinHandle<()>,
}

impl LeaderGuard {
    /// Cancelled once the Lease could not be renewed
    pub fn lost(&self) -> CancellationToken {
        self.lost.clone()
    }

    /// Stop renewing and hand the Lease back
    pub async fn release(self) -> Result<()> {
        self.renewal.abort();
        self.elector.release().await
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        self.renewal.abort();
    }
}

/// Replica identity: the pod name when running in a pod
pub fn identity_from_env() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| format!("cert-trust-{}", std::process::id()))
}
