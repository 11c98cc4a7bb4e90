// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read, validate and write steps of a single export or import sync.

use crate::constants::tls;
use crate::error::{CertTrustError, Result};
use crate::kubernetes::ResourceStore;
use crate::schedule::ImportJob;
use crate::sync::status::{stamp_last_sync, StatusStamp, StatusTarget};
use crate::types::ObjectKey;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// How the target secret was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetWrite {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub target: ObjectKey,
    pub write: TargetWrite,
    pub status: StatusStamp,
}

pub struct SyncExecutor {
    store: Arc<dyn ResourceStore>,
}

impl SyncExecutor {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Verify that an export's source secret exists and is a TLS secret
    #[instrument(skip(self, export), fields(export = %export))]
    pub async fn sync_export(&self, export: &ObjectKey, secret_ref: &str) -> Result<StatusStamp> {
        let source_key = ObjectKey::new(export.namespace.clone(), secret_ref);
        self.fetch_tls_source(&source_key).await?;

        info!("Export source secret {} verified", source_key);
        Ok(stamp_last_sync(self.store.as_ref(), StatusTarget::Export, export).await)
    }

    /// Copy the exported TLS secret into the import's target secret
    #[instrument(skip(self, job), fields(import = %job.import))]
    pub async fn sync_import(&self, job: &ImportJob) -> Result<ImportReport> {
        let export_key = ObjectKey::resolve(&job.import.namespace, &job.from_export);
        let export = self
            .store
            .get_export(&export_key)
            .await?
            .ok_or_else(|| CertTrustError::ExportNotFound(export_key.clone()))?;

        let source_key = export.source_secret_key();
        let source = self.fetch_tls_source(&source_key).await?;

        let source_data = source.data.as_ref();
        debug!(
            has_tls_crt = source_data.is_some_and(|d| d.contains_key(tls::CERT_KEY)),
            has_tls_key = source_data.is_some_and(|d| d.contains_key(tls::PRIVATE_KEY)),
            has_ca_crt = source_data.is_some_and(|d| d.contains_key(tls::CA_KEY)),
            "Source secret {} found",
            source_key
        );

        let target_key = ObjectKey::new(job.import.namespace.clone(), job.target_secret.clone());
        let write = self.upsert_target(&target_key, &source).await?;
        let status = stamp_last_sync(self.store.as_ref(), StatusTarget::Import, &job.import).await;

        Ok(ImportReport {
            target: target_key,
            write,
            status,
        })
    }

    /// Run an import sync and log the outcome; used by scheduled and one-shot runs
    pub async fn run_import(&self, job: &ImportJob) {
        info!("Executing import sync for {}", job.import);
        match self.sync_import(job).await {
            Ok(report) => info!(
                "Import sync for {} completed ({:?} {})",
                job.import, report.write, report.target
            ),
            Err(e) => error!("Failed to sync import {}: {}", job.import, e),
        }
    }

    /// Run an export check and log the outcome
    pub async fn run_export(&self, export: &ObjectKey, secret_ref: &str) {
        if let Err(e) = self.sync_export(export, secret_ref).await {
            error!("Failed to verify export {}: {}", export, e);
        }
    }

    async fn fetch_tls_source(&self, key: &ObjectKey) -> Result<Secret> {
        let secret = self
            .store
            .get_secret(key)
            .await?
            .ok_or_else(|| CertTrustError::SourceNotFound(key.clone()))?;

        // An unset type is stored as Opaque by the API server
        let found = secret.type_.as_deref().unwrap_or("Opaque");
        if found != tls::SECRET_TYPE {
            return Err(CertTrustError::WrongCredentialType {
                key: key.clone(),
                found: found.to_string(),
            });
        }
        Ok(secret)
    }

    async fn upsert_target(&self, key: &ObjectKey, source: &Secret) -> Result<TargetWrite> {
        let write_failure = |source| CertTrustError::StoreWriteFailure {
            key: key.clone(),
            source,
        };

        match self.store.get_secret(key).await? {
            None => {
                let target = new_target_secret(key, source);
                self.store
                    .create_secret(key, &target)
                    .await
                    .map_err(write_failure)?;
                info!("Created target secret {}", key);
                Ok(TargetWrite::Created)
            }
            Some(mut target) => {
                apply_source_data(&mut target, source);
                self.store
                    .replace_secret(key, &target)
                    .await
                    .map_err(write_failure)?;
                info!("Updated target secret {}", key);
                Ok(TargetWrite::Updated)
            }
        }
    }
}

fn source_value(source: &Secret, field: &str) -> Option<ByteString> {
    source.data.as_ref().and_then(|d| d.get(field)).cloned()
}

/// A fresh TLS secret holding the source's certificate, key and CA (if any)
fn new_target_secret(key: &ObjectKey, source: &Secret) -> Secret {
    let mut target = Secret {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            ..Default::default()
        },
        ..Default::default()
    };
    apply_source_data(&mut target, source);
    target
}

/// Overwrite the managed fields of `target` so they mirror `source` exactly.
/// Unmanaged data keys are left alone; `ca.crt` is removed when the source has none.
fn apply_source_data(target: &mut Secret, source: &Secret) {
    target.type_ = Some(tls::SECRET_TYPE.to_string());
    let data = target.data.get_or_insert_with(BTreeMap::new);

    for field in [tls::CERT_KEY, tls::PRIVATE_KEY] {
        data.insert(
            field.to_string(),
            source_value(source, field).unwrap_or_else(|| ByteString(Vec::new())),
        );
    }

    match source_value(source, tls::CA_KEY) {
        Some(ca) => {
            data.insert(tls::CA_KEY.to_string(), ca);
        }
        None => {
            data.remove(tls::CA_KEY);
        }
    }
}
