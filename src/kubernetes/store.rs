// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Access to exports, imports and secrets.
//!
//! "Not found" is reported as `Ok(None)`; any other failure is the
//! underlying `kube::Error`.

use crate::types::{CertificateExport, CertificateImport, ObjectKey, SyncStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ListParams, Patch, PatchParams, PostParams},
    Api, Client,
};
use serde_json::json;
use tracing::{debug, instrument};

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn list_exports(&self) -> Result<Vec<CertificateExport>, kube::Error>;

    async fn list_imports(&self) -> Result<Vec<CertificateImport>, kube::Error>;

    async fn get_export(&self, key: &ObjectKey) -> Result<Option<CertificateExport>, kube::Error>;

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>, kube::Error>;

    async fn create_secret(&self, key: &ObjectKey, secret: &Secret) -> Result<(), kube::Error>;

    /// Overwrite an existing secret; `secret` carries the resourceVersion it was read at
    async fn replace_secret(&self, key: &ObjectKey, secret: &Secret) -> Result<(), kube::Error>;

    async fn stamp_export_status(&self, key: &ObjectKey, status: &SyncStatus) -> Result<(), kube::Error>;

    async fn stamp_import_status(&self, key: &ObjectKey, status: &SyncStatus) -> Result<(), kube::Error>;
}

/// `ResourceStore` backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn status_patch(status: &SyncStatus) -> Patch<serde_json::Value> {
    Patch::Merge(json!({ "status": status }))
}

#[async_trait]
impl ResourceStore for KubeStore {
    #[instrument(skip(self))]
    async fn list_exports(&self) -> Result<Vec<CertificateExport>, kube::Error> {
        let exports: Api<CertificateExport> = Api::all(self.client.clone());
        Ok(exports.list(&ListParams::default()).await?.items)
    }

    #[instrument(skip(self))]
    async fn list_imports(&self) -> Result<Vec<CertificateImport>, kube::Error> {
        let imports: Api<CertificateImport> = Api::all(self.client.clone());
        Ok(imports.list(&ListParams::default()).await?.items)
    }

    #[instrument(skip(self), fields(export = %key))]
    async fn get_export(&self, key: &ObjectKey) -> Result<Option<CertificateExport>, kube::Error> {
        let exports: Api<CertificateExport> = Api::namespaced(self.client.clone(), &key.namespace);
        exports.get_opt(&key.name).await
    }

    #[instrument(skip(self), fields(secret = %key))]
    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>, kube::Error> {
        self.secrets(&key.namespace).get_opt(&key.name).await
    }

    #[instrument(skip(self, secret), fields(secret = %key))]
    async fn create_secret(&self, key: &ObjectKey, secret: &Secret) -> Result<(), kube::Error> {
        self.secrets(&key.namespace)
            .create(&PostParams::default(), secret)
            .await?;
        debug!("Secret created");
        Ok(())
    }

    #[instrument(skip(self, secret), fields(secret = %key))]
    async fn replace_secret(&self, key: &ObjectKey, secret: &Secret) -> Result<(), kube::Error> {
        self.secrets(&key.namespace)
            .replace(&key.name, &PostParams::default(), secret)
            .await?;
        debug!("Secret replaced");
        Ok(())
    }

    #[instrument(skip(self, status), fields(export = %key))]
    async fn stamp_export_status(&self, key: &ObjectKey, status: &SyncStatus) -> Result<(), kube::Error> {
        let exports: Api<CertificateExport> = Api::namespaced(self.client.clone(), &key.namespace);
        exports
            .patch_status(&key.name, &PatchParams::default(), &status_patch(status))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, status), fields(import = %key))]
    async fn stamp_import_status(&self, key: &ObjectKey, status: &SyncStatus) -> Result<(), kube::Error> {
        let imports: Api<CertificateImport> = Api::namespaced(self.client.clone(), &key.namespace);
        imports
            .patch_status(&key.name, &PatchParams::default(), &status_patch(status))
            .await?;
        Ok(())
    }
}
