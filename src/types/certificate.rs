// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::ObjectKey;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Declares that a TLS secret in this namespace may be imported elsewhere
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(
    group = "cert.trust.flolive.io",
    version = "v1",
    kind = "CertificateExport",
    shortname = "cex",
    namespaced,
    status = "SyncStatus",
    printcolumn = r#"{"name":"Secret","type":"string","jsonPath":".spec.secretRef","description":"Source TLS secret"}"#,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule","description":"Cron schedule"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateExportSpec {
    /// Name of a TLS secret in the same namespace
    pub secret_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// Requests a copy of an exported TLS secret in this namespace
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(
    group = "cert.trust.flolive.io",
    version = "v1",
    kind = "CertificateImport",
    shortname = "cimp",
    namespaced,
    status = "SyncStatus",
    printcolumn = r#"{"name":"From","type":"string","jsonPath":".spec.fromExport","description":"Source export"}"#,
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.targetSecret","description":"Target secret"}"#,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule","description":"Cron schedule"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateImportSpec {
    /// `namespace/name` or bare `name` of a CertificateExport
    pub from_export: String,
    /// Secret to create and maintain in this namespace
    pub target_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// RFC3339 time of the most recent successful sync
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<String>,
}

/// Declared schedule, with an empty string treated as absent
fn declared_schedule(schedule: &Option<String>) -> Option<&str> {
    schedule.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl CertificateExport {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::of(self)
    }

    /// The source secret lives next to the export
    pub fn source_secret_key(&self) -> ObjectKey {
        ObjectKey::new(self.key().namespace, self.spec.secret_ref.clone())
    }
}

impl CertificateImport {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::of(self)
    }

    pub fn schedule_or<'a>(&'a self, default: &'a str) -> &'a str {
        declared_schedule(&self.spec.schedule).unwrap_or(default)
    }
}
