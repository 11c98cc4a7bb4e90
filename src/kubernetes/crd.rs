// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{
    EXPORT_KIND, GROUP, IMPORT_KIND, POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS, VERSION,
};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait until both the CertificateExport and CertificateImport CRDs are served.
/// Polls with exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_certificate_crds(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_certificate_kinds(client).await {
            Ok(missing) if missing.is_empty() => {
                info!("Certificate CRDs ({}/{}) are available", GROUP, VERSION);
                return Ok(());
            }
            Ok(missing) => {
                info!(
                    "CRDs {:?} ({}/{}) not yet available, waiting {} seconds...",
                    missing, GROUP, VERSION, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for certificate CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Kinds of the certificate API group that discovery does not report yet
async fn missing_certificate_kinds(client: &Client) -> Result<Vec<&'static str>> {
    let discovery = Discovery::new(client.clone()).filter(&[GROUP]).run().await?;

    let served: Vec<String> = discovery
        .groups()
        .filter(|group| group.name() == GROUP)
        .flat_map(|group| group.recommended_resources())
        .filter(|(ar, _)| ar.version == VERSION)
        .map(|(ar, _)| ar.kind)
        .collect();

    Ok([EXPORT_KIND, IMPORT_KIND]
        .into_iter()
        .filter(|kind| !served.iter().any(|s| s == kind))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;
    use serde_json::json;

    fn group_list(versions: &[&str]) -> String {
        let versions: Vec<_> = versions
            .iter()
            .map(|v| json!({ "groupVersion": format!("{}/{}", GROUP, v), "version": v }))
            .collect();
        let preferred = versions[0].clone();
        json!({
            "kind": "APIGroupList",
            "apiVersion": "v1",
            "groups": [{
                "name": GROUP,
                "versions": versions,
                "preferredVersion": preferred
            }]
        })
        .to_string()
    }

    fn resource_list(kinds: &[(&str, &str)]) -> String {
        let resources: Vec<_> = kinds
            .iter()
            .map(|(plural, kind)| {
                json!({
                    "name": plural,
                    "singularName": "",
                    "namespaced": true,
                    "kind": kind,
                    "verbs": ["get", "list", "create", "update", "patch"]
                })
            })
            .collect();
        json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": format!("{}/{}", GROUP, VERSION),
            "resources": resources
        })
        .to_string()
    }

    fn discovery_mock(kinds: &[(&str, &str)]) -> Client {
        MockService::new()
            .on_get("/apis", 200, &group_list(&[VERSION]))
            .on_get(
                &format!("/apis/{}/{}", GROUP, VERSION),
                200,
                &resource_list(kinds),
            )
            .into_client()
    }

    #[tokio::test]
    async fn test_both_kinds_served() {
        let client = discovery_mock(&[
            ("certificateexports", "CertificateExport"),
            ("certificateimports", "CertificateImport"),
        ]);

        let missing = missing_certificate_kinds(&client).await.unwrap();

        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_reports_missing_import_kind() {
        let client = discovery_mock(&[("certificateexports", "CertificateExport")]);

        let missing = missing_certificate_kinds(&client).await.unwrap();

        assert_eq!(missing, vec!["CertificateImport"]);
    }
}
