// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Advisory status writes.
//!
//! `status.lastSyncTime` is for observability only. Failures are logged and
//! reported back as a value, never as an error of the sync that caused them.

use crate::error::CertTrustError;
use crate::kubernetes::ResourceStore;
use crate::types::{ObjectKey, SyncStatus};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTarget {
    Export,
    Import,
}

/// Outcome of an advisory status write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusStamp {
    Stamped,
    Failed(String),
}

/// Record the current time as `status.lastSyncTime` on an export or import
pub async fn stamp_last_sync(
    store: &dyn ResourceStore,
    target: StatusTarget,
    key: &ObjectKey,
) -> StatusStamp {
    let status = SyncStatus {
        last_sync_time: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    };

    let result = match target {
        StatusTarget::Export => store.stamp_export_status(key, &status).await,
        StatusTarget::Import => store.stamp_import_status(key, &status).await,
    };

    match result {
        Ok(()) => {
            debug!("Updated lastSyncTime on {:?} {}", target, key);
            StatusStamp::Stamped
        }
        Err(source) => {
            let err = CertTrustError::StatusStampFailure {
                key: key.clone(),
                source,
            };
            warn!("{}", err);
            StatusStamp::Failed(err.to_string())
        }
    }
}
