// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::schedule::TriggerError;
use crate::types::ObjectKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertTrustError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Source secret {0} not found")]
    SourceNotFound(ObjectKey),

    #[error("CertificateExport {0} not found")]
    ExportNotFound(ObjectKey),

    #[error("Source secret {key} must be type kubernetes.io/tls, found {found}")]
    WrongCredentialType { key: ObjectKey, found: String },

    #[error("Invalid schedule '{schedule}' for {resource}: {source}")]
    InvalidTrigger {
        resource: ObjectKey,
        schedule: String,
        #[source]
        source: TriggerError,
    },

    #[error("Failed to write target secret {key}: {source}")]
    StoreWriteFailure {
        key: ObjectKey,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to update status of {key}: {source}")]
    StatusStampFailure {
        key: ObjectKey,
        #[source]
        source: kube::Error,
    },
}

pub type Result<T> = std::result::Result<T, CertTrustError>;
