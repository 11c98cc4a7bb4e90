// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CertificateExport / CertificateImport resources and object keys.

pub mod certificate;
pub mod key;

pub use certificate::{
    CertificateExport, CertificateExportSpec, CertificateImport, CertificateImportSpec, SyncStatus,
};
pub use key::ObjectKey;
