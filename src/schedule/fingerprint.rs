// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Change detection over the declared exports and imports.
//!
//! The fingerprint only decides whether the schedule table is rebuilt.
//! Sync runs always resolve references against live objects.

use crate::types::{CertificateExport, CertificateImport};
use sha2::{Digest, Sha256};

/// Counts plus a content hash of every field that affects scheduling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub exports: usize,
    pub imports: usize,
    pub digest: String,
}

impl Fingerprint {
    pub fn compute(exports: &[CertificateExport], imports: &[CertificateImport]) -> Self {
        let mut export_lines: Vec<String> = exports
            .iter()
            .map(|export| {
                format!(
                    "export:{}:secretRef:{}:",
                    export.key(),
                    export.spec.secret_ref
                )
            })
            .collect();
        let mut import_lines: Vec<String> = imports
            .iter()
            .map(|import| {
                format!(
                    "import:{}:fromExport:{}:targetSecret:{}:schedule:{}:",
                    import.key(),
                    import.spec.from_export,
                    import.spec.target_secret,
                    import.spec.schedule.as_deref().unwrap_or_default()
                )
            })
            .collect();

        // List order is not part of the identity of the set
        export_lines.sort();
        import_lines.sort();

        let canonical: String = export_lines
            .iter()
            .chain(import_lines.iter())
            .map(String::as_str)
            .collect();

        Fingerprint {
            exports: exports.len(),
            imports: imports.len(),
            digest: hex::encode(Sha256::digest(canonical.as_bytes())),
        }
    }
}
