// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// API group and version of the CertificateExport / CertificateImport CRDs
pub mod crd {
    pub const GROUP: &str = "cert.trust.flolive.io";
    pub const VERSION: &str = "v1";
    pub const EXPORT_KIND: &str = "CertificateExport";
    pub const IMPORT_KIND: &str = "CertificateImport";

    /// Initial polling interval in seconds when waiting for CRDs
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Shape of the TLS secrets being synchronized
pub mod tls {
    pub const SECRET_TYPE: &str = "kubernetes.io/tls";
    pub const CERT_KEY: &str = "tls.crt";
    pub const PRIVATE_KEY: &str = "tls.key";
    pub const CA_KEY: &str = "ca.crt";
}

/// Scheduling defaults
pub mod schedule {
    /// Trigger used when a resource does not declare one
    pub const DEFAULT_SCHEDULE: &str = "@every 1h";
    /// Period of the reschedule loop
    pub const RESCHEDULE_INTERVAL_SECS: u64 = 60;
    /// Delay before the one-time sync after the first rebuild
    pub const PRIME_DELAY_SECS: u64 = 5;
}

/// Lease-based leader election
pub mod leader {
    /// Name of the coordination.k8s.io Lease held by the active replica
    pub const LEASE_NAME: &str = "cert-trust.flolive.io";
    pub const LEASE_DURATION_SECS: u64 = 15;
    pub const RENEW_INTERVAL_SECS: u64 = 5;
    pub const RETRY_INTERVAL_SECS: u64 = 2;
}

/// Health probe endpoint
pub mod health {
    /// Probes listen on every interface on this port unless configured
    pub const DEFAULT_PROBE_PORT: u16 = 8081;
}
