// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes access: CRD discovery, leader election and the resource store.

pub mod crd;
pub mod leader;
pub mod store;

pub use crd::wait_for_certificate_crds;
pub use leader::{identity_from_env, LeaderElector, LeaderGuard};
pub use store::{KubeStore, ResourceStore};
