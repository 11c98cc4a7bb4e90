// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Import/export synchronization and the reschedule loop.

pub mod executor;
pub mod manager;
pub mod status;

pub use executor::{ImportReport, SyncExecutor, TargetWrite};
pub use manager::{SyncManager, TickOutcome};
pub use status::{stamp_last_sync, StatusStamp, StatusTarget};
