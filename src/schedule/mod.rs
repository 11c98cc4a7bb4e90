// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Schedule parsing, change detection, table building and the job runner.

pub mod builder;
pub mod fingerprint;
pub mod runner;
pub mod trigger;

pub use builder::{build_plan, ImportJob, PlannedJob, SchedulePlan};
pub use fingerprint::Fingerprint;
pub use runner::{Entry, EntryId, EntryInfo, JobFn, JobRunner};
pub use trigger::{CronExpr, Trigger, TriggerError};
