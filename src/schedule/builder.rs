// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns the current set of CertificateImports into schedule entries.
//!
//! An import with an unparseable schedule is left out and reported; it never
//! prevents the remaining imports from being scheduled. Exports are not
//! scheduled.

use crate::error::CertTrustError;
use crate::schedule::Trigger;
use crate::types::{CertificateImport, ObjectKey};
use std::str::FromStr;

/// Everything needed to run one import sync, captured at build time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub import: ObjectKey,
    pub from_export: String,
    pub target_secret: String,
}

impl ImportJob {
    pub fn from_import(import: &CertificateImport) -> Self {
        Self {
            import: import.key(),
            from_export: import.spec.from_export.clone(),
            target_secret: import.spec.target_secret.clone(),
        }
    }
}

/// An import whose schedule parsed successfully
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub job: ImportJob,
    pub schedule: String,
    pub trigger: Trigger,
}

#[derive(Debug, Default)]
pub struct SchedulePlan {
    pub jobs: Vec<PlannedJob>,
    /// One `InvalidTrigger` per rejected import
    pub rejected: Vec<CertTrustError>,
}

/// Build a plan for `imports`, applying `default_schedule` where none is declared
pub fn build_plan(imports: &[CertificateImport], default_schedule: &str) -> SchedulePlan {
    let mut plan = SchedulePlan::default();

    for import in imports {
        let schedule = import.schedule_or(default_schedule);
        match Trigger::from_str(schedule) {
            Ok(trigger) => plan.jobs.push(PlannedJob {
                job: ImportJob::from_import(import),
                schedule: schedule.to_string(),
                trigger,
            }),
            Err(source) => plan.rejected.push(CertTrustError::InvalidTrigger {
                resource: import.key(),
                schedule: schedule.to_string(),
                source,
            }),
        }
    }

    plan
}
