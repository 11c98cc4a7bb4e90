// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The reschedule loop.
//!
//! Lists exports and imports on a fixed period, and rebuilds the schedule
//! table only when their fingerprint changed since the last successful build.
//! The runner and the last fingerprint are only touched from this loop.

use crate::config::Config;
use crate::error::Result;
use crate::kubernetes::ResourceStore;
use crate::schedule::{build_plan, Entry, EntryInfo, Fingerprint, ImportJob, JobFn, JobRunner};
use crate::sync::executor::SyncExecutor;
use crate::types::CertificateExport;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// What a single tick of the loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Fingerprint matched the last build, table left running
    Unchanged,
    Rebuilt {
        scheduled: usize,
        rejected: usize,
        /// Whether this rebuild queued the one-time startup sync
        primed: bool,
    },
}

pub struct SyncManager {
    store: Arc<dyn ResourceStore>,
    executor: Arc<SyncExecutor>,
    config: Config,
    runner: JobRunner,
    last_fingerprint: Option<Fingerprint>,
    primed: bool,
}

impl SyncManager {
    pub fn new(store: Arc<dyn ResourceStore>, config: Config) -> Self {
        Self {
            executor: Arc::new(SyncExecutor::new(store.clone())),
            store,
            config,
            runner: JobRunner::new(),
            last_fingerprint: None,
            primed: false,
        }
    }

    /// Tick until `shutdown` is cancelled, then stop the schedule table
    pub async fn run(mut self, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!(
            "SyncManager started, rescheduling every {}s",
            self.config.reschedule_interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.config.reschedule_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                Ok(TickOutcome::Unchanged) => debug!("No changes in exports or imports, skipping rebuild"),
                Ok(outcome) => debug!("Reschedule tick finished: {:?}", outcome),
                Err(e) => error!("Failed to list exports and imports: {}", e),
            }
        }

        info!("Shutdown requested, stopping schedule table");
        self.runner.stop();
        Ok(())
    }

    /// One pass of list, compare, and rebuild when changed
    #[instrument(skip(self))]
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let exports = self.store.list_exports().await?;
        let imports = self.store.list_imports().await?;

        let fingerprint = Fingerprint::compute(&exports, &imports);
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            return Ok(TickOutcome::Unchanged);
        }

        info!(
            exports = fingerprint.exports,
            imports = fingerprint.imports,
            "Exports or imports changed, rebuilding schedule table"
        );

        let plan = build_plan(&imports, &self.config.default_schedule);
        for rejected in &plan.rejected {
            error!("Skipping import: {}", rejected);
        }

        let entries: Vec<Entry> = plan
            .jobs
            .iter()
            .map(|planned| {
                info!(
                    "Scheduled import {} with schedule '{}'",
                    planned.job.import, planned.schedule
                );
                Entry {
                    label: planned.job.import.to_string(),
                    schedule: planned.schedule.clone(),
                    trigger: planned.trigger.clone(),
                    job: import_job(&self.executor, planned.job.clone()),
                }
            })
            .collect();
        self.runner.replace(entries);
        self.last_fingerprint = Some(fingerprint);

        if self.config.verify_exports {
            self.verify_exports(&exports);
        }

        let scheduled = plan.jobs.len();
        let primed = self.config.immediate_sync_on_start && !self.primed && scheduled > 0;
        if primed {
            info!(
                "Running initial sync for {} imports in {}s",
                scheduled,
                self.config.prime_delay.as_secs()
            );
            for planned in &plan.jobs {
                self.runner.trigger_once(
                    &planned.job.import.to_string(),
                    import_job(&self.executor, planned.job.clone()),
                    self.config.prime_delay,
                );
            }
            self.primed = true;
        }

        Ok(TickOutcome::Rebuilt {
            scheduled,
            rejected: plan.rejected.len(),
            primed,
        })
    }

    pub fn entries(&self) -> &[EntryInfo] {
        self.runner.entries()
    }

    fn verify_exports(&self, exports: &[CertificateExport]) {
        for export in exports {
            let executor = self.executor.clone();
            let key = export.key();
            let secret_ref = export.spec.secret_ref.clone();
            let label = key.to_string();
            let job: JobFn = Arc::new(move || {
                let executor = executor.clone();
                let key = key.clone();
                let secret_ref = secret_ref.clone();
                async move { executor.run_export(&key, &secret_ref).await }.boxed()
            });
            self.runner.trigger_once(&label, job, Duration::ZERO);
        }
    }
}

fn import_job(executor: &Arc<SyncExecutor>, job: ImportJob) -> JobFn {
    let executor = executor.clone();
    Arc::new(move || {
        let executor = executor.clone();
        let job = job.clone();
        async move { executor.run_import(&job).await }.boxed()
    })
}
