// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Owns the live schedule table.
//!
//! Every entry runs in its own task: firings of one entry never overlap,
//! different entries run concurrently. Replacing the table cancels the
//! previous generation before the new one is spawned, so no old entry
//! fires once a replace has started. Runs already in flight are left
//! to finish.

use crate::schedule::Trigger;
use chrono::Utc;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A unit of scheduled work; called once per firing
pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub type EntryId = u64;

pub struct Entry {
    pub label: String,
    pub schedule: String,
    pub trigger: Trigger,
    pub job: JobFn,
}

/// Description of an installed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: EntryId,
    pub label: String,
    pub schedule: String,
}

pub struct JobRunner {
    next_id: EntryId,
    generation: u64,
    /// Cancelled on `stop`; parent of every generation token
    lifetime: CancellationToken,
    current: Option<CancellationToken>,
    entries: Vec<EntryInfo>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            generation: 0,
            lifetime: CancellationToken::new(),
            current: None,
            entries: Vec::new(),
        }
    }

    /// Stop the running table, discard it and start `entries` in its place
    pub fn replace(&mut self, entries: Vec<Entry>) -> &[EntryInfo] {
        self.cancel_current();
        self.generation += 1;

        if entries.is_empty() {
            info!(generation = self.generation, "Schedule table is empty, nothing to start");
            return &self.entries;
        }

        let cancel = self.lifetime.child_token();
        for entry in entries {
            let id = self.next_id;
            self.next_id += 1;
            self.entries.push(EntryInfo {
                id,
                label: entry.label.clone(),
                schedule: entry.schedule.clone(),
            });
            tokio::spawn(run_entry(id, entry, cancel.clone()));
        }
        self.current = Some(cancel);

        info!(
            generation = self.generation,
            entries = self.entries.len(),
            "Schedule table started"
        );
        &self.entries
    }

    /// Run `job` once after `delay`, outside the regular cadence
    pub fn trigger_once(&self, label: &str, job: JobFn, delay: Duration) -> JoinHandle<()> {
        let label = label.to_string();
        let lifetime = self.lifetime.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = lifetime.cancelled() => {
                    debug!(job = %label, "Runner stopped before one-shot run");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            debug!(job = %label, "Running one-shot job");
            job().await;
        })
    }

    /// Halt all future firings, including pending one-shot runs
    pub fn stop(&mut self) {
        self.cancel_current();
        std::mem::take(&mut self.lifetime).cancel();
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn cancel_current(&mut self) {
        if let Some(cancel) = self.current.take() {
            cancel.cancel();
            debug!(
                generation = self.generation,
                entries = self.entries.len(),
                "Schedule table stopped"
            );
        }
        self.entries.clear();
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_entry(id: EntryId, entry: Entry, cancel: CancellationToken) {
    loop {
        let now = Utc::now();
        let Some(next) = entry.trigger.next_after(now) else {
            warn!(
                entry = id,
                job = %entry.label,
                schedule = %entry.schedule,
                "Schedule has no upcoming run, entry will never fire"
            );
            return;
        };
        debug!(entry = id, job = %entry.label, next_run = %next.to_rfc3339(), "Next run scheduled");

        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        (entry.job)().await;
    }
}
