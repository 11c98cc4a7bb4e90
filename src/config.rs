// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::health::DEFAULT_PROBE_PORT;
use crate::constants::schedule::{DEFAULT_SCHEDULE, PRIME_DELAY_SECS, RESCHEDULE_INTERVAL_SECS};
use crate::schedule::Trigger;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// How often the reschedule loop re-lists exports and imports
    pub reschedule_interval: Duration,
    /// Schedule applied to imports that do not declare one
    pub default_schedule: String,
    /// Run every scheduled import once shortly after the first rebuild
    pub immediate_sync_on_start: bool,
    pub prime_delay: Duration,
    /// Check export source secrets whenever the schedule is rebuilt
    pub verify_exports: bool,
    pub wait_for_crds: bool,
    /// Where `/healthz` and `/readyz` are served
    pub health_probe_address: SocketAddr,
    /// Only run the scheduler while holding the leader Lease
    pub leader_elect: bool,
    /// Namespace of the leader Lease; the client's namespace when unset
    pub leader_election_namespace: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reschedule_interval: Duration::from_secs(RESCHEDULE_INTERVAL_SECS),
            default_schedule: DEFAULT_SCHEDULE.to_string(),
            immediate_sync_on_start: true,
            prime_delay: Duration::from_secs(PRIME_DELAY_SECS),
            verify_exports: false,
            wait_for_crds: true,
            health_probe_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PROBE_PORT)),
            leader_elect: false,
            leader_election_namespace: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let reschedule_interval = parse_var(&lookup, "RESCHEDULE_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.reschedule_interval);
        if reschedule_interval.is_zero() {
            return Err(anyhow!("RESCHEDULE_INTERVAL_SECS must be greater than zero"));
        }

        let default_schedule = lookup("DEFAULT_SCHEDULE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_schedule);
        Trigger::from_str(&default_schedule)
            .with_context(|| format!("DEFAULT_SCHEDULE '{}' is not a valid schedule", default_schedule))?;

        Ok(Config {
            reschedule_interval,
            default_schedule,
            immediate_sync_on_start: parse_var(&lookup, "IMMEDIATE_SYNC_ON_START")?
                .unwrap_or(defaults.immediate_sync_on_start),
            prime_delay: parse_var(&lookup, "PRIME_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.prime_delay),
            verify_exports: parse_var(&lookup, "VERIFY_EXPORTS")?.unwrap_or(defaults.verify_exports),
            wait_for_crds: parse_var(&lookup, "WAIT_FOR_CRDS")?.unwrap_or(defaults.wait_for_crds),
            health_probe_address: lookup("HEALTH_PROBE_BIND_ADDRESS")
                .map(|raw| parse_bind_address("HEALTH_PROBE_BIND_ADDRESS", &raw))
                .transpose()?
                .unwrap_or(defaults.health_probe_address),
            leader_elect: parse_var(&lookup, "LEADER_ELECT")?.unwrap_or(defaults.leader_elect),
            leader_election_namespace: lookup("LEADER_ELECTION_NAMESPACE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

/// Accepts `host:port` or a bare `:port`, which binds every interface
fn parse_bind_address(key: &str, raw: &str) -> Result<SocketAddr> {
    let raw = raw.trim();
    let full = match raw.strip_prefix(':') {
        Some(port) => format!("{}:{}", Ipv4Addr::UNSPECIFIED, port),
        None => raw.to_string(),
    };
    full.parse()
        .with_context(|| format!("{} has an invalid value '{}'", key, raw))
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value '{}'", key, raw))
        })
        .transpose()
}
