//! Connectivity probes, one per target kind.
//!
//! A probe never fails: every error (DNS, refused connection, timeout,
//! non-OK response) is folded into a `CheckResult` with `success == false`
//! and a human-readable message.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::targets::{Target, TargetKind};

pub mod http;
pub mod postgres;
pub mod redis;

pub use self::http::HttpProbe;
pub use self::postgres::PostgresProbe;
pub use self::redis::RedisProbe;

/// Outcome of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub target: String,
    pub kind: TargetKind,
    pub success: bool,
    pub latency: Duration,
    pub checked_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl CheckResult {
    pub fn new(
        target: impl Into<String>,
        kind: TargetKind,
        success: bool,
        latency: Duration,
        message: Option<String>,
    ) -> Self {
        Self {
            target: target.into(),
            kind,
            success,
            latency,
            checked_at: Utc::now(),
            message,
        }
    }

    pub fn success(target: impl Into<String>, kind: TargetKind, latency: Duration) -> Self {
        Self::new(target, kind, true, latency, None)
    }

    pub fn failure(
        target: impl Into<String>,
        kind: TargetKind,
        latency: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self::new(target, kind, false, latency, Some(message.into()))
    }
}

/// A single connectivity check against one target.
#[async_trait]
pub trait Probe: Send + Sync {
    fn kind(&self) -> TargetKind;

    /// The label recorded on results, normally the probed address.
    fn label(&self) -> &str;

    async fn check(&self) -> CheckResult;
}

/// Builds a probe for a target. The monitor loop asks for a fresh probe on
/// every cycle.
pub trait ProbeFactory: Send + Sync {
    fn probe_for(&self, target: &Target) -> Box<dyn Probe>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProbeFactory;

impl ProbeFactory for DefaultProbeFactory {
    fn probe_for(&self, target: &Target) -> Box<dyn Probe> {
        probe_for_target(target)
    }
}

/// Maps a stored target to the probe for its kind.
pub fn probe_for_target(target: &Target) -> Box<dyn Probe> {
    let credentials = target
        .credentials()
        .map(|(user, pass)| (user.to_string(), pass.to_string()));

    match target.kind {
        TargetKind::Http => Box::new(HttpProbe::new(&target.address)),
        TargetKind::Postgres => {
            let probe = PostgresProbe::new(&target.address);
            match credentials {
                Some((user, pass)) => Box::new(probe.with_credentials(user, pass)),
                None => Box::new(probe),
            }
        }
        TargetKind::Redis => Box::new(RedisProbe::new(&target.address).with_auth(
            crate::targets::non_empty(&target.username).map(str::to_string),
            crate::targets::non_empty(&target.password).map(str::to_string),
        )),
    }
}
