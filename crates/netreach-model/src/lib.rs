//! Shared data structures for netreach.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of round-trip samples recorded per hop.
pub const HOP_SAMPLES: usize = 3;

/// Host marker for a hop that answered none of its probes.
pub const UNREACHABLE_HOST: &str = "* * *";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("target host is empty")]
    EmptyHost,
    #[error("probe count must be positive")]
    ZeroCount,
    #[error("max hop count must be positive")]
    ZeroMaxHops,
    #[error("timeout must be positive")]
    ZeroTimeout,
}

/// A validated reachability request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRequest {
    host: String,
    count: u32,
    timeout_secs: u32,
}

impl ProbeRequest {
    pub const DEFAULT_COUNT: u32 = 4;
    pub const DEFAULT_TIMEOUT_SECS: u32 = 2;

    pub fn new(host: impl Into<String>, count: u32, timeout_secs: u32) -> Result<Self, RequestError> {
        let host = validate_host(host.into())?;
        if count == 0 {
            return Err(RequestError::ZeroCount);
        }
        if timeout_secs == 0 {
            return Err(RequestError::ZeroTimeout);
        }
        Ok(Self {
            host,
            count,
            timeout_secs,
        })
    }

    pub fn with_defaults(host: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(host, Self::DEFAULT_COUNT, Self::DEFAULT_TIMEOUT_SECS)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }
}

/// A validated route discovery request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRequest {
    host: String,
    max_hops: u32,
    timeout_secs: u32,
}

impl RouteRequest {
    pub const DEFAULT_MAX_HOPS: u32 = 30;
    pub const DEFAULT_TIMEOUT_SECS: u32 = 1;

    pub fn new(
        host: impl Into<String>,
        max_hops: u32,
        timeout_secs: u32,
    ) -> Result<Self, RequestError> {
        let host = validate_host(host.into())?;
        if max_hops == 0 {
            return Err(RequestError::ZeroMaxHops);
        }
        if timeout_secs == 0 {
            return Err(RequestError::ZeroTimeout);
        }
        Ok(Self {
            host,
            max_hops,
            timeout_secs,
        })
    }

    pub fn with_defaults(host: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(host, Self::DEFAULT_MAX_HOPS, Self::DEFAULT_TIMEOUT_SECS)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }
}

fn validate_host(host: String) -> Result<String, RequestError> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(RequestError::EmptyHost);
    }
    if trimmed.len() == host.len() {
        Ok(host)
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external command could not be started.
    Launch,
    /// The command ran but exited unsuccessfully without usable output.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ProbeFailure {
    pub fn launch(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Launch,
            message: message.into(),
        }
    }

    pub fn exit(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Exit,
            message: message.into(),
        }
    }
}

/// Outcome of one reachability probe run.
///
/// Every numeric field is derived from `sent` and `times`; see
/// [`ProbeResult::from_samples`]. A failure never rewrites the counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub host: String,
    pub sent: u32,
    pub received: u32,
    pub lost: u32,
    pub loss_percent: f64,
    pub times: Vec<f64>,
    pub min_time: f64,
    pub max_time: f64,
    pub avg_time: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    /// Builds a result from the number of attempts seen and the round-trip
    /// times of the replies that came back. `sent` is raised to the number of
    /// times if it is smaller, so `sent == received + lost` always holds.
    pub fn from_samples(host: impl Into<String>, sent: u32, times: Vec<f64>) -> Self {
        let received = times.len() as u32;
        let sent = sent.max(received);
        let lost = sent - received;
        let loss_percent = if sent > 0 {
            lost as f64 / sent as f64 * 100.0
        } else {
            0.0
        };

        let (min_time, max_time, avg_time) = if times.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let min = times.iter().copied().fold(f64::INFINITY, f64::min);
            let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = times.iter().sum::<f64>() / times.len() as f64;
            (min, max, avg)
        };

        Self {
            host: host.into(),
            sent,
            received,
            lost,
            loss_percent,
            times,
            min_time,
            max_time,
            avg_time,
            success: received > 0,
            failure: None,
        }
    }

    /// The result for a probe whose command never ran.
    pub fn not_run(host: impl Into<String>, failure: ProbeFailure) -> Self {
        Self::from_samples(host, 0, Vec::new()).with_failure(failure)
    }

    pub fn with_failure(mut self, failure: ProbeFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// One entry of a discovered route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub hop: u32,
    pub host: String,
    pub times: [Option<f64>; HOP_SAMPLES],
    pub avg_time: Option<f64>,
}

impl Hop {
    /// Builds a hop from up to three samples; extra samples are dropped and
    /// missing ones are recorded as absent.
    pub fn new(
        hop: u32,
        host: impl Into<String>,
        samples: impl IntoIterator<Item = Option<f64>>,
    ) -> Self {
        let mut times = [None; HOP_SAMPLES];
        for (slot, sample) in times.iter_mut().zip(samples) {
            *slot = sample;
        }

        let present: Vec<f64> = times.iter().copied().flatten().collect();
        let avg_time = if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        };

        Self {
            hop,
            host: host.into(),
            times,
            avg_time,
        }
    }

    pub fn unreachable(hop: u32) -> Self {
        Self::new(hop, UNREACHABLE_HOST, [None; HOP_SAMPLES])
    }

    pub fn is_unreachable(&self) -> bool {
        self.times.iter().all(Option::is_none)
    }
}

/// A route discovery run. A failed run carries no hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub target: String,
    pub hops: Vec<Hop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProbeFailure>,
}

impl Route {
    pub fn new(target: impl Into<String>, hops: Vec<Hop>) -> Self {
        Self {
            target: target.into(),
            hops,
            failure: None,
        }
    }

    pub fn failed(target: impl Into<String>, failure: ProbeFailure) -> Self {
        Self {
            target: target.into(),
            hops: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}
