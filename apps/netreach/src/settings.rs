use anyhow::{Context, Result};
use netreach_model::{ProbeRequest, RouteRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Defaults for every subcommand, optionally loaded from a JSON file.
/// Flags given on the command line win over file values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ping_count: u32,
    pub ping_timeout_secs: u32,
    pub max_hops: u32,
    pub hop_timeout_secs: u32,
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ping_count: ProbeRequest::DEFAULT_COUNT,
            ping_timeout_secs: ProbeRequest::DEFAULT_TIMEOUT_SECS,
            max_hops: RouteRequest::DEFAULT_MAX_HOPS,
            hop_timeout_secs: RouteRequest::DEFAULT_TIMEOUT_SECS,
            concurrency: 4,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| format!("failed to parse config {:?}", path))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
