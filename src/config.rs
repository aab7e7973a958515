//! Launch configuration: CDP endpoint discovery timeouts and the
//! optional `serverRoot`/`webRoot` path remap (spec §4.5, §5 Timeouts).
//! Read from an optional TOML file and overridable by CLI flags.

use crate::debugger::session::PathRemap;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// How long the launcher polls for the debuggee to become reachable
/// before giving up (spec §5, "Timeouts"): ~10 attempts at 500ms each
/// for both the raw TCP port and the `/json/list` HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LaunchTimeouts {
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for LaunchTimeouts {
    fn default() -> Self {
        Self {
            poll_attempts: 10,
            poll_interval_ms: 500,
        }
    }
}

impl LaunchTimeouts {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_root: Option<String>,
    pub web_root: Option<String>,
    #[serde(default)]
    pub launch: LaunchTimeouts,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn path_remap(&self) -> PathRemap {
        PathRemap {
            server_root: self.server_root.clone(),
            web_root: self.web_root.clone(),
        }
    }
}
