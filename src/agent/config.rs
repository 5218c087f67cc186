use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::time::Duration;

use crate::commands::timer::OverlapPolicy;
use crate::gpio::{PinMap, PinNumbering};

pub const DEFAULT_URL: &str = "ws://nicopi.local:8081";

/// Largest delay accepted, i32::MAX milliseconds.
pub const DEFAULT_MAX_DURATION_MS: u64 = 2_147_483_647;

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_max_duration_ms() -> u64 {
    DEFAULT_MAX_DURATION_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub pins: PinMap,
    #[serde(default)]
    pub numbering: PinNumbering,
    #[serde(default)]
    pub overlap: OverlapPolicy,
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            pins: PinMap::default(),
            numbering: PinNumbering::default(),
            overlap: OverlapPolicy::default(),
            max_duration_ms: default_max_duration_ms(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).context("reading config file")?;
        let cfg: Config = serde_json::from_str(&raw).context("parsing JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if given, otherwise fall back to the built-in deployment defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            bail!("url must use ws:// or wss://, got {}", self.url);
        }

        let mut seen = HashSet::new();
        for (target, line) in self.pins.iter() {
            self.numbering
                .to_bcm(line)
                .with_context(|| format!("invalid line for {target}"))?;
            if !seen.insert(line) {
                bail!("line {line} is mapped to more than one target");
            }
        }

        if self.max_duration_ms == 0 {
            bail!("max_duration_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}
