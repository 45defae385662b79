//! Server configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use arbor_tree::LayoutOptions;

use crate::error::{Error, Result};

/// Configuration for the visualization server.
#[derive(Debug, Clone)]
pub struct VisConfig {
    /// HTTP listen address
    pub addr: SocketAddr,
    /// Default time between steps during playback
    pub interval: Duration,
    /// Keys to load at startup
    pub seed: Vec<i64>,
    /// Record the seed build instead of loading it instantly
    pub animate_seed: bool,
    pub layout: LayoutOptions,
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            interval: Duration::from_millis(700),
            seed: Vec::new(),
            animate_seed: false,
            layout: LayoutOptions::default(),
        }
    }
}

impl VisConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// Reads `ARBOR_ADDR`, `ARBOR_INTERVAL_MS` and `ARBOR_SEED`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("ARBOR_ADDR") {
            config.addr = addr
                .parse()
                .map_err(|_| Error::InvalidInput(format!("ARBOR_ADDR is not a socket address: {addr}")))?;
        }

        if let Some(ms) = lookup("ARBOR_INTERVAL_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| Error::InvalidInput(format!("ARBOR_INTERVAL_MS is not a number: {ms}")))?;
            config.interval = Duration::from_millis(ms.max(1));
        }

        if let Some(seed) = lookup("ARBOR_SEED") {
            config.seed = parse_values(&seed);
        }

        Ok(config)
    }
}

/// Split `input` on whitespace and commas, keeping every token that parses.
///
/// ```
/// assert_eq!(arbor_vis::parse_values::<i64>("10, 20 x 30,"), vec![10, 20, 30]);
/// ```
pub fn parse_values<T: FromStr>(input: &str) -> Vec<T> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse().ok())
        .collect()
}
