use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    /// Sent verbatim once the connection opens.
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateConfig {
    pub resolution: Resolution,
}

/// Bar width, either raw milliseconds or an interval string such as `"1m"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Resolution {
    Millis(u64),
    Interval(String),
}

impl Resolution {
    pub fn as_millis(&self) -> Result<u64> {
        match self {
            Self::Millis(0) => bail!("invalid resolution: must be > 0 ms"),
            Self::Millis(ms) => Ok(*ms),
            Self::Interval(s) => match s.trim().parse::<u64>() {
                Ok(0) => bail!("invalid resolution: must be > 0 ms"),
                Ok(ms) => Ok(ms),
                Err(_) => parse_interval_ms(s.trim()),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parse an interval string (e.g. "1s", "1m", "1h", "1d", "1w", "1M") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    if s.len() < 2 {
        bail!("invalid interval '{}': expected format like '1m'", s);
    }

    let (num_str, suffix) = s.split_at(s.len() - 1);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        "M" => 30 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w/M",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl Config {
    /// Load `TICK_BARS_CONFIG` (or `config/default.toml`), then apply env overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("TICK_BARS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Replace file values with `FEED_URL`, `FEED_TOPIC` and `BAR_RESOLUTION` when set.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FEED_URL") {
            self.feed.url = url;
        }
        if let Some(topic) = lookup("FEED_TOPIC") {
            self.feed.topic = topic;
        }
        if let Some(resolution) = lookup("BAR_RESOLUTION") {
            self.aggregate.resolution = Resolution::Interval(resolution);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.feed.url)
            .with_context(|| format!("feed.url '{}' is not a valid URL", self.feed.url))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            bail!("feed.url must use ws:// or wss://, got '{}'", url.scheme());
        }
        if self.feed.topic.trim().is_empty() {
            bail!("feed.topic must not be empty");
        }
        self.resolution_ms()
            .context("aggregate.resolution is invalid")?;
        Ok(())
    }

    pub fn resolution_ms(&self) -> Result<u64> {
        self.aggregate.resolution.as_millis()
    }
}
