// src/config/relay.rs
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{parse_bool, parse_num};
use crate::bots::trades::{StockPolicy, TradeFilter};
use crate::classify::DEFAULT_SITE_BASE;
use crate::error::ConfigError;
use crate::feed::thetagang::DEFAULT_API_BASE;
use crate::message::BatchPolicy;

const ENV_PATH: &str = "RELAY_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/relay.toml";

/// Optional `relay.toml`. Every key may be omitted; environment variables
/// override whatever is set here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub webhook_url: Option<String>,
    pub api_base: Option<String>,
    pub site_base: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub batch_messages: Option<bool>,
    pub seen_capacity: Option<usize>,
    pub metrics_addr: Option<String>,
    pub trades: TradesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TradesSection {
    pub patrons_only: Option<bool>,
    pub openings_only: Option<bool>,
    pub stock_policy: Option<StockPolicy>,
}

impl FileConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 1) $RELAY_CONFIG_PATH (must exist)
    /// 2) config/relay.toml
    /// 3) nothing: all defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(&p);
            if !pb.exists() {
                return Err(ConfigError::File {
                    path: p,
                    message: "RELAY_CONFIG_PATH points to non-existent path".into(),
                });
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub webhook_url: String,
    pub api_base: String,
    pub site_base: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub batch: BatchPolicy,
    /// `None` keeps every seen key for the life of the process.
    pub seen_capacity: Option<usize>,
    pub trade_filter: TradeFilter,
    pub metrics_addr: Option<SocketAddr>,
}

impl RelayConfig {
    /// File + process environment. Fails fast when `WEBHOOK_URL` is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let file = FileConfig::load_default()?;
        Self::from_sources(file, |k| std::env::var(k).ok())
    }

    pub fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |k: &str| env(k).filter(|v| !v.trim().is_empty());

        let webhook_url = env("WEBHOOK_URL")
            .or(file.webhook_url)
            .ok_or(ConfigError::Missing("WEBHOOK_URL"))?;
        if !webhook_url.starts_with("http://") && !webhook_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_URL",
                value: webhook_url,
            });
        }

        let poll_secs = match env("POLL_INTERVAL_SECS") {
            Some(v) => parse_num("POLL_INTERVAL_SECS", &v)?,
            None => file.poll_interval_secs.unwrap_or(300),
        };
        let timeout_secs = match env("REQUEST_TIMEOUT_SECS") {
            Some(v) => parse_num("REQUEST_TIMEOUT_SECS", &v)?,
            None => file.request_timeout_secs.unwrap_or(10),
        };
        let batch = match env("BATCH_MESSAGES") {
            Some(v) => parse_bool("BATCH_MESSAGES", &v)?,
            None => file.batch_messages.unwrap_or(true),
        };
        let seen_capacity = match env("SEEN_CAPACITY") {
            Some(v) => Some(parse_num("SEEN_CAPACITY", &v)?),
            None => file.seen_capacity,
        };
        let metrics_addr = match env("METRICS_ADDR").or(file.metrics_addr) {
            Some(v) => Some(parse_num("METRICS_ADDR", &v)?),
            None => None,
        };

        let defaults = TradeFilter::default();
        let patrons_only = match env("TRADES_PATRONS_ONLY") {
            Some(v) => parse_bool("TRADES_PATRONS_ONLY", &v)?,
            None => file.trades.patrons_only.unwrap_or(defaults.patrons_only),
        };
        let openings_only = match env("TRADES_OPENINGS_ONLY") {
            Some(v) => parse_bool("TRADES_OPENINGS_ONLY", &v)?,
            None => file.trades.openings_only.unwrap_or(defaults.openings_only),
        };
        let stock_policy = match env("TRADES_STOCK_POLICY") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "TRADES_STOCK_POLICY",
                value: v.clone(),
            })?,
            None => file.trades.stock_policy.unwrap_or(defaults.stock_policy),
        };

        Ok(Self {
            webhook_url,
            api_base: env("THETAGANG_API_BASE")
                .or(file.api_base)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            site_base: env("THETAGANG_SITE_BASE")
                .or(file.site_base)
                .unwrap_or_else(|| DEFAULT_SITE_BASE.to_string()),
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            batch: if batch {
                BatchPolicy::Combine
            } else {
                BatchPolicy::Separate
            },
            seen_capacity,
            trade_filter: TradeFilter {
                patrons_only,
                openings_only,
                stock_policy,
            },
            metrics_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn webhook_is_required() {
        let err = RelayConfig::from_sources(FileConfig::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WEBHOOK_URL")));

        let err = RelayConfig::from_sources(FileConfig::default(), env_of(&[("WEBHOOK_URL", " ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WEBHOOK_URL")));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = RelayConfig::from_sources(
            FileConfig::default(),
            env_of(&[("WEBHOOK_URL", "https://discord.test/hook")]),
        )
        .unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(300));
        assert_eq!(cfg.api_base, "https://api.thetagang.com");
        assert_eq!(cfg.batch, BatchPolicy::Combine);
        assert_eq!(cfg.seen_capacity, None);
        assert_eq!(cfg.trade_filter, TradeFilter::default());
        assert!(cfg.metrics_addr.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
webhook_url = "https://discord.test/from-file"
poll_interval_secs = 60
batch_messages = false

[trades]
openings_only = false
stock_policy = "open-only"
"#,
        )
        .unwrap();
        let cfg = RelayConfig::from_sources(
            file,
            env_of(&[("POLL_INTERVAL_SECS", "30"), ("SEEN_CAPACITY", "5000")]),
        )
        .unwrap();
        assert_eq!(cfg.webhook_url, "https://discord.test/from-file");
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.batch, BatchPolicy::Separate);
        assert_eq!(cfg.seen_capacity, Some(5000));
        assert!(!cfg.trade_filter.openings_only);
        assert_eq!(cfg.trade_filter.stock_policy, StockPolicy::OpenOnly);
    }

    #[test]
    fn bad_values_are_reported_with_key() {
        let err = RelayConfig::from_sources(
            FileConfig::default(),
            env_of(&[("WEBHOOK_URL", "https://x.test"), ("BATCH_MESSAGES", "maybe")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BATCH_MESSAGES", .. }));

        let err = RelayConfig::from_sources(
            FileConfig::default(),
            env_of(&[("WEBHOOK_URL", "discord")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WEBHOOK_URL", .. }));
    }
}
