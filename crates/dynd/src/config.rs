//! Configuration loading for the dynd daemon
//!
//! Settings come from an optional JSON file, overlaid by `DYN_*` environment
//! variables. The file is the first existing entry of:
//!
//! 1. `$DYN_CONFIG` (explicit path, must exist)
//! 2. `/etc/dyn/config.json`
//! 3. `$HOME/.dyn/config.json`
//! 4. `./config.json`
//!
//! A missing file is fine when the environment supplies every required key.
//!
//! ```json
//! {
//!   "provider": { "apiToken": "..." },
//!   "dns": { "zone": "example.com", "record": "home" },
//!   "tick": "5m",
//!   "publicIp": { "resolver": "resolver1.opendns.com", "timeout": "5s" },
//!   "engine": { "onResolutionFailure": "skip" },
//!   "log": { "level": "info" }
//! }
//! ```

use anyhow::{Context, Result};
use dyn_core::config::{
    DnsConfig, DynConfig, EngineConfig, ProviderConfig, PublicIpQuery, ROOT_RECORD,
    parse_duration,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Environment variable holding an explicit config file path
pub const CONFIG_PATH_ENV: &str = "DYN_CONFIG";

/// Prefix shared by every environment override
const ENV_PREFIX: &str = "DYN_";

/// Fully resolved daemon settings
#[derive(Debug)]
pub struct Settings {
    /// Validated agent configuration
    pub dyn_config: DynConfig,

    /// Maximum log level
    pub log_level: Level,

    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the config file search path and the environment
    ///
    /// # Parameters
    ///
    /// - `lookup`: Environment accessor (`|key| std::env::var(key).ok()` in
    ///   production, a map in tests)
    pub fn load<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.trim().is_empty() => {
                let path = PathBuf::from(path);
                if !path.is_file() {
                    anyhow::bail!(
                        "{} points to {}, which does not exist",
                        CONFIG_PATH_ENV,
                        path.display()
                    );
                }
                Some(path)
            }
            _ => search_paths(&lookup).into_iter().find(|p| p.is_file()),
        };

        let mut raw = match &source {
            Some(path) => RawConfig::from_file(path)?,
            None => RawConfig::default(),
        };
        raw.apply_env(&lookup)?;

        let (dyn_config, log_level) = raw.resolve()?;

        Ok(Self {
            dyn_config,
            log_level,
            source,
        })
    }
}

/// Default config file locations, in search order
pub fn search_paths<F>(lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut paths = vec![PathBuf::from("/etc/dyn/config.json")];
    if let Some(home) = lookup("HOME").filter(|h| !h.is_empty()) {
        paths.push(Path::new(&home).join(".dyn").join("config.json"));
    }
    paths.push(PathBuf::from("config.json"));
    paths
}

/// Configuration as written in the file; everything optional until resolved
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawConfig {
    provider: RawProvider,
    dns: RawDns,
    tick: Option<String>,
    public_ip: RawPublicIp,
    engine: RawEngine,
    log: RawLog,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawProvider {
    api_key: Option<String>,
    email: Option<String>,
    api_token: Option<String>,
    dry_run: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDns {
    zone: Option<String>,
    record: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPublicIp {
    host: Option<String>,
    resolver: Option<String>,
    timeout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawEngine {
    on_resolution_failure: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLog {
    level: Option<String>,
}

impl RawConfig {
    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay `DYN_<SECTION>_<KEY>` variables (e.g. `DYN_DNS_ZONE`)
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));

        overlay(&mut self.provider.api_key, var("PROVIDER_APIKEY"));
        overlay(&mut self.provider.email, var("PROVIDER_EMAIL"));
        overlay(&mut self.provider.api_token, var("PROVIDER_APITOKEN"));
        if let Some(value) = var("PROVIDER_DRYRUN") {
            self.provider.dry_run = Some(parse_bool(&value).with_context(|| {
                format!("{}PROVIDER_DRYRUN '{}' is not a boolean", ENV_PREFIX, value)
            })?);
        }
        overlay(&mut self.dns.zone, var("DNS_ZONE"));
        overlay(&mut self.dns.record, var("DNS_RECORD"));
        overlay(&mut self.tick, var("TICK"));
        overlay(&mut self.public_ip.host, var("PUBLICIP_HOST"));
        overlay(&mut self.public_ip.resolver, var("PUBLICIP_RESOLVER"));
        overlay(&mut self.public_ip.timeout, var("PUBLICIP_TIMEOUT"));
        overlay(
            &mut self.engine.on_resolution_failure,
            var("ENGINE_ONRESOLUTIONFAILURE"),
        );
        overlay(&mut self.log.level, var("LOG_LEVEL"));

        Ok(())
    }

    /// Apply defaults, parse durations and validate
    fn resolve(self) -> Result<(DynConfig, Level)> {
        let provider = ProviderConfig::Cloudflare {
            api_key: self.provider.api_key,
            email: self.provider.email,
            api_token: self.provider.api_token,
            dry_run: self.provider.dry_run.unwrap_or(false),
        };

        let zone = self.dns.zone.context(
            "dns.zone is required. Set it in the config file or via: export DYN_DNS_ZONE=example.com",
        )?;
        let record = self.dns.record.unwrap_or_else(|| ROOT_RECORD.to_string());

        let tick = self
            .tick
            .context("tick is required. Set it in the config file or via: export DYN_TICK=5m")?;
        let tick = parse_duration("tick", &tick)?;

        let mut public_ip = PublicIpQuery::default();
        if let Some(host) = self.public_ip.host {
            public_ip.host = host;
        }
        if let Some(resolver) = self.public_ip.resolver {
            public_ip.resolver = resolver;
        }
        if let Some(timeout) = self.public_ip.timeout {
            public_ip.timeout = parse_duration("publicIp.timeout", &timeout)?;
        }

        let mut engine = EngineConfig::default();
        if let Some(policy) = self.engine.on_resolution_failure {
            engine.on_resolution_failure = policy.parse()?;
        }

        let log_level = parse_level(self.log.level.as_deref().unwrap_or("info"))?;

        let config = DynConfig {
            provider,
            dns: DnsConfig::new(zone, record),
            tick,
            public_ip,
            engine,
        };
        config.validate()?;

        Ok((config, log_level))
    }
}

/// Replace `slot` when the environment provides a non-empty value
fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        *slot = Some(value);
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => anyhow::bail!("expected true or false"),
    }
}

fn parse_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "log.level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}
