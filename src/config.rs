use crate::browser::{get_preset, DEFAULT_PRESET, PRESET_NAMES};
use crate::error::{Error, Result};
use crate::lookup::ProviderSchema;
use crate::matcher::DEFAULT_KNOWN_PROVIDERS;
use crate::probe::DEFAULT_STUN_SERVERS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REPLY_WAIT_MS: u64 = 1_500;

/// Detector settings. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name fragments of hosting/VPN operators.
    pub known_providers: Vec<String>,
    /// Lookup services in priority order.
    pub providers: Vec<ProviderConfig>,
    pub probe: ProbeConfig,
    pub lookup_timeout_ms: u64,
    /// Browser preset used for lookup requests.
    pub browser: String,
    /// Upstream proxy for lookup requests (http://, socks5://).
    pub proxy: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub name: String,
    /// URL with an `{ip}` placeholder.
    pub url: String,
    pub schema: ProviderSchema,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub enabled: bool,
    pub servers: Vec<String>,
    /// Upper bound for a whole probe session.
    pub timeout_ms: u64,
    /// How long to wait for each server's binding response.
    pub reply_wait_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            known_providers: DEFAULT_KNOWN_PROVIDERS.iter().map(|s| s.to_string()).collect(),
            providers: default_providers(),
            probe: ProbeConfig::default(),
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            browser: DEFAULT_PRESET.to_string(),
            proxy: None,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            servers: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            reply_wait_ms: DEFAULT_REPLY_WAIT_MS,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reply_wait(&self) -> Duration {
        Duration::from_millis(self.reply_wait_ms)
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "ipwho.is".into(),
            url: "https://ipwho.is/{ip}".into(),
            schema: ProviderSchema::IpWhois,
        },
        ProviderConfig {
            name: "ipinfo.io".into(),
            url: "https://ipinfo.io/{ip}/json".into(),
            schema: ProviderSchema::IpInfo,
        },
        ProviderConfig {
            name: "ip-api.com".into(),
            url: "http://ip-api.com/json/{ip}".into(),
            schema: ProviderSchema::IpApi,
        },
    ]
}

impl Config {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let body = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&body)?;
        config.validate()?;
        Ok(config)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::Config("at least one lookup provider is required".into()));
        }
        for (idx, provider) in self.providers.iter().enumerate() {
            if provider.name.trim().is_empty() {
                return Err(Error::Config(format!("provider #{} has no name", idx + 1)));
            }
            if self.providers[..idx].iter().any(|p| p.name == provider.name) {
                return Err(Error::Config(format!("duplicate provider {}", provider.name)));
            }
        }
        if self.known_providers.iter().all(|f| f.trim().is_empty()) {
            return Err(Error::Config("known_providers is empty".into()));
        }
        if get_preset(&self.browser).is_none() {
            return Err(Error::Config(format!(
                "unknown browser preset {} (expected one of {})",
                self.browser,
                PRESET_NAMES.join(", ")
            )));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(Error::Config("lookup_timeout_ms must be positive".into()));
        }
        if self.probe.enabled && (self.probe.timeout_ms == 0 || self.probe.reply_wait_ms == 0) {
            return Err(Error::Config("probe timeouts must be positive".into()));
        }
        Ok(())
    }
}
