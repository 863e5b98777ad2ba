//! Enrichment options
//!
//! [`EnrichConfig`] is the raw option set as it appears in a pipeline
//! definition. [`EnrichConfig::resolve`] validates it, reads any referenced
//! environment variables and produces typed [`EnrichSettings`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::gate::env_truthy;
use crate::lookup::LookupType;
use crate::record::FieldPath;

/// API path suffix of `netbox_url`; stripping it yields the URL base
pub const NETBOX_URL_SUFFIX: &str = "/netbox/api";

const DEFAULT_NETBOX_URL: &str = "http://netbox:8080/netbox/api";

/// Longest `cache_ttl` the cache accepts: 1000 years of 365 days
pub const MAX_CACHE_TTL_SECS: u64 = 1000 * 365 * 24 * 3600;

/// A flag given as a YAML/JSON boolean, number or string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl FlagValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Number(n) => *n == 1,
            FlagValue::Text(s) => env_truthy(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichConfig {
    /// Field holding the lookup key
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub lookup_type: Option<String>,

    /// Field receiving the aggregated result
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: u64,

    /// Seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    #[serde(default = "default_lookup_cache_size")]
    pub lookup_cache_size: u64,

    #[serde(default)]
    pub verbose: Option<FlagValue>,

    #[serde(default)]
    pub verbose_env: Option<String>,

    #[serde(default = "default_netbox_url")]
    pub netbox_url: String,

    #[serde(default)]
    pub netbox_token: Option<String>,

    #[serde(default)]
    pub netbox_token_env: Option<String>,
}

fn default_page_size() -> usize {
    50
}

fn default_cache_size() -> u64 {
    1000
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_lookup_cache_size() -> u64 {
    512
}

fn default_netbox_url() -> String {
    DEFAULT_NETBOX_URL.to_string()
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            source: None,
            lookup_type: None,
            target: None,
            page_size: default_page_size(),
            cache_size: default_cache_size(),
            cache_ttl: default_cache_ttl(),
            lookup_cache_size: default_lookup_cache_size(),
            verbose: None,
            verbose_env: None,
            netbox_url: default_netbox_url(),
            netbox_token: None,
            netbox_token_env: None,
        }
    }
}

/// Validated, typed options
#[derive(Debug, Clone)]
pub struct EnrichSettings {
    pub source: Option<FieldPath>,
    pub lookup_type: Option<LookupType>,
    pub target: Option<FieldPath>,
    pub page_size: usize,
    pub cache_size: u64,
    pub cache_ttl: Duration,
    pub lookup_cache_size: u64,
    pub verbose: bool,
    /// `netbox_url` without a trailing slash
    pub netbox_url: String,
    /// `netbox_url` with [`NETBOX_URL_SUFFIX`] removed
    pub url_base: String,
    pub netbox_token: Option<String>,
}

impl EnrichConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn resolve(&self) -> Result<EnrichSettings, ConfigError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup
    pub fn resolve_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<EnrichSettings, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroBound {
                option: "page_size",
            });
        }
        if self.cache_size == 0 {
            return Err(ConfigError::ZeroBound {
                option: "cache_size",
            });
        }
        if self.lookup_cache_size == 0 {
            return Err(ConfigError::ZeroBound {
                option: "lookup_cache_size",
            });
        }
        if self.cache_ttl > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::TtlTooLong {
                seconds: self.cache_ttl,
                max: MAX_CACHE_TTL_SECS,
            });
        }

        let netbox_url = self.netbox_url.trim().trim_end_matches('/').to_string();
        url::Url::parse(&netbox_url).map_err(|source| ConfigError::InvalidUrl {
            url: netbox_url.clone(),
            source,
        })?;
        let url_base = netbox_url
            .strip_suffix(NETBOX_URL_SUFFIX)
            .unwrap_or(&netbox_url)
            .to_string();

        let lookup_type = match self.lookup_type.as_deref() {
            Some(name) if !name.trim().is_empty() => {
                let parsed = LookupType::parse(name);
                if parsed.is_none() {
                    tracing::warn!(lookup_type = %name, "Unknown lookup type, enrichment disabled");
                }
                parsed
            }
            _ => None,
        };

        let verbose = match (&self.verbose, &self.verbose_env) {
            (Some(flag), _) => flag.is_truthy(),
            (None, Some(var)) => env(var.as_str()).as_deref().is_some_and(env_truthy),
            (None, None) => false,
        };

        let netbox_token = self
            .netbox_token
            .clone()
            .or_else(|| self.netbox_token_env.as_deref().and_then(&env));

        Ok(EnrichSettings {
            source: parse_optional_path(self.source.as_deref())?,
            lookup_type,
            target: parse_optional_path(self.target.as_deref())?,
            page_size: self.page_size,
            cache_size: self.cache_size,
            cache_ttl: Duration::from_secs(self.cache_ttl),
            lookup_cache_size: self.lookup_cache_size,
            verbose,
            netbox_url,
            url_base,
            netbox_token,
        })
    }
}

fn parse_optional_path(reference: Option<&str>) -> Result<Option<FieldPath>, ConfigError> {
    match reference {
        Some(r) if !r.trim().is_empty() => FieldPath::parse(r).map(Some),
        _ => Ok(None),
    }
}
