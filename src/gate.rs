//! Process-wide on/off switch for NetBox enrichment
//!
//! Loaded once at startup from environment variables. The disabling flag
//! wins over the enabling one.

use serde::Serialize;

/// Must be truthy for enrichment to run
pub const ENABLE_VAR: &str = "LOGSTASH_NETBOX_ENRICHMENT";
/// Turns enrichment off regardless of [`ENABLE_VAR`]
pub const DISABLE_VAR: &str = "NETBOX_DISABLED";

const TRUTHY: [&str; 5] = ["1", "true", "t", "on", "enabled"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentGate {
    enabled: bool,
}

impl EnrichmentGate {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the gate from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let requested = lookup(ENABLE_VAR).as_deref().is_some_and(env_truthy);
        let vetoed = lookup(DISABLE_VAR).as_deref().is_some_and(env_truthy);
        Self {
            enabled: requested && !vetoed,
        }
    }

    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// `1`, `true`, `t`, `on` or `enabled`, in any case. Surrounding
/// whitespace is not stripped.
pub fn env_truthy(value: &str) -> bool {
    let value = value.to_lowercase();
    TRUTHY.contains(&value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn gate(vars: &[(&str, &str)]) -> EnrichmentGate {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnrichmentGate::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_truthy_values() {
        for v in ["1", "true", "T", "On", "ENABLED"] {
            assert!(env_truthy(v), "{v} should be truthy");
        }
        for v in ["", "0", "false", "off", "yes", "disabled", " true ", "1\n"] {
            assert!(!env_truthy(v), "{v} should not be truthy");
        }
    }

    #[test]
    fn test_unset_is_disabled() {
        assert!(!gate(&[]).is_enabled());
    }

    #[test]
    fn test_enable_flag() {
        assert!(gate(&[(ENABLE_VAR, "true")]).is_enabled());
        assert!(!gate(&[(ENABLE_VAR, "nope")]).is_enabled());
    }

    #[test]
    fn test_padded_value_does_not_enable() {
        assert!(!gate(&[(ENABLE_VAR, " true ")]).is_enabled());
        assert!(gate(&[(ENABLE_VAR, "true"), (DISABLE_VAR, " on")]).is_enabled());
    }

    #[test]
    fn test_disable_flag_wins() {
        assert!(!gate(&[(ENABLE_VAR, "true"), (DISABLE_VAR, "on")]).is_enabled());
        assert!(gate(&[(ENABLE_VAR, "true"), (DISABLE_VAR, "false")]).is_enabled());
    }
}
