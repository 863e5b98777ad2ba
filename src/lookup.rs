//! Lookup categories
//!
//! The closed set of NetBox queries the engine knows how to run.

use serde::{Deserialize, Serialize};

/// Which remote query/extraction to run for a lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupType {
    /// Devices and virtual machines an IP address is assigned to
    IpDevice,
    /// VRFs of the prefixes containing an IP address
    IpVrf,
    /// Declared for configuration compatibility; resolves to no enrichment
    MacDevice,
}

impl LookupType {
    pub const ALL: [LookupType; 3] = [Self::IpDevice, Self::IpVrf, Self::MacDevice];

    /// Parse a configured lookup type; unknown names yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpDevice => "ip_device",
            Self::IpVrf => "ip_vrf",
            Self::MacDevice => "mac_device",
        }
    }

    /// Whether a remote query exists for this category
    pub fn is_implemented(&self) -> bool {
        !matches!(self, Self::MacDevice)
    }
}

impl std::fmt::Display for LookupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
