use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a content-acquisition backend
///
/// The variant order is the fixed selection priority: the local,
/// credential-free backend first, then the remote backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Direct HTTP fetch plus local normalization
    Local,
    /// Hosted extraction service with native subpage discovery
    Exa,
    /// Hosted scraping service with cached results and high-fidelity HTML
    Firecrawl,
}

impl ProviderId {
    /// All providers in fixed priority order
    pub const ALL: [ProviderId; 3] = [Self::Local, Self::Exa, Self::Firecrawl];

    /// Returns the wire name of this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Exa => "exa",
            Self::Firecrawl => "firecrawl",
        }
    }

    /// Ordered alternates tried when this provider is rate limited
    pub fn alternates(&self) -> &'static [ProviderId] {
        match self {
            Self::Local => &[Self::Exa, Self::Firecrawl],
            Self::Exa => &[Self::Firecrawl, Self::Local],
            Self::Firecrawl => &[Self::Exa, Self::Local],
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "exa" => Ok(Self::Exa),
            "firecrawl" => Ok(Self::Firecrawl),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}
