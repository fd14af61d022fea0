//! Host allow-list for dry-run network policy
//!
//! The effective allow-list for a run is the union of the globally
//! configured hosts and the hosts the shift itself declares. Entries are
//! either exact host strings or `*.` wildcard patterns.

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// Matches the host exactly (case-insensitive)
    Exact(String),
    /// `*.example.com`: matches any subdomain of example.com
    Wildcard(String),
}

impl HostPattern {
    /// Parse an entry; `*.suffix` becomes a wildcard, anything else exact.
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim().to_lowercase();
        match entry.strip_prefix("*.") {
            Some(suffix) => HostPattern::Wildcard(suffix.to_string()),
            None => HostPattern::Exact(entry),
        }
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        match self {
            HostPattern::Exact(exact) => host == *exact,
            HostPattern::Wildcard(suffix) => {
                host == *suffix || host.ends_with(&format!(".{suffix}"))
            },
        }
    }
}

/// Union of global and per-shift allow-list entries.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    patterns: Vec<HostPattern>,
}

impl AllowList {
    /// Build from the global config list and the shift's declared list.
    pub fn union(global: &[String], declared: &[String]) -> Self {
        let patterns = global
            .iter()
            .chain(declared.iter())
            .filter(|e| !e.trim().is_empty())
            .map(|e| HostPattern::parse(e))
            .collect();
        Self { patterns }
    }

    pub fn allows(&self, host: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(host))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
