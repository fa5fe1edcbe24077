//! Host permission patterns and the gate that tracks which ones are granted.

use std::sync::RwLock;

use async_trait::async_trait;
use url::Url;

/// A host permission pattern like `<all_urls>`, `*://*.example.com/*` or `https://example.com/path/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    raw: String,
    scheme: SchemeMatch,
    host: HostMatch,
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemeMatch {
    Any,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatch {
    Any,
    Exact(String),
    Suffix(String), // *.example.com
}

impl MatchPattern {
    pub fn parse(pattern: &str) -> Option<Self> {
        if pattern == "<all_urls>" {
            return Some(MatchPattern {
                raw: pattern.to_string(),
                scheme: SchemeMatch::Any,
                host: HostMatch::Any,
                path: "/*".to_string(),
            });
        }

        let (scheme_str, rest) = pattern.split_once("://")?;
        let scheme = if scheme_str == "*" {
            SchemeMatch::Any
        } else {
            SchemeMatch::Exact(scheme_str.to_ascii_lowercase())
        };

        let (host_str, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, "/*".to_string()),
        };

        let host = if host_str == "*" {
            HostMatch::Any
        } else if let Some(suffix) = host_str.strip_prefix("*.") {
            HostMatch::Suffix(suffix.to_ascii_lowercase())
        } else if host_str.is_empty() {
            return None;
        } else {
            HostMatch::Exact(host_str.to_ascii_lowercase())
        };

        Some(MatchPattern {
            raw: pattern.to_string(),
            scheme,
            host,
            path,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches_url(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            SchemeMatch::Any => matches!(url.scheme(), "http" | "https"),
            SchemeMatch::Exact(s) => url.scheme() == s,
        };
        if !scheme_ok {
            return false;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        if !self.host_matches(host) {
            return false;
        }

        path_matches(&self.path, url.path())
    }

    /// Whether every URL this pattern would match (`other`) is also matched by `self`.
    pub fn covers(&self, other: &MatchPattern) -> bool {
        let scheme_ok = match (&self.scheme, &other.scheme) {
            (SchemeMatch::Any, SchemeMatch::Any) => true,
            (SchemeMatch::Any, SchemeMatch::Exact(s)) => s == "http" || s == "https",
            (SchemeMatch::Exact(_), SchemeMatch::Any) => false,
            (SchemeMatch::Exact(a), SchemeMatch::Exact(b)) => a == b,
        };
        if !scheme_ok {
            return false;
        }

        let host_ok = match (&self.host, &other.host) {
            (HostMatch::Any, _) => true,
            (_, HostMatch::Any) => false,
            (HostMatch::Exact(a), HostMatch::Exact(b)) => a == b,
            (HostMatch::Exact(_), HostMatch::Suffix(_)) => false,
            (HostMatch::Suffix(_), HostMatch::Exact(b)) => self.host_matches(b),
            (HostMatch::Suffix(a), HostMatch::Suffix(b)) => b == a || b.ends_with(&format!(".{a}")),
        };
        if !host_ok {
            return false;
        }

        match other.path.strip_suffix('*') {
            // A glob path is covered only by a glob with a shorter or equal prefix.
            Some(prefix) => self
                .path
                .strip_suffix('*')
                .is_some_and(|own| prefix.starts_with(own)),
            None => path_matches(&self.path, &other.path),
        }
    }

    fn host_matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match &self.host {
            HostMatch::Any => true,
            HostMatch::Exact(h) => host == *h,
            HostMatch::Suffix(suffix) => host == *suffix || host.ends_with(&format!(".{suffix}")),
        }
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    if pattern == "/*" || pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}

/// Origin-wide permission patterns (`scheme://host/*`) for the given URLs, deduplicated and sorted.
pub fn permissions_for_urls<'a>(urls: impl IntoIterator<Item = &'a Url>) -> Vec<String> {
    let mut patterns: Vec<String> = urls
        .into_iter()
        .filter_map(|url| {
            url.host_str()
                .map(|host| format!("{}://{}/*", url.scheme(), host))
        })
        .collect();
    patterns.sort();
    patterns.dedup();
    patterns
}

/// Tracks optional host permissions and requests new ones.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether every pattern is covered by a granted permission.
    async fn has_permissions(&self, patterns: &[String]) -> bool;

    /// Ask the user to grant the patterns. Returns the user's decision.
    async fn request_permissions(&self, patterns: &[String]) -> bool;
}

/// An in-memory set of granted patterns that never prompts.
///
/// `request_permissions` only reports whether the patterns are already held; interactive
/// front ends wrap this to ask the user and call [`GrantedPermissions::grant`].
#[derive(Debug, Default)]
pub struct GrantedPermissions {
    granted: RwLock<Vec<MatchPattern>>,
}

impl GrantedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a list of patterns. Unparseable patterns are skipped.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let gate = Self::new();
        gate.grant(patterns);
        gate
    }

    pub fn grant<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut granted = self.granted.write().unwrap_or_else(|e| e.into_inner());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match MatchPattern::parse(pattern) {
                Some(parsed) if !granted.contains(&parsed) => granted.push(parsed),
                Some(_) => {}
                None => tracing::warn!(pattern, "Ignoring unparseable permission pattern"),
            }
        }
    }

    pub fn granted(&self) -> Vec<String> {
        self.granted
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|p| p.as_str().to_string())
            .collect()
    }

    /// Whether `pattern` is covered by some granted pattern.
    pub fn holds(&self, pattern: &str) -> bool {
        let Some(requested) = MatchPattern::parse(pattern) else {
            return false;
        };
        self.granted
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|granted| granted.covers(&requested))
    }

    /// Whether `url` is reachable under some granted pattern.
    pub fn allows_url(&self, url: &Url) -> bool {
        self.granted
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|granted| granted.matches_url(url))
    }
}

#[async_trait]
impl PermissionGate for GrantedPermissions {
    async fn has_permissions(&self, patterns: &[String]) -> bool {
        patterns.iter().all(|p| self.holds(p))
    }

    async fn request_permissions(&self, patterns: &[String]) -> bool {
        self.has_permissions(patterns).await
    }
}
