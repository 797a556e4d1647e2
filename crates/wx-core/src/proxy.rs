//! Dev-server proxy rules.
//!
//! A [`ProxyTable`] maps URL path prefixes to a [`ProxyRule`] describing where
//! matching requests are forwarded. Keys keep the order they were declared in,
//! and lookups walk them in that order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// Forwarding target for one path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRule {
    /// Base URL (scheme, host, port and optional base path) of the upstream
    pub target: Url,

    /// Rewrite the outbound `Host` header to the target's authority
    #[serde(default, alias = "change_origin")]
    pub change_origin: bool,
}

impl ProxyRule {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            change_origin: false,
        }
    }

    pub fn with_change_origin(mut self, change_origin: bool) -> Self {
        self.change_origin = change_origin;
        self
    }

    /// Build the upstream URL for an incoming `path?query`.
    ///
    /// The full original path is appended to the target's base path; the
    /// matched prefix is not stripped.
    ///
    /// # Errors
    /// Returns an error if the joined string is not a valid URL.
    pub fn upstream_url(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        let base = self.target.as_str().trim_end_matches('/');
        let path_and_query = if path_and_query.starts_with('/') {
            path_and_query.to_string()
        } else {
            format!("/{path_and_query}")
        };
        Url::parse(&format!("{base}{path_and_query}"))
    }

    /// `Host` header value for the target: `host`, or `host:port` when the port
    /// is not the scheme's default.
    pub fn host_header(&self) -> Option<String> {
        let host = self.target.host_str()?;
        Some(match self.target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }
}

/// Ordered mapping from path prefix to [`ProxyRule`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyTable {
    rules: IndexMap<String, ProxyRule>,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule. A duplicate prefix replaces the previous rule in place
    /// and returns it.
    pub fn insert(&mut self, prefix: impl Into<String>, rule: ProxyRule) -> Option<ProxyRule> {
        self.rules.insert(prefix.into(), rule)
    }

    pub fn get(&self, prefix: &str) -> Option<&ProxyRule> {
        self.rules.get(prefix)
    }

    /// First rule, in declaration order, whose prefix starts `path`.
    pub fn find(&self, path: &str) -> Option<(&str, &ProxyRule)> {
        self.iter().find(|(prefix, _)| path.starts_with(*prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProxyRule)> {
        self.rules.iter().map(|(p, r)| (p.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// Order decides which prefix matches first, so it takes part in equality
impl PartialEq for ProxyTable {
    fn eq(&self, other: &Self) -> bool {
        self.rules.iter().eq(other.rules.iter())
    }
}

impl Eq for ProxyTable {}

impl<K: Into<String>> FromIterator<(K, ProxyRule)> for ProxyTable {
    fn from_iter<I: IntoIterator<Item = (K, ProxyRule)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().map(|(k, r)| (k.into(), r)).collect(),
        }
    }
}
