//! URL handling module for Docs-Mirror
//!
//! This module defines [`CanonicalUrl`], the crawl's unique key, and the
//! normalization rules that produce it.

mod normalize;

pub use normalize::{canonicalize, normalize_url};

use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// A normalized absolute URL
///
/// Only [`normalize_url`] and [`canonicalize`] construct one, so two values
/// compare equal exactly when the source site would serve the same resource
/// for both raw URLs (as far as the normalization rules can tell).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub(crate) fn from_normalized(url: Url) -> Self {
        Self(url)
    }

    /// Parses and normalizes a raw URL string
    pub fn parse(raw: &str) -> crate::UrlResult<Self> {
        normalize_url(raw)
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Lowercase host name (always present for a canonical URL)
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Host with an explicit non-default port, used to key per-host politeness
    pub fn host_key(&self) -> String {
        match self.0.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    /// True when both URLs share scheme, host and port
    pub fn same_origin(&self, other: &CanonicalUrl) -> bool {
        self.0.origin() == other.0.origin()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CanonicalUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
