//! Wire vocabulary shared by every layer of the crate.
//!
//! # Design
//! These types describe an HTTP call as plain data. Nothing here performs
//! I/O: the engine turns them into a [`crate::transport::TransportRequest`]
//! and the host-supplied transport executes it.
//!
//! [`Params`] keeps insertion order because query strings and form bodies are
//! emitted in the order the caller inserted the pairs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Header map. Keys are compared verbatim, so the caller's spelling wins.
pub type Headers = BTreeMap<String, String>;

/// HTTP method for a request. Defaults to `GET`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache policy hint handed through to the transport untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Follow whatever the protocol (cache headers) says.
    #[default]
    UseProtocol,
    /// Always go to the origin.
    ReloadIgnoringCache,
    /// Serve cached data when present, otherwise load.
    ReturnCacheElseLoad,
    /// Serve cached data only; never load.
    ReturnCacheDontLoad,
}

/// Ordered string-keyed parameters whose values may be explicitly null.
///
/// Used for path placeholders, query fields and url-encoded bodies. A null
/// value is kept (it still occupies its slot) but is skipped by every
/// consumer. Re-inserting an existing key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, Option<String>)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key`, replacing the value of an existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`Params::insert`] for a present value.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, Some(value.to_string()));
        self
    }

    /// Builder form of [`Params::insert`] for an explicit null.
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.insert(key, None);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order, nulls included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Entries with a value, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value.map(|v| v.to_string()));
        }
        params
    }
}

/// Case-insensitive header lookup.
pub(crate) fn has_header(headers: &Headers, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}
