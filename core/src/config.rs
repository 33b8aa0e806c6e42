//! Per-backend service configuration.
//!
//! # Design
//! A `ServiceConfig` is built once at startup, either explicitly or from a
//! [`Manifest`], and then shared read-only by every in-flight request.
//! Equality looks at the base URL only (case-insensitively); the name is a
//! debugging label.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::http::{CachePolicy, Headers};

/// Timeout applied when neither the request nor the config overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Root key of the service entry in a manifest.
const ENDPOINT: &str = "endpoint";

/// Nested key lookup over a structured document.
///
/// Paths are dotted (`endpoint.base`). Implementations return `None` for
/// missing keys and for values of the wrong shape.
pub trait Manifest {
    fn string(&self, path: &str) -> Option<String>;

    fn number(&self, path: &str) -> Option<f64>;

    fn table(&self, path: &str) -> Option<BTreeMap<String, String>>;
}

impl Manifest for serde_json::Value {
    fn string(&self, path: &str) -> Option<String> {
        lookup(self, path)?.as_str().map(str::to_string)
    }

    fn number(&self, path: &str) -> Option<f64> {
        lookup(self, path)?.as_f64()
    }

    fn table(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let object = lookup(self, path)?.as_object()?;
        Some(
            object
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
        )
    }
}

fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(value, |node, key| node.get(key))
}

/// Connection settings for one backend.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    name: String,
    base: String,
    headers: Headers,
    cache_policy: CachePolicy,
    timeout: Duration,
}

impl ServiceConfig {
    /// Validate `base` and build a config with default settings.
    ///
    /// `name` defaults to the host of `base`.
    pub fn new(name: Option<&str>, base: &str) -> Result<Self, Error> {
        let url = Url::parse(base).map_err(|e| Error::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        let name = match name {
            Some(name) => name.to_string(),
            None => url.host_str().unwrap_or_default().to_string(),
        };
        Ok(Self {
            name,
            base: base.to_string(),
            headers: Headers::new(),
            cache_policy: CachePolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build a config from the `endpoint` entry of a manifest.
    ///
    /// Returns `Ok(None)` when the manifest has no `endpoint.base`, so the
    /// caller can fall back to [`ServiceConfig::new`]. An `endpoint.path`
    /// is appended to the base with a single `/` between them.
    pub fn from_manifest(manifest: &impl Manifest) -> Result<Option<Self>, Error> {
        let Some(base) = manifest.string(&format!("{ENDPOINT}.base")) else {
            return Ok(None);
        };
        let base = match manifest.string(&format!("{ENDPOINT}.path")) {
            Some(path) if !path.is_empty() => {
                format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
            }
            _ => base,
        };
        let name = manifest.string(&format!("{ENDPOINT}.name"));
        let mut config = Self::new(name.as_deref(), &base)?;
        if let Some(headers) = manifest.table(&format!("{ENDPOINT}.headers")) {
            config.headers = headers;
        }
        // Out-of-range values keep the default.
        if let Some(timeout) = manifest
            .number(&format!("{ENDPOINT}.timeout"))
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
        {
            config.timeout = timeout;
        }
        Ok(Some(config))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL exactly as configured.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl PartialEq for ServiceConfig {
    fn eq(&self, other: &Self) -> bool {
        self.base.to_lowercase() == other.base.to_lowercase()
    }
}

impl Eq for ServiceConfig {}

impl fmt::Display for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.base)
    }
}
