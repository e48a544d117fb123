/**
 * Startup configuration for the bridge: base URL, static headers and the
 * diagnostic log location.
 */
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{path::PathBuf, time::Duration};

use crate::error::BridgeError;

/// Base URL used by `--dev` when no URL is given on the command line.
pub const DEV_BASE_URL: &str = "http://localhost:4858/McpHandler.ashx";

/// Path appended to the base URL to open the event stream.
pub const SSE_PATH: &str = "/sse";

/// Static headers attached to every outgoing request.
///
/// Names are case-insensitive; inserting a name twice keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct HeaderSet {
    map: HeaderMap,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), BridgeError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| BridgeError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| BridgeError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.map.insert(header_name, header_value);
        Ok(())
    }

    /// Build a header set from a flat `name value name value ...` list.
    /// A trailing name without a value is ignored.
    pub fn from_flat(values: &[String]) -> Result<Self, BridgeError> {
        let mut headers = Self::new();
        for pair in values.chunks_exact(2) {
            headers.insert(&pair[0], &pair[1])?;
        }
        Ok(headers)
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn extend(&mut self, other: HeaderSet) {
        for (name, value) in other.map.iter() {
            self.map.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.map
    }
}

/// Configuration for the SSE client side of the bridge
#[derive(Debug, Clone)]
pub struct SseClientConfig {
    /// Server base URL without a trailing slash.
    pub base_url: String,
    pub headers: HeaderSet,
    /// Directory for the per-run traffic log. `None` disables the file.
    pub traffic_log_dir: Option<PathBuf>,
    /// TCP connect timeout. No overall request timeout is applied because the
    /// event stream stays open for the whole session.
    pub connect_timeout: Option<Duration>,
}

impl SseClientConfig {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            headers: HeaderSet::new(),
            traffic_log_dir: None,
            connect_timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_traffic_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.traffic_log_dir = Some(dir.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn sse_url(&self) -> String {
        format!("{}{}", self.base_url, SSE_PATH)
    }
}

pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Default location of the traffic log: the platform temp directory.
pub fn default_log_dir() -> PathBuf {
    std::env::temp_dir()
}
