//! Proxy request passed in by the host: host, port, scheme, no-proxy list.

use serde::{Deserialize, Serialize};

/// Scheme used when the caller leaves it empty.
pub const DEFAULT_SCHEME: &str = "http";

/// Hosts that always bypass the proxy.
pub const DEFAULT_NO_PROXY: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Requested system proxy. Immutable for the duration of one apply call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub host: String,
    /// Kept wide so out-of-range input from a host can be rejected instead of truncated.
    pub port: i64,
    #[serde(default)]
    pub scheme: String,
    /// Comma-separated host list.
    #[serde(default)]
    pub no_proxy: String,
}

/// Reason a [`ProxyConfig`] was rejected before any backend was touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("proxy host is empty")]
    EmptyHost,
    #[error("proxy port {0} is outside 1..=65535")]
    PortOutOfRange(i64),
}

impl ProxyConfig {
    pub fn new(
        host: impl Into<String>,
        port: i64,
        scheme: impl Into<String>,
        no_proxy: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: scheme.into(),
            no_proxy: no_proxy.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if !(1..=65535).contains(&self.port) {
            return Err(ConfigError::PortOutOfRange(self.port));
        }
        Ok(())
    }

    pub fn host(&self) -> &str {
        self.host.trim()
    }

    pub fn scheme(&self) -> &str {
        let scheme = self.scheme.trim();
        if scheme.is_empty() {
            DEFAULT_SCHEME
        } else {
            scheme
        }
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn authority(&self) -> String {
        let host = self.host();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// `scheme://host:port`.
    pub fn proxy_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.authority())
    }

    /// URL for SOCKS-only keys. Keeps a SOCKS scheme if one was requested, else `socks5`.
    pub fn socks_url(&self) -> String {
        let scheme = self.scheme();
        if scheme.to_ascii_lowercase().starts_with("socks") {
            format!("{}://{}", scheme, self.authority())
        } else {
            format!("socks5://{}", self.authority())
        }
    }

    /// The no-proxy list as given, or the defaults joined with commas.
    pub fn no_proxy_value(&self) -> String {
        let value = self.no_proxy.trim();
        if value.is_empty() {
            DEFAULT_NO_PROXY.join(",")
        } else {
            value.to_string()
        }
    }

    /// Defaults followed by the extra entries, deduplicated, order preserved.
    pub fn ignore_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = DEFAULT_NO_PROXY.iter().map(|h| h.to_string()).collect();
        for entry in self.no_proxy.split(',') {
            let entry = entry.trim();
            if entry.is_empty() || hosts.iter().any(|h| h == entry) {
                continue;
            }
            hosts.push(entry.to_string());
        }
        hosts
    }
}
