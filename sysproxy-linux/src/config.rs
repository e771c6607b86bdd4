//! Load config from file and environment.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use sysproxy_core::ProxyConfig;

/// Tool configuration. File: ~/.config/sysproxy/config.toml or /etc/sysproxy/config.toml.
/// Env overrides: SYSPROXY_SNAPSHOT_PATH, SYSPROXY_LOG_LEVEL, SYSPROXY_RELOAD_KDE.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Snapshot file (default: per-user config directory).
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// tracing level filter (default "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Ask kded to reload its proxy module after KDE writes (default true).
    #[serde(default = "default_reload_kde")]
    pub reload_kde: bool,
    /// Proxy used by `run` when none is given on the command line.
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_reload_kde() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            log_level: default_log_level(),
            reload_kde: default_reload_kde(),
            proxy: None,
        }
    }
}

/// Load config: an explicit path must parse; otherwise the first existing
/// default file, else defaults. Env vars are applied last.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let mut c = match explicit {
        Some(path) => read_file(path)?,
        None => load_file().unwrap_or_default(),
    };
    apply_env(&mut c, |name| std::env::var(name).ok());
    Ok(c)
}

/// Apply `SYSPROXY_*` overrides through `lookup`.
pub fn apply_env(c: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(s) = lookup("SYSPROXY_SNAPSHOT_PATH").filter(|s| !s.is_empty()) {
        c.snapshot_path = Some(PathBuf::from(s));
    }
    if let Some(s) = lookup("SYSPROXY_LOG_LEVEL").filter(|s| !s.is_empty()) {
        c.log_level = s;
    }
    if let Some(s) = lookup("SYSPROXY_RELOAD_KDE") {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => c.reload_kde = true,
            "0" | "false" | "no" | "off" => c.reload_kde = false,
            _ => tracing::warn!(value = %s, "ignoring invalid SYSPROXY_RELOAD_KDE"),
        }
    }
}

fn config_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        out.push(dir.join("sysproxy/config.toml"));
    }
    out.push(PathBuf::from("/etc/sysproxy/config.toml"));
    out
}

fn read_file(path: &Path) -> anyhow::Result<Config> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            match read_file(&p) {
                Ok(c) => return Some(c),
                Err(e) => tracing::warn!(error = %format!("{:#}", e), "ignoring config file"),
            }
            break;
        }
    }
    None
}
