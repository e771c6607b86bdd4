//! Captured state of every backend for one applied session.
//!
//! Every optional value distinguishes "absent" (`None`) from "present but empty"
//! (`Some("")`). A `None` is never written back on restore.

/// Current on-disk snapshot format version. Loading accepts `1..=SNAPSHOT_VERSION`.
pub const SNAPSHOT_VERSION: i64 = 1;

/// Proxy-related environment variables, lower-case first.
pub const PROXY_ENV_VARS: [&str; 10] = [
    "http_proxy",
    "https_proxy",
    "ftp_proxy",
    "all_proxy",
    "no_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "FTP_PROXY",
    "ALL_PROXY",
    "NO_PROXY",
];

/// Protocol groups of a keyed-settings proxy schema, in apply order.
pub const PROXY_GROUPS: [ProxyGroup; 4] = [
    ProxyGroup::Http,
    ProxyGroup::Https,
    ProxyGroup::Socks,
    ProxyGroup::Ftp,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyGroup {
    Http,
    Https,
    Socks,
    Ftp,
}

impl ProxyGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyGroup::Http => "http",
            ProxyGroup::Https => "https",
            ProxyGroup::Socks => "socks",
            ProxyGroup::Ftp => "ftp",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub env: EnvSnapshot,
    pub keyed_settings: Vec<KeyedSettingsSnapshot>,
    pub property_store: PropertyStoreSnapshot,
    pub ini: IniConfigSnapshot,
    pub profiles: NetworkProfileSnapshot,
}

impl Snapshot {
    pub fn keyed_settings(&self, schema: &str) -> Option<&KeyedSettingsSnapshot> {
        self.keyed_settings.iter().find(|s| s.schema == schema)
    }

    /// Entry for `schema`, created empty (not captured) if missing.
    pub fn keyed_settings_entry(&mut self, schema: &str) -> &mut KeyedSettingsSnapshot {
        let idx = match self.keyed_settings.iter().position(|s| s.schema == schema) {
            Some(idx) => idx,
            None => {
                self.keyed_settings.push(KeyedSettingsSnapshot::new(schema));
                self.keyed_settings.len() - 1
            }
        };
        &mut self.keyed_settings[idx]
    }

    /// True when any backend recorded state.
    pub fn is_captured(&self) -> bool {
        self.env.captured
            || self.keyed_settings.iter().any(|s| s.captured)
            || self.property_store.captured
            || self.ini.captured
            || self.profiles.captured
    }
}

/// Original values of [`PROXY_ENV_VARS`]; `None` means the variable was unset (or empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub captured: bool,
    pub vars: Vec<(String, Option<String>)>,
}

impl Default for EnvSnapshot {
    fn default() -> Self {
        Self {
            captured: false,
            vars: PROXY_ENV_VARS.iter().map(|n| (n.to_string(), None)).collect(),
        }
    }
}

impl EnvSnapshot {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn set(&mut self, name: &str, value: Option<String>) {
        match self.vars.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name.to_string(), value)),
        }
    }
}

/// Host/port/enabled keys of one `<schema>.<group>` sub-schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub host: Option<String>,
    pub port: Option<String>,
    pub enabled: Option<String>,
}

impl GroupSnapshot {
    pub fn exists(&self) -> bool {
        self.host.is_some() || self.port.is_some()
    }
}

/// One keyed-settings proxy schema (GNOME, Cinnamon, MATE, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedSettingsSnapshot {
    pub schema: String,
    pub captured: bool,
    pub mode: Option<String>,
    pub use_same_proxy: Option<String>,
    pub ignore_hosts: Option<String>,
    pub http: GroupSnapshot,
    pub https: GroupSnapshot,
    pub socks: GroupSnapshot,
    pub ftp: GroupSnapshot,
}

impl KeyedSettingsSnapshot {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    pub fn group(&self, group: ProxyGroup) -> &GroupSnapshot {
        match group {
            ProxyGroup::Http => &self.http,
            ProxyGroup::Https => &self.https,
            ProxyGroup::Socks => &self.socks,
            ProxyGroup::Ftp => &self.ftp,
        }
    }

    pub fn group_mut(&mut self, group: ProxyGroup) -> &mut GroupSnapshot {
        match group {
            ProxyGroup::Http => &mut self.http,
            ProxyGroup::Https => &mut self.https,
            ProxyGroup::Socks => &mut self.socks,
            ProxyGroup::Ftp => &mut self.ftp,
        }
    }

    pub fn supports_use_same_proxy(&self) -> bool {
        self.use_same_proxy.is_some()
    }

    pub fn supports_ignore_hosts(&self) -> bool {
        self.ignore_hosts.is_some()
    }

    pub fn supports_enabled(&self, group: ProxyGroup) -> bool {
        self.group(group).enabled.is_some()
    }

    pub fn supports_ftp(&self) -> bool {
        self.ftp.exists()
    }
}

/// Host and port properties of one protocol in the property store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPortSnapshot {
    pub host: Option<String>,
    pub port: Option<String>,
}

/// XFCE-style hierarchical property store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStoreSnapshot {
    pub captured: bool,
    pub channel: String,
    pub mode: Option<String>,
    pub use_same: Option<String>,
    pub http: HostPortSnapshot,
    pub https: HostPortSnapshot,
    pub socks: HostPortSnapshot,
    pub ftp: HostPortSnapshot,
    pub ignore_hosts: Option<Vec<String>>,
}

impl PropertyStoreSnapshot {
    pub fn protocol(&self, group: ProxyGroup) -> &HostPortSnapshot {
        match group {
            ProxyGroup::Http => &self.http,
            ProxyGroup::Https => &self.https,
            ProxyGroup::Socks => &self.socks,
            ProxyGroup::Ftp => &self.ftp,
        }
    }

    pub fn protocol_mut(&mut self, group: ProxyGroup) -> &mut HostPortSnapshot {
        match group {
            ProxyGroup::Http => &mut self.http,
            ProxyGroup::Https => &mut self.https,
            ProxyGroup::Socks => &mut self.socks,
            ProxyGroup::Ftp => &mut self.ftp,
        }
    }
}

/// KDE `kioslaverc` `[Proxy Settings]` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniConfigSnapshot {
    pub captured: bool,
    pub proxy_type: Option<String>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub socks_proxy: Option<String>,
    pub ftp_proxy: Option<String>,
    pub no_proxy_for: Option<String>,
}

/// One active connection profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEntry {
    pub name: String,
    pub method: Option<String>,
    /// Whether the profile exposes manual proxy fields at all. Unsupported profiles are never touched.
    pub manual_supported: bool,
    pub http: Option<String>,
    pub https: Option<String>,
    pub socks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkProfileSnapshot {
    pub captured: bool,
    pub profiles: Vec<ProfileEntry>,
}
