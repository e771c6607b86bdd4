//! Snapshot text format: `version=<n>` then one `key=escaped_value` line per field.
//! Lists are flattened as `<prefix>_<i>_<field>` plus `<prefix>_count`.
//! Optional values are written only when present, so a missing line reads back as `None`.

use std::collections::HashMap;

use crate::snapshot::{
    EnvSnapshot, GroupSnapshot, HostPortSnapshot, IniConfigSnapshot, KeyedSettingsSnapshot,
    NetworkProfileSnapshot, ProfileEntry, PropertyStoreSnapshot, Snapshot, PROXY_GROUPS,
    SNAPSHOT_VERSION,
};

/// Upper bound on `_count` lines; anything larger is treated as corruption.
const MAX_LIST_LEN: usize = 1024;

/// Error decoding a snapshot. Any error means the whole snapshot is treated as absent.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotDecodeError {
    #[error("snapshot has no version line")]
    MissingVersion,
    #[error("snapshot version is not a number: {0:?}")]
    InvalidVersion(String),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(i64),
    #[error("list {0} has too many entries")]
    CountTooLarge(String),
    #[error("list count {0} is not a number: {1:?}")]
    InvalidCount(String, String),
}

/// Escape backslash, CR and LF so the value fits on one line.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`]. Unknown escape sequences are kept literally.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                    continue;
                }
                Some('n') => {
                    out.push('\n');
                    chars.next();
                    continue;
                }
                Some('r') => {
                    out.push('\r');
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

struct Writer {
    out: String,
}

impl Writer {
    fn line(&mut self, key: &str, value: &str) {
        self.out.push_str(key);
        self.out.push('=');
        self.out.push_str(&escape(value));
        self.out.push('\n');
    }

    fn flag(&mut self, key: &str, value: bool) {
        self.line(key, if value { "1" } else { "0" });
    }

    fn opt(&mut self, key: &str, value: &Option<String>) {
        if let Some(v) = value {
            self.line(key, v);
        }
    }
}

struct Entries(HashMap<String, String>);

impl Entries {
    fn parse(text: &str) -> Self {
        let mut map = HashMap::new();
        for line in text.lines() {
            if let Some((key, value)) = line.split_once('=') {
                map.insert(key.to_string(), unescape(value));
            }
        }
        Entries(map)
    }

    fn flag(&self, key: &str) -> bool {
        self.0.get(key).map(|v| v == "1").unwrap_or(false)
    }

    fn text(&self, key: &str) -> String {
        self.0.get(key).cloned().unwrap_or_default()
    }

    fn opt(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn count(&self, key: &str) -> Result<usize, SnapshotDecodeError> {
        let n = match self.0.get(key) {
            None => 0,
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| SnapshotDecodeError::InvalidCount(key.to_string(), v.clone()))?,
        };
        if n > MAX_LIST_LEN {
            return Err(SnapshotDecodeError::CountTooLarge(key.to_string()));
        }
        Ok(n)
    }
}

/// Serialize a snapshot to the flat text format.
pub fn encode_snapshot(snapshot: &Snapshot) -> String {
    let mut w = Writer { out: String::new() };
    w.line("version", &SNAPSHOT_VERSION.to_string());

    w.flag("env_captured", snapshot.env.captured);
    for (name, value) in &snapshot.env.vars {
        w.opt(&format!("env_{}", name), value);
    }

    w.line("gsettings_count", &snapshot.keyed_settings.len().to_string());
    for (i, entry) in snapshot.keyed_settings.iter().enumerate() {
        let p = format!("gsettings_{}_", i);
        w.line(&format!("{p}schema"), &entry.schema);
        w.flag(&format!("{p}captured"), entry.captured);
        w.opt(&format!("{p}mode"), &entry.mode);
        w.opt(&format!("{p}use_same_proxy"), &entry.use_same_proxy);
        w.opt(&format!("{p}ignore_hosts"), &entry.ignore_hosts);
        for group in PROXY_GROUPS {
            let g = entry.group(group);
            let gp = format!("{p}{}_", group.as_str());
            w.opt(&format!("{gp}host"), &g.host);
            w.opt(&format!("{gp}port"), &g.port);
            w.opt(&format!("{gp}enabled"), &g.enabled);
        }
    }

    let xfce = &snapshot.property_store;
    w.flag("xfce_captured", xfce.captured);
    w.line("xfce_channel", &xfce.channel);
    w.opt("xfce_mode", &xfce.mode);
    w.opt("xfce_use_same", &xfce.use_same);
    for group in PROXY_GROUPS {
        let hp = xfce.protocol(group);
        w.opt(&format!("xfce_{}_host", group.as_str()), &hp.host);
        w.opt(&format!("xfce_{}_port", group.as_str()), &hp.port);
    }
    w.opt(
        "xfce_ignore_hosts",
        &xfce.ignore_hosts.as_ref().map(|hosts| hosts.join("\n")),
    );

    let kde = &snapshot.ini;
    w.flag("kde_captured", kde.captured);
    w.opt("kde_proxy_type", &kde.proxy_type);
    w.opt("kde_http_proxy", &kde.http_proxy);
    w.opt("kde_https_proxy", &kde.https_proxy);
    w.opt("kde_socks_proxy", &kde.socks_proxy);
    w.opt("kde_ftp_proxy", &kde.ftp_proxy);
    w.opt("kde_no_proxy_for", &kde.no_proxy_for);

    w.flag("nm_captured", snapshot.profiles.captured);
    w.line("nm_count", &snapshot.profiles.profiles.len().to_string());
    for (i, profile) in snapshot.profiles.profiles.iter().enumerate() {
        let p = format!("nm_{}_", i);
        w.line(&format!("{p}name"), &profile.name);
        w.opt(&format!("{p}method"), &profile.method);
        w.flag(&format!("{p}manual_supported"), profile.manual_supported);
        w.opt(&format!("{p}http"), &profile.http);
        w.opt(&format!("{p}https"), &profile.https);
        w.opt(&format!("{p}socks"), &profile.socks);
    }

    w.out
}

/// Parse the flat text format. Fails on a missing or unsupported version.
pub fn decode_snapshot(text: &str) -> Result<Snapshot, SnapshotDecodeError> {
    let e = Entries::parse(text);

    let raw_version = e.opt("version").ok_or(SnapshotDecodeError::MissingVersion)?;
    let version: i64 = raw_version
        .trim()
        .parse()
        .map_err(|_| SnapshotDecodeError::InvalidVersion(raw_version.clone()))?;
    if !(1..=SNAPSHOT_VERSION).contains(&version) {
        return Err(SnapshotDecodeError::UnsupportedVersion(version));
    }

    let mut env = EnvSnapshot {
        captured: e.flag("env_captured"),
        ..EnvSnapshot::default()
    };
    for (name, value) in env.vars.iter_mut() {
        *value = e.opt(&format!("env_{}", name));
    }

    let mut keyed_settings = Vec::new();
    for i in 0..e.count("gsettings_count")? {
        let p = format!("gsettings_{}_", i);
        let mut entry = KeyedSettingsSnapshot {
            schema: e.text(&format!("{p}schema")),
            captured: e.flag(&format!("{p}captured")),
            mode: e.opt(&format!("{p}mode")),
            use_same_proxy: e.opt(&format!("{p}use_same_proxy")),
            ignore_hosts: e.opt(&format!("{p}ignore_hosts")),
            ..KeyedSettingsSnapshot::default()
        };
        for group in PROXY_GROUPS {
            let gp = format!("{p}{}_", group.as_str());
            *entry.group_mut(group) = GroupSnapshot {
                host: e.opt(&format!("{gp}host")),
                port: e.opt(&format!("{gp}port")),
                enabled: e.opt(&format!("{gp}enabled")),
            };
        }
        keyed_settings.push(entry);
    }

    let mut property_store = PropertyStoreSnapshot {
        captured: e.flag("xfce_captured"),
        channel: e.text("xfce_channel"),
        mode: e.opt("xfce_mode"),
        use_same: e.opt("xfce_use_same"),
        ignore_hosts: e.opt("xfce_ignore_hosts").map(|joined| {
            joined
                .split('\n')
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect()
        }),
        ..PropertyStoreSnapshot::default()
    };
    for group in PROXY_GROUPS {
        *property_store.protocol_mut(group) = HostPortSnapshot {
            host: e.opt(&format!("xfce_{}_host", group.as_str())),
            port: e.opt(&format!("xfce_{}_port", group.as_str())),
        };
    }

    let ini = IniConfigSnapshot {
        captured: e.flag("kde_captured"),
        proxy_type: e.opt("kde_proxy_type"),
        http_proxy: e.opt("kde_http_proxy"),
        https_proxy: e.opt("kde_https_proxy"),
        socks_proxy: e.opt("kde_socks_proxy"),
        ftp_proxy: e.opt("kde_ftp_proxy"),
        no_proxy_for: e.opt("kde_no_proxy_for"),
    };

    let mut profiles = NetworkProfileSnapshot {
        captured: e.flag("nm_captured"),
        profiles: Vec::new(),
    };
    for i in 0..e.count("nm_count")? {
        let p = format!("nm_{}_", i);
        profiles.profiles.push(ProfileEntry {
            name: e.text(&format!("{p}name")),
            method: e.opt(&format!("{p}method")),
            manual_supported: e.flag(&format!("{p}manual_supported")),
            http: e.opt(&format!("{p}http")),
            https: e.opt(&format!("{p}https")),
            socks: e.opt(&format!("{p}socks")),
        });
    }

    Ok(Snapshot {
        env,
        keyed_settings,
        property_store,
        ini,
        profiles,
    })
}
