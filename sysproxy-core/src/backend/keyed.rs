//! GSettings-style proxy schemas. One adapter covers every desktop flavour; the
//! schema id is data, and per-key support is probed at capture.

use crate::backend::Backend;
use crate::client::KeyedSettingsClient;
use crate::config::ProxyConfig;
use crate::desktop::{BackendKind, DesktopTokens};
use crate::snapshot::{GroupSnapshot, KeyedSettingsSnapshot, ProxyGroup, Snapshot, PROXY_GROUPS};

/// Known proxy schema ids, one or two per desktop family.
pub const CANDIDATE_SCHEMAS: [&str; 13] = [
    "org.gnome.system.proxy",
    "org.gnome.desktop.proxy",
    "org.cinnamon.desktop.proxy",
    "org.mate.proxy",
    "org.mate.desktop.proxy",
    "org.pantheon.desktop.proxy",
    "org.xfce.proxy",
    "org.lxde.proxy",
    "org.budgie.desktop.proxy",
    "com.deepin.daemon.network.proxy",
    "org.freedesktop.proxy",
    "org.ukui.proxy",
    "org.lxqt.proxy",
];

const DESKTOP_SCHEMAS: [(&[&str], &[&str]); 7] = [
    (
        &["GNOME", "UNITY", "PANTHEON", "POP", "COSMIC", "BUDGIE"],
        &["org.gnome.system.proxy", "org.gnome.desktop.proxy"],
    ),
    (&["CINNAMON"], &["org.cinnamon.desktop.proxy"]),
    (&["MATE"], &["org.mate.proxy", "org.mate.desktop.proxy"]),
    (&["XFCE"], &["org.xfce.proxy"]),
    (
        &["LXDE", "LXQT", "RASPBERRY", "LUMINA"],
        &["org.lxde.proxy", "org.lxqt.proxy"],
    ),
    (&["DEEPIN"], &["com.deepin.daemon.network.proxy"]),
    (&["UKUI"], &["org.ukui.proxy"]),
];

/// Schemas implied by the desktop tokens, in token order.
pub fn desktop_schemas(desktop: &DesktopTokens) -> Vec<&'static str> {
    let mut out = Vec::new();
    for token in desktop.as_slice() {
        for (needles, schemas) in DESKTOP_SCHEMAS {
            if needles.iter().any(|n| token.contains(n)) {
                for schema in schemas {
                    if !out.contains(schema) {
                        out.push(*schema);
                    }
                }
            }
        }
    }
    out
}

/// Turn captured `gsettings get` output into something `gsettings set` accepts.
///
/// `uint32 8080` becomes `8080`, booleans are lower-cased, quoted strings and
/// lists pass through. Empty input yields `None`.
pub fn normalize_for_set(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return Some(value.to_ascii_lowercase());
    }
    if value.starts_with('\'') || value.starts_with('[') {
        return Some(value.to_string());
    }
    // Typed output such as `uint32 8080`: drop the type annotation.
    if let Some((prefix, rest)) = value.split_once(' ') {
        let rest = rest.trim();
        let is_type = prefix.starts_with(|c: char| c.is_ascii_alphabetic())
            && prefix.chars().all(|c| c.is_ascii_alphanumeric());
        if is_type && !rest.is_empty() {
            return Some(rest.to_string());
        }
    }
    Some(value.to_string())
}

/// GVariant string literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// GVariant `as` literal: `['a', 'b']`.
pub fn format_string_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote_string(v)).collect();
    format!("[{}]", items.join(", "))
}

/// A key whose value after apply differs from what was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub key: String,
    pub expected: String,
    pub actual: Option<String>,
}

pub struct KeyedSettingsBackend<C> {
    client: C,
}

impl<C: KeyedSettingsClient> KeyedSettingsBackend<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Desktop-specific schemas first, then schemas already in the snapshot, then the static list.
    pub fn candidate_schemas(&self, desktop: &DesktopTokens, snapshot: &Snapshot) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let desktop = desktop_schemas(desktop).into_iter().map(str::to_string);
        let known = snapshot.keyed_settings.iter().map(|s| s.schema.clone());
        let candidates = CANDIDATE_SCHEMAS.iter().map(|s| s.to_string());
        for schema in desktop.chain(known).chain(candidates) {
            if !schema.is_empty() && !out.contains(&schema) {
                out.push(schema);
            }
        }
        out
    }

    /// Candidates plus any installed schema with "proxy" in its id, kept only
    /// when they expose `mode` and `<schema>.http host`.
    pub fn discover(&self, desktop: &DesktopTokens, snapshot: &Snapshot) -> Vec<String> {
        let mut schemas = self.candidate_schemas(desktop, snapshot);
        for listed in self.client.list_schemas() {
            let listed = listed.trim();
            if listed.contains("proxy") && !schemas.iter().any(|s| s == listed) {
                schemas.push(listed.to_string());
            }
        }
        schemas.retain(|schema| self.is_proxy_schema(schema));
        schemas
    }

    fn is_proxy_schema(&self, schema: &str) -> bool {
        self.client.key_exists(schema, "mode")
            && self.client.key_exists(&sub_schema(schema, ProxyGroup::Http), "host")
    }

    fn read_if_present(&self, schema: &str, key: &str) -> Option<String> {
        if self.client.key_exists(schema, key) {
            self.client.get(schema, key)
        } else {
            None
        }
    }

    fn capture_schema(&self, entry: &mut KeyedSettingsSnapshot) {
        let schema = entry.schema.clone();
        entry.mode = self.read_if_present(&schema, "mode");
        entry.use_same_proxy = self.read_if_present(&schema, "use-same-proxy");
        entry.ignore_hosts = self.read_if_present(&schema, "ignore-hosts");
        for group in PROXY_GROUPS {
            let sub = sub_schema(&schema, group);
            *entry.group_mut(group) = GroupSnapshot {
                host: self.read_if_present(&sub, "host"),
                port: self.read_if_present(&sub, "port"),
                enabled: self.read_if_present(&sub, "enabled"),
            };
        }
        entry.captured = true;
        tracing::debug!(schema = %schema, mode = ?entry.mode, "captured gsettings schema");
    }

    fn set(&self, schema: &str, key: &str, value: &str) -> bool {
        let ok = self.client.set(schema, key, value);
        if !ok {
            tracing::warn!(schema, key, value, "gsettings set failed");
        }
        ok
    }

    fn apply_schema(&self, config: &ProxyConfig, entry: &KeyedSettingsSnapshot) -> bool {
        let schema = entry.schema.as_str();
        if !self.client.key_exists(schema, "mode") {
            tracing::warn!(schema, "schema no longer has a mode key; skipping");
            return false;
        }
        if !self.set(schema, "mode", "'manual'") {
            return false;
        }
        if entry.supports_use_same_proxy() {
            self.set(schema, "use-same-proxy", "true");
        }

        let host = quote_string(config.host());
        let port = config.port.to_string();
        for group in PROXY_GROUPS {
            if group == ProxyGroup::Ftp && !entry.supports_ftp() {
                continue;
            }
            let captured = entry.group(group);
            let sub = sub_schema(schema, group);
            if captured.host.is_some() {
                self.set(&sub, "host", &host);
            }
            if captured.port.is_some() {
                self.set(&sub, "port", &port);
            }
            if entry.supports_enabled(group) {
                self.set(&sub, "enabled", "true");
            }
        }

        if entry.supports_ignore_hosts() {
            self.set(
                schema,
                "ignore-hosts",
                &format_string_list(&config.ignore_hosts()),
            );
        }

        for mismatch in self.verify(schema, config) {
            tracing::warn!(
                schema,
                key = %mismatch.key,
                expected = %mismatch.expected,
                actual = ?mismatch.actual,
                "gsettings value differs after apply"
            );
        }
        true
    }

    /// Re-read `mode` and the HTTP host/port and report any that differ from the request.
    pub fn verify(&self, schema: &str, config: &ProxyConfig) -> Vec<Mismatch> {
        let http = sub_schema(schema, ProxyGroup::Http);
        let port = config.port.to_string();
        let checks: [(String, &str, String, Option<String>); 3] = [
            (schema.to_string(), "mode", "'manual'".to_string(), None),
            (http.clone(), "host", quote_string(config.host()), None),
            (http, "port", port.clone(), Some(format!("uint32 {}", port))),
        ];

        let mut mismatches = Vec::new();
        for (full_schema, key, expected, alternative) in checks {
            let actual = self.client.get(&full_schema, key);
            let matches = actual.as_deref().is_some_and(|a| {
                a == expected || alternative.as_deref().is_some_and(|alt| a == alt)
            });
            if !matches {
                mismatches.push(Mismatch {
                    key: format!("{} {}", full_schema, key),
                    expected,
                    actual,
                });
            }
        }
        mismatches
    }

    fn restore_key(&self, schema: &str, key: &str, value: Option<&String>) {
        let Some(value) = value.and_then(|v| normalize_for_set(v)) else {
            return;
        };
        if !self.client.key_exists(schema, key) {
            tracing::debug!(schema, key, "key disappeared since capture; not restoring");
            return;
        }
        self.set(schema, key, &value);
    }
}

fn sub_schema(schema: &str, group: ProxyGroup) -> String {
    format!("{}.{}", schema, group.as_str())
}

impl<C: KeyedSettingsClient> Backend for KeyedSettingsBackend<C> {
    fn kind(&self) -> BackendKind {
        BackendKind::KeyedSettings
    }

    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn capture(&self, snapshot: &mut Snapshot, desktop: &DesktopTokens) {
        if !self.client.is_available() {
            return;
        }
        for schema in self.discover(desktop, snapshot) {
            let entry = snapshot.keyed_settings_entry(&schema);
            if entry.captured {
                continue;
            }
            self.capture_schema(entry);
        }
    }

    fn apply(&self, config: &ProxyConfig, snapshot: &Snapshot) -> bool {
        let mut applied = false;
        for entry in snapshot.keyed_settings.iter().filter(|s| s.captured) {
            if self.apply_schema(config, entry) {
                tracing::info!(schema = %entry.schema, "gsettings proxy applied");
                applied = true;
            }
        }
        applied
    }

    fn restore(&self, snapshot: &Snapshot) {
        for entry in snapshot.keyed_settings.iter().filter(|s| s.captured) {
            let schema = entry.schema.as_str();
            if !self.client.key_exists(schema, "mode") {
                tracing::warn!(schema, "schema vanished since capture; skipping restore");
                continue;
            }
            self.restore_key(schema, "mode", entry.mode.as_ref());
            self.restore_key(schema, "use-same-proxy", entry.use_same_proxy.as_ref());
            self.restore_key(schema, "ignore-hosts", entry.ignore_hosts.as_ref());
            for group in PROXY_GROUPS {
                let captured = entry.group(group);
                let sub = sub_schema(schema, group);
                self.restore_key(&sub, "host", captured.host.as_ref());
                self.restore_key(&sub, "port", captured.port.as_ref());
                self.restore_key(&sub, "enabled", captured.enabled.as_ref());
            }
            tracing::info!(schema, "gsettings proxy restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fake;

    const GNOME: &str = "org.gnome.system.proxy";

    fn captured(fake: &Fake, desktop: &str) -> (KeyedSettingsBackend<Fake>, Snapshot) {
        let backend = KeyedSettingsBackend::new(fake.clone());
        let mut snapshot = Snapshot::default();
        backend.capture(&mut snapshot, &DesktopTokens::parse(desktop));
        (backend, snapshot)
    }

    #[test]
    fn normalizes_gsettings_output() {
        assert_eq!(normalize_for_set("uint32 8080").as_deref(), Some("8080"));
        assert_eq!(normalize_for_set(" TRUE ").as_deref(), Some("true"));
        assert_eq!(normalize_for_set("'manual'").as_deref(), Some("'manual'"));
        assert_eq!(normalize_for_set("['a b', 'c']").as_deref(), Some("['a b', 'c']"));
        assert_eq!(normalize_for_set("@as []").as_deref(), Some("@as []"));
        assert_eq!(normalize_for_set("3128").as_deref(), Some("3128"));
        assert_eq!(normalize_for_set("   "), None);
    }

    #[test]
    fn quotes_strings_and_lists() {
        assert_eq!(quote_string("proxy"), "'proxy'");
        assert_eq!(quote_string("it's"), "'it\\'s'");
        assert_eq!(
            format_string_list(&["localhost".into(), "::1".into()]),
            "['localhost', '::1']"
        );
    }

    #[test]
    fn desktop_schemas_come_first() {
        let fake = Fake::new();
        let backend = KeyedSettingsBackend::new(fake);
        let mut snapshot = Snapshot::default();
        snapshot.keyed_settings_entry("org.example.proxy");
        let order = backend.candidate_schemas(&DesktopTokens::parse("X-Cinnamon"), &snapshot);
        assert_eq!(order[0], "org.cinnamon.desktop.proxy");
        assert_eq!(order[1], "org.example.proxy");
        assert_eq!(order[2], GNOME);
        assert_eq!(order.len(), CANDIDATE_SCHEMAS.len() + 1);
    }

    #[test]
    fn discovers_listed_proxy_schemas() {
        let fake = Fake::new();
        fake.add_gnome_schema("org.example.desktop.proxy");
        fake.state().gsettings_listed = vec![
            "org.example.desktop.proxy".into(),
            "org.example.desktop.proxy.http".into(),
            "org.gnome.desktop.interface".into(),
        ];
        let backend = KeyedSettingsBackend::new(fake);
        let found = backend.discover(&DesktopTokens::default(), &Snapshot::default());
        assert_eq!(found, vec!["org.example.desktop.proxy".to_string()]);
    }

    #[test]
    fn apply_then_restore_round_trips_gnome() {
        let fake = Fake::new();
        fake.add_gnome_schema(GNOME);
        let (backend, snapshot) = captured(&fake, "GNOME");
        let entry = snapshot.keyed_settings(GNOME).unwrap();
        assert_eq!(entry.mode.as_deref(), Some("'none'"));
        assert!(entry.supports_ftp());
        assert!(entry.supports_enabled(ProxyGroup::Http));
        assert!(!entry.supports_enabled(ProxyGroup::Https));

        let cfg = ProxyConfig::new("10.0.0.1", 8080, "http", "example.com");
        assert!(backend.apply(&cfg, &snapshot));
        assert_eq!(fake.gsettings_value(GNOME, "mode").as_deref(), Some("'manual'"));
        assert_eq!(
            fake.gsettings_value("org.gnome.system.proxy.socks", "host").as_deref(),
            Some("'10.0.0.1'")
        );
        assert_eq!(
            fake.gsettings_value(GNOME, "ignore-hosts").as_deref(),
            Some("['localhost', '127.0.0.1', '::1', 'example.com']")
        );
        assert_eq!(
            fake.gsettings_value("org.gnome.system.proxy.http", "enabled").as_deref(),
            Some("true")
        );
        assert!(backend.verify(GNOME, &cfg).is_empty());

        backend.restore(&snapshot);
        assert_eq!(fake.gsettings_value(GNOME, "mode").as_deref(), Some("'none'"));
        assert_eq!(
            fake.gsettings_value("org.gnome.system.proxy.http", "port").as_deref(),
            Some("0")
        );
        assert_eq!(
            fake.gsettings_value(GNOME, "ignore-hosts").as_deref(),
            Some("['localhost', '127.0.0.0/8', '::1']")
        );
    }

    #[test]
    fn ftp_is_skipped_when_schema_has_no_ftp_group() {
        let fake = Fake::new();
        fake.add_gnome_schema(GNOME);
        {
            let mut d = fake.state();
            d.gsettings.retain(|(schema, _), _| !schema.ends_with(".ftp"));
        }
        let (backend, snapshot) = captured(&fake, "GNOME");
        backend.apply(&ProxyConfig::new("h", 1, "", ""), &snapshot);
        assert!(fake.writes().iter().all(|w| !w.contains(".ftp")));
    }

    #[test]
    fn restore_never_writes_keys_missing_at_capture() {
        let fake = Fake::new();
        fake.add_gnome_schema(GNOME);
        {
            let mut d = fake.state();
            d.gsettings.remove(&(GNOME.to_string(), "use-same-proxy".to_string()));
        }
        let (backend, snapshot) = captured(&fake, "GNOME");
        assert!(!snapshot.keyed_settings(GNOME).unwrap().supports_use_same_proxy());

        // Key shows up later (e.g. schema upgrade); restore must still leave it alone.
        fake.state().gsettings.insert(
            (GNOME.to_string(), "use-same-proxy".to_string()),
            "true".to_string(),
        );
        backend.apply(&ProxyConfig::new("h", 1, "", ""), &snapshot);
        fake.clear_writes();
        backend.restore(&snapshot);
        assert!(fake.writes().iter().all(|w| !w.contains("use-same-proxy")));
    }

    #[test]
    fn restore_skips_vanished_schema() {
        let fake = Fake::new();
        fake.add_gnome_schema(GNOME);
        let (backend, snapshot) = captured(&fake, "GNOME");
        fake.state().gsettings.clear();
        backend.restore(&snapshot);
        assert!(fake.writes().is_empty());
    }

    #[test]
    fn verify_reports_mismatches() {
        let fake = Fake::new();
        fake.add_gnome_schema(GNOME);
        fake.state().gsettings.insert(
            ("org.gnome.system.proxy.http".to_string(), "port".to_string()),
            "uint32 8080".to_string(),
        );
        let backend = KeyedSettingsBackend::new(fake);
        let mismatches = backend.verify(GNOME, &ProxyConfig::new("h", 8080, "", ""));
        let keys: Vec<&str> = mismatches.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["org.gnome.system.proxy mode", "org.gnome.system.proxy.http host"]
        );
        assert_eq!(mismatches[0].actual.as_deref(), Some("'none'"));
    }

    #[test]
    fn nothing_captured_without_tool() {
        let fake = Fake::new();
        let (backend, snapshot) = captured(&fake, "GNOME");
        assert!(snapshot.keyed_settings.is_empty());
        assert!(!backend.apply(&ProxyConfig::new("h", 1, "", ""), &snapshot));
    }
}
