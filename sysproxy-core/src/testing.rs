//! In-memory desktop used by the unit tests. One shared state implements every
//! client trait so tests can inspect all stores after an apply/restore cycle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{
    EnvStore, IniConfigClient, KeyedSettingsClient, PropertyKind, ProfileManagerClient,
    PropertyStoreClient,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeProp {
    Scalar(PropertyKind, String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct FakeProfile {
    pub name: String,
    pub active: bool,
    pub manual: bool,
    pub fields: BTreeMap<String, String>,
    pub activations: usize,
}

#[derive(Debug, Default)]
pub struct FakeDesktop {
    pub env: BTreeMap<String, String>,
    pub env_reads: usize,

    pub gsettings_installed: bool,
    /// (schema, key) -> GVariant text. A key exists iff it has an entry.
    pub gsettings: BTreeMap<(String, String), String>,
    pub gsettings_listed: Vec<String>,
    pub gsettings_reads: usize,

    pub xfconf_installed: bool,
    pub xfconf_channels: Vec<String>,
    pub xfconf: BTreeMap<(String, String), FakeProp>,

    pub kde_installed: bool,
    pub kde: BTreeMap<String, String>,
    pub kde_reloads: usize,

    pub nm_installed: bool,
    pub nm_profiles: Vec<FakeProfile>,

    /// Every mutation, in order.
    pub writes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Fake(Arc<Mutex<FakeDesktop>>);

impl Fake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeDesktop> {
        self.0.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn env(&self, name: &str) -> Option<String> {
        self.state().env.get(name).cloned()
    }

    pub fn gsettings_value(&self, schema: &str, key: &str) -> Option<String> {
        self.state()
            .gsettings
            .get(&(schema.to_string(), key.to_string()))
            .cloned()
    }

    pub fn xfconf_value(&self, channel: &str, property: &str) -> Option<FakeProp> {
        self.state()
            .xfconf
            .get(&(channel.to_string(), property.to_string()))
            .cloned()
    }

    /// Install a GNOME-style schema with every optional key present.
    pub fn add_gnome_schema(&self, schema: &str) {
        let mut d = self.state();
        d.gsettings_installed = true;
        let mut put = |s: String, k: &str, v: &str| {
            d.gsettings.insert((s, k.to_string()), v.to_string());
        };
        put(schema.to_string(), "mode", "'none'");
        put(schema.to_string(), "use-same-proxy", "false");
        put(schema.to_string(), "ignore-hosts", "['localhost', '127.0.0.0/8', '::1']");
        for group in ["http", "https", "socks", "ftp"] {
            let sub = format!("{}.{}", schema, group);
            put(sub.clone(), "host", "''");
            put(sub.clone(), "port", "0");
        }
        put(format!("{}.http", schema), "enabled", "false");
    }

    pub fn add_profile(&self, name: &str, manual: bool) {
        let mut d = self.state();
        d.nm_installed = true;
        let mut fields = BTreeMap::new();
        fields.insert("proxy.method".to_string(), "none".to_string());
        if manual {
            for f in ["proxy.http", "proxy.https", "proxy.socks"] {
                fields.insert(f.to_string(), String::new());
            }
        }
        d.nm_profiles.push(FakeProfile {
            name: name.to_string(),
            active: true,
            manual,
            fields,
            activations: 0,
        });
    }

    pub fn profile(&self, name: &str) -> Option<FakeProfile> {
        self.state()
            .nm_profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }
}

impl EnvStore for Fake {
    fn get(&self, name: &str) -> Option<String> {
        let mut d = self.state();
        d.env_reads += 1;
        d.env.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        let mut d = self.state();
        d.env.insert(name.to_string(), value.to_string());
        d.writes.push(format!("env:{}={}", name, value));
    }

    fn remove(&self, name: &str) {
        let mut d = self.state();
        d.env.remove(name);
        d.writes.push(format!("env-unset:{}", name));
    }
}

impl KeyedSettingsClient for Fake {
    fn is_available(&self) -> bool {
        self.state().gsettings_installed
    }

    fn key_exists(&self, schema: &str, key: &str) -> bool {
        self.state()
            .gsettings
            .contains_key(&(schema.to_string(), key.to_string()))
    }

    fn get(&self, schema: &str, key: &str) -> Option<String> {
        let mut d = self.state();
        d.gsettings_reads += 1;
        d.gsettings
            .get(&(schema.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&self, schema: &str, key: &str, value: &str) -> bool {
        let mut d = self.state();
        let k = (schema.to_string(), key.to_string());
        if !d.gsettings.contains_key(&k) {
            return false;
        }
        d.gsettings.insert(k, value.to_string());
        d.writes.push(format!("gsettings:{}:{}={}", schema, key, value));
        true
    }

    fn list_schemas(&self) -> Vec<String> {
        self.state().gsettings_listed.clone()
    }
}

impl PropertyStoreClient for Fake {
    fn is_available(&self) -> bool {
        self.state().xfconf_installed
    }

    fn read(&self, channel: &str, property: &str) -> Option<String> {
        match self.xfconf_value(channel, property)? {
            FakeProp::Scalar(_, v) => Some(v),
            FakeProp::List(values) => Some(format!(
                "Value is an array with {} items:\n\n{}",
                values.len(),
                values.join("\n")
            )),
        }
    }

    fn list(&self, channel: &str) -> bool {
        self.state().xfconf_channels.iter().any(|c| c == channel)
    }

    fn set(&self, channel: &str, property: &str, value: &str) -> bool {
        let mut d = self.state();
        let k = (channel.to_string(), property.to_string());
        let kind = match d.xfconf.get(&k) {
            Some(FakeProp::Scalar(kind, _)) => *kind,
            _ => return false,
        };
        d.xfconf.insert(k, FakeProp::Scalar(kind, value.to_string()));
        d.writes.push(format!("xfconf:{}:{}={}", channel, property, value));
        true
    }

    fn create(&self, channel: &str, property: &str, kind: PropertyKind, value: &str) -> bool {
        let mut d = self.state();
        d.xfconf.insert(
            (channel.to_string(), property.to_string()),
            FakeProp::Scalar(kind, value.to_string()),
        );
        d.writes.push(format!(
            "xfconf-new:{}:{}:{}={}",
            channel,
            property,
            kind.as_str(),
            value
        ));
        true
    }

    fn create_string_list(&self, channel: &str, property: &str, values: &[String]) -> bool {
        let mut d = self.state();
        d.xfconf.insert(
            (channel.to_string(), property.to_string()),
            FakeProp::List(values.to_vec()),
        );
        d.writes.push(format!(
            "xfconf-list:{}:{}={}",
            channel,
            property,
            values.join(",")
        ));
        true
    }

    fn reset(&self, channel: &str, property: &str) {
        let mut d = self.state();
        d.xfconf
            .remove(&(channel.to_string(), property.to_string()));
        d.writes.push(format!("xfconf-reset:{}:{}", channel, property));
    }
}

impl IniConfigClient for Fake {
    fn is_available(&self) -> bool {
        self.state().kde_installed
    }

    fn can_read(&self) -> bool {
        self.state().kde_installed
    }

    fn read(&self, _file: &str, _group: &str, key: &str) -> Option<String> {
        self.state().kde.get(key).cloned()
    }

    fn write(&self, _file: &str, _group: &str, key: &str, value: &str) -> bool {
        let mut d = self.state();
        d.kde.insert(key.to_string(), value.to_string());
        d.writes.push(format!("kde:{}={}", key, value));
        true
    }

    fn delete(&self, _file: &str, _group: &str, key: &str) -> bool {
        let mut d = self.state();
        d.kde.remove(key);
        d.writes.push(format!("kde-delete:{}", key));
        true
    }

    fn reload(&self) {
        self.state().kde_reloads += 1;
    }
}

impl ProfileManagerClient for Fake {
    fn is_available(&self) -> bool {
        self.state().nm_installed
    }

    fn active_profiles(&self) -> Option<Vec<String>> {
        let d = self.state();
        if !d.nm_installed {
            return None;
        }
        Some(
            d.nm_profiles
                .iter()
                .filter(|p| p.active)
                .map(|p| p.name.clone())
                .collect(),
        )
    }

    fn field(&self, profile: &str, field: &str) -> Option<String> {
        self.profile(profile)?.fields.get(field).cloned()
    }

    fn supports_manual_proxy(&self, profile: &str) -> bool {
        self.profile(profile).map(|p| p.manual).unwrap_or(false)
    }

    fn modify(&self, profile: &str, field: &str, value: &str) -> bool {
        let mut d = self.state();
        let Some(p) = d.nm_profiles.iter_mut().find(|p| p.name == profile) else {
            return false;
        };
        let manual_only = field != "proxy.method" || value == "manual";
        if manual_only && !p.manual {
            return false;
        }
        p.fields.insert(field.to_string(), value.to_string());
        d.writes.push(format!("nm:{}:{}={}", profile, field, value));
        true
    }

    fn activate(&self, profile: &str) -> bool {
        let mut d = self.state();
        let Some(p) = d.nm_profiles.iter_mut().find(|p| p.name == profile) else {
            return false;
        };
        p.activations += 1;
        d.writes.push(format!("nm-up:{}", profile));
        true
    }
}
