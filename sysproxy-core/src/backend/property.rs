//! XFCE proxy properties under `/general/Proxy*` in an xfconf channel.

use crate::backend::Backend;
use crate::client::{PropertyKind, PropertyStoreClient};
use crate::config::ProxyConfig;
use crate::desktop::{BackendKind, DesktopTokens};
use crate::snapshot::{ProxyGroup, Snapshot, PROXY_GROUPS};

/// Channels that may carry the proxy properties, most likely first.
pub const PROPERTY_CHANNELS: [&str; 4] = [
    "xfce4-session",
    "xfce4-settings-manager",
    "xfce4-proxy",
    "xfce4-desktop",
];

const MODE: &str = "/general/ProxyMode";
const USE_SAME: &str = "/general/ProxyUseSame";
const IGNORE_HOSTS: &str = "/general/ProxyIgnoreHosts";

fn host_port_properties(group: ProxyGroup) -> (&'static str, &'static str) {
    match group {
        ProxyGroup::Http => ("/general/ProxyHttpHost", "/general/ProxyHttpPort"),
        ProxyGroup::Https => ("/general/ProxyHttpsHost", "/general/ProxyHttpsPort"),
        ProxyGroup::Socks => ("/general/ProxySocksHost", "/general/ProxySocksPort"),
        ProxyGroup::Ftp => ("/general/ProxyFtpHost", "/general/ProxyFtpPort"),
    }
}

/// Values of an array property as printed by `xfconf-query`, one per line,
/// without the `Value is an array with N items:` header.
pub fn parse_string_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Value is an array"))
        .map(str::to_string)
        .collect()
}

pub struct PropertyStoreBackend<C> {
    client: C,
}

impl<C: PropertyStoreClient> PropertyStoreBackend<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// First channel that already has `ProxyMode`, else the first listable one,
    /// else the first candidate.
    pub fn detect_channel(&self) -> &'static str {
        PROPERTY_CHANNELS
            .iter()
            .find(|ch| self.client.read(ch, MODE).is_some())
            .or_else(|| PROPERTY_CHANNELS.iter().find(|ch| self.client.list(ch)))
            .copied()
            .unwrap_or(PROPERTY_CHANNELS[0])
    }

    /// Plain set, falling back to create-with-type when the property is new.
    fn set_or_create(&self, channel: &str, property: &str, kind: PropertyKind, value: &str) -> bool {
        if self.client.set(channel, property, value) {
            return true;
        }
        let created = self.client.create(channel, property, kind, value);
        if !created {
            tracing::warn!(channel, property, value, "xfconf property could not be written");
        }
        created
    }

    fn replace_list(&self, channel: &str, property: &str, values: &[String]) -> bool {
        self.client.reset(channel, property);
        if values.is_empty() {
            return true;
        }
        let ok = self.client.create_string_list(channel, property, values);
        if !ok {
            tracing::warn!(channel, property, "xfconf list could not be written");
        }
        ok
    }

    fn restore_value(&self, channel: &str, property: &str, kind: PropertyKind, value: Option<&str>) {
        match value {
            Some(v) if !(v.is_empty() && kind == PropertyKind::Int) => {
                self.set_or_create(channel, property, kind, v);
            }
            _ => self.client.reset(channel, property),
        }
    }
}

impl<C: PropertyStoreClient> Backend for PropertyStoreBackend<C> {
    fn kind(&self) -> BackendKind {
        BackendKind::PropertyStore
    }

    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn capture(&self, snapshot: &mut Snapshot, _desktop: &DesktopTokens) {
        if snapshot.property_store.captured || !self.client.is_available() {
            return;
        }
        let channel = if snapshot.property_store.channel.is_empty() {
            self.detect_channel().to_string()
        } else {
            snapshot.property_store.channel.clone()
        };

        let store = &mut snapshot.property_store;
        store.mode = self.client.read(&channel, MODE);
        store.use_same = self.client.read(&channel, USE_SAME);
        for group in PROXY_GROUPS {
            let (host, port) = host_port_properties(group);
            let slot = store.protocol_mut(group);
            slot.host = self.client.read(&channel, host);
            slot.port = self.client.read(&channel, port);
        }
        store.ignore_hosts = self
            .client
            .read(&channel, IGNORE_HOSTS)
            .map(|raw| parse_string_list(&raw));
        tracing::debug!(channel = %channel, mode = ?store.mode, "captured xfconf proxy properties");
        store.channel = channel;
        store.captured = true;
    }

    fn apply(&self, config: &ProxyConfig, snapshot: &Snapshot) -> bool {
        let store = &snapshot.property_store;
        if !store.captured {
            return false;
        }
        let channel = store.channel.as_str();
        let host = config.host();
        let port = config.port.to_string();

        let mut written = 0usize;
        let mut failed = 0usize;
        let mut tally = |ok: bool| {
            if ok {
                written += 1;
            } else {
                failed += 1;
            }
        };

        tally(self.set_or_create(channel, MODE, PropertyKind::String, "manual"));
        tally(self.set_or_create(channel, USE_SAME, PropertyKind::Bool, "true"));
        for group in PROXY_GROUPS {
            let (host_prop, port_prop) = host_port_properties(group);
            tally(self.set_or_create(channel, host_prop, PropertyKind::String, host));
            tally(self.set_or_create(channel, port_prop, PropertyKind::Int, &port));
        }
        tally(self.replace_list(channel, IGNORE_HOSTS, &config.ignore_hosts()));

        if failed > 0 {
            tracing::warn!(channel, failed, "some xfconf proxy properties were not updated");
        } else {
            tracing::info!(channel, "xfconf proxy applied");
        }
        written > 0
    }

    fn restore(&self, snapshot: &Snapshot) {
        let store = &snapshot.property_store;
        if !store.captured {
            return;
        }
        let channel = store.channel.as_str();

        self.restore_value(channel, MODE, PropertyKind::String, store.mode.as_deref());
        let use_same = store
            .use_same
            .as_deref()
            .map(|v| if v.is_empty() { "false" } else { v });
        self.restore_value(channel, USE_SAME, PropertyKind::Bool, use_same);
        for group in PROXY_GROUPS {
            let (host_prop, port_prop) = host_port_properties(group);
            let saved = store.protocol(group);
            self.restore_value(channel, host_prop, PropertyKind::String, saved.host.as_deref());
            self.restore_value(channel, port_prop, PropertyKind::Int, saved.port.as_deref());
        }
        match &store.ignore_hosts {
            Some(list) => {
                self.replace_list(channel, IGNORE_HOSTS, list);
            }
            None => self.client.reset(channel, IGNORE_HOSTS),
        }
        tracing::info!(channel, "xfconf proxy restored");
    }
}
