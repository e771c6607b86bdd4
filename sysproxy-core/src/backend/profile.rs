//! Per-connection proxy settings of active network profiles.

use crate::backend::Backend;
use crate::client::ProfileManagerClient;
use crate::config::ProxyConfig;
use crate::desktop::{BackendKind, DesktopTokens};
use crate::snapshot::{ProfileEntry, Snapshot};

const METHOD: &str = "proxy.method";
const HTTP: &str = "proxy.http";
const HTTPS: &str = "proxy.https";
const SOCKS: &str = "proxy.socks";

pub struct NetworkProfileBackend<C> {
    client: C,
}

impl<C: ProfileManagerClient> NetworkProfileBackend<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    fn modify(&self, profile: &str, field: &str, value: &str) -> bool {
        let ok = self.client.modify(profile, field, value);
        if !ok {
            tracing::warn!(profile, field, value, "connection profile update failed");
        }
        ok
    }

    fn activate(&self, profile: &str) {
        if !self.client.activate(profile) {
            tracing::warn!(profile, "connection profile could not be re-activated");
        }
    }

    fn apply_profile(&self, entry: &ProfileEntry, url: &str, socks: &str) -> bool {
        let name = entry.name.as_str();
        if !self.client.modify(name, METHOD, "manual") {
            tracing::info!(profile = name, "manual proxy method rejected; skipping profile");
            return false;
        }
        for (field, captured, value) in [
            (HTTP, &entry.http, url),
            (HTTPS, &entry.https, url),
            (SOCKS, &entry.socks, socks),
        ] {
            // Restore cannot put back a field it never read.
            if captured.is_none() {
                tracing::debug!(profile = name, field, "field not captured; leaving it alone");
                continue;
            }
            self.modify(name, field, value);
        }
        self.activate(name);
        true
    }
}

impl<C: ProfileManagerClient> Backend for NetworkProfileBackend<C> {
    fn kind(&self) -> BackendKind {
        BackendKind::NetworkProfiles
    }

    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn capture(&self, snapshot: &mut Snapshot, _desktop: &DesktopTokens) {
        if snapshot.profiles.captured || !self.client.is_available() {
            return;
        }
        let Some(names) = self.client.active_profiles() else {
            tracing::warn!("could not list active connection profiles");
            return;
        };

        let mut profiles = Vec::with_capacity(names.len());
        for name in names.into_iter().filter(|n| !n.is_empty()) {
            let manual_supported = self.client.supports_manual_proxy(&name);
            let mut entry = ProfileEntry {
                method: self.client.field(&name, METHOD),
                manual_supported,
                ..ProfileEntry::default()
            };
            if manual_supported {
                entry.http = self.client.field(&name, HTTP);
                entry.https = self.client.field(&name, HTTPS);
                entry.socks = self.client.field(&name, SOCKS);
            }
            tracing::debug!(profile = %name, method = ?entry.method, manual_supported, "captured connection profile");
            entry.name = name;
            profiles.push(entry);
        }
        snapshot.profiles.profiles = profiles;
        snapshot.profiles.captured = true;
    }

    fn apply(&self, config: &ProxyConfig, snapshot: &Snapshot) -> bool {
        if !snapshot.profiles.captured {
            return false;
        }
        let url = config.proxy_url();
        let socks = config.socks_url();
        let mut applied = false;
        for entry in &snapshot.profiles.profiles {
            if !entry.manual_supported {
                tracing::info!(profile = %entry.name, "profile has no manual proxy fields; skipping");
                continue;
            }
            if self.apply_profile(entry, &url, &socks) {
                tracing::info!(profile = %entry.name, "connection profile proxy applied");
                applied = true;
            }
        }
        applied
    }

    fn restore(&self, snapshot: &Snapshot) {
        if !snapshot.profiles.captured {
            return;
        }
        for entry in &snapshot.profiles.profiles {
            if !entry.manual_supported {
                tracing::debug!(profile = %entry.name, "profile was never modified; nothing to restore");
                continue;
            }
            let name = entry.name.as_str();
            let method = entry
                .method
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("none");
            self.modify(name, METHOD, method);
            for (field, value) in [
                (HTTP, &entry.http),
                (HTTPS, &entry.https),
                (SOCKS, &entry.socks),
            ] {
                // An empty string clears the field; `None` was never read, so leave it.
                if let Some(value) = value {
                    self.modify(name, field, value.trim_end_matches(['\r', '\n']));
                }
            }
            self.activate(name);
            tracing::info!(profile = name, "connection profile proxy restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fake;

    #[test]
    fn unsupported_profile_is_never_modified() {
        let fake = Fake::new();
        fake.add_profile("Wired", true);
        fake.add_profile("Hotspot", false);
        let backend = NetworkProfileBackend::new(fake.clone());
        let mut snapshot = Snapshot::default();
        backend.capture(&mut snapshot, &DesktopTokens::default());

        let hotspot = &snapshot.profiles.profiles[1];
        assert_eq!(hotspot.name, "Hotspot");
        assert!(!hotspot.manual_supported);
        assert_eq!(hotspot.http, None);

        let cfg = ProxyConfig::new("10.0.0.2", 8080, "http", "");
        assert!(backend.apply(&cfg, &snapshot));
        backend.restore(&snapshot);
        assert!(fake.writes().iter().all(|w| !w.contains("Hotspot")));
        assert_eq!(fake.profile("Hotspot").unwrap().activations, 0);
    }

    #[test]
    fn apply_and_restore_supported_profile() {
        let fake = Fake::new();
        fake.add_profile("Wired", true);
        fake.state().nm_profiles[0]
            .fields
            .insert(HTTP.into(), "http://old:3128".into());
        let backend = NetworkProfileBackend::new(fake.clone());
        let mut snapshot = Snapshot::default();
        backend.capture(&mut snapshot, &DesktopTokens::default());

        let cfg = ProxyConfig::new("10.0.0.2", 8080, "http", "");
        assert!(backend.apply(&cfg, &snapshot));
        let wired = fake.profile("Wired").unwrap();
        assert_eq!(wired.fields[METHOD], "manual");
        assert_eq!(wired.fields[HTTP], "http://10.0.0.2:8080");
        assert_eq!(wired.fields[SOCKS], "socks5://10.0.0.2:8080");
        assert_eq!(wired.activations, 1);

        backend.restore(&snapshot);
        let wired = fake.profile("Wired").unwrap();
        assert_eq!(wired.fields[METHOD], "none");
        assert_eq!(wired.fields[HTTP], "http://old:3128");
        assert_eq!(wired.fields[HTTPS], "");
        assert_eq!(wired.activations, 2);
    }

    #[test]
    fn unread_field_is_left_alone() {
        let fake = Fake::new();
        fake.add_profile("Wired", true);
        let backend = NetworkProfileBackend::new(fake.clone());
        let mut snapshot = Snapshot::default();
        backend.capture(&mut snapshot, &DesktopTokens::default());
        snapshot.profiles.profiles[0].socks = None;

        let cfg = ProxyConfig::new("10.0.0.2", 8080, "http", "");
        assert!(backend.apply(&cfg, &snapshot));
        let wired = fake.profile("Wired").unwrap();
        assert_eq!(wired.fields[HTTP], "http://10.0.0.2:8080");
        assert_eq!(wired.fields[SOCKS], "");
        assert!(fake.writes().iter().all(|w| !w.contains(SOCKS)));

        backend.restore(&snapshot);
        let wired = fake.profile("Wired").unwrap();
        assert_eq!(wired.fields[HTTP], "");
        assert_eq!(wired.fields[SOCKS], "");
    }

    #[test]
    fn missing_method_restores_as_none() {
        let fake = Fake::new();
        fake.add_profile("Wired", true);
        fake.state().nm_profiles[0].fields.remove(METHOD);
        let backend = NetworkProfileBackend::new(fake.clone());
        let mut snapshot = Snapshot::default();
        backend.capture(&mut snapshot, &DesktopTokens::default());
        assert_eq!(snapshot.profiles.profiles[0].method, None);
        backend.restore(&snapshot);
        assert_eq!(fake.profile("Wired").unwrap().fields[METHOD], "none");
    }

    #[test]
    fn nothing_captured_without_tool() {
        let fake = Fake::new();
        let backend = NetworkProfileBackend::new(fake);
        let mut snapshot = Snapshot::default();
        backend.capture(&mut snapshot, &DesktopTokens::default());
        assert!(!snapshot.profiles.captured);
    }
}
