use crate::backend::Backend;
use crate::client::EnvStore;
use crate::config::ProxyConfig;
use crate::desktop::{BackendKind, DesktopTokens};
use crate::snapshot::{Snapshot, PROXY_ENV_VARS};

/// Variables that receive the proxy URL; `no_proxy`/`NO_PROXY` are handled separately.
const URL_VARS: [&str; 8] = [
    "http_proxy",
    "https_proxy",
    "ftp_proxy",
    "all_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "FTP_PROXY",
    "ALL_PROXY",
];
const NO_PROXY_VARS: [&str; 2] = ["no_proxy", "NO_PROXY"];

/// Process environment. Only affects this process and children spawned after apply.
pub struct EnvBackend<E> {
    env: E,
}

impl<E: EnvStore> EnvBackend<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }
}

impl<E: EnvStore> Backend for EnvBackend<E> {
    fn kind(&self) -> BackendKind {
        BackendKind::Environment
    }

    fn is_available(&self) -> bool {
        true
    }

    fn capture(&self, snapshot: &mut Snapshot, _desktop: &DesktopTokens) {
        if snapshot.env.captured {
            return;
        }
        for name in PROXY_ENV_VARS {
            let value = self.env.get(name).filter(|v| !v.is_empty());
            snapshot.env.set(name, value);
        }
        snapshot.env.captured = true;
    }

    fn apply(&self, config: &ProxyConfig, snapshot: &Snapshot) -> bool {
        if !snapshot.env.captured {
            tracing::warn!("environment was not captured; leaving it untouched");
            return false;
        }
        let url = config.proxy_url();
        for name in URL_VARS {
            self.env.set(name, &url);
        }
        let no_proxy = config.no_proxy_value();
        for name in NO_PROXY_VARS {
            self.env.set(name, &no_proxy);
        }
        tracing::info!(proxy = %url, no_proxy = %no_proxy, "environment proxy variables set");
        true
    }

    fn restore(&self, snapshot: &Snapshot) {
        if !snapshot.env.captured {
            return;
        }
        for (name, value) in &snapshot.env.vars {
            match value {
                Some(value) => self.env.set(name, value),
                None => self.env.remove(name),
            }
        }
        tracing::info!("environment proxy variables restored");
    }
}
