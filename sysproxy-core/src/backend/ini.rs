//! KDE proxy settings: the `[Proxy Settings]` group of `kioslaverc`.

use crate::backend::Backend;
use crate::client::IniConfigClient;
use crate::config::ProxyConfig;
use crate::desktop::{BackendKind, DesktopTokens};
use crate::snapshot::Snapshot;

pub const INI_FILE: &str = "kioslaverc";
pub const INI_GROUP: &str = "Proxy Settings";

const PROXY_TYPE: &str = "ProxyType";
/// `ProxyType` values: 0 is no proxy, 1 is manual.
const PROXY_TYPE_NONE: &str = "0";
const PROXY_TYPE_MANUAL: &str = "1";

/// KDE proxy settings in `kioslaverc`.
pub struct IniConfigBackend<C> {
    client: C,
    reload: bool,
}

impl<C: IniConfigClient> IniConfigBackend<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            reload: true,
        }
    }

    /// Whether to ask the session to reload the proxy module after writing.
    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    fn write(&self, key: &str, value: &str) -> bool {
        let ok = self.client.write(INI_FILE, INI_GROUP, key, value);
        if !ok {
            tracing::warn!(key, value, "kioslaverc write failed");
        }
        ok
    }

    fn write_or_delete(&self, key: &str, value: Option<&str>) {
        match value.map(|v| v.trim_end_matches(['\r', '\n'])) {
            Some(v) if !v.is_empty() => {
                self.write(key, v);
            }
            _ => {
                if !self.client.delete(INI_FILE, INI_GROUP, key) {
                    tracing::warn!(key, "kioslaverc delete failed");
                }
            }
        }
    }

    fn reload(&self) {
        if self.reload {
            self.client.reload();
        }
    }
}

impl<C: IniConfigClient> Backend for IniConfigBackend<C> {
    fn kind(&self) -> BackendKind {
        BackendKind::IniConfig
    }

    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn capture(&self, snapshot: &mut Snapshot, _desktop: &DesktopTokens) {
        if snapshot.ini.captured {
            return;
        }
        if !self.client.can_read() {
            tracing::debug!("no kreadconfig; KDE proxy settings not captured");
            return;
        }
        let read = |key: &str| self.client.read(INI_FILE, INI_GROUP, key);
        let ini = &mut snapshot.ini;
        ini.proxy_type = read(PROXY_TYPE);
        ini.http_proxy = read("httpProxy");
        ini.https_proxy = read("httpsProxy");
        ini.socks_proxy = read("socksProxy");
        ini.ftp_proxy = read("ftpProxy");
        ini.no_proxy_for = read("NoProxyFor");
        ini.captured = true;
        tracing::debug!(proxy_type = ?ini.proxy_type, "captured kioslaverc proxy settings");
    }

    fn apply(&self, config: &ProxyConfig, snapshot: &Snapshot) -> bool {
        if !snapshot.ini.captured {
            return false;
        }
        let url = config.proxy_url();
        let socks = config.socks_url();
        let writes = [
            (PROXY_TYPE, PROXY_TYPE_MANUAL.to_string()),
            ("httpProxy", url.clone()),
            ("httpsProxy", url.clone()),
            ("socksProxy", socks),
            ("ftpProxy", url),
            ("NoProxyFor", config.no_proxy_value()),
        ];
        let mut any = false;
        for (key, value) in &writes {
            any |= self.write(key, value);
        }
        if any {
            self.reload();
            tracing::info!("KDE proxy applied");
        }
        any
    }

    fn restore(&self, snapshot: &Snapshot) {
        let ini = &snapshot.ini;
        if !ini.captured {
            return;
        }
        let proxy_type = ini
            .proxy_type
            .as_deref()
            .map(|v| v.trim_end_matches(['\r', '\n']))
            .filter(|v| !v.is_empty())
            .unwrap_or(PROXY_TYPE_NONE);
        self.write(PROXY_TYPE, proxy_type);
        self.write_or_delete("httpProxy", ini.http_proxy.as_deref());
        self.write_or_delete("httpsProxy", ini.https_proxy.as_deref());
        self.write_or_delete("socksProxy", ini.socks_proxy.as_deref());
        self.write_or_delete("ftpProxy", ini.ftp_proxy.as_deref());
        self.write_or_delete("NoProxyFor", ini.no_proxy_for.as_deref());
        self.reload();
        tracing::info!("KDE proxy restored");
    }
}
