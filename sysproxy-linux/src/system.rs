//! Wire the real desktop clients into a coordinator.

use std::path::PathBuf;
use std::sync::Arc;

use sysproxy_core::backend::{
    EnvBackend, IniConfigBackend, KeyedSettingsBackend, NetworkProfileBackend,
    PropertyStoreBackend,
};
use sysproxy_core::{BoxedBackend, ProxyCoordinator};

use crate::config::Config;
use crate::env::{desktop_indicators, ProcessEnv};
use crate::gsettings::GSettings;
use crate::kconfig::KConfig;
use crate::nmcli::NetworkManager;
use crate::shell::{SharedRunner, ShellExecutor};
use crate::store::{default_snapshot_path, FileSnapshotStore};
use crate::xfconf::Xfconf;

pub type SystemCoordinator = ProxyCoordinator<FileSnapshotStore>;

/// Backends in apply order: environment first, network profiles last.
pub fn system_backends(runner: SharedRunner, reload_kde: bool) -> Vec<BoxedBackend> {
    vec![
        Box::new(EnvBackend::new(ProcessEnv)),
        Box::new(KeyedSettingsBackend::new(GSettings::new(runner.clone()))),
        Box::new(PropertyStoreBackend::new(Xfconf::new(runner.clone()))),
        Box::new(IniConfigBackend::new(KConfig::new(runner.clone())).with_reload(reload_kde)),
        Box::new(NetworkProfileBackend::new(NetworkManager::new(runner))),
    ]
}

pub fn snapshot_path(config: &Config) -> PathBuf {
    config
        .snapshot_path
        .clone()
        .unwrap_or_else(default_snapshot_path)
}

/// Coordinator for this session's desktop, backed by the snapshot file.
pub fn coordinator(config: &Config) -> SystemCoordinator {
    coordinator_with(config, Arc::new(ShellExecutor))
}

pub fn coordinator_with(config: &Config, runner: SharedRunner) -> SystemCoordinator {
    let desktop = desktop_indicators().tokens();
    let store = FileSnapshotStore::new(snapshot_path(config));
    tracing::debug!(desktop = %desktop, snapshot = %store.path().display(), "building proxy coordinator");
    ProxyCoordinator::new(system_backends(runner, config.reload_kde), store, desktop)
}
