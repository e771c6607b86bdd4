//! Orchestrates capture, persistence, apply and restore across all backends.
//!
//! One coordinator owns the session state: the snapshot, whether a proxy is
//! applied, and the backends. Every public operation takes the same lock, so
//! apply/reset/restore calls are serialised. All backend work is blocking.

use std::sync::{Mutex, MutexGuard};

use crate::backend::Backend;
use crate::config::{ConfigError, ProxyConfig};
use crate::desktop::{select_backends, BackendKind, BackendSelection, DesktopTokens, ToolInventory};
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

pub type BoxedBackend = Box<dyn Backend + Send>;

/// Outcome of one apply call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub attempted: Vec<BackendKind>,
    pub succeeded: Vec<BackendKind>,
}

impl ApplyReport {
    pub fn desktop_attempted(&self) -> bool {
        self.attempted.iter().any(|k| k.is_desktop_specific())
    }

    pub fn desktop_succeeded(&self) -> bool {
        self.succeeded.iter().any(|k| k.is_desktop_specific())
    }

    /// A desktop store was tried but only the environment took effect.
    pub fn degraded(&self) -> bool {
        self.desktop_attempted() && !self.desktop_succeeded()
    }
}

struct Inner<S> {
    backends: Vec<BoxedBackend>,
    store: S,
    desktop: DesktopTokens,
    snapshot: Snapshot,
    applied: bool,
    /// The live snapshot is in the store; desktop stores may be mutated.
    persisted: bool,
}

impl<S: SnapshotStore> Inner<S> {
    fn inventory(&self) -> ToolInventory {
        let mut tools = ToolInventory::default();
        for backend in &self.backends {
            tools.set(backend.kind(), backend.is_available());
        }
        tools
    }

    fn selection(&self) -> BackendSelection {
        select_backends(&self.desktop, &self.inventory())
    }

    /// Load the persisted snapshot, treating anything unreadable as absent.
    fn load_pending(&self) -> Option<Snapshot> {
        match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable proxy snapshot");
                if let Err(e) = self.store.clear() {
                    tracing::error!(error = %e, "failed to remove unreadable proxy snapshot");
                }
                None
            }
        }
    }

    fn begin_session(&mut self, selection: &BackendSelection) {
        if let Some(pending) = self.load_pending().filter(Snapshot::is_captured) {
            tracing::info!("adopting proxy snapshot left by a previous session");
            self.snapshot = pending;
            self.persisted = true;
            return;
        }

        let mut snapshot = Snapshot::default();
        for backend in &self.backends {
            if selection.contains(backend.kind()) {
                backend.capture(&mut snapshot, &self.desktop);
            }
        }
        self.snapshot = snapshot;
        self.persisted = match self.store.save(&self.snapshot) {
            Ok(()) => {
                tracing::debug!("proxy snapshot saved");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save proxy snapshot; only environment variables will be set");
                false
            }
        };
    }

    fn restore_all(&mut self) {
        for backend in &self.backends {
            backend.restore(&self.snapshot);
        }
        self.applied = false;
        self.persisted = false;
        self.snapshot = Snapshot::default();
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to remove proxy snapshot");
        }
    }
}

pub struct ProxyCoordinator<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: SnapshotStore> ProxyCoordinator<S> {
    pub fn new(backends: Vec<BoxedBackend>, store: S, desktop: DesktopTokens) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backends,
                store,
                desktop,
                snapshot: Snapshot::default(),
                applied: false,
                persisted: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Point the system at the proxy. `false` only for invalid input.
    pub fn apply_system_proxy(&self, config: &ProxyConfig) -> bool {
        match self.apply_with_report(config) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "proxy request rejected");
                false
            }
        }
    }

    pub fn apply_with_report(&self, config: &ProxyConfig) -> Result<ApplyReport, ConfigError> {
        config.validate()?;

        let mut inner = self.lock();
        let selection = inner.selection();
        tracing::info!(
            desktop = %inner.desktop,
            backends = %selection,
            proxy = %config.proxy_url(),
            "applying system proxy"
        );

        if !inner.applied {
            inner.begin_session(&selection);
        }

        let mut report = ApplyReport::default();
        for backend in &inner.backends {
            let kind = backend.kind();
            if !selection.contains(kind) {
                continue;
            }
            // Without a stored snapshot a crash could not undo a desktop store.
            if kind.is_desktop_specific() && !inner.persisted {
                tracing::debug!(backend = %kind, "skipped; snapshot not persisted");
                continue;
            }
            report.attempted.push(kind);
            if backend.apply(config, &inner.snapshot) {
                report.succeeded.push(kind);
            } else {
                tracing::warn!(backend = %kind, "backend did not apply the proxy");
            }
        }
        inner.applied = true;

        if report.degraded() {
            tracing::warn!("no desktop proxy store accepted the change; only environment variables are set");
        }
        Ok(report)
    }

    /// Undo the current session, or a persisted one if this process has none.
    pub fn reset_system_proxy(&self) {
        let mut inner = self.lock();
        if !inner.applied && !inner.store.exists() {
            tracing::debug!("no proxy applied; nothing to reset");
            return;
        }
        if !inner.applied {
            match inner.load_pending() {
                Some(snapshot) => inner.snapshot = snapshot,
                None => {
                    tracing::info!("no usable proxy snapshot; nothing to restore");
                    return;
                }
            }
        }
        inner.restore_all();
        tracing::info!("system proxy reset");
    }

    /// Heal from a crash: restore and remove any snapshot left on disk.
    pub fn restore_pending_snapshot(&self) {
        let mut inner = self.lock();
        let Some(snapshot) = inner.load_pending() else {
            return;
        };
        tracing::info!("restoring proxy settings left by a previous session");
        inner.snapshot = snapshot;
        inner.applied = true;
        inner.restore_all();
    }

    pub fn is_applied(&self) -> bool {
        self.lock().applied
    }

    /// Backends an apply would use right now.
    pub fn selection(&self) -> BackendSelection {
        self.lock().selection()
    }

    pub fn desktop(&self) -> DesktopTokens {
        self.lock().desktop.clone()
    }

    pub fn has_pending_snapshot(&self) -> bool {
        self.lock().store.exists()
    }

    /// Each backend with whether its tooling is installed.
    pub fn availability(&self) -> Vec<(BackendKind, bool)> {
        self.lock()
            .backends
            .iter()
            .map(|b| (b.kind(), b.is_available()))
            .collect()
    }
}
