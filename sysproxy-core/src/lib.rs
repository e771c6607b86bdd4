//! System proxy management core.
//! Host-driven: no process spawning here; the host supplies store clients and
//! this crate decides what to capture, write and restore.

pub mod backend;
pub mod client;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod desktop;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use codec::{decode_snapshot, encode_snapshot, SnapshotDecodeError};
pub use config::{ConfigError, ProxyConfig, DEFAULT_NO_PROXY};
pub use coordinator::{ApplyReport, BoxedBackend, ProxyCoordinator};
pub use desktop::{BackendKind, BackendSelection, DesktopIndicators, DesktopTokens, ToolInventory};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use store::{MemorySnapshotStore, SnapshotStore, StoreError};
