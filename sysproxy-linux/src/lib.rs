//! Linux system proxy management: command-line clients for gsettings, xfconf,
//! KDE config and NetworkManager, the snapshot file, and a C ABI.

pub mod config;
pub mod env;
pub mod ffi;
pub mod gsettings;
pub mod kconfig;
pub mod nmcli;
pub mod shell;
pub mod store;
pub mod system;
pub mod xfconf;

pub use config::Config;
pub use store::FileSnapshotStore;
pub use system::{coordinator, SystemCoordinator};
