//! Backend adapters: one per configuration store.
//!
//! Every adapter follows the same contract:
//! - `capture` records the store's current proxy values into the snapshot. It is a
//!   no-op when the store was already captured and never fails; missing tools or
//!   keys are recorded as absent.
//! - `apply` writes the requested proxy into whatever was captured and returns
//!   whether any write took effect.
//! - `restore` writes back only what capture saw.

mod env;
mod ini;
mod keyed;
mod profile;
mod property;

pub use env::EnvBackend;
pub use ini::{IniConfigBackend, INI_FILE, INI_GROUP};
pub use keyed::{
    desktop_schemas, format_string_list, normalize_for_set, quote_string, KeyedSettingsBackend,
    Mismatch, CANDIDATE_SCHEMAS,
};
pub use profile::NetworkProfileBackend;
pub use property::{parse_string_list, PropertyStoreBackend, PROPERTY_CHANNELS};

use crate::config::ProxyConfig;
use crate::desktop::{BackendKind, DesktopTokens};
use crate::snapshot::Snapshot;

pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Whether the store's tooling is installed.
    fn is_available(&self) -> bool;

    fn capture(&self, snapshot: &mut Snapshot, desktop: &DesktopTokens);

    fn apply(&self, config: &ProxyConfig, snapshot: &Snapshot) -> bool;

    fn restore(&self, snapshot: &Snapshot);
}
