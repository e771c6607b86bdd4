//! Narrow interfaces to each configuration store. The host supplies real
//! implementations (shelling out to the store's CLI); tests use in-memory fakes.
//!
//! Reads return `None` when the key or tool is absent; writes return whether
//! the store accepted the value. None of these methods fail loudly.

/// Process environment.
pub trait EnvStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
    fn remove(&self, name: &str);
}

/// Keyed-settings service (GSettings and its desktop forks).
pub trait KeyedSettingsClient {
    fn is_available(&self) -> bool;
    /// Whether `schema` exposes `key`. Expected to fail quietly.
    fn key_exists(&self, schema: &str, key: &str) -> bool;
    /// Raw GVariant text of the value, trimmed.
    fn get(&self, schema: &str, key: &str) -> Option<String>;
    /// `value` is GVariant text (`'manual'`, `8080`, `true`, `['a', 'b']`).
    fn set(&self, schema: &str, key: &str, value: &str) -> bool;
    /// Installed and relocatable schema ids.
    fn list_schemas(&self) -> Vec<String>;
}

/// Value type of a property-store property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Bool,
    Int,
}

impl PropertyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKind::String => "string",
            PropertyKind::Bool => "bool",
            PropertyKind::Int => "int",
        }
    }
}

/// Hierarchical property store (xfconf).
pub trait PropertyStoreClient {
    fn is_available(&self) -> bool;
    /// Trimmed value of an existing property.
    fn read(&self, channel: &str, property: &str) -> Option<String>;
    /// Whether the channel can be listed at all.
    fn list(&self, channel: &str) -> bool;
    /// Set an existing property. Fails when it does not exist yet.
    fn set(&self, channel: &str, property: &str, value: &str) -> bool;
    /// Create a property with an explicit type.
    fn create(&self, channel: &str, property: &str, kind: PropertyKind, value: &str) -> bool;
    /// Create a multi-valued string property.
    fn create_string_list(&self, channel: &str, property: &str, values: &[String]) -> bool;
    /// Delete a property.
    fn reset(&self, channel: &str, property: &str);
}

/// INI-style config file with a fixed group (KDE `kioslaverc`).
pub trait IniConfigClient {
    /// Writer tool present.
    fn is_available(&self) -> bool;
    /// Reader tool present.
    fn can_read(&self) -> bool;
    fn read(&self, file: &str, group: &str, key: &str) -> Option<String>;
    fn write(&self, file: &str, group: &str, key: &str, value: &str) -> bool;
    fn delete(&self, file: &str, group: &str, key: &str) -> bool;
    /// Ask running applications to pick up the change, if a session helper exists.
    fn reload(&self);
}

/// Network connection profile manager (NetworkManager).
pub trait ProfileManagerClient {
    fn is_available(&self) -> bool;
    /// Names of active profiles, `None` if they could not be listed.
    fn active_profiles(&self) -> Option<Vec<String>>;
    /// Value of a profile setting such as `proxy.method`. `Some("")` for an empty field.
    fn field(&self, profile: &str, field: &str) -> Option<String>;
    /// Whether the profile exposes `proxy.http`/`proxy.https`/`proxy.socks`.
    fn supports_manual_proxy(&self, profile: &str) -> bool;
    fn modify(&self, profile: &str, field: &str, value: &str) -> bool;
    /// Re-activate so the change takes effect.
    fn activate(&self, profile: &str) -> bool;
}
