//! Desktop environment detection: normalise session indicators into tokens and
//! decide which configuration stores are relevant.

use std::fmt;

/// Tokens that mark a desktop using the keyed-settings (GSettings) proxy schema.
const KEYED_SETTINGS_HINTS: [&str; 12] = [
    "GNOME", "UNITY", "PANTHEON", "POP", "COSMIC", "BUDGIE", "CINNAMON", "MATE", "DEEPIN", "UKUI",
    "LXDE", "LXQT",
];
const INI_HINTS: [&str; 2] = ["KDE", "PLASMA"];
const PROPERTY_STORE_HINTS: [&str; 1] = ["XFCE"];

/// Raw session indicators, usually read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopIndicators {
    /// `XDG_CURRENT_DESKTOP`
    pub current_desktop: Option<String>,
    /// `DESKTOP_SESSION`
    pub session: Option<String>,
    /// `GDMSESSION`
    pub display_manager_session: Option<String>,
    /// `XDG_SESSION_DESKTOP`
    pub session_desktop: Option<String>,
}

impl DesktopIndicators {
    /// Normalised, deduplicated, upper-case tokens in indicator order.
    pub fn tokens(&self) -> DesktopTokens {
        let mut tokens = DesktopTokens::default();
        for raw in [
            &self.current_desktop,
            &self.session,
            &self.display_manager_session,
            &self.session_desktop,
        ]
        .into_iter()
        .flatten()
        {
            tokens.extend_from(raw);
        }
        tokens
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopTokens(Vec<String>);

impl DesktopTokens {
    pub fn parse(raw: &str) -> Self {
        let mut tokens = Self::default();
        tokens.extend_from(raw);
        tokens
    }

    fn extend_from(&mut self, raw: &str) {
        let parts = raw.split(|c: char| c == ':' || c == ';' || c == ',' || c.is_whitespace());
        for part in parts.filter(|p| !p.is_empty()) {
            let upper = part.to_uppercase();
            if !self.0.contains(&upper) {
                self.0.push(upper);
            }
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any token contains any of `needles` (substring match, so `X-CINNAMON` hits `CINNAMON`).
    pub fn mentions(&self, needles: &[&str]) -> bool {
        self.0
            .iter()
            .any(|token| needles.iter().any(|n| token.contains(n)))
    }
}

impl fmt::Display for DesktopTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("unknown")
        } else {
            f.write_str(&self.0.join(":"))
        }
    }
}

/// Configuration stores this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Environment,
    KeyedSettings,
    PropertyStore,
    IniConfig,
    NetworkProfiles,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Environment => "env",
            BackendKind::KeyedSettings => "gsettings",
            BackendKind::PropertyStore => "xfce",
            BackendKind::IniConfig => "kde",
            BackendKind::NetworkProfiles => "network-manager",
        }
    }

    /// Everything except the environment baseline.
    pub fn is_desktop_specific(self) -> bool {
        self != BackendKind::Environment
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which command-line tools are installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolInventory {
    pub keyed_settings: bool,
    pub property_store: bool,
    pub ini_config: bool,
    pub network_profiles: bool,
}

impl ToolInventory {
    pub fn has(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Environment => true,
            BackendKind::KeyedSettings => self.keyed_settings,
            BackendKind::PropertyStore => self.property_store,
            BackendKind::IniConfig => self.ini_config,
            BackendKind::NetworkProfiles => self.network_profiles,
        }
    }

    pub fn set(&mut self, kind: BackendKind, present: bool) {
        match kind {
            BackendKind::Environment => {}
            BackendKind::KeyedSettings => self.keyed_settings = present,
            BackendKind::PropertyStore => self.property_store = present,
            BackendKind::IniConfig => self.ini_config = present,
            BackendKind::NetworkProfiles => self.network_profiles = present,
        }
    }
}

/// Backends enabled for one apply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSelection {
    pub env: bool,
    pub keyed_settings: bool,
    pub property_store: bool,
    pub ini_config: bool,
    pub network_profiles: bool,
}

impl BackendSelection {
    pub fn contains(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Environment => self.env,
            BackendKind::KeyedSettings => self.keyed_settings,
            BackendKind::PropertyStore => self.property_store,
            BackendKind::IniConfig => self.ini_config,
            BackendKind::NetworkProfiles => self.network_profiles,
        }
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        [
            BackendKind::Environment,
            BackendKind::KeyedSettings,
            BackendKind::PropertyStore,
            BackendKind::IniConfig,
            BackendKind::NetworkProfiles,
        ]
        .into_iter()
        .filter(|k| self.contains(*k))
        .collect()
    }

    pub fn any_desktop_specific(&self) -> bool {
        self.kinds().iter().any(|k| k.is_desktop_specific())
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds().into_iter().map(BackendKind::name).collect();
        f.write_str(&names.join(", "))
    }
}

/// Pick backends from desktop hints and installed tools.
///
/// Keyed settings are enabled whenever the tool exists, hinted or not, since many
/// non-GNOME desktops shim the same service. The INI and property stores are
/// desktop specific and need a matching hint.
pub fn select_backends(tokens: &DesktopTokens, tools: &ToolInventory) -> BackendSelection {
    let keyed_hint = tokens.mentions(&KEYED_SETTINGS_HINTS);
    let ini_hint = tokens.mentions(&INI_HINTS);
    let property_hint = tokens.mentions(&PROPERTY_STORE_HINTS);

    let keyed_settings = tools.keyed_settings;
    if keyed_settings && !keyed_hint {
        tracing::debug!(desktop = %tokens, "no GNOME-family hint; enabling gsettings as fallback");
    }

    BackendSelection {
        env: true,
        keyed_settings,
        property_store: property_hint && tools.property_store,
        ini_config: ini_hint && tools.ini_config,
        network_profiles: tools.network_profiles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tools() -> ToolInventory {
        ToolInventory {
            keyed_settings: true,
            property_store: true,
            ini_config: true,
            network_profiles: true,
        }
    }

    #[test]
    fn tokens_are_split_uppercased_and_deduplicated() {
        let indicators = DesktopIndicators {
            current_desktop: Some("ubuntu:GNOME".into()),
            session: Some("ubuntu".into()),
            display_manager_session: Some("gnome; ubuntu-wayland".into()),
            session_desktop: None,
        };
        let tokens = indicators.tokens();
        assert_eq!(tokens.as_slice(), ["UBUNTU", "GNOME", "UBUNTU-WAYLAND"]);
        assert_eq!(tokens.to_string(), "UBUNTU:GNOME:UBUNTU-WAYLAND");
    }

    #[test]
    fn empty_indicators_give_unknown() {
        let tokens = DesktopIndicators::default().tokens();
        assert!(tokens.is_empty());
        assert_eq!(tokens.to_string(), "unknown");
    }

    #[test]
    fn env_is_always_selected() {
        let selection = select_backends(&DesktopTokens::default(), &ToolInventory::default());
        assert_eq!(selection.kinds(), vec![BackendKind::Environment]);
        assert!(!selection.any_desktop_specific());
    }

    #[test]
    fn gnome_selects_gsettings_but_not_kde_or_xfce() {
        let selection = select_backends(&DesktopTokens::parse("GNOME"), &all_tools());
        assert!(selection.keyed_settings);
        assert!(!selection.ini_config);
        assert!(!selection.property_store);
        assert!(selection.network_profiles);
    }

    #[test]
    fn gsettings_fallback_without_hint() {
        let tools = ToolInventory {
            keyed_settings: true,
            ..ToolInventory::default()
        };
        let selection = select_backends(&DesktopTokens::parse("i3"), &tools);
        assert!(selection.keyed_settings);
    }

    #[test]
    fn kde_and_xfce_need_a_hint() {
        let selection = select_backends(&DesktopTokens::parse("sway"), &all_tools());
        assert!(!selection.ini_config);
        assert!(!selection.property_store);

        let selection = select_backends(&DesktopTokens::parse("KDE"), &all_tools());
        assert!(selection.ini_config);
        let selection = select_backends(&DesktopTokens::parse("plasmawayland"), &all_tools());
        assert!(selection.ini_config);
        let selection = select_backends(&DesktopTokens::parse("XFCE"), &all_tools());
        assert!(selection.property_store);
    }

    #[test]
    fn hint_without_tool_is_not_selected() {
        let selection = select_backends(
            &DesktopTokens::parse("KDE:XFCE:GNOME"),
            &ToolInventory::default(),
        );
        assert_eq!(selection.kinds(), vec![BackendKind::Environment]);
    }

    #[test]
    fn substring_hint_matches_vendor_prefixed_tokens() {
        let tokens = DesktopTokens::parse("X-Cinnamon");
        assert!(tokens.mentions(&["CINNAMON"]));
    }

    #[test]
    fn selection_display_lists_names() {
        let selection = select_backends(&DesktopTokens::parse("KDE"), &all_tools());
        assert_eq!(selection.to_string(), "env, gsettings, kde, network-manager");
    }
}
