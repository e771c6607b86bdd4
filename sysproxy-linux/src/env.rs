//! The real process environment.

use sysproxy_core::client::EnvStore;
use sysproxy_core::DesktopIndicators;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }

    fn remove(&self, name: &str) {
        std::env::remove_var(name);
    }
}

/// Session indicators of the running desktop.
pub fn desktop_indicators() -> DesktopIndicators {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    DesktopIndicators {
        current_desktop: var("XDG_CURRENT_DESKTOP"),
        session: var("DESKTOP_SESSION"),
        display_manager_session: var("GDMSESSION"),
        session_desktop: var("XDG_SESSION_DESKTOP"),
    }
}
