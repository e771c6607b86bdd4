//! NetworkManager connection profiles via `nmcli`.

use sysproxy_core::client::ProfileManagerClient;

use crate::shell::{tool_exists, CommandLine, SharedRunner};

pub const NMCLI: &str = "nmcli";

const MANUAL_PROXY_FIELDS: [&str; 3] = ["proxy.http", "proxy.https", "proxy.socks"];

/// Undo `nmcli -t` escaping of `:` and `\` in a field.
fn unescape_terse(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

pub struct NetworkManager {
    runner: SharedRunner,
    available: bool,
}

impl NetworkManager {
    pub fn new(runner: SharedRunner) -> Self {
        let available = tool_exists(runner.as_ref(), NMCLI);
        Self { runner, available }
    }

    fn connection(args: &[&str]) -> CommandLine {
        CommandLine::new(NMCLI).arg("connection").args(args.iter().copied())
    }
}

impl ProfileManagerClient for NetworkManager {
    fn is_available(&self) -> bool {
        self.available
    }

    fn active_profiles(&self) -> Option<Vec<String>> {
        let cmd = CommandLine::new(NMCLI).args(["-t", "-f", "NAME", "connection", "show", "--active"]);
        let out = self.runner.run(&cmd);
        if !out.success() {
            return None;
        }
        Some(
            out.stdout
                .lines()
                .filter(|l| !l.is_empty())
                .map(unescape_terse)
                .collect(),
        )
    }

    fn field(&self, profile: &str, field: &str) -> Option<String> {
        let cmd = CommandLine::new(NMCLI).args(["-g", field, "connection", "show", profile]);
        let out = self.runner.run(&cmd);
        out.success().then(|| unescape_terse(out.text()))
    }

    fn supports_manual_proxy(&self, profile: &str) -> bool {
        let out = self.runner.run_quiet(&Self::connection(&["show", profile]));
        out.success() && MANUAL_PROXY_FIELDS.iter().any(|f| out.stdout.contains(f))
    }

    fn modify(&self, profile: &str, field: &str, value: &str) -> bool {
        self.runner
            .run(&Self::connection(&["modify", profile, field, value]))
            .success()
    }

    fn activate(&self, profile: &str) -> bool {
        self.runner
            .run(&Self::connection(&["up", profile]))
            .success()
    }
}
