//! `gsettings` command-line client.

use sysproxy_core::client::KeyedSettingsClient;

use crate::shell::{tool_exists, CommandLine, SharedRunner};

pub const GSETTINGS: &str = "gsettings";

pub struct GSettings {
    runner: SharedRunner,
    available: bool,
}

impl GSettings {
    pub fn new(runner: SharedRunner) -> Self {
        let available = tool_exists(runner.as_ref(), GSETTINGS);
        Self { runner, available }
    }

    fn command(args: &[&str]) -> CommandLine {
        CommandLine::new(GSETTINGS).args(args.iter().copied())
    }
}

impl KeyedSettingsClient for GSettings {
    fn is_available(&self) -> bool {
        self.available
    }

    fn key_exists(&self, schema: &str, key: &str) -> bool {
        // `range` is cheap and fails for a missing key; some forks lack it, so fall back to `get`.
        self.runner
            .run_quiet(&Self::command(&["range", schema, key]))
            .success()
            || self
                .runner
                .run_quiet(&Self::command(&["get", schema, key]))
                .success()
    }

    fn get(&self, schema: &str, key: &str) -> Option<String> {
        let out = self.runner.run(&Self::command(&["get", schema, key]));
        out.success().then(|| out.text().trim().to_string())
    }

    fn set(&self, schema: &str, key: &str, value: &str) -> bool {
        self.runner
            .run(&Self::command(&["set", schema, key, value]))
            .success()
    }

    fn list_schemas(&self) -> Vec<String> {
        let mut schemas = Vec::new();
        for listing in ["list-schemas", "list-relocatable-schemas"] {
            let out = self.runner.run_quiet(&Self::command(&[listing]));
            if !out.success() {
                continue;
            }
            schemas.extend(
                out.stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        }
        schemas
    }
}
