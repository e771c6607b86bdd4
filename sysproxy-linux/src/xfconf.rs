//! `xfconf-query` client.

use sysproxy_core::client::{PropertyKind, PropertyStoreClient};

use crate::shell::{tool_exists, CommandLine, SharedRunner};

pub const XFCONF_QUERY: &str = "xfconf-query";

pub struct Xfconf {
    runner: SharedRunner,
    available: bool,
}

impl Xfconf {
    pub fn new(runner: SharedRunner) -> Self {
        let available = tool_exists(runner.as_ref(), XFCONF_QUERY);
        Self { runner, available }
    }

    fn property(channel: &str, property: &str) -> CommandLine {
        CommandLine::new(XFCONF_QUERY).args(["-c", channel, "-p", property])
    }
}

impl PropertyStoreClient for Xfconf {
    fn is_available(&self) -> bool {
        self.available
    }

    fn read(&self, channel: &str, property: &str) -> Option<String> {
        let out = self.runner.run_quiet(&Self::property(channel, property));
        out.success().then(|| out.text().trim().to_string())
    }

    fn list(&self, channel: &str) -> bool {
        let out = self
            .runner
            .run_quiet(&CommandLine::new(XFCONF_QUERY).args(["-c", channel, "-l"]));
        out.success() && !out.stdout.trim().is_empty()
    }

    fn set(&self, channel: &str, property: &str, value: &str) -> bool {
        // Fails for a property that does not exist yet; the caller then creates it.
        self.runner
            .run_quiet(&Self::property(channel, property).args(["-s", value]))
            .success()
    }

    fn create(&self, channel: &str, property: &str, kind: PropertyKind, value: &str) -> bool {
        let cmd = Self::property(channel, property).args(["-n", "-t", kind.as_str(), "-s", value]);
        self.runner.run(&cmd).success()
    }

    fn create_string_list(&self, channel: &str, property: &str, values: &[String]) -> bool {
        let mut cmd = Self::property(channel, property).arg("-n");
        for value in values {
            cmd = cmd.args(["-t", "string", "-s", value.as_str()]);
        }
        self.runner.run(&cmd).success()
    }

    fn reset(&self, channel: &str, property: &str) {
        // Resetting an absent property exits non-zero; that is fine.
        self.runner
            .run_quiet(&Self::property(channel, property).arg("-r"));
    }
}
