//! KDE config tools (`kreadconfig`/`kwriteconfig`) and the kded proxy module reload.

use sysproxy_core::client::IniConfigClient;

use crate::shell::{tool_exists, CommandLine, SharedRunner};

/// One generation of the KDE command-line tools.
#[derive(Debug, PartialEq, Eq)]
pub struct KdeTools {
    pub reader: &'static str,
    pub writer: &'static str,
    /// D-Bus CLIs to try, in order.
    pub qdbus: &'static [&'static str],
    pub kded: &'static str,
}

pub static KDE6: KdeTools = KdeTools {
    reader: "kreadconfig6",
    writer: "kwriteconfig6",
    qdbus: &["qdbus6", "qdbus"],
    kded: "org.kde.kded6",
};

pub static KDE5: KdeTools = KdeTools {
    reader: "kreadconfig5",
    writer: "kwriteconfig5",
    qdbus: &["qdbus"],
    kded: "org.kde.kded5",
};

pub struct KConfig {
    runner: SharedRunner,
    tools: Option<&'static KdeTools>,
    can_read: bool,
    qdbus: Option<&'static str>,
}

impl KConfig {
    /// Probe for Plasma 6 tools first, then Plasma 5.
    pub fn new(runner: SharedRunner) -> Self {
        let tools = [&KDE6, &KDE5]
            .into_iter()
            .find(|t| tool_exists(runner.as_ref(), t.writer));
        let can_read = tools.is_some_and(|t| tool_exists(runner.as_ref(), t.reader));
        let qdbus = tools.and_then(|t| {
            t.qdbus
                .iter()
                .copied()
                .find(|q| tool_exists(runner.as_ref(), q))
        });
        if let Some(t) = tools {
            tracing::debug!(writer = t.writer, can_read, qdbus = ?qdbus, "KDE config tools found");
        }
        Self {
            runner,
            tools,
            can_read,
            qdbus,
        }
    }

    pub fn tools(&self) -> Option<&'static KdeTools> {
        self.tools
    }

    fn command(program: &str, file: &str, group: &str, key: &str) -> CommandLine {
        CommandLine::new(program).args(["--file", file, "--group", group, "--key", key])
    }
}

impl IniConfigClient for KConfig {
    fn is_available(&self) -> bool {
        self.tools.is_some()
    }

    fn can_read(&self) -> bool {
        self.can_read
    }

    fn read(&self, file: &str, group: &str, key: &str) -> Option<String> {
        let tools = self.tools.filter(|_| self.can_read)?;
        let out = self.runner.run(&Self::command(tools.reader, file, group, key));
        out.success().then(|| out.text().to_string())
    }

    fn write(&self, file: &str, group: &str, key: &str, value: &str) -> bool {
        let Some(tools) = self.tools else {
            return false;
        };
        self.runner
            .run(&Self::command(tools.writer, file, group, key).arg(value))
            .success()
    }

    fn delete(&self, file: &str, group: &str, key: &str) -> bool {
        let Some(tools) = self.tools else {
            return false;
        };
        self.runner
            .run(&Self::command(tools.writer, file, group, key).arg("--delete"))
            .success()
    }

    fn reload(&self) {
        let (Some(tools), Some(qdbus)) = (self.tools, self.qdbus) else {
            return;
        };
        let cmd = CommandLine::new(qdbus).args([
            tools.kded.to_string(),
            "/kded".to_string(),
            format!("{}.loadModule", tools.kded),
            "proxy".to_string(),
        ]);
        if !self.runner.run_quiet(&cmd).success() {
            tracing::debug!("kded proxy module reload failed; applications pick up changes on restart");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::scripted::ScriptedRunner;

    #[test]
    fn prefers_plasma_6() {
        let runner = ScriptedRunner::new();
        for tool in ["kwriteconfig6", "kreadconfig6", "kwriteconfig5", "qdbus"] {
            runner.install(tool);
        }
        let client = KConfig::new(runner.clone());
        assert_eq!(client.tools(), Some(&KDE6));
        assert!(client.can_read());

        runner.clear_calls();
        client.reload();
        assert_eq!(
            runner.calls(),
            vec!["qdbus org.kde.kded6 /kded org.kde.kded6.loadModule proxy"]
        );
    }

    #[test]
    fn falls_back_to_plasma_5() {
        let runner = ScriptedRunner::new();
        runner.install("kwriteconfig5");
        let client = KConfig::new(runner.clone());
        assert_eq!(client.tools(), Some(&KDE5));
        assert!(!client.can_read());
        assert_eq!(client.read("kioslaverc", "Proxy Settings", "ProxyType"), None);

        runner.clear_calls();
        client.write("kioslaverc", "Proxy Settings", "httpProxy", "http://h:1");
        client.delete("kioslaverc", "Proxy Settings", "ftpProxy");
        client.reload();
        assert_eq!(
            runner.calls(),
            vec![
                "kwriteconfig5 --file kioslaverc --group 'Proxy Settings' --key httpProxy http://h:1",
                "kwriteconfig5 --file kioslaverc --group 'Proxy Settings' --key ftpProxy --delete",
            ]
        );
    }

    #[test]
    fn unavailable_without_writer() {
        let runner = ScriptedRunner::new();
        runner.install("kreadconfig5");
        let client = KConfig::new(runner);
        assert!(!client.is_available());
        assert!(!client.write("kioslaverc", "Proxy Settings", "ProxyType", "1"));
    }

    #[test]
    fn read_keeps_empty_values() {
        let runner = ScriptedRunner::new();
        runner.install("kwriteconfig5");
        runner.install("kreadconfig5");
        runner.reply(
            "kreadconfig5 --file kioslaverc --group 'Proxy Settings' --key NoProxyFor",
            0,
            "\n",
        );
        let client = KConfig::new(runner);
        assert_eq!(
            client.read("kioslaverc", "Proxy Settings", "NoProxyFor").as_deref(),
            Some("")
        );
    }
}
