// sysproxy: point the Linux desktop at a proxy and put everything back afterwards.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use sysproxy_core::{ApplyReport, ProxyConfig};
use sysproxy_linux::config::{self, Config};
use sysproxy_linux::system::{self, SystemCoordinator};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sysproxy", author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/sysproxy/config.toml, then /etc/sysproxy/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a proxy to every detected desktop store and exit
    Apply(ProxyArgs),
    /// Restore the settings saved by the last apply
    Reset,
    /// Restore settings left behind by a crashed session
    RestorePending,
    /// Apply, wait for Ctrl+C or SIGTERM, then reset
    Run(ProxyArgs),
    /// Show detected desktop, backends and snapshot state
    Status,
}

#[derive(Args)]
struct ProxyArgs {
    /// Proxy host name or address
    #[arg(long)]
    host: Option<String>,
    /// Proxy port
    #[arg(long)]
    port: Option<i64>,
    /// URL scheme (default http)
    #[arg(long)]
    scheme: Option<String>,
    /// Extra comma-separated hosts that bypass the proxy
    #[arg(long)]
    no_proxy: Option<String>,
}

impl ProxyArgs {
    /// Command-line values over the `[proxy]` table of the config file.
    fn resolve(&self, fallback: Option<&ProxyConfig>) -> anyhow::Result<ProxyConfig> {
        let host = match (&self.host, fallback) {
            (Some(h), _) => h.clone(),
            (None, Some(f)) => f.host.clone(),
            (None, None) => bail!("no proxy host: pass --host or set [proxy] in the config file"),
        };
        let port = match (self.port, fallback) {
            (Some(p), _) => p,
            (None, Some(f)) => f.port,
            (None, None) => bail!("no proxy port: pass --port or set [proxy] in the config file"),
        };
        let scheme = self
            .scheme
            .clone()
            .or_else(|| fallback.map(|f| f.scheme.clone()))
            .unwrap_or_default();
        let no_proxy = self
            .no_proxy
            .clone()
            .or_else(|| fallback.map(|f| f.no_proxy.clone()))
            .unwrap_or_default();
        Ok(ProxyConfig::new(host, port, scheme, no_proxy))
    }
}

fn parse_level(s: &str) -> Level {
    match s.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    let level = parse_level(cli.log_level.as_deref().unwrap_or(&cfg.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let coordinator = system::coordinator(&cfg);
    match &cli.command {
        Command::Apply(args) => {
            let proxy = args.resolve(cfg.proxy.as_ref())?;
            let report = apply(&coordinator, &proxy)?;
            print_report(&proxy, &report);
        }
        Command::Reset => coordinator.reset_system_proxy(),
        Command::RestorePending => coordinator.restore_pending_snapshot(),
        Command::Run(args) => {
            let proxy = args.resolve(cfg.proxy.as_ref())?;
            run(Arc::new(coordinator), proxy)?;
        }
        Command::Status => print_status(&coordinator, &cfg),
    }
    Ok(())
}

fn apply(coordinator: &SystemCoordinator, proxy: &ProxyConfig) -> anyhow::Result<ApplyReport> {
    coordinator
        .apply_with_report(proxy)
        .with_context(|| format!("cannot apply proxy {}", proxy.proxy_url()))
}

/// Restore any crashed session, apply, hold until shutdown, then reset.
fn run(coordinator: Arc<SystemCoordinator>, proxy: ProxyConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let c = coordinator.clone();
        let report = tokio::task::spawn_blocking(move || {
            c.restore_pending_snapshot();
            apply(&c, &proxy).map(|report| (proxy, report))
        })
        .await??;
        print_report(&report.0, &report.1);

        info!("proxy active; waiting for Ctrl+C or SIGTERM");
        let waited = shutdown_signal().await;

        let c = coordinator.clone();
        tokio::task::spawn_blocking(move || c.reset_system_proxy()).await?;
        info!("proxy settings restored");
        waited
    })
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

fn print_report(proxy: &ProxyConfig, report: &ApplyReport) {
    let names = |kinds: &[sysproxy_core::BackendKind]| {
        kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    };
    println!("proxy:     {}", proxy.proxy_url());
    println!("attempted: {}", names(&report.attempted));
    println!("succeeded: {}", names(&report.succeeded));
    if report.degraded() {
        println!("note: only environment variables were set; desktop stores rejected the change");
    }
}

fn print_status(coordinator: &SystemCoordinator, cfg: &Config) {
    println!("desktop:  {}", coordinator.desktop());
    println!("backends: {}", coordinator.selection());
    for (kind, available) in coordinator.availability() {
        let state = if available { "installed" } else { "missing" };
        println!("  {:<16} {}", kind.name(), state);
    }
    println!("snapshot: {}", system::snapshot_path(cfg).display());
    println!(
        "pending:  {}",
        if coordinator.has_pending_snapshot() { "yes" } else { "no" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_override_config_proxy() {
        let args = ProxyArgs {
            host: None,
            port: Some(9090),
            scheme: Some("socks5".into()),
            no_proxy: None,
        };
        let fallback = ProxyConfig::new("10.0.0.1", 8080, "http", "corp.local");
        let proxy = args.resolve(Some(&fallback)).unwrap();
        assert_eq!(proxy, ProxyConfig::new("10.0.0.1", 9090, "socks5", "corp.local"));
    }

    #[test]
    fn missing_host_is_an_error() {
        let args = ProxyArgs {
            host: None,
            port: Some(8080),
            scheme: None,
            no_proxy: None,
        };
        assert!(args.resolve(None).is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from([
            "sysproxy", "--log-level", "debug", "apply", "--host", "127.0.0.1", "--port", "1080",
            "--scheme", "socks5",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
                assert_eq!(args.port, Some(1080));
            }
            _ => panic!("expected apply"),
        }
        assert!(Cli::try_parse_from(["sysproxy", "restore-pending"]).is_ok());
    }

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
