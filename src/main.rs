//! demo-native-host: browser Native Messaging host for FACEIT demo installation
//!
//! The browser launches this binary and owns its stdin and stdout, so all
//! diagnostics go to a log file rather than the terminal.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use demo_native_host::config::{self, Config, ConfigStore};
use demo_native_host::native::{Dispatcher, NativeHost};
use demo_native_host::platform::{OsFileSystem, SystemClipboard};
use demo_native_host::steam::PathResolver;

/// Native messaging host that installs FACEIT demo downloads into Counter-Strike 2.
///
/// Started by the browser; not intended to be run by hand except for
/// debugging.
#[derive(Parser, Debug)]
#[command(name = "demo-native-host")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Caller identity passed by the browser (extension origin, or manifest path and extension id)
    #[arg(value_name = "CALLER")]
    caller: Vec<String>,

    /// Handle of the calling browser window (passed by Chrome on Windows)
    #[arg(long, value_name = "HANDLE")]
    parent_window: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Path to log file
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only log errors)
    #[arg(short, long)]
    quiet: bool,
}

/// How long shutdown waits for the blocking stdin reader before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "info" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialises the tracing subscriber for logging.
///
/// stdout carries protocol frames, so logs go to `log_path` and fall back to
/// stderr only if the file cannot be opened.
fn init_tracing(level: Level, log_path: Option<&Path>) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    let file = log_path.map(|path| (path, open_log_file(path)));
    match file {
        Some((_, Ok(file))) => builder.with_writer(Mutex::new(file)).init(),
        Some((path, Err(e))) => {
            builder.with_writer(std::io::stderr).init();
            warn!(path = %path.display(), error = %e, "Cannot open log file, logging to stderr");
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
}

/// Entry point for the native host.
fn main() -> ExitCode {
    let args = Args::parse();

    let store = match args.config.clone() {
        Some(path) => ConfigStore::new(path),
        None => match ConfigStore::default_location() {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    // Logging is configured from the file, so read it before tracing exists
    // and report any problem afterwards.
    let (cfg, config_error) = match store.read() {
        Ok(cfg) => (cfg.unwrap_or_default(), None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    let log_path = args
        .log_file
        .clone()
        .or_else(|| cfg.logging.file.clone())
        .or_else(config::default_log_path);
    init_tracing(log_level, log_path.as_deref());

    if let Some(e) = config_error {
        warn!(path = %store.path().display(), error = %e, "Ignoring unusable configuration file");
    }
    if !cfg.logging.is_known_level() {
        warn!(
            level = %cfg.logging.level,
            valid = ?config::LOG_LEVELS,
            "Unknown log level in configuration, using info"
        );
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        caller = ?args.caller,
        parent_window = ?args.parent_window,
        config = %store.path().display(),
        "Native host started"
    );

    let dispatcher = Dispatcher::new(
        PathResolver::with_platform_roots(store),
        Box::new(SystemClipboard::new()),
        Box::new(OsFileSystem),
    );
    let mut host = NativeHost::stdio(dispatcher);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(host.run_until_shutdown());

    // stdin is read on a blocking thread that only returns once the browser
    // closes the pipe; do not wait for it after a signal.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(()) => {
            info!("Native host shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Native host stopped on a framing error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn accepts_chrome_arguments() {
        let args = Args::try_parse_from([
            "demo-native-host",
            "chrome-extension://abcdefghijklmnop/",
            "--parent-window=1234",
        ])
        .unwrap();
        assert_eq!(args.caller, vec!["chrome-extension://abcdefghijklmnop/"]);
        assert_eq!(args.parent_window.as_deref(), Some("1234"));
    }

    #[test]
    fn accepts_firefox_arguments() {
        let args = Args::try_parse_from([
            "demo-native-host",
            "/home/user/.mozilla/native-messaging-hosts/faceit_demo_host.json",
            "faceit-demo@example.org",
        ])
        .unwrap();
        assert_eq!(args.caller.len(), 2);
    }

    #[test]
    fn log_level_from_flags_and_config() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "WARN"), Level::WARN);
        assert_eq!(get_log_level(0, false, "loud"), Level::INFO);
    }
}
