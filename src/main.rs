//! instance-tail CLI
//!
//! Entry point for the `instance-tail` command-line tool.

use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use instance_tail::config::{CliOverrides, FileConfig, Settings};
use instance_tail::query::{read_recent, AccessToken, HttpQueryClient, QueryError};
use instance_tail::signal::{SignalHandler, SignalState, EXIT_CODE_CANCELLED};
use instance_tail::tail::filter::{container_log_filter, log_name, project_scope};
use instance_tail::tail::predicate::{both, until_message_contains, while_running, with_deadline, CommandProbe};
use instance_tail::tail::{Cursor, TailerBuilder};
use instance_tail::{logging, LogEntry, MonitoredResource};

/// Environment variable holding the access token
const TOKEN_ENV: &str = "INSTANCE_TAIL_ACCESS_TOKEN";

/// Exit code for configuration and usage errors
const EXIT_CODE_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "instance-tail")]
#[command(about = "Tail the logs of a run-once compute instance", version)]
struct Cli {
    /// Path to config file (default: ~/.config/instance-tail/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Log filter directive, e.g. `warn` or `instance_tail=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override the logging API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Access token (default: $INSTANCE_TAIL_ACCESS_TOKEN)
    #[arg(long, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Selection {
    /// Project whose logs are searched
    #[arg(long, short = 'p')]
    project: String,

    #[command(flatten)]
    target: Target,
}

/// What to read within the project. Optional for `read`.
#[derive(Args)]
#[group(multiple = false)]
struct Target {
    /// Select the container output of this instance
    #[arg(long)]
    instance_id: Option<String>,

    /// Raw filter expression
    #[arg(long)]
    filter: Option<String>,
}

/// Like [`Selection`], but one of `--instance-id` or `--filter` is required
#[derive(Args)]
struct TailSelection {
    /// Project whose logs are searched
    #[arg(long, short = 'p')]
    project: String,

    #[command(flatten)]
    target: RequiredTarget,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct RequiredTarget {
    /// Select the container output of this instance
    #[arg(long)]
    instance_id: Option<String>,

    /// Raw filter expression
    #[arg(long)]
    filter: Option<String>,
}

fn target_filter(project: &str, instance_id: Option<&str>, filter: Option<&str>) -> Option<String> {
    match (instance_id, filter) {
        (Some(id), _) => Some(container_log_filter(project, id)),
        (None, Some(f)) => Some(f.to_string()),
        (None, None) => None,
    }
}

impl Selection {
    fn filter(&self) -> Option<String> {
        target_filter(
            &self.project,
            self.target.instance_id.as_deref(),
            self.target.filter.as_deref(),
        )
    }
}

impl TailSelection {
    fn filter(&self) -> Option<String> {
        target_filter(
            &self.project,
            self.target.instance_id.as_deref(),
            self.target.filter.as_deref(),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Follow new log entries until a stop condition is met
    Tail {
        #[command(flatten)]
        selection: TailSelection,

        /// Only entries after this RFC 3339 instant (default: now)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Stop after the page containing a message with this text
        #[arg(long)]
        until_message: Option<String>,

        /// Stop after this many seconds
        #[arg(long)]
        max_seconds: Option<u64>,

        /// Shell command printing the instance status; stop once it is not RUNNING
        #[arg(long)]
        status_command: Option<String>,

        /// Print each entry as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Print the most recent entries, newest first
    Read {
        #[command(flatten)]
        selection: Selection,

        /// Number of entries
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: u32,

        /// Print each entry as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Write a single entry to a log
    Write {
        /// Project to write to
        #[arg(long, short = 'p')]
        project: String,

        /// Log id, e.g. `smoke-test`
        #[arg(long)]
        log_name: String,

        /// Message text
        #[arg(long)]
        message: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(EXIT_CODE_CONFIG);
        }
    };

    logging::init(cli.debug, &settings.log_level);

    let token = match resolve_token(cli.access_token.clone()) {
        Some(t) => t,
        None => {
            eprintln!("No access token: pass --access-token or set {}", TOKEN_ENV);
            process::exit(EXIT_CODE_CONFIG);
        }
    };

    let client = match HttpQueryClient::new(settings.http_config()) {
        Ok(c) => c,
        Err(e) => exit_with(e),
    };

    match cli.command {
        Commands::Tail {
            selection,
            from,
            until_message,
            max_seconds,
            status_command,
            json,
        } => {
            let stop = TailStop {
                until_message,
                max_seconds,
                status_command,
            };
            run_tail(client, token, selection, from, stop, json);
        }
        Commands::Read {
            selection,
            limit,
            json,
        } => {
            run_read(&client, token, selection, limit, json);
        }
        Commands::Write {
            project,
            log_name: log_id,
            message,
        } => {
            run_write(&client, token, &project, &log_id, message);
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, instance_tail::ConfigError> {
    let file = FileConfig::discover(cli.config.as_deref())?;
    let overrides = CliOverrides {
        endpoint: cli.endpoint.clone(),
        log_level: cli.log_level.clone(),
    };
    Settings::resolve(file, &overrides)
}

fn resolve_token(flag: Option<String>) -> Option<AccessToken> {
    flag.or_else(|| std::env::var(TOKEN_ENV).ok())
        .filter(|t| !t.trim().is_empty())
        .map(|t| AccessToken::new(t.trim()))
}

fn exit_with(e: QueryError) -> ! {
    eprintln!("Error: {}", e);
    process::exit(e.exit_code());
}

/// Stop conditions requested on the command line
struct TailStop {
    until_message: Option<String>,
    max_seconds: Option<u64>,
    status_command: Option<String>,
}

impl TailStop {
    /// Combine the requested conditions with the Ctrl-C check
    fn into_predicate(self, signals: Arc<SignalState>) -> impl FnMut(&[LogEntry]) -> bool {
        let mut by_message = self.until_message.map(|m| until_message_contains(m));
        let mut by_status = self
            .status_command
            .map(|cmd| while_running(CommandProbe::new(cmd)));
        let timeout = self.max_seconds.map_or(Duration::MAX, Duration::from_secs);

        let optional = move |entries: &[LogEntry]| {
            let keep_message = by_message.as_mut().map_or(true, |p| p(entries));
            let keep_status = by_status.as_mut().map_or(true, |p| p(entries));
            keep_message && keep_status
        };

        with_deadline(
            timeout,
            both(optional, move |_: &[LogEntry]| !signals.is_cancel_requested()),
        )
    }
}

fn run_tail(
    client: HttpQueryClient,
    token: AccessToken,
    selection: TailSelection,
    from: Option<DateTime<Utc>>,
    stop: TailStop,
    json: bool,
) {
    let signals = SignalHandler::new();
    if let Err(e) = signals.install() {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }
    let state = signals.state();

    let cursor = from.map(Cursor::starting_at).unwrap_or_else(Cursor::now);
    let tailer = TailerBuilder::new(client, vec![project_scope(&selection.project)], token)
        .maybe_filter(selection.filter())
        .cursor(cursor)
        .build(stop.into_predicate(Arc::clone(&state)));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for item in tailer {
        match item {
            Ok(entry) => {
                if print_entry(&mut out, &entry, json).is_err() {
                    // Downstream closed (e.g. piped into head).
                    return;
                }
            }
            Err(e) => exit_with(e),
        }
        if state.is_cancel_requested() {
            break;
        }
    }

    let _ = out.flush();
    if state.is_cancel_requested() {
        process::exit(EXIT_CODE_CANCELLED);
    }
    eprintln!("Tail ended");
}

fn run_read(client: &HttpQueryClient, token: AccessToken, selection: Selection, limit: u32, json: bool) {
    let entries = match read_recent(
        client,
        vec![project_scope(&selection.project)],
        selection.filter(),
        limit,
        &token,
    ) {
        Ok(entries) => entries,
        Err(e) => exit_with(e),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for entry in &entries {
        if print_entry(&mut out, entry, json).is_err() {
            return;
        }
    }
    let _ = out.flush();
}

fn run_write(client: &HttpQueryClient, token: AccessToken, project: &str, log_id: &str, message: String) {
    let entry = LogEntry::with_message(
        log_name(project, log_id),
        MonitoredResource::global(),
        message,
        Utc::now(),
    );

    if let Err(e) = client.write_entries(vec![entry], &token) {
        exit_with(e);
    }
    println!("Wrote 1 entry to {}", log_name(project, log_id));
}

fn print_entry(out: &mut impl Write, entry: &LogEntry, json: bool) -> std::io::Result<()> {
    if json {
        let line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(out, "{}", line)
    } else if let Some(message) = entry.message() {
        // Container output already carries its own newlines.
        write!(out, "{}", message)?;
        out.flush()
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("instance-tail").chain(args.iter().copied()))
    }

    #[test]
    fn test_tail_requires_instance_or_filter() {
        assert!(parse(&["tail", "-p", "demo"]).is_err());
        assert!(parse(&["tail", "-p", "demo", "--instance-id", "1", "--filter", "x"]).is_err());

        let cli = parse(&["tail", "-p", "demo", "--instance-id", "42"]).unwrap();
        match cli.command {
            Commands::Tail { selection, .. } => {
                let filter = selection.filter().unwrap();
                assert!(filter.ends_with("resource.labels.instance_id=42"), "{}", filter);
            }
            _ => panic!("expected tail"),
        }
    }

    #[test]
    fn test_read_target_optional() {
        let cli = parse(&["read", "-p", "demo"]).unwrap();
        match cli.command {
            Commands::Read { selection, limit, .. } => {
                assert_eq!(selection.filter(), None);
                assert_eq!(limit, 10);
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_tail_has_no_cadence_flags() {
        assert!(parse(&["tail", "-p", "demo", "--filter", "x", "--poll-interval-ms", "5"]).is_err());
    }

    #[test]
    fn test_log_level_flag_reaches_settings() {
        let cli = parse(&["--log-level", "warn", "read", "-p", "d"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("warn"));

        let overrides = CliOverrides {
            endpoint: cli.endpoint.clone(),
            log_level: cli.log_level.clone(),
        };
        let settings = Settings::resolve(None, &overrides).unwrap();
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_deadline_stops_combined_predicate() {
        let stop = TailStop {
            until_message: None,
            max_seconds: Some(0),
            status_command: None,
        };
        let mut keep = stop.into_predicate(Arc::new(SignalState::new()));
        assert!(!keep(&[]));
    }

    #[test]
    fn test_cancel_stops_combined_predicate() {
        let signals = Arc::new(SignalState::new());
        let stop = TailStop {
            until_message: None,
            max_seconds: None,
            status_command: None,
        };
        let mut keep = stop.into_predicate(Arc::clone(&signals));
        assert!(keep(&[]));

        signals.handle_signal();
        assert!(!keep(&[]));
    }
}
