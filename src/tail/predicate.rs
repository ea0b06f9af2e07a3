//! Stop predicates
//!
//! A stop predicate is called once per fetched page with that page's
//! entries and returns `true` to keep tailing. The helpers here cover the
//! common conditions and compose with [`both`].

use std::time::{Duration, Instant};

use tail_protocol::LogEntry;

/// Status reported by a running compute instance
pub const RUNNING_STATUS: &str = "RUNNING";

/// Instance status probe failure
#[derive(Debug, thiserror::Error)]
#[error("Instance probe failed: {0}")]
pub struct ProbeError(pub String);

/// External "is the instance still up" check.
///
/// Called synchronously from inside the predicate, so a slow probe
/// lengthens every tail cycle.
pub trait RunningProbe {
    /// Current instance status, e.g. `RUNNING` or `TERMINATED`
    fn status(&mut self) -> Result<String, ProbeError>;
}

impl<F> RunningProbe for F
where
    F: FnMut() -> Result<String, ProbeError>,
{
    fn status(&mut self) -> Result<String, ProbeError> {
        self()
    }
}

/// Probe that runs a shell command and reads the status from its stdout.
///
/// Intended for wrapping the provisioning tool's describe call, e.g.
/// `gcloud compute instances describe vm --zone z --format=value(status)`.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    command: String,
}

impl CommandProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl RunningProbe for CommandProbe {
    fn status(&mut self) -> Result<String, ProbeError> {
        use std::process::{Command, Stdio};

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ProbeError(format!("Failed to spawn status command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError(format!(
                "Status command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Keep tailing while `probe` reports `RUNNING`.
///
/// A probe failure counts as not running.
pub fn while_running<R: RunningProbe>(mut probe: R) -> impl FnMut(&[LogEntry]) -> bool {
    move |_entries: &[LogEntry]| match probe.status() {
        Ok(status) => {
            let running = status == RUNNING_STATUS;
            if !running {
                tracing::info!(status = %status, "Instance no longer running");
            }
            running
        }
        Err(e) => {
            tracing::warn!(error = %e, "Treating instance as stopped");
            false
        }
    }
}

/// Stop on the first page carrying a message that contains `needle`
pub fn until_message_contains(needle: impl Into<String>) -> impl FnMut(&[LogEntry]) -> bool {
    let needle = needle.into();
    move |entries: &[LogEntry]| {
        !entries
            .iter()
            .filter_map(LogEntry::message)
            .any(|m| m.contains(needle.as_str()))
    }
}

/// Stop once `timeout` has elapsed, counted from this call; until then
/// defer to `inner`.
///
/// `inner` is not consulted for the page that hits the deadline.
pub fn with_deadline<P>(timeout: Duration, mut inner: P) -> impl FnMut(&[LogEntry]) -> bool
where
    P: FnMut(&[LogEntry]) -> bool,
{
    let started = Instant::now();
    move |entries: &[LogEntry]| {
        if started.elapsed() >= timeout {
            tracing::info!(timeout_secs = timeout.as_secs(), "Tail deadline reached");
            return false;
        }
        inner(entries)
    }
}

/// Keep tailing while both predicates do.
///
/// Both are evaluated for every page so neither misses one.
pub fn both<A, B>(mut a: A, mut b: B) -> impl FnMut(&[LogEntry]) -> bool
where
    A: FnMut(&[LogEntry]) -> bool,
    B: FnMut(&[LogEntry]) -> bool,
{
    move |entries: &[LogEntry]| {
        let keep_a = a(entries);
        let keep_b = b(entries);
        keep_a && keep_b
    }
}
