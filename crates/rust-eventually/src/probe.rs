//! Command-backed producers.
//!
//! A [`CommandProbe`] runs an external command on every poll attempt and
//! produces its stdout. The usual case is probing an HTTP endpoint with
//! curl:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rust_eventually::probe::CommandProbe;
//!
//! let probe = CommandProbe::curl("http://localhost:8080/health")
//!     .header("X-Request-Id", "abc")
//!     .timeout(Duration::from_secs(2));
//! ```

use std::ffi::OsString;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::trace;

use crate::error::TransportError;
use crate::poll::Producer;
use crate::util::TimeoutExt;

/// Default time a single probe invocation may take.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a command per attempt and produces its stdout.
///
/// Failures are transport errors and never abort a poll by themselves:
/// a command that cannot be spawned is [`Unreachable`], a non-zero exit is
/// [`Status`] carrying the exit code, and an invocation that outlives the
/// probe timeout is killed and reported as [`Timeout`].
///
/// [`Unreachable`]: crate::TransportErrorKind::Unreachable
/// [`Status`]: crate::TransportErrorKind::Status
/// [`Timeout`]: crate::TransportErrorKind::Timeout
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: OsString,
    args: Vec<OsString>,
    timeout: Duration,
}

impl CommandProbe {
    /// A probe running `program` with `args`.
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// A silent, failing-on-HTTP-error curl request for `url`.
    pub fn curl(url: impl Into<OsString>) -> Self {
        Self::new("curl", ["-sS", "--fail"]).arg(url)
    }

    /// Add a request header (`-H "name: value"`).
    #[must_use]
    pub fn header(self, name: &str, value: &str) -> Self {
        self.arg("-H").arg(format!("{name}: {value}"))
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set how long one invocation may run.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command once.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the command cannot be spawned, exits
    /// unsuccessfully or times out.
    pub async fn run(&self) -> Result<String, TransportError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            TransportError::unreachable(format!("{}: {e}", self.program.to_string_lossy()))
        })?;

        // Dropping the output future on timeout kills the child.
        let output = child
            .wait_with_output()
            .with_timeout(self.timeout)
            .await
            .map_err(|_| {
                TransportError::timeout(format!(
                    "{} did not finish within {:?}",
                    self.describe(),
                    self.timeout
                ))
            })??;

        trace!(command = %self.describe(), status = ?output.status, "probe finished");
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::status(code, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Producer for CommandProbe {
    type Output = String;

    fn produce(&mut self) -> impl Future<Output = Result<String, TransportError>> {
        let probe = self.clone();
        async move { probe.run().await }
    }
}
