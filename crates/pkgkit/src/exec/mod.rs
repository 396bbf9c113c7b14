//! Process invocation with a bounded wait.
//!
//! The [`CommandRunner`] trait is the only place a process is started, so
//! tests swap in [`mock::MockRunner`] and production uses [`SystemRunner`].
//! Every run carries [`RunOptions`]: a timeout and a [`CancelToken`]. On
//! either, the child is killed and a distinct error is returned.

pub mod mock;

use crate::error::{Error, Result};
use crate::types::ExecutableHandle;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Default wait for one tool invocation. Solving and downloading a large
/// environment can legitimately take minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit code and captured output of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl RawOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code, stdout and stderr.
    pub fn fail(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag. [`CancelToken::from_static`] links a token
/// to a process-wide flag set from a signal handler.
#[derive(Clone)]
pub struct CancelToken(Flag);

#[derive(Clone)]
enum Flag {
    Owned(Arc<AtomicBool>),
    Static(&'static AtomicBool),
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self(Flag::Owned(Arc::new(AtomicBool::new(false))))
    }

    /// A token backed by a static flag.
    pub fn from_static(flag: &'static AtomicBool) -> Self {
        Self(Flag::Static(flag))
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag().store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag().load(Ordering::SeqCst)
    }

    fn flag(&self) -> &AtomicBool {
        match &self.0 {
            Flag::Owned(flag) => flag.as_ref(),
            Flag::Static(flag) => *flag,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Per-invocation limits.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum wait before the child is killed
    pub timeout: Duration,
    /// Cancellation flag polled while waiting
    pub cancel: CancelToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cancel: CancelToken::new(),
        }
    }
}

/// Runs an external program to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, capturing output.
    ///
    /// A non-zero exit is not an error here; only failure to start,
    /// timeout and cancellation are.
    fn run(&self, program: &Path, args: &[String], opts: &RunOptions) -> Result<RawOutput>;
}

/// Runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String], opts: &RunOptions) -> Result<RawOutput> {
        let name = program.display().to_string();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: name.clone(),
                source,
            })?;

        // Drain both pipes while waiting so a chatty tool cannot block on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let started = Instant::now();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    terminate(&mut child);
                    return Err(Error::Spawn {
                        program: name,
                        source,
                    });
                }
            }

            if let Some(err) = over_limit(&name, started, opts) {
                terminate(&mut child);
                return Err(err);
            }

            thread::sleep(POLL_INTERVAL);
        };

        // A background descendant can keep the pipes open after the child exits
        Ok(RawOutput {
            exit_code: status.code(),
            stdout: collect(&stdout, &name, started, opts)?,
            stderr: collect(&stderr, &name, started, opts)?,
        })
    }
}

/// The error to stop with once the run is cancelled or out of time.
fn over_limit(name: &str, started: Instant, opts: &RunOptions) -> Option<Error> {
    if opts.cancel.is_cancelled() {
        log::warn!("Cancelling {name}");
        return Some(Error::Cancelled {
            program: name.to_string(),
        });
    }

    if started.elapsed() >= opts.timeout {
        log::warn!("{name} exceeded {}s, terminating", opts.timeout.as_secs());
        return Some(Error::Timeout {
            program: name.to_string(),
            after: opts.timeout,
        });
    }

    None
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut pipe) => {
            thread::spawn(move || {
                let mut buf = Vec::new();
                // A read error leaves whatever was read so far
                let _ = pipe.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}

fn collect(
    output: &Receiver<String>,
    name: &str,
    started: Instant,
    opts: &RunOptions,
) -> Result<String> {
    loop {
        match output.recv_timeout(POLL_INTERVAL) {
            Ok(text) => return Ok(text),
            Err(RecvTimeoutError::Disconnected) => return Ok(String::new()),
            Err(RecvTimeoutError::Timeout) => {}
        }
        if let Some(err) = over_limit(name, started, opts) {
            return Err(err);
        }
    }
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Execution context shared by every call in one reconciliation.
#[derive(Clone)]
pub struct ExecContext {
    runner: Arc<dyn CommandRunner>,
    options: RunOptions,
}

impl ExecContext {
    /// Context using real processes and default limits.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemRunner))
    }

    /// Context around any runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            options: RunOptions::default(),
        }
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Override the cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.options.cancel = cancel;
        self
    }

    /// Current limits.
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Bind to a resolved executable.
    pub fn session<'a>(&'a self, handle: &'a ExecutableHandle) -> Session<'a> {
        Session { handle, ctx: self }
    }
}

impl fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// An execution context bound to one executable.
#[derive(Debug, Clone, Copy)]
pub struct Session<'a> {
    handle: &'a ExecutableHandle,
    ctx: &'a ExecContext,
}

impl Session<'_> {
    /// Run with the given arguments; any exit code is returned as output.
    pub fn run(&self, args: &[String]) -> Result<RawOutput> {
        log::debug!("Running {} {}", self.handle.path.display(), args.join(" "));
        let output = self
            .ctx
            .runner
            .run(&self.handle.path, args, &self.ctx.options)?;
        log::trace!(
            "{} exited with {:?}\nstdout: {}\nstderr: {}",
            self.handle.program(),
            output.exit_code,
            output.stdout,
            output.stderr
        );
        Ok(output)
    }

    /// Run a read-only query; a non-zero exit becomes a backend failure.
    pub fn query(&self, args: &[String]) -> Result<RawOutput> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(crate::classify::failure(self.handle, &output));
        }
        Ok(output)
    }
}

/// Turn string literals into an owned argument vector.
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
