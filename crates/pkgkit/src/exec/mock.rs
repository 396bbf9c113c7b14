//! Scripted runner for tests.
//!
//! Responses are matched by argument prefix; the most recently registered
//! match wins, so a test can change what a listing returns between two
//! reconciliations. Every invocation is recorded.
//!
//! ```
//! use pkgkit::exec::mock::MockRunner;
//! use pkgkit::exec::RawOutput;
//!
//! let mock = MockRunner::new();
//! mock.on(&["env", "list", "--json"], RawOutput::ok(r#"{"envs": ["/opt/conda"]}"#));
//! assert!(mock.calls().is_empty());
//! ```

use super::{CommandRunner, RawOutput, RunOptions};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Process ran and produced this output
    Output(RawOutput),
    /// Process exceeded its timeout
    Timeout,
}

/// Runner that replays scripted responses.
#[derive(Debug, Default)]
pub struct MockRunner {
    replies: Mutex<Vec<(Vec<String>, MockReply)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    /// Create a runner with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to any invocation whose args start with `prefix`.
    pub fn on(&self, prefix: &[&str], output: RawOutput) {
        self.reply(prefix, MockReply::Output(output));
    }

    /// Register any reply for `prefix`.
    pub fn reply(&self, prefix: &[&str], reply: MockReply) {
        let prefix = prefix.iter().map(|s| (*s).to_string()).collect();
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((prefix, reply));
    }

    /// Every invocation's arguments, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any invocation started with `prefix`.
    pub fn ran(&self, prefix: &[&str]) -> bool {
        self.calls().iter().any(|call| starts_with(call, prefix))
    }

    /// Number of invocations starting with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|call| starts_with(call, prefix))
            .count()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &Path, args: &[String], opts: &RunOptions) -> Result<RawOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args.to_vec());

        let replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let reply = replies
            .iter()
            .rev()
            .find(|(prefix, _)| args.starts_with(prefix))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(MockReply::Output(output)) => Ok(output),
            Some(MockReply::Timeout) => Err(Error::Timeout {
                program: program.display().to_string(),
                after: opts.timeout,
            }),
            None => Ok(RawOutput::fail(
                127,
                "",
                format!("unexpected invocation: {}", args.join(" ")),
            )),
        }
    }
}

fn starts_with(call: &[String], prefix: &[&str]) -> bool {
    call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b)
}
