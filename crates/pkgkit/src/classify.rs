//! Classification of raw tool results.
//!
//! One rule for every backend and every operation:
//! - non-zero exit is a failure, whatever stdout claims;
//! - the message is decoded from the structured payload when possible and
//!   falls back to raw text when the tool did not emit well-formed output.

use crate::error::{Error, ErrorCategory, Result};
use crate::exec::RawOutput;
use crate::types::{Dialect, ExecutableHandle};
use declarative::Message;
use serde_json::Value;

/// Classify the result of a mutating command.
///
/// Success yields the message to report; failure yields
/// [`Error::BackendFailure`].
pub fn classify(handle: &ExecutableHandle, raw: &RawOutput) -> Result<Message> {
    if !raw.success() {
        return Err(failure(handle, raw));
    }
    Ok(success_message(handle.tool.dialect(), raw))
}

/// Build the failure for a non-zero exit.
pub fn failure(handle: &ExecutableHandle, raw: &RawOutput) -> Error {
    let message = failure_message(raw);
    Error::BackendFailure {
        program: handle.program().to_string(),
        exit_code: raw.exit_code,
        category: ErrorCategory::from_output(&message),
        message,
    }
}

/// Best available diagnostic text for a failed run.
///
/// Order: structured `message`, structured `error`, stderr, stdout.
pub fn failure_message(raw: &RawOutput) -> String {
    if let Some(message) = decode(&raw.stdout).as_ref().and_then(structured_message) {
        return message;
    }

    let stderr = raw.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }

    let stdout = raw.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }

    match raw.exit_code {
        Some(code) => format!("command exited with status {code}"),
        None => "command was terminated by a signal".to_string(),
    }
}

fn success_message(dialect: Dialect, raw: &RawOutput) -> Message {
    // R reports progress on stderr and often prints nothing on stdout
    let text = match raw.stdout.trim() {
        "" => raw.stderr.trim(),
        stdout => stdout,
    };
    match dialect {
        Dialect::Text => Message::text(text),
        Dialect::Json => match serde_json::from_str::<Value>(text) {
            Ok(value) => Message::Structured(value),
            Err(e) => {
                log::debug!("Structured output not decodable ({e}), reporting raw text");
                Message::text(text)
            }
        },
    }
}

fn decode(stdout: &str) -> Option<Value> {
    serde_json::from_str(stdout.trim()).ok()
}

fn structured_message(value: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
