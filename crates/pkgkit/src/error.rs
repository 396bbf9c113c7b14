//! Error types for package-manager reconciliation.
//!
//! Backend failures are tagged with a category recognised from the tool's
//! diagnostic text, so the user gets advice alongside the raw message.
//! Nothing in this crate retries on any category.

use std::time::Duration;
use thiserror::Error;

/// Categories of backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (download, mirror, TLS)
    Network,
    /// Package, channel or environment not found
    NotFound,
    /// Version or dependency conflict
    Conflict,
    /// Permission denied on the install prefix or library
    Permission,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    ///
    /// Informational only; see the module docs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Package or environment not found",
            Self::Conflict => "Package conflict",
            Self::Permission => "Permission denied",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection or mirror, then run again",
            Self::NotFound => "Verify the package name, version and channel or repository",
            Self::Conflict => "Relax the version pin or resolve the conflicting packages",
            Self::Permission => "Check permissions on the install prefix or library directory",
            Self::Other => "Check the error details for more information",
        }
    }

    /// Recognise a category from a tool's diagnostic text.
    ///
    /// Understands conda's exception names and R's usual messages.
    pub fn from_output(text: &str) -> Self {
        let lower = text.to_lowercase();

        if lower.contains("condahttperror")
            || lower.contains("could not resolve")
            || lower.contains("connection refused")
            || lower.contains("connectionerror")
            || lower.contains("timed out")
            || lower.contains("ssl")
            || lower.contains("cannot open url")
            || lower.contains("unable to access index")
        {
            return Self::Network;
        }

        if lower.contains("packagesnotfounderror")
            || lower.contains("environmentlocationnotfound")
            || lower.contains("packagenotinstallederror")
            || lower.contains("is not available")
            || lower.contains("there is no package called")
        {
            return Self::NotFound;
        }

        if lower.contains("unsatisfiableerror")
            || lower.contains("conflict")
            || lower.contains("incompatible")
        {
            return Self::Conflict;
        }

        if lower.contains("permission denied")
            || lower.contains("not writable")
            || lower.contains("eacces")
            || lower.contains("notwritableerror")
        {
            return Self::Permission;
        }

        Self::Other
    }
}

/// Errors that can occur while resolving, probing or mutating.
#[derive(Debug, Error)]
pub enum Error {
    /// No candidate location yielded an executable
    #[error("Unable to find the {tool} executable in: {}", candidates.join(","))]
    ExecutableNotFound {
        /// Tool that was looked for
        tool: String,
        /// Every candidate tried, in order
        candidates: Vec<String>,
    },

    /// A package operation named an environment that does not exist
    #[error("Environment {scope} does not exist")]
    ScopeNotFound {
        /// Name of the missing environment
        scope: String,
    },

    /// The tool exited non-zero
    #[error("{message}")]
    BackendFailure {
        /// Program that failed
        program: String,
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
        /// Best available diagnostic text
        message: String,
        /// Category recognised from the message
        category: ErrorCategory,
    },

    /// Structured output could not be decoded where it was required
    #[error("malformed {what} output: {detail}")]
    MalformedOutput {
        /// Which query produced it
        what: String,
        /// Decoder error
        detail: String,
    },

    /// The tool did not finish within the configured timeout
    #[error("{program} did not finish within {}s and was terminated", after.as_secs())]
    Timeout {
        /// Program that was killed
        program: String,
        /// Timeout that was exceeded
        after: Duration,
    },

    /// The caller cancelled the run
    #[error("{program} was cancelled and terminated")]
    Cancelled {
        /// Program that was killed
        program: String,
    },

    /// The tool could not be started
    #[error("failed to execute {program}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// R has no usable default CRAN mirror and none was given
    #[error("No default CRAN mirror set")]
    NoDefaultRepository,

    /// The request cannot be expressed for this backend
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Get the category of a backend failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::BackendFailure { category, .. } => *category,
            Error::ScopeNotFound { .. } | Error::ExecutableNotFound { .. } => {
                ErrorCategory::NotFound
            }
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this is a timeout, which callers must tell apart from
    /// a tool-reported failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Result type for package-manager operations.
pub type Result<T> = std::result::Result<T, Error>;
