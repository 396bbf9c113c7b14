//! Core types for declarative resource reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target state declared by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Resource must exist
    #[default]
    Present,
    /// Resource must not exist
    Absent,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DesiredState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(format!("invalid state '{other}': expected present or absent")),
        }
    }
}

/// Current state of a resource as observed on the live system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists/is configured
    Present { details: Option<String> },
    /// Resource does not exist/is not configured
    Absent,
    /// Resource exists but differs from desired
    Modified { from: String, to: String },
    /// State cannot be determined
    Unknown,
}

impl ResourceState {
    /// Check if state represents presence (exact or modified)
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. } | Self::Modified { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Action chosen by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Already in the desired state
    None,
    /// Create or install the resource
    Create,
    /// Remove or uninstall the resource
    Remove,
    /// Move an existing resource to the desired version
    Upgrade,
}

impl Action {
    /// Verb used in check-mode messages ("would create ...")
    pub fn verb(&self) -> &'static str {
        match self {
            Self::None => "leave",
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Upgrade => "upgrade",
        }
    }
}

/// Human-readable or structured message attached to an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Free text
    Text(String),
    /// Decoded machine-readable payload from the backend tool
    Structured(serde_json::Value),
}

impl Message {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Text content, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(_) => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Normalized result of one reconciliation
///
/// Fields are private so that a failed outcome can never claim a change:
/// the only constructors are [`Outcome::unchanged`], [`Outcome::changed`]
/// and [`Outcome::failed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    failed: bool,
    changed: bool,
    msg: Message,
}

impl Outcome {
    /// Nothing needed doing
    pub fn unchanged(msg: impl Into<Message>) -> Self {
        Self {
            failed: false,
            changed: false,
            msg: msg.into(),
        }
    }

    /// A mutation ran and succeeded
    pub fn changed(msg: impl Into<Message>) -> Self {
        Self {
            failed: false,
            changed: true,
            msg: msg.into(),
        }
    }

    /// Something went wrong; never reported as a change
    pub fn failed(msg: impl Into<Message>) -> Self {
        Self {
            failed: true,
            changed: false,
            msg: msg.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn message(&self) -> &Message {
        &self.msg
    }

    pub fn into_message(self) -> Message {
        self.msg
    }
}

/// Decision plus the outcome it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub action: Action,
    pub outcome: Outcome,
}

/// Summary of a plan execution
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub upgraded: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.upgraded + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.unchanged + self.failed
    }

    /// Add a reconciliation result to the summary
    pub fn add_result(&mut self, result: &Reconciled) {
        if result.outcome.is_failed() {
            self.failed += 1;
            return;
        }
        if !result.outcome.is_changed() {
            self.unchanged += 1;
            return;
        }
        match result.action {
            Action::Create => self.created += 1,
            Action::Upgrade => self.upgraded += 1,
            Action::Remove => self.removed += 1,
            Action::None => self.unchanged += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Decide and report, but run no mutation
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_never_changed() {
        let outcome = Outcome::failed("boom");
        assert!(outcome.is_failed());
        assert!(!outcome.is_changed());
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = Outcome::changed(Message::Structured(serde_json::json!({"success": true})));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"failed": false, "changed": true, "msg": {"success": true}})
        );

        let text = serde_json::to_value(Outcome::unchanged("ok")).unwrap();
        assert_eq!(text["msg"], "ok");
    }

    #[test]
    fn test_desired_state_parse() {
        assert_eq!("present".parse::<DesiredState>(), Ok(DesiredState::Present));
        assert_eq!("Absent".parse::<DesiredState>(), Ok(DesiredState::Absent));
        assert!("latest".parse::<DesiredState>().is_err());
    }

    #[test]
    fn test_summary_counts_by_action() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&Reconciled {
            action: Action::Create,
            outcome: Outcome::changed("created"),
        });
        summary.add_result(&Reconciled {
            action: Action::Remove,
            outcome: Outcome::failed("nope"),
        });
        summary.add_result(&Reconciled {
            action: Action::None,
            outcome: Outcome::unchanged("exists"),
        });

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }
}
