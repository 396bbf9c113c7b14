//! The reconciliation state machine
//!
//! `decide` is pure: it maps (current, desired) to an [`Action`].
//! `reconcile` wraps it with the precondition, the live probe, the
//! mutation call and the mapping to an [`Outcome`].

use crate::context::ApplyContext;
use crate::resource::Resource;
use crate::types::{Action, DesiredState, Message, Outcome, Reconciled, ResourceState};

/// Decide what has to happen to move `current` to `desired`
///
/// Returns `None` when the current state is unknown; nothing may be
/// mutated in that case.
pub fn decide(current: &ResourceState, desired: DesiredState) -> Option<Action> {
    match (current, desired) {
        (ResourceState::Unknown, _) => None,
        (ResourceState::Present { .. }, DesiredState::Present) => Some(Action::None),
        (ResourceState::Absent, DesiredState::Present) => Some(Action::Create),
        (ResourceState::Modified { .. }, DesiredState::Present) => Some(Action::Upgrade),
        (ResourceState::Absent, DesiredState::Absent) => Some(Action::None),
        (ResourceState::Present { .. } | ResourceState::Modified { .. }, DesiredState::Absent) => {
            Some(Action::Remove)
        }
    }
}

/// Reconcile one resource against its desired state
///
/// Runs at most one mutation. A mutation error is reported as a failed
/// outcome and never as a change, whatever the backend may have done.
pub fn reconcile(resource: &dyn Resource, ctx: &ApplyContext) -> Reconciled {
    let id = resource.id();

    if let Err(e) = resource.precondition() {
        log::info!("{id}: precondition failed: {e}");
        return failed(Action::None, &e);
    }

    let current = match resource.current_state() {
        Ok(state) => state,
        Err(e) => {
            log::info!("{id}: could not determine current state: {e}");
            return failed(Action::None, &e);
        }
    };
    let desired = resource.desired_state();

    let Some(action) = decide(&current, desired) else {
        return Reconciled {
            action: Action::None,
            outcome: Outcome::failed(format!("Could not determine the state of {id}")),
        };
    };
    log::info!("{id}: current={current:?} desired={desired} action={action:?}");

    if action == Action::None {
        let msg = match desired {
            DesiredState::Present => resource.present_message(),
            DesiredState::Absent => resource.absent_message(),
        };
        return Reconciled {
            action,
            outcome: Outcome::unchanged(msg),
        };
    }

    if ctx.dry_run {
        return Reconciled {
            action,
            outcome: Outcome::changed(format!("Would {} {}", action.verb(), resource.description())),
        };
    }

    let result = match (action, &current) {
        (Action::Upgrade, ResourceState::Modified { from, to }) => resource.upgrade(ctx, from, to),
        (Action::Remove, _) => resource.remove(ctx),
        _ => resource.create(ctx),
    };

    match result {
        Ok(msg) => Reconciled {
            action,
            outcome: Outcome::changed(msg),
        },
        Err(e) => failed(action, &e),
    }
}

fn failed(action: Action, error: &anyhow::Error) -> Reconciled {
    Reconciled {
        action,
        outcome: Outcome::failed(Message::Text(format!("{error:#}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use std::sync::Mutex;

    /// In-memory resource that records which mutations ran
    #[derive(Debug)]
    struct FakeResource {
        state: Mutex<ResourceState>,
        desired: DesiredState,
        fail_mutation: bool,
        fail_precondition: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeResource {
        fn new(state: ResourceState, desired: DesiredState) -> Self {
            Self {
                state: Mutex::new(state),
                desired,
                fail_mutation: false,
                fail_precondition: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn mutate(&self, call: &'static str, next: ResourceState) -> Result<Message> {
            self.calls.lock().unwrap().push(call);
            if self.fail_mutation {
                bail!("{call} exploded");
            }
            *self.state.lock().unwrap() = next;
            Ok(Message::text(format!("{call} ok")))
        }
    }

    impl Resource for FakeResource {
        fn id(&self) -> String {
            "fake".to_string()
        }

        fn description(&self) -> String {
            "fake resource".to_string()
        }

        fn resource_type(&self) -> &'static str {
            "fake"
        }

        fn precondition(&self) -> Result<()> {
            if self.fail_precondition {
                bail!("scope missing");
            }
            Ok(())
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(self.state.lock().unwrap().clone())
        }

        fn desired_state(&self) -> DesiredState {
            self.desired
        }

        fn create(&self, _ctx: &ApplyContext) -> Result<Message> {
            self.mutate("create", ResourceState::Present { details: None })
        }

        fn remove(&self, _ctx: &ApplyContext) -> Result<Message> {
            self.mutate("remove", ResourceState::Absent)
        }

        fn upgrade(&self, _ctx: &ApplyContext, _from: &str, _to: &str) -> Result<Message> {
            self.mutate("upgrade", ResourceState::Present { details: None })
        }
    }

    fn present() -> ResourceState {
        ResourceState::Present { details: None }
    }

    #[test]
    fn test_decide_table() {
        let modified = ResourceState::Modified {
            from: "1.2".into(),
            to: "1.3".into(),
        };
        assert_eq!(decide(&present(), DesiredState::Present), Some(Action::None));
        assert_eq!(decide(&ResourceState::Absent, DesiredState::Present), Some(Action::Create));
        assert_eq!(decide(&modified, DesiredState::Present), Some(Action::Upgrade));
        assert_eq!(decide(&ResourceState::Absent, DesiredState::Absent), Some(Action::None));
        assert_eq!(decide(&present(), DesiredState::Absent), Some(Action::Remove));
        assert_eq!(decide(&modified, DesiredState::Absent), Some(Action::Remove));
        assert_eq!(decide(&ResourceState::Unknown, DesiredState::Present), None);
    }

    #[test]
    fn test_present_is_idempotent() {
        let resource = FakeResource::new(ResourceState::Absent, DesiredState::Present);
        let ctx = ApplyContext::default();

        let first = reconcile(&resource, &ctx);
        assert_eq!(first.action, Action::Create);
        assert!(first.outcome.is_changed());

        let second = reconcile(&resource, &ctx);
        assert_eq!(second.action, Action::None);
        assert!(!second.outcome.is_changed());
        assert_eq!(resource.calls(), vec!["create"]);
    }

    #[test]
    fn test_absent_is_idempotent() {
        let resource = FakeResource::new(present(), DesiredState::Absent);
        let ctx = ApplyContext::default();

        assert!(reconcile(&resource, &ctx).outcome.is_changed());
        let second = reconcile(&resource, &ctx);
        assert!(!second.outcome.is_changed());
        assert_eq!(second.outcome.message().to_string(), "fake does not exist");
        assert_eq!(resource.calls(), vec!["remove"]);
    }

    #[test]
    fn test_failed_mutation_is_not_a_change() {
        let mut resource = FakeResource::new(ResourceState::Absent, DesiredState::Present);
        resource.fail_mutation = true;

        let result = reconcile(&resource, &ApplyContext::default());
        assert!(result.outcome.is_failed());
        assert!(!result.outcome.is_changed());
        assert_eq!(result.outcome.message().to_string(), "create exploded");
    }

    #[test]
    fn test_precondition_blocks_mutation() {
        let mut resource = FakeResource::new(ResourceState::Absent, DesiredState::Present);
        resource.fail_precondition = true;

        let result = reconcile(&resource, &ApplyContext::default());
        assert!(result.outcome.is_failed());
        assert!(resource.calls().is_empty());
    }

    #[test]
    fn test_dry_run_reports_without_mutating() {
        let resource = FakeResource::new(ResourceState::Absent, DesiredState::Present);
        let result = reconcile(&resource, &ApplyContext::new(true));

        assert_eq!(result.action, Action::Create);
        assert!(result.outcome.is_changed());
        assert_eq!(
            result.outcome.message().to_string(),
            "Would create fake resource"
        );
        assert!(resource.calls().is_empty());
    }

    #[test]
    fn test_upgrade_path() {
        let resource = FakeResource::new(
            ResourceState::Modified {
                from: "1.2".into(),
                to: "1.3".into(),
            },
            DesiredState::Present,
        );
        let result = reconcile(&resource, &ApplyContext::default());
        assert_eq!(result.action, Action::Upgrade);
        assert_eq!(resource.calls(), vec!["upgrade"]);
    }

    #[test]
    fn test_unknown_state_fails_without_mutation() {
        let resource = FakeResource::new(ResourceState::Unknown, DesiredState::Absent);
        let result = reconcile(&resource, &ApplyContext::default());
        assert!(result.outcome.is_failed());
        assert!(resource.calls().is_empty());
    }
}
