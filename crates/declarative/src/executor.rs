//! Execution engine - reconciles every resource of a plan, one at a time
//!
//! Resources are processed strictly in plan order. There is no parallelism:
//! two entries may target the same environment and the wrapped package
//! managers do not coordinate concurrent writers.

use crate::context::{ApplyContext, NoProgress, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::reconcile::reconcile;
use crate::types::{ExecuteOptions, ExecuteSummary, Reconciled};

/// Result of executing a plan: per-resource results plus counts
#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    pub results: Vec<(String, Reconciled)>,
}

/// Execute a plan with the given options and progress callback
///
/// A failing resource never stops the plan; its failure is recorded and
/// the next resource is reconciled.
pub fn execute<P: ProgressCallback>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> ExecuteReport {
    let mut report = ExecuteReport::default();
    if plan.is_empty() {
        return report;
    }

    let ctx = ApplyContext::new(opts.dry_run);
    progress.on_plan_start(plan.len());

    for resource in plan.iter() {
        let id = resource.id();
        progress.on_resource_start(&id, &resource.description());
        let result = reconcile(resource.as_ref(), &ctx);
        progress.on_resource_complete(&id, &result);
        report.summary.add_result(&result);
        report.results.push((id, result));
    }

    progress.on_plan_complete();
    report
}

/// Simple execution without callbacks
pub fn execute_simple(plan: &ExecutionPlan, opts: &ExecuteOptions) -> ExecuteReport {
    execute(plan, opts, &mut NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::types::{Action, DesiredState, Message, ResourceState};
    use anyhow::{Result, bail};

    #[derive(Debug)]
    struct TestResource {
        id: String,
        installed: bool,
        broken: bool,
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self) -> Result<ResourceState> {
            if self.installed {
                Ok(ResourceState::Present { details: None })
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn desired_state(&self) -> DesiredState {
            DesiredState::Present
        }

        fn create(&self, _ctx: &ApplyContext) -> Result<Message> {
            if self.broken {
                bail!("install failed");
            }
            Ok(Message::text("installed"))
        }

        fn remove(&self, _ctx: &ApplyContext) -> Result<Message> {
            Ok(Message::text("removed"))
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: Vec<(String, Action)>,
    }

    impl ProgressCallback for Recorder {
        fn on_plan_start(&mut self, _count: usize) {}

        fn on_resource_start(&mut self, id: &str, _description: &str) {
            self.started.push(id.to_string());
        }

        fn on_resource_complete(&mut self, id: &str, result: &Reconciled) {
            self.completed.push((id.to_string(), result.action));
        }

        fn on_plan_complete(&mut self) {}
    }

    fn resource(id: &str, installed: bool, broken: bool) -> Box<dyn Resource> {
        Box::new(TestResource {
            id: id.into(),
            installed,
            broken,
        })
    }

    #[test]
    fn test_execute_empty_plan() {
        let report = execute_simple(&ExecutionPlan::new(), &ExecuteOptions::default());
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_execute_in_order_and_continue_after_failure() {
        let mut plan = ExecutionPlan::new();
        plan.push(resource("a", false, true));
        plan.push(resource("b", true, false));
        plan.push(resource("c", false, false));

        let mut recorder = Recorder::default();
        let report = execute(&plan, &ExecuteOptions::default(), &mut recorder);

        assert_eq!(recorder.started, vec!["a", "b", "c"]);
        assert_eq!(
            recorder.completed,
            vec![
                ("a".to_string(), Action::Create),
                ("b".to_string(), Action::None),
                ("c".to_string(), Action::Create),
            ]
        );
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.unchanged, 1);
        assert_eq!(report.summary.created, 1);
    }

    #[test]
    fn test_execute_dry_run_counts_planned_changes() {
        let mut plan = ExecutionPlan::new();
        plan.push(resource("a", false, true));

        let opts = ExecuteOptions { dry_run: true };
        let report = execute_simple(&plan, &opts);

        // The broken create never runs in check mode
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.failed, 0);
    }
}
