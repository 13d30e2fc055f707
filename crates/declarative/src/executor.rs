//! Execution engine - applies resources in plan order and dispatches notifications

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;

/// Execute a plan with the given options and callbacks
///
/// Resources are applied sequentially in plan order. When at least one
/// resource that [`notifies`](Resource::notifies) reports a change, every
/// post-apply action runs exactly once after the last resource.
///
/// # Returns
/// Summary of execution results
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(&plan.resources);
    if diffs.is_empty() {
        log::debug!("no changes across {} resources", plan.total_resources());
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    let mut notify = false;

    progress.on_batch_start(plan.resources.len());
    for resource in &plan.resources {
        let result = run_resource(resource.as_ref(), &opts, progress);
        if result.is_change() && resource.notifies() {
            log::debug!("{} changed, scheduling notifications", resource.id());
            notify = true;
        }
        summary.add_result(&result);
    }
    progress.on_batch_complete();

    if notify && !plan.post_actions.is_empty() {
        progress.on_notify(plan.post_actions.len());
        for action in &plan.post_actions {
            let result = run_resource(action.as_ref(), &opts, progress);
            if !result.is_success() {
                summary.failed += 1;
            }
            summary.notified += 1;
        }
    }

    Ok(summary)
}

/// Apply one resource, converting errors into `ApplyResult::Failed`
fn run_resource<P: ProgressCallback>(
    resource: &dyn Resource,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> ApplyResult {
    progress.on_resource_start(&resource.id(), &resource.description());

    let mut ctx = ApplyContext::new(false, opts.verbose);
    let result = match resource.apply(&mut ctx) {
        Ok(result) => result,
        Err(e) => {
            log::error!("{}: {:#}", resource.id(), e);
            ApplyResult::Failed {
                error: format!("{:#}", e),
            }
        }
    };

    progress.on_resource_complete(&resource.id(), &result);
    result
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::types::ResourceState;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestResource {
        id: String,
        should_change: bool,
        notifies: bool,
    }

    impl TestResource {
        fn new(id: &str, should_change: bool, notifies: bool) -> Box<Self> {
            Box::new(Self {
                id: id.into(),
                should_change,
                notifies,
            })
        }
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
            if self.should_change {
                Ok(ResourceState::Absent)
            } else {
                Ok(ResourceState::Present { details: None })
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            if self.should_change {
                Ok(ApplyResult::Created)
            } else {
                Ok(ApplyResult::NoChange)
            }
        }

        fn notifies(&self) -> bool {
            self.notifies
        }
    }

    /// Post-apply action that counts how often it ran
    #[derive(Debug)]
    struct Counter(Arc<AtomicUsize>);

    impl Resource for Counter {
        fn id(&self) -> String {
            "counter".into()
        }

        fn description(&self) -> String {
            "Count notifications".into()
        }

        fn resource_type(&self) -> &'static str {
            "service"
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(ResourceState::Present { details: None })
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ApplyResult::Modified)
        }
    }

    fn plan_with_counter(resources: Vec<Box<TestResource>>) -> (ExecutionPlan, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        for r in resources {
            plan.add_resource(r);
        }
        plan.add_post_action(Box::new(Counter(Arc::clone(&hits))));
        (plan, hits)
    }

    #[test]
    fn test_execute_empty_plan() {
        let result = execute_simple(ExecutionPlan::new(), ExecuteOptions::default()).unwrap();
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let (plan, hits) = plan_with_counter(vec![TestResource::new("test1", false, true)]);
        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        // No diff means no execution
        assert_eq!(result.total(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn notifying_changes_run_post_actions_once() {
        let (plan, hits) = plan_with_counter(vec![
            TestResource::new("a-001", true, true),
            TestResource::new("a-700-ssl", true, true),
        ]);
        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        assert_eq!(result.created, 2);
        assert_eq!(result.notified, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn silent_changes_do_not_notify() {
        let (plan, hits) = plan_with_counter(vec![
            TestResource::new("a-001", false, true),
            TestResource::new("a-699", true, false),
        ]);
        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(result.notified, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dry_run_applies_nothing() {
        let (plan, hits) = plan_with_counter(vec![TestResource::new("a-001", true, true)]);
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute(plan, opts, &mut NoProgress, &mut AutoConfirm).unwrap();

        assert_eq!(result.total(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn declined_confirmation_skips_changes() {
        let (plan, hits) = plan_with_counter(vec![
            TestResource::new("a-001", true, true),
            TestResource::new("a-699", true, false),
        ]);
        let result =
            execute(plan, ExecuteOptions::default(), &mut NoProgress, &mut AutoDecline).unwrap();

        assert_eq!(result.skipped, 2);
        assert_eq!(result.total_changes(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
