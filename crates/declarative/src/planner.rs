//! Execution planner - builds ordered resource execution plans

use crate::resource::BoxedResource;

/// An ordered execution plan
///
/// Resources are applied in insertion order. Post-apply actions run once,
/// after every resource, and only if a resource with
/// [`Resource::notifies`](crate::Resource::notifies) reported a change.
#[derive(Default)]
pub struct ExecutionPlan {
    /// Resources in apply order
    pub resources: Vec<BoxedResource>,
    /// Post-apply actions (e.g. services to reload)
    pub post_actions: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource to the plan
    pub fn add_resource(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Append every resource from an iterator, preserving order
    pub fn extend<I>(&mut self, resources: I)
    where
        I: IntoIterator<Item = BoxedResource>,
    {
        self.resources.extend(resources);
    }

    /// Register a post-apply action, ignoring duplicates by id
    pub fn add_post_action(&mut self, action: BoxedResource) {
        let id = action.id();
        if !self.post_actions.iter().any(|a| a.id() == id) {
            self.post_actions.push(action);
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Number of resources whose changes trigger post-apply actions
    pub fn notifying_resources(&self) -> usize {
        self.resources.iter().filter(|r| r.notifies()).count()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
