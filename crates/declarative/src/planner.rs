//! Execution planner - ordered list of resources to reconcile

use crate::resource::{BoxedResource, Resource};

/// An ordered execution plan
#[derive(Default)]
pub struct ExecutionPlan {
    resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource; plan order is execution order
    pub fn push(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Iterate resources in execution order
    pub fn iter(&self) -> impl Iterator<Item = &BoxedResource> {
        self.resources.iter()
    }

    /// Number of resources in the plan
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Parse a target string like "type.name" into (type, name)
///
/// Only the first dot separates: package names such as "r.utils" stay whole.
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) => (Some(kind.to_string()), Some(name.to_string())),
    }
}

/// Check if a resource matches a target pattern ("type" or "type.name")
pub fn matches_target(resource: &dyn Resource, target: &str) -> bool {
    let (resource_type, name) = parse_target(target);
    matches_filter(resource, resource_type.as_deref(), name.as_deref())
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "conda" => resource.resource_type().starts_with("conda"),
            "envs" | "environments" => resource.resource_type() == "conda_env",
            "packages" | "pkgs" => resource.resource_type().ends_with("_pkg"),
            "cran" | "r" => resource.resource_type() == "cran_pkg",
            _ => resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
