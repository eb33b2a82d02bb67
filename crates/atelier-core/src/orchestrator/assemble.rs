//! Assembly — merges per-task results into a dependency-ordered response.

use super::types::OverallStatus;
use crate::task::{TaskResult, TaskStatus};
use crate::Task;
use std::collections::{HashMap, VecDeque};

/// Task ids in dependency order: every task appears after all of its
/// dependencies. Ties follow plan declaration order, so the ordering is
/// deterministic for a given plan.
pub(crate) fn dependency_order(tasks: &[Task]) -> Vec<String> {
    let mut indegree: HashMap<&str, usize> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.depends_on.len()))
        .collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in tasks {
        for dep in &task.depends_on {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(task.id.as_str());
        }
    }

    // Seed in declaration order; FIFO keeps same-depth tasks declaration-ordered
    let mut queue: VecDeque<&str> = tasks
        .iter()
        .filter(|t| t.depends_on.is_empty())
        .map(|t| t.id.as_str())
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        for &dependent in dependents.get(id).map_or(&[][..], Vec::as_slice) {
            if let Some(d) = indegree.get_mut(dependent) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }
    order
}

/// Merge results into dependency order and classify the overall outcome.
pub(crate) fn assemble(
    tasks: &[Task],
    mut results: HashMap<String, TaskResult>,
) -> (OverallStatus, Vec<TaskResult>) {
    let mut ordered = Vec::with_capacity(tasks.len());
    for id in dependency_order(tasks) {
        if let Some(result) = results.remove(&id) {
            ordered.push(result);
        }
    }

    let succeeded = ordered
        .iter()
        .filter(|r| r.status == TaskStatus::Succeeded)
        .count();
    let status = if succeeded == ordered.len() && !ordered.is_empty() {
        OverallStatus::Succeeded
    } else if succeeded == 0 {
        OverallStatus::Failed
    } else {
        OverallStatus::Partial
    };
    (status, ordered)
}
