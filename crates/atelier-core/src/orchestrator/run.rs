//! Scheduling — dependency-aware execution with global admission control.
//!
//! Readiness is re-evaluated whenever a task reaches a terminal status:
//! pending tasks whose dependencies all succeeded join the FIFO ready queue;
//! tasks with a failed or timed-out dependency fail immediately with
//! `UpstreamFailure` and never occupy the pool. Cache hits and coalesced
//! duplicates also bypass the pool.

use super::core::Orchestrator;
use crate::cache::fingerprint;
use crate::task::{Task, TaskError, TaskErrorKind, TaskResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Ready,
    Running,
    Done,
}

impl Orchestrator {
    /// Run a validated task list to completion and return results by task id.
    ///
    /// Per-task failures land in the returned map, never as an `Err`; every
    /// task in `tasks` has exactly one entry when this returns.
    pub(super) async fn execute_tasks(
        &self,
        tasks: &[Task],
        cancel: &CancellationToken,
    ) -> HashMap<String, TaskResult> {
        let order: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut state: HashMap<String, TaskState> = order
            .iter()
            .map(|id| (id.clone(), TaskState::Pending))
            .collect();
        let mut results: HashMap<String, TaskResult> = HashMap::new();
        let mut ready: VecDeque<String> = VecDeque::new();
        // fingerprint of each running invocation -> task ids waiting on it
        let mut inflight: HashMap<String, Vec<String>> = HashMap::new();
        let mut pool: JoinSet<(String, String, TaskResult)> = JoinSet::new();

        'scheduler: loop {
            promote(&order, &by_id, &mut state, &mut results, &mut ready);

            while pool.len() < self.config.max_concurrent_agents {
                let Some(task_id) = ready.pop_front() else { break };
                let task = by_id[task_id.as_str()];

                let spec = match self.registry.resolve(&task.category) {
                    Ok(spec) => spec,
                    // Validation checks categories up front, so this only
                    // fires when execute_tasks is driven directly
                    Err(e) => {
                        record(
                            &mut state,
                            &mut results,
                            &task_id,
                            TaskResult::failed(
                                task_id.clone(),
                                TaskError::new(TaskErrorKind::ModelUnavailable, e.to_string()),
                                0,
                            ),
                        );
                        continue 'scheduler;
                    }
                };

                let fp = fingerprint(&spec.name, &task.input);

                if let Some(cached) = self.cache.get(&fp) {
                    debug!(task_id = %task_id, "Cache hit");
                    record(
                        &mut state,
                        &mut results,
                        &task_id,
                        cached.for_task(task_id.clone()),
                    );
                    continue 'scheduler;
                }

                if let Some(waiters) = inflight.get_mut(&fp) {
                    debug!(task_id = %task_id, "Coalescing onto in-flight invocation");
                    waiters.push(task_id.clone());
                    state.insert(task_id, TaskState::Running);
                    continue;
                }

                let Some(agent) = self.agents.get(&spec.name) else {
                    record(
                        &mut state,
                        &mut results,
                        &task_id,
                        TaskResult::failed(
                            task_id.clone(),
                            TaskError::new(
                                TaskErrorKind::ModelUnavailable,
                                format!("no runtime instance for agent '{}'", spec.name),
                            ),
                            0,
                        ),
                    );
                    continue 'scheduler;
                };

                debug!(task_id = %task_id, agent = %spec.name, "Dispatching task");
                state.insert(task_id.clone(), TaskState::Running);
                inflight.insert(fp.clone(), Vec::new());

                let agent = Arc::clone(agent);
                let task = task.clone();
                let deadline = task
                    .deadline_ms
                    .map_or(self.config.agent_timeout, Duration::from_millis);
                let cancel = cancel.clone();
                pool.spawn(async move {
                    let start = Instant::now();
                    let result = tokio::select! {
                        () = cancel.cancelled() => TaskResult::failed(
                            task.id.clone(),
                            TaskError::new(TaskErrorKind::Cancelled, "request cancelled"),
                            start.elapsed().as_millis() as u64,
                        ),
                        outcome = tokio::time::timeout(deadline, agent.invoke(&task)) => {
                            match outcome {
                                Err(_) => TaskResult::timed_out(
                                    task.id.clone(),
                                    deadline.as_millis() as u64,
                                ),
                                Ok(Ok(result)) => result,
                                Ok(Err(error)) => TaskResult::failed(
                                    task.id.clone(),
                                    error,
                                    start.elapsed().as_millis() as u64,
                                ),
                            }
                        }
                    };
                    (task.id.clone(), fp, result)
                });
            }

            if results.len() == order.len() {
                break;
            }

            let Some(joined) = pool.join_next().await else {
                // Nothing running and nothing ready, but tasks remain.
                // Bookkeeping bug guard: fail the remainder rather than hang.
                warn!("Scheduler stalled with incomplete tasks");
                for id in &order {
                    if !results.contains_key(id) {
                        record(
                            &mut state,
                            &mut results,
                            id,
                            TaskResult::failed(
                                id.clone(),
                                TaskError::new(
                                    TaskErrorKind::UpstreamFailure,
                                    "scheduler stalled before this task could run",
                                ),
                                0,
                            ),
                        );
                    }
                }
                break;
            };

            match joined {
                Ok((task_id, fp, result)) => {
                    if result.status.is_success() {
                        self.cache.put(fp.clone(), result.clone(), self.config.cache_ttl);
                    }
                    if let Some(waiters) = inflight.remove(&fp) {
                        for waiter in waiters {
                            let replicated = result.for_task(waiter.clone());
                            record(&mut state, &mut results, &waiter, replicated);
                        }
                    }
                    record(&mut state, &mut results, &task_id, result);
                }
                Err(e) => {
                    // A panicked worker loses its task id; the stall guard
                    // above settles whatever it left behind.
                    warn!(error = %e, "Agent worker panicked");
                }
            }
        }

        results
    }
}

fn record(
    state: &mut HashMap<String, TaskState>,
    results: &mut HashMap<String, TaskResult>,
    task_id: &str,
    result: TaskResult,
) {
    state.insert(task_id.to_string(), TaskState::Done);
    results.insert(task_id.to_string(), result);
}

/// Move pending tasks whose dependencies settled: to the ready queue when all
/// dependencies succeeded, to a terminal `UpstreamFailure` otherwise.
fn promote(
    order: &[String],
    by_id: &HashMap<&str, &Task>,
    state: &mut HashMap<String, TaskState>,
    results: &mut HashMap<String, TaskResult>,
    ready: &mut VecDeque<String>,
) {
    loop {
        let mut changed = false;
        for id in order {
            if state.get(id) != Some(&TaskState::Pending) {
                continue;
            }
            let task = by_id[id.as_str()];

            let all_settled = task
                .depends_on
                .iter()
                .all(|dep| state.get(dep.as_str()) == Some(&TaskState::Done));
            if !all_settled {
                continue;
            }

            let failed_dep = task.depends_on.iter().find(|dep| {
                results
                    .get(dep.as_str())
                    .map_or(true, |r| !r.status.is_success())
            });
            match failed_dep {
                Some(dep) => {
                    debug!(task_id = %id, dependency = %dep, "Failing task on upstream failure");
                    record(
                        state,
                        results,
                        id,
                        TaskResult::failed(
                            id.clone(),
                            TaskError::new(
                                TaskErrorKind::UpstreamFailure,
                                format!("dependency '{dep}' did not succeed"),
                            ),
                            0,
                        ),
                    );
                }
                None => {
                    state.insert(id.clone(), TaskState::Ready);
                    ready.push_back(id.clone());
                }
            }
            changed = true;
        }
        if !changed {
            break;
        }
    }
}
