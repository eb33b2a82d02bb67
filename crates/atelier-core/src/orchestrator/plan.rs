//! Decomposition — turns an instruction into a validated task list.
//!
//! Three strategies, tried in order:
//! 1. Intent templates: keyword-triggered, pre-declared task lists for
//!    recurring request shapes. Deterministic, no model call.
//! 2. Coordination model: the instruction plus the agent roster go to the
//!    coordinating model, which answers with a JSON plan.
//! 3. Passthrough: a single task in the default category.
//!
//! Every produced plan passes the same validation regardless of strategy.

use crate::error::{Error, Result};
use crate::registry::AgentRegistry;
use crate::task::Task;
use atelier_llm::{ModelClient, ModelRequest};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One task within an intent template. `{instruction}` in the input expands
/// to the original request text.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskTemplate {
    /// Task id, unique within the template
    pub id: String,
    /// Category used to resolve the serving agent
    pub category: String,
    /// Input payload, may contain the `{instruction}` placeholder
    pub input: String,
    /// Ids of template tasks that must complete first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A keyword-triggered decomposition for a recurring request shape.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentTemplate {
    /// Template name, for logs
    pub name: String,
    /// Case-insensitive substrings; any match selects the template
    pub triggers: Vec<String>,
    /// Tasks the template expands to
    pub tasks: Vec<TaskTemplate>,
}

impl IntentTemplate {
    fn matches(&self, instruction: &str) -> bool {
        let lowered = instruction.to_lowercase();
        self.triggers
            .iter()
            .any(|t| lowered.contains(&t.to_lowercase()))
    }

    fn expand(&self, instruction: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .map(|t| Task {
                id: t.id.clone(),
                category: t.category.clone(),
                input: t.input.replace("{instruction}", instruction),
                depends_on: t.depends_on.clone(),
                deadline_ms: None,
            })
            .collect()
    }
}

/// A validated decomposition, ready to schedule.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Tasks in declaration order
    pub tasks: Vec<Task>,
    /// Coordinator's one-line summary, when the coordination model planned
    pub summary: Option<String>,
}

/// Task shape the coordination model answers with.
#[derive(Debug, Deserialize)]
struct TaskDescriptor {
    id: String,
    category: String,
    input: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    deadline_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CoordinatorPlan {
    #[serde(default)]
    coordination_plan: String,
    tasks: Vec<TaskDescriptor>,
}

const COORDINATOR_SYSTEM_PROMPT: &str = "\
You coordinate specialist design-automation agents. Decompose the user's \
request into tasks for the agents listed below. Answer with JSON only, no \
prose, in this shape:\n\
{\"coordination_plan\": \"<one line>\", \"tasks\": [{\"id\": \"t1\", \
\"category\": \"<capability tag>\", \"input\": \"<task payload>\", \
\"depends_on\": []}]}\n\
Use only the listed capability tags. Express ordering with depends_on. \
Prefer independent tasks so they can run concurrently.";

/// Produces task lists from instructions.
pub struct Planner {
    templates: Vec<IntentTemplate>,
    coordinator: Option<Arc<dyn ModelClient>>,
    default_category: String,
}

impl Planner {
    /// Create a planner with no templates and no coordination model
    #[must_use]
    pub fn new(default_category: impl Into<String>) -> Self {
        Self {
            templates: Vec::new(),
            coordinator: None,
            default_category: default_category.into(),
        }
    }

    /// Add intent templates, matched in declaration order
    #[must_use]
    pub fn with_templates(mut self, templates: Vec<IntentTemplate>) -> Self {
        self.templates.extend(templates);
        self
    }

    /// Set the coordination model
    #[must_use]
    pub fn with_coordinator(mut self, coordinator: Arc<dyn ModelClient>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Decompose an instruction into a validated plan.
    #[instrument(skip(self, registry), fields(instruction_len = instruction.len()))]
    pub async fn plan(&self, instruction: &str, registry: &AgentRegistry) -> Result<Plan> {
        if let Some(template) = self.templates.iter().find(|t| t.matches(instruction)) {
            debug!(template = %template.name, "Intent template matched");
            let tasks = template.expand(instruction);
            validate_tasks(&tasks, registry)?;
            return Ok(Plan {
                tasks,
                summary: None,
            });
        }

        if let Some(coordinator) = &self.coordinator {
            return self.plan_with_coordinator(coordinator, instruction, registry).await;
        }

        debug!("No template or coordinator; passthrough task");
        let tasks = vec![Task::new("t1", self.default_category.clone(), instruction)];
        validate_tasks(&tasks, registry)?;
        Ok(Plan {
            tasks,
            summary: None,
        })
    }

    async fn plan_with_coordinator(
        &self,
        coordinator: &Arc<dyn ModelClient>,
        instruction: &str,
        registry: &AgentRegistry,
    ) -> Result<Plan> {
        let prompt = format!(
            "Available agents:\n{}\nRequest:\n{}",
            roster(registry),
            instruction
        );
        let request =
            ModelRequest::new(prompt).with_system(COORDINATOR_SYSTEM_PROMPT.to_string());

        let response = coordinator
            .complete(request)
            .await
            .map_err(|e| Error::Coordinator(e.to_string()))?;

        let json = extract_json(&response.text).ok_or_else(|| {
            warn!("Coordinator answered without a JSON object");
            Error::InvalidPlan("coordinator answer contains no JSON object".to_string())
        })?;
        let parsed: CoordinatorPlan = serde_json::from_str(json)
            .map_err(|e| Error::InvalidPlan(format!("malformed coordinator plan: {e}")))?;

        let tasks: Vec<Task> = parsed
            .tasks
            .into_iter()
            .map(|t| Task {
                id: t.id,
                category: t.category,
                input: t.input,
                depends_on: t.depends_on,
                deadline_ms: t.deadline_ms,
            })
            .collect();
        validate_tasks(&tasks, registry)?;

        debug!(tasks = tasks.len(), "Coordinator produced a plan");
        let summary = if parsed.coordination_plan.is_empty() {
            None
        } else {
            Some(parsed.coordination_plan)
        };
        Ok(Plan { tasks, summary })
    }
}

/// Validate a task list: ids unique and non-empty, inputs non-empty, every
/// category resolvable, dependencies known, and the graph acyclic.
pub(crate) fn validate_tasks(tasks: &[Task], registry: &AgentRegistry) -> Result<()> {
    if tasks.is_empty() {
        return Err(Error::InvalidPlan("plan contains no tasks".to_string()));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        if task.id.is_empty() {
            return Err(Error::InvalidPlan("task with empty id".to_string()));
        }
        if !ids.insert(task.id.as_str()) {
            return Err(Error::InvalidPlan(format!("duplicate task id '{}'", task.id)));
        }
        if task.input.is_empty() {
            return Err(Error::InvalidPlan(format!("task '{}' has empty input", task.id)));
        }
        registry.resolve(&task.category)?;
    }

    for task in tasks {
        for dep in &task.depends_on {
            if dep == &task.id {
                return Err(Error::InvalidPlan(format!(
                    "task '{}' depends on itself",
                    task.id
                )));
            }
            if !ids.contains(dep.as_str()) {
                return Err(Error::InvalidPlan(format!(
                    "task '{}' depends on unknown task '{dep}'",
                    task.id
                )));
            }
        }
    }

    if is_cyclic(tasks) {
        return Err(Error::InvalidPlan("dependency cycle".to_string()));
    }
    Ok(())
}

fn is_cyclic(tasks: &[Task]) -> bool {
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

    let mut queue: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        for &dependent in dependents.get(id).map_or(&[][..], Vec::as_slice) {
            if let Some(d) = indegree.get_mut(dependent) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }
    visited != tasks.len()
}

/// Roster of registered agents, one line per agent, for the coordinator.
fn roster(registry: &AgentRegistry) -> String {
    let mut lines = String::new();
    for spec in registry.iter() {
        lines.push_str(&format!(
            "- {} (capabilities: {}){}\n",
            spec.name,
            spec.capabilities.join(", "),
            if spec.description.is_empty() {
                String::new()
            } else {
                format!(": {}", spec.description)
            }
        ));
    }
    lines
}

/// First balanced-looking JSON object in a model answer. Coordinators often
/// wrap the object in prose or code fences.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AgentSpec, ModelKind, ModelRef};
    use atelier_llm::ModelResponse;

    fn local_model() -> ModelRef {
        ModelRef {
            kind: ModelKind::Local,
            endpoint: "http://localhost:1234".to_string(),
            model: "llama3.2".to_string(),
            context_window: 8192,
        }
    }

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        registry
            .register(
                AgentSpec::new("api_expert", local_model())
                    .with_capability("code_generation")
                    .with_capability("general"),
            )
            .unwrap();
        registry
            .register(
                AgentSpec::new("standards", local_model())
                    .with_capability("standards_check")
                    .with_retrieval(true),
            )
            .unwrap();
        registry
    }

    /// Answers every completion with a fixed string.
    struct FixedClient(String);

    #[async_trait::async_trait]
    impl ModelClient for FixedClient {
        fn name(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed-model"
        }
        fn context_window(&self) -> u32 {
            200_000
        }
        async fn complete(
            &self,
            _request: ModelRequest,
        ) -> atelier_llm::Result<ModelResponse> {
            Ok(ModelResponse {
                text: self.0.clone(),
                model: "fixed-model".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_passthrough_plan() {
        let planner = Planner::new("general");
        let plan = planner.plan("place three walls", &registry()).await.unwrap();

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].category, "general");
        assert_eq!(plan.tasks[0].input, "place three walls");
    }

    #[tokio::test]
    async fn test_template_expands_instruction() {
        let template = IntentTemplate {
            name: "compliant_generation".to_string(),
            triggers: vec!["compliant".to_string()],
            tasks: vec![
                TaskTemplate {
                    id: "check".to_string(),
                    category: "standards_check".to_string(),
                    input: "Check standards for: {instruction}".to_string(),
                    depends_on: vec![],
                },
                TaskTemplate {
                    id: "generate".to_string(),
                    category: "code_generation".to_string(),
                    input: "{instruction}".to_string(),
                    depends_on: vec!["check".to_string()],
                },
            ],
        };
        let planner = Planner::new("general").with_templates(vec![template]);

        let plan = planner
            .plan("make a compliant duct layout", &registry())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(
            plan.tasks[0].input,
            "Check standards for: make a compliant duct layout"
        );
        assert_eq!(plan.tasks[1].depends_on, vec!["check".to_string()]);
    }

    #[tokio::test]
    async fn test_coordinator_plan_parsed_from_fenced_json() {
        let answer = "Here is the plan:\n```json\n{\"coordination_plan\": \
                      \"check then generate\", \"tasks\": [{\"id\": \"t1\", \
                      \"category\": \"standards_check\", \"input\": \"check ducts\"}, \
                      {\"id\": \"t2\", \"category\": \"code_generation\", \
                      \"input\": \"generate layout\", \"depends_on\": [\"t1\"]}]}\n```";
        let planner =
            Planner::new("general").with_coordinator(Arc::new(FixedClient(answer.to_string())));

        let plan = planner.plan("compliant duct layout", &registry()).await.unwrap();
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.summary.as_deref(), Some("check then generate"));
    }

    #[tokio::test]
    async fn test_coordinator_prose_answer_is_invalid_plan() {
        let planner = Planner::new("general")
            .with_coordinator(Arc::new(FixedClient("I cannot help with that".to_string())));

        let err = planner.plan("anything", &registry()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_validation_rejects_duplicate_ids() {
        let tasks = vec![
            Task::new("t1", "general", "a"),
            Task::new("t1", "general", "b"),
        ];
        let err = validate_tasks(&tasks, &registry()).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_validation_rejects_unknown_category() {
        let tasks = vec![Task::new("t1", "sculpture", "a")];
        let err = validate_tasks(&tasks, &registry()).unwrap_err();
        assert!(matches!(err, Error::NoAgentForCategory(_)));
    }

    #[test]
    fn test_validation_rejects_unknown_dependency() {
        let tasks = vec![Task::new("t1", "general", "a").with_dependency("ghost")];
        let err = validate_tasks(&tasks, &registry()).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_validation_rejects_cycle() {
        let tasks = vec![
            Task::new("t1", "general", "a").with_dependency("t2"),
            Task::new("t2", "general", "b").with_dependency("t1"),
        ];
        let err = validate_tasks(&tasks, &registry()).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_validation_rejects_self_dependency() {
        let tasks = vec![Task::new("t1", "general", "a").with_dependency("t1")];
        let err = validate_tasks(&tasks, &registry()).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("{\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("text {\"a\": 1} more"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no json here"), None);
    }
}
