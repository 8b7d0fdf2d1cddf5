//! Whole-workflow analysis used by `explain` and the dry-run `test` command.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use workflow_types::execution::{DryRunPlan, DryRunResponse};
use workflow_types::plan::{ExecutionPlan, GraphView, WorkflowAnalysis};
use workflow_types::validation::ValidationReport;
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use super::critical_path::critical_path_for_plan;
use super::graph;
use super::planner::{self, PlanError};
use super::template::{self, TASKS_ROOT, TemplatePath};
use super::validator;

/// Plan, critical path, depth and width for a workflow.
pub fn analyze(workflow: &WorkflowDefinition) -> Result<WorkflowAnalysis, PlanError> {
    let built = graph::build(workflow, None);
    let plan = planner::plan(&built.graph)?;
    let critical_path = critical_path_for_plan(&built.graph, &plan);

    Ok(WorkflowAnalysis {
        workflow: workflow.name.clone(),
        namespace: workflow.namespace.clone(),
        task_count: built.graph.len(),
        plan,
        critical_path,
    })
}

/// Graph view for visualization, with groups filled in when the workflow
/// is acyclic.
pub fn graph_view(workflow: &WorkflowDefinition) -> GraphView {
    let built = graph::build(workflow, None);
    let plan = planner::plan(&built.graph).ok();
    built.graph.view(plan.as_ref())
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Everything a local dry run reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub workflow: String,
    pub validation: ValidationReport,
    /// `None` when the workflow is cyclic.
    pub plan: Option<ExecutionPlan>,
    pub critical_path: Vec<String>,
    /// Task input after template resolution, keyed by task ID.
    pub resolved_inputs: BTreeMap<String, Value>,
    pub resolved_output: Value,
    /// References that could not be resolved even with placeholders.
    pub unresolved: Vec<String>,
}

impl DryRunReport {
    pub fn is_valid(&self) -> bool {
        self.validation.valid
    }

    /// Shape shared with the Gateway dry-run endpoint.
    pub fn to_response(&self) -> DryRunResponse {
        DryRunResponse {
            valid: self.validation.valid,
            execution_plan: self.plan.as_ref().map(DryRunPlan::from).unwrap_or_default(),
            errors: self.validation.error_messages(),
            warnings: self.validation.warnings.clone(),
        }
    }
}

/// Validate, plan, and resolve every template without executing anything.
///
/// Task outputs are stood in for by `{"$placeholder": "<path>"}` objects, so
/// a reference resolves exactly when it names a declared task or a supplied
/// input field.
pub fn dry_run(
    workflow: &WorkflowDefinition,
    task_defs: Option<&[TaskDefinition]>,
    input: &Value,
) -> DryRunReport {
    let validation = validator::validate_with_input(workflow, task_defs, input);
    let built = graph::build(workflow, None);
    let plan = planner::plan(&built.graph).ok();
    let critical_path = plan
        .as_ref()
        .map(|p| critical_path_for_plan(&built.graph, p))
        .unwrap_or_default();

    let context = placeholder_context(workflow, &built.graph.task_ids(), input);
    let mut unresolved = Vec::new();

    let mut resolved_inputs = BTreeMap::new();
    for task in &workflow.tasks {
        if resolved_inputs.contains_key(&task.id) {
            continue;
        }
        let input_value = Value::Object(task.input.clone().into_iter().collect());
        let resolved = template::resolve_value(&input_value, &context);
        unresolved.extend(resolved.unresolved);
        resolved_inputs.insert(task.id.clone(), resolved.value);
    }

    let output_value = Value::Object(workflow.output.clone().into_iter().collect());
    let resolved_output = template::resolve_value(&output_value, &context);
    unresolved.extend(resolved_output.unresolved);
    unresolved.sort();
    unresolved.dedup();

    DryRunReport {
        workflow: workflow.name.clone(),
        validation,
        plan,
        critical_path,
        resolved_inputs,
        resolved_output: resolved_output.value,
        unresolved,
    }
}

fn placeholder_context(workflow: &WorkflowDefinition, task_ids: &[&str], input: &Value) -> Value {
    let mut tasks = serde_json::Map::new();
    for id in task_ids {
        tasks.insert(
            id.to_string(),
            json!({
                "status": "success",
                "output": { "$placeholder": format!("tasks.{id}.output") },
            }),
        );
    }
    let mut context = json!({ "input": input, "tasks": tasks });

    let references = template::extract_references_in(
        workflow
            .tasks
            .iter()
            .flat_map(|t| t.input.values())
            .chain(workflow.output.values()),
    );
    for raw in references {
        let Ok(path) = TemplatePath::parse(&raw) else {
            continue;
        };
        let declared = path.task_id().is_some_and(|id| task_ids.contains(&id));
        if path.root() != TASKS_ROOT || !declared || template::lookup(&path, &context).is_some() {
            continue;
        }
        template::assign(&mut context, path.segments(), json!({ "$placeholder": raw }));
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_types::workflow::TaskNode;

    fn order_workflow() -> WorkflowDefinition {
        WorkflowDefinition {
            name: "order-processing".to_string(),
            namespace: "shop".to_string(),
            description: None,
            input: None,
            tasks: vec![
                TaskNode::new("fetch-user", "get-user", &[])
                    .with_input("id", json!("{{input.userId}}")),
                TaskNode::new("fetch-orders", "get-orders", &["fetch-user"])
                    .with_input("name", json!("Orders for {{tasks.fetch-user.output.name}}")),
                TaskNode::new("summarize", "summary", &["fetch-orders"])
                    .with_input("orders", json!("{{tasks.fetch-orders.output}}")),
            ],
            output: BTreeMap::from([(
                "summary".to_string(),
                json!("{{tasks.summarize.output}}"),
            )]),
        }
    }

    #[test]
    fn test_analyze_sequential_workflow() {
        let analysis = analyze(&order_workflow()).unwrap();
        assert_eq!(analysis.task_count, 3);
        assert_eq!(analysis.plan.execution_depth, 3);
        assert_eq!(analysis.plan.max_parallel_width, 1);
        assert_eq!(
            analysis.critical_path,
            vec!["fetch-user", "fetch-orders", "summarize"]
        );
        assert_eq!(analysis, analyze(&order_workflow()).unwrap());
    }

    #[test]
    fn test_dry_run_resolves_with_placeholders() {
        let report = dry_run(&order_workflow(), None, &json!({ "userId": "u-1" }));

        assert!(report.is_valid());
        assert!(report.unresolved.is_empty(), "{:?}", report.unresolved);
        assert_eq!(report.resolved_inputs["fetch-user"]["id"], json!("u-1"));
        assert_eq!(
            report.resolved_inputs["summarize"]["orders"],
            json!({ "$placeholder": "tasks.fetch-orders.output" })
        );
        assert!(report.resolved_inputs["fetch-orders"]["name"]
            .as_str()
            .unwrap()
            .starts_with("Orders for "));

        let response = report.to_response();
        assert!(response.valid);
        assert_eq!(response.execution_plan.groups.len(), 3);
    }

    #[test]
    fn test_dry_run_reports_missing_input() {
        let report = dry_run(&order_workflow(), None, &json!({}));
        assert_eq!(report.unresolved, vec!["input.userId".to_string()]);
        assert_eq!(report.resolved_inputs["fetch-user"]["id"], Value::Null);
    }

    #[test]
    fn test_dry_run_on_cycle_has_no_plan() {
        let mut wf = order_workflow();
        wf.tasks[0].depends_on.push("summarize".to_string());

        let report = dry_run(&wf, None, &json!({ "userId": "u-1" }));
        assert!(!report.is_valid());
        assert!(report.plan.is_none());
        assert!(report.critical_path.is_empty());
        assert!(report.to_response().execution_plan.groups.is_empty());
    }

    #[test]
    fn test_graph_view_has_groups() {
        let view = graph_view(&order_workflow());
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.nodes[2].group, Some(2));
        assert_eq!(view.edges.len(), 2);
    }
}
