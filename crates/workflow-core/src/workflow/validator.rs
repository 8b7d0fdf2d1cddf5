//! Workflow validation: named structural checks aggregated into a report.
//!
//! Checks always appear in the same order (see [`check::ALL`]). Problems are
//! returned as data; validation itself never fails.

use std::collections::BTreeSet;

use serde_json::Value;
use workflow_types::error::ValidationIssue;
use workflow_types::validation::{ValidationCheck, ValidationReport, check};
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use super::graph;
use super::template::{self, INPUT_ROOT, TASK_FIELDS, TASKS_ROOT, TemplatePath};

/// Validate a workflow, optionally against the loaded task definitions.
///
/// The `task-references` check is skipped when `task_defs` is `None`.
pub fn validate(workflow: &WorkflowDefinition, task_defs: Option<&[TaskDefinition]>) -> ValidationReport {
    let built = graph::build(workflow, task_defs);

    let mut duplicates = Vec::new();
    let mut missing_refs = Vec::new();
    let mut dangling = Vec::new();
    let mut template_issues = Vec::new();
    let mut cycles = Vec::new();
    for issue in built.issues {
        match issue {
            ValidationIssue::DuplicateTaskId { .. } => duplicates.push(issue),
            ValidationIssue::MissingTaskReference { .. } => missing_refs.push(issue),
            ValidationIssue::MissingDependency { .. }
            | ValidationIssue::DanglingOutputReference { .. } => dangling.push(issue),
            ValidationIssue::InvalidTemplateExpression { .. } => template_issues.push(issue),
            ValidationIssue::CircularDependency { .. } => cycles.push(issue),
            ValidationIssue::Schema { .. } => {}
        }
    }

    let schema_issues = schema_issues(workflow);
    let (expression_issues, reference_count) = template_expression_issues(workflow);
    template_issues.extend(expression_issues);

    let task_count = built.graph.len();
    let mut checks = Vec::with_capacity(check::ALL.len());

    checks.push(outcome(
        check::SCHEMA,
        &schema_issues,
        format!(
            "workflow '{}' has {} task(s)",
            workflow.name,
            workflow.tasks.len()
        ),
        "workflow definition is malformed",
    ));
    checks.push(outcome(
        check::DUPLICATE_IDS,
        &duplicates,
        format!("all {task_count} task IDs are unique"),
        "duplicate task IDs found",
    ));
    checks.push(match task_defs {
        None => ValidationCheck::skipped(check::TASK_REFERENCES, "no task definitions supplied"),
        Some(defs) => outcome(
            check::TASK_REFERENCES,
            &missing_refs,
            format!("all task references resolve against {} definition(s)", defs.len()),
            "unknown task references found",
        ),
    });
    checks.push(outcome(
        check::DEPENDENCIES,
        &dangling,
        "all dependencies and output references resolve".to_string(),
        "dangling dependencies found",
    ));
    checks.push(outcome(
        check::TEMPLATE_EXPRESSIONS,
        &template_issues,
        format!("{reference_count} template reference(s) resolve"),
        "invalid template expressions found",
    ));
    checks.push(outcome(
        check::CIRCULAR_DEPENDENCIES,
        &cycles,
        "no circular dependencies".to_string(),
        "circular dependency detected",
    ));

    let errors: Vec<ValidationIssue> = schema_issues
        .into_iter()
        .chain(duplicates)
        .chain(missing_refs)
        .chain(dangling)
        .chain(template_issues)
        .chain(cycles)
        .collect();

    let warnings = input_warnings(workflow);
    let report = ValidationReport::from_checks(checks, errors, warnings);

    tracing::debug!(
        workflow = %workflow.name,
        valid = report.valid,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated workflow"
    );

    report
}

/// [`validate`] plus warnings about a concrete input payload: required
/// fields that were not supplied and supplied fields nothing references.
pub fn validate_with_input(
    workflow: &WorkflowDefinition,
    task_defs: Option<&[TaskDefinition]>,
    input: &Value,
) -> ValidationReport {
    let mut report = validate(workflow, task_defs);
    let supplied = input.as_object();

    if let Some(schema) = &workflow.input {
        for field in &schema.required {
            if !supplied.is_some_and(|m| m.contains_key(field)) {
                report
                    .warnings
                    .push(format!("required input field '{field}' was not supplied"));
            }
        }
    }

    if let Some(supplied) = supplied {
        let used = referenced_input_fields(workflow);
        for key in supplied.keys() {
            if !used.contains(key.as_str()) {
                report
                    .warnings
                    .push(format!("input field '{key}' is supplied but never referenced"));
            }
        }
    }

    report
}

fn outcome(
    name: &str,
    issues: &[ValidationIssue],
    passed: String,
    failed: &str,
) -> ValidationCheck {
    if issues.is_empty() {
        ValidationCheck::passed(name, passed)
    } else {
        ValidationCheck::failed(
            name,
            failed,
            issues.iter().map(ToString::to_string).collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

fn schema_issues(workflow: &WorkflowDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut schema = |message: String| issues.push(ValidationIssue::Schema { message });

    if workflow.name.trim().is_empty() {
        schema("workflow name must not be empty".to_string());
    }
    if workflow.namespace.trim().is_empty() {
        schema("workflow namespace must not be empty".to_string());
    }
    if workflow.tasks.is_empty() {
        schema("workflow must have at least one task".to_string());
    }
    for (position, task) in workflow.tasks.iter().enumerate() {
        if task.id.trim().is_empty() {
            schema(format!("task at position {position} has an empty id"));
        }
        if task.task_ref.trim().is_empty() {
            schema(format!("task '{}' has an empty taskRef", task.id));
        }
    }

    issues
}

/// Check every template in task inputs and the output mapping.
///
/// References to undeclared tasks are reported by the graph builder, so
/// they are skipped here. Returns the issues and the number of distinct
/// references seen.
fn template_expression_issues(workflow: &WorkflowDefinition) -> (Vec<ValidationIssue>, usize) {
    let declared_inputs = workflow.declared_input_fields();
    let task_ids: BTreeSet<&str> = workflow.task_ids().collect();
    let mut issues = Vec::new();
    let mut seen = BTreeSet::new();

    let locations = workflow
        .tasks
        .iter()
        .map(|t| (format!("task '{}' input", t.id), t.input.values().collect::<Vec<_>>()))
        .chain(
            workflow
                .output
                .iter()
                .map(|(k, v)| (format!("output '{k}'"), vec![v])),
        );

    for (location, values) in locations {
        for value in &values {
            for (expression, err) in template::template_errors(value) {
                issues.push(ValidationIssue::InvalidTemplateExpression {
                    location: location.clone(),
                    expression,
                    reason: err.to_string(),
                });
            }
        }

        for raw in template::extract_references_in(values.iter().copied()) {
            seen.insert(raw.clone());
            let Ok(path) = TemplatePath::parse(&raw) else {
                continue;
            };
            if let Some(reason) = reference_problem(&path, declared_inputs.as_ref(), &task_ids) {
                issues.push(ValidationIssue::InvalidTemplateExpression {
                    location: location.clone(),
                    expression: raw,
                    reason,
                });
            }
        }
    }

    (issues, seen.len())
}

fn reference_problem(
    path: &TemplatePath,
    declared_inputs: Option<&BTreeSet<&str>>,
    task_ids: &BTreeSet<&str>,
) -> Option<String> {
    match path.root() {
        INPUT_ROOT => {
            let field = path.input_field()?;
            let declared = declared_inputs?;
            (!declared.contains(field)).then(|| format!("input field '{field}' is not declared"))
        }
        TASKS_ROOT => {
            let Some(task_id) = path.task_id() else {
                return Some("expected 'tasks.<id>'".to_string());
            };
            if !task_ids.contains(task_id) {
                // Reported by the graph builder.
                return None;
            }
            let field = path.segments().get(2)?;
            (!TASK_FIELDS.contains(&field.as_str())).then(|| {
                format!(
                    "unknown task field '{field}' (expected one of: {})",
                    TASK_FIELDS.join(", ")
                )
            })
        }
        other => Some(format!(
            "unknown root '{other}' (expected '{INPUT_ROOT}' or '{TASKS_ROOT}')"
        )),
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

fn referenced_input_fields(workflow: &WorkflowDefinition) -> BTreeSet<String> {
    all_references(workflow)
        .iter()
        .filter_map(|raw| TemplatePath::parse(raw).ok())
        .filter_map(|p| p.input_field().map(str::to_string))
        .collect()
}

fn all_references(workflow: &WorkflowDefinition) -> BTreeSet<String> {
    template::extract_references_in(
        workflow
            .tasks
            .iter()
            .flat_map(|t| t.input.values())
            .chain(workflow.output.values()),
    )
}

fn input_warnings(workflow: &WorkflowDefinition) -> Vec<String> {
    let mut warnings = Vec::new();
    let used = referenced_input_fields(workflow);

    match workflow.declared_input_fields() {
        Some(declared) => {
            for field in declared {
                if !used.contains(field) {
                    warnings.push(format!("input field '{field}' is declared but never referenced"));
                }
            }
        }
        None => {
            for field in &used {
                warnings.push(format!(
                    "input reference 'input.{field}' cannot be checked: no input schema declared"
                ));
            }
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use workflow_types::validation::CheckOutcome;
    use workflow_types::workflow::{InputSchema, TaskNode};

    fn workflow(tasks: Vec<TaskNode>) -> WorkflowDefinition {
        WorkflowDefinition {
            name: "order-processing".to_string(),
            namespace: "default".to_string(),
            description: None,
            input: Some(InputSchema {
                schema_type: Some("object".to_string()),
                properties: BTreeMap::from([
                    ("userId".to_string(), json!({ "type": "string" })),
                    ("orderId".to_string(), json!({ "type": "string" })),
                ]),
                required: vec!["userId".to_string()],
            }),
            tasks,
            output: BTreeMap::new(),
        }
    }

    fn defs(names: &[&str]) -> Vec<TaskDefinition> {
        names
            .iter()
            .map(|n| TaskDefinition::http(*n, "GET", format!("http://localhost/{n}")))
            .collect()
    }

    fn check_names(report: &ValidationReport) -> Vec<&str> {
        report.checks.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_valid_workflow_passes_every_check() {
        let wf = workflow(vec![
            TaskNode::new("fetch-user", "get-user", &[])
                .with_input("id", json!("{{input.userId}}")),
            TaskNode::new("process-order", "create-order", &["fetch-user"])
                .with_input("user", json!("{{tasks.fetch-user.output}}"))
                .with_input("order", json!("{{ input.orderId }}")),
        ]);
        let report = validate(&wf, Some(&defs(&["get-user", "create-order"])));

        assert!(report.valid, "errors: {:?}", report.errors);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(check_names(&report), check::ALL.to_vec());
        assert!(report.checks.iter().all(|c| !c.is_failed() && !c.is_skipped()));
    }

    #[test]
    fn test_missing_task_reference() {
        let wf = workflow(vec![
            TaskNode::new("fetch", "nonexistent-task", &[]).with_input("id", json!("{{input.userId}}")),
        ]);
        let report = validate(&wf, Some(&defs(&["get-user"])));

        assert!(!report.valid);
        let check = report.check(check::TASK_REFERENCES).unwrap();
        assert!(check.is_failed());
        let CheckOutcome::Failed { errors, .. } = &check.outcome else {
            panic!("expected failure");
        };
        assert!(errors[0].contains("nonexistent-task"));
    }

    #[test]
    fn test_task_references_skipped_without_definitions() {
        let wf = workflow(vec![
            TaskNode::new("fetch", "anything", &[]).with_input("id", json!("{{input.userId}}")),
        ]);
        let report = validate(&wf, None);
        assert!(report.valid);
        assert!(report.check(check::TASK_REFERENCES).unwrap().is_skipped());
        assert_eq!(report.checks.len(), check::ALL.len());
    }

    #[test]
    fn test_cycle_fails_circular_check() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &["c"]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("c", "t", &["b"]),
        ]);
        let report = validate(&wf, None);

        assert!(!report.valid);
        assert!(report.check(check::CIRCULAR_DEPENDENCIES).unwrap().is_failed());
        let messages = report.error_messages();
        assert!(messages.iter().any(|m| m.contains("circular") && m.contains("a -> b -> c -> a")));
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let wf = workflow(vec![
            TaskNode::new("step-1", "t", &[]),
            TaskNode::new("step-1", "t", &[]),
        ]);
        let report = validate(&wf, None);
        assert!(!report.valid);
        assert!(report.check(check::DUPLICATE_IDS).unwrap().is_failed());
        assert!(report.error_messages().iter().any(|m| m.contains("step-1")));
    }

    #[test]
    fn test_schema_errors() {
        let mut wf = workflow(vec![]);
        wf.name = String::new();
        let report = validate(&wf, None);

        assert!(!report.valid);
        let check = report.check(check::SCHEMA).unwrap();
        let CheckOutcome::Failed { errors, .. } = &check.outcome else {
            panic!("expected failure");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_template_expression_errors() {
        let mut wf = workflow(vec![
            TaskNode::new("a", "t", &[])
                .with_input("x", json!("{{input.unknownField}}"))
                .with_input("y", json!("{{ secrets.token }}"))
                .with_input("z", json!("{{ unterminated")),
            TaskNode::new("b", "t", &["a"])
                .with_input("w", json!("{{tasks.a.result}}"))
                .with_input("v", json!("{{tasks.ghost.output}}")),
        ]);
        wf.tasks[0].input.insert("u".to_string(), json!("{{input.userId}}"));

        let report = validate(&wf, None);
        assert!(!report.valid);

        let check = report.check(check::TEMPLATE_EXPRESSIONS).unwrap();
        let CheckOutcome::Failed { errors, .. } = &check.outcome else {
            panic!("expected failure");
        };
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("unknownField")));
        assert!(errors.iter().any(|e| e.contains("secrets")));
        assert!(errors.iter().any(|e| e.contains("unterminated")));
        assert!(errors.iter().any(|e| e.contains("'result'")));
        assert!(errors.iter().any(|e| e.contains("ghost")));
    }

    #[test]
    fn test_dangling_depends_on_and_output() {
        let mut wf = workflow(vec![
            TaskNode::new("a", "t", &["nope"]).with_input("id", json!("{{input.userId}}")),
        ]);
        wf.output.insert("result".to_string(), json!("{{tasks.gone.output}}"));

        let report = validate(&wf, None);
        assert!(!report.valid);
        assert!(report.check(check::DEPENDENCIES).unwrap().is_failed());
        assert!(!report.check(check::CIRCULAR_DEPENDENCIES).unwrap().is_failed());
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_input_warnings() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &[]).with_input("id", json!("{{input.userId}}")),
        ]);
        let report = validate(&wf, None);
        assert!(report.valid);
        assert_eq!(
            report.warnings,
            vec!["input field 'orderId' is declared but never referenced".to_string()]
        );

        let mut no_schema = wf.clone();
        no_schema.input = None;
        let report = validate(&no_schema, None);
        assert!(report.valid);
        assert!(report.warnings[0].contains("input.userId"));
    }

    #[test]
    fn test_validate_with_input_warnings() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &[])
                .with_input("id", json!("{{input.userId}}"))
                .with_input("order", json!("{{input.orderId}}")),
        ]);
        let report = validate_with_input(&wf, None, &json!({ "orderId": "o1", "extra": true }));
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("'userId' was not supplied")));
        assert!(report.warnings.iter().any(|w| w.contains("'extra'")));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &["b"]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("b", "t", &[]),
        ]);
        let before = wf.clone();
        let first = validate(&wf, None);
        let second = validate(&wf, None);
        assert_eq!(first, second);
        assert_eq!(wf, before);
    }
}
