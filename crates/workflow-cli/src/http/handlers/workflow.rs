//! Stateless workflow analysis endpoints.

use std::time::Instant;

use axum::Json;
use serde::Serialize;
use uuid::Uuid;
use workflow_core::workflow::analysis::{self, DryRunReport};
use workflow_core::workflow::graph;
use workflow_core::workflow::validator;
use workflow_types::plan::{GraphView, WorkflowAnalysis};
use workflow_types::validation::ValidationReport;

use super::WorkflowRequest;
use crate::http::error::AppError;
use crate::http::response::ApiResponse;

/// POST /api/v1/workflows/validate - Run every validation check.
pub async fn validate_workflow(
    Json(body): Json<WorkflowRequest>,
) -> Result<Json<ApiResponse<ValidationReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request = body.parse()?;
    let report = validator::validate_with_input(
        &request.workflow,
        request.tasks.as_deref(),
        &request.input,
    );

    tracing::info!(
        workflow = %request.workflow.name,
        valid = report.valid,
        "workflow validated"
    );

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(report, request_id, elapsed)))
}

/// POST /api/v1/workflows/explain - Execution plan and critical path.
pub async fn explain_workflow(
    Json(body): Json<WorkflowRequest>,
) -> Result<Json<ApiResponse<WorkflowAnalysis>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request = body.parse()?;
    let result = analysis::analyze(&request.workflow)?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(result, request_id, elapsed)))
}

/// Dependency graph in structured and rendered forms.
#[derive(Debug, Serialize)]
pub struct GraphResponse {
    #[serde(flatten)]
    pub view: GraphView,
    pub dot: String,
    pub mermaid: String,
}

/// POST /api/v1/workflows/graph - Dependency graph with edge kinds.
pub async fn workflow_graph(
    Json(body): Json<WorkflowRequest>,
) -> Result<Json<ApiResponse<GraphResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request = body.parse()?;
    let built = graph::build(&request.workflow, None);
    let response = GraphResponse {
        view: analysis::graph_view(&request.workflow),
        dot: built.graph.to_dot(),
        mermaid: built.graph.to_mermaid(),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(response, request_id, elapsed)))
}

/// POST /api/v1/workflows/test - Dry run: plan and resolve templates.
pub async fn dry_run_workflow(
    Json(body): Json<WorkflowRequest>,
) -> Result<Json<ApiResponse<DryRunReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request = body.parse()?;
    let report = analysis::dry_run(&request.workflow, request.tasks.as_deref(), &request.input);

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(report, request_id, elapsed)))
}
