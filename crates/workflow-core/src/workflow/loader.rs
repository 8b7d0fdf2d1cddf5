//! Definition loading abstraction.
//!
//! The filesystem implementation lives in `workflow-infra`; analysis code
//! and tests only depend on this trait.

use std::future::Future;
use std::path::Path;

use workflow_types::error::LoadError;
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

/// Loads workflow and task definitions from storage.
pub trait WorkflowLoader: Send + Sync {
    /// Load one workflow. A missing path is `LoadError::FileNotFound`.
    fn load_workflow(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<WorkflowDefinition, LoadError>> + Send;

    /// Load every task definition under a directory. A missing directory is
    /// `LoadError::FileNotFound`; an empty one yields an empty list.
    fn load_tasks_from_directory(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Vec<TaskDefinition>, LoadError>> + Send;
}
