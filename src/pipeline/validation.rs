//! Load-time checks for saved pipelines

use crate::error::EngineError;
use crate::models::SavedPipeline;
use crate::pipeline::evaluator::PipelineEvaluator;
use std::collections::HashSet;

/// Reject a pipeline before it is saved. Disabled operations are checked too,
/// so toggling one back on can never surface a broken definition.
pub fn validate_pipeline(pipeline: &SavedPipeline) -> Result<(), EngineError> {
    let context = format!("pipeline {}", pipeline.id);

    if pipeline.name.trim().is_empty() {
        return Err(EngineError::configuration(&context, "name must not be empty"));
    }

    let mut seen = HashSet::new();
    for op in &pipeline.operations {
        if op.id.trim().is_empty() {
            return Err(EngineError::configuration(&context, "operation id must not be empty"));
        }
        if !seen.insert(op.id.as_str()) {
            return Err(EngineError::configuration(
                &context,
                format!("duplicate operation id '{}'", op.id),
            ));
        }
        PipelineEvaluator::check_operation(op)?;
    }

    Ok(())
}
