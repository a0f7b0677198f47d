//! Operation Pipeline Module
//!
//! Turns a resource's current labels into proposed labels by running a
//! user-authored, ordered list of operations.
//!
//! 1. **Source**: resource fields and working labels that operations read
//! 2. **Evaluator**: per-resource and batch evaluation with failure isolation
//! 3. **Validation**: load-time rejection of malformed definitions
//! 4. **Store**: saved pipelines

pub mod evaluator;
pub mod source;
pub mod store;
pub mod validation;

// Re-export main types for convenient access
pub use evaluator::PipelineEvaluator;
pub use source::{Matcher, SourceField};
pub use store::PipelineStore;
pub use validation::validate_pipeline;
