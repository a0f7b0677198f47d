//! Policy Module
//!
//! Declarative and custom governance policies, evaluated against resources.

pub mod defaults;
pub mod evaluator;
pub mod registry;
pub mod store;

pub use defaults::{default_policies, default_registry};
pub use evaluator::{sort_violations, PolicyEvaluator, ViolationSummary};
pub use registry::{CustomPolicyRegistry, CustomPredicate};
pub use store::{validate_policy, PolicyStore};
