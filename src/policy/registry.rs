//! Custom policy predicates
//!
//! CUSTOM policies carry no code. Their predicate is registered here under the
//! policy id when the service is configured, and looked up at evaluation time.

use crate::models::GceResource;
use std::collections::HashMap;
use std::sync::Arc;

/// An externally supplied rule. `Ok(true)` means the resource violates the policy.
pub trait CustomPredicate: Send + Sync {
    fn violates(&self, resource: &GceResource) -> anyhow::Result<bool>;
}

impl<F> CustomPredicate for F
where
    F: Fn(&GceResource) -> anyhow::Result<bool> + Send + Sync,
{
    fn violates(&self, resource: &GceResource) -> anyhow::Result<bool> {
        self(resource)
    }
}

/// Predicates keyed by policy id. Built once, then shared read-only.
#[derive(Default, Clone)]
pub struct CustomPolicyRegistry {
    predicates: HashMap<String, Arc<dyn CustomPredicate>>,
}

impl CustomPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a closure predicate for a policy id
    pub fn register<F>(&mut self, policy_id: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&GceResource) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.register_predicate(policy_id, predicate)
    }

    pub fn register_predicate<P>(&mut self, policy_id: impl Into<String>, predicate: P) -> &mut Self
    where
        P: CustomPredicate + 'static,
    {
        self.predicates.insert(policy_id.into(), Arc::new(predicate));
        self
    }

    pub fn get(&self, policy_id: &str) -> Option<Arc<dyn CustomPredicate>> {
        self.predicates.get(policy_id).cloned()
    }

    pub fn contains(&self, policy_id: &str) -> bool {
        self.predicates.contains_key(policy_id)
    }

    /// Registered ids, sorted
    pub fn policy_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.predicates.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for CustomPolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPolicyRegistry")
            .field("policy_ids", &self.policy_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;

    #[test]
    fn test_closures_register_as_predicates() {
        let mut registry = CustomPolicyRegistry::new();
        registry
            .register("C2", |r: &GceResource| Ok(r.status == "STOPPED"))
            .register("C1", |_: &GceResource| Ok(false));

        assert_eq!(registry.policy_ids(), vec!["C1", "C2"]);

        let stopped = GceResource::new("1", "vm", ResourceType::Instance, "us-east1-b", "STOPPED");
        let predicate = registry.get("C2").unwrap();
        assert!(predicate.violates(&stopped).unwrap());
        assert!(registry.get("missing").is_none());
    }
}
