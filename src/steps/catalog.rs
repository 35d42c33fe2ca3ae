use crate::steps::StepDescriptor;
use dashmap::DashMap;
use std::sync::Arc;

/// Lookup from step type name to its implementation.
pub trait StepCatalog: Send + Sync {
    fn lookup(&self, type_name: &str) -> Option<Arc<dyn StepDescriptor>>;
}

/// Shared, concurrently writable step registry.
///
/// Integrated steps are registered into the same registry they were compiled
/// against, so later graphs can use them like any other step.
pub struct StepRegistry {
    steps: DashMap<String, Arc<dyn StepDescriptor>>,
    display_names: DashMap<String, String>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            steps: DashMap::new(),
            display_names: DashMap::new(),
        }
    }

    pub fn register(&self, name: &str, step: Arc<dyn StepDescriptor>) {
        self.steps.insert(name.to_string(), step);
    }

    pub fn register_with_display_name(&self, name: &str, display_name: &str, step: Arc<dyn StepDescriptor>) {
        self.register(name, step);
        self.display_names.insert(name.to_string(), display_name.to_string());
    }

    pub fn display_name(&self, name: &str) -> Option<String> {
        self.display_names
            .get(name)
            .map(|n| n.value().clone())
            .or_else(|| self.steps.contains_key(name).then(|| name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.steps.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StepCatalog for StepRegistry {
    fn lookup(&self, type_name: &str) -> Option<Arc<dyn StepDescriptor>> {
        self.steps.get(type_name).map(|step| step.value().clone())
    }
}
