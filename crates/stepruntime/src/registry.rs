use std::collections::HashMap;
use std::sync::Arc;
use stepcore::Action;

/// Factory trait producing action instances
///
/// `create` is called once per step invocation so every execution gets a
/// fresh, stateless instance.
pub trait ActionFactory: Send + Sync {
    fn create(&self) -> Box<dyn Action>;

    /// Action type identifier this factory produces
    fn action_type(&self) -> &str;

    /// Human-readable description for discovery/UI
    fn description(&self) -> String {
        format!("{} action", self.action_type())
    }
}

/// Registry of available action types
///
/// Constructed explicitly at startup and shared behind `Arc`; read-mostly
/// after registration, safe for concurrent lookups.
pub struct ActionRegistry {
    factories: HashMap<String, Arc<dyn ActionFactory>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an action factory. The last registration for a given type
    /// wins; overwriting is logged, not rejected.
    pub fn register(&mut self, factory: Arc<dyn ActionFactory>) {
        let action_type = factory.action_type().to_string();
        if self.factories.contains_key(&action_type) {
            tracing::warn!("overwriting existing action registration: {}", action_type);
        } else {
            tracing::info!("registered action: {}", action_type);
        }
        self.factories.insert(action_type, factory);
    }

    /// Construct a fresh action instance for the given type.
    pub fn resolve(&self, action_type: &str) -> Option<Box<dyn Action>> {
        self.factories.get(action_type).map(|factory| factory.create())
    }

    pub fn is_registered(&self, action_type: &str) -> bool {
        self.factories.contains_key(action_type)
    }

    /// All registered action types with their descriptions.
    pub fn list_actions(&self) -> HashMap<String, String> {
        self.factories
            .iter()
            .map(|(action_type, factory)| (action_type.clone(), factory.description()))
            .collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
