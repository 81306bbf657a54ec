//! Name-keyed store of action units.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use action_primitives::ParamsSchema;
use serde::Serialize;

use crate::action::Action;

/// Read-only description of a registered action.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ActionDescriptor {
    name: String,
    description: String,
    params_schema: ParamsSchema,
}

impl ActionDescriptor {
    fn of(action: &dyn Action) -> Self {
        Self {
            name: action.name().to_owned(),
            description: action.description().to_owned(),
            params_schema: action.params_schema(),
        }
    }

    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the action description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared parameter schema.
    #[must_use]
    pub fn params_schema(&self) -> &ParamsSchema {
        &self.params_schema
    }
}

/// Registry that stores action units keyed by name.
///
/// No consistency checks are made at registration time; a malformed unit only
/// surfaces errors once it is invoked.
#[derive(Default)]
pub struct ActionRegistry {
    inner: RwLock<HashMap<String, Arc<dyn Action>>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("action registry poisoned");
        let mut names: Vec<_> = inner.keys().cloned().collect();
        names.sort();
        f.debug_struct("ActionRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action, replacing any previous unit with the same name.
    ///
    /// Returns the replaced unit, if there was one.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register<A>(&self, action: A) -> Option<Arc<dyn Action>>
    where
        A: Action,
    {
        self.register_shared(Arc::new(action))
    }

    /// Registers an already shared action, replacing any previous unit.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_shared(&self, action: Arc<dyn Action>) -> Option<Arc<dyn Action>> {
        let mut inner = self.inner.write().expect("action registry poisoned");
        let name = action.name().to_owned();
        let previous = inner.insert(name.clone(), action);
        if previous.is_some() {
            tracing::debug!(action = %name, "action registration replaced existing unit");
        }
        previous
    }

    /// Registers the action only if its name is not taken yet.
    ///
    /// Returns `false` and leaves the existing entry untouched on collision.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_if_absent(&self, action: Arc<dyn Action>) -> bool {
        let mut inner = self.inner.write().expect("action registry poisoned");
        let name = action.name();
        if inner.contains_key(name) {
            return false;
        }
        inner.insert(name.to_owned(), action);
        true
    }

    /// Returns the action registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        let inner = self.inner.read().ok()?;
        inner.get(name).cloned()
    }

    /// Returns `true` when an action is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .is_ok_and(|inner| inner.contains_key(name))
    }

    /// Describes the action registered under `name`.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<ActionDescriptor> {
        self.get(name).map(|action| ActionDescriptor::of(action.as_ref()))
    }

    /// Lists descriptors for all registered actions, sorted by name.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list(&self) -> Vec<ActionDescriptor> {
        let inner = self.inner.read().expect("action registry poisoned");
        let mut descriptors: Vec<_> = inner
            .values()
            .map(|action| ActionDescriptor::of(action.as_ref()))
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Returns the number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map_or(0, |inner| inner.len())
    }

    /// Returns `true` when no actions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
