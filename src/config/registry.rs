use std::collections::HashMap;
use uuid::Uuid;

/// Opaque handle returned when a callback is registered
pub type CallbackId = Uuid;

/// Callbacks keyed by a generated id. Iteration order is unspecified.
pub struct CallbackRegistry<C> {
    callbacks: HashMap<CallbackId, C>,
}

impl<C> CallbackRegistry<C> {
    pub fn new() -> Self {
        Self {
            callbacks: HashMap::new(),
        }
    }

    /// Generate a fresh id without registering anything
    pub fn generate_id() -> CallbackId {
        Uuid::new_v4()
    }

    /// Register a callback under a new id
    pub fn register(&mut self, callback: C) -> CallbackId {
        let id = Self::generate_id();
        self.callbacks.insert(id, callback);
        id
    }

    pub fn insert(&mut self, id: CallbackId, callback: C) -> Option<C> {
        self.callbacks.insert(id, callback)
    }

    pub fn remove(&mut self, id: &CallbackId) -> Option<C> {
        self.callbacks.remove(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &C> {
        self.callbacks.values()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<C> Default for CallbackRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
