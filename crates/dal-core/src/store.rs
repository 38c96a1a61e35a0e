//! In-memory configuration store
//!
//! Holds the current [`ConfigGraph`] snapshot and the registered
//! [`ConfigAction`]s. Mutations install a new snapshot first and then
//! deliver the matching event, so a listener that re-reads the store after
//! being notified always sees the new graph.

use crate::error::StoreError;
use crate::graph::{ConfigGraph, GraphDocument, Relationship};
use crate::notify::{ActionId, ConfigAction, ConfigurationChange};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared configuration database with change subscription
pub struct ConfigStore {
    graph: RwLock<Arc<ConfigGraph>>,
    actions: Mutex<Vec<(ActionId, Arc<dyn ConfigAction>)>>,
    next_action: AtomicU64,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("components", &self.graph.read().len())
            .field("actions", &self.actions.lock().len())
            .finish()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Store with nothing loaded
    #[must_use]
    pub fn new() -> Self {
        Self::from_graph(ConfigGraph::new())
    }

    /// Store initialised with a graph (no event is delivered)
    #[must_use]
    pub fn from_graph(graph: ConfigGraph) -> Self {
        Self {
            graph: RwLock::new(Arc::new(graph)),
            actions: Mutex::new(Vec::new()),
            next_action: AtomicU64::new(1),
        }
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigGraph> {
        Arc::clone(&self.graph.read())
    }

    /// Replace the whole database
    pub fn load(&self, graph: ConfigGraph) {
        *self.graph.write() = Arc::new(graph);
        tracing::debug!("configuration loaded");
        for action in self.actions() {
            action.load();
        }
    }

    /// Parse and load a JSON database
    ///
    /// # Errors
    /// Returns error if the document is malformed or references unknown uids
    pub fn load_json(&self, text: &str) -> Result<(), StoreError> {
        let graph = GraphDocument::from_json(text)?.into_graph()?;
        self.load(graph);
        Ok(())
    }

    /// Read, parse and load a JSON database file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let text = std::fs::read_to_string(path)?;
        self.load_json(&text)
    }

    /// Drop the database
    pub fn unload(&self) {
        *self.graph.write() = Arc::new(ConfigGraph::new());
        tracing::debug!("configuration unloaded");
        for action in self.actions() {
            action.unload();
        }
    }

    /// Replace one relationship of a loaded object
    ///
    /// # Errors
    /// Returns error if `uid` or any of `targets` is not loaded, or the
    /// object has no such relationship
    pub fn update(
        &self,
        uid: &str,
        relationship: Relationship,
        targets: &[&str],
    ) -> Result<(), StoreError> {
        {
            let mut current = self.graph.write();
            let id = current
                .find(uid)
                .ok_or_else(|| StoreError::NotLoaded(uid.to_owned()))?;
            let values = targets
                .iter()
                .map(|t| {
                    current.find(t).ok_or_else(|| StoreError::DanglingReference {
                        from: uid.to_owned(),
                        to: (*t).to_owned(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut next = ConfigGraph::clone(&current);
            next.set_relationship(id, relationship, values)?;
            *current = Arc::new(next);
        }

        tracing::debug!(uid, %relationship, "configuration updated");
        for action in self.actions() {
            action.update(uid, relationship);
        }
        Ok(())
    }

    /// Deliver a batch of externally committed changes
    pub fn notify(&self, changes: &[ConfigurationChange]) {
        tracing::debug!(batches = changes.len(), "configuration changes notified");
        for action in self.actions() {
            action.notify(changes);
        }
    }

    /// Register an action
    pub fn add_action(&self, action: Arc<dyn ConfigAction>) -> ActionId {
        let id = ActionId(self.next_action.fetch_add(1, Ordering::Relaxed));
        self.actions.lock().push((id, action));
        id
    }

    /// Deregister an action; returns false if it was not registered
    pub fn remove_action(&self, id: ActionId) -> bool {
        let mut actions = self.actions.lock();
        let before = actions.len();
        actions.retain(|(a, _)| *a != id);
        actions.len() != before
    }

    /// Number of registered actions
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.lock().len()
    }

    // Listeners run without the registry lock so they may call back into the store.
    fn actions(&self) -> Vec<Arc<dyn ConfigAction>> {
        self.actions.lock().iter().map(|(_, a)| Arc::clone(a)).collect()
    }
}
