//! Store change notifications
//!
//! [`ConfigStore`](crate::store::ConfigStore) delivers four events to every
//! registered [`ConfigAction`]. Delivery may happen on any thread.

use crate::graph::Relationship;
use serde::{Deserialize, Serialize};

/// Handle of a registered action, used to deregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub u64);

/// Batch of object changes of one class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationChange {
    /// Class the changes belong to
    pub class_name: String,
    /// Uids of created objects
    #[serde(default)]
    pub created: Vec<String>,
    /// Uids of modified objects
    #[serde(default)]
    pub modified: Vec<String>,
    /// Uids of removed objects
    #[serde(default)]
    pub removed: Vec<String>,
}

impl ConfigurationChange {
    /// Empty change batch for a class
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    /// Total number of touched objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.len() + self.modified.len() + self.removed.len()
    }

    /// True when no object is touched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiver of store mutation events
pub trait ConfigAction: Send + Sync {
    /// A database was loaded
    fn load(&self);

    /// The database was unloaded
    fn unload(&self);

    /// A relationship of one object was updated
    fn update(&self, uid: &str, relationship: Relationship);

    /// A batch of changes was committed
    fn notify(&self, changes: &[ConfigurationChange]);
}
