//! Error types for DAL Core
//!
//! Three families:
//! - [`DalError`]: failures of resolution and containment queries
//! - [`StoreError`]: failures building, loading or updating the configuration graph
//! - [`ConfigError`]: invalid or unreadable resolver configuration

use crate::graph::Relationship;
use crate::types::ComponentId;

/// Result alias used by resolution and query operations
pub type Result<T, E = DalError> = std::result::Result<T, E>;

/// Errors raised by resolution and containment queries
#[derive(Debug, thiserror::Error)]
pub enum DalError {
    /// Recursion depth exceeded while walking the containment graph
    #[error(
        "reach maximum allowed recursion ({limit}) during calculation of {goal}; \
         possibly there is circular dependency between these objects: {}",
        path.join(", ")
    )]
    CircularDependency {
        /// Configured depth limit
        limit: usize,
        /// What was being computed
        goal: &'static str,
        /// Uids on the recursion stack when the limit was hit, outermost first
        path: Vec<String>,
    },

    /// Fixed-point propagation did not converge within the pass limit
    #[error("has exceeded the maximum of iterations allowed ({limit}) during calculation of disabled objects")]
    MaxIterationsExceeded {
        /// Configured pass limit
        limit: usize,
    },

    /// Parent path search failed
    #[error("failed to get parents of '{object}': {source}")]
    CannotGetParents {
        /// Uid of the queried component
        object: String,
        /// Underlying failure
        #[source]
        source: Box<DalError>,
    },

    /// Component id does not exist in the current graph snapshot
    #[error("component {0} does not exist in the loaded configuration")]
    UnknownComponent(ComponentId),

    /// No component with this uid exists
    #[error("there is no session object with UID = \"{0}\"")]
    SessionNotFound(String),

    /// Uid exists but is not a session
    #[error("object \"{0}\" is not a session")]
    NotASession(String),

    /// Resolver configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DalError {
    /// Whether the error aborts the operation that raised it
    ///
    /// `MaxIterationsExceeded` is reported but the caller still gets a
    /// best-effort answer.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MaxIterationsExceeded { .. })
    }

    /// Whether the error (or the error it wraps) is a circular dependency
    #[must_use]
    pub fn is_circular_dependency(&self) -> bool {
        match self {
            Self::CircularDependency { .. } => true,
            Self::CannotGetParents { source, .. } => source.is_circular_dependency(),
            _ => false,
        }
    }
}

/// Errors raised while building or mutating the configuration graph
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Two components share a uid
    #[error("duplicate component uid '{0}'")]
    DuplicateUid(String),

    /// A relationship names a uid that is not defined
    #[error("component '{from}' references unknown component '{to}'")]
    DanglingReference {
        /// Referencing component
        from: String,
        /// Missing uid
        to: String,
    },

    /// A relationship was given to a component kind that does not have it
    #[error("component '{uid}' has no '{relationship}' relationship")]
    WrongRelationship {
        /// Offending component
        uid: String,
        /// Relationship name
        relationship: Relationship,
    },

    /// Update targeted a uid that is not loaded
    #[error("component '{0}' is not loaded")]
    NotLoaded(String),

    /// Malformed database document
    #[error("invalid database document: {0}")]
    Json(#[from] serde_json::Error),

    /// Database file could not be read
    #[error("cannot read database file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by resolver configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed TOML
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Value out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
