//! DAL Core - disabled-component resolution
//!
//! Answers "is this component disabled in this session?" over a
//! hierarchical configuration graph:
//! - Sessions, segments, applications and resources form a containment graph
//! - Resource sets collapse by an AND or an OR rule over their members
//! - Persisted disabled lists and runtime user overrides seed the result
//! - A fixed-point pass propagates disablement through resource sets
//! - Every store change invalidates the cached result of each open session
//!
//! # Example
//!
//! ```rust
//! use dal_core::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = GraphBuilder::new();
//! builder
//!     .session("R", &[], &["N"], &["A"])
//!     .and_set("N", &["O", "B"])
//!     .or_set("O", &["A"])
//!     .plain("A")
//!     .plain("B");
//! let store = Arc::new(ConfigStore::from_graph(builder.build()?));
//!
//! let session = Session::open(store, "R")?;
//! let o = session.find("O").ok_or("missing")?;
//! let n = session.find("N").ok_or("missing")?;
//! assert!(session.is_disabled(o)?);
//! assert!(!session.is_disabled(n)?);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod guard;
pub mod notify;
pub mod parents;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::{ResolverConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_RECURSION_DEPTH};
pub use error::{ConfigError, DalError, Result, StoreError};
pub use graph::{ComponentDef, ConfigGraph, DefKind, GraphBuilder, GraphDocument, Relationship};
pub use guard::CircularDependencyGuard;
pub use notify::{ActionId, ConfigAction, ConfigurationChange};
pub use parents::{get_parents, ParentPath};
pub use resolver::{resolve, DisabledComponents, Resolution, ResolutionStats};
pub use session::Session;
pub use store::ConfigStore;
pub use types::{Component, ComponentId, ComponentKind, SetRule};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with DAL Core
    pub use crate::{
        ComponentId, ConfigAction, ConfigGraph, ConfigStore, DalError, GraphBuilder,
        Relationship, ResolverConfig, Session, SetRule,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
