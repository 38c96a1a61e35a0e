//! Session handle
//!
//! A [`Session`] binds one session object of a [`ConfigStore`] to its
//! [`DisabledComponents`] state and exposes the caller-facing queries.
//! The state is registered with the store for as long as the handle lives.

use crate::config::ResolverConfig;
use crate::error::{DalError, Result};
use crate::graph::ConfigGraph;
use crate::guard::CircularDependencyGuard;
use crate::notify::ActionId;
use crate::parents::{self, ParentPath};
use crate::resolver::{DisabledComponents, Resolution, ResolutionStats};
use crate::store::ConfigStore;
use crate::types::ComponentId;
use indexmap::IndexSet;
use std::sync::Arc;

fn root_in(graph: &ConfigGraph, uid: &str) -> Result<ComponentId> {
    let id = graph
        .find(uid)
        .ok_or_else(|| DalError::SessionNotFound(uid.to_owned()))?;
    if graph.get(id)?.is_session() {
        Ok(id)
    } else {
        Err(DalError::NotASession(uid.to_owned()))
    }
}

/// Open session of a configuration store
#[derive(Debug)]
pub struct Session {
    store: Arc<ConfigStore>,
    uid: String,
    config: ResolverConfig,
    state: Arc<DisabledComponents>,
    action: ActionId,
}

impl Session {
    /// Open the session object `uid` with default limits
    ///
    /// # Errors
    /// Returns [`DalError::SessionNotFound`] or [`DalError::NotASession`]
    pub fn open(store: Arc<ConfigStore>, uid: &str) -> Result<Self> {
        Self::open_with_config(store, uid, ResolverConfig::default())
    }

    /// Open the session object `uid` with custom limits
    ///
    /// # Errors
    /// Returns error if the config is invalid or `uid` is not a session
    pub fn open_with_config(store: Arc<ConfigStore>, uid: &str, config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        root_in(&store.snapshot(), uid)?;

        let state = Arc::new(DisabledComponents::new(uid));
        let action = store.add_action(state.clone());
        tracing::debug!(session = uid, "session opened");

        Ok(Self {
            store,
            uid: uid.to_owned(),
            config,
            state,
            action,
        })
    }

    /// Session uid
    #[inline]
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Limits in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Resolver state of this session
    #[inline]
    #[must_use]
    pub fn state(&self) -> &DisabledComponents {
        &self.state
    }

    /// Id of the session object in the current snapshot
    ///
    /// # Errors
    /// Returns error if the session was removed by a reload
    pub fn root(&self) -> Result<ComponentId> {
        root_in(&self.store.snapshot(), &self.uid)
    }

    /// Id of `uid` in the current snapshot
    #[must_use]
    pub fn find(&self, uid: &str) -> Option<ComponentId> {
        self.store.snapshot().find(uid)
    }

    /// Resolved disabled set, rebuilt if the cache is empty
    ///
    /// # Errors
    /// Returns [`DalError::CircularDependency`] if the containment walk overflows
    pub fn resolution(&self) -> Result<Arc<Resolution>> {
        self.state.resolution(
            || self.store.snapshot(),
            |graph| root_in(graph, &self.uid),
            &self.config,
        )
    }

    /// Whether `component` is disabled in this session
    ///
    /// # Errors
    /// Returns [`DalError::UnknownComponent`] for an id outside the current
    /// snapshot, or a resolution failure
    pub fn is_disabled(&self, component: ComponentId) -> Result<bool> {
        self.is_disabled_with(component, false)
    }

    /// Whether `component` is disabled
    ///
    /// The resolution is built first in both modes. With
    /// `skip_user_override` the answer is plain membership in it and
    /// `component` is not looked up in the current snapshot.
    ///
    /// # Errors
    /// See [`Session::is_disabled`]
    pub fn is_disabled_with(&self, component: ComponentId, skip_user_override: bool) -> Result<bool> {
        let resolution = self.resolution()?;
        if !skip_user_override {
            self.store.snapshot().get(component)?;
        }
        Ok(resolution.is_disabled(component))
    }

    /// Negation of [`Session::is_disabled`]
    ///
    /// # Errors
    /// See [`Session::is_disabled`]
    pub fn is_enabled(&self, component: ComponentId) -> Result<bool> {
        self.is_disabled(component).map(|d| !d)
    }

    /// Replace the user-disabled set; an empty slice clears it
    pub fn set_disabled(&self, components: &[ComponentId]) {
        self.state.set_disabled(components.iter().copied());
    }

    /// Replace the user-enabled set; an empty slice clears it
    pub fn set_enabled(&self, components: &[ComponentId]) {
        self.state.set_enabled(components.iter().copied());
    }

    /// Drop the cached result, keeping user overrides
    pub fn reset(&self) {
        self.state.reset();
    }

    /// Every containment route from the session top level to `component`
    ///
    /// # Errors
    /// Returns [`DalError::CannotGetParents`] if the walk fails
    pub fn get_parents(&self, component: ComponentId) -> Result<Vec<ParentPath>> {
        let graph = self.store.snapshot();
        let root = root_in(&graph, &self.uid)?;
        parents::get_parents(&graph, component, root, &self.config)
    }

    /// Session applications followed by the applications of every segment,
    /// depth first, without duplicates
    ///
    /// # Errors
    /// Returns [`DalError::CircularDependency`] on a segment cycle
    pub fn all_applications(&self) -> Result<Vec<ComponentId>> {
        fn walk(
            graph: &ConfigGraph,
            guard: &mut CircularDependencyGuard<'_>,
            segment: ComponentId,
            out: &mut IndexSet<ComponentId>,
        ) -> Result<()> {
            guard.enter(segment)?;
            out.extend(graph.applications(segment).iter().copied());
            let nested = graph
                .segments(segment)
                .iter()
                .try_for_each(|&s| walk(graph, guard, s, out));
            guard.exit();
            nested
        }

        let graph = self.store.snapshot();
        let root = root_in(&graph, &self.uid)?;
        let mut guard =
            CircularDependencyGuard::new(&graph, "session applications", root, self.config.max_recursion_depth);
        let mut out: IndexSet<ComponentId> = graph.applications(root).iter().copied().collect();
        for &segment in graph.segments(root) {
            walk(&graph, &mut guard, segment, &mut out)?;
        }
        Ok(out.into_iter().collect())
    }

    /// Stats of the cached resolution
    #[must_use]
    pub fn stats(&self) -> Option<ResolutionStats> {
        self.state.stats()
    }

    /// Number of rebuilds run by this session
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.state.rebuild_count()
    }

    /// Size of the user-enabled plus the user-disabled set
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.state.override_count()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.store.remove_action(self.action);
        tracing::debug!(session = %self.uid, "session closed");
    }
}
