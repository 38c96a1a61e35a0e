//! Disabled-component resolution
//!
//! [`resolve`] computes, for one session of one graph snapshot, the set of
//! disabled components:
//!
//! 1. classify every resource set reachable from the session into OR-sets
//!    and AND-sets (the walk runs under a [`CircularDependencyGuard`]);
//! 2. seed with `user_disabled`, then with the persisted disabled list
//!    minus `user_enabled`; a disabled container disables its descendants;
//! 3. repeat propagation passes until a pass disables nothing new:
//!    an OR-set is disabled as soon as any member is disabled, a non-empty
//!    AND-set once all members are disabled.
//!
//! [`DisabledComponents`] is the per-session cache of that result together
//! with the user override sets. Invalidation bumps an epoch; a rebuild that
//! started before the bump is not committed.

use crate::config::ResolverConfig;
use crate::error::{DalError, Result};
use crate::graph::{ConfigGraph, Relationship};
use crate::guard::CircularDependencyGuard;
use crate::notify::{ConfigAction, ConfigurationChange};
use crate::types::{ComponentId, SetRule};
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const GOAL: &str = "component 'is-disabled' status";

/// Outcome summary of one rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionStats {
    /// Propagation passes run (0 when nothing was seeded)
    pub passes: usize,
    /// Number of disabled components
    pub disabled: usize,
    /// False if the pass limit was hit before a fixed point
    pub converged: bool,
}

/// Resolved disabled set of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    disabled: HashSet<ComponentId>,
    stats: ResolutionStats,
}

impl Resolution {
    /// Membership test
    #[inline]
    #[must_use]
    pub fn is_disabled(&self, id: ComponentId) -> bool {
        self.disabled.contains(&id)
    }

    /// Number of disabled components
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.disabled.len()
    }

    /// True when nothing is disabled
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty()
    }

    /// Disabled ids, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.disabled.iter().copied()
    }

    /// Rebuild summary
    #[inline]
    #[must_use]
    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }
}

/// Resource sets reachable from a session, by rule, in discovery order
#[derive(Debug, Default)]
struct Classified {
    or_sets: IndexSet<ComponentId>,
    and_sets: IndexSet<ComponentId>,
}

struct Classifier<'g> {
    graph: &'g ConfigGraph,
    guard: CircularDependencyGuard<'g>,
    finished: HashSet<ComponentId>,
    sets: Classified,
}

impl<'g> Classifier<'g> {
    fn descend(&mut self, id: ComponentId, walk: fn(&mut Self, ComponentId) -> Result<()>) -> Result<()> {
        self.guard.enter(id)?;
        let out = walk(self, id);
        self.guard.exit();
        out
    }

    fn session(&mut self, root: ComponentId) -> Result<()> {
        let graph = self.graph;
        for &segment in graph.segments(root) {
            self.descend(segment, Self::segment)?;
        }
        for &app in graph.applications(root) {
            self.descend(app, Self::member)?;
        }
        Ok(())
    }

    fn segment(&mut self, id: ComponentId) -> Result<()> {
        // Only finished nodes are skipped: a node still on the stack must be
        // walked again so that a cycle keeps growing the guard path.
        if self.finished.contains(&id) {
            return Ok(());
        }
        let graph = self.graph;
        for &app in graph.applications(id) {
            self.descend(app, Self::member)?;
        }
        for &res in graph.resources(id) {
            self.descend(res, Self::member)?;
        }
        for &nested in graph.segments(id) {
            self.descend(nested, Self::segment)?;
        }
        self.finished.insert(id);
        Ok(())
    }

    fn member(&mut self, id: ComponentId) -> Result<()> {
        let Some(rule) = self.graph.component(id).and_then(|c| c.set_rule()) else {
            return Ok(());
        };
        if self.finished.contains(&id) {
            return Ok(());
        }
        match rule {
            SetRule::And => self.sets.and_sets.insert(id),
            SetRule::Or => self.sets.or_sets.insert(id),
        };
        let graph = self.graph;
        for &m in graph.contains(id) {
            self.descend(m, Self::member)?;
        }
        self.finished.insert(id);
        Ok(())
    }
}

fn classify(graph: &ConfigGraph, root: ComponentId, config: &ResolverConfig) -> Result<Classified> {
    let mut classifier = Classifier {
        graph,
        guard: CircularDependencyGuard::new(graph, GOAL, root, config.max_recursion_depth),
        finished: HashSet::new(),
        sets: Classified::default(),
    };
    classifier.session(root)?;
    Ok(classifier.sets)
}

/// Disable `id` and everything it contains
///
/// Every component enters the set through this function, so a component
/// already present has had its descendants queued before.
fn disable(graph: &ConfigGraph, disabled: &mut HashSet<ComponentId>, id: ComponentId) {
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        if !disabled.insert(next) {
            continue;
        }
        if let Some(component) = graph.component(next) {
            stack.extend(component.descendants());
        }
    }
}

/// Compute the disabled set of session `root`
///
/// # Errors
/// - [`DalError::UnknownComponent`] / [`DalError::NotASession`] for a bad root
/// - [`DalError::CircularDependency`] if the containment walk overflows the guard
///
/// Hitting the pass limit is not an error: it is logged and the partial
/// result is returned with `converged == false`.
pub fn resolve(
    graph: &ConfigGraph,
    root: ComponentId,
    user_disabled: &BTreeSet<ComponentId>,
    user_enabled: &BTreeSet<ComponentId>,
    config: &ResolverConfig,
) -> Result<Resolution> {
    let session = graph.get(root)?;
    if !session.is_session() {
        return Err(DalError::NotASession(session.uid().to_owned()));
    }

    if session.disabled().is_empty() && user_disabled.is_empty() {
        tracing::debug!(session = session.uid(), "session has no disabled components");
        return Ok(Resolution {
            disabled: HashSet::new(),
            stats: ResolutionStats {
                passes: 0,
                disabled: 0,
                converged: true,
            },
        });
    }

    let sets = classify(graph, root, config)?;
    tracing::debug!(
        session = session.uid(),
        or_sets = sets.or_sets.len(),
        and_sets = sets.and_sets.len(),
        "classified resource sets"
    );

    let mut disabled = HashSet::new();

    for &id in user_disabled {
        tracing::debug!(component = %graph.uid(id), "disabled: explicitly disabled by user");
        disable(graph, &mut disabled, id);
    }
    for &id in session.disabled() {
        if user_enabled.contains(&id) {
            tracing::debug!(component = %graph.uid(id), "skipped: enabled by user");
        } else {
            tracing::debug!(component = %graph.uid(id), "disabled: disabled in session");
            disable(graph, &mut disabled, id);
        }
    }

    let mut passes = 0;
    let mut converged = false;
    // at most `max_iterations` passes, the quiet pass that confirms the
    // fixed point included
    while passes < config.max_iterations {
        passes += 1;
        let before = disabled.len();

        for &set in &sets.or_sets {
            if disabled.contains(&set) {
                continue;
            }
            let lost = graph.contains(set).iter().copied().find(|m| disabled.contains(m));
            if let Some(member) = lost {
                tracing::debug!(
                    set = %graph.uid(set),
                    member = %graph.uid(member),
                    "disabled: resource-set-OR lost a member"
                );
                disable(graph, &mut disabled, set);
            }
        }

        for &set in &sets.and_sets {
            if disabled.contains(&set) {
                continue;
            }
            let members = graph.contains(set);
            if !members.is_empty() && members.iter().all(|m| disabled.contains(m)) {
                tracing::debug!(set = %graph.uid(set), "disabled: all members of resource-set-AND are disabled");
                disable(graph, &mut disabled, set);
            }
        }

        if disabled.len() == before {
            converged = true;
            break;
        }
    }

    if converged {
        tracing::debug!(passes, "auto-disabling reached a fixed point");
    } else {
        let err = DalError::MaxIterationsExceeded {
            limit: config.max_iterations,
        };
        tracing::error!(session = session.uid(), "{err}");
    }

    let stats = ResolutionStats {
        passes,
        disabled: disabled.len(),
        converged,
    };
    Ok(Resolution { disabled, stats })
}

#[derive(Debug, Default)]
struct OverrideState {
    resolved: Option<Arc<Resolution>>,
    epoch: u64,
    user_disabled: BTreeSet<ComponentId>,
    user_enabled: BTreeSet<ComponentId>,
}

/// Per-session resolved cache and user overrides
///
/// Registered with the store as a [`ConfigAction`]: every store event
/// drops the cache and the overrides.
#[derive(Debug)]
pub struct DisabledComponents {
    session: String,
    state: Mutex<OverrideState>,
    rebuilds: AtomicU64,
}

impl DisabledComponents {
    /// Empty state for the named session
    #[must_use]
    pub fn new(session: impl Into<String>) -> Self {
        let session = session.into();
        tracing::debug!(session = %session, "construct disabled-components state");
        Self {
            session,
            state: Mutex::new(OverrideState::default()),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Session uid this state belongs to
    #[inline]
    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Cached resolution, rebuilding it from `snapshot` when missing
    ///
    /// `snapshot` is only called after the invalidation epoch has been read,
    /// so a graph change that lands during the rebuild always discards it.
    ///
    /// # Errors
    /// See [`resolve`]; on error the cache is left unset
    pub fn resolution(
        &self,
        snapshot: impl FnOnce() -> Arc<ConfigGraph>,
        root: impl FnOnce(&ConfigGraph) -> Result<ComponentId>,
        config: &ResolverConfig,
    ) -> Result<Arc<Resolution>> {
        let (epoch, user_disabled, user_enabled) = {
            let state = self.state.lock();
            if let Some(resolved) = &state.resolved {
                return Ok(Arc::clone(resolved));
            }
            (state.epoch, state.user_disabled.clone(), state.user_enabled.clone())
        };

        let graph = snapshot();
        let root = root(&graph)?;
        let resolved = Arc::new(resolve(&graph, root, &user_disabled, &user_enabled, config)?);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        if state.epoch == epoch {
            tracing::info!(
                session = %self.session,
                disabled = resolved.len(),
                passes = resolved.stats().passes,
                "disabled components resolved"
            );
            state.resolved = Some(Arc::clone(&resolved));
        } else {
            tracing::debug!(session = %self.session, "discarding resolution invalidated during rebuild");
        }
        Ok(resolved)
    }

    /// Stats of the committed resolution, if any
    #[must_use]
    pub fn stats(&self) -> Option<ResolutionStats> {
        self.state.lock().resolved.as_ref().map(|r| r.stats())
    }

    /// True when a resolution is cached
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state.lock().resolved.is_some()
    }

    /// Number of rebuilds run so far (committed or discarded)
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    /// Replace `user_disabled`; an empty set clears it
    pub fn set_disabled(&self, components: impl IntoIterator<Item = ComponentId>) {
        let mut state = self.state.lock();
        state.user_disabled = components.into_iter().collect();
        Self::invalidate(&mut state);
    }

    /// Replace `user_enabled`; an empty set clears it
    pub fn set_enabled(&self, components: impl IntoIterator<Item = ComponentId>) {
        let mut state = self.state.lock();
        state.user_enabled = components.into_iter().collect();
        Self::invalidate(&mut state);
    }

    /// Current `user_disabled`
    #[must_use]
    pub fn user_disabled(&self) -> BTreeSet<ComponentId> {
        self.state.lock().user_disabled.clone()
    }

    /// Current `user_enabled`
    #[must_use]
    pub fn user_enabled(&self) -> BTreeSet<ComponentId> {
        self.state.lock().user_enabled.clone()
    }

    /// Number of components named by the user overrides
    #[must_use]
    pub fn override_count(&self) -> usize {
        let state = self.state.lock();
        state.user_enabled.len() + state.user_disabled.len()
    }

    /// Drop the cache, keep the overrides
    pub fn reset(&self) {
        tracing::debug!(session = %self.session, "reset disabled by explicit user call");
        Self::invalidate(&mut self.state.lock());
    }

    /// Drop the cache and the overrides
    fn clear(&self, reason: &str) {
        tracing::debug!(session = %self.session, "reset session components because of {reason}");
        let mut state = self.state.lock();
        state.user_disabled.clear();
        state.user_enabled.clear();
        Self::invalidate(&mut state);
    }

    fn invalidate(state: &mut OverrideState) {
        state.epoch = state.epoch.wrapping_add(1);
        state.resolved = None;
    }
}

impl ConfigAction for DisabledComponents {
    fn load(&self) {
        self.clear("configuration load");
    }

    fn unload(&self) {
        self.clear("configuration unload");
    }

    fn update(&self, uid: &str, relationship: Relationship) {
        tracing::trace!(uid, %relationship, "update received");
        self.clear("configuration update");
    }

    fn notify(&self, changes: &[ConfigurationChange]) {
        tracing::trace!(batches = changes.len(), "notification received");
        self.clear("notification callback");
    }
}
