//! Parent path enumeration
//!
//! Finds every containment route from the top level of a session down to a
//! target component. A route lists the containers from the outermost
//! segment or resource set to the direct parent of the target; a target that
//! is itself top level yields the empty route.

use crate::config::ResolverConfig;
use crate::error::{DalError, Result};
use crate::graph::ConfigGraph;
use crate::guard::CircularDependencyGuard;
use crate::types::ComponentId;

const GOAL: &str = "component parents";

/// One route, outermost container first
pub type ParentPath = Vec<ComponentId>;

struct ParentSearch<'g> {
    graph: &'g ConfigGraph,
    guard: CircularDependencyGuard<'g>,
    target: ComponentId,
    target_is_segment: bool,
    found: Vec<ParentPath>,
}

impl<'g> ParentSearch<'g> {
    fn descend(&mut self, id: ComponentId, walk: fn(&mut Self, ComponentId) -> Result<()>) -> Result<()> {
        self.guard.enter(id)?;
        let out = walk(self, id);
        self.guard.exit();
        out
    }

    fn record(&mut self) {
        // slot 0 of the guard path is the session itself
        self.found.push(self.guard.path()[1..].to_vec());
    }

    fn session(&mut self, root: ComponentId) -> Result<()> {
        let graph = self.graph;
        for &segment in graph.segments(root) {
            if segment == self.target {
                self.record();
            } else {
                self.descend(segment, Self::segment)?;
            }
        }
        for &app in graph.applications(root) {
            if !graph.component(app).is_some_and(|c| c.is_resource_set()) {
                continue;
            }
            if app == self.target {
                self.record();
            } else {
                self.descend(app, Self::resource_set)?;
            }
        }
        Ok(())
    }

    fn segment(&mut self, id: ComponentId) -> Result<()> {
        let graph = self.graph;
        for &nested in graph.segments(id) {
            if nested == self.target {
                self.record();
            } else {
                self.descend(nested, Self::segment)?;
            }
        }

        // a segment is never an application or a resource
        if self.target_is_segment {
            return Ok(());
        }
        for &child in graph.applications(id).iter().chain(graph.resources(id)) {
            self.member(child)?;
        }
        Ok(())
    }

    fn resource_set(&mut self, id: ComponentId) -> Result<()> {
        let graph = self.graph;
        for &child in graph.contains(id) {
            self.member(child)?;
        }
        Ok(())
    }

    fn member(&mut self, id: ComponentId) -> Result<()> {
        if id == self.target {
            self.record();
            Ok(())
        } else if self.graph.component(id).is_some_and(|c| c.is_resource_set()) {
            self.descend(id, Self::resource_set)
        } else {
            Ok(())
        }
    }
}

fn search(
    graph: &ConfigGraph,
    target: ComponentId,
    root: ComponentId,
    config: &ResolverConfig,
) -> Result<Vec<ParentPath>> {
    let target_is_segment = graph.get(target)?.is_segment();
    let session = graph.get(root)?;
    if !session.is_session() {
        return Err(DalError::NotASession(session.uid().to_owned()));
    }

    let mut search = ParentSearch {
        graph,
        guard: CircularDependencyGuard::new(graph, GOAL, root, config.max_recursion_depth),
        target,
        target_is_segment,
        found: Vec::new(),
    };
    search.session(root)?;
    Ok(search.found)
}

/// Every containment route from session `root` to `target`
///
/// Routes start at a top-level segment or a top-level resource-set
/// application. A target reachable through several containers is reported
/// once per route. An unreachable target gives an empty list.
///
/// # Errors
/// Returns [`DalError::CannotGetParents`] wrapping the underlying failure,
/// typically a [`DalError::CircularDependency`]
pub fn get_parents(
    graph: &ConfigGraph,
    target: ComponentId,
    root: ComponentId,
    config: &ResolverConfig,
) -> Result<Vec<ParentPath>> {
    let found = search(graph, target, root, config).map_err(|source| DalError::CannotGetParents {
        object: graph.uid(target),
        source: Box::new(source),
    })?;

    if found.is_empty() {
        tracing::warn!(
            component = %graph.uid(target),
            session = %graph.uid(root),
            "cannot find any parent of component"
        );
    }
    Ok(found)
}
