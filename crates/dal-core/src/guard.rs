//! Circular-dependency guard
//!
//! A bounded recursion stack shared by one graph walk. Every descent into a
//! component is bracketed by [`CircularDependencyGuard::enter`] and
//! [`CircularDependencyGuard::exit`]; once the stack is full the walk is
//! assumed to be looping and fails with [`DalError::CircularDependency`].

use crate::error::{DalError, Result};
use crate::graph::ConfigGraph;
use crate::types::ComponentId;

/// Bounded recursion stack for one resolution or search
#[derive(Debug)]
pub struct CircularDependencyGuard<'g> {
    graph: &'g ConfigGraph,
    goal: &'static str,
    limit: usize,
    path: Vec<ComponentId>,
}

impl<'g> CircularDependencyGuard<'g> {
    /// Start a walk at `first` (normally the session)
    ///
    /// `first` occupies one slot of `limit`.
    #[must_use]
    pub fn new(graph: &'g ConfigGraph, goal: &'static str, first: ComponentId, limit: usize) -> Self {
        let mut path = Vec::with_capacity(limit.min(128));
        path.push(first);
        Self {
            graph,
            goal,
            limit,
            path,
        }
    }

    /// Push a component onto the recursion path
    ///
    /// # Errors
    /// Returns [`DalError::CircularDependency`] with the current path if the
    /// path already holds `limit` components
    pub fn enter(&mut self, id: ComponentId) -> Result<()> {
        if self.path.len() < self.limit {
            self.path.push(id);
            return Ok(());
        }

        Err(DalError::CircularDependency {
            limit: self.limit,
            goal: self.goal,
            path: self.path.iter().map(|&c| self.graph.uid(c)).collect(),
        })
    }

    /// Pop the most recently entered component
    #[inline]
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Current number of components on the path
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Current path, outermost first
    #[inline]
    #[must_use]
    pub fn path(&self) -> &[ComponentId] {
        &self.path
    }

    /// What the walk is computing
    #[inline]
    #[must_use]
    pub fn goal(&self) -> &'static str {
        self.goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn graph() -> ConfigGraph {
        let mut b = GraphBuilder::new();
        b.session("R", &["S"], &[], &[]).segment("S", &["S"], &[], &[]);
        b.build().unwrap()
    }

    #[test]
    fn enter_and_exit_are_paired() {
        let g = graph();
        let r = g.find("R").unwrap();
        let s = g.find("S").unwrap();
        let mut guard = CircularDependencyGuard::new(&g, "test", r, 4);

        guard.enter(s).unwrap();
        guard.enter(s).unwrap();
        assert_eq!(guard.depth(), 3);
        guard.exit();
        guard.exit();
        assert_eq!(guard.path(), &[r]);
    }

    #[test]
    fn overflow_reports_full_path() {
        let g = graph();
        let r = g.find("R").unwrap();
        let s = g.find("S").unwrap();
        let mut guard = CircularDependencyGuard::new(&g, "component parents", r, 3);

        guard.enter(s).unwrap();
        guard.enter(s).unwrap();
        let err = guard.enter(s).unwrap_err();

        match err {
            DalError::CircularDependency { limit, goal, path } => {
                assert_eq!(limit, 3);
                assert_eq!(goal, "component parents");
                assert_eq!(path, vec!["R", "S", "S"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // a failed enter leaves the stack untouched
        assert_eq!(guard.depth(), 3);
    }
}
