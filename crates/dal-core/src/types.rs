//! Core types for DAL
//!
//! Components live in an arena owned by [`ConfigGraph`](crate::graph::ConfigGraph)
//! and are addressed by [`ComponentId`]. Containment edges are id lists stored
//! in the component's [`ComponentKind`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of a component within one graph snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Arena slot
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boolean collapse rule of a resource set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetRule {
    /// Disabled once every member is disabled
    And,
    /// Disabled as soon as any member is disabled
    Or,
}

/// Variant of a component, carrying its outgoing containment edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// Leaf component (application, resource, module...)
    Plain,
    /// Resource set with ordered members
    ResourceSet {
        /// Collapse rule
        rule: SetRule,
        /// Direct members
        contains: Vec<ComponentId>,
    },
    /// Segment of the containment hierarchy
    Segment {
        /// Nested segments
        segments: Vec<ComponentId>,
        /// Applications of this segment
        applications: Vec<ComponentId>,
        /// Resources of this segment
        resources: Vec<ComponentId>,
    },
    /// Root of a configuration
    Session {
        /// Top-level segments
        segments: Vec<ComponentId>,
        /// Top-level applications
        applications: Vec<ComponentId>,
        /// Persisted disabled list
        disabled: Vec<ComponentId>,
    },
}

/// A configuration object: uid, declared class and variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub(crate) uid: String,
    pub(crate) class: String,
    pub(crate) kind: ComponentKind,
}

impl Component {
    /// Unique name
    #[inline]
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Declared class name
    #[inline]
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Variant and edges
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Collapse rule, if this is a resource set
    #[inline]
    #[must_use]
    pub fn set_rule(&self) -> Option<SetRule> {
        match self.kind {
            ComponentKind::ResourceSet { rule, .. } => Some(rule),
            _ => None,
        }
    }

    /// True for AND and OR resource sets
    #[inline]
    #[must_use]
    pub fn is_resource_set(&self) -> bool {
        self.set_rule().is_some()
    }

    /// True for segments
    #[inline]
    #[must_use]
    pub fn is_segment(&self) -> bool {
        matches!(self.kind, ComponentKind::Segment { .. })
    }

    /// True for sessions
    #[inline]
    #[must_use]
    pub fn is_session(&self) -> bool {
        matches!(self.kind, ComponentKind::Session { .. })
    }

    /// Members of a resource set; empty otherwise
    #[must_use]
    pub fn contains(&self) -> &[ComponentId] {
        match &self.kind {
            ComponentKind::ResourceSet { contains, .. } => contains.as_slice(),
            _ => &[],
        }
    }

    /// Nested segments of a segment or session; empty otherwise
    #[must_use]
    pub fn segments(&self) -> &[ComponentId] {
        match &self.kind {
            ComponentKind::Segment { segments, .. } | ComponentKind::Session { segments, .. } => {
                segments.as_slice()
            }
            _ => &[],
        }
    }

    /// Applications of a segment or session; empty otherwise
    #[must_use]
    pub fn applications(&self) -> &[ComponentId] {
        match &self.kind {
            ComponentKind::Segment { applications, .. }
            | ComponentKind::Session { applications, .. } => applications.as_slice(),
            _ => &[],
        }
    }

    /// Resources of a segment; empty otherwise
    #[must_use]
    pub fn resources(&self) -> &[ComponentId] {
        match &self.kind {
            ComponentKind::Segment { resources, .. } => resources.as_slice(),
            _ => &[],
        }
    }

    /// Persisted disabled list of a session; empty otherwise
    #[must_use]
    pub fn disabled(&self) -> &[ComponentId] {
        match &self.kind {
            ComponentKind::Session { disabled, .. } => disabled.as_slice(),
            _ => &[],
        }
    }

    /// Components whose disablement follows from this one's
    ///
    /// Members of a resource set; nested segments, applications and
    /// resources of a segment. Sessions and plain components have none.
    pub fn descendants(&self) -> impl Iterator<Item = ComponentId> + '_ {
        const NONE: &[ComponentId] = &[];
        let (a, b, c) = match &self.kind {
            ComponentKind::ResourceSet { contains, .. } => (contains.as_slice(), NONE, NONE),
            ComponentKind::Segment {
                segments,
                applications,
                resources,
            } => (
                segments.as_slice(),
                applications.as_slice(),
                resources.as_slice(),
            ),
            ComponentKind::Plain | ComponentKind::Session { .. } => (NONE, NONE, NONE),
        };
        a.iter().chain(b).chain(c).copied()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}@{}'", self.uid, self.class)
    }
}
