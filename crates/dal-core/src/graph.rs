//! Configuration graph
//!
//! [`ConfigGraph`] is an immutable arena of [`Component`]s built by
//! [`GraphBuilder`] from uid-based [`ComponentDef`]s. The same definitions
//! are the on-disk JSON format ([`GraphDocument`]).

use crate::error::{DalError, Result, StoreError};
use crate::types::{Component, ComponentId, ComponentKind, SetRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Named relationship of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Resource set members
    Contains,
    /// Nested segments of a segment or session
    Segments,
    /// Applications of a segment or session
    Applications,
    /// Resources of a segment
    Resources,
    /// Persisted disabled list of a session
    Disabled,
}

impl Relationship {
    /// Schema name of the relationship
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Segments => "segments",
            Self::Applications => "applications",
            Self::Resources => "resources",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only arena of components for one configuration snapshot
#[derive(Debug, Clone, Default)]
pub struct ConfigGraph {
    components: Vec<Component>,
    by_uid: HashMap<String, ComponentId>,
}

impl ConfigGraph {
    /// Empty graph (nothing loaded)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when nothing is loaded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component by id, if it exists in this snapshot
    #[inline]
    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.index())
    }

    /// Component by id, failing with [`DalError::UnknownComponent`]
    ///
    /// # Errors
    /// Returns error if `id` is not part of this snapshot
    #[inline]
    pub fn get(&self, id: ComponentId) -> Result<&Component> {
        self.component(id).ok_or(DalError::UnknownComponent(id))
    }

    /// Id of the component with the given uid
    #[inline]
    #[must_use]
    pub fn find(&self, uid: &str) -> Option<ComponentId> {
        self.by_uid.get(uid).copied()
    }

    /// Uid of a component, or its id rendered as `#n` when unknown
    #[must_use]
    pub fn uid(&self, id: ComponentId) -> String {
        self.component(id)
            .map_or_else(|| id.to_string(), |c| c.uid().to_owned())
    }

    /// Declared class of a component
    #[must_use]
    pub fn class_name(&self, id: ComponentId) -> Option<&str> {
        self.component(id).map(Component::class_name)
    }

    /// Variant of a component
    #[must_use]
    pub fn kind(&self, id: ComponentId) -> Option<&ComponentKind> {
        self.component(id).map(Component::kind)
    }

    /// Members of a resource set (empty for anything else or unknown ids)
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> &[ComponentId] {
        self.component(id).map(Component::contains).unwrap_or_default()
    }

    /// Nested segments of a segment or session
    #[must_use]
    pub fn segments(&self, id: ComponentId) -> &[ComponentId] {
        self.component(id).map(Component::segments).unwrap_or_default()
    }

    /// Applications of a segment or session
    #[must_use]
    pub fn applications(&self, id: ComponentId) -> &[ComponentId] {
        self.component(id).map(Component::applications).unwrap_or_default()
    }

    /// Resources of a segment
    #[must_use]
    pub fn resources(&self, id: ComponentId) -> &[ComponentId] {
        self.component(id).map(Component::resources).unwrap_or_default()
    }

    /// Persisted disabled list of a session
    #[must_use]
    pub fn disabled(&self, session: ComponentId) -> &[ComponentId] {
        self.component(session).map(Component::disabled).unwrap_or_default()
    }

    /// Ids of every session
    #[must_use]
    pub fn sessions(&self) -> Vec<ComponentId> {
        self.ids().filter(|&id| self.components[id.index()].is_session()).collect()
    }

    /// Ids of every component of the given declared class
    #[must_use]
    pub fn find_by_class(&self, class: &str) -> Vec<ComponentId> {
        self.ids()
            .filter(|&id| self.components[id.index()].class_name() == class)
            .collect()
    }

    /// All ids in arena order
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..self.components.len()).map(|i| ComponentId(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// Replace one relationship of a component
    pub(crate) fn set_relationship(
        &mut self,
        id: ComponentId,
        relationship: Relationship,
        values: Vec<ComponentId>,
    ) -> Result<(), StoreError> {
        let component = self
            .components
            .get_mut(id.index())
            .ok_or_else(|| StoreError::NotLoaded(id.to_string()))?;

        let slot = match (&mut component.kind, relationship) {
            (ComponentKind::ResourceSet { contains, .. }, Relationship::Contains) => contains,
            (
                ComponentKind::Segment { segments, .. } | ComponentKind::Session { segments, .. },
                Relationship::Segments,
            ) => segments,
            (
                ComponentKind::Segment { applications, .. }
                | ComponentKind::Session { applications, .. },
                Relationship::Applications,
            ) => applications,
            (ComponentKind::Segment { resources, .. }, Relationship::Resources) => resources,
            (ComponentKind::Session { disabled, .. }, Relationship::Disabled) => disabled,
            _ => {
                return Err(StoreError::WrongRelationship {
                    uid: component.uid.clone(),
                    relationship,
                })
            }
        };
        *slot = values;
        Ok(())
    }
}

/// Kind tag of a component definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefKind {
    /// Plain component
    #[default]
    Component,
    /// AND resource set
    ResourceSetAnd,
    /// OR resource set
    ResourceSetOr,
    /// Segment
    Segment,
    /// Session (root)
    Session,
}

impl DefKind {
    fn default_class(self) -> &'static str {
        match self {
            Self::Component => "Component",
            Self::ResourceSetAnd => "ResourceSetAND",
            Self::ResourceSetOr => "ResourceSetOR",
            Self::Segment => "Segment",
            Self::Session => "Session",
        }
    }

    fn has(self, relationship: Relationship) -> bool {
        matches!(
            (self, relationship),
            (Self::ResourceSetAnd | Self::ResourceSetOr, Relationship::Contains)
                | (
                    Self::Segment | Self::Session,
                    Relationship::Segments | Relationship::Applications
                )
                | (Self::Segment, Relationship::Resources)
                | (Self::Session, Relationship::Disabled)
        )
    }
}

/// Uid-based definition of one component
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Unique name
    pub uid: String,
    /// Declared class; defaults per kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Variant
    #[serde(default)]
    pub kind: DefKind,
    /// Resource set members
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    /// Nested segments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,
    /// Applications
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    /// Segment resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    /// Persisted disabled list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

impl ComponentDef {
    /// Definition with no relationships
    #[must_use]
    pub fn new(uid: impl Into<String>, kind: DefKind) -> Self {
        Self {
            uid: uid.into(),
            kind,
            ..Self::default()
        }
    }

    /// Override the declared class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    fn relationships(&self) -> [(Relationship, &[String]); 5] {
        [
            (Relationship::Contains, &self.contains),
            (Relationship::Segments, &self.segments),
            (Relationship::Applications, &self.applications),
            (Relationship::Resources, &self.resources),
            (Relationship::Disabled, &self.disabled),
        ]
    }
}

/// Serialized database: an ordered list of component definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Components in definition order
    pub components: Vec<ComponentDef>,
}

impl GraphDocument {
    /// Parse a JSON document
    ///
    /// # Errors
    /// Returns error if the text is not a valid document
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve uids into a graph
    ///
    /// # Errors
    /// See [`GraphBuilder::build`]
    pub fn into_graph(self) -> Result<ConfigGraph, StoreError> {
        let mut builder = GraphBuilder::new();
        for def in self.components {
            builder.add(def);
        }
        builder.build()
    }
}

/// Builder resolving uid references into a [`ConfigGraph`]
///
/// Definitions may reference uids defined later; references are resolved
/// in [`build`](Self::build).
///
/// ```rust
/// use dal_core::graph::GraphBuilder;
///
/// let mut builder = GraphBuilder::new();
/// builder
///     .plain("A")
///     .or_set("O", &["A"])
///     .session("R", &[], &["O"], &["A"]);
/// let graph = builder.build().unwrap();
/// assert_eq!(graph.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    defs: Vec<ComponentDef>,
}

impl GraphBuilder {
    /// Empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending definitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True when no definition was added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Add a raw definition
    pub fn add(&mut self, def: ComponentDef) -> &mut Self {
        self.defs.push(def);
        self
    }

    /// Add a plain component
    pub fn plain(&mut self, uid: &str) -> &mut Self {
        self.add(ComponentDef::new(uid, DefKind::Component))
    }

    /// Add an AND resource set
    pub fn and_set(&mut self, uid: &str, contains: &[&str]) -> &mut Self {
        let mut def = ComponentDef::new(uid, DefKind::ResourceSetAnd);
        def.contains = owned(contains);
        self.add(def)
    }

    /// Add an OR resource set
    pub fn or_set(&mut self, uid: &str, contains: &[&str]) -> &mut Self {
        let mut def = ComponentDef::new(uid, DefKind::ResourceSetOr);
        def.contains = owned(contains);
        self.add(def)
    }

    /// Add a segment
    pub fn segment(
        &mut self,
        uid: &str,
        segments: &[&str],
        applications: &[&str],
        resources: &[&str],
    ) -> &mut Self {
        let mut def = ComponentDef::new(uid, DefKind::Segment);
        def.segments = owned(segments);
        def.applications = owned(applications);
        def.resources = owned(resources);
        self.add(def)
    }

    /// Add a session
    pub fn session(
        &mut self,
        uid: &str,
        segments: &[&str],
        applications: &[&str],
        disabled: &[&str],
    ) -> &mut Self {
        let mut def = ComponentDef::new(uid, DefKind::Session);
        def.segments = owned(segments);
        def.applications = owned(applications);
        def.disabled = owned(disabled);
        self.add(def)
    }

    /// Resolve every definition
    ///
    /// # Errors
    /// - [`StoreError::DuplicateUid`] if a uid is defined twice
    /// - [`StoreError::DanglingReference`] if a relationship names an undefined uid
    /// - [`StoreError::WrongRelationship`] if a kind is given a relationship it does not have
    pub fn build(self) -> Result<ConfigGraph, StoreError> {
        let mut by_uid = HashMap::with_capacity(self.defs.len());
        for (i, def) in self.defs.iter().enumerate() {
            let id = ComponentId(u32::try_from(i).unwrap_or(u32::MAX));
            if by_uid.insert(def.uid.clone(), id).is_some() {
                return Err(StoreError::DuplicateUid(def.uid.clone()));
            }
        }

        let resolve = |def: &ComponentDef, uids: &[String]| -> Result<Vec<ComponentId>, StoreError> {
            uids.iter()
                .map(|to| {
                    by_uid.get(to).copied().ok_or_else(|| StoreError::DanglingReference {
                        from: def.uid.clone(),
                        to: to.clone(),
                    })
                })
                .collect()
        };

        let mut components = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            for (relationship, uids) in def.relationships() {
                if !uids.is_empty() && !def.kind.has(relationship) {
                    return Err(StoreError::WrongRelationship {
                        uid: def.uid.clone(),
                        relationship,
                    });
                }
            }

            let kind = match def.kind {
                DefKind::Component => ComponentKind::Plain,
                DefKind::ResourceSetAnd => ComponentKind::ResourceSet {
                    rule: SetRule::And,
                    contains: resolve(def, &def.contains)?,
                },
                DefKind::ResourceSetOr => ComponentKind::ResourceSet {
                    rule: SetRule::Or,
                    contains: resolve(def, &def.contains)?,
                },
                DefKind::Segment => ComponentKind::Segment {
                    segments: resolve(def, &def.segments)?,
                    applications: resolve(def, &def.applications)?,
                    resources: resolve(def, &def.resources)?,
                },
                DefKind::Session => ComponentKind::Session {
                    segments: resolve(def, &def.segments)?,
                    applications: resolve(def, &def.applications)?,
                    disabled: resolve(def, &def.disabled)?,
                },
            };

            components.push(Component {
                uid: def.uid.clone(),
                class: def
                    .class
                    .clone()
                    .unwrap_or_else(|| def.kind.default_class().to_owned()),
                kind,
            });
        }

        Ok(ConfigGraph { components, by_uid })
    }
}

fn owned(uids: &[&str]) -> Vec<String> {
    uids.iter().map(|s| (*s).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_resolves_forward_references() {
        let mut b = GraphBuilder::new();
        b.session("R", &["S"], &[], &["A"])
            .segment("S", &[], &["A"], &[])
            .plain("A");
        let g = b.build().unwrap();

        let r = g.find("R").unwrap();
        let s = g.find("S").unwrap();
        let a = g.find("A").unwrap();
        assert_eq!(g.segments(r), &[s]);
        assert_eq!(g.applications(s), &[a]);
        assert_eq!(g.disabled(r), &[a]);
        assert_eq!(g.sessions(), vec![r]);
        assert_eq!(g.class_name(s), Some("Segment"));
    }

    #[test]
    fn build_rejects_duplicate_uid() {
        let mut b = GraphBuilder::new();
        b.plain("A").plain("A");
        assert!(matches!(b.build(), Err(StoreError::DuplicateUid(uid)) if uid == "A"));
    }

    #[test]
    fn build_rejects_dangling_reference() {
        let mut b = GraphBuilder::new();
        b.or_set("O", &["missing"]);
        let err = b.build().unwrap_err();
        assert!(matches!(err, StoreError::DanglingReference { ref from, ref to } if from == "O" && to == "missing"));
    }

    #[test]
    fn build_rejects_misplaced_relationship() {
        let mut def = ComponentDef::new("A", DefKind::Component);
        def.contains = vec!["B".into()];
        let mut b = GraphBuilder::new();
        b.add(def).plain("B");
        assert!(matches!(
            b.build(),
            Err(StoreError::WrongRelationship {
                relationship: Relationship::Contains,
                ..
            })
        ));
    }

    #[test]
    fn custom_class_is_kept() {
        let mut b = GraphBuilder::new();
        b.add(ComponentDef::new("app", DefKind::ResourceSetAnd).with_class("DaqApplication"));
        let g = b.build().unwrap();
        let app = g.find("app").unwrap();
        assert_eq!(g.class_name(app), Some("DaqApplication"));
        assert_eq!(g.find_by_class("DaqApplication"), vec![app]);
        assert_eq!(g.get(app).unwrap().set_rule(), Some(SetRule::And));
    }

    #[test]
    fn document_parses_kind_tags() {
        let doc = GraphDocument::from_json(
            r#"{"components": [
                {"uid": "A"},
                {"uid": "O", "kind": "resource_set_or", "contains": ["A"]},
                {"uid": "R", "kind": "session", "applications": ["O"], "disabled": ["A"]}
            ]}"#,
        )
        .unwrap();
        let g = doc.into_graph().unwrap();
        let o = g.find("O").unwrap();
        assert_eq!(g.get(o).unwrap().set_rule(), Some(SetRule::Or));
        assert_eq!(g.contains(o), &[g.find("A").unwrap()]);
    }

    #[test]
    fn set_relationship_checks_kind() {
        let mut b = GraphBuilder::new();
        b.plain("A").and_set("N", &[]);
        let mut g = b.build().unwrap();
        let a = g.find("A").unwrap();
        let n = g.find("N").unwrap();

        g.set_relationship(n, Relationship::Contains, vec![a]).unwrap();
        assert_eq!(g.contains(n), &[a]);
        assert!(g.set_relationship(a, Relationship::Contains, vec![n]).is_err());
    }

    #[test]
    fn unknown_id_reads_as_empty() {
        let g = ConfigGraph::new();
        assert!(g.is_empty());
        assert!(g.contains(ComponentId(3)).is_empty());
        assert_eq!(g.uid(ComponentId(3)), "#3");
        assert!(matches!(g.get(ComponentId(3)), Err(DalError::UnknownComponent(_))));
    }
}
