//! Work item data structures.
//!
//! Defines the backlog unit the engine plans over: identifiers, kinds and
//! the work item itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, unique work item identifier (e.g., "PROJ-12").
///
/// Identifiers order lexicographically; every deterministic tie-break in the
/// engine relies on this ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(String);

impl WorkItemId {
    /// Create a new identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorkItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for WorkItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Work item kind.
///
/// Informational only; the engine uses it for default sizing, for picking the
/// kind of split children, and in the shared-component heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    /// Large initiative spanning several iterations.
    Epic,

    /// User-facing capability.
    Feature,

    /// Iteration-sized slice of a feature.
    #[default]
    Story,

    /// Technical groundwork that unlocks other items.
    Enabler,
}

impl WorkItemKind {
    /// Default size in points for a newly created item of this kind.
    pub fn default_size(self) -> u32 {
        match self {
            Self::Epic => 13,
            Self::Feature => 8,
            Self::Story => 3,
            Self::Enabler => 2,
        }
    }

    /// Kind given to the children when an item of this kind is split.
    pub fn child_kind(self) -> Self {
        match self {
            Self::Epic => Self::Feature,
            Self::Feature | Self::Story => Self::Story,
            Self::Enabler => Self::Enabler,
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epic => write!(f, "Epic"),
            Self::Feature => write!(f, "Feature"),
            Self::Story => write!(f, "Story"),
            Self::Enabler => write!(f, "Enabler"),
        }
    }
}

/// A unit of backlog work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier.
    pub id: WorkItemId,

    /// Short title.
    pub title: String,

    /// Free-text description, mined for dependency cues.
    #[serde(default)]
    pub description: String,

    /// Size in points.
    pub size: u32,

    /// Ordered acceptance criteria.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,

    /// Item this one was split from. Set once by the decomposer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<WorkItemId>,

    /// Item kind.
    #[serde(default)]
    pub kind: WorkItemKind,

    /// Component tags (e.g., "billing-api").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,

    /// Whether the item must land inside the planning interval.
    #[serde(default)]
    pub mandatory: bool,
}

impl WorkItem {
    /// Create a new work item sized with the kind's default size.
    pub fn new(id: impl Into<WorkItemId>, title: impl Into<String>, kind: WorkItemKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            size: kind.default_size(),
            acceptance_criteria: Vec::new(),
            parent_id: None,
            kind,
            components: Vec::new(),
            mandatory: false,
        }
    }

    /// Create a story with an explicit size.
    pub fn story(id: impl Into<WorkItemId>, size: u32) -> Self {
        let id = id.into();
        let title = id.to_string();
        Self::new(id, title, WorkItemKind::Story).with_size(size)
    }

    /// Set the size.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the acceptance criteria.
    #[must_use]
    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    /// Add a component tag.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Mark the item as mandatory for the planning interval.
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Item this one was split from, if any.
    pub fn parent_id(&self) -> Option<&WorkItemId> {
        self.parent_id.as_ref()
    }

    /// Build a child of `self`. Only the decomposer creates children.
    pub(crate) fn split_child(
        &self,
        id: WorkItemId,
        title: String,
        size: u32,
        acceptance_criteria: Vec<String>,
    ) -> Self {
        Self {
            id,
            title,
            description: self.description.clone(),
            size,
            acceptance_criteria,
            parent_id: Some(self.id.clone()),
            kind: self.kind.child_kind(),
            components: self.components.clone(),
            mandatory: self.mandatory,
        }
    }

    /// Text searched by dependency heuristics.
    pub fn searchable_text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_new_uses_kind_default_size() {
        let epic = WorkItem::new("E-1", "Checkout revamp", WorkItemKind::Epic);
        assert_eq!(epic.size, 13);
        assert_eq!(epic.parent_id(), None);
        assert!(!epic.mandatory);

        let enabler = WorkItem::new("N-1", "Provision queue", WorkItemKind::Enabler);
        assert_eq!(enabler.size, 2);
    }

    #[test]
    fn test_work_item_builders() {
        let item = WorkItem::story("S-1", 4)
            .with_description("Depends on S-0")
            .with_criteria(["a", "b"])
            .with_component("billing")
            .mandatory();

        assert_eq!(item.size, 4);
        assert_eq!(item.acceptance_criteria, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(item.components, vec!["billing".to_string()]);
        assert!(item.mandatory);
        assert!(item.searchable_text().contains("Depends on S-0"));
    }

    #[test]
    fn test_child_kind() {
        assert_eq!(WorkItemKind::Epic.child_kind(), WorkItemKind::Feature);
        assert_eq!(WorkItemKind::Feature.child_kind(), WorkItemKind::Story);
        assert_eq!(WorkItemKind::Enabler.child_kind(), WorkItemKind::Enabler);
    }

    #[test]
    fn test_work_item_id_ordering() {
        let mut ids = vec![WorkItemId::from("B"), WorkItemId::from("A"), WorkItemId::from("AA")];
        ids.sort();
        assert_eq!(ids, vec![WorkItemId::from("A"), WorkItemId::from("AA"), WorkItemId::from("B")]);
    }

    #[test]
    fn test_work_item_deserialize_defaults() {
        let json = r#"{"id": "S-9", "title": "Export CSV", "size": 2}"#;
        let item: WorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "S-9");
        assert_eq!(item.kind, WorkItemKind::Story);
        assert!(item.acceptance_criteria.is_empty());
        assert_eq!(item.parent_id(), None);
    }
}
