//! Device groups and the id-keyed group index
//!
//! Prime returns groups as a flat list where each entry points at its
//! parent by id. The index is built first and edges are resolved against
//! it afterwards, since a parent may be listed after its children.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::device::ModelError;
use crate::sanitize::safe_group_name;

/// Row wrapper key for group entities
pub const GROUP_ROW_KEY: &str = "groupSpecificationDTO";

/// A group fetched from the `GroupSpecification` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteGroup {
    #[serde(rename = "@id")]
    pub id: i64,
    /// Display name
    #[serde(rename = "groupName")]
    pub name: String,
    /// Parent group id, 0 or absent for roots
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<i64>,
    /// Slash-delimited path used for group-scoped device queries
    #[serde(rename = "groupPath", default)]
    pub path: String,
}

impl RemoteGroup {
    /// Build a group from an `entity` row (`{"groupSpecificationDTO": {...}}`)
    pub fn from_entity(row: &Value) -> Result<Self, ModelError> {
        let dto = row
            .get(GROUP_ROW_KEY)
            .ok_or(ModelError::MissingRow(GROUP_ROW_KEY))?;
        Ok(RemoteGroup::deserialize(dto)?)
    }

    /// Parent id if this is not a root group
    pub fn parent(&self) -> Option<i64> {
        self.parent_id.filter(|id| *id > 0)
    }

    /// Inventory name for this group
    pub fn inventory_name(&self) -> String {
        safe_group_name(&self.name)
    }
}

/// A resolved parent -> child edge, both sides already sanitized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentEdge {
    pub parent: String,
    pub child: String,
}

/// A group whose parent id is not present in the index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("group `{child}` references unknown parent id {parent_id}")]
pub struct OrphanParent {
    pub child: String,
    pub parent_id: i64,
}

/// Groups keyed by their remote id. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    groups: BTreeMap<i64, RemoteGroup>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from raw `entity` rows
    pub fn from_entities(rows: &[Value]) -> Result<Self, ModelError> {
        let mut index = Self::new();
        for row in rows {
            index.insert(RemoteGroup::from_entity(row)?);
        }
        Ok(index)
    }

    /// Insert a group, replacing any previous entry with the same id
    pub fn insert(&mut self, group: RemoteGroup) {
        self.groups.insert(group.id, group);
    }

    pub fn get(&self, id: i64) -> Option<&RemoteGroup> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &RemoteGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Resolve the edge from `group` to its parent
    ///
    /// Returns `None` for root groups.
    pub fn resolve_edge(&self, group: &RemoteGroup) -> Option<Result<ParentEdge, OrphanParent>> {
        let parent_id = group.parent()?;
        let child = group.inventory_name();

        Some(match self.groups.get(&parent_id) {
            Some(parent) => Ok(ParentEdge {
                parent: parent.inventory_name(),
                child,
            }),
            None => Err(OrphanParent { child, parent_id }),
        })
    }

    /// Resolve every non-root group's edge, in index order
    pub fn edges(&self) -> Vec<Result<ParentEdge, OrphanParent>> {
        self.groups
            .values()
            .filter_map(|group| self.resolve_edge(group))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group_row(id: i64, name: &str, parent: Option<i64>, path: &str) -> Value {
        let mut dto = json!({"@id": id, "groupName": name, "groupPath": path});
        if let Some(parent) = parent {
            dto["parentId"] = json!(parent);
        }
        json!({ GROUP_ROW_KEY: dto })
    }

    #[test]
    fn test_index_from_entities() {
        // Child listed before its parent
        let rows = vec![
            group_row(20, "Branch Offices", Some(10), "Location/Branch Offices"),
            group_row(10, "Location", Some(0), "Location"),
            group_row(30, "Device Type", None, "Device Type"),
        ];
        let index = GroupIndex::from_entities(&rows).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.get(20).unwrap().path, "Location/Branch Offices");
        assert_eq!(index.get(10).unwrap().parent(), None);
        assert_eq!(index.get(30).unwrap().parent(), None);

        let edges = index.edges();
        assert_eq!(
            edges,
            vec![Ok(ParentEdge {
                parent: "Location".to_string(),
                child: "Branch_Offices".to_string(),
            })]
        );
    }

    #[test]
    fn test_orphan_parent() {
        let rows = vec![
            group_row(1, "Root", None, "Root"),
            group_row(2, "Lost", Some(99), "Root/Lost"),
        ];
        let index = GroupIndex::from_entities(&rows).unwrap();

        let lost = index.get(2).unwrap();
        assert_eq!(
            index.resolve_edge(lost),
            Some(Err(OrphanParent {
                child: "Lost".to_string(),
                parent_id: 99,
            }))
        );
        assert_eq!(index.resolve_edge(index.get(1).unwrap()), None);
    }

    #[test]
    fn test_malformed_group_row() {
        let rows = vec![json!({ GROUP_ROW_KEY: {"groupName": "no id"} })];
        assert!(matches!(
            GroupIndex::from_entities(&rows),
            Err(ModelError::MalformedGroup(_))
        ));

        let rows = vec![json!({"devicesDTO": {}})];
        assert!(matches!(
            GroupIndex::from_entities(&rows),
            Err(ModelError::MissingRow(GROUP_ROW_KEY))
        ));
    }
}
