//! Inventory store interface and the in-memory Ansible-shaped inventory
//!
//! The store holds named groups, hosts with variables, and parent -> child
//! edges where a child is either a group or a host. A host may belong to
//! any number of groups.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::warn;

use crate::device::AttrValue;

/// Implicit group that contains every top-level group
pub const ALL_GROUP: &str = "all";

/// Implicit group for hosts that belong to no other group
pub const UNGROUPED_GROUP: &str = "ungrouped";

/// Top-level key holding host variables in `--list` output
pub const META_KEY: &str = "_meta";

/// Names a stored group cannot use in `--list` output
pub fn is_reserved_name(name: &str) -> bool {
    matches!(name, ALL_GROUP | UNGROUPED_GROUP | META_KEY)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("{0} is not a known group")]
    UnknownGroup(String),
    #[error("{0} is not a known group nor host")]
    UnknownEntity(String),
    #[error("{0} is not a known host")]
    UnknownHost(String),
    #[error("adding {child} to {parent} would create a group cycle")]
    Cycle { parent: String, child: String },
}

/// Operations the synchronization engine writes into
pub trait InventoryStore {
    /// Register a group. Registering an existing name is a no-op.
    fn add_group(&mut self, name: &str);

    /// Register a host, optionally directly under `group`
    fn add_host(&mut self, name: &str, group: Option<&str>) -> Result<(), InventoryError>;

    /// Attach `child` (group or host) under group `parent`
    fn add_child(&mut self, parent: &str, child: &str) -> Result<(), InventoryError>;

    fn set_variable(&mut self, host: &str, name: &str, value: AttrValue)
        -> Result<(), InventoryError>;

    fn has_host(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct GroupEntry {
    hosts: Vec<String>,
    children: Vec<String>,
    parents: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct HostEntry {
    vars: BTreeMap<String, AttrValue>,
    groups: BTreeSet<String>,
}

/// In-memory inventory
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    groups: BTreeMap<String, GroupEntry>,
    hosts: BTreeMap<String, HostEntry>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Hosts directly in a group
    pub fn group_hosts(&self, group: &str) -> Vec<&str> {
        self.groups
            .get(group)
            .map(|g| g.hosts.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Child groups directly under a group
    pub fn group_children(&self, group: &str) -> Vec<&str> {
        self.groups
            .get(group)
            .map(|g| g.children.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Groups a host is directly a member of
    pub fn host_groups(&self, host: &str) -> Vec<&str> {
        self.hosts
            .get(host)
            .map(|h| h.groups.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn host_vars(&self, host: &str) -> Option<&BTreeMap<String, AttrValue>> {
        self.hosts.get(host).map(|h| &h.vars)
    }

    /// Whether `ancestor` is `group` or lies above it
    fn is_ancestor(&self, ancestor: &str, group: &str) -> bool {
        let mut pending = vec![group];
        let mut seen = BTreeSet::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(entry) = self.groups.get(current) {
                pending.extend(entry.parents.iter().map(String::as_str));
            }
        }
        false
    }

    fn attach_host(&mut self, group: &str, host: &str) {
        if let Some(entry) = self.groups.get_mut(group) {
            if !entry.hosts.iter().any(|h| h == host) {
                entry.hosts.push(host.to_string());
            }
        }
        if let Some(entry) = self.hosts.get_mut(host) {
            entry.groups.insert(group.to_string());
        }
    }

    /// Host variables keyed by host, as `--host` prints them
    pub fn host_vars_json(&self, host: &str) -> Option<Value> {
        self.host_vars(host).map(|vars| json!(vars))
    }

    /// Render in the `ansible-inventory --list` layout
    ///
    /// Groups named `all`, `ungrouped` or `_meta` would overwrite the
    /// implicit entries and are left out with a warning. Their child groups
    /// become top-level and hosts left with no other group are listed under
    /// `ungrouped`.
    pub fn to_list_json(&self) -> Value {
        for name in self.groups.keys().filter(|name| is_reserved_name(name)) {
            warn!(group = %name, "Leaving out group with a reserved inventory name");
        }
        let mut root = Map::new();

        let hostvars: Map<String, Value> = self
            .hosts
            .iter()
            .map(|(name, host)| (name.clone(), json!(host.vars)))
            .collect();
        root.insert(META_KEY.to_string(), json!({ "hostvars": hostvars }));

        let mut top_level: Vec<String> = self
            .groups
            .iter()
            .filter(|(name, g)| {
                !is_reserved_name(name) && g.parents.iter().all(|p| is_reserved_name(p))
            })
            .map(|(name, _)| name.clone())
            .collect();
        top_level.push(UNGROUPED_GROUP.to_string());
        root.insert(ALL_GROUP.to_string(), json!({ "children": top_level }));

        for (name, group) in self.groups.iter().filter(|(name, _)| !is_reserved_name(name)) {
            let mut entry = Map::new();
            if !group.hosts.is_empty() {
                entry.insert("hosts".to_string(), json!(group.hosts));
            }
            let children: Vec<&String> = group
                .children
                .iter()
                .filter(|c| !is_reserved_name(c))
                .collect();
            if !children.is_empty() {
                entry.insert("children".to_string(), json!(children));
            }
            root.insert(name.clone(), Value::Object(entry));
        }

        let ungrouped: Vec<&String> = self
            .hosts
            .iter()
            .filter(|(_, h)| h.groups.iter().all(|g| is_reserved_name(g)))
            .map(|(name, _)| name)
            .collect();
        let mut entry = Map::new();
        if !ungrouped.is_empty() {
            entry.insert("hosts".to_string(), json!(ungrouped));
        }
        root.insert(UNGROUPED_GROUP.to_string(), Value::Object(entry));

        Value::Object(root)
    }
}
