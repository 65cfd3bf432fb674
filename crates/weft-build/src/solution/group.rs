//! Hierarchical folders of the generated solution
//!
//! Nodes are filed by the parent segments of their hierarchical name under
//! one of two roots: one for workspace projects and one for projects of
//! fetched modules.

use super::NodeId;
use crate::identity::group_guid;
use serde::Serialize;
use std::collections::BTreeMap;
use weft_manifest::project::NAME_SEPARATOR;

/// Name of the root holding workspace projects
pub const LOCAL_ROOT: &str = "workspace";

/// Name of the root holding projects of fetched modules
pub const EXTERNAL_ROOT: &str = "external";

/// Index of a group in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(usize);

impl GroupId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A folder in the solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Last path segment
    pub name: String,
    /// Full path from the root, `/`-separated, root included
    pub path: String,
    /// Stable GUID derived from the path
    pub id: String,
    pub parent: Option<GroupId>,
    /// Child groups by name
    pub children: BTreeMap<String, GroupId>,
    /// Nodes filed directly in this group
    pub nodes: Vec<NodeId>,
}

impl Group {
    fn new(name: &str, parent: Option<(&Group, GroupId)>) -> Self {
        let path = match parent {
            Some((p, _)) => format!("{}/{}", p.path, name),
            None => name.to_string(),
        };
        Self {
            name: name.to_string(),
            id: group_guid(&path),
            path,
            parent: parent.map(|(_, id)| id),
            children: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }
}

/// Arena of groups with the two roots at fixed positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTree {
    groups: Vec<Group>,
}

impl GroupTree {
    pub fn new() -> Self {
        Self {
            groups: vec![Group::new(LOCAL_ROOT, None), Group::new(EXTERNAL_ROOT, None)],
        }
    }

    pub fn local_root(&self) -> GroupId {
        GroupId(0)
    }

    pub fn external_root(&self) -> GroupId {
        GroupId(1)
    }

    pub fn get(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &Group)> {
        self.groups.iter().enumerate().map(|(i, g)| (GroupId(i), g))
    }

    /// Child of `parent` named `name`, created on first use
    pub fn child(&mut self, parent: GroupId, name: &str) -> GroupId {
        if let Some(&id) = self.groups[parent.0].children.get(name) {
            return id;
        }
        let id = GroupId(self.groups.len());
        let group = Group::new(name, Some((&self.groups[parent.0], parent)));
        self.groups.push(group);
        self.groups[parent.0].children.insert(name.to_string(), id);
        id
    }

    /// File `node` under the group its name describes
    ///
    /// `engine/render/vulkan` lands in `<root>/engine/render`; a name with
    /// a single segment lands directly in the root.
    pub fn insert(&mut self, name: &str, external: bool, node: NodeId) -> GroupId {
        let mut group = if external {
            self.external_root()
        } else {
            self.local_root()
        };

        let segments: Vec<&str> = name.split(NAME_SEPARATOR).collect();
        if let Some((_, parents)) = segments.split_last() {
            for segment in parents {
                group = self.child(group, segment);
            }
        }

        self.groups[group.0].nodes.push(node);
        group
    }

    /// Group at `path` (root included), if it exists
    pub fn find(&self, path: &str) -> Option<GroupId> {
        let mut segments = path.split(NAME_SEPARATOR);
        let mut current = match segments.next()? {
            LOCAL_ROOT => self.local_root(),
            EXTERNAL_ROOT => self.external_root(),
            _ => return None,
        };
        for segment in segments {
            current = *self.groups[current.0].children.get(segment)?;
        }
        Some(current)
    }
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}
