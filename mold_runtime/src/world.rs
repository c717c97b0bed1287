use ahash::{AHashMap, AHashSet};
use mold_ids::NodeID;
use mold_nodes::SceneNode;
use mold_scene::SceneNodeData;
use mold_structs::Transform3D;
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

use crate::NodeArena;

/// Scene-file provenance of a node: the key it was authored under and its type
/// block, kept so the hierarchy can be written back without losing fields the
/// engine does not model.
#[derive(Debug, Clone)]
pub(crate) struct Authored {
    pub(crate) key: String,
    pub(crate) data: SceneNodeData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    UnknownNode(NodeID),
    RootIsFixed,
    Cycle { node: NodeID, parent: NodeID },
}

impl Display for HierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "node {id} does not exist"),
            Self::RootIsFixed => write!(f, "the world root cannot be moved or removed"),
            Self::Cycle { node, parent } => {
                write!(f, "parenting {node} under {parent} would create a cycle")
            }
        }
    }
}

impl std::error::Error for HierarchyError {}

/// The live, editable hierarchy. Every node hangs off a fixed engine root.
pub struct World {
    pub nodes: NodeArena,
    root: NodeID,
    dirty: AHashSet<NodeID>,
    pub(crate) authored: AHashMap<NodeID, Authored>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut nodes = NodeArena::new();
        let mut engine_root = SceneNode::new("Root");
        engine_root.ty = Cow::Borrowed("Node");
        let root = nodes.insert(engine_root);
        Self {
            nodes,
            root,
            dirty: AHashSet::default(),
            authored: AHashMap::default(),
        }
    }

    pub fn root(&self) -> NodeID {
        self.root
    }

    pub fn contains(&self, id: NodeID) -> bool {
        self.nodes.contains(id)
    }

    pub fn get(&self, id: NodeID) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Number of live nodes, engine root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent_of(&self, id: NodeID) -> Option<NodeID> {
        let parent = self.nodes.get(id)?.parent;
        (!parent.is_nil()).then_some(parent)
    }

    pub fn children(&self, id: NodeID) -> &[NodeID] {
        self.nodes
            .get(id)
            .map(SceneNode::children_slice)
            .unwrap_or(&[])
    }

    /// Position of `id` among its parent's children.
    pub fn sibling_index(&self, id: NodeID) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.nodes.get(parent)?.child_index(id)
    }

    /// Append `node` as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeID, node: SceneNode) -> Result<NodeID, HierarchyError> {
        self.insert_node(parent, usize::MAX, node)
    }

    /// Insert `node` under `parent` at `index` (clamped to the child count).
    pub fn insert_node(
        &mut self,
        parent: NodeID,
        index: usize,
        mut node: SceneNode,
    ) -> Result<NodeID, HierarchyError> {
        if !self.nodes.contains(parent) {
            return Err(HierarchyError::UnknownNode(parent));
        }
        node.parent = parent;
        let id = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.insert_child(index, id);
        }
        Ok(id)
    }

    pub fn is_ancestor(&self, ancestor: NodeID, id: NodeID) -> bool {
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    /// Distance from the engine root (root = 0).
    pub fn depth(&self, id: NodeID) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        let mut depth = 0;
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            depth += 1;
            current = self.parent_of(p);
        }
        Some(depth)
    }

    /// Move `id` under `parent` at `index`. Moving within the same parent reorders.
    pub fn set_parent(
        &mut self,
        id: NodeID,
        parent: NodeID,
        index: usize,
    ) -> Result<(), HierarchyError> {
        if id == self.root {
            return Err(HierarchyError::RootIsFixed);
        }
        if !self.contains(id) {
            return Err(HierarchyError::UnknownNode(id));
        }
        if !self.contains(parent) {
            return Err(HierarchyError::UnknownNode(parent));
        }
        if id == parent || self.is_ancestor(id, parent) {
            return Err(HierarchyError::Cycle { node: id, parent });
        }
        self.detach(id);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.insert_child(index, id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent;
        }
        Ok(())
    }

    pub fn set_sibling_index(&mut self, id: NodeID, index: usize) -> Result<(), HierarchyError> {
        let parent = self.parent_of(id).ok_or(HierarchyError::RootIsFixed)?;
        self.set_parent(id, parent, index)
    }

    fn detach(&mut self, id: NodeID) {
        if let Some(parent) = self.parent_of(id) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.remove_child(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = NodeID::nil();
        }
    }

    /// Pre-order walk of `id` and its descendants, in sibling order.
    pub fn descendants(&self, id: NodeID) -> Vec<NodeID> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Detach `id` and drop it together with its whole subtree. Returns the removed node count.
    pub fn remove_subtree(&mut self, id: NodeID) -> Result<usize, HierarchyError> {
        if id == self.root {
            return Err(HierarchyError::RootIsFixed);
        }
        if !self.contains(id) {
            return Err(HierarchyError::UnknownNode(id));
        }
        let doomed = self.descendants(id);
        self.detach(id);
        for node in &doomed {
            self.nodes.remove(*node);
            self.dirty.remove(node);
            self.authored.remove(node);
        }
        Ok(doomed.len())
    }

    pub fn set_transform(&mut self, id: NodeID, transform: Transform3D) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn mark_dirty(&mut self, id: NodeID) {
        if self.contains(id) {
            self.dirty.insert(id);
        }
    }

    pub fn is_dirty(&self, id: NodeID) -> bool {
        self.dirty.contains(&id)
    }

    /// True once any node has been edited since the last [`World::clear_dirty`].
    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Find a live node by display name, searching in pre-order from the root.
    pub fn find_by_name(&self, name: &str) -> Option<NodeID> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|n| n.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mold_structs::Vector3;

    fn world_with_children(names: &[&'static str]) -> (World, Vec<NodeID>) {
        let mut world = World::new();
        let root = world.root();
        let ids = names
            .iter()
            .map(|n| world.add_node(root, SceneNode::new(*n)).unwrap())
            .collect();
        (world, ids)
    }

    #[test]
    fn insert_respects_sibling_index() {
        let (mut world, ids) = world_with_children(&["a", "b"]);
        let root = world.root();
        let c = world.insert_node(root, 1, SceneNode::new("c")).unwrap();
        assert_eq!(world.children(root), &[ids[0], c, ids[1]]);
        assert_eq!(world.sibling_index(c), Some(1));
        assert_eq!(world.parent_of(c), Some(root));
    }

    #[test]
    fn set_parent_rejects_cycles_and_root() {
        let (mut world, ids) = world_with_children(&["a"]);
        let child = world.add_node(ids[0], SceneNode::new("child")).unwrap();
        assert_eq!(
            world.set_parent(ids[0], child, 0),
            Err(HierarchyError::Cycle {
                node: ids[0],
                parent: child
            })
        );
        let root = world.root();
        assert_eq!(world.set_parent(root, ids[0], 0), Err(HierarchyError::RootIsFixed));
    }

    #[test]
    fn set_sibling_index_reorders_within_parent() {
        let (mut world, ids) = world_with_children(&["a", "b", "c"]);
        world.set_sibling_index(ids[2], 0).unwrap();
        assert_eq!(world.children(world.root()), &[ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn remove_subtree_invalidates_all_descendants() {
        let (mut world, ids) = world_with_children(&["a", "b"]);
        let inner = world.add_node(ids[0], SceneNode::new("inner")).unwrap();
        world.mark_dirty(inner);

        assert_eq!(world.remove_subtree(ids[0]), Ok(2));
        assert!(!world.contains(ids[0]));
        assert!(!world.contains(inner));
        assert!(!world.is_dirty(inner));
        assert_eq!(world.children(world.root()), &[ids[1]]);
        assert_eq!(
            world.remove_subtree(ids[0]),
            Err(HierarchyError::UnknownNode(ids[0]))
        );
    }

    #[test]
    fn descendants_are_preorder_in_sibling_order() {
        let (mut world, ids) = world_with_children(&["a", "b"]);
        let a1 = world.add_node(ids[0], SceneNode::new("a1")).unwrap();
        let a2 = world.add_node(ids[0], SceneNode::new("a2")).unwrap();
        let a1x = world.add_node(a1, SceneNode::new("a1x")).unwrap();
        let root = world.root();
        assert_eq!(
            world.descendants(root),
            vec![root, ids[0], a1, a1x, a2, ids[1]]
        );
        assert_eq!(world.depth(a1x), Some(3));
        assert!(world.is_ancestor(ids[0], a1x));
        assert!(!world.is_ancestor(ids[1], a1x));
    }

    #[test]
    fn transform_edits_and_dirty_tracking() {
        let (mut world, ids) = world_with_children(&["a"]);
        assert!(!world.has_unsaved_changes());
        assert!(world.set_transform(ids[0], Transform3D::from_position(Vector3::ONE)));
        world.mark_dirty(ids[0]);
        assert!(world.is_dirty(ids[0]));
        assert_eq!(world.dirty_count(), 1);
        world.clear_dirty();
        assert!(!world.has_unsaved_changes());
        assert_eq!(world.find_by_name("a"), Some(ids[0]));
    }
}
