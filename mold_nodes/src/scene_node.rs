use mold_ids::NodeID;
use mold_structs::Transform3D;
use std::borrow::Cow;

use crate::{Capabilities, Capability};

/// A live node in the working hierarchy.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: Cow<'static, str>,
    /// Type block the node was authored with (`Node3D`, `MeshInstance3D`, ...).
    pub ty: Cow<'static, str>,
    pub parent: NodeID,
    children: Vec<NodeID>,
    pub transform: Transform3D,
    pub capabilities: Capabilities,
    pub script: Option<Cow<'static, str>>,
    /// Catalog name of the template this node was instantiated from, if any.
    pub source_template: Option<String>,
}

impl SceneNode {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: Cow::Borrowed("Node3D"),
            parent: NodeID::nil(),
            children: Vec::new(),
            transform: Transform3D::default(),
            capabilities: Capabilities::empty(),
            script: None,
            source_template: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform3D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn node_type(&self) -> &str {
        &self.ty
    }

    pub fn children_slice(&self) -> &[NodeID] {
        &self.children
    }

    pub fn add_child(&mut self, child: NodeID) {
        self.children.push(child);
    }

    /// Insert `child` at `index`, clamped to the end of the child list.
    pub fn insert_child(&mut self, index: usize, child: NodeID) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    pub fn remove_child(&mut self, child: NodeID) -> Option<usize> {
        let index = self.children.iter().position(|c| *c == child)?;
        self.children.remove(index);
        Some(index)
    }

    pub fn child_index(&self, child: NodeID) -> Option<usize> {
        self.children.iter().position(|c| *c == child)
    }

    pub fn carries(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }
}
