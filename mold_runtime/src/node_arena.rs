use mold_ids::NodeID;
use mold_nodes::SceneNode;

/// Generational slot storage for live nodes. Removing a node bumps its slot's
/// generation, so ids captured before the removal resolve to `None` afterwards.
pub struct NodeArena {
    nodes: Vec<Option<SceneNode>>,
    generations: Vec<u32>,
    free_indices: Vec<usize>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        // Reserve index 0 as invalid/nil sentinel so first real node ID is 1.
        let mut nodes = Vec::with_capacity(capacity.saturating_add(1));
        let mut generations = Vec::with_capacity(capacity.saturating_add(1));
        nodes.push(None);
        generations.push(0);
        Self {
            nodes,
            generations,
            free_indices: Vec::new(),
        }
    }

    /// Insert a node, returns NodeID with index and generation
    pub fn insert(&mut self, node: SceneNode) -> NodeID {
        if let Some(index) = self.free_indices.pop() {
            self.nodes[index] = Some(node);
            let generation = self.generations[index];
            return NodeID::from_parts(index as u32, generation);
        }

        let index = self.nodes.len();
        self.nodes.push(Some(node));
        self.generations.push(0);
        NodeID::from_parts(index as u32, 0)
    }

    fn slot(&self, id: NodeID) -> Option<usize> {
        let index = id.index() as usize;
        if id.is_nil() || index == 0 || index >= self.nodes.len() {
            return None;
        }
        if self.generations[index] != id.generation() {
            return None;
        }
        Some(index)
    }

    /// Get a node by ID, returns None if generation doesn't match
    pub fn get(&self, id: NodeID) -> Option<&SceneNode> {
        self.slot(id).and_then(|index| self.nodes[index].as_ref())
    }

    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        self.slot(id).and_then(|index| self.nodes[index].as_mut())
    }

    /// Remove a node, bumping the generation counter
    pub fn remove(&mut self, id: NodeID) -> Option<SceneNode> {
        let index = self.slot(id)?;
        let removed = self.nodes[index].take();
        if removed.is_some() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_indices.push(index);
        }
        removed
    }

    pub fn contains(&self, id: NodeID) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeID, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(index, node)| {
                node.as_ref()
                    .map(|n| (NodeID::from_parts(index as u32, self.generations[index]), n))
            })
    }

    /// Number of active nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|n| n.is_none())
    }
}
