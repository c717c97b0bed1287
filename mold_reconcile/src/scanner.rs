use mold_ids::NodeID;
use mold_nodes::{Capabilities, Capability, SceneNode};
use mold_runtime::World;
use mold_structs::Transform3D;
use serde::Serialize;

use crate::{
    catalog::{Catalog, TemplateSource},
    error::ReconcileError,
};

/// Which strategy picked a node up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Name,
    Capability,
    NameAndCapability,
}

/// A node the scanner considers reconcilable, captured at scan time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub node: NodeID,
    pub display_name: String,
    /// Catalog entry the cleaned name matched. `None` for capability-only hits ("found, unmapped").
    pub matched: Option<String>,
    pub via: MatchKind,
    pub capabilities: Capabilities,
    pub transform: Transform3D,
    pub parent: NodeID,
    pub sibling_index: usize,
}

impl Candidate {
    pub fn is_mapped(&self) -> bool {
        self.matched.is_some()
    }
}

/// Strip every occurrence of the instantiated-copy marker and surrounding whitespace.
pub fn clean_name(name: &str, marker: &str) -> String {
    if marker.is_empty() {
        return name.trim().to_string();
    }
    name.replace(marker, "").trim().to_string()
}

fn reconcilable_capability(node: &SceneNode) -> bool {
    Capability::ALL.into_iter().any(|c| node.carries(c))
}

/// Depth-first pre-order walk below `root` (exclusive), in sibling order.
/// Every node is visited once, so the name/capability union is identity-deduplicated.
pub fn scan<S: TemplateSource>(
    world: &World,
    root: NodeID,
    catalog: &Catalog<S>,
    clone_marker: &str,
) -> Result<Vec<Candidate>, ReconcileError> {
    if !world.contains(root) {
        return Err(ReconcileError::UnknownRoot(root));
    }

    let mut candidates = Vec::new();
    for id in world.descendants(root).into_iter().skip(1) {
        let Some(node) = world.get(id) else {
            continue;
        };
        let cleaned = clean_name(&node.name, clone_marker);
        let by_name = catalog.contains(&cleaned);
        let by_capability = reconcilable_capability(node);

        let via = match (by_name, by_capability) {
            (true, true) => MatchKind::NameAndCapability,
            (true, false) => MatchKind::Name,
            (false, true) => MatchKind::Capability,
            (false, false) => continue,
        };

        log::debug!("candidate {id} `{}` via {via:?}", node.name);
        candidates.push(Candidate {
            node: id,
            display_name: node.name.to_string(),
            matched: by_name.then_some(cleaned),
            via,
            capabilities: node.capabilities,
            transform: node.transform,
            parent: node.parent,
            sibling_index: world.sibling_index(id).unwrap_or(0),
        });
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemorySource;
    use mold_structs::Vector3;

    fn catalog() -> Catalog<MemorySource> {
        Catalog::new([("Katana", "res://katana.scn")], MemorySource::new())
    }

    #[test]
    fn clean_name_strips_every_marker() {
        assert_eq!(clean_name("Katana(Clone)", "(Clone)"), "Katana");
        assert_eq!(clean_name("  Katana(Clone)(Clone) ", "(Clone)"), "Katana");
        assert_eq!(clean_name("Kat(Clone)ana", "(Clone)"), "Katana");
        assert_eq!(clean_name(" Katana ", ""), "Katana");
    }

    #[test]
    fn scan_unions_name_and_capability_matches_in_preorder() {
        let mut world = World::new();
        let root = world.root();
        let rack = world.add_node(root, SceneNode::new("Rack")).unwrap();
        let katana = world
            .add_node(
                rack,
                SceneNode::new("Katana(Clone)")
                    .with_transform(Transform3D::from_position(Vector3::ONE)),
            )
            .unwrap();
        let bow = world
            .add_node(rack, SceneNode::new("Bow").with_capability(Capability::RangedWeapon))
            .unwrap();
        let tagged = world
            .add_node(
                katana,
                SceneNode::new("Katana").with_capability(Capability::MeleeWeapon),
            )
            .unwrap();
        world.add_node(rack, SceneNode::new("katana")).unwrap();

        let found = scan(&world, root, &catalog(), "(Clone)").unwrap();
        let ids: Vec<NodeID> = found.iter().map(|c| c.node).collect();
        assert_eq!(ids, vec![katana, tagged, bow]);

        assert_eq!(found[0].matched.as_deref(), Some("Katana"));
        assert_eq!(found[0].via, MatchKind::Name);
        assert_eq!(found[0].transform.position, Vector3::ONE);
        assert_eq!(found[0].parent, rack);
        assert_eq!(found[0].sibling_index, 0);

        assert_eq!(found[1].via, MatchKind::NameAndCapability);

        assert_eq!(found[2].matched, None);
        assert_eq!(found[2].via, MatchKind::Capability);
        assert!(!found[2].is_mapped());
        assert_eq!(found[2].sibling_index, 1);
    }

    #[test]
    fn scan_root_is_never_a_candidate() {
        let mut world = World::new();
        let root = world.root();
        let katana = world.add_node(root, SceneNode::new("Katana")).unwrap();
        let inner = world.add_node(katana, SceneNode::new("Katana")).unwrap();

        let found = scan(&world, katana, &catalog(), "(Clone)").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].node, inner);
    }

    #[test]
    fn scan_is_idempotent() {
        let mut world = World::new();
        let root = world.root();
        world.add_node(root, SceneNode::new("Katana")).unwrap();
        let catalog = catalog();
        assert_eq!(
            scan(&world, root, &catalog, "(Clone)").unwrap(),
            scan(&world, root, &catalog, "(Clone)").unwrap()
        );
    }

    #[test]
    fn scan_rejects_dead_root() {
        let mut world = World::new();
        let root = world.root();
        let gone = world.add_node(root, SceneNode::new("gone")).unwrap();
        world.remove_subtree(gone).unwrap();
        assert!(matches!(
            scan(&world, gone, &catalog(), "(Clone)"),
            Err(ReconcileError::UnknownRoot(id)) if id == gone
        ));
    }
}
