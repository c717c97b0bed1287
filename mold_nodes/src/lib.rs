mod capability;
mod scene_node;

pub use capability::{Capabilities, Capability};
pub use scene_node::SceneNode;

#[cfg(test)]
mod tests {
    use super::*;
    use mold_ids::NodeID;

    #[test]
    fn capability_parse_is_exact() {
        assert_eq!(Capability::parse("RangedWeapon"), Some(Capability::RangedWeapon));
        assert_eq!(Capability::parse("MeleeWeapon"), Some(Capability::MeleeWeapon));
        assert_eq!(Capability::parse("meleeweapon"), None);
        assert_eq!(Capability::parse("Shield"), None);
    }

    #[test]
    fn capabilities_set_ops() {
        let mut set = Capabilities::empty();
        assert!(set.is_empty());
        set.insert(Capability::MeleeWeapon);
        assert!(set.contains(Capability::MeleeWeapon));
        assert!(!set.contains(Capability::RangedWeapon));
        set.insert(Capability::RangedWeapon);
        assert_eq!(set.iter().count(), 2);
        set.remove(Capability::MeleeWeapon);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Capability::RangedWeapon]);
    }

    #[test]
    fn insert_child_clamps_index() {
        let mut node = SceneNode::new("Parent");
        let a = NodeID::from_parts(1, 0);
        let b = NodeID::from_parts(2, 0);
        let c = NodeID::from_parts(3, 0);
        node.add_child(a);
        node.insert_child(0, b);
        node.insert_child(99, c);
        assert_eq!(node.children_slice(), &[b, a, c]);
        assert_eq!(node.remove_child(a), Some(1));
        assert_eq!(node.child_index(c), Some(1));
        assert_eq!(node.remove_child(a), None);
    }
}
