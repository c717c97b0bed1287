use ahash::{AHashMap, AHashSet};
use mold_ids::NodeID;
use mold_nodes::{Capabilities, Capability, SceneNode};
use mold_scene::{Scene, SceneEntry, SceneNodeData, SceneValue};
use mold_structs::{Transform3D, is_default_position, is_default_rotation, is_default_scale};
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

use crate::world::{Authored, HierarchyError, World};

#[derive(Debug, Clone, PartialEq)]
pub enum SceneLoadError {
    /// The document has no node that could serve as its root.
    NoRoot,
    /// Entries whose parent chain never reaches a top-level node.
    Unreachable(Vec<String>),
    Hierarchy(HierarchyError),
}

impl Display for SceneLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRoot => write!(f, "scene has no root node"),
            Self::Unreachable(keys) => {
                write!(f, "scene nodes form a parent cycle: {}", keys.join(", "))
            }
            Self::Hierarchy(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SceneLoadError {}

impl From<HierarchyError> for SceneLoadError {
    fn from(err: HierarchyError) -> Self {
        Self::Hierarchy(err)
    }
}

const TRANSFORM_FIELDS: [&str; 3] = ["position", "rotation", "scale"];

fn prepare_node(entry: &SceneEntry) -> SceneNode {
    let mut node = SceneNode::new(entry.display_name().to_string());
    node.ty = Cow::Owned(entry.data.ty.clone());
    node.transform = entry.data.transform();
    node.script = entry.script.clone().map(Cow::Owned);
    node.capabilities = entry
        .capabilities
        .iter()
        .filter_map(|raw| {
            let parsed = Capability::parse(raw);
            if parsed.is_none() {
                log::warn!("node `{}`: ignoring unknown capability `{raw}`", entry.key);
            }
            parsed
        })
        .collect::<Capabilities>();
    node
}

impl World {
    /// Merge every top-level node of `scene` under the engine root, declared root first.
    /// Returns the scene's primary root.
    pub fn load_scene(&mut self, scene: &Scene) -> Result<NodeID, SceneLoadError> {
        let primary = scene.root_entry().ok_or(SceneLoadError::NoRoot)?;

        let mut top_level: Vec<&SceneEntry> = vec![primary];
        top_level.extend(
            scene
                .nodes
                .iter()
                .filter(|e| e.parent.is_none() && e.key != primary.key),
        );

        let mut visited = AHashSet::with_capacity(scene.nodes.len());
        let root = self.root();
        let mut spawned = Vec::with_capacity(top_level.len());
        for entry in top_level {
            match self.spawn_entry(scene, entry, root, usize::MAX, &mut visited) {
                Ok(id) => spawned.push(id),
                Err(err) => {
                    for id in spawned {
                        let _ = self.remove_subtree(id);
                    }
                    return Err(err);
                }
            }
        }

        if visited.len() < scene.nodes.len() {
            let stranded: Vec<String> = scene
                .nodes
                .iter()
                .filter(|e| !visited.contains(e.key.as_str()))
                .map(|e| e.key.clone())
                .collect();
            for id in spawned {
                let _ = self.remove_subtree(id);
            }
            return Err(SceneLoadError::Unreachable(stranded));
        }

        log::debug!("loaded scene with {} nodes", scene.nodes.len());
        spawned.first().copied().ok_or(SceneLoadError::NoRoot)
    }

    /// Spawn the root subtree of `scene` under `parent` at sibling `index`.
    /// The new root remembers `source` as the template it came from.
    pub fn instantiate(
        &mut self,
        scene: &Scene,
        parent: NodeID,
        index: usize,
        source: Option<&str>,
    ) -> Result<NodeID, SceneLoadError> {
        if !self.contains(parent) {
            return Err(HierarchyError::UnknownNode(parent).into());
        }
        let root_entry = scene.root_entry().ok_or(SceneLoadError::NoRoot)?;
        let mut visited = AHashSet::with_capacity(scene.nodes.len());
        let id = self.spawn_entry(scene, root_entry, parent, index, &mut visited)?;
        if let Some(node) = self.get_mut(id) {
            node.source_template = source.map(str::to_string);
        }
        Ok(id)
    }

    /// Spawns `entry` and its subtree. On failure nothing spawned by this call is left behind.
    fn spawn_entry<'s>(
        &mut self,
        scene: &'s Scene,
        entry: &'s SceneEntry,
        parent: NodeID,
        index: usize,
        visited: &mut AHashSet<&'s str>,
    ) -> Result<NodeID, SceneLoadError> {
        if !visited.insert(entry.key.as_str()) {
            return Err(SceneLoadError::Unreachable(vec![entry.key.clone()]));
        }
        let id = self.insert_node(parent, index, prepare_node(entry))?;
        self.authored.insert(
            id,
            Authored {
                key: entry.key.clone(),
                data: entry.data.clone(),
            },
        );
        for child in scene.children_of(&entry.key) {
            if let Err(err) = self.spawn_entry(scene, child, id, usize::MAX, visited) {
                let _ = self.remove_subtree(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Serialize the hierarchy under `from` back into a scene document.
    /// Passing the engine root writes every top-level node.
    pub fn to_scene(&self, from: NodeID) -> Option<Scene> {
        if !self.contains(from) {
            return None;
        }
        let tops: Vec<NodeID> = if from == self.root() {
            self.children(from).to_vec()
        } else {
            vec![from]
        };

        let mut keys: AHashMap<NodeID, String> = AHashMap::default();
        let mut taken: AHashSet<String> = AHashSet::default();
        let mut scene = Scene::default();

        for top in tops {
            for id in self.descendants(top) {
                let Some(node) = self.get(id) else {
                    continue;
                };
                let key = self.unique_key(id, node, &mut taken);
                let parent = if id == top {
                    None
                } else {
                    keys.get(&node.parent).cloned()
                };
                keys.insert(id, key.clone());

                if scene.root.is_none() {
                    scene.root = Some(key.clone());
                }
                scene.nodes.push(SceneEntry {
                    name: (node.name != key).then(|| node.name.to_string()),
                    key,
                    parent,
                    script: node.script.as_ref().map(|s| s.to_string()),
                    capabilities: node
                        .capabilities
                        .iter()
                        .map(|c| c.as_str().to_string())
                        .collect(),
                    data: self.node_data(id, node),
                });
            }
        }
        Some(scene)
    }

    fn unique_key(&self, id: NodeID, node: &SceneNode, taken: &mut AHashSet<String>) -> String {
        let base = match self.authored.get(&id) {
            Some(authored) => authored.key.clone(),
            None => sanitize_key(&node.name),
        };
        let mut key = base.clone();
        let mut suffix = 2;
        while taken.contains(&key) {
            key = format!("{base}_{suffix}");
            suffix += 1;
        }
        taken.insert(key.clone());
        key
    }

    fn node_data(&self, id: NodeID, node: &SceneNode) -> SceneNodeData {
        let mut data = match self.authored.get(&id) {
            Some(authored) => authored.data.clone(),
            None => SceneNodeData::default(),
        };
        data.ty = node.ty.to_string();
        strip_transform(&mut data);
        write_transform_deepest(&mut data, &node.transform);
        data
    }
}

fn sanitize_key(name: &str) -> String {
    let key: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string();
    if key.is_empty() || key.starts_with(|c: char| c.is_ascii_digit()) {
        format!("node_{key}")
    } else {
        key
    }
}

fn strip_transform(data: &mut SceneNodeData) {
    data.fields
        .retain(|(k, _)| !TRANSFORM_FIELDS.contains(&k.as_str()) && k != "rotation_deg");
    if let Some(base) = data.base.as_deref_mut() {
        strip_transform(base);
    }
}

/// Transform fields live on the innermost base block, where `Node3D` sits.
fn write_transform_deepest(data: &mut SceneNodeData, t: &Transform3D) {
    match data.base.as_deref_mut() {
        Some(base) => write_transform_deepest(base, t),
        None => write_transform(data, t),
    }
}

fn write_transform(data: &mut SceneNodeData, t: &Transform3D) {
    if !is_default_position(&t.position) {
        let p = t.position;
        data.fields.push((
            "position".to_string(),
            SceneValue::Vec3 {
                x: p.x,
                y: p.y,
                z: p.z,
            },
        ));
    }
    if !is_default_rotation(&t.rotation) {
        let q = t.rotation;
        data.fields.push((
            "rotation".to_string(),
            SceneValue::Vec4 {
                x: q.x,
                y: q.y,
                z: q.z,
                w: q.w,
            },
        ));
    }
    if !is_default_scale(&t.scale) {
        let s = t.scale;
        data.fields.push((
            "scale".to_string(),
            SceneValue::Vec3 {
                x: s.x,
                y: s.y,
                z: s.z,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mold_scene::parse_scene;
    use mold_structs::Vector3;

    const ARMORY: &str = r#"
@root = armory

[armory]
[Node3D]
    position = (0, 1, 0)
[/Node3D]
[/armory]

[katana]
parent = armory
name = "Katana(Clone)"
capabilities = [MeleeWeapon, Shield]
[MeshInstance3D]
    mesh = "res://meshes/katana.glb"
    [Node3D]
        position = (0.02, 0, 0)
    [/Node3D]
[/MeshInstance3D]
[/katana]

[pistol]
parent = armory
capabilities = [RangedWeapon]
[/pistol]

[grip]
parent = katana
[/grip]
"#;

    #[test]
    fn load_scene_builds_hierarchy_in_file_order() {
        let scene = parse_scene(ARMORY).unwrap();
        let mut world = World::new();
        let armory = world.load_scene(&scene).unwrap();

        assert_eq!(world.parent_of(armory), Some(world.root()));
        let children = world.children(armory).to_vec();
        assert_eq!(children.len(), 2);

        let katana = world.get(children[0]).unwrap();
        assert_eq!(katana.name, "Katana(Clone)");
        assert_eq!(katana.ty, "MeshInstance3D");
        assert!(katana.carries(Capability::MeleeWeapon));
        assert!(!katana.carries(Capability::RangedWeapon));
        assert_eq!(katana.transform.position, Vector3::new(0.02, 0.0, 0.0));
        assert_eq!(world.children(children[0]).len(), 1);

        let pistol = world.get(children[1]).unwrap();
        assert_eq!(pistol.name, "pistol");
        assert!(pistol.carries(Capability::RangedWeapon));
    }

    #[test]
    fn instantiate_places_template_root_at_index() {
        let scene = parse_scene(ARMORY).unwrap();
        let mut world = World::new();
        let armory = world.load_scene(&scene).unwrap();

        let template = parse_scene("[katana]\n[Node3D]\nscale = (2, 2, 2)\n[/Node3D]\n[/katana]\n[blade]\nparent = katana\n[/blade]\n").unwrap();
        let id = world
            .instantiate(&template, armory, 1, Some("Katana"))
            .unwrap();
        assert_eq!(world.sibling_index(id), Some(1));
        let node = world.get(id).unwrap();
        assert_eq!(node.source_template.as_deref(), Some("Katana"));
        assert_eq!(node.transform.scale, Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(world.children(id).len(), 1);
    }

    #[test]
    fn load_scene_rejects_parent_cycles() {
        let mut scene = parse_scene("[a]\n[/a]\n[b]\n[/b]\n[c]\n[/c]\n").unwrap();
        scene.nodes[1].parent = Some("c".into());
        scene.nodes[2].parent = Some("b".into());
        let mut world = World::new();
        assert_eq!(
            world.load_scene(&scene),
            Err(SceneLoadError::Unreachable(vec!["b".into(), "c".into()]))
        );
        assert_eq!(world.children(world.root()).len(), 0);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn failed_instantiate_leaves_world_untouched() {
        let scene = parse_scene(ARMORY).unwrap();
        let mut world = World::new();
        let armory = world.load_scene(&scene).unwrap();
        let before = world.len();
        let children_before = world.children(armory).to_vec();

        // a root that lists itself as parent reaches its own key twice
        let mut template = parse_scene("@root = a\n[a]\n[/a]\n[b]\nparent = a\n[/b]\n").unwrap();
        template.nodes[0].parent = Some("a".into());
        let err = world.instantiate(&template, armory, 0, Some("A")).unwrap_err();
        assert_eq!(err, SceneLoadError::Unreachable(vec!["a".into()]));

        assert_eq!(world.len(), before);
        assert_eq!(world.children(armory), children_before.as_slice());
        assert!(world.find_by_name("a").is_none());
    }

    #[test]
    fn failed_load_removes_already_spawned_top_levels() {
        let mut scene = parse_scene("[a]\n[/a]\n[b]\n[/b]\n[c]\nparent = b\n[/c]\n").unwrap();
        let duplicate = scene.nodes[1].clone();
        scene.nodes.push(duplicate);
        let mut world = World::new();
        assert_eq!(
            world.load_scene(&scene),
            Err(SceneLoadError::Unreachable(vec!["b".into()]))
        );
        assert_eq!(world.children(world.root()).len(), 0);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn snapshot_preserves_edits_and_unmodelled_fields() {
        let scene = parse_scene(ARMORY).unwrap();
        let mut world = World::new();
        let armory = world.load_scene(&scene).unwrap();
        let katana = world.children(armory)[0];
        world.set_transform(katana, Transform3D::from_position(Vector3::new(5.0, 0.0, 0.0)));

        let written = world.to_scene(world.root()).unwrap();
        assert_eq!(written.root.as_deref(), Some("armory"));
        let entry = written.entry("katana").unwrap();
        assert_eq!(entry.display_name(), "Katana(Clone)");
        assert_eq!(entry.parent.as_deref(), Some("armory"));
        assert_eq!(entry.capabilities, vec!["MeleeWeapon".to_string()]);
        assert_eq!(
            entry.data.field("mesh"),
            Some(&SceneValue::Str("res://meshes/katana.glb".into()))
        );
        assert_eq!(entry.data.transform().position, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(written.nodes.len(), scene.nodes.len());
    }

    #[test]
    fn snapshot_dedupes_colliding_keys() {
        let mut world = World::new();
        let root = world.root();
        let a = world.add_node(root, SceneNode::new("Crate 1")).unwrap();
        world.add_node(a, SceneNode::new("Crate 1")).unwrap();
        world.add_node(a, SceneNode::new("9lives")).unwrap();

        let scene = world.to_scene(a).unwrap();
        let keys: Vec<&str> = scene.nodes.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Crate_1", "Crate_1_2", "node_9lives"]);
        assert_eq!(scene.nodes[1].parent.as_deref(), Some("Crate_1"));
        assert_eq!(scene.nodes[1].display_name(), "Crate 1");
    }
}
