use mold_structs::{Quaternion, Transform3D, Vector3};

/// A parsed `.scn` document. Node order is file order; sibling order derives from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub root: Option<String>,
    pub nodes: Vec<SceneEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneEntry {
    pub key: String,
    pub name: Option<String>,     // display name
    pub parent: Option<String>,   // key reference
    pub script: Option<String>,   // res:// path to script
    pub capabilities: Vec<String>,
    pub data: SceneNodeData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNodeData {
    pub ty: String, // Node3D, MeshInstance3D, etc
    pub fields: Vec<(String, SceneValue)>,
    pub base: Option<Box<SceneNodeData>>,
}

impl Default for SceneNodeData {
    fn default() -> Self {
        Self {
            ty: "Node3D".to_string(),
            fields: Vec::new(),
            base: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneValue {
    Bool(bool),
    F32(f32),

    Vec2 { x: f32, y: f32 },
    Vec3 { x: f32, y: f32, z: f32 },
    Vec4 { x: f32, y: f32, z: f32, w: f32 },

    Str(String),
    Key(String),
    List(Vec<SceneValue>),
}

impl Scene {
    pub fn entry(&self, key: &str) -> Option<&SceneEntry> {
        self.nodes.iter().find(|n| n.key == key)
    }

    /// The declared `@root`, or the first entry without a parent.
    pub fn root_entry(&self) -> Option<&SceneEntry> {
        match self.root.as_deref() {
            Some(key) => self.entry(key),
            None => self.nodes.iter().find(|n| n.parent.is_none()),
        }
    }

    /// Children of `key` in file order.
    pub fn children_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SceneEntry> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent.as_deref() == Some(key))
    }
}

impl SceneEntry {
    /// Display name, defaulting to the scene key.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

impl SceneNodeData {
    /// Looks a field up on this block, then down the base chain.
    pub fn field(&self, name: &str) -> Option<&SceneValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .or_else(|| self.base.as_ref().and_then(|b| b.field(name)))
    }

    /// Local placement from `position`, `rotation` and `scale`, identity where absent.
    pub fn transform(&self) -> Transform3D {
        let mut transform = Transform3D::default();
        if let Some(SceneValue::Vec3 { x, y, z }) = self.field("position") {
            transform.position = Vector3::new(*x, *y, *z);
        }
        if let Some(SceneValue::Vec4 { x, y, z, w }) = self.field("rotation") {
            transform.rotation = Quaternion::new(*x, *y, *z, *w);
        }
        if let Some(SceneValue::Vec3 { x, y, z }) = self.field("scale") {
            transform.scale = Vector3::new(*x, *y, *z);
        }
        transform
    }
}
