mod node_arena;
mod scene_loader;
mod world;

pub use node_arena::NodeArena;
pub use scene_loader::SceneLoadError;
pub use world::{HierarchyError, World};
