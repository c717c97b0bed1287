pub mod error;
pub mod lexer;
pub mod parser;
pub mod scene;
pub mod writer;

pub use error::SceneError;
pub use lexer::*;
pub use parser::*;
pub use scene::*;
pub use writer::{format_value, write_scene};
