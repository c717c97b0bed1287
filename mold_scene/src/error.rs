use std::fmt::{Display, Formatter};

/// Parse failure in a `.scn` source, tagged with the 1-based line it was detected on.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneError {
    pub line: usize,
    pub message: String,
}

impl SceneError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl Display for SceneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SceneError {}
