use mold_ids::NodeID;
use thiserror::Error;

/// Catalog lookups fail in two distinguishable ways: the name is not in the
/// catalog at all, or it is but the template behind it cannot be loaded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("no catalog entry named `{0}`")]
    NameNotFound(String),

    #[error("template `{name}` ({locator}) is unresolvable: {reason}")]
    TemplateUnresolvable {
        name: String,
        locator: String,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("{field} threshold must be finite and greater than zero, got {value}")]
    InvalidThreshold { field: &'static str, value: f32 },
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Threshold(#[from] ThresholdError),

    #[error("scan root {0} is not a live node")]
    UnknownRoot(NodeID),
}
