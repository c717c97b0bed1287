use mold_ids::{NodeID, TransactionID};
use mold_structs::{Quaternion, Transform3D, Vector3};
use serde::{Deserialize, Serialize};

/// One primitive, individually reversible mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    SetPosition {
        node: NodeID,
        before: Vector3,
        after: Vector3,
    },
    SetRotation {
        node: NodeID,
        before: Quaternion,
        after: Quaternion,
    },
    SetScale {
        node: NodeID,
        before: Vector3,
        after: Vector3,
    },
    CreateNode {
        node: NodeID,
        parent: NodeID,
        sibling_index: usize,
        template: String,
        transform: Transform3D,
    },
    RemoveNode {
        node: NodeID,
        parent: NodeID,
        sibling_index: usize,
        name: String,
        transform: Transform3D,
    },
}

impl Edit {
    pub fn node(&self) -> NodeID {
        match self {
            Self::SetPosition { node, .. }
            | Self::SetRotation { node, .. }
            | Self::SetScale { node, .. }
            | Self::CreateNode { node, .. }
            | Self::RemoveNode { node, .. } => *node,
        }
    }
}

/// Every edit of one batch, in the order it was applied. Undoing the
/// transaction reverses the edits back to front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionID,
    pub label: String,
    pub edits: Vec<Edit>,
}

impl Transaction {
    pub fn new(id: TransactionID, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            edits: Vec::new(),
        }
    }

    pub fn record(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Receiver of finished transactions. Storage and undo playback are the host's business.
pub trait UndoHost {
    fn submit(&mut self, transaction: Transaction);
}

impl UndoHost for Vec<Transaction> {
    fn submit(&mut self, transaction: Transaction) {
        self.push(transaction);
    }
}

/// Encode a list of transactions as a JSON array.
pub fn journal_json(transactions: &[Transaction]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(transactions)
}
