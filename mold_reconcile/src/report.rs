use mold_ids::{NodeID, TransactionID};
use std::fmt;

/// Terminal state of one item in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Applied,
    /// Within every threshold; nothing to do.
    Unchanged,
    /// Flagged but not selected by the caller.
    Deselected,
    /// No catalog entry to reconcile against.
    Unmatched,
    /// The node no longer exists.
    SkippedStale,
    FailedTemplateLoad { reason: String },
    /// Lies inside another item of the same batch whose replacement already rebuilt it.
    Superseded,
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Deselected => f.write_str("deselected"),
            Self::Unmatched => f.write_str("found, unmapped"),
            Self::SkippedStale => f.write_str("skipped (stale)"),
            Self::FailedTemplateLoad { reason } => write!(f, "failed: {reason}"),
            Self::Superseded => f.write_str("superseded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub node: NodeID,
    pub name: String,
    pub template: Option<String>,
    pub outcome: ItemOutcome,
    /// Node that took this item's place, for applied replacements.
    pub replacement: Option<NodeID>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Revert,
    Replace,
    ReplaceAll,
}

impl BatchKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Revert => "Revert to template placement",
            Self::Replace => "Replace with template",
            Self::ReplaceAll => "Replace all with template",
        }
    }
}

/// Per-item outcomes of a batch, in input order, plus the transaction it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub kind: BatchKind,
    /// `None` when the batch changed nothing.
    pub transaction: Option<TransactionID>,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| *o == ItemOutcome::Applied)
    }

    pub fn stale(&self) -> usize {
        self.count(|o| *o == ItemOutcome::SkippedStale)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::FailedTemplateLoad { .. }))
    }

    pub fn superseded(&self) -> usize {
        self.count(|o| *o == ItemOutcome::Superseded)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} applied, {} stale, {} failed",
            self.kind.label(),
            self.applied(),
            self.stale(),
            self.failed()
        )?;
        let superseded = self.superseded();
        if superseded > 0 {
            write!(f, ", {superseded} superseded")?;
        }
        if let Some(tx) = self.transaction {
            write!(f, " ({tx})")?;
        }
        Ok(())
    }
}
