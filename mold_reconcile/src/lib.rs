//! Template reconciliation: find nodes that should match a catalog template,
//! diff their placement against it, and correct them in undoable batches.

pub mod catalog;
pub mod differ;
pub mod error;
pub mod mutator;
pub mod report;
pub mod scanner;
pub mod transaction;

pub use catalog::{Catalog, MemorySource, Template, TemplateCache, TemplateSource};
pub use differ::{CompareOutcome, Comparison, Thresholds, compare, compare_all, comparisons};
pub use error::{CatalogError, ReconcileError, ThresholdError};
pub use mutator::Reconciler;
pub use report::{BatchKind, BatchReport, ItemOutcome, ItemReport};
pub use scanner::{Candidate, MatchKind, clean_name, scan};
pub use transaction::{Edit, Transaction, UndoHost, journal_json};
