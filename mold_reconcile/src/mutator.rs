use mold_ids::{NodeID, TransactionID};
use mold_project::ProjectConfig;
use mold_runtime::World;
use std::borrow::Cow;

use crate::{
    catalog::{Catalog, TemplateCache, TemplateSource},
    differ::{CompareOutcome, Comparison, Thresholds, compare_all},
    error::ReconcileError,
    report::{BatchKind, BatchReport, ItemOutcome, ItemReport},
    scanner::{Candidate, scan},
    transaction::{Edit, Transaction, UndoHost},
};

/// One engine for scanning, diffing and both corrective batches.
/// Assumes exclusive access to the world for the length of each call.
pub struct Reconciler<S> {
    catalog: Catalog<S>,
    thresholds: Thresholds,
    clone_marker: String,
    next_transaction: TransactionID,
}

struct ReplaceTarget {
    node: NodeID,
    name: String,
    template: Option<String>,
    gated_out: Option<ItemOutcome>,
}

impl<S: TemplateSource> Reconciler<S> {
    pub fn new(catalog: Catalog<S>) -> Self {
        Self {
            catalog,
            thresholds: Thresholds::default(),
            clone_marker: mold_project::DEFAULT_CLONE_MARKER.to_string(),
            next_transaction: TransactionID::first(),
        }
    }

    /// Build from a project's `[catalog]`, `[thresholds]` and `[scan]` sections.
    pub fn from_project(config: &ProjectConfig, source: S) -> Result<Self, ReconcileError> {
        let thresholds = Thresholds::try_from(config.thresholds)?;
        let catalog = Catalog::new(config.catalog.clone(), source);
        Ok(Self::new(catalog)
            .with_thresholds(thresholds)
            .with_clone_marker(config.clone_marker.clone()))
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_clone_marker(mut self, marker: impl Into<String>) -> Self {
        self.clone_marker = marker.into();
        self
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn scan(&self, world: &World, root: NodeID) -> Result<Vec<Candidate>, ReconcileError> {
        scan(world, root, &self.catalog, &self.clone_marker)
    }

    /// Scan the whole active scene.
    pub fn scan_world(&self, world: &World) -> Result<Vec<Candidate>, ReconcileError> {
        self.scan(world, world.root())
    }

    pub fn compare_all(&self, candidates: &[Candidate]) -> Vec<CompareOutcome> {
        compare_all(candidates, &self.catalog, &self.thresholds)
    }

    /// Number of flagged comparisons under `root` right now.
    pub fn flagged_count(&self, world: &World, root: NodeID) -> Result<usize, ReconcileError> {
        let candidates = self.scan(world, root)?;
        Ok(self
            .compare_all(&candidates)
            .iter()
            .filter_map(CompareOutcome::comparison)
            .filter(|c| c.has_differences())
            .count())
    }

    fn begin(&mut self, kind: BatchKind) -> Transaction {
        Transaction::new(self.next_transaction, kind.label())
    }

    fn finish(
        &mut self,
        kind: BatchKind,
        transaction: Transaction,
        items: Vec<ItemReport>,
        host: &mut impl UndoHost,
    ) -> BatchReport {
        let submitted = if transaction.is_empty() {
            None
        } else {
            let id = transaction.id;
            self.next_transaction = id.next();
            host.submit(transaction);
            Some(id)
        };
        let report = BatchReport {
            kind,
            transaction: submitted,
            items,
        };
        log::info!("{report}");
        report
    }

    /// Overwrite the differing placement fields of each selected, flagged comparison
    /// with the template's canonical values. Fields within threshold are left alone.
    pub fn revert(
        &mut self,
        world: &mut World,
        comparisons: &[Comparison],
        host: &mut impl UndoHost,
    ) -> BatchReport {
        let mut transaction = self.begin(BatchKind::Revert);
        let mut cache = TemplateCache::new(&self.catalog);
        let mut items = Vec::with_capacity(comparisons.len());

        for comparison in comparisons {
            let node = comparison.candidate.node;
            let outcome = if !comparison.has_differences() {
                ItemOutcome::Unchanged
            } else if !comparison.selected {
                ItemOutcome::Deselected
            } else if !world.contains(node) {
                log::debug!("{node} vanished before revert");
                ItemOutcome::SkippedStale
            } else {
                match cache.get(&comparison.template) {
                    Err(err) => {
                        log::warn!("{}: {err}", comparison.candidate.display_name);
                        ItemOutcome::FailedTemplateLoad {
                            reason: err.to_string(),
                        }
                    }
                    Ok(template) => {
                        let canonical = template.canonical;
                        revert_fields(world, node, comparison, &canonical, &mut transaction);
                        world.mark_dirty(node);
                        ItemOutcome::Applied
                    }
                }
            };
            items.push(ItemReport {
                node,
                name: comparison.candidate.display_name.clone(),
                template: Some(comparison.template.clone()),
                outcome,
                replacement: None,
            });
        }

        self.finish(BatchKind::Revert, transaction, items, host)
    }

    /// Replace every selected comparison's node with a fresh template copy.
    pub fn replace(
        &mut self,
        world: &mut World,
        comparisons: &[Comparison],
        host: &mut impl UndoHost,
    ) -> BatchReport {
        let targets = comparisons
            .iter()
            .map(|c| ReplaceTarget {
                node: c.candidate.node,
                name: c.candidate.display_name.clone(),
                template: Some(c.template.clone()),
                gated_out: match (c.selected, c.has_differences()) {
                    (true, _) => None,
                    (false, true) => Some(ItemOutcome::Deselected),
                    (false, false) => Some(ItemOutcome::Unchanged),
                },
            })
            .collect();
        self.replace_targets(BatchKind::Replace, world, targets, host)
    }

    /// Replace every candidate whose name maps to a catalog entry, regardless of placement.
    pub fn replace_all(
        &mut self,
        world: &mut World,
        candidates: &[Candidate],
        host: &mut impl UndoHost,
    ) -> BatchReport {
        let targets = candidates
            .iter()
            .map(|c| ReplaceTarget {
                node: c.node,
                name: c.display_name.clone(),
                template: c.matched.clone(),
                gated_out: (!c.is_mapped()).then_some(ItemOutcome::Unmatched),
            })
            .collect();
        self.replace_targets(BatchKind::ReplaceAll, world, targets, host)
    }

    fn replace_targets(
        &mut self,
        kind: BatchKind,
        world: &mut World,
        targets: Vec<ReplaceTarget>,
        host: &mut impl UndoHost,
    ) -> BatchReport {
        let mut transaction = self.begin(kind);
        let mut cache = TemplateCache::new(&self.catalog);
        let mut outcomes: Vec<(ItemOutcome, Option<NodeID>)> =
            vec![(ItemOutcome::Unchanged, None); targets.len()];

        // Ancestors first, so nested targets can see that their subtree is already rebuilt.
        let mut order: Vec<usize> = (0..targets.len()).collect();
        order.sort_by_key(|&i| world.depth(targets[i].node).unwrap_or(usize::MAX));

        let mut replaced: Vec<NodeID> = Vec::new();
        for i in order {
            let target = &targets[i];
            outcomes[i] = if let Some(outcome) = target.gated_out.clone() {
                (outcome, None)
            } else {
                match target.template.as_deref() {
                    None => (ItemOutcome::Unmatched, None),
                    Some(name) => {
                        if !world.contains(target.node) {
                            log::debug!("{} vanished before replace", target.node);
                            (ItemOutcome::SkippedStale, None)
                        } else if replaced.iter().any(|r| world.is_ancestor(*r, target.node)) {
                            (ItemOutcome::Superseded, None)
                        } else {
                            match replace_one(world, &mut cache, target.node, name, &mut transaction)
                            {
                                Ok(new_id) => {
                                    replaced.push(target.node);
                                    (ItemOutcome::Applied, Some(new_id))
                                }
                                Err(reason) => {
                                    log::warn!("{}: {reason}", target.name);
                                    (ItemOutcome::FailedTemplateLoad { reason }, None)
                                }
                            }
                        }
                    }
                }
            };
        }

        // Retire originals only once every item has been processed.
        for old in replaced {
            let parent = world.parent_of(old).unwrap_or_default();
            let Some(node) = world.get(old) else {
                continue;
            };
            transaction.record(Edit::RemoveNode {
                node: old,
                parent,
                sibling_index: world.sibling_index(old).unwrap_or(0),
                name: node.name.to_string(),
                transform: node.transform,
            });
            if let Err(err) = world.remove_subtree(old) {
                log::warn!("failed to retire {old}: {err}");
            }
            world.mark_dirty(parent);
        }

        let items = targets
            .into_iter()
            .zip(outcomes)
            .map(|(target, (outcome, replacement))| ItemReport {
                node: target.node,
                name: target.name,
                template: target.template,
                outcome,
                replacement,
            })
            .collect();
        self.finish(kind, transaction, items, host)
    }
}

fn revert_fields(
    world: &mut World,
    node: NodeID,
    comparison: &Comparison,
    canonical: &mold_structs::Transform3D,
    transaction: &mut Transaction,
) {
    let Some(live) = world.get_mut(node) else {
        return;
    };
    if comparison.position_differs {
        transaction.record(Edit::SetPosition {
            node,
            before: live.transform.position,
            after: canonical.position,
        });
        live.transform.position = canonical.position;
    }
    if comparison.rotation_differs {
        transaction.record(Edit::SetRotation {
            node,
            before: live.transform.rotation,
            after: canonical.rotation,
        });
        live.transform.rotation = canonical.rotation;
    }
    if comparison.scale_differs {
        transaction.record(Edit::SetScale {
            node,
            before: live.transform.scale,
            after: canonical.scale,
        });
        live.transform.scale = canonical.scale;
    }
    log::debug!("reverted {node} to `{}`", comparison.template);
}

/// Instantiate `template` next to `old`, carrying over its parent, sibling slot and live placement.
fn replace_one<S: TemplateSource>(
    world: &mut World,
    cache: &mut TemplateCache<'_, S>,
    old: NodeID,
    template_name: &str,
    transaction: &mut Transaction,
) -> Result<NodeID, String> {
    let template = cache.get(template_name).map_err(|e| e.to_string())?;

    let parent = world
        .parent_of(old)
        .ok_or_else(|| format!("{old} has no parent"))?;
    let sibling_index = world.sibling_index(old).unwrap_or(0);
    let transform = world
        .get(old)
        .map(|n| n.transform)
        .ok_or_else(|| format!("{old} vanished"))?;

    let new_id = world
        .instantiate(&template.scene, parent, sibling_index, Some(template_name))
        .map_err(|e| e.to_string())?;
    if let Some(node) = world.get_mut(new_id) {
        node.name = Cow::Owned(template_name.to_string());
        node.transform = transform;
    }
    transaction.record(Edit::CreateNode {
        node: new_id,
        parent,
        sibling_index,
        template: template_name.to_string(),
        transform,
    });
    world.mark_dirty(new_id);
    world.mark_dirty(parent);
    log::debug!("replaced {old} with {new_id} from `{template_name}`");
    Ok(new_id)
}
