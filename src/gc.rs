//! Mark-and-sweep garbage collection of nodes and their proof clauses.
//!
//! The manager has no reference counts: the caller names the roots it still
//! needs, everything else is swept. A collected node takes its defining
//! clauses with it, and every cache entry mentioning a collected node is
//! purged together with the clauses it owned.

use log::{debug, info};

use crate::bdd::Manager;
use crate::error::Result;
use crate::node::Node;
use crate::reference::Ref;

/// What a collection removed.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct GcReport {
    pub nodes: usize,
    pub clauses: usize,
}

impl Manager {
    /// Collect garbage if enough variables were quantified since the last
    /// collection. `roots` is only called when a collection actually runs.
    pub fn check_gc(&self, roots: impl FnOnce() -> Vec<Ref>) -> Result<Option<GcReport>> {
        let quantified = self.quantified_count();
        if quantified - self.last_gc.get() <= self.config.gc_threshold {
            return Ok(None);
        }
        let roots = roots();
        self.collect_garbage(&roots).map(Some)
    }

    /// Remove every node not reachable from `roots`.
    pub fn collect_garbage(&self, roots: &[Ref]) -> Result<GcReport> {
        debug!("Collecting garbage...");

        let alive = self.descendants(roots.iter().copied());
        let is_alive = |node: Ref| node.is_leaf() || alive.contains(&node);

        let dead = self.unique.borrow_mut().sweep(is_alive);
        let mut clauses = Vec::new();
        {
            let mut storage = self.storage.borrow_mut();
            for &node in &dead {
                if let Node::Branch(b) = *storage.node(node) {
                    clauses.extend(b.definitions.clauses());
                }
                storage.free(node);
            }
        }
        clauses.extend(self.cache.borrow_mut().purge(is_alive));
        self.prover().delete_clauses(&clauses)?;

        self.last_gc.set(self.quantified_count());
        let report = GcReport {
            nodes: dead.len(),
            clauses: clauses.len(),
        };
        let mut stats = self.stats.borrow_mut();
        stats.gc_count += 1;
        stats.nodes_collected += report.nodes;
        stats.clauses_collected += report.clauses;
        info!(
            "GC #{}: {} nodes and {} clauses deleted, {} nodes live",
            stats.gc_count,
            report.nodes,
            report.clauses,
            self.num_nodes()
        );
        Ok(report)
    }
}
