//! Operation cache (computed table).
//!
//! Memoizes the result of every recursive operation together with the proof
//! clause that justifies it. An entry owns the clauses listed in
//! [`CacheEntry::clauses`]: when garbage collection purges the entry, those
//! clauses are deleted from the proof as well.

use std::collections::HashMap;

use crate::reference::Ref;
use crate::types::{ClauseId, Lit};

/// Key of a memoized operation.
///
/// Commutative operations store their operands sorted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OpKey {
    And(Ref, Ref),
    Or(Ref, Ref),
    Xor(Ref, Ref),
    Not(Ref),
    Imply(Ref, Ref),
    /// Node and the positive clause of quantified variables.
    Equant(Ref, Ref),
    Uquant(Ref, Ref),
    RestrictDown(Ref, Lit),
    RestrictUp(Ref, Lit),
}

impl OpKey {
    pub fn and(a: Ref, b: Ref) -> Self {
        if a <= b {
            OpKey::And(a, b)
        } else {
            OpKey::And(b, a)
        }
    }

    pub fn or(a: Ref, b: Ref) -> Self {
        if a <= b {
            OpKey::Or(a, b)
        } else {
            OpKey::Or(b, a)
        }
    }

    pub fn xor(a: Ref, b: Ref) -> Self {
        if a <= b {
            OpKey::Xor(a, b)
        } else {
            OpKey::Xor(b, a)
        }
    }

    /// Nodes the key refers to.
    pub fn operands(&self) -> Vec<Ref> {
        match *self {
            OpKey::And(a, b)
            | OpKey::Or(a, b)
            | OpKey::Xor(a, b)
            | OpKey::Imply(a, b)
            | OpKey::Equant(a, b)
            | OpKey::Uquant(a, b) => vec![a, b],
            OpKey::Not(a) | OpKey::RestrictDown(a, _) | OpKey::RestrictUp(a, _) => vec![a],
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CacheEntry {
    pub result: Ref,
    /// `None` if the result was computed without generating a proof.
    pub justification: Option<ClauseId>,
    /// Clauses created for this entry and deleted with it.
    pub clauses: Vec<ClauseId>,
}

impl CacheEntry {
    pub fn unjustified(result: Ref) -> Self {
        Self {
            result,
            justification: None,
            clauses: Vec::new(),
        }
    }

    pub fn justified(result: Ref, justification: ClauseId) -> Self {
        let clauses = if justification.is_tautology() {
            Vec::new()
        } else {
            vec![justification]
        };
        Self {
            result,
            justification: Some(justification),
            clauses,
        }
    }
}

pub struct OpCache {
    map: HashMap<OpKey, CacheEntry>,
    hits: usize,
    misses: usize,
    adds: usize,
}

impl Default for OpCache {
    fn default() -> Self {
        Self::new(1 << 14)
    }
}

impl OpCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
            adds: 0,
        }
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Number of insertions so far.
    pub fn adds(&self) -> usize {
        self.adds
    }

    pub fn get(&mut self, key: &OpKey) -> Option<&CacheEntry> {
        match self.map.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts an entry and returns the clauses of the entry it replaced.
    pub fn insert(&mut self, key: OpKey, entry: CacheEntry) -> Vec<ClauseId> {
        self.adds += 1;
        self.map
            .insert(key, entry)
            .map(|old| old.clauses)
            .unwrap_or_default()
    }

    /// Drop every entry mentioning a dead node and return the clauses they owned.
    pub fn purge(&mut self, alive: impl Fn(Ref) -> bool) -> Vec<ClauseId> {
        let mut clauses = Vec::new();
        self.map.retain(|key, entry| {
            let keep = alive(entry.result) && key.operands().into_iter().all(&alive);
            if !keep {
                clauses.append(&mut entry.clauses);
            }
            keep
        });
        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let mut cache = OpCache::new(4);

        cache.insert(OpKey::and(Ref::new(3), Ref::new(2)), CacheEntry::unjustified(Ref::new(4)));

        let entry = cache.get(&OpKey::And(Ref::new(2), Ref::new(3))).cloned();
        assert_eq!(entry, Some(CacheEntry::unjustified(Ref::new(4))));
        assert_eq!(cache.get(&OpKey::or(Ref::new(2), Ref::new(3))), None);

        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.adds(), 1);
    }

    #[test]
    fn test_replace_returns_old_clauses() {
        let mut cache = OpCache::new(4);
        let key = OpKey::Imply(Ref::new(2), Ref::new(3));

        let old = cache.insert(key, CacheEntry::justified(Ref::ONE, ClauseId::new(10)));
        assert!(old.is_empty());
        let old = cache.insert(key, CacheEntry::justified(Ref::ONE, ClauseId::new(11)));
        assert_eq!(old, vec![ClauseId::new(10)]);
    }

    #[test]
    fn test_purge() {
        let mut cache = OpCache::new(4);
        cache.insert(
            OpKey::and(Ref::new(2), Ref::new(3)),
            CacheEntry::justified(Ref::new(4), ClauseId::new(7)),
        );
        cache.insert(
            OpKey::RestrictDown(Ref::new(5), 1),
            CacheEntry::justified(Ref::new(2), ClauseId::new(8)),
        );
        cache.insert(
            OpKey::Not(Ref::new(2)),
            CacheEntry::justified(Ref::new(6), ClauseId::TAUTOLOGY),
        );

        // Node 5 and 6 are dead: entries mentioning them go, with their clauses.
        let dead = [Ref::new(5), Ref::new(6)];
        let clauses = cache.purge(|r| !dead.contains(&r));
        assert_eq!(clauses, vec![ClauseId::new(8)]);
        assert_eq!(cache.len(), 1);
    }
}
