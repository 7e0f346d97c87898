//! Propositional helpers that turn BDD facts into proof steps.
//!
//! Clauses are kept in a canonical order: literals sorted by descending
//! variable magnitude. Node ids are always larger than the ids of the
//! variables and nodes below them, so the extension variable of a defining
//! clause comes first, which is where RAT checkers expect the pivot.
//!
//! The workhorse is [`rup_check`]: every BDD operation hands over a small set
//! of candidate antecedents that were picked to agree with the target, so
//! reverse unit propagation over just those candidates is enough to find the
//! hint list for the proof.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::error::{ResolveError, Result};
use crate::prover::Prover;
use crate::types::{ClauseId, Lit, FALSE_LIT, TRUE_LIT};

/// Outcome of [`clean_clause`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Cleaned {
    /// The clause is always true and must not be emitted.
    Tautology,
    /// Canonical form of the clause. May be empty (the false clause).
    Clause(Vec<Lit>),
}

/// Canonicalize a clause.
///
/// Drops duplicates and [`FALSE_LIT`], detects [`TRUE_LIT`] and complementary
/// pairs, and sorts by descending variable magnitude (positive first on ties,
/// which only matters for tautologies).
pub fn clean_clause(lits: &[Lit]) -> Cleaned {
    let mut clause = Vec::with_capacity(lits.len());
    for &lit in lits {
        if lit == TRUE_LIT {
            return Cleaned::Tautology;
        }
        if lit == FALSE_LIT {
            continue;
        }
        debug_assert_ne!(lit, 0, "0 is not a literal");
        clause.push(lit);
    }
    clause.sort_unstable_by(|a, b| {
        b.unsigned_abs()
            .cmp(&a.unsigned_abs())
            .then_with(|| b.cmp(a))
    });
    clause.dedup();
    if clause.windows(2).any(|w| w[0] == -w[1]) {
        Cleaned::Tautology
    } else {
        Cleaned::Clause(clause)
    }
}

/// Resolve two clean clauses.
///
/// Returns `None` unless the clauses clash on exactly one variable.
pub fn resolve_clauses(c1: &[Lit], c2: &[Lit]) -> Option<Vec<Lit>> {
    let mut resolvent = Vec::with_capacity(c1.len() + c2.len());
    let mut pivot = None;
    let (mut i, mut j) = (0, 0);
    while i < c1.len() && j < c2.len() {
        let (a, b) = (c1[i], c2[j]);
        match a.unsigned_abs().cmp(&b.unsigned_abs()) {
            Ordering::Greater => {
                resolvent.push(a);
                i += 1;
            }
            Ordering::Less => {
                resolvent.push(b);
                j += 1;
            }
            Ordering::Equal => {
                if a == b {
                    resolvent.push(a);
                } else if pivot.replace(a.unsigned_abs()).is_some() {
                    return None;
                }
                i += 1;
                j += 1;
            }
        }
    }
    resolvent.extend_from_slice(&c1[i..]);
    resolvent.extend_from_slice(&c2[j..]);
    pivot.map(|_| resolvent)
}

/// Resolve a chain of clauses left to right.
pub fn chain_resolve<C: AsRef<[Lit]>>(clauses: &[C]) -> Option<Vec<Lit>> {
    let (first, rest) = clauses.split_first()?;
    rest.iter()
        .try_fold(first.as_ref().to_vec(), |acc, clause| {
            resolve_clauses(&acc, clause.as_ref())
        })
}

/// Read access to live clauses by id.
pub trait ClauseStore {
    fn clause(&self, id: ClauseId) -> Option<&[Lit]>;
}

impl ClauseStore for HashMap<ClauseId, Vec<Lit>> {
    fn clause(&self, id: ClauseId) -> Option<&[Lit]> {
        self.get(&id).map(Vec::as_slice)
    }
}

fn value(assignment: &HashMap<u32, (bool, Option<usize>)>, lit: Lit) -> Option<bool> {
    assignment
        .get(&lit.unsigned_abs())
        .map(|&(value, _)| value == (lit > 0))
}

/// Reverse unit propagation of `target` over `candidates`.
///
/// Assigns the negation of `target`, then propagates over the candidates until
/// one is falsified. On success returns the candidates that took part, in
/// propagation order with the conflicting clause last, which is a valid LRAT
/// hint sequence. Tautology ids are skipped. Fails if propagation stalls or a
/// candidate is not in the store.
pub fn rup_check(
    target: &[Lit],
    candidates: &[ClauseId],
    store: &impl ClauseStore,
) -> Option<Vec<ClauseId>> {
    let clauses = candidates
        .iter()
        .filter(|id| !id.is_tautology())
        .map(|&id| store.clause(id).map(|lits| (id, lits)))
        .collect::<Option<Vec<_>>>()?;

    // variable -> (value, index of the clause that propagated it)
    let mut assignment: HashMap<u32, (bool, Option<usize>)> = HashMap::new();
    for &lit in target {
        assignment.insert(lit.unsigned_abs(), (lit < 0, None));
    }

    let mut done = vec![false; clauses.len()];
    let mut order = Vec::new();
    let conflict = 'search: loop {
        let mut progress = false;
        for (i, &(_, lits)) in clauses.iter().enumerate() {
            if done[i] {
                continue;
            }
            let mut free = 0;
            let mut unit = None;
            let mut satisfied = false;
            for &lit in lits {
                match value(&assignment, lit) {
                    Some(true) => {
                        satisfied = true;
                        break;
                    }
                    Some(false) => {}
                    None => {
                        free += 1;
                        unit = Some(lit);
                    }
                }
            }
            if satisfied {
                done[i] = true;
                continue;
            }
            match (free, unit) {
                (0, _) => break 'search i,
                (1, Some(lit)) => {
                    assignment.insert(lit.unsigned_abs(), (lit > 0, Some(i)));
                    done[i] = true;
                    order.push(i);
                    progress = true;
                }
                _ => {}
            }
        }
        if !progress {
            return None;
        }
    };

    // Keep only the clauses the conflict actually depends on.
    let mut needed = vec![false; clauses.len()];
    needed[conflict] = true;
    let mut stack = vec![conflict];
    while let Some(i) = stack.pop() {
        for &lit in clauses[i].1 {
            if let Some(&(_, Some(reason))) = assignment.get(&lit.unsigned_abs()) {
                if reason != i && !needed[reason] {
                    needed[reason] = true;
                    stack.push(reason);
                }
            }
        }
    }

    let mut hints: Vec<ClauseId> = order
        .into_iter()
        .filter(|&i| needed[i])
        .map(|i| clauses[i].0)
        .collect();
    hints.push(clauses[conflict].0);
    Some(hints)
}

/// Antecedents of a BDD operation, split by the phase of the branching variable.
pub trait RuleIndex {
    /// Clauses that lead to the target when the split variable is true.
    fn high_chain(&self) -> Vec<ClauseId>;
    /// Clauses that lead to the target when the split variable is false.
    fn low_chain(&self) -> Vec<ClauseId>;
}

/// Rules for `A ∧ B → N` where `N = A ∧ B`.
#[derive(Debug, Copy, Clone)]
pub struct AndRules {
    pub a_true_down: ClauseId,
    pub a_false_down: ClauseId,
    pub b_true_down: ClauseId,
    pub b_false_down: ClauseId,
    pub res_true_up: ClauseId,
    pub res_false_up: ClauseId,
    pub and_high: ClauseId,
    pub and_low: ClauseId,
}

impl RuleIndex for AndRules {
    fn high_chain(&self) -> Vec<ClauseId> {
        vec![self.a_true_down, self.b_true_down, self.and_high, self.res_true_up]
    }
    fn low_chain(&self) -> Vec<ClauseId> {
        vec![self.a_false_down, self.b_false_down, self.and_low, self.res_false_up]
    }
}

/// Rules for `N → A ∨ B` where `N = A ∨ B`.
#[derive(Debug, Copy, Clone)]
pub struct OrRules {
    pub res_true_down: ClauseId,
    pub res_false_down: ClauseId,
    pub a_true_up: ClauseId,
    pub a_false_up: ClauseId,
    pub b_true_up: ClauseId,
    pub b_false_up: ClauseId,
    pub or_high: ClauseId,
    pub or_low: ClauseId,
}

impl RuleIndex for OrRules {
    fn high_chain(&self) -> Vec<ClauseId> {
        vec![self.res_true_down, self.a_true_up, self.b_true_up, self.or_high]
    }
    fn low_chain(&self) -> Vec<ClauseId> {
        vec![self.res_false_down, self.a_false_up, self.b_false_up, self.or_low]
    }
}

/// Rules for `A → B`.
#[derive(Debug, Copy, Clone)]
pub struct ImplyRules {
    pub a_true_down: ClauseId,
    pub a_false_down: ClauseId,
    pub b_true_up: ClauseId,
    pub b_false_up: ClauseId,
    pub imply_high: ClauseId,
    pub imply_low: ClauseId,
}

impl RuleIndex for ImplyRules {
    fn high_chain(&self) -> Vec<ClauseId> {
        vec![self.a_true_down, self.imply_high, self.b_true_up]
    }
    fn low_chain(&self) -> Vec<ClauseId> {
        vec![self.a_false_down, self.imply_low, self.b_false_up]
    }
}

/// Rules for a restriction step `lit ∧ S → T`.
///
/// Down direction: source is the original node, target the restricted one.
/// Up direction: the other way round.
#[derive(Debug, Copy, Clone)]
pub struct RestrictRules {
    pub source_true_down: ClauseId,
    pub source_false_down: ClauseId,
    pub step_high: ClauseId,
    pub step_low: ClauseId,
    pub target_true_up: ClauseId,
    pub target_false_up: ClauseId,
}

impl RuleIndex for RestrictRules {
    fn high_chain(&self) -> Vec<ClauseId> {
        vec![self.source_true_down, self.step_high, self.target_true_up]
    }
    fn low_chain(&self) -> Vec<ClauseId> {
        vec![self.source_false_down, self.step_low, self.target_false_up]
    }
}

fn live(chain: Vec<ClauseId>) -> Vec<ClauseId> {
    chain.into_iter().filter(|id| !id.is_tautology()).collect()
}

/// Derives a target clause from two per-branch antecedent chains.
///
/// Tries, in order: RUP from the high chain followed by the low chain, RUP
/// from the low chain followed by the high chain, and finally the two-step
/// proof that first derives `[-split] ∪ target` from the high chain and then
/// `target` from that clause plus the low chain.
pub struct VResolver<'a> {
    prover: &'a mut Prover,
}

impl<'a> VResolver<'a> {
    pub fn new(prover: &'a mut Prover) -> Self {
        Self { prover }
    }

    pub fn run(
        &mut self,
        target: &[Lit],
        split: Lit,
        rules: &impl RuleIndex,
        comment: &str,
    ) -> Result<ClauseId> {
        let target = match clean_clause(target) {
            Cleaned::Tautology => return Ok(ClauseId::TAUTOLOGY),
            Cleaned::Clause(clause) => clause,
        };
        let high = live(rules.high_chain());
        let low = live(rules.low_chain());

        let forward = [high.as_slice(), low.as_slice()].concat();
        if let Some(hints) = rup_check(&target, &forward, &*self.prover) {
            return self.prover.create_clause(&target, &hints, Some(comment));
        }
        let backward = [low.as_slice(), high.as_slice()].concat();
        if let Some(hints) = rup_check(&target, &backward, &*self.prover) {
            return self.prover.create_clause(&target, &hints, Some(comment));
        }

        debug!("{}: two-step proof of {:?} split on {}", comment, target, split);
        let mut split_target = target.clone();
        split_target.push(-split);
        let hints = rup_check(&split_target, &high, &*self.prover).ok_or_else(|| ResolveError {
            target: split_target.clone(),
            candidates: high.clone(),
            comment: comment.to_string(),
            reason: "high chain does not propagate",
        })?;
        let first = self.prover.create_clause(&split_target, &hints, Some(comment))?;

        let mut candidates = vec![first];
        candidates.extend_from_slice(&low);
        let hints = match rup_check(&target, &candidates, &*self.prover) {
            Some(hints) => hints,
            None => {
                return Err(ResolveError {
                    target,
                    candidates,
                    comment: comment.to_string(),
                    reason: "low chain does not complete the split",
                }
                .into())
            }
        };
        let id = self.prover.create_clause(&target, &hints, Some(comment))?;
        self.prover.delete_clauses(&[first])?;
        Ok(id)
    }
}
