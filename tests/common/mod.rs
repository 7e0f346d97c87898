//! Shared helpers: an in-memory proof sink, a small LRAT checker and random
//! formulas.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

// ─── Proof sink ────────────────────────────────────────────────────────────────

/// `Write` into a buffer that stays readable after the prover takes ownership.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("proof is not UTF-8")
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── LRAT checker ──────────────────────────────────────────────────────────────

/// Checks text LRAT proofs.
///
/// A hint list is a run of positive ids followed by RAT groups, each a
/// negative id `-c` and the positive ids used for the resolvent with `c`.
/// Every positive hint must be unit (or falsified) when it is reached. If the
/// leading run does not end in a conflict, the clause is a RAT step on its
/// first literal and needs a group for every live clause containing the
/// negated pivot. A clause without hints is therefore only accepted when no
/// live clause contains its negated pivot.
pub struct LratChecker {
    clauses: HashMap<u64, Vec<i32>>,
    pub derived_empty: bool,
    pub added: usize,
    pub rat_steps: usize,
    pub deleted: usize,
}

impl LratChecker {
    pub fn new(input: &[Vec<i32>]) -> Self {
        let clauses = input
            .iter()
            .enumerate()
            .map(|(i, clause)| (i as u64 + 1, clause.clone()))
            .collect();
        Self {
            clauses,
            derived_empty: false,
            added: 0,
            rat_steps: 0,
            deleted: 0,
        }
    }

    pub fn live(&self) -> usize {
        self.clauses.len()
    }

    pub fn check(&mut self, proof: &str) -> Result<(), String> {
        for (index, line) in proof.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('c') {
                continue;
            }
            self.step(line)
                .map_err(|message| format!("line {} '{}': {}", index + 1, line, message))?;
        }
        Ok(())
    }

    fn step(&mut self, line: &str) -> Result<(), String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.get(1) == Some(&"d") {
            for word in &words[2..] {
                let id: u64 = word.parse().map_err(|_| "bad id")?;
                if id == 0 {
                    break;
                }
                self.clauses
                    .remove(&id)
                    .ok_or_else(|| format!("deleting unknown clause {}", id))?;
                self.deleted += 1;
            }
            return Ok(());
        }

        let numbers = words
            .iter()
            .map(|w| w.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| "bad number")?;
        let id = numbers[0] as u64;
        let rest = &numbers[1..];
        let split = rest.iter().position(|&n| n == 0).ok_or("unterminated clause")?;
        let lits: Vec<i32> = rest[..split].iter().map(|&n| n as i32).collect();
        let hints: Vec<i64> = rest[split + 1..].iter().copied().take_while(|&n| n != 0).collect();

        if self.clauses.contains_key(&id) {
            return Err(format!("clause {} already exists", id));
        }
        self.check_clause(&lits, &hints)?;
        if lits.is_empty() {
            self.derived_empty = true;
        }
        self.clauses.insert(id, lits);
        self.added += 1;
        Ok(())
    }

    fn check_clause(&mut self, lits: &[i32], hints: &[i64]) -> Result<(), String> {
        let run = hints.iter().position(|&h| h < 0).unwrap_or(hints.len());
        let (rup, groups) = hints.split_at(run);

        // Literals currently false.
        let mut falsified: Vec<i32> = lits.to_vec();
        if self.propagate(&mut falsified, rup)? {
            return Ok(());
        }

        let pivot = *lits.first().ok_or("empty clause without a conflict")?;
        let mut candidates: Vec<u64> = self
            .clauses
            .iter()
            .filter(|(_, clause)| clause.contains(&-pivot))
            .map(|(&id, _)| id)
            .collect();
        candidates.sort_unstable();

        let mut covered = Vec::new();
        let mut rest = groups;
        while let Some((&head, tail)) = rest.split_first() {
            let candidate = head.unsigned_abs();
            let end = tail.iter().position(|&h| h < 0).unwrap_or(tail.len());
            let (group, next) = tail.split_at(end);
            rest = next;

            let other = self
                .clauses
                .get(&candidate)
                .ok_or_else(|| format!("unknown RAT candidate {}", candidate))?;
            if !other.contains(&-pivot) {
                return Err(format!("clause {} does not contain {}", candidate, -pivot));
            }
            covered.push(candidate);

            let mut resolvent = falsified.clone();
            let mut tautology = false;
            for &l in other.iter().filter(|&&l| l != -pivot) {
                if resolvent.contains(&-l) {
                    tautology = true;
                    break;
                }
                resolvent.push(l);
            }
            if tautology {
                continue;
            }
            if !self.propagate(&mut resolvent, group)? {
                return Err(format!("RAT candidate {} does not reach a conflict", candidate));
            }
        }

        covered.sort_unstable();
        covered.dedup();
        if covered != candidates {
            return Err(format!(
                "RAT on {} must cover clauses {:?}, hints cover {:?}",
                pivot, candidates, covered
            ));
        }
        self.rat_steps += 1;
        Ok(())
    }

    /// Unit propagation over `hints` in order. Returns whether a conflict was
    /// reached; every hint before it must be unit.
    fn propagate(&self, falsified: &mut Vec<i32>, hints: &[i64]) -> Result<bool, String> {
        for &hint in hints {
            let hint = hint as u64;
            let clause = self
                .clauses
                .get(&hint)
                .ok_or_else(|| format!("unknown hint {}", hint))?;
            if clause.iter().any(|l| falsified.contains(&-l)) {
                return Err(format!("hint {} is satisfied", hint));
            }
            let free: Vec<i32> = clause
                .iter()
                .copied()
                .filter(|l| !falsified.contains(l))
                .collect();
            match free.as_slice() {
                [] => return Ok(true),
                [unit] => falsified.push(-unit),
                _ => return Err(format!("hint {} {:?} is not unit", hint, clause)),
            }
        }
        Ok(false)
    }
}

// ─── Formulas ──────────────────────────────────────────────────────────────────

/// Deterministic xorshift generator for reproducible random formulas.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    /// Random clause over `width` distinct variables from `1..=num_vars`.
    pub fn clause(&mut self, num_vars: u32, width: usize) -> Vec<i32> {
        let mut clause: Vec<i32> = Vec::with_capacity(width);
        while clause.len() < width.min(num_vars as usize) {
            let var = self.below(num_vars as u64) as i32 + 1;
            if clause.iter().any(|l| l.abs() == var) {
                continue;
            }
            clause.push(if self.below(2) == 0 { var } else { -var });
        }
        clause
    }
}

/// All assignments of `n` variables as bit masks: variable `v` is true iff
/// bit `v - 1` is set.
pub fn assignments(n: u32) -> impl Iterator<Item = u32> {
    0..(1u32 << n)
}

pub fn holds(mask: u32, var: u32) -> bool {
    mask & (1 << (var - 1)) != 0
}

pub fn clause_value(clause: &[i32], mask: u32) -> bool {
    clause
        .iter()
        .any(|&l| holds(mask, l.unsigned_abs()) == (l > 0))
}
