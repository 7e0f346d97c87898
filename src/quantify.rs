//! Quantification and restriction.
//!
//! Quantified variable sets are passed as the BDD of the positive clause over
//! the variables (see [`Manager::build_var_set`]): walking the set means
//! following low children down to the zero leaf.

use log::debug;

use crate::bdd::Manager;
use crate::cache::{CacheEntry, OpKey};
use crate::error::{BddError, ResolveError, Result};
use crate::node::Definitions;
use crate::reference::Ref;
use crate::resolver::{rup_check, RestrictRules};
use crate::types::{ClauseId, Level, Lit};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Quantifier {
    Exists,
    Forall,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Direction {
    /// Prove `lit ∧ F → F|lit`.
    Down,
    /// Prove `lit ∧ F|lit → F`.
    Up,
}

impl Manager {
    /// Existential quantification of `f` over the variables in `vars`.
    pub fn equant(&self, f: Ref, vars: Ref) -> Result<Ref> {
        self.mark_quantified(vars)?;
        self.quantify(f, vars, Quantifier::Exists)
    }

    /// Universal quantification of `f` over the variables in `vars`.
    pub fn uquant(&self, f: Ref, vars: Ref) -> Result<Ref> {
        self.mark_quantified(vars)?;
        self.quantify(f, vars, Quantifier::Forall)
    }

    /// Levels quantified so far.
    pub fn quantified_count(&self) -> usize {
        self.quantified.borrow().len()
    }

    fn mark_quantified(&self, vars: Ref) -> Result<()> {
        let mut quantified = self.quantified.borrow_mut();
        let mut current = vars;
        while !current.is_leaf() {
            if self.high(current) != Ref::ONE {
                return Err(BddError::Invariant(format!("{} is not a variable set", vars)));
            }
            quantified.insert(self.level(current));
            current = self.low(current);
        }
        Ok(())
    }

    fn quantify(&self, f: Ref, vars: Ref, quantifier: Quantifier) -> Result<Ref> {
        if f.is_leaf() {
            return Ok(f);
        }
        let level = self.level(f);
        let mut vars = vars;
        while !vars.is_leaf() && self.level(vars) < level {
            vars = self.low(vars);
        }
        if vars.is_leaf() {
            return Ok(f);
        }

        let key = match quantifier {
            Quantifier::Exists => OpKey::Equant(f, vars),
            Quantifier::Forall => OpKey::Uquant(f, vars),
        };
        if let Some(entry) = self.cached(&key) {
            return Ok(entry.result);
        }

        let res = if self.level(vars) == level {
            let rest = self.low(vars);
            let high = self.quantify(self.high(f), rest, quantifier)?;
            let low = self.quantify(self.low(f), rest, quantifier)?;
            match quantifier {
                Quantifier::Exists => self.apply_or(high, low)?,
                Quantifier::Forall => self.apply_and(high, low)?,
            }
        } else {
            let high = self.quantify(self.high(f), vars, quantifier)?;
            let low = self.quantify(self.low(f), vars, quantifier)?;
            self.find_or_make(level, high, low)?
        };
        debug!("{:?}({}, {}) = {}", quantifier, f, vars, res);
        self.cache_insert(key, CacheEntry::unjustified(res))?;
        Ok(res)
    }

    /// Restrict `f` to `lit` and prove `[-lit, -F, F|lit]`.
    pub fn restrict_down(&self, f: Ref, lit: Lit) -> Result<(Ref, ClauseId)> {
        let level = self.level_of_lit(lit)?;
        self.restrict(f, lit, level, Direction::Down)
    }

    /// Restrict `f` to `lit` and prove `[-lit, -F|lit, F]`.
    pub fn restrict_up(&self, f: Ref, lit: Lit) -> Result<(Ref, ClauseId)> {
        let level = self.level_of_lit(lit)?;
        self.restrict(f, lit, level, Direction::Up)
    }

    fn restrict(&self, f: Ref, lit: Lit, var_level: Level, direction: Direction) -> Result<(Ref, ClauseId)> {
        let level = self.level(f);
        if level > var_level {
            return Ok((f, ClauseId::TAUTOLOGY));
        }
        let defs = self.definitions(f);
        if level == var_level {
            // The defining clauses of `f` already say it.
            let res = if lit > 0 { self.high(f) } else { self.low(f) };
            let j = match (direction, lit > 0) {
                (Direction::Down, true) => defs.true_down,
                (Direction::Down, false) => defs.false_down,
                (Direction::Up, true) => defs.true_up,
                (Direction::Up, false) => defs.false_up,
            };
            return Ok((res, j));
        }

        let key = match direction {
            Direction::Down => OpKey::RestrictDown(f, lit),
            Direction::Up => OpKey::RestrictUp(f, lit),
        };
        match self.cached(&key) {
            Some(CacheEntry {
                result,
                justification: Some(j),
                ..
            }) => return Ok((result, j)),
            Some(entry) if !self.proving() => return Ok((entry.result, ClauseId::TAUTOLOGY)),
            _ => {}
        }

        let (high, step_high) = self.restrict(self.high(f), lit, var_level, direction)?;
        let (low, step_low) = self.restrict(self.low(f), lit, var_level, direction)?;
        let res = self.find_or_make(level, high, low)?;
        if !self.proving() {
            self.cache_insert(key, CacheEntry::unjustified(res))?;
            return Ok((res, ClauseId::TAUTOLOGY));
        }

        let dr = if high != low { self.definitions(res) } else { Definitions::NONE };
        let (source, target_defs) = match direction {
            Direction::Down => (defs, dr),
            Direction::Up => (dr, defs),
        };
        let rules = RestrictRules {
            source_true_down: source.true_down,
            source_false_down: source.false_down,
            step_high,
            step_low,
            target_true_up: target_defs.true_up,
            target_false_up: target_defs.false_up,
        };
        let target = match direction {
            Direction::Down => [-lit, -self.lit(f), self.lit(res)],
            Direction::Up => [-lit, -self.lit(res), self.lit(f)],
        };
        let j = self.justify(&target, level, &rules, "RESTRICT")?;
        self.cache_insert(key, CacheEntry::justified(res, j))?;
        Ok((res, j))
    }

    /// Universal reduction of the unit clause `[F]`.
    ///
    /// Restricts `F` to `lit`, derives `[-lit, F|lit]` from the unit and the
    /// restriction, then removes the universal literal `-lit`. Returns the
    /// restricted node with the id of its unit clause. Only the QRAT format
    /// supports this step.
    pub fn universal_reduce(&self, f: Ref, unit: ClauseId, lit: Lit) -> Result<(Ref, ClauseId)> {
        let level = self.level_of_lit(lit)?;
        if self.variable(level).existential {
            return Err(BddError::Invariant(format!("{} is not a universal literal", lit)));
        }
        let (res, j) = self.restrict_down(f, lit)?;
        if !self.proving() || res == Ref::ONE {
            return Ok((res, ClauseId::TAUTOLOGY));
        }

        let target = [-lit, self.lit(res)];
        let candidates = [unit, j];
        let mut prover = self.prover();
        let hints = rup_check(&target, &candidates, &*prover).ok_or_else(|| ResolveError {
            target: target.to_vec(),
            candidates: candidates.to_vec(),
            comment: "REDUCE".to_string(),
            reason: "restriction does not follow from the unit",
        })?;
        let restricted = prover.create_clause(&target, &hints, Some("REDUCE"))?;
        let reduced = if restricted.is_tautology() {
            ClauseId::TAUTOLOGY
        } else {
            let reduced = prover.prove_universal(-lit, restricted)?;
            prover.delete_clauses(&[restricted])?;
            reduced
        };
        Ok((res, reduced))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::prover::{ProofFormat, ProofMode, Prover};
    use crate::resolver::ClauseStore;
    use crate::types::Var;

    fn proving(nvars: u32, format: ProofFormat) -> Manager {
        let prover = Prover::new(Box::new(std::io::sink()), format, ProofMode::Refutation);
        Manager::with_variables(nvars, prover)
    }

    fn lit(bdd: &Manager, l: Lit) -> Ref {
        bdd.mk_lit(l).unwrap()
    }

    #[test]
    fn test_exists() {
        let bdd = Manager::without_proof(3);

        let x = lit(&bdd, 1);
        let y = lit(&bdd, 2);
        let z = lit(&bdd, 3);
        let xy = bdd.apply_and(x, y).unwrap();
        let f = bdd.apply_or(xy, z).unwrap();

        let vars = bdd.build_var_set(&[Var::new(1)]).unwrap();
        let g = bdd.equant(f, vars).unwrap();
        assert_eq!(g, bdd.apply_or(y, z).unwrap());

        let all = bdd.build_var_set(&[Var::new(1), Var::new(2), Var::new(3)]).unwrap();
        assert_eq!(bdd.equant(f, all).unwrap(), bdd.one());
        assert_eq!(bdd.quantified_count(), 3);
    }

    #[test]
    fn test_forall() {
        let bdd = Manager::without_proof(3);

        let x = lit(&bdd, 1);
        let y = lit(&bdd, 2);
        let f = bdd.apply_or(x, y).unwrap();

        let vars = bdd.build_var_set(&[Var::new(1)]).unwrap();
        assert_eq!(bdd.uquant(f, vars).unwrap(), y);
        assert_eq!(bdd.uquant(x, vars).unwrap(), bdd.zero());
    }

    #[test]
    fn test_quantify_is_idempotent() {
        let bdd = Manager::without_proof(4);

        let f = bdd.build_clause(&[1, -3]).unwrap();
        let g = bdd.build_clause(&[2, 4]).unwrap();
        let h = bdd.apply_and(f, g).unwrap();

        let vars = bdd.build_var_set(&[Var::new(2), Var::new(3)]).unwrap();
        let once = bdd.equant(h, vars).unwrap();
        assert_eq!(bdd.equant(once, vars).unwrap(), once);
        // Variables outside the support change nothing.
        let other = bdd.build_var_set(&[Var::new(4)]).unwrap();
        assert_eq!(bdd.equant(f, other).unwrap(), f);
    }

    #[test]
    fn test_var_set_must_be_positive_clause() {
        let bdd = Manager::without_proof(2);

        let not_x = lit(&bdd, -1);
        assert!(bdd.equant(not_x, not_x).is_err());
    }

    #[test]
    fn test_restrict() {
        let bdd = Manager::without_proof(3);

        let f = bdd.build_clause(&[1, 3]).unwrap();
        let z = lit(&bdd, 3);
        assert_eq!(bdd.restrict_down(f, -1).unwrap().0, z);
        assert_eq!(bdd.restrict_down(f, 1).unwrap().0, bdd.one());
        assert_eq!(bdd.restrict_up(f, -3).unwrap().0, lit(&bdd, 1));
    }

    #[test]
    fn test_restrict_outside_support() {
        let bdd = proving(3, ProofFormat::Lrat);

        let f = bdd.build_clause(&[1, 3]).unwrap();
        assert_eq!(bdd.restrict_down(f, 2).unwrap(), (f, ClauseId::TAUTOLOGY));
        assert_eq!(bdd.restrict_up(f, -2).unwrap(), (f, ClauseId::TAUTOLOGY));

        let g = lit(&bdd, 1);
        assert_eq!(bdd.restrict_down(g, 3).unwrap(), (g, ClauseId::TAUTOLOGY));
    }

    #[test]
    fn test_restrict_justifications() {
        let bdd = proving(3, ProofFormat::Lrat);

        let f = bdd.build_clause(&[-1, 2, 3]).unwrap();
        let (down, j_down) = bdd.restrict_down(f, -2).unwrap();
        assert_eq!(down, bdd.build_clause(&[-1, 3]).unwrap());
        let mut clause = bdd.prover().clause(j_down).unwrap().to_vec();
        clause.sort();
        let mut expected = vec![2, -bdd.lit(f), bdd.lit(down)];
        expected.sort();
        assert_eq!(clause, expected);

        let (up, j_up) = bdd.restrict_up(f, -2).unwrap();
        assert_eq!(up, down);
        assert!(!j_up.is_tautology());
        assert_ne!(j_up, j_down);
    }

    #[test]
    fn test_universal_reduce() {
        let prover = Prover::new(Box::new(std::io::sink()), ProofFormat::Qrat, ProofMode::Refutation);
        let bdd = Manager::new(2, prover);
        bdd.add_quantified_variable(Var::new(1), 1, false).unwrap();
        bdd.add_quantified_variable(Var::new(2), 2, true).unwrap();

        // F = x1 ∨ x2, x1 universal
        let input = bdd.prover().load_input_clause(&[1, 2]).unwrap();
        let (f, unit) = bdd.construct_clause(input, &[1, 2]).unwrap();
        let (r, reduced) = bdd.universal_reduce(f, unit, -1).unwrap();

        assert_eq!(r, lit(&bdd, 2));
        let expected = [bdd.lit(r)];
        assert_eq!(bdd.prover().clause(reduced), Some(&expected[..]));
    }

    #[test]
    fn test_universal_reduce_rejects_existential() {
        let bdd = proving(2, ProofFormat::Qrat);

        let f = lit(&bdd, 1);
        assert!(bdd.universal_reduce(f, ClauseId::TAUTOLOGY, 1).is_err());
    }
}
