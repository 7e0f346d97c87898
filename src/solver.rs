//! Proof-generating satisfiability checker built on the manager.
//!
//! Each input clause becomes a term: a BDD root together with the proof id of
//! the unit clause asserting it. Terms are combined by conjunction and, in
//! bucket elimination, by existential quantification. Every combination
//! derives the unit clause of the new term from the units of its operands, so
//! reaching the zero leaf yields the empty clause.

use log::{debug, info};

use crate::bdd::{Manager, ManagerConfig};
use crate::cnf::Cnf;
use crate::error::{BddError, Result};
use crate::permute::Permuter;
use crate::prover::{ProofMode, Prover};
use crate::reference::Ref;
use crate::types::{ClauseId, Level, Var};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Schedule {
    /// Conjoin all terms left to right.
    #[default]
    Linear,
    /// Bucket elimination: conjoin the terms of the top variable, quantify it
    /// away, and move the result down to the bucket of its new top variable.
    Bucket,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    Unsatisfiable,
    Satisfiable,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Term {
    pub root: Ref,
    /// Proof of the unit clause `[root]`; the tautology sentinel without a
    /// refutation proof.
    pub unit: ClauseId,
}

pub struct Solver {
    manager: Manager,
    terms: Vec<Term>,
    /// Clauses `[-N, A]` proved for each conjunction `N = A ∧ B`.
    certificates: Vec<ClauseId>,
}

impl Solver {
    pub fn new(cnf: &Cnf, permuter: &Permuter, prover: Prover) -> Result<Self> {
        Self::with_config(cnf, permuter, prover, ManagerConfig::default())
    }

    pub fn with_config(cnf: &Cnf, permuter: &Permuter, prover: Prover, config: ManagerConfig) -> Result<Self> {
        if permuter.len() != cnf.num_vars as usize {
            return Err(BddError::Invariant(format!(
                "order has {} variables, formula has {}",
                permuter.len(),
                cnf.num_vars
            )));
        }
        if cnf.has_universals() {
            return Err(BddError::Invariant(
                "universally quantified variables are not supported by the solver".to_string(),
            ));
        }

        let manager = Manager::with_config(cnf.num_vars, prover, config);
        for var in permuter.order() {
            let q = cnf.quantifier(var);
            manager.add_quantified_variable(var, q.qlevel, q.existential)?;
        }

        let ids = if manager.proof_mode().is_enabled() {
            cnf.clauses
                .iter()
                .map(|clause| manager.prover().load_input_clause(clause))
                .collect::<Result<Vec<_>>>()?
        } else {
            (1..=cnf.clauses.len() as u64).map(ClauseId::new).collect()
        };

        let terms = cnf
            .clauses
            .iter()
            .zip(ids)
            .map(|(clause, id)| {
                let (root, unit) = manager.construct_clause(id, clause)?;
                Ok(Term { root, unit })
            })
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Loaded {} clauses over {} variables, {} nodes",
            terms.len(),
            cnf.num_vars,
            manager.num_nodes()
        );

        Ok(Self {
            manager,
            terms,
            certificates: Vec::new(),
        })
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Remaining terms: after a run, the final one.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn certificates(&self) -> &[ClauseId] {
        &self.certificates
    }

    /// Summarize and hand back the prover.
    pub fn finish(self) -> Result<Prover> {
        self.manager.summarize()?;
        Ok(self.manager.into_prover())
    }

    pub fn run(&mut self, schedule: Schedule) -> Result<Outcome> {
        info!("Solving with {:?} schedule", schedule);
        let outcome = match schedule {
            Schedule::Linear => self.run_linear()?,
            Schedule::Bucket => self.run_bucket()?,
        };
        info!("Result: {:?}", outcome);
        Ok(outcome)
    }

    fn mode(&self) -> ProofMode {
        self.manager.proof_mode()
    }

    fn refuted(&mut self, term: Term) -> Outcome {
        if self.mode().refutes() {
            info!("Empty clause derived as {}", term.unit);
        }
        self.terms = vec![term];
        Outcome::Unsatisfiable
    }

    fn run_linear(&mut self) -> Result<Outcome> {
        let mut terms = std::mem::take(&mut self.terms).into_iter();
        let mut acc = match terms.next() {
            None => return Ok(Outcome::Satisfiable),
            Some(term) => term,
        };
        if acc.root == Ref::ZERO {
            return Ok(self.refuted(acc));
        }
        for (step, term) in terms.enumerate() {
            acc = self.conjoin(acc, term)?;
            debug!("Step {}: {} nodes in result", step + 1, self.manager.size(acc.root));
            if acc.root == Ref::ZERO {
                return Ok(self.refuted(acc));
            }
        }
        self.terms = vec![acc];
        Ok(Outcome::Satisfiable)
    }

    fn run_bucket(&mut self) -> Result<Outcome> {
        if self.mode().satisfies() {
            return Err(BddError::Invariant(
                "satisfaction proofs need the linear schedule".to_string(),
            ));
        }
        let mut buckets: Vec<Vec<Term>> = vec![Vec::new(); self.manager.num_variables()];
        for term in std::mem::take(&mut self.terms) {
            if let Some(zero) = self.place(&mut buckets, term) {
                return Ok(self.refuted(zero));
            }
        }

        for index in 0..buckets.len() {
            let mut bucket = std::mem::take(&mut buckets[index]).into_iter();
            let mut acc = match bucket.next() {
                None => continue,
                Some(term) => term,
            };
            for term in bucket {
                acc = self.conjoin(acc, term)?;
                if acc.root == Ref::ZERO {
                    return Ok(self.refuted(acc));
                }
            }
            let var = self.manager.variable(Level::new(index as u32)).id;
            acc = self.quantify(acc, var)?;
            debug!("Bucket {}: {} nodes after quantifying {}", index, self.manager.size(acc.root), var);
            if let Some(zero) = self.place(&mut buckets, acc) {
                return Ok(self.refuted(zero));
            }
            self.manager
                .check_gc(|| buckets.iter().flatten().map(|term| term.root).collect())?;
        }
        Ok(Outcome::Satisfiable)
    }

    /// Put a term in the bucket of its top variable. Returns the term back if
    /// it is the zero leaf.
    fn place(&self, buckets: &mut [Vec<Term>], term: Term) -> Option<Term> {
        match term.root {
            Ref::ZERO => Some(term),
            Ref::ONE => None,
            root => {
                buckets[self.manager.level(root).index()].push(term);
                None
            }
        }
    }

    /// Conjoin two terms, deriving the unit clause of the result.
    pub fn conjoin(&mut self, a: Term, b: Term) -> Result<Term> {
        let mode = self.mode();
        let manager = &self.manager;
        let (root, j) = manager.apply_and_justify(a.root, b.root)?;

        let unit = if mode.refutes() {
            manager.derive_clause(&[manager.lit(root)], &[a.unit, b.unit, j], "conjunction")?
        } else {
            ClauseId::TAUTOLOGY
        };

        if mode.satisfies() {
            for arg in [a.root, b.root] {
                let (holds, id) = manager.justify_imply(root, arg)?;
                if !holds {
                    return Err(BddError::Invariant(format!(
                        "conjunction {} does not imply its argument {}",
                        root, arg
                    )));
                }
                if !id.is_tautology() {
                    self.certificates.push(id);
                }
            }
        }

        if mode == ProofMode::Refutation {
            manager.prover().delete_clauses(&[a.unit, b.unit])?;
        }
        Ok(Term { root, unit })
    }

    /// Existentially quantify `var` out of a term.
    pub fn quantify(&mut self, term: Term, var: Var) -> Result<Term> {
        let mode = self.mode();
        let manager = &self.manager;
        let vars = manager.build_var_set(&[var])?;
        let root = manager.equant(term.root, vars)?;
        if root == term.root {
            return Ok(term);
        }

        let unit = if mode.refutes() {
            let (holds, j) = manager.justify_imply(term.root, root)?;
            if !holds {
                return Err(BddError::Invariant(format!(
                    "{} does not imply its quantification {}",
                    term.root, root
                )));
            }
            let unit = manager.derive_clause(&[manager.lit(root)], &[term.unit, j], "quantification")?;
            if mode == ProofMode::Refutation {
                manager.prover().delete_clauses(&[term.unit])?;
            }
            unit
        } else {
            ClauseId::TAUTOLOGY
        };
        Ok(Term { root, unit })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::prover::ProofFormat;
    use crate::resolver::ClauseStore;

    fn refutation() -> Prover {
        Prover::new(Box::new(std::io::sink()), ProofFormat::Lrat, ProofMode::Refutation)
    }

    fn cnf(num_vars: u32, clauses: &[&[i32]]) -> Cnf {
        let mut cnf = Cnf::new(num_vars);
        for &clause in clauses {
            cnf.add_clause(clause);
        }
        cnf
    }

    #[test]
    fn test_unsat_linear() {
        let f = cnf(2, &[&[1, 2], &[-1, 2], &[1, -2], &[-1, -2]]);
        let mut solver = Solver::new(&f, &Permuter::identity(2), refutation()).unwrap();
        assert_eq!(solver.run(Schedule::Linear).unwrap(), Outcome::Unsatisfiable);

        let last = solver.terms()[0];
        assert_eq!(last.root, Ref::ZERO);
        let prover = solver.finish().unwrap();
        assert_eq!(prover.clause(last.unit), Some(&[][..]));
    }

    #[test]
    fn test_unsat_bucket() {
        let f = cnf(3, &[&[1, 2], &[-1, 3], &[-2, 3], &[-3]]);
        let mut solver = Solver::new(&f, &Permuter::new(&[3, 2, 1]).unwrap(), refutation()).unwrap();
        assert_eq!(solver.run(Schedule::Bucket).unwrap(), Outcome::Unsatisfiable);
    }

    #[test]
    fn test_sat() {
        let f = cnf(3, &[&[1, 2], &[-1, 3]]);
        for schedule in [Schedule::Linear, Schedule::Bucket] {
            let mut solver = Solver::new(&f, &Permuter::identity(3), refutation()).unwrap();
            assert_eq!(solver.run(schedule).unwrap(), Outcome::Satisfiable);
        }
    }

    #[test]
    fn test_empty_input_clause() {
        let f = cnf(1, &[&[1], &[]]);
        let mut solver = Solver::new(&f, &Permuter::identity(1), refutation()).unwrap();
        assert_eq!(solver.run(Schedule::Bucket).unwrap(), Outcome::Unsatisfiable);
        // The input clause itself is the empty clause.
        assert_eq!(solver.terms()[0].unit, ClauseId::new(2));
    }

    #[test]
    fn test_without_proof() {
        let f = cnf(2, &[&[1], &[-1, 2], &[-2]]);
        let mut solver = Solver::new(&f, &Permuter::identity(2), Prover::sink()).unwrap();
        assert_eq!(solver.run(Schedule::Linear).unwrap(), Outcome::Unsatisfiable);
        assert_eq!(solver.terms()[0].unit, ClauseId::TAUTOLOGY);
    }

    #[test]
    fn test_satisfaction_certificates() {
        let prover = Prover::new(Box::new(std::io::sink()), ProofFormat::Lrat, ProofMode::Satisfaction);
        let f = cnf(3, &[&[1, 2], &[-1, 3], &[2, 3]]);
        let mut solver = Solver::new(&f, &Permuter::identity(3), prover).unwrap();
        assert_eq!(solver.run(Schedule::Linear).unwrap(), Outcome::Satisfiable);
        assert!(!solver.certificates().is_empty());

        let prover = Prover::new(Box::new(std::io::sink()), ProofFormat::Lrat, ProofMode::Satisfaction);
        let mut solver = Solver::new(&f, &Permuter::identity(3), prover).unwrap();
        assert!(solver.run(Schedule::Bucket).is_err());
    }

    #[test]
    fn test_rejects_bad_order_and_universals() {
        let f = cnf(2, &[&[1, 2]]);
        assert!(Solver::new(&f, &Permuter::identity(3), Prover::sink()).is_err());

        let q = Cnf::parse("p cnf 2 1\na 1 0\ne 2 0\n1 2 0\n".as_bytes()).unwrap();
        assert!(Solver::new(&q, &Permuter::identity(2), Prover::sink()).is_err());
    }
}
