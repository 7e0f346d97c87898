//! # pgbdd: proof-generating Binary Decision Diagrams
//!
//! **`pgbdd`** is a manager-centric BDD library in which every operation can
//! emit a checkable proof of its result. It is meant for deciding
//! satisfiability of CNF formulas: when the formula is unsatisfiable, the
//! emitted proof derives the empty clause and can be validated by an
//! independent LRAT (or QRAT) checker.
//!
//! ## How proofs are built
//!
//! Every BDD node `N = ITE(x, H, L)` is named in the proof by a fresh
//! *extension variable*, introduced through four defining clauses:
//!
//! ```text
//! [ N, -x, -H]   [ N, x, -L]   [-N, -x, H]   [-N, x, L]
//! ```
//!
//! These clauses are blocked on `N` when added, so they are valid extension
//! steps. Each recursive operation then justifies its result with a single
//! clause derived from the children's justifications and the defining
//! clauses, e.g. `[-A, -B, N]` for `N = A ∧ B`.
//!
//! ## Basic Usage
//!
//! ```rust
//! use pgbdd::bdd::Manager;
//! use pgbdd::prover::{ProofFormat, ProofMode, Prover};
//!
//! // Proof goes to a sink here; any `Write` works.
//! let prover = Prover::new(Box::new(std::io::sink()), ProofFormat::Lrat, ProofMode::Refutation);
//! let bdd = Manager::with_variables(2, prover);
//!
//! let x1 = bdd.mk_lit(1).unwrap();
//! let x2 = bdd.mk_lit(2).unwrap();
//!
//! // f = x1 AND x2, with a proof of [-x1, -x2, f]
//! let (f, justification) = bdd.apply_and_justify(x1, x2).unwrap();
//! assert!(!justification.is_tautology());
//!
//! // f implies x1
//! let (holds, _) = bdd.justify_imply(f, x1).unwrap();
//! assert!(holds);
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: The [`Manager`][crate::bdd::Manager] with node creation and the boolean operations.
//! - **[`quantify`]**: Quantification and restriction.
//! - **[`prover`]**: Proof log writer (LRAT, QRAT, trace; text or binary).
//! - **[`resolver`]**: Clause cleaning, resolution and reverse unit propagation.
//! - **[`gc`]**: Garbage collection of nodes together with their proof clauses.
//! - **[`solver`]**: CNF satisfiability by linear conjunction or bucket elimination.
//! - **[`sat`]**: Model counting and path enumeration.

pub mod bdd;
pub mod cache;
pub mod cnf;
pub mod error;
pub mod gc;
pub mod node;
pub mod permute;
pub mod prover;
pub mod quantify;
pub mod reference;
pub mod resolver;
pub mod sat;
pub mod solver;
pub mod storage;
pub mod subtable;
pub mod types;
