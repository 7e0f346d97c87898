use crate::reference::Ref;
use crate::types::{ClauseId, Level, Lit, Var};

/// A decision variable of the manager.
///
/// Immutable once created. `qlevel` and `existential` only matter for
/// quantified formulas; plain CNF variables are existential at qlevel 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Variable {
    pub level: Level,
    pub id: Var,
    pub qlevel: u32,
    pub existential: bool,
}

/// Defining clauses of a branch node `N = ITE(x, H, L)`.
///
/// ```text
/// true_up    = [ N, -x, -H]     x ∧ H → N
/// false_up   = [ N,  x, -L]    ¬x ∧ L → N
/// true_down  = [-N, -x,  H]     x ∧ N → H
/// false_down = [-N,  x,  L]    ¬x ∧ N → L
/// ```
///
/// A clause that cleans to a tautology (a leaf child) is stored as
/// [`ClauseId::TAUTOLOGY`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Definitions {
    pub true_up: ClauseId,
    pub false_up: ClauseId,
    pub true_down: ClauseId,
    pub false_down: ClauseId,
}

impl Definitions {
    pub const NONE: Definitions = Definitions {
        true_up: ClauseId::TAUTOLOGY,
        false_up: ClauseId::TAUTOLOGY,
        true_down: ClauseId::TAUTOLOGY,
        false_down: ClauseId::TAUTOLOGY,
    };

    /// All real (non-tautology) clause ids.
    pub fn clauses(&self) -> impl Iterator<Item = ClauseId> {
        [self.true_up, self.false_up, self.true_down, self.false_down]
            .into_iter()
            .filter(|id| !id.is_tautology())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Branch {
    pub level: Level,
    pub high: Ref,
    pub low: Ref,
    /// Extension variable naming this node in the proof.
    pub id: Lit,
    /// Quantifier block the extension variable is declared in.
    pub qlevel: u32,
    pub definitions: Definitions,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Node {
    Leaf(bool),
    Branch(Branch),
}

impl Node {
    pub fn level(&self) -> Level {
        match self {
            Node::Leaf(_) => Level::LEAF,
            Node::Branch(b) => b.level,
        }
    }
}
