//! Type-safe wrappers for variables, levels, literals and proof clauses.
//!
//! Variable ids and levels are kept apart on purpose: the id is the name a
//! variable has in the input formula and in the proof, the level is its
//! position in the (static) BDD ordering.
use std::fmt;

/// A literal in a clause of the proof.
///
/// Positive values name input variables (`1..=nvars`) or BDD nodes (above
/// `nvars`), negative values are their negations.
pub type Lit = i32;

/// Literal standing for the constant-one leaf.
///
/// Any clause containing it is a tautology.
pub const TRUE_LIT: Lit = i32::MAX;

/// Literal standing for the constant-zero leaf.
///
/// It is dropped from every clause it appears in.
pub const FALSE_LIT: Lit = -i32::MAX;

/// A variable identifier (1-indexed).
///
/// # Invariants
///
/// - Variable IDs must be >= 1 (0 is the DIMACS clause terminator)
/// - Variable IDs are independent of their position in the variable ordering
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Returns the raw variable ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Positive literal of this variable.
    pub fn lit(self) -> Lit {
        self.0 as Lit
    }

    /// Variable of a (non-zero) literal.
    pub fn of_lit(lit: Lit) -> Self {
        Var::new(lit.unsigned_abs())
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A level in the variable ordering (0-indexed).
///
/// Level 0 is the topmost level. Both leaves live at [`Level::LEAF`], which
/// compares greater than every real level.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(u32);

impl Level {
    /// Sentinel level of the two leaves.
    pub const LEAF: Level = Level(u32::MAX);

    /// Creates a new level with the given index.
    pub fn new(index: u32) -> Self {
        Level(index)
    }

    /// Returns the raw level index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_leaf(self) -> bool {
        self == Level::LEAF
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            write!(f, "L*")
        } else {
            write!(f, "L{}", self.0)
        }
    }
}

/// Identifier of a clause in the proof log.
///
/// Ids are assigned sequentially starting at 1 and never reused.
/// [`ClauseId::TAUTOLOGY`] is the "always true, nothing to prove" sentinel and
/// never names a real clause.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClauseId(u64);

impl ClauseId {
    pub const TAUTOLOGY: ClauseId = ClauseId(0);

    pub const fn new(id: u64) -> Self {
        ClauseId(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_tautology(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tautology() {
            write!(f, "#T")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_creation() {
        let v1 = Var::new(1);
        let v2 = Var::new(2);
        assert_eq!(v1.id(), 1);
        assert_eq!(v2.lit(), 2);
        assert_eq!(Var::of_lit(-2), v2);
        assert!(v1 < v2);
    }

    #[test]
    #[should_panic(expected = "Variable IDs must be >= 1")]
    fn test_var_zero_panics() {
        Var::new(0);
    }

    #[test]
    fn test_leaf_level_is_lowest() {
        assert!(Level::new(0) < Level::new(1));
        assert!(Level::new(1_000_000) < Level::LEAF);
        assert!(Level::LEAF.is_leaf());
    }

    #[test]
    fn test_tautology_sentinel() {
        assert!(ClauseId::TAUTOLOGY.is_tautology());
        assert!(!ClauseId::new(1).is_tautology());
        assert_eq!(ClauseId::new(7).to_string(), "#7");
    }
}
