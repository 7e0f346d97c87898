use std::cell::{Cell, RefCell, RefMut};
use std::cmp::{max, min};
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;

use log::{debug, info};

use crate::cache::{CacheEntry, OpCache, OpKey};
use crate::error::{BddError, ResolveError, Result};
use crate::node::{Branch, Definitions, Node, Variable};
use crate::prover::{ProofMode, Prover};
use crate::reference::Ref;
use crate::resolver::{clean_clause, rup_check, AndRules, Cleaned, ImplyRules, OrRules, RuleIndex, VResolver};
use crate::storage::Storage;
use crate::subtable::UniqueTable;
use crate::types::{ClauseId, Level, Lit, Var, FALSE_LIT, TRUE_LIT};

/// Tuning knobs of a [`Manager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Garbage collection runs once more than this many variables were
    /// quantified since the previous collection.
    pub gc_threshold: usize,
    /// Initial capacity of the operation cache.
    pub cache_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            gc_threshold: 4,
            cache_capacity: 1 << 14,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ManagerStats {
    pub nodes_created: usize,
    pub max_live: usize,
    pub gc_count: usize,
    pub nodes_collected: usize,
    pub clauses_collected: usize,
}

/// BDD manager with proof generation.
///
/// Owns every node, the unique table, the operation cache and the prover.
/// Each branch node gets an extension variable and (when a proof is being
/// generated) four defining clauses tying it to its variable and children.
/// Operations return a [`Ref`] and, in their `_justify` variants, the id of a
/// clause proving that the result relates to the operands.
pub struct Manager {
    pub(crate) config: ManagerConfig,
    nvars: u32,
    variables: RefCell<Vec<Variable>>,
    levels: RefCell<Vec<Option<Level>>>,
    pub(crate) storage: RefCell<Storage>,
    pub(crate) unique: RefCell<UniqueTable>,
    pub(crate) cache: RefCell<OpCache>,
    prover: RefCell<Prover>,
    pub(crate) quantified: RefCell<HashSet<Level>>,
    pub(crate) last_gc: Cell<usize>,
    next_id: Cell<Lit>,
    pub(crate) stats: RefCell<ManagerStats>,
}

impl Manager {
    /// Create a manager for input variables `1..=nvars`. Variables still need
    /// to be declared with [`Manager::add_variable`].
    pub fn new(nvars: u32, prover: Prover) -> Self {
        Self::with_config(nvars, prover, ManagerConfig::default())
    }

    pub fn with_config(nvars: u32, prover: Prover, config: ManagerConfig) -> Self {
        let cache = OpCache::new(config.cache_capacity);
        Self {
            config,
            nvars,
            variables: RefCell::new(Vec::with_capacity(nvars as usize)),
            levels: RefCell::new(vec![None; nvars as usize + 1]),
            storage: RefCell::new(Storage::new(1 << 10)),
            unique: RefCell::new(UniqueTable::default()),
            cache: RefCell::new(cache),
            prover: RefCell::new(prover),
            quantified: RefCell::new(HashSet::new()),
            last_gc: Cell::new(0),
            next_id: Cell::new(nvars as Lit + 1),
            stats: RefCell::new(ManagerStats::default()),
        }
    }

    /// Manager with variables `1..=nvars` declared in their natural order.
    pub fn with_variables(nvars: u32, prover: Prover) -> Self {
        let manager = Self::new(nvars, prover);
        for id in 1..=nvars {
            manager.push_variable(Var::new(id), 1, true);
        }
        manager
    }

    /// Manager without proof generation.
    pub fn without_proof(nvars: u32) -> Self {
        Self::with_variables(nvars, Prover::sink())
    }
}

impl Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Manager")
            .field("variables", &self.variables.borrow().len())
            .field("size", &storage.size())
            .field("real_size", &storage.real_size())
            .field("mode", &self.proof_mode())
            .finish()
    }
}

impl Manager {
    pub fn prover(&self) -> RefMut<'_, Prover> {
        self.prover.borrow_mut()
    }

    pub fn into_prover(self) -> Prover {
        self.prover.into_inner()
    }

    pub fn cache(&self) -> std::cell::Ref<'_, OpCache> {
        self.cache.borrow()
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats.borrow().clone()
    }

    pub fn proof_mode(&self) -> ProofMode {
        self.prover.borrow().mode()
    }

    pub(crate) fn proving(&self) -> bool {
        self.proof_mode().is_enabled()
    }

    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.is_leaf()
    }

    /// Number of declared variables.
    pub fn num_variables(&self) -> usize {
        self.variables.borrow().len()
    }

    /// Largest input variable id.
    pub fn max_variable(&self) -> u32 {
        self.nvars
    }

    /// Number of live branch nodes.
    pub fn num_nodes(&self) -> usize {
        self.unique.borrow().len()
    }

    pub fn node(&self, node: Ref) -> Node {
        *self.storage.borrow().node(node)
    }

    fn branch(&self, node: Ref) -> Option<Branch> {
        match self.node(node) {
            Node::Leaf(_) => None,
            Node::Branch(b) => Some(b),
        }
    }

    pub fn level(&self, node: Ref) -> Level {
        self.node(node).level()
    }

    /// High child; a leaf is its own child.
    pub fn high(&self, node: Ref) -> Ref {
        self.branch(node).map_or(node, |b| b.high)
    }

    pub fn low(&self, node: Ref) -> Ref {
        self.branch(node).map_or(node, |b| b.low)
    }

    /// Proof literal of a node: its extension variable, or the leaf literal.
    pub fn lit(&self, node: Ref) -> Lit {
        match self.node(node) {
            Node::Leaf(true) => TRUE_LIT,
            Node::Leaf(false) => FALSE_LIT,
            Node::Branch(b) => b.id,
        }
    }

    pub fn definitions(&self, node: Ref) -> Definitions {
        self.branch(node).map_or(Definitions::NONE, |b| b.definitions)
    }

    /// Defining clauses of `node` if it branches at `level`.
    pub(crate) fn definitions_at(&self, node: Ref, level: Level) -> Definitions {
        if self.level(node) == level {
            self.definitions(node)
        } else {
            Definitions::NONE
        }
    }

    fn qlevel(&self, node: Ref) -> u32 {
        self.branch(node).map_or(0, |b| b.qlevel)
    }

    pub fn variable(&self, level: Level) -> Variable {
        self.variables.borrow()[level.index()]
    }

    pub fn variable_of(&self, node: Ref) -> Option<Variable> {
        self.branch(node).map(|b| self.variable(b.level))
    }

    pub fn level_of(&self, var: Var) -> Option<Level> {
        self.levels.borrow().get(var.id() as usize).copied().flatten()
    }

    /// Level of the variable of a literal, which must be declared.
    pub fn level_of_lit(&self, lit: Lit) -> Result<Level> {
        let out_of_range = BddError::LiteralOutOfRange { lit, max: self.nvars };
        if lit == 0 || lit.unsigned_abs() > self.nvars {
            return Err(out_of_range);
        }
        self.level_of(Var::of_lit(lit)).ok_or(out_of_range)
    }

    /// Proof literal of the variable at `level`.
    pub(crate) fn var_lit(&self, level: Level) -> Lit {
        self.variable(level).id.lit()
    }

    /// Cofactors of `node` with respect to the variable at `level`, which must
    /// not be below the node's own level.
    pub fn cofactors(&self, node: Ref, level: Level) -> (Ref, Ref) {
        match self.branch(node) {
            Some(b) if b.level == level => (b.high, b.low),
            Some(b) => {
                debug_assert!(level < b.level);
                (node, node)
            }
            None => (node, node),
        }
    }

    /// Declare an existential variable at the next (lowest) level.
    pub fn add_variable(&self, id: Var) -> Result<Level> {
        self.add_quantified_variable(id, 1, true)
    }

    pub fn add_quantified_variable(&self, id: Var, qlevel: u32, existential: bool) -> Result<Level> {
        if id.id() > self.nvars {
            return Err(BddError::LiteralOutOfRange {
                lit: id.lit(),
                max: self.nvars,
            });
        }
        if self.level_of(id).is_some() {
            return Err(BddError::Invariant(format!("variable {} declared twice", id)));
        }
        Ok(self.push_variable(id, qlevel, existential))
    }

    /// Place an in-range, undeclared variable at the next level.
    fn push_variable(&self, id: Var, qlevel: u32, existential: bool) -> Level {
        let mut variables = self.variables.borrow_mut();
        let level = Level::new(variables.len() as u32);
        variables.push(Variable {
            level,
            id,
            qlevel,
            existential,
        });
        self.levels.borrow_mut()[id.id() as usize] = Some(level);
        self.unique.borrow_mut().add_level(level);
        debug!("add_variable({}) at {} (qlevel {}, {})", id, level, qlevel, if existential { "∃" } else { "∀" });
        level
    }

    /// Find the node `ITE(x_level, high, low)` or create it.
    ///
    /// New nodes get the next extension variable and, in proof mode, their
    /// defining clauses.
    pub fn find_or_make(&self, level: Level, high: Ref, low: Ref) -> Result<Ref> {
        if high == low {
            return Ok(high);
        }
        if level >= self.level(high) || level >= self.level(low) {
            return Err(BddError::Invariant(format!(
                "node at {} cannot have children {} ({}) and {} ({})",
                level,
                high,
                self.level(high),
                low,
                self.level(low)
            )));
        }
        if let Some(node) = self.unique.borrow().find(level, high, low) {
            return Ok(node);
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let variable = self.variable(level);
        let qlevel = max(variable.qlevel, max(self.qlevel(high), self.qlevel(low)));
        let definitions = if self.proving() {
            self.define(id, variable.id.lit(), qlevel, self.lit(high), self.lit(low))?
        } else {
            Definitions::NONE
        };

        let node = self.storage.borrow_mut().alloc(Node::Branch(Branch {
            level,
            high,
            low,
            id,
            qlevel,
            definitions,
        }));
        self.unique.borrow_mut().insert(level, high, low, node);

        let live = self.num_nodes();
        let mut stats = self.stats.borrow_mut();
        stats.nodes_created += 1;
        stats.max_live = max(stats.max_live, live);
        debug!("mk({} ? {} : {}) = {} as N{}", variable.id, high, low, node, id);
        Ok(node)
    }

    fn define(&self, n: Lit, x: Lit, qlevel: u32, h: Lit, l: Lit) -> Result<Definitions> {
        let mut prover = self.prover.borrow_mut();
        prover.prove_extend(n, qlevel)?;
        let true_up = prover.prove_add_blocked(&[n, -x, -h], &[])?;
        let false_up = prover.prove_add_blocked(&[n, x, -l], &[])?;
        let up: Vec<ClauseId> = [true_up, false_up]
            .into_iter()
            .filter(|id| !id.is_tautology())
            .collect();
        let true_down = prover.prove_add_blocked(&[-n, -x, h], &up)?;
        let false_down = prover.prove_add_blocked(&[-n, x, l], &up)?;
        Ok(Definitions {
            true_up,
            false_up,
            true_down,
            false_down,
        })
    }

    /// Node for a positive variable.
    pub fn mk_var(&self, var: Var) -> Result<Ref> {
        self.mk_lit(var.lit())
    }

    pub fn mk_lit(&self, lit: Lit) -> Result<Ref> {
        let level = self.level_of_lit(lit)?;
        if lit > 0 {
            self.find_or_make(level, Ref::ONE, Ref::ZERO)
        } else {
            self.find_or_make(level, Ref::ZERO, Ref::ONE)
        }
    }

    /// Derive `target` by unit propagation over `candidates` and add it to the
    /// proof.
    pub fn derive_clause(&self, target: &[Lit], candidates: &[ClauseId], comment: &str) -> Result<ClauseId> {
        let target = match clean_clause(target) {
            Cleaned::Tautology => return Ok(ClauseId::TAUTOLOGY),
            Cleaned::Clause(clause) => clause,
        };
        let mut prover = self.prover.borrow_mut();
        let hints = rup_check(&target, candidates, &*prover).ok_or_else(|| ResolveError {
            target: target.clone(),
            candidates: candidates.to_vec(),
            comment: comment.to_string(),
            reason: "unit propagation does not reach a conflict",
        })?;
        prover.create_clause(&target, &hints, Some(comment))
    }

    pub(crate) fn justify(&self, target: &[Lit], level: Level, rules: &impl RuleIndex, comment: &str) -> Result<ClauseId> {
        let split = self.var_lit(level);
        let mut prover = self.prover.borrow_mut();
        VResolver::new(&mut prover).run(target, split, rules, comment)
    }

    pub(crate) fn cached(&self, key: &OpKey) -> Option<CacheEntry> {
        self.cache.borrow_mut().get(key).cloned()
    }

    pub(crate) fn cache_insert(&self, key: OpKey, entry: CacheEntry) -> Result<()> {
        let stale = self.cache.borrow_mut().insert(key, entry);
        if !stale.is_empty() {
            self.prover.borrow_mut().delete_clauses(&stale)?;
        }
        Ok(())
    }

    /// Chain of nodes representing a clause, bottom-up, the root last.
    fn clause_chain(&self, lits: &[Lit]) -> Result<Option<Vec<Ref>>> {
        let mut sorted = lits
            .iter()
            .map(|&lit| Ok((self.level_of_lit(lit)?, lit)))
            .collect::<Result<Vec<_>>>()?;
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.windows(2).any(|w| w[0].0 == w[1].0) {
            // Complementary literals.
            return Ok(None);
        }

        let mut chain = Vec::with_capacity(sorted.len());
        let mut root = Ref::ZERO;
        for &(level, lit) in sorted.iter().rev() {
            root = if lit > 0 {
                self.find_or_make(level, Ref::ONE, root)?
            } else {
                self.find_or_make(level, root, Ref::ONE)?
            };
            chain.push(root);
        }
        Ok(Some(chain))
    }

    /// BDD of a clause, without any proof beyond the node definitions.
    pub fn build_clause(&self, lits: &[Lit]) -> Result<Ref> {
        debug!("build_clause({:?})", lits);
        Ok(match self.clause_chain(lits)? {
            None => Ref::ONE,
            Some(chain) => chain.last().copied().unwrap_or(Ref::ZERO),
        })
    }

    /// BDD of input clause `clause_id` plus a proof of the unit clause
    /// `[root]`.
    ///
    /// A tautological clause yields [`Ref::ONE`] and no proof step; the empty
    /// clause yields [`Ref::ZERO`] justified by the input clause itself.
    pub fn construct_clause(&self, clause_id: ClauseId, lits: &[Lit]) -> Result<(Ref, ClauseId)> {
        debug!("construct_clause({}, {:?})", clause_id, lits);
        let chain = match self.clause_chain(lits)? {
            None => return Ok((Ref::ONE, ClauseId::TAUTOLOGY)),
            Some(chain) => chain,
        };
        let root = match chain.last() {
            None => return Ok((Ref::ZERO, clause_id)),
            Some(&root) => root,
        };
        if !self.proving() {
            return Ok((root, ClauseId::TAUTOLOGY));
        }

        let mut candidates: Vec<ClauseId> = chain
            .iter()
            .flat_map(|&node| {
                let d = self.definitions(node);
                [d.true_up, d.false_up]
            })
            .collect();
        candidates.push(clause_id);
        let unit = self.derive_clause(&[self.lit(root)], &candidates, "clause")?;
        Ok((root, unit))
    }

    /// Positive clause of `vars`, the representation of a variable set used
    /// by quantification.
    pub fn build_var_set(&self, vars: &[Var]) -> Result<Ref> {
        let lits: Vec<Lit> = vars.iter().map(|v| v.lit()).collect();
        self.build_clause(&lits)
    }

    pub fn apply_not(&self, a: Ref) -> Result<Ref> {
        if a.is_leaf() {
            return Ok(if a == Ref::ONE { Ref::ZERO } else { Ref::ONE });
        }
        let key = OpKey::Not(a);
        if let Some(entry) = self.cached(&key) {
            return Ok(entry.result);
        }
        let level = self.level(a);
        let high = self.apply_not(self.high(a))?;
        let low = self.apply_not(self.low(a))?;
        let res = self.find_or_make(level, high, low)?;
        self.cache_insert(key, CacheEntry::unjustified(res))?;
        Ok(res)
    }

    fn split(&self, a: Ref, b: Ref) -> (Level, (Ref, Ref), (Ref, Ref)) {
        let level = min(self.level(a), self.level(b));
        (level, self.cofactors(a, level), self.cofactors(b, level))
    }

    pub fn apply_and(&self, a: Ref, b: Ref) -> Result<Ref> {
        if a == Ref::ZERO || b == Ref::ZERO {
            return Ok(Ref::ZERO);
        }
        if a == Ref::ONE || a == b {
            return Ok(b);
        }
        if b == Ref::ONE {
            return Ok(a);
        }
        let key = OpKey::and(a, b);
        if let Some(entry) = self.cached(&key) {
            return Ok(entry.result);
        }
        let (level, (a1, a0), (b1, b0)) = self.split(a, b);
        let high = self.apply_and(a1, b1)?;
        let low = self.apply_and(a0, b0)?;
        let res = self.find_or_make(level, high, low)?;
        self.cache_insert(key, CacheEntry::unjustified(res))?;
        Ok(res)
    }

    /// Conjunction `N = A ∧ B` with a proof of `[-A, -B, N]`.
    pub fn apply_and_justify(&self, a: Ref, b: Ref) -> Result<(Ref, ClauseId)> {
        if !self.proving() {
            return Ok((self.apply_and(a, b)?, ClauseId::TAUTOLOGY));
        }
        if a == Ref::ZERO || b == Ref::ZERO {
            return Ok((Ref::ZERO, ClauseId::TAUTOLOGY));
        }
        if a == Ref::ONE || a == b {
            return Ok((b, ClauseId::TAUTOLOGY));
        }
        if b == Ref::ONE {
            return Ok((a, ClauseId::TAUTOLOGY));
        }
        let key = OpKey::and(a, b);
        if let Some(CacheEntry {
            result,
            justification: Some(j),
            ..
        }) = self.cached(&key)
        {
            return Ok((result, j));
        }

        debug!("apply_and_justify({}, {})", a, b);
        let (level, (a1, a0), (b1, b0)) = self.split(a, b);
        let (high, and_high) = self.apply_and_justify(a1, b1)?;
        let (low, and_low) = self.apply_and_justify(a0, b0)?;
        let res = self.find_or_make(level, high, low)?;

        let da = self.definitions_at(a, level);
        let db = self.definitions_at(b, level);
        let dr = if high != low { self.definitions(res) } else { Definitions::NONE };
        let rules = AndRules {
            a_true_down: da.true_down,
            a_false_down: da.false_down,
            b_true_down: db.true_down,
            b_false_down: db.false_down,
            res_true_up: dr.true_up,
            res_false_up: dr.false_up,
            and_high,
            and_low,
        };
        let target = [-self.lit(a), -self.lit(b), self.lit(res)];
        let j = self.justify(&target, level, &rules, "AND")?;
        self.cache_insert(key, CacheEntry::justified(res, j))?;
        Ok((res, j))
    }

    pub fn apply_or(&self, a: Ref, b: Ref) -> Result<Ref> {
        if a == Ref::ONE || b == Ref::ONE {
            return Ok(Ref::ONE);
        }
        if a == Ref::ZERO || a == b {
            return Ok(b);
        }
        if b == Ref::ZERO {
            return Ok(a);
        }
        let key = OpKey::or(a, b);
        if let Some(entry) = self.cached(&key) {
            return Ok(entry.result);
        }
        let (level, (a1, a0), (b1, b0)) = self.split(a, b);
        let high = self.apply_or(a1, b1)?;
        let low = self.apply_or(a0, b0)?;
        let res = self.find_or_make(level, high, low)?;
        self.cache_insert(key, CacheEntry::unjustified(res))?;
        Ok(res)
    }

    /// Disjunction `N = A ∨ B` with a proof of `[-N, A, B]`.
    pub fn apply_or_justify(&self, a: Ref, b: Ref) -> Result<(Ref, ClauseId)> {
        if !self.proving() {
            return Ok((self.apply_or(a, b)?, ClauseId::TAUTOLOGY));
        }
        if a == Ref::ONE || b == Ref::ONE {
            return Ok((Ref::ONE, ClauseId::TAUTOLOGY));
        }
        if a == Ref::ZERO || a == b {
            return Ok((b, ClauseId::TAUTOLOGY));
        }
        if b == Ref::ZERO {
            return Ok((a, ClauseId::TAUTOLOGY));
        }
        let key = OpKey::or(a, b);
        if let Some(CacheEntry {
            result,
            justification: Some(j),
            ..
        }) = self.cached(&key)
        {
            return Ok((result, j));
        }

        debug!("apply_or_justify({}, {})", a, b);
        let (level, (a1, a0), (b1, b0)) = self.split(a, b);
        let (high, or_high) = self.apply_or_justify(a1, b1)?;
        let (low, or_low) = self.apply_or_justify(a0, b0)?;
        let res = self.find_or_make(level, high, low)?;

        let da = self.definitions_at(a, level);
        let db = self.definitions_at(b, level);
        let dr = if high != low { self.definitions(res) } else { Definitions::NONE };
        let rules = OrRules {
            res_true_down: dr.true_down,
            res_false_down: dr.false_down,
            a_true_up: da.true_up,
            a_false_up: da.false_up,
            b_true_up: db.true_up,
            b_false_up: db.false_up,
            or_high,
            or_low,
        };
        let target = [-self.lit(res), self.lit(a), self.lit(b)];
        let j = self.justify(&target, level, &rules, "OR")?;
        self.cache_insert(key, CacheEntry::justified(res, j))?;
        Ok((res, j))
    }

    pub fn apply_xor(&self, a: Ref, b: Ref) -> Result<Ref> {
        if a == b {
            return Ok(Ref::ZERO);
        }
        if a == Ref::ZERO {
            return Ok(b);
        }
        if b == Ref::ZERO {
            return Ok(a);
        }
        if a == Ref::ONE {
            return self.apply_not(b);
        }
        if b == Ref::ONE {
            return self.apply_not(a);
        }
        let key = OpKey::xor(a, b);
        if let Some(entry) = self.cached(&key) {
            return Ok(entry.result);
        }
        let (level, (a1, a0), (b1, b0)) = self.split(a, b);
        let high = self.apply_xor(a1, b1)?;
        let low = self.apply_xor(a0, b0)?;
        let res = self.find_or_make(level, high, low)?;
        self.cache_insert(key, CacheEntry::unjustified(res))?;
        Ok(res)
    }

    /// Decide whether `A → B` holds and, if so, prove `[-A, B]`.
    ///
    /// Returns `(false, TAUTOLOGY)` when the implication fails. Without a
    /// proof the clause id is always the tautology sentinel.
    pub fn justify_imply(&self, a: Ref, b: Ref) -> Result<(bool, ClauseId)> {
        if a == b || a == Ref::ZERO || b == Ref::ONE {
            return Ok((true, ClauseId::TAUTOLOGY));
        }
        if a == Ref::ONE || b == Ref::ZERO {
            return Ok((false, ClauseId::TAUTOLOGY));
        }
        let key = OpKey::Imply(a, b);
        if let Some(entry) = self.cached(&key) {
            let holds = entry.result == Ref::ONE;
            return Ok((holds, entry.justification.unwrap_or(ClauseId::TAUTOLOGY)));
        }

        debug!("justify_imply({}, {})", a, b);
        let (level, (a1, a0), (b1, b0)) = self.split(a, b);
        let (holds, imply_high) = self.justify_imply(a1, b1)?;
        if !holds {
            self.cache_insert(key, CacheEntry::unjustified(Ref::ZERO))?;
            return Ok((false, ClauseId::TAUTOLOGY));
        }
        let (holds, imply_low) = self.justify_imply(a0, b0)?;
        if !holds {
            self.cache_insert(key, CacheEntry::unjustified(Ref::ZERO))?;
            return Ok((false, ClauseId::TAUTOLOGY));
        }
        if !self.proving() {
            self.cache_insert(key, CacheEntry::unjustified(Ref::ONE))?;
            return Ok((true, ClauseId::TAUTOLOGY));
        }

        let da = self.definitions_at(a, level);
        let db = self.definitions_at(b, level);
        let rules = ImplyRules {
            a_true_down: da.true_down,
            a_false_down: da.false_down,
            b_true_up: db.true_up,
            b_false_up: db.false_up,
            imply_high,
            imply_low,
        };
        let target = [-self.lit(a), self.lit(b)];
        let j = self.justify(&target, level, &rules, "IMPLY")?;
        self.cache_insert(key, CacheEntry::justified(Ref::ONE, j))?;
        Ok((true, j))
    }

    /// All nodes reachable from `nodes`, leaves included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<Ref> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) && !node.is_leaf() {
                queue.push_back(self.high(node));
                queue.push_back(self.low(node));
            }
        }

        visited
    }

    /// Number of nodes in the graph of `f`, leaves included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Variables `f` depends on, from top to bottom.
    pub fn support(&self, f: Ref) -> Vec<Var> {
        let mut levels: Vec<Level> = self
            .descendants([f])
            .into_iter()
            .filter(|node| !node.is_leaf())
            .map(|node| self.level(node))
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels.into_iter().map(|level| self.variable(level).id).collect()
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        match self.node(node) {
            Node::Leaf(false) => "(0)".to_string(),
            Node::Leaf(true) => "(1)".to_string(),
            Node::Branch(b) => format!(
                "{}:({}, {}, {})",
                node,
                self.variable(b.level).id,
                self.to_bracket_string(b.high),
                self.to_bracket_string(b.low)
            ),
        }
    }

    /// Log a summary of the manager and its proof.
    pub fn summarize(&self) -> Result<()> {
        let stats = self.stats();
        let cache = self.cache();
        info!(
            "Nodes: {} created, {} live at most, {} live now",
            stats.nodes_created,
            stats.max_live,
            self.num_nodes()
        );
        info!(
            "Cache: {} entries, {} hits, {} misses, {} inserts",
            cache.len(),
            cache.hits(),
            cache.misses(),
            cache.adds()
        );
        info!(
            "GC: {} runs, {} nodes and {} clauses collected",
            stats.gc_count, stats.nodes_collected, stats.clauses_collected
        );
        drop(cache);
        self.prover.borrow_mut().finish()
    }
}
