//! Proof log writer.
//!
//! The prover assigns clause ids, keeps every live clause in memory (the
//! resolver needs the literals to compute hints) and serializes each step in
//! one of three formats:
//!
//! - **LRAT**: `id lits 0 hints 0` per added clause and `id d ids 0` per
//!   deletion. A defining clause of a fresh node is a RAT step on its first
//!   literal: its hints are the negated ids of the live clauses containing
//!   the complement of that literal.
//! - **QRAT**: the extended format for quantified formulas, with explicit
//!   `a`/`ab`/`u`/`x` commands and typed deletions.
//! - **Trace**: LRAT-style additions that also list the input clauses, and
//!   no deletions.
//!
//! Each format can be written as text or in the compact binary encoding.
//! There every step starts with a single command byte, followed by integers
//! written as variable-length unsigned numbers `2|n| + sign`:
//!
//! | byte | step                                   |
//! |------|----------------------------------------|
//! | `a`  | addition                               |
//! | `b`  | QRAT blocked addition                  |
//! | `u`  | QRAT universal reduction               |
//! | `x`  | QRAT extension variable                |
//! | `d`  | deletion                               |
//! | `r`  | QRAT deletion by resolution (`dr`)     |
//! | `e`  | QRAT Davis-Putnam deletion (`dd`)      |

use std::collections::HashMap;
use std::io::{self, Write};

use log::{debug, info};

use crate::error::{BddError, Result};
use crate::resolver::{clean_clause, ClauseStore, Cleaned};
use crate::types::{ClauseId, Lit};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProofFormat {
    Trace,
    Lrat,
    Qrat,
}

impl ProofFormat {
    pub fn name(self) -> &'static str {
        match self {
            ProofFormat::Trace => "trace",
            ProofFormat::Lrat => "LRAT",
            ProofFormat::Qrat => "QRAT",
        }
    }
}

/// Which facts the proof is meant to establish.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ProofMode {
    /// No proof at all.
    #[default]
    None,
    /// Derive the empty clause from the input.
    Refutation,
    /// Derive each conjunction's implication of its arguments.
    Satisfaction,
    /// Both of the above.
    Dual,
}

impl ProofMode {
    pub fn is_enabled(self) -> bool {
        self != ProofMode::None
    }

    pub fn refutes(self) -> bool {
        matches!(self, ProofMode::Refutation | ProofMode::Dual)
    }

    pub fn satisfies(self) -> bool {
        matches!(self, ProofMode::Satisfaction | ProofMode::Dual)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProverStats {
    pub input_clause_count: usize,
    /// All clauses, input included.
    pub clause_count: usize,
    /// Derived clauses, extension clauses included.
    pub proof_count: usize,
    pub extension_count: usize,
    pub deleted_count: usize,
    pub max_live: usize,
}

/// Kind of a proof step, as far as the output distinguishes them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Command {
    Add,
    AddBlocked,
    Universal,
    Extend,
    Delete,
    DeleteResolution,
    DeleteDavisPutnam,
}

impl Command {
    fn word(self) -> &'static str {
        match self {
            Command::Add => "a",
            Command::AddBlocked => "ab",
            Command::Universal => "u",
            Command::Extend => "x",
            Command::Delete => "d",
            Command::DeleteResolution => "dr",
            Command::DeleteDavisPutnam => "dd",
        }
    }

    fn byte(self) -> u8 {
        match self {
            Command::Add => b'a',
            Command::AddBlocked => b'b',
            Command::Universal => b'u',
            Command::Extend => b'x',
            Command::Delete => b'd',
            Command::DeleteResolution => b'r',
            Command::DeleteDavisPutnam => b'e',
        }
    }
}

enum Token {
    /// Command, only written in some encodings.
    Cmd(Command),
    Num(i64),
    Zero,
}

pub struct Prover {
    out: Box<dyn Write>,
    format: ProofFormat,
    mode: ProofMode,
    binary: bool,
    comments: bool,
    clauses: HashMap<ClauseId, Vec<Lit>>,
    last_id: u64,
    stats: ProverStats,
}

impl Prover {
    pub fn new(out: Box<dyn Write>, format: ProofFormat, mode: ProofMode) -> Self {
        Self {
            out,
            format,
            mode,
            binary: false,
            comments: false,
            clauses: HashMap::new(),
            last_id: 0,
            stats: ProverStats::default(),
        }
    }

    /// A prover that records nothing.
    pub fn sink() -> Self {
        Self::new(Box::new(io::sink()), ProofFormat::Lrat, ProofMode::None)
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Emit comment lines describing each derived clause (text only).
    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn format(&self) -> ProofFormat {
        self.format
    }

    pub fn mode(&self) -> ProofMode {
        self.mode
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn stats(&self) -> &ProverStats {
        &self.stats
    }

    pub fn live_count(&self) -> usize {
        self.clauses.len()
    }

    /// Id of the most recently created clause.
    pub fn last_id(&self) -> ClauseId {
        ClauseId::new(self.last_id)
    }

    fn next_id(&mut self, lits: Vec<Lit>) -> ClauseId {
        self.last_id += 1;
        let id = ClauseId::new(self.last_id);
        self.clauses.insert(id, lits);
        self.stats.clause_count += 1;
        self.stats.max_live = self.stats.max_live.max(self.clauses.len());
        id
    }

    fn write_tokens(&mut self, tokens: &[Token]) -> io::Result<()> {
        if self.binary {
            for token in tokens {
                match *token {
                    Token::Cmd(command) => self.out.write_all(&[command.byte()])?,
                    Token::Num(n) => write_varint(&mut self.out, n)?,
                    Token::Zero => self.out.write_all(&[0])?,
                }
            }
        } else {
            let line = tokens
                .iter()
                .map(|token| match *token {
                    Token::Cmd(command) => command.word().to_string(),
                    Token::Num(n) => n.to_string(),
                    Token::Zero => "0".to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    /// Write a comment line. Ignored in binary output.
    pub fn comment(&mut self, text: &str) -> Result<()> {
        if !self.binary && self.mode.is_enabled() {
            writeln!(self.out, "c {}", text)?;
        }
        Ok(())
    }

    /// Register an input clause. Input clauses must all come before the
    /// first derived clause and are numbered from 1.
    ///
    /// A tautological input clause still consumes an id but is not stored.
    pub fn load_input_clause(&mut self, lits: &[Lit]) -> Result<ClauseId> {
        if self.stats.proof_count > 0 {
            return Err(BddError::Invariant(
                "input clauses must precede derived clauses".to_string(),
            ));
        }
        let id = match clean_clause(lits) {
            Cleaned::Clause(clause) => self.next_id(clause),
            Cleaned::Tautology => {
                let id = self.next_id(Vec::new());
                self.clauses.remove(&id);
                id
            }
        };
        self.stats.input_clause_count += 1;

        if self.format == ProofFormat::Trace && self.mode.is_enabled() {
            let mut tokens = vec![Token::Num(id.get() as i64)];
            tokens.extend(lits.iter().map(|&lit| Token::Num(lit as i64)));
            tokens.extend([Token::Zero, Token::Zero]);
            self.write_tokens(&tokens)?;
        }
        Ok(id)
    }

    /// Leading tokens of a step that creates clause `id`.
    fn step_header(&self, command: Command, id: ClauseId) -> Vec<Token> {
        let id = Token::Num(id.get() as i64);
        match (self.format, self.binary) {
            (ProofFormat::Qrat, true) => vec![Token::Cmd(command), id],
            (_, true) => vec![Token::Cmd(Command::Add), id],
            (ProofFormat::Qrat, false) => vec![id, Token::Cmd(command)],
            (_, false) => vec![id],
        }
    }

    /// Tokens of an added clause: literals, then `hints`, then the negated
    /// ids of the `rat` candidates.
    fn add_tokens(
        &self,
        command: Command,
        id: ClauseId,
        lits: &[Lit],
        hints: &[ClauseId],
        rat: &[ClauseId],
    ) -> Vec<Token> {
        let mut tokens = self.step_header(command, id);
        tokens.extend(lits.iter().map(|&lit| Token::Num(lit as i64)));
        tokens.push(Token::Zero);
        tokens.extend(
            hints
                .iter()
                .filter(|h| !h.is_tautology())
                .map(|h| Token::Num(h.get() as i64)),
        );
        tokens.extend(
            rat.iter()
                .filter(|c| !c.is_tautology())
                .map(|c| Token::Num(-(c.get() as i64))),
        );
        tokens.push(Token::Zero);
        tokens
    }

    /// Add a clause that follows by resolution from `antecedents`, which must
    /// be a valid hint sequence.
    pub fn prove_add_resolution(&mut self, lits: &[Lit], antecedents: &[ClauseId]) -> Result<ClauseId> {
        let clause = match clean_clause(lits) {
            Cleaned::Tautology => return Ok(ClauseId::TAUTOLOGY),
            Cleaned::Clause(clause) => clause,
        };
        let id = self.next_id(clause.clone());
        self.stats.proof_count += 1;
        if self.mode.is_enabled() {
            let tokens = self.add_tokens(Command::Add, id, &clause, antecedents, &[]);
            self.write_tokens(&tokens)?;
        }
        Ok(id)
    }

    /// Add a clause blocked on its first literal.
    ///
    /// `blockers` must be every live clause containing the negated pivot.
    /// QRAT lists them after `ab`; the other formats write them as negative
    /// RAT hints.
    pub fn prove_add_blocked(&mut self, lits: &[Lit], blockers: &[ClauseId]) -> Result<ClauseId> {
        let clause = match clean_clause(lits) {
            Cleaned::Tautology => return Ok(ClauseId::TAUTOLOGY),
            Cleaned::Clause(clause) => clause,
        };
        let id = self.next_id(clause.clone());
        self.stats.proof_count += 1;
        if self.mode.is_enabled() {
            let tokens = if self.format == ProofFormat::Qrat {
                self.add_tokens(Command::AddBlocked, id, &clause, blockers, &[])
            } else {
                self.add_tokens(Command::Add, id, &clause, &[], blockers)
            };
            self.write_tokens(&tokens)?;
        }
        Ok(id)
    }

    /// Add a derived clause, preceded by a comment line when enabled.
    pub fn create_clause(
        &mut self,
        lits: &[Lit],
        antecedents: &[ClauseId],
        comment: Option<&str>,
    ) -> Result<ClauseId> {
        if let (true, Some(text)) = (self.comments, comment) {
            self.comment(text)?;
        }
        let id = self.prove_add_resolution(lits, antecedents)?;
        debug!("{} = {:?} from {:?}", id, self.clause(id), antecedents);
        Ok(id)
    }

    /// Declare a fresh extension variable in quantifier block `qlevel`.
    pub fn prove_extend(&mut self, var: Lit, qlevel: u32) -> Result<()> {
        self.stats.extension_count += 1;
        if self.format == ProofFormat::Qrat && self.mode.is_enabled() {
            let tokens = [
                Token::Cmd(Command::Extend),
                Token::Num(qlevel as i64),
                Token::Num(var as i64),
                Token::Zero,
            ];
            self.write_tokens(&tokens)?;
        }
        Ok(())
    }

    /// Remove universal literal `lit` from clause `id`, producing a new clause.
    pub fn prove_universal(&mut self, lit: Lit, id: ClauseId) -> Result<ClauseId> {
        if self.format != ProofFormat::Qrat {
            return Err(BddError::Unsupported {
                format: self.format.name(),
                step: "universal reduction",
            });
        }
        let clause = self.clauses.get(&id).ok_or(BddError::UnknownClause(id))?;
        if !clause.contains(&lit) {
            return Err(BddError::Invariant(format!(
                "universal literal {} not in clause {}",
                lit, id
            )));
        }
        let reduced: Vec<Lit> = clause.iter().copied().filter(|&l| l != lit).collect();
        let new_id = self.next_id(reduced);
        self.stats.proof_count += 1;
        if self.mode.is_enabled() {
            let mut tokens = self.step_header(Command::Universal, new_id);
            tokens.extend([Token::Num(lit as i64), Token::Num(id.get() as i64), Token::Zero]);
            self.write_tokens(&tokens)?;
        }
        Ok(new_id)
    }

    fn forget(&mut self, ids: &[ClauseId]) -> Result<Vec<ClauseId>> {
        let ids: Vec<ClauseId> = ids.iter().copied().filter(|id| !id.is_tautology()).collect();
        for &id in &ids {
            if self.clauses.remove(&id).is_none() {
                return Err(BddError::UnknownClause(id));
            }
        }
        self.stats.deleted_count += ids.len();
        Ok(ids)
    }

    fn delete_tokens(&self, command: Command, ids: &[ClauseId]) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(ids.len() + 3);
        if self.format == ProofFormat::Lrat && !self.binary {
            tokens.push(Token::Num(self.last_id as i64));
        }
        tokens.push(Token::Cmd(command));
        tokens.extend(ids.iter().map(|id| Token::Num(id.get() as i64)));
        tokens.push(Token::Zero);
        tokens
    }

    /// Delete clauses that are no longer needed.
    pub fn delete_clauses(&mut self, ids: &[ClauseId]) -> Result<()> {
        let ids = self.forget(ids)?;
        if ids.is_empty() || !self.mode.is_enabled() || self.format == ProofFormat::Trace {
            return Ok(());
        }
        let tokens = self.delete_tokens(Command::Delete, &ids);
        self.write_tokens(&tokens)
            .map_err(BddError::from)
    }

    /// Delete a clause that is implied by resolution from `hints`.
    ///
    /// Only QRAT records the hints; other formats emit a plain deletion.
    pub fn prove_delete_resolution(&mut self, id: ClauseId, hints: &[ClauseId]) -> Result<()> {
        if self.format != ProofFormat::Qrat {
            return self.delete_clauses(&[id]);
        }
        let ids = self.forget(&[id])?;
        if ids.is_empty() || !self.mode.is_enabled() {
            return Ok(());
        }
        let mut tokens = self.delete_tokens(Command::DeleteResolution, &ids);
        tokens.pop();
        tokens.extend(
            hints
                .iter()
                .filter(|h| !h.is_tautology())
                .map(|h| Token::Num(h.get() as i64)),
        );
        tokens.push(Token::Zero);
        self.write_tokens(&tokens).map_err(BddError::from)
    }

    /// Davis-Putnam deletion: eliminate `var` by deleting every clause in
    /// `ids` that mentions it, given the `causes` clauses.
    pub fn prove_delete_davis_putnam(
        &mut self,
        var: Lit,
        ids: &[ClauseId],
        causes: &[ClauseId],
    ) -> Result<()> {
        if self.format != ProofFormat::Qrat {
            return self.delete_clauses(ids);
        }
        let ids = self.forget(ids)?;
        if ids.is_empty() || !self.mode.is_enabled() {
            return Ok(());
        }
        let mut tokens = vec![Token::Cmd(Command::DeleteDavisPutnam), Token::Num(var as i64)];
        tokens.extend(ids.iter().map(|id| Token::Num(id.get() as i64)));
        tokens.push(Token::Zero);
        tokens.extend(
            causes
                .iter()
                .filter(|c| !c.is_tautology())
                .map(|c| Token::Num(c.get() as i64)),
        );
        tokens.push(Token::Zero);
        self.write_tokens(&tokens).map_err(BddError::from)
    }

    /// Flush the output and log a summary.
    pub fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        let s = &self.stats;
        info!(
            "Proof ({}{}): {} input clauses, {} derived, {} extension variables",
            self.format.name(),
            if self.binary { ", binary" } else { "" },
            s.input_clause_count,
            s.proof_count,
            s.extension_count
        );
        info!(
            "Proof clauses: {} total, {} deleted, {} live at most",
            s.clause_count, s.deleted_count, s.max_live
        );
        Ok(())
    }
}

impl ClauseStore for Prover {
    fn clause(&self, id: ClauseId) -> Option<&[Lit]> {
        self.clauses.get(&id).map(Vec::as_slice)
    }
}

/// Write `2|n| + sign` as a little-endian base-128 varint.
fn write_varint(out: &mut dyn Write, n: i64) -> io::Result<()> {
    let mut u = 2 * n.unsigned_abs() + u64::from(n < 0);
    while u > 0x7f {
        out.write_all(&[(u & 0x7f) as u8 | 0x80])?;
        u >>= 7;
    }
    out.write_all(&[u as u8])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Rc<RefCell<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn prover(format: ProofFormat) -> (Prover, Buffer) {
        let buffer = Buffer::default();
        let prover = Prover::new(Box::new(buffer.clone()), format, ProofMode::Refutation);
        (prover, buffer)
    }

    #[test]
    fn test_lrat_text() {
        let (mut p, buffer) = prover(ProofFormat::Lrat);
        let c1 = p.load_input_clause(&[1, 2]).unwrap();
        let c2 = p.load_input_clause(&[-1]).unwrap();
        let e = p.prove_add_blocked(&[3, -2], &[]).unwrap();
        let d = p.create_clause(&[2], &[c2, c1], None).unwrap();
        p.delete_clauses(&[e, ClauseId::TAUTOLOGY]).unwrap();

        assert_eq!(d, ClauseId::new(4));
        assert_eq!(buffer.text(), "3 3 -2 0 0\n4 2 0 2 1 0\n4 d 3 0\n");
        assert_eq!(p.stats().input_clause_count, 2);
        assert_eq!(p.stats().proof_count, 2);
        assert_eq!(p.stats().deleted_count, 1);
        assert_eq!(p.live_count(), 3);
    }

    #[test]
    fn test_tautologies_are_not_emitted() {
        let (mut p, buffer) = prover(ProofFormat::Lrat);
        let id = p.create_clause(&[1, -1], &[], None).unwrap();
        assert!(id.is_tautology());
        let id = p.prove_add_blocked(&[5, crate::types::TRUE_LIT], &[]).unwrap();
        assert!(id.is_tautology());
        assert_eq!(buffer.text(), "");
    }

    #[test]
    fn test_trace_lists_input_and_skips_deletions() {
        let (mut p, buffer) = prover(ProofFormat::Trace);
        let c1 = p.load_input_clause(&[1]).unwrap();
        p.delete_clauses(&[c1]).unwrap();
        assert_eq!(buffer.text(), "1 1 0 0\n");
    }

    #[test]
    fn test_qrat_commands() {
        let (mut p, buffer) = prover(ProofFormat::Qrat);
        let c1 = p.load_input_clause(&[1, 2]).unwrap();
        p.prove_extend(3, 2).unwrap();
        let e = p.prove_add_blocked(&[3, -1], &[c1]).unwrap();
        let r = p.prove_add_resolution(&[2, 3], &[c1, e]).unwrap();
        let u = p.prove_universal(2, r).unwrap();
        p.delete_clauses(&[r]).unwrap();
        p.prove_delete_resolution(e, &[c1]).unwrap();
        p.prove_delete_davis_putnam(3, &[u], &[c1]).unwrap();

        let expected = "x 2 3 0\n\
                        2 ab 3 -1 0 1 0\n\
                        3 a 3 2 0 1 2 0\n\
                        4 u 2 3 0\n\
                        d 3 0\n\
                        dr 2 1 0\n\
                        dd 3 4 0 1 0\n";
        assert_eq!(buffer.text(), expected);
        assert_eq!(p.clause(u), None);
    }

    #[test]
    fn test_universal_needs_qrat() {
        let (mut p, _) = prover(ProofFormat::Lrat);
        let c1 = p.load_input_clause(&[1, 2]).unwrap();
        assert!(matches!(
            p.prove_universal(2, c1),
            Err(BddError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_binary_lrat() {
        let buffer = Buffer::default();
        let mut p = Prover::new(Box::new(buffer.clone()), ProofFormat::Lrat, ProofMode::Refutation)
            .with_binary(true);
        let c1 = p.load_input_clause(&[1]).unwrap();
        let d = p.create_clause(&[-2, 1], &[c1], None).unwrap();
        p.delete_clauses(&[d]).unwrap();
        // a 2 | -2 1 0 | 1 0 ; d 2 0
        let bytes = buffer.0.borrow().clone();
        assert_eq!(bytes, vec![b'a', 4, 5, 2, 0, 2, 0, b'd', 4, 0]);
    }

    #[test]
    fn test_lrat_blocked_lists_rat_candidates() {
        let (mut p, buffer) = prover(ProofFormat::Lrat);
        p.load_input_clause(&[1]).unwrap();
        let up = p.prove_add_blocked(&[3, -1], &[]).unwrap();
        p.prove_add_blocked(&[-3, 1], &[up, ClauseId::TAUTOLOGY]).unwrap();
        assert_eq!(buffer.text(), "2 3 -1 0 0\n3 -3 1 0 -2 0\n");
    }

    #[test]
    fn test_binary_lrat_rat_hints() {
        let buffer = Buffer::default();
        let mut p = Prover::new(Box::new(buffer.clone()), ProofFormat::Lrat, ProofMode::Refutation)
            .with_binary(true);
        let up = p.prove_add_blocked(&[2, -1], &[]).unwrap();
        p.prove_add_blocked(&[-2, 1], &[up]).unwrap();
        // a 1 | 2 -1 0 | 0 ; a 2 | -2 1 0 | -1 0
        let bytes = buffer.0.borrow().clone();
        assert_eq!(bytes, vec![b'a', 2, 4, 3, 0, 0, b'a', 4, 5, 2, 0, 3, 0]);
    }

    #[test]
    fn test_binary_qrat_single_byte_commands() {
        let buffer = Buffer::default();
        let mut p = Prover::new(Box::new(buffer.clone()), ProofFormat::Qrat, ProofMode::Refutation)
            .with_binary(true);
        let c1 = p.load_input_clause(&[1, 2]).unwrap();
        p.prove_extend(3, 2).unwrap();
        let e = p.prove_add_blocked(&[3, -1], &[c1]).unwrap();
        p.prove_delete_resolution(e, &[c1]).unwrap();
        p.prove_delete_davis_putnam(2, &[c1], &[]).unwrap();
        // x 2 3 0 ; b 2 | 3 -1 0 | 1 0 ; r 2 1 0 ; e 2 1 0 0
        let bytes = buffer.0.borrow().clone();
        assert_eq!(
            bytes,
            vec![b'x', 4, 6, 0, b'b', 4, 6, 3, 0, 2, 0, b'r', 4, 2, 0, b'e', 4, 2, 0, 0]
        );
    }

    #[test]
    fn test_varint_multibyte() {
        let mut out = Vec::new();
        write_varint(&mut out, 100).unwrap();
        assert_eq!(out, vec![0xc8, 0x01]);
    }

    #[test]
    fn test_delete_unknown_clause() {
        let (mut p, _) = prover(ProofFormat::Lrat);
        assert!(matches!(
            p.delete_clauses(&[ClauseId::new(42)]),
            Err(BddError::UnknownClause(_))
        ));
    }

    #[test]
    fn test_disabled_mode_writes_nothing() {
        let buffer = Buffer::default();
        let mut p = Prover::new(Box::new(buffer.clone()), ProofFormat::Trace, ProofMode::None);
        p.load_input_clause(&[1]).unwrap();
        p.prove_add_blocked(&[2, -1], &[]).unwrap();
        assert_eq!(buffer.text(), "");
    }
}
