//! DIMACS CNF and QDIMACS reader.
//!
//! - Comments start with `c`.
//! - Problem line: `p cnf <num_vars> <num_clauses>`.
//! - Quantifier lines (QDIMACS): `a <vars> 0` or `e <vars> 0`, outermost
//!   first. Consecutive lines of the same kind share a block.
//! - Clauses are whitespace-separated literals terminated by `0` and may span
//!   lines.

use std::io::BufRead;

use log::{debug, warn};

use crate::error::ParseError;
use crate::types::{Lit, Var};

/// Quantifier of an input variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Quantifier {
    /// Block index, 1 for the outermost block.
    pub qlevel: u32,
    pub existential: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Cnf {
    pub num_vars: u32,
    pub clauses: Vec<Vec<Lit>>,
    /// Indexed by variable id; `None` for free variables.
    quantifiers: Vec<Option<Quantifier>>,
}

impl Cnf {
    pub fn new(num_vars: u32) -> Self {
        Self {
            num_vars,
            clauses: Vec::new(),
            quantifiers: vec![None; num_vars as usize + 1],
        }
    }

    pub fn add_clause(&mut self, lits: impl Into<Vec<Lit>>) {
        self.clauses.push(lits.into());
    }

    /// Pigeonhole principle: `holes + 1` pigeons do not fit into `holes`
    /// holes. Variable `p * holes + h + 1` says pigeon `p` sits in hole `h`.
    pub fn pigeonhole(holes: usize) -> Self {
        let pigeons = holes + 1;
        let var = |p: usize, h: usize| (p * holes + h + 1) as Lit;
        let mut cnf = Cnf::new((pigeons * holes) as u32);
        for p in 0..pigeons {
            cnf.add_clause((0..holes).map(|h| var(p, h)).collect::<Vec<_>>());
        }
        for h in 0..holes {
            for p in 0..pigeons {
                for q in p + 1..pigeons {
                    cnf.add_clause(vec![-var(p, h), -var(q, h)]);
                }
            }
        }
        cnf
    }

    /// Number of the innermost quantifier block, 0 without a prefix.
    pub fn max_qlevel(&self) -> u32 {
        self.quantifiers.iter().flatten().map(|q| q.qlevel).max().unwrap_or(0)
    }

    /// Whether any variable is universally quantified.
    pub fn has_universals(&self) -> bool {
        self.quantifiers.iter().flatten().any(|q| !q.existential)
    }

    /// Quantifier of `var`. Free variables are existential in the innermost
    /// block, or in a new block below a universal one.
    pub fn quantifier(&self, var: Var) -> Quantifier {
        if let Some(q) = self.quantifiers.get(var.id() as usize).copied().flatten() {
            return q;
        }
        let innermost = self
            .quantifiers
            .iter()
            .flatten()
            .max_by_key(|q| q.qlevel)
            .copied();
        match innermost {
            Some(q) if q.existential => q,
            Some(q) => Quantifier {
                qlevel: q.qlevel + 1,
                existential: true,
            },
            None => Quantifier {
                qlevel: 1,
                existential: true,
            },
        }
    }

    pub fn parse(reader: impl BufRead) -> Result<Self, ParseError> {
        let mut cnf: Option<Cnf> = None;
        let mut num_clauses = 0;
        let mut clause = Vec::new();
        let mut block: Option<Quantifier> = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            let line_num = index + 1;
            let syntax = |message: String| ParseError::Syntax {
                line: line_num,
                message,
            };

            if line.is_empty() || line.starts_with('c') {
                continue;
            }

            if line.starts_with('p') {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() != 4 || parts[1] != "cnf" {
                    return Err(syntax(format!("invalid problem line '{}'", line)));
                }
                if cnf.is_some() {
                    return Err(syntax("duplicate problem line".to_string()));
                }
                let num_vars = parts[2]
                    .parse::<u32>()
                    .map_err(|_| syntax("invalid number of variables".to_string()))?;
                num_clauses = parts[3]
                    .parse::<usize>()
                    .map_err(|_| syntax("invalid number of clauses".to_string()))?;
                cnf = Some(Cnf::new(num_vars));
                continue;
            }

            let cnf = cnf
                .as_mut()
                .ok_or_else(|| syntax("clause before problem line".to_string()))?;

            let (existential, body) = match line.as_bytes()[0] {
                b'a' => (Some(false), &line[1..]),
                b'e' => (Some(true), &line[1..]),
                _ => (None, line),
            };

            let literals = body
                .split_whitespace()
                .map(|s| s.parse::<Lit>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| syntax(format!("invalid literal in '{}'", line)))?;
            for &lit in &literals {
                if lit.unsigned_abs() > cnf.num_vars {
                    return Err(syntax(format!(
                        "literal {} exceeds {} variables",
                        lit, cnf.num_vars
                    )));
                }
            }

            if let Some(existential) = existential {
                if !cnf.clauses.is_empty() || !clause.is_empty() {
                    return Err(syntax("quantifier after clauses".to_string()));
                }
                let qlevel = match block {
                    Some(q) if q.existential == existential => q.qlevel,
                    Some(q) => q.qlevel + 1,
                    None => 1,
                };
                let q = Quantifier { qlevel, existential };
                block = Some(q);
                for lit in literals.into_iter().take_while(|&lit| lit != 0) {
                    if lit < 0 {
                        return Err(syntax(format!("negative variable {} in prefix", lit)));
                    }
                    cnf.quantifiers[lit as usize] = Some(q);
                }
                continue;
            }

            for lit in literals {
                if lit == 0 {
                    cnf.clauses.push(std::mem::take(&mut clause));
                } else {
                    clause.push(lit);
                }
            }
        }

        let mut cnf = cnf.ok_or(ParseError::Syntax {
            line: 0,
            message: "missing problem line".to_string(),
        })?;
        if !clause.is_empty() {
            warn!("Last clause is not terminated by 0");
            cnf.clauses.push(clause);
        }
        if cnf.clauses.len() != num_clauses {
            warn!("Expected {} clauses but parsed {}", num_clauses, cnf.clauses.len());
        }
        debug!(
            "Parsed CNF with {} variables, {} clauses, {} quantifier blocks",
            cnf.num_vars,
            cnf.clauses.len(),
            cnf.max_qlevel()
        );
        Ok(cnf)
    }
}
