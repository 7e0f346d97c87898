//! Variable order: a bijection between input variables and BDD positions.

use std::io::BufRead;

use crate::error::ParseError;
use crate::types::Var;

/// Maps variable ids to 1-based positions in the order and back.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Permuter {
    /// `forward[var] = position`, index 0 unused.
    forward: Vec<u32>,
    /// `reverse[position] = var`, index 0 unused.
    reverse: Vec<u32>,
}

impl Permuter {
    /// Build from `order`, the variable at each position (first = top).
    pub fn new(order: &[u32]) -> Result<Self, ParseError> {
        let n = order.len();
        let error = |message: String| ParseError::Permutation { n, message };

        let mut forward = vec![0; n + 1];
        let mut reverse = vec![0; n + 1];
        for (index, &var) in order.iter().enumerate() {
            if var == 0 || var as usize > n {
                return Err(error(format!("variable {} out of range", var)));
            }
            if forward[var as usize] != 0 {
                return Err(error(format!("variable {} listed twice", var)));
            }
            let position = index as u32 + 1;
            forward[var as usize] = position;
            reverse[position as usize] = var;
        }
        Ok(Self { forward, reverse })
    }

    pub fn identity(n: u32) -> Self {
        Self {
            forward: (0..=n).collect(),
            reverse: (0..=n).collect(),
        }
    }

    /// Read an order file: variable ids separated by whitespace. Lines
    /// starting with `c` or `#` are comments.
    pub fn read(reader: impl BufRead) -> Result<Self, ParseError> {
        let mut order = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.starts_with('c') || line.starts_with('#') {
                continue;
            }
            for word in line.split_whitespace() {
                let var = word.parse::<u32>().map_err(|_| ParseError::Syntax {
                    line: index + 1,
                    message: format!("invalid variable '{}'", word),
                })?;
                order.push(var);
            }
        }
        Self::new(&order)
    }

    pub fn len(&self) -> usize {
        self.reverse.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `var` in the order.
    pub fn forward(&self, var: Var) -> u32 {
        self.forward[var.id() as usize]
    }

    /// Variable at `position`.
    pub fn reverse(&self, position: u32) -> Var {
        Var::new(self.reverse[position as usize])
    }

    /// Variables from top to bottom.
    pub fn order(&self) -> impl Iterator<Item = Var> + '_ {
        self.reverse[1..].iter().map(|&v| Var::new(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_positions() {
        let p = Permuter::new(&[3, 1, 2]).unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.forward(Var::new(3)), 1);
        assert_eq!(p.reverse(3), Var::new(2));
        assert_eq!(p.order().collect::<Vec<_>>(), vec![Var::new(3), Var::new(1), Var::new(2)]);
    }

    #[test]
    fn test_identity() {
        let p = Permuter::identity(4);
        assert_eq!(p, Permuter::new(&[1, 2, 3, 4]).unwrap());
        assert!(Permuter::identity(0).is_empty());
    }

    #[test]
    fn test_rejects_non_permutations() {
        assert!(Permuter::new(&[1, 1]).is_err());
        assert!(Permuter::new(&[1, 3]).is_err());
        assert!(Permuter::new(&[0]).is_err());
    }

    #[test]
    fn test_read() {
        let p = Permuter::read("c order\n2 3\n1\n".as_bytes()).unwrap();
        assert_eq!(p.reverse(1), Var::new(2));
        assert!(Permuter::read("2 x\n".as_bytes()).is_err());
    }
}
