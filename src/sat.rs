use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Manager;
use crate::reference::Ref;
use crate::types::{Lit, Var};

impl Manager {
    /// Returns one satisfying assignment of `node` as a list of literals
    /// along a path to the one leaf, or `None` for the zero leaf.
    pub fn one_sat(&self, node: Ref) -> Option<Vec<Lit>> {
        if self.is_zero(node) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = node;

        // Prefer the high branch unless it is unsatisfiable.
        while !self.is_one(current) {
            let var = self.variable(self.level(current)).id;
            let high = self.high(current);
            if !self.is_zero(high) {
                path.push(var.lit());
                current = high;
            } else {
                path.push(-var.lit());
                current = self.low(current);
            }
        }

        Some(path)
    }

    /// Number of assignments to all declared variables that satisfy `node`.
    pub fn satisfy_count(&self, node: Ref) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(2u32).pow(self.num_variables() as u32);
        self.count_rec(node, &max, &mut cache)
    }

    fn count_rec(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let count_high = self.count_rec(self.high(node), max, cache);
        let count_low = self.count_rec(self.low(node), max, cache);
        let count: BigUint = (count_high + count_low) >> 1;

        cache.insert(node, count.clone());
        count
    }

    /// All paths to the one leaf, one string per path with a character per
    /// level: `1`, `0`, or `-` for a variable the path does not test.
    ///
    /// High branches come first.
    pub fn satisfy_strings(&self, node: Ref) -> Vec<String> {
        let mut result = Vec::new();
        let mut pattern = vec!['-'; self.num_variables()];
        self.strings_rec(node, &mut pattern, &mut result);
        result
    }

    fn strings_rec(&self, node: Ref, pattern: &mut Vec<char>, result: &mut Vec<String>) {
        if self.is_zero(node) {
            return;
        }
        if self.is_one(node) {
            result.push(pattern.iter().collect());
            return;
        }
        let index = self.level(node).index();
        pattern[index] = '1';
        self.strings_rec(self.high(node), pattern, result);
        pattern[index] = '0';
        self.strings_rec(self.low(node), pattern, result);
        pattern[index] = '-';
    }

    /// Value of `node` under an assignment.
    pub fn evaluate(&self, node: Ref, assignment: impl Fn(Var) -> bool) -> bool {
        let mut current = node;
        while !current.is_leaf() {
            let var = self.variable(self.level(current)).id;
            current = if assignment(var) {
                self.high(current)
            } else {
                self.low(current)
            };
        }
        self.is_one(current)
    }
}
