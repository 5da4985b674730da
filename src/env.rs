//! The mutable name→value store for imperative variable state, shared across
//! the whole interpretation of one top-level term.
//!
//! Names map to indices on first use and stay fixed, so repeat access is an
//! array read instead of a hash lookup.

use std::collections::HashMap;

use crate::term::Term;

#[derive(Debug, Default)]
pub struct Environment {
    names: HashMap<String, usize>,
    values: Vec<Option<Term>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, allocating a fresh (empty) slot on first use.
    pub fn locate(&mut self, name: &str) -> usize {
        if let Some(&index) = self.names.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.insert(name.to_owned(), index);
        if index >= self.values.len() {
            self.values.push(None);
        }
        index
    }

    pub fn get(&self, index: usize) -> Option<&Term> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn put(&mut self, index: usize, value: Term) {
        if index == self.values.len() {
            self.values.push(Some(value));
        } else {
            self.values[index] = Some(value);
        }
    }

    /// Inspection helper for hosts and tests; the interpreter itself uses
    /// `locate`/`get`/`put` so the index is computed once.
    pub fn lookup(&self, name: &str) -> Option<&Term> {
        self.names.get(name).and_then(|&index| self.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_is_stable_per_name() {
        let mut env = Environment::new();
        let a = env.locate("a");
        let b = env.locate("b");
        assert_ne!(a, b);
        assert_eq!(env.locate("a"), a);
        assert_eq!(env.locate("b"), b);
    }

    #[test]
    fn located_but_unwritten_names_read_back_empty() {
        let mut env = Environment::new();
        let index = env.locate("a");
        assert_eq!(env.get(index), None);
        assert_eq!(env.lookup("a"), None);
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut env = Environment::new();
        let index = env.locate("a");
        env.put(index, Term::int(1));
        assert_eq!(env.get(index), Some(&Term::int(1)));
        env.put(index, Term::int(2));
        assert_eq!(env.lookup("a"), Some(&Term::int(2)));
    }

    #[test]
    fn lookup_of_unknown_name_is_none() {
        let env = Environment::new();
        assert_eq!(env.lookup("nope"), None);
    }
}
