//! The per-rule-application binding context: a slot-indexed array of terms
//! populated by pattern binding and consulted by resolution.

use thiserror::Error;

use crate::term::{Term, VarTerm};

// Terms hold a non-Sync match cache, so errors carry their rendered text.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("expected the term to be a list but was: {0}")]
    ExpectedList(String),
    #[error("expected the pattern and the term to have the same number of items: {pattern} vs {term}")]
    ItemCountMismatch { pattern: String, term: String },
    #[error("expected the pattern and the term to both be applications but the term was: {0}")]
    ExpectedApplication(String),
    #[error("expected the pattern and the term to have the same number of arguments: {pattern} vs {term}")]
    ArityMismatch { pattern: String, term: String },
    #[error("pattern variable `{0}` was never assigned a slot")]
    UnassignedSlot(String),
    #[error("variable `{name}` (slot {slot}) was never bound")]
    UnboundSlot { name: String, slot: usize },
}

/// Created fresh for each rule or native application; write-once-per-slot in
/// well-formed rules. Nested reductions allocate their own context.
#[derive(Debug)]
pub struct Context {
    slots: Vec<Option<Term>>,
}

impl Context {
    pub fn new(size: usize) -> Self {
        Context {
            slots: vec![None; size],
        }
    }

    /// Destructure `term` according to `pattern`, writing each variable's
    /// slot. The pattern is assumed to have already matched; any shape
    /// mismatch found here is a contract violation, not a failed match.
    pub fn bind(&mut self, pattern: &Term, term: &Term) -> Result<(), ContextError> {
        match pattern {
            Term::Var(var) => self.bind_var(var, term.clone()),
            Term::List(pattern_list) => {
                let Term::List(list) = term else {
                    return Err(ContextError::ExpectedList(term.to_string()));
                };
                if pattern_list.items.len() != list.items.len() {
                    return Err(ContextError::ItemCountMismatch {
                        pattern: pattern.to_string(),
                        term: term.to_string(),
                    });
                }
                for (p, t) in pattern_list.items.iter().zip(&list.items) {
                    self.bind(p, t)?;
                }
                Ok(())
            }
            Term::ListPattern(list_pattern) => {
                let Term::List(list) = term else {
                    return Err(ContextError::ExpectedList(term.to_string()));
                };
                if list.items.len() < list_pattern.vars.len() {
                    return Err(ContextError::ItemCountMismatch {
                        pattern: pattern.to_string(),
                        term: term.to_string(),
                    });
                }
                for (var, item) in list_pattern.vars.iter().zip(&list.items) {
                    self.bind_var(var, item.clone())?;
                }
                let rest = list.items[list_pattern.vars.len()..].to_vec();
                self.bind_var(&list_pattern.rest, Term::list(rest))
            }
            Term::Appl(pattern_appl) => {
                let Term::Appl(appl) = term else {
                    return Err(ContextError::ExpectedApplication(term.to_string()));
                };
                if pattern_appl.args.len() != appl.args.len() {
                    return Err(ContextError::ArityMismatch {
                        pattern: pattern.to_string(),
                        term: term.to_string(),
                    });
                }
                for (p, t) in pattern_appl.args.iter().zip(&appl.args) {
                    self.bind(p, t)?;
                }
                Ok(())
            }
            // ground pattern positions bind nothing
            _ => Ok(()),
        }
    }

    fn bind_var(&mut self, var: &VarTerm, term: Term) -> Result<(), ContextError> {
        if var.slot < 0 {
            return Err(ContextError::UnassignedSlot(var.name.clone()));
        }
        self.slots[var.slot as usize] = Some(term);
        Ok(())
    }

    /// Replace every bound variable in `term` with its slot value, rebuilding
    /// applications and lists around the results. Unassigned variables (slot
    /// -1) resolve to themselves; an assigned slot that was never populated
    /// is an internal invariant violation and fails loudly.
    pub fn resolve(&self, term: &Term) -> Result<Term, ContextError> {
        match term {
            Term::Var(var) if var.slot >= 0 => {
                self.slots[var.slot as usize]
                    .clone()
                    .ok_or_else(|| ContextError::UnboundSlot {
                        name: var.name.clone(),
                        slot: var.slot as usize,
                    })
            }
            Term::Appl(appl) => {
                let mut args = Vec::with_capacity(appl.args.len());
                for arg in &appl.args {
                    let resolved = self.resolve(arg)?;
                    // Empty resolved lists in argument position are elided:
                    // variadic environment components vanish when exhausted.
                    if matches!(&resolved, Term::List(list) if list.items.is_empty()) {
                        continue;
                    }
                    args.push(resolved);
                }
                Ok(Term::Appl(crate::term::ApplTerm {
                    name: appl.name.clone(),
                    args,
                    cache: appl.cache.clone(),
                }))
            }
            Term::List(list) => {
                let items = list
                    .items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Term::list(items))
            }
            _ => Ok(term.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_term;
    use crate::slot::SlotAssigner;

    struct Fixture {
        pattern: Term,
        context: Context,
    }

    fn bind(pattern: &str, term: &str) -> Result<Fixture, ContextError> {
        let mut pattern = parse_term(pattern).unwrap();
        // slot assignments are normally made at the rule level
        let size = SlotAssigner::new().assign_term(&mut pattern);
        let mut context = Context::new(size);
        let term = parse_term(term).unwrap();
        context.bind(&pattern, &term)?;
        Ok(Fixture { pattern, context })
    }

    impl Fixture {
        fn assert_resolves(&self, name: &str, expected: &str) {
            let mut var = None;
            let mut pattern = self.pattern.clone();
            pattern.walk_vars_mut(&mut |v: &mut crate::term::VarTerm| {
                if v.name == name && var.is_none() {
                    var = Some(v.clone());
                }
            });
            let var = Term::Var(var.expect("variable not in pattern"));
            let resolved = self.context.resolve(&var).expect("slot is populated");
            assert_eq!(resolved, parse_term(expected).unwrap());
        }
    }

    #[test]
    fn binds_through_applications() {
        let fixture = bind("a(b, c)", "a(1, 2)").unwrap();
        fixture.assert_resolves("b", "1");
        fixture.assert_resolves("c", "2");
    }

    #[test]
    fn binds_nested_terms() {
        let fixture = bind("x(a)", "x(b(1, 2))").unwrap();
        fixture.assert_resolves("a", "b(1, 2)");
    }

    #[test]
    fn binds_lists_pairwise() {
        let fixture = bind("x([a, b, c])", "x([1, 2, 3])").unwrap();
        fixture.assert_resolves("a", "1");
        fixture.assert_resolves("b", "2");
        fixture.assert_resolves("c", "3");
    }

    #[test]
    fn binds_list_pattern_tail() {
        let fixture = bind("x([a | as])", "x([1, 2, 3])").unwrap();
        fixture.assert_resolves("a", "1");
        fixture.assert_resolves("as", "[2, 3]");
    }

    #[test]
    fn binds_complex_shapes() {
        let fixture = bind("x([a(b, [c | cs]), d])", "x([a(1, [2, 3]), 4])").unwrap();
        fixture.assert_resolves("b", "1");
        fixture.assert_resolves("c", "2");
        fixture.assert_resolves("cs", "[3]");
        fixture.assert_resolves("d", "4");
    }

    #[test]
    fn list_length_mismatch_is_an_error() {
        assert!(matches!(
            bind("x([a])", "x([1, 2])"),
            Err(ContextError::ItemCountMismatch { .. })
        ));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        assert!(matches!(
            bind("a(b, c)", "a(1)"),
            Err(ContextError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn unassigned_variables_resolve_to_themselves() {
        let context = Context::new(0);
        let var = parse_term("x").unwrap();
        assert_eq!(context.resolve(&var).unwrap(), var);
    }

    #[test]
    fn empty_resolved_lists_are_dropped_from_arguments() {
        let fixture = bind("block(xs)", "block([])").unwrap();
        let resolved = fixture
            .context
            .resolve(&fixture.pattern)
            .expect("pattern resolves");
        assert_eq!(resolved, parse_term("block()").unwrap());
    }

    #[test]
    fn unpopulated_slot_fails_loudly() {
        let mut pattern = parse_term("a(x, y)").unwrap();
        let size = SlotAssigner::new().assign_term(&mut pattern);
        let context = Context::new(size);
        let Term::Appl(appl) = &pattern else {
            unreachable!()
        };
        assert!(matches!(
            context.resolve(&appl.args[0]),
            Err(ContextError::UnboundSlot { .. })
        ));
    }
}
