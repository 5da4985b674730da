//! Static slot assignment: each distinct free variable name within one rule
//! gets a small integer index, so per-reduction binding can use an array
//! instead of a name-keyed map.

use std::collections::HashMap;

use crate::rule::Premise;
use crate::term::Term;

#[derive(Debug, Default)]
pub struct SlotAssigner {
    mapping: HashMap<String, i32>,
    next: i32,
}

impl SlotAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign slots over a whole rule, in rule-text order: components and the
    /// before-pattern bind, premises bind/resolve according to their kind,
    /// the after-term only resolves. Returns the number of slots allocated.
    pub fn assign_rule(
        &mut self,
        components: &mut [Term],
        before: &mut Term,
        premises: &mut [Premise],
        after: &mut Term,
    ) -> usize {
        let start = self.next;
        for component in components {
            self.bound(component);
        }
        self.bound(before);
        for premise in premises.iter_mut() {
            self.assign_premise(premise);
        }
        self.resolved(after);
        (self.next - start) as usize
    }

    pub fn assign_premise(&mut self, premise: &mut Premise) {
        match premise {
            Premise::PatternMatch { left, right } | Premise::Assignment { left, right } => {
                self.bound(left);
                self.resolved(right);
            }
            Premise::EqualityCheck { left, right } => {
                self.resolved(left);
                self.resolved(right);
            }
            Premise::Reduction { left, right } => {
                self.resolved(left);
                self.bound(right);
            }
            Premise::Case {
                left, premises, ..
            } => {
                self.resolved(left);
                for sub in premises {
                    self.assign_premise(sub);
                }
            }
        }
    }

    /// Assign slots over a standalone pattern (used for native-function
    /// left-hand sides). Returns the number of slots allocated.
    pub fn assign_term(&mut self, term: &mut Term) -> usize {
        let start = self.next;
        self.bound(term);
        (self.next - start) as usize
    }

    fn bound(&mut self, term: &mut Term) {
        term.walk_vars_mut(&mut |var| {
            if let Some(&slot) = self.mapping.get(&var.name) {
                var.slot = slot;
            } else {
                self.mapping.insert(var.name.clone(), self.next);
                var.slot = self.next;
                self.next += 1;
            }
        });
    }

    fn resolved(&mut self, term: &mut Term) {
        term.walk_vars_mut(&mut |var| {
            if let Some(&slot) = self.mapping.get(&var.name) {
                var.slot = slot;
            } else {
                // Tolerated: the variable keeps slot -1 and resolves to
                // itself, failing loudly only if a populated slot is ever
                // required of it.
                log::warn!("unresolvable variable `{}` in resolved position", var.name);
            }
        });
    }
}
