//! Rewrite rules, native functions, and the module registry that holds them
//! in first-match-wins order.

use std::collections::HashMap;
use std::fmt::Display;

use thiserror::Error;

use crate::slot::SlotAssigner;
use crate::term::Term;

/// Handle to a registry entry, cached on application nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Rule(usize),
    Native(usize),
}

impl Transform {
    // rules are searched before natives, each in declaration order
    fn rank(self) -> (u8, usize) {
        match self {
            Transform::Rule(index) => (0, index),
            Transform::Native(index) => (1, index),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Premise {
    /// `left => right` with a non-variable left: `right` must match `left`'s
    /// shape, then `left` binds to `right`.
    PatternMatch { left: Term, right: Term },
    /// `left == right`: both sides resolve and must be structurally equal.
    EqualityCheck { left: Term, right: Term },
    /// `left => right` with a variable left: bind it to the resolved right.
    Assignment { left: Term, right: Term },
    /// `left --> right`: reduce the resolved left to normal form, bind the
    /// result to `right`.
    Reduction { left: Term, right: Term },
    /// `case left of { v => p ... otherwise => p }`: the first value that is
    /// absent (otherwise) or matches selects its premise.
    Case {
        left: Term,
        values: Vec<Option<Term>>,
        premises: Vec<Premise>,
    },
}

impl Display for Premise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Premise::PatternMatch { left, right } | Premise::Assignment { left, right } => {
                write!(f, "{left} => {right}")
            }
            Premise::EqualityCheck { left, right } => write!(f, "{left} == {right}"),
            Premise::Reduction { left, right } => write!(f, "{left} --> {right}"),
            Premise::Case {
                left,
                values,
                premises,
            } => {
                write!(f, "case {left} of {{")?;
                for (i, (value, premise)) in values.iter().zip(premises).enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match value {
                        Some(value) => write!(f, "{value} => {premise}")?,
                        None => write!(f, "otherwise => {premise}")?,
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

/// `before --> after where premises`, with slots assigned once at
/// construction time.
#[derive(Debug, Clone)]
pub struct Rule {
    pub before: Term,
    pub after: Term,
    pub premises: Vec<Premise>,
    pub components: Vec<Term>,
    pub slot_count: usize,
}

impl Rule {
    pub fn new(
        before: Term,
        after: Term,
        components: Vec<Term>,
        premises: Vec<Premise>,
    ) -> Self {
        let mut rule = Rule {
            before,
            after,
            premises,
            components,
            slot_count: 0,
        };
        let mut assigner = SlotAssigner::new();
        rule.slot_count = assigner.assign_rule(
            &mut rule.components,
            &mut rule.before,
            &mut rule.premises,
            &mut rule.after,
        );
        rule
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for component in &self.components {
            write!(f, "{component} |- ")?;
        }
        write!(f, "{} --> {}", self.before, self.after)?;
        for (i, premise) in self.premises.iter().enumerate() {
            write!(f, "{} {premise}", if i == 0 { " where" } else { ";" })?;
        }
        Ok(())
    }
}

/// Failure raised by a native function's host action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),
}

pub type NativeAction = fn(i64, i64) -> Result<i64, NativeError>;

/// A host-implemented primitive. `before` is an application pattern whose
/// argument positions are plain variables naming the integer parameters;
/// arity is fixed at two, shorter functions are padded with zeros.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub before: Term,
    pub action: NativeAction,
    pub slot_count: usize,
}

impl NativeFunction {
    pub fn new(mut before: Term, action: NativeAction) -> Self {
        let mut assigner = SlotAssigner::new();
        let slot_count = assigner.assign_term(&mut before);
        if slot_count > 2 {
            log::warn!(
                "native function pattern has more than two parameters: {before}"
            );
        }
        NativeFunction {
            before,
            action,
            slot_count,
        }
    }
}

/// An ordered collection of rules and native functions. Declaration order is
/// semantically significant: the first matching candidate wins, rules before
/// natives. A name index narrows the linear search for application-headed
/// patterns.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub imports: Vec<String>,
    pub rules: Vec<Rule>,
    pub natives: Vec<NativeFunction>,
    by_name: HashMap<String, Vec<Transform>>,
    generic: Vec<Transform>,
}

impl Module {
    pub fn new(rules: Vec<Rule>, natives: Vec<NativeFunction>) -> Self {
        let mut by_name: HashMap<String, Vec<Transform>> = HashMap::new();
        let mut generic = Vec::new();
        {
            let mut add = |id: Transform, before: &Term| match before {
                Term::Appl(appl) => by_name.entry(appl.name.clone()).or_default().push(id),
                _ => generic.push(id),
            };
            for (index, rule) in rules.iter().enumerate() {
                add(Transform::Rule(index), &rule.before);
            }
            for (index, native) in natives.iter().enumerate() {
                add(Transform::Native(index), &native.before);
            }
        }
        Module {
            name: String::new(),
            imports: Vec::new(),
            rules,
            natives,
            by_name,
            generic,
        }
    }

    pub fn pattern(&self, id: Transform) -> &Term {
        match id {
            Transform::Rule(index) => &self.rules[index].before,
            Transform::Native(index) => &self.natives[index].before,
        }
    }

    /// All candidates whose pattern could be relevant to `term`, in search
    /// order: the term's name bucket merged with the patterns the index
    /// cannot discriminate on.
    pub fn candidates(&self, term: &Term) -> Vec<Transform> {
        let named: &[Transform] = match term {
            Term::Appl(appl) => self
                .by_name
                .get(&appl.name)
                .map_or(&[], Vec::as_slice),
            _ => &[],
        };
        let mut merged = Vec::with_capacity(named.len() + self.generic.len());
        let (mut a, mut b) = (named.iter().peekable(), self.generic.iter().peekable());
        loop {
            match (a.peek(), b.peek()) {
                (Some(&&x), Some(&&y)) => {
                    if x.rank() <= y.rank() {
                        merged.push(x);
                        a.next();
                    } else {
                        merged.push(y);
                        b.next();
                    }
                }
                (Some(&&x), None) => {
                    merged.push(x);
                    a.next();
                }
                (None, Some(&&y)) => {
                    merged.push(y);
                    b.next();
                }
                (None, None) => return merged,
            }
        }
    }

    /// First candidate whose pattern matches `term`, if any.
    pub fn find(&self, term: &Term) -> Option<Transform> {
        self.candidates(term)
            .into_iter()
            .find(|&id| self.pattern(id).matches(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_rule, parse_term};

    fn nop(_: i64, _: i64) -> Result<i64, NativeError> {
        Ok(0)
    }

    #[test]
    fn rules_win_over_natives() {
        let module = Module::new(
            vec![parse_rule("a(x) --> b").unwrap()],
            vec![NativeFunction::new(parse_term("a(x)").unwrap(), nop)],
        );
        let term = parse_term("a(1)").unwrap();
        assert_eq!(module.find(&term), Some(Transform::Rule(0)));
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let module = Module::new(
            vec![
                parse_rule("a(0) --> zero").unwrap(),
                parse_rule("a(x) --> other").unwrap(),
            ],
            vec![],
        );
        assert_eq!(
            module.find(&parse_term("a(0)").unwrap()),
            Some(Transform::Rule(0))
        );
        assert_eq!(
            module.find(&parse_term("a(1)").unwrap()),
            Some(Transform::Rule(1))
        );
    }

    #[test]
    fn unmatched_terms_find_nothing() {
        let module = Module::new(vec![parse_rule("a() --> b()").unwrap()], vec![]);
        assert_eq!(module.find(&parse_term("c()").unwrap()), None);
        assert_eq!(module.find(&parse_term("a(1)").unwrap()), None);
    }

    #[test]
    fn rule_displays_as_rule_text() {
        let rule = parse_rule("E |- assign(x, v) --> {x |--> v, E}").unwrap();
        assert_eq!(rule.to_string(), "E |- assign(x, v) --> {x |--> v, E}");
        // zero-argument applications print bare, like the surface syntax allows
        let rule = parse_rule("a() --> b() where 1 == 2").unwrap();
        assert_eq!(rule.to_string(), "a --> b where 1 == 2");
    }
}
