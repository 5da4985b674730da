//! The term model: the symbolic AST being rewritten.
//!
//! Terms are immutable once constructed except for two pieces of metadata:
//! the slot index on a variable (fixed once by the slot assigner) and the
//! match cache on an application node (see [`ApplTerm::cache`]).

use std::cell::Cell;
use std::fmt::Display;
use std::rc::Rc;

use crate::rule::Transform;

#[derive(Debug, Clone)]
pub enum Term {
    Int(IntTerm),
    Var(VarTerm),
    Appl(ApplTerm),
    List(ListTerm),
    ListPattern(ListPatternTerm),
    MapWrite(MapWriteTerm),
    MapRead(MapReadTerm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntTerm {
    pub number: i64,
}

/// A free variable occurrence. `slot` is `-1` until the slot assigner runs
/// over the enclosing rule; a pattern occurrence always ends up with
/// `slot >= 0`.
#[derive(Debug, Clone)]
pub struct VarTerm {
    pub name: String,
    pub slot: i32,
}

impl VarTerm {
    pub fn new(name: impl Into<String>) -> Self {
        VarTerm {
            name: name.into(),
            slot: -1,
        }
    }
}

impl PartialEq for VarTerm {
    // slots are per-rule assignment metadata, not part of the term identity
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for VarTerm {}

/// A constructor application. `cache` memoizes the transformation that last
/// matched this node; it is shared (not deep-copied) when the node is cloned
/// or rebuilt during resolution, so a rule right-hand side revisited on every
/// loop iteration keeps its memoized candidate.
#[derive(Debug, Clone)]
pub struct ApplTerm {
    pub name: String,
    pub args: Vec<Term>,
    pub cache: Rc<Cell<Option<Transform>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTerm {
    pub items: Vec<Term>,
}

/// Pattern-only construct: matches any list with at least `vars.len()`
/// elements, binding the leading elements positionally and the trailing
/// elements (as a fresh list) to `rest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPatternTerm {
    pub vars: Vec<VarTerm>,
    pub rest: VarTerm,
}

/// Extend/overwrite the environment with these key/value pairs. An entry
/// whose value is itself a `MapWrite` is the clone-current-environment
/// marker and carries no write of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapWriteTerm {
    pub assignments: Vec<(Term, Term)>,
}

/// Look up `key` in the named environment `map`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapReadTerm {
    pub map: Box<Term>,
    pub key: Box<Term>,
}

impl Term {
    pub fn int(number: i64) -> Term {
        Term::Int(IntTerm { number })
    }

    pub fn var(name: impl Into<String>) -> Term {
        Term::Var(VarTerm::new(name))
    }

    pub fn appl(name: impl Into<String>, args: Vec<Term>) -> Term {
        Term::Appl(ApplTerm {
            name: name.into(),
            args,
            cache: Rc::new(Cell::new(None)),
        })
    }

    pub fn list(items: Vec<Term>) -> Term {
        Term::List(ListTerm { items })
    }

    pub fn list_pattern(vars: Vec<VarTerm>, rest: VarTerm) -> Term {
        Term::ListPattern(ListPatternTerm { vars, rest })
    }

    pub fn map_write(assignments: Vec<(Term, Term)>) -> Term {
        Term::MapWrite(MapWriteTerm { assignments })
    }

    pub fn map_read(map: Term, key: Term) -> Term {
        Term::MapRead(MapReadTerm {
            map: Box::new(map),
            key: Box::new(key),
        })
    }

    /// Does `self`, read as a pattern, accept `term`? Variables accept
    /// anything (binding is done separately by the context); applications
    /// and lists match structurally; a list pattern accepts any list long
    /// enough for its fixed positions; ground patterns require equality.
    pub fn matches(&self, term: &Term) -> bool {
        match self {
            Term::Var(_) => true,
            Term::Appl(pattern) => match term {
                Term::Appl(appl) => {
                    pattern.name == appl.name
                        && pattern.args.len() == appl.args.len()
                        && pattern
                            .args
                            .iter()
                            .zip(&appl.args)
                            .all(|(p, t)| p.matches(t))
                }
                _ => false,
            },
            Term::List(pattern) => match term {
                Term::List(list) => {
                    pattern.items.len() == list.items.len()
                        && pattern
                            .items
                            .iter()
                            .zip(&list.items)
                            .all(|(p, t)| p.matches(t))
                }
                _ => false,
            },
            Term::ListPattern(pattern) => match term {
                Term::List(list) => list.items.len() >= pattern.vars.len(),
                _ => false,
            },
            pattern => pattern == term,
        }
    }

    /// Visit every variable occurrence reachable from this term, in
    /// left-to-right order.
    pub(crate) fn walk_vars_mut<F: FnMut(&mut VarTerm)>(&mut self, f: &mut F) {
        match self {
            Term::Int(_) => {}
            Term::Var(var) => f(var),
            Term::Appl(appl) => {
                for arg in &mut appl.args {
                    arg.walk_vars_mut(f);
                }
            }
            Term::List(list) => {
                for item in &mut list.items {
                    item.walk_vars_mut(f);
                }
            }
            Term::ListPattern(pattern) => {
                for var in &mut pattern.vars {
                    f(var);
                }
                f(&mut pattern.rest);
            }
            Term::MapWrite(write) => {
                for (key, value) in &mut write.assignments {
                    key.walk_vars_mut(f);
                    value.walk_vars_mut(f);
                }
            }
            Term::MapRead(read) => {
                read.map.walk_vars_mut(f);
                read.key.walk_vars_mut(f);
            }
        }
    }
}

// Structural equality; the match cache and slot assignments are ignored.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => a == b,
            (Term::Var(a), Term::Var(b)) => a == b,
            (Term::Appl(a), Term::Appl(b)) => a.name == b.name && a.args == b.args,
            (Term::List(a), Term::List(b)) => a == b,
            (Term::ListPattern(a), Term::ListPattern(b)) => a == b,
            (Term::MapWrite(a), Term::MapWrite(b)) => a == b,
            (Term::MapRead(a), Term::MapRead(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Term {}

impl Display for VarTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Int(int) => write!(f, "{}", int.number),
            Term::Var(var) => write!(f, "{var}"),
            Term::Appl(appl) => {
                if appl.args.is_empty() {
                    return write!(f, "{}", appl.name);
                }
                write!(f, "{}(", appl.name)?;
                for (i, arg) in appl.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Term::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Term::ListPattern(pattern) => {
                write!(f, "[")?;
                for (i, var) in pattern.vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{var}")?;
                }
                write!(f, " | {}]", pattern.rest)
            }
            Term::MapWrite(write) => {
                f.write_str("{")?;
                for (i, (key, value)) in write.assignments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(key, f)?;
                    if !matches!(value, Term::MapWrite(_)) {
                        f.write_str(" |--> ")?;
                        Display::fmt(value, f)?;
                    }
                }
                f.write_str("}")
            }
            Term::MapRead(read) => write!(f, "{}[{}]", read.map, read.key),
        }
    }
}
