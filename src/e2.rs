//! E2, the small imperative example language: blocks, mutable variables,
//! conditionals, and while loops, desugared onto the rewrite engine with
//! integer arithmetic provided natively.

use crate::parse::{parse_native, parse_rule};
use crate::rule::{Module, NativeAction, NativeError};

fn write(value: i64, _unused: i64) -> Result<i64, NativeError> {
    println!("{value}");
    Ok(0)
}

// floored division, like the reference semantics (not truncation)
fn div(a: i64, b: i64) -> Result<i64, NativeError> {
    if b == 0 {
        return Err(NativeError::DivisionByZero);
    }
    a.checked_div_euclid(b).ok_or(NativeError::Overflow("div"))
}

/// Build the E2 module. The rule set is small enough that a parse failure
/// here is a bug in this file, so it panics rather than propagating.
pub fn module() -> Module {
    let rules = [
        "block([x | xs]) --> block(xs) where x --> y",
        "E |- assign(x, v) --> {x |--> v, E}",
        "E |- retrieve(x) --> E[x]",
        // despite the name, the zero branch is the else branch
        "ifz(cond, then, else) --> result where cond --> cond2; \
         case cond2 of {0 => result => else otherwise => result => then}",
        "while(cond, then) --> while2(cond, value, then) where cond --> value",
        "while2(cond, 0, then) --> 0",
        "while2(cond, value, then) --> while(cond, then) where then --> ignored",
    ]
    .into_iter()
    .map(|text| parse_rule(text).expect("the E2 rules parse"))
    .collect();

    let natives = [
        ("write(x)", write as NativeAction),
        ("add(x, y)", |a, b| {
            a.checked_add(b).ok_or(NativeError::Overflow("add"))
        }),
        ("sub(x, y)", |a, b| {
            a.checked_sub(b).ok_or(NativeError::Overflow("sub"))
        }),
        ("mul(x, y)", |a, b| {
            a.checked_mul(b).ok_or(NativeError::Overflow("mul"))
        }),
        ("div(x, y)", div),
        ("leq(x, y)", |a, b| Ok(i64::from(a <= b))),
    ]
    .into_iter()
    .map(|(pattern, action)| parse_native(pattern, action).expect("the E2 natives parse"))
    .collect();

    let mut module = Module::new(rules, natives);
    module.name = "e2".to_owned();
    module
}
