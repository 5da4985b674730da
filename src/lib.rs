//! A small-step term rewriting interpreter for DynSem-style semantics.
//!
//! A [`rule::Module`] holds rewrite rules (`before --> after where premises`)
//! and native functions; an [`interp::Interpreter`] reduces a term against it
//! until no pattern matches. The bundled [`e2`] module implements a small
//! imperative language on top of the engine.

use std::sync::Arc;

use anyhow::Context as _;

pub mod context;
pub mod e2;
pub mod env;
pub mod interp;
pub mod lex;
pub mod parse;
pub mod rule;
pub mod slot;
pub mod term;

pub use env::Environment;
pub use interp::{InterpretError, Interpreter};
pub use rule::{Module, NativeError, NativeFunction, Premise, Rule};
pub use term::Term;

/// Parse `input` as a single E2 program term and reduce it to a normal form.
/// `name` labels the input in parse diagnostics.
pub fn process(name: &str, input: &str) -> anyhow::Result<Term> {
    let file = Arc::new(lex::File::new(name, input));
    let mut lex = lex::Lex::new(file);
    let mut parser = parse::Parser::new(&mut lex);
    let term = parser.term().context("parse error")?;
    parser.eof().context("parse error")?;

    let module = e2::module();
    let term = Interpreter::new(&module)
        .interpret(term)
        .context("interpret error")?;
    Ok(term)
}
