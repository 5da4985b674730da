//! The reduction engine: rewrites a term by the first matching rule or
//! native function, over and over, until no pattern applies.

use thiserror::Error;

use crate::context::{Context, ContextError};
use crate::env::Environment;
use crate::rule::{Module, NativeError, Premise, Transform};
use crate::term::Term;

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Native(#[from] NativeError),
    #[error("premise pattern {pattern} does not match {term}")]
    PatternMismatch { pattern: String, term: String },
    #[error("premise equality failed: {left} is not {right}")]
    NotEqual { left: String, right: String },
    #[error("no case branch matched {0}")]
    NoMatchingBranch(String),
    #[error("environment keys must resolve to variables but found: {0}")]
    EnvironmentKey(String),
    #[error("variable `{0}` was never written")]
    UndefinedVariable(String),
    #[error("native function argument {name} did not reduce to an integer: {term}")]
    NativeArgument { name: String, term: String },
    #[error("native function patterns must be applications: {0}")]
    NativePattern(String),
    #[error("no normal form within {0} reductions")]
    StepLimit(usize),
}

/// Reduces terms against one module, threading a mutable [`Environment`]
/// through every rule application. Create one per top-level term.
pub struct Interpreter<'m> {
    module: &'m Module,
    environment: Environment,
    max_steps: Option<usize>,
    steps: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Interpreter {
            module,
            environment: Environment::new(),
            max_steps: None,
            steps: 0,
        }
    }

    /// Like [`Interpreter::new`] but gives up with
    /// [`InterpretError::StepLimit`] after `max_steps` reductions. Useful
    /// when the rule set is not trusted to terminate.
    pub fn with_max_steps(module: &'m Module, max_steps: usize) -> Self {
        Interpreter {
            max_steps: Some(max_steps),
            ..Self::new(module)
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Reduce `term` to a normal form. A term no pattern in the module
    /// matches is the normal form, not an error; failures inside a selected
    /// rule (a premise that does not hold, a read of a never-written
    /// variable) are errors.
    pub fn interpret(&mut self, mut term: Term) -> Result<Term, InterpretError> {
        loop {
            if !matches!(term, Term::Appl(_)) {
                return Ok(term);
            }
            let Some(id) = self.find_transform(&term) else {
                return Ok(term);
            };
            if let Some(max_steps) = self.max_steps {
                self.steps += 1;
                if self.steps > max_steps {
                    return Err(InterpretError::StepLimit(max_steps));
                }
            }
            if log::log_enabled!(log::Level::Debug) {
                log::debug!("reduce {} by {}", term, self.module.pattern(id));
            }
            term = match id {
                Transform::Rule(index) => self.apply_rule(index, &term)?,
                Transform::Native(index) => self.apply_native(index, &term)?,
            };
        }
    }

    /// Pattern search with per-node memoization. A hit is only reused after
    /// its pattern is re-checked against the current arguments, and a match
    /// is only memoized when it is the module's first candidate for this
    /// term; a later candidate may match terms an earlier pattern rejects,
    /// so memoizing it would shadow the earlier pattern on the next lookup.
    fn find_transform(&self, term: &Term) -> Option<Transform> {
        let Term::Appl(appl) = term else {
            return self.module.find(term);
        };
        if let Some(id) = appl.cache.get() {
            if self.module.pattern(id).matches(term) {
                return Some(id);
            }
        }
        let candidates = self.module.candidates(term);
        let position = candidates
            .iter()
            .position(|&id| self.module.pattern(id).matches(term))?;
        let id = candidates[position];
        if position == 0 {
            appl.cache.set(Some(id));
        }
        Some(id)
    }

    fn apply_rule(&mut self, index: usize, term: &Term) -> Result<Term, InterpretError> {
        let module = self.module;
        let rule = &module.rules[index];
        let mut context = Context::new(rule.slot_count);
        context.bind(&rule.before, term)?;
        for premise in &rule.premises {
            self.eval_premise(premise, &mut context)?;
        }
        match &rule.after {
            Term::MapWrite(write) => {
                for (key, value) in &write.assignments {
                    // an entry whose value is itself a map write carries the
                    // current environment over and writes nothing
                    if matches!(value, Term::MapWrite(_)) {
                        continue;
                    }
                    let key = context.resolve(key)?;
                    let Term::Var(key) = key else {
                        return Err(InterpretError::EnvironmentKey(key.to_string()));
                    };
                    let value = self.interpret(context.resolve(value)?)?;
                    let location = self.environment.locate(&key.name);
                    self.environment.put(location, value);
                }
                Ok(rule.after.clone())
            }
            Term::MapRead(read) => {
                let key = context.resolve(&read.key)?;
                let Term::Var(key) = key else {
                    return Err(InterpretError::EnvironmentKey(key.to_string()));
                };
                self.environment
                    .lookup(&key.name)
                    .cloned()
                    .ok_or(InterpretError::UndefinedVariable(key.name))
            }
            after => Ok(context.resolve(after)?),
        }
    }

    fn eval_premise(
        &mut self,
        premise: &Premise,
        context: &mut Context,
    ) -> Result<(), InterpretError> {
        match premise {
            Premise::PatternMatch { left, right } => {
                let right = context.resolve(right)?;
                if !left.matches(&right) {
                    return Err(InterpretError::PatternMismatch {
                        pattern: left.to_string(),
                        term: right.to_string(),
                    });
                }
                context.bind(left, &right)?;
                Ok(())
            }
            Premise::EqualityCheck { left, right } => {
                let left = context.resolve(left)?;
                let right = context.resolve(right)?;
                if left != right {
                    return Err(InterpretError::NotEqual {
                        left: left.to_string(),
                        right: right.to_string(),
                    });
                }
                Ok(())
            }
            Premise::Assignment { left, right } => {
                let right = context.resolve(right)?;
                context.bind(left, &right)?;
                Ok(())
            }
            Premise::Reduction { left, right } => {
                let value = self.interpret(context.resolve(left)?)?;
                if !right.matches(&value) {
                    return Err(InterpretError::PatternMismatch {
                        pattern: right.to_string(),
                        term: value.to_string(),
                    });
                }
                context.bind(right, &value)?;
                Ok(())
            }
            Premise::Case {
                left,
                values,
                premises,
            } => {
                let subject = context.resolve(left)?;
                for (value, premise) in values.iter().zip(premises) {
                    let selected = match value {
                        None => true,
                        Some(value) => context.resolve(value)?.matches(&subject),
                    };
                    if selected {
                        return self.eval_premise(premise, context);
                    }
                }
                Err(InterpretError::NoMatchingBranch(subject.to_string()))
            }
        }
    }

    /// Bind the native's pattern, reduce each argument to an integer (a
    /// missing second argument defaults to zero), and wrap the host
    /// function's result back up as a term.
    fn apply_native(&mut self, index: usize, term: &Term) -> Result<Term, InterpretError> {
        let module = self.module;
        let native = &module.natives[index];
        let mut context = Context::new(native.slot_count);
        context.bind(&native.before, term)?;
        let Term::Appl(pattern) = &native.before else {
            return Err(InterpretError::NativePattern(native.before.to_string()));
        };
        let mut numbers = [0i64; 2];
        for (position, arg) in pattern.args.iter().take(numbers.len()).enumerate() {
            let value = self.interpret(context.resolve(arg)?)?;
            let Term::Int(int) = value else {
                return Err(InterpretError::NativeArgument {
                    name: arg.to_string(),
                    term: value.to_string(),
                });
            };
            numbers[position] = int.number;
        }
        Ok(Term::int((native.action)(numbers[0], numbers[1])?))
    }
}
