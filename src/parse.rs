//! Recursive-descent parser producing terms, rules, premises, and module
//! sections from the DynSem-like surface syntax.

use std::sync::Arc;

use thiserror::Error;

use crate::lex::{File, Lex, LexError, SourceInfo, Token, TokenKind};
use crate::rule::{Module, NativeAction, NativeFunction, Premise, Rule};
use crate::term::{Term, VarTerm};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tokenize error")]
    Lex {
        #[from]
        lex_error: LexError,
    },
    #[error("parse error: {message} at {source_info}")]
    Parse {
        message: String,
        source_info: String,
    },
    #[error("unexpected end of input at {source_info}")]
    Eof { source_info: String },
}

pub struct Parser<'a> {
    lex: &'a mut Lex,
}

impl<'a> Parser<'a> {
    pub fn new(lex: &'a mut Lex) -> Self {
        Self { lex }
    }

    fn fail<R>(token: Token, message: impl Into<String>) -> Result<R, ParseError> {
        Err(ParseError::Parse {
            message: message.into(),
            source_info: token.source_info.to_string(),
        })
    }

    fn fail_here<R>(&self, message: impl Into<String>) -> Result<R, ParseError> {
        Err(ParseError::Parse {
            message: message.into(),
            source_info: self.lex.source_info_here().to_string(),
        })
    }

    fn eof_error(&self) -> ParseError {
        ParseError::Eof {
            source_info: SourceInfo::eof(Arc::clone(self.lex.input())).to_string(),
        }
    }

    fn optional<F, R>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Self) -> Result<R, ParseError>,
    {
        let state = self.lex.save();
        match f(self) {
            Ok(m) => Some(m),
            Err(_err) => {
                self.lex.restore(state);
                None
            }
        }
    }

    fn peek_opt(&mut self) -> Option<Token> {
        self.optional(|this| this.peek())
    }

    fn peek(&mut self) -> Result<Token, ParseError> {
        self.lex
            .clone()
            .next()
            .transpose()?
            .ok_or_else(|| self.eof_error())
    }

    fn advance(&mut self) {
        self.lex
            .next()
            .expect("unchecked advance")
            .expect("impossible lex error! probably due to unchecked advance");
    }

    pub fn eof(&mut self) -> Result<(), ParseError> {
        if let Some(token) = self.peek_opt() {
            return Self::fail(token, "expected EOF but tokens remain");
        }
        Ok(())
    }

    pub fn is_eof(&mut self) -> bool {
        self.peek_opt().is_none()
    }

    fn any_token(&mut self) -> Result<Token, ParseError> {
        self.lex
            .next()
            .transpose()?
            .ok_or_else(|| self.eof_error())
    }

    fn ident(&mut self) -> Result<Token, ParseError> {
        let token = self.any_token()?;
        if !token.is_ident() {
            return Self::fail(token, "expected identifier");
        }
        Ok(token)
    }

    fn ident_opt(&mut self) -> Option<Token> {
        if let Some(token) = self.peek_opt() {
            if token.is_ident() {
                self.advance();
                return Some(token);
            }
        }
        None
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), ParseError> {
        let token = self.any_token()?;
        if token.kind == TokenKind::Symbol && token.as_str() == sym {
            return Ok(());
        }
        Self::fail(token, format!("expected symbol '{}'", sym))
    }

    fn expect_symbol_opt(&mut self, sym: &str) -> Option<Token> {
        if let Some(token) = self.peek_opt() {
            if token.kind == TokenKind::Symbol && token.as_str() == sym {
                self.advance();
                return Some(token);
            }
        }
        None
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        let token = self.any_token()?;
        if token.kind == TokenKind::Keyword && token.as_str() == kw {
            return Ok(());
        }
        Self::fail(token, format!("expected keyword '{}'", kw))
    }

    fn expect_keyword_opt(&mut self, kw: &str) -> bool {
        if let Some(token) = self.peek_opt() {
            if token.kind == TokenKind::Keyword && token.as_str() == kw {
                self.advance();
                return true;
            }
        }
        false
    }

    /// term := numeral | ident | ident(args) | ident[key] | [items] | {writes}
    pub fn term(&mut self) -> Result<Term, ParseError> {
        let token = self.any_token()?;
        match token.kind {
            TokenKind::NumLit => {
                let number = token
                    .as_str()
                    .parse()
                    .expect("numeral token holds a number");
                Ok(Term::int(number))
            }
            TokenKind::Ident => {
                let name = token.as_str().to_owned();
                if self.expect_symbol_opt("(").is_some() {
                    let args = self.term_seq(")")?;
                    Ok(Term::appl(name, args))
                } else if self.expect_symbol_opt("[").is_some() {
                    let key = self.term()?;
                    self.expect_symbol("]")?;
                    Ok(Term::map_read(Term::var(name), key))
                } else {
                    Ok(Term::var(name))
                }
            }
            TokenKind::Symbol => match token.as_str() {
                "[" => self.list_term(),
                "{" => self.map_write_term(),
                _ => Self::fail(token, "expected a term"),
            },
            TokenKind::Keyword => Self::fail(token, "expected a term"),
        }
    }

    fn term_seq(&mut self, close: &str) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();
        if self.expect_symbol_opt(close).is_some() {
            return Ok(terms);
        }
        loop {
            terms.push(self.term()?);
            if self.expect_symbol_opt(",").is_some() {
                continue;
            }
            self.expect_symbol(close)?;
            return Ok(terms);
        }
    }

    // already past the opening '['
    fn list_term(&mut self) -> Result<Term, ParseError> {
        if self.expect_symbol_opt("]").is_some() {
            return Ok(Term::list(Vec::new()));
        }
        let mut items = vec![self.term()?];
        loop {
            if self.expect_symbol_opt(",").is_some() {
                items.push(self.term()?);
                continue;
            }
            if self.expect_symbol_opt("|").is_some() {
                let rest = self.term()?;
                self.expect_symbol("]")?;
                let vars = items
                    .into_iter()
                    .map(|item| self.as_var(item))
                    .collect::<Result<Vec<_>, _>>()?;
                let rest = self.as_var(rest)?;
                return Ok(Term::list_pattern(vars, rest));
            }
            self.expect_symbol("]")?;
            return Ok(Term::list(items));
        }
    }

    fn as_var(&self, term: Term) -> Result<VarTerm, ParseError> {
        match term {
            Term::Var(var) => Ok(var),
            other => self.fail_here(format!(
                "expected a variable in a list pattern but found: {other}"
            )),
        }
    }

    // already past the opening '{'
    fn map_write_term(&mut self) -> Result<Term, ParseError> {
        let mut assignments = Vec::new();
        if self.expect_symbol_opt("}").is_some() {
            return Ok(Term::map_write(assignments));
        }
        loop {
            let key = self.term()?;
            if self.expect_symbol_opt("|-->").is_some() {
                let value = self.term()?;
                assignments.push((key, value));
            } else {
                // bare entry: carry the current environment over unchanged
                assignments.push((key, Term::map_write(Vec::new())));
            }
            if self.expect_symbol_opt(",").is_some() {
                continue;
            }
            self.expect_symbol("}")?;
            return Ok(Term::map_write(assignments));
        }
    }

    /// rule := [components |-] before --> after [where premise (; premise)*] [.]
    pub fn rule(&mut self) -> Result<Rule, ParseError> {
        let mut components = Vec::new();
        let mut before = self.term()?;
        while self.expect_symbol_opt("|-").is_some() {
            components.push(before);
            before = self.term()?;
        }
        self.expect_symbol("-->")?;
        let after = self.term()?;
        let mut premises = Vec::new();
        if self.expect_keyword_opt("where") {
            loop {
                premises.push(self.premise()?);
                if self.expect_symbol_opt(";").is_some() {
                    continue;
                }
                break;
            }
        }
        self.expect_symbol_opt(".");
        Ok(Rule::new(before, after, components, premises))
    }

    /// premise := case-premise | term (== | => | -->) term
    pub fn premise(&mut self) -> Result<Premise, ParseError> {
        if self.expect_keyword_opt("case") {
            let left = self.term()?;
            self.expect_keyword("of")?;
            self.expect_symbol("{")?;
            let mut values = Vec::new();
            let mut premises = Vec::new();
            while self.expect_symbol_opt("}").is_none() {
                if self.expect_keyword_opt("otherwise") {
                    values.push(None);
                } else {
                    values.push(Some(self.term()?));
                }
                self.expect_symbol("=>")?;
                premises.push(self.premise()?);
            }
            return Ok(Premise::Case {
                left,
                values,
                premises,
            });
        }
        let left = self.term()?;
        let token = self.any_token()?;
        if !token.is_symbol() {
            return Self::fail(token, "expected `==`, `=>`, or `-->` in a premise");
        }
        match token.as_str() {
            "==" => Ok(Premise::EqualityCheck {
                left,
                right: self.term()?,
            }),
            "-->" => Ok(Premise::Reduction {
                left,
                right: self.term()?,
            }),
            "=>" => {
                let right = self.term()?;
                if matches!(left, Term::Var(_)) {
                    Ok(Premise::Assignment { left, right })
                } else {
                    Ok(Premise::PatternMatch { left, right })
                }
            }
            _ => Self::fail(token, "expected `==`, `=>`, or `-->` in a premise"),
        }
    }

    /// module := (module NAME | imports IDENT* | rules RULE*)*
    pub fn module(&mut self) -> Result<Module, ParseError> {
        let mut name = String::new();
        let mut imports = Vec::new();
        let mut rules = Vec::new();
        while let Some(token) = self.peek_opt() {
            if !token.is_keyword() {
                return Self::fail(token, "expected a section keyword");
            }
            self.advance();
            match token.as_str() {
                "module" => {
                    name = self.ident()?.as_str().to_owned();
                }
                "imports" => {
                    while let Some(import) = self.ident_opt() {
                        imports.push(import.as_str().to_owned());
                    }
                }
                "rules" => loop {
                    match self.peek_opt() {
                        None => break,
                        Some(next) if next.is_keyword() => break,
                        Some(_) => rules.push(self.rule()?),
                    }
                },
                _ => return Self::fail(token, "expected `module`, `imports`, or `rules`"),
            }
        }
        let mut module = Module::new(rules, Vec::new());
        module.name = name;
        module.imports = imports;
        Ok(module)
    }
}

fn with_parser<R>(
    input: &str,
    f: impl FnOnce(&mut Parser) -> Result<R, ParseError>,
) -> Result<R, ParseError> {
    let file = Arc::new(File::new("<input>", input));
    let mut lex = Lex::new(file);
    let mut parser = Parser::new(&mut lex);
    let result = f(&mut parser)?;
    parser.eof()?;
    Ok(result)
}

/// Parse a single standalone term.
pub fn parse_term(input: &str) -> Result<Term, ParseError> {
    with_parser(input, |parser| parser.term())
}

/// Parse a single rule, with slots assigned.
pub fn parse_rule(input: &str) -> Result<Rule, ParseError> {
    with_parser(input, |parser| parser.rule())
}

/// Parse a single premise. Slot assignment is left to the enclosing rule.
pub fn parse_premise(input: &str) -> Result<Premise, ParseError> {
    with_parser(input, |parser| parser.premise())
}

/// Parse a native-function pattern and attach its host action.
pub fn parse_native(input: &str, action: NativeAction) -> Result<NativeFunction, ParseError> {
    let before = parse_term(input)?;
    Ok(NativeFunction::new(before, action))
}

/// Parse module text (`module`/`imports`/`rules` sections).
pub fn parse_module(input: &str) -> Result<Module, ParseError> {
    with_parser(input, |parser| parser.module())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_header() {
        let module = parse_module("module trans/runtime/environment").unwrap();
        assert_eq!(module.name, "trans/runtime/environment");
    }

    #[test]
    fn parses_imports() {
        let module = parse_module(
            "imports
                trans/runtime/a
                trans/runtime/b",
        )
        .unwrap();
        assert_eq!(module.imports, ["trans/runtime/a", "trans/runtime/b"]);
    }

    #[test]
    fn parses_application_terms() {
        let term = parse_term("a(x, y)").unwrap();
        assert_eq!(term, Term::appl("a", vec![Term::var("x"), Term::var("y")]));
    }

    #[test]
    fn parses_rules_with_premises() {
        let rule = parse_rule("a(x, y) --> b where 1 == 1").unwrap();
        assert_eq!(
            rule.before,
            Term::appl("a", vec![Term::var("x"), Term::var("y")])
        );
        assert_eq!(rule.after, Term::var("b"));
        assert_eq!(
            rule.premises,
            [Premise::EqualityCheck {
                left: Term::int(1),
                right: Term::int(1),
            }]
        );
    }

    #[test]
    fn parses_rules_section() {
        let module = parse_module(
            "rules
                Lit(s) --> NumV(parseI(s))
                Plus(NumV(a), NumV(b)) --> NumV(addI(a, b))",
        )
        .unwrap();
        assert_eq!(module.rules.len(), 2);
        assert_eq!(
            module.rules[0].before,
            Term::appl("Lit", vec![Term::var("s")])
        );
        assert_eq!(
            module.rules[1].after,
            Term::appl(
                "NumV",
                vec![Term::appl("addI", vec![Term::var("a"), Term::var("b")])]
            )
        );
    }

    #[test]
    fn parses_environment_write() {
        let rule = parse_rule("E |- bindVar(x, v) --> {x |--> v, E}").unwrap();
        assert_eq!(rule.components, [Term::var("E")]);
        let Term::MapWrite(write) = &rule.after else {
            panic!("expected a map-write after-term, got {}", rule.after);
        };
        assert_eq!(write.assignments.len(), 2);
        assert_eq!(write.assignments[0].0, Term::var("x"));
        assert_eq!(write.assignments[0].1, Term::var("v"));
        // the bare component entry is the clone-environment marker
        assert_eq!(write.assignments[1].1, Term::map_write(Vec::new()));
    }

    #[test]
    fn parses_environment_read() {
        let rule = parse_rule("E |- read(x) --> E[x]").unwrap();
        let Term::MapRead(read) = &rule.after else {
            panic!("expected a map-read after-term, got {}", rule.after);
        };
        assert_eq!(*read.map, Term::var("E"));
        assert_eq!(*read.key, Term::var("x"));
    }

    #[test]
    fn parses_case_premises() {
        let premise = parse_premise("case i of {1 => x --> y otherwise => y --> z}").unwrap();
        let Premise::Case {
            left,
            values,
            premises,
        } = premise
        else {
            panic!("expected a case premise");
        };
        assert_eq!(left, Term::var("i"));
        assert_eq!(values, [Some(Term::int(1)), None]);
        assert_eq!(premises.len(), 2);
    }

    #[test]
    fn assignment_premise_requires_variable_left() {
        assert!(matches!(
            parse_premise("x => 1").unwrap(),
            Premise::Assignment { .. }
        ));
        assert!(matches!(
            parse_premise("b(y) => x").unwrap(),
            Premise::PatternMatch { .. }
        ));
    }

    #[test]
    fn parses_list_patterns() {
        let term = parse_term("[x, y | rest]").unwrap();
        assert_eq!(
            term,
            Term::list_pattern(
                vec![VarTerm::new("x"), VarTerm::new("y")],
                VarTerm::new("rest")
            )
        );
    }

    #[test]
    fn rejects_non_variable_list_pattern_positions() {
        assert!(parse_term("[1 | rest]").is_err());
    }

    #[test]
    fn reports_position_on_error() {
        let err = parse_rule("a(x) -->").unwrap_err();
        assert!(matches!(err, ParseError::Eof { .. }), "got: {err}");
        let err = parse_term("a(x,,)").unwrap_err();
        assert!(matches!(err, ParseError::Parse { .. }), "got: {err}");
    }
}
