//! Tokenizer for the DynSem-like surface syntax.

use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug)]
pub struct File {
    name: String,
    contents: String,
    lines: Vec<usize>,
}

impl File {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        let name = name.into();
        let contents = contents.into();
        let mut lines = vec![0];
        for (idx, ch) in contents.char_indices() {
            if ch == '\n' {
                lines.push(idx + ch.len_utf8());
            }
        }
        Self {
            name,
            contents,
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn line_column_at(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.contents.len());
        let line_index = match self.lines.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line_start = *self
            .lines
            .get(line_index)
            .expect("at least one line start is recorded");
        let column = self.contents[line_start..offset].chars().count() + 1;
        (line_index + 1, column)
    }

    pub fn line(&self, line: usize) -> &str {
        if line == 0 || line > self.lines.len() {
            return "";
        }
        let start = self.lines[line - 1];
        let end = if let Some(next_start) = self.lines.get(line) {
            let mut end = *next_start;
            if end > start && self.contents.as_bytes()[end - 1] == b'\n' {
                end -= 1;
            }
            end
        } else {
            self.contents.len()
        };
        &self.contents[start..end]
    }
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    range: Range<usize>,
    file: Arc<File>,
}

impl SourceInfo {
    pub fn new(file: Arc<File>, range: Range<usize>) -> Self {
        Self { range, file }
    }

    pub fn eof(file: Arc<File>) -> Self {
        let len = file.len();
        Self::new(file, len..len)
    }

    fn as_str(&self) -> &str {
        self.file
            .contents()
            .get(self.range.clone())
            .expect("invalid token position")
    }

    pub fn line_column(&self) -> (usize, usize) {
        self.file.line_column_at(self.range.start)
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (line, column) = self.line_column();
        writeln!(f, "{}:{}:{}\n", self.file.name(), line, column)?;
        let line_text = self.file.line(line);
        writeln!(f, "{}", line_text)?;
        writeln!(
            f,
            "{}{}",
            " ".repeat(column - 1),
            "^".repeat(std::cmp::max(1, self.as_str().chars().count()))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,   // e.g. "x", "block", "trans/runtime/a"
    Symbol,  // e.g. "-->", "|-->", "(", ";"
    NumLit,  // e.g. "0", "42"
    Keyword, // e.g. "rules", "where", "case"
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub source_info: SourceInfo,
}

impl Token {
    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_symbol(&self) -> bool {
        self.kind == TokenKind::Symbol
    }

    pub fn is_num_lit(&self) -> bool {
        self.kind == TokenKind::NumLit
    }

    pub fn is_keyword(&self) -> bool {
        self.kind == TokenKind::Keyword
    }

    pub fn as_str(&self) -> &str {
        self.source_info.as_str()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?} {}\n{}", self.kind, self.as_str(), self.source_info)
    }
}

#[derive(Debug, Clone)]
pub struct Lex {
    file: Arc<File>,
    position: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LexState {
    position: usize,
}

#[derive(Debug, Clone, Error)]
#[error("unrecognizable character at {source_info}")]
pub struct LexError {
    source_info: SourceInfo,
}

impl From<Lex> for LexError {
    fn from(lex: Lex) -> Self {
        let start = std::cmp::min(lex.position, lex.file.len());
        let end = if start < lex.file.len() {
            let rest = &lex.file.contents()[start..];
            rest.chars()
                .next()
                .map(|c| start + c.len_utf8())
                .unwrap_or(start)
        } else {
            start
        };
        Self {
            source_info: SourceInfo::new(lex.file, start..end),
        }
    }
}

impl Lex {
    pub fn new(file: Arc<File>) -> Self {
        Self { file, position: 0 }
    }

    pub fn input(&self) -> &Arc<File> {
        &self.file
    }

    pub fn save(&self) -> LexState {
        LexState {
            position: self.position,
        }
    }

    pub fn restore(&mut self, state: LexState) {
        self.position = state.position;
    }

    pub fn source_info_here(&self) -> SourceInfo {
        let end = std::cmp::min(self.position + 1, self.file.len());
        SourceInfo::new(Arc::clone(&self.file), self.position..end)
    }

    fn advance(&mut self, bytes: usize) -> SourceInfo {
        let source_info =
            SourceInfo::new(Arc::clone(&self.file), self.position..self.position + bytes);
        self.position += bytes;
        source_info
    }

    pub fn is_eof(&self) -> bool {
        self.clone().next().is_none()
    }
}

impl Iterator for Lex {
    type Item = std::result::Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        #[derive(PartialEq, Eq, Debug)]
        enum Kind {
            Space,
            Ident,
            Symbol,
            NumLit,
        }

        static RE: Lazy<Regex> = Lazy::new(|| {
            let s = &[
                (Kind::Space, r"\s+|//[^\n]*|/\*"),
                // module paths like trans/runtime/a are single identifiers
                (Kind::Ident, r"[A-Za-z_][A-Za-z0-9_]*(?:/[A-Za-z0-9_]+)*"),
                (Kind::Symbol, r"\|-->|-->|\|-|==|=>|[()\[\]{},;.|]"),
                (Kind::NumLit, r"0|[1-9][0-9]*"),
            ]
            .iter()
            .map(|(kind, re)| format!("(?P<{:?}>{})", kind, re))
            .collect::<Vec<_>>()
            .join("|");
            Regex::new(&format!("^(?:{})", s)).expect("valid token regex")
        });

        loop {
            if self.file.len() == self.position {
                return None;
            }
            let input = Arc::clone(&self.file);
            let cap = match RE.captures(&input.contents()[self.position..]) {
                None => return Some(Err(LexError::from(self.clone()))),
                Some(cap) => cap,
            };

            // skip whitespace and comments
            if let Some(m) = cap.name(&format!("{:?}", Kind::Space)) {
                self.advance(m.range().len());
                if m.as_str() == "/*" {
                    let rest = &self.file.contents()[self.position..];
                    match rest.find("*/") {
                        Some(offset) => {
                            self.advance(offset + 2);
                        }
                        // unmatched open comment
                        None => return Some(Err(LexError::from(self.clone()))),
                    }
                }
                continue;
            }

            let source_info = self.advance(cap.get(0).expect("capture matched").range().len());
            let text = source_info.as_str();

            let kind;
            if cap.name(&format!("{:?}", Kind::Ident)).is_some() {
                match text {
                    "module" | "imports" | "rules" | "where" | "case" | "of" | "otherwise" => {
                        kind = TokenKind::Keyword;
                    }
                    _ => {
                        kind = TokenKind::Ident;
                    }
                }
            } else if cap.name(&format!("{:?}", Kind::NumLit)).is_some() {
                kind = TokenKind::NumLit;
            } else {
                kind = TokenKind::Symbol;
            }
            return Some(Ok(Token { kind, source_info }));
        }
    }
}

impl FusedIterator for Lex {}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let file = Arc::new(File::new("<test>", input.to_owned()));
        Lex::new(file)
            .map(|token| token.expect("lexing failed"))
            .collect()
    }

    #[test]
    fn rule_text_tokenizes() {
        let tokens = tokenize("a(x, y) --> b where 1 == 1");
        let texts: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            texts,
            ["a", "(", "x", ",", "y", ")", "-->", "b", "where", "1", "==", "1"]
        );
        assert_eq!(tokens[6].kind, TokenKind::Symbol);
        assert_eq!(tokens[7].kind, TokenKind::Ident);
        assert_eq!(tokens[8].kind, TokenKind::Keyword);
        assert_eq!(tokens[9].kind, TokenKind::NumLit);
    }

    #[test]
    fn environment_symbols_lex_longest_first() {
        let texts: Vec<String> = tokenize("E |- x |--> v | y")
            .iter()
            .map(|t| t.as_str().to_owned())
            .collect();
        assert_eq!(texts, ["E", "|-", "x", "|-->", "v", "|", "y"]);
    }

    #[test]
    fn module_paths_are_single_identifiers() {
        let tokens = tokenize("trans/runtime/environment");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].as_str(), "trans/runtime/environment");
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize("a // trailing\n /* block\n comment */ b");
        let texts: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn unmatched_open_comment_is_an_error() {
        let file = Arc::new(File::new("<test>", "a /* never closed"));
        let mut lex = Lex::new(file);
        assert!(lex.next().expect("first token").is_ok());
        assert!(matches!(lex.next(), Some(Err(_))));
    }

    #[test]
    fn invalid_characters_are_errors() {
        let file = Arc::new(File::new("<test>", "a ? b"));
        let mut lex = Lex::new(file);
        assert!(lex.next().expect("first token").is_ok());
        assert!(matches!(lex.next(), Some(Err(_))));
    }
}
