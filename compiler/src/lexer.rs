//! Indentation-sensitive lexer (spec §4.2)
//!
//! Produces tokens on demand, tracking an indent stack to synthesize
//! `INDENT`/`DEDENT` tokens, collapsing blank/comment-only lines, and
//! tokenizing interpolated strings (`$"...{expr}..."`) by preserving their
//! brace-delimited interiors verbatim for the parser to re-lex.

use crate::arena::Arena;
use crate::token::{keyword_kind, Literal, Token, TokenKind};
use std::collections::VecDeque;
use std::sync::Arc;

pub struct Lexer<'a> {
    arena: &'a Arena,
    source: Vec<char>,
    filename: Arc<str>,
    start: usize,
    current: usize,
    line: usize,
    indent_stack: Vec<usize>,
    at_line_start: bool,
    pending_dedents: VecDeque<Token>,
    pending_layout_error: Option<Token>,
    emitted_any: bool,
    /// Set once EOF's trailing DEDENT/NEWLINE flush has happened.
    eof_emitted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(arena: &'a Arena, source: &str, filename: impl Into<Arc<str>>) -> Self {
        Lexer {
            arena,
            source: source.chars().collect(),
            filename: filename.into(),
            start: 0,
            current: 0,
            line: 1,
            indent_stack: vec![0],
            at_line_start: true,
            pending_dedents: VecDeque::new(),
            pending_layout_error: None,
            emitted_any: false,
            eof_emitted: false,
        }
    }

    fn make(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, self.arena.strdup(lexeme), self.line, self.filename.clone())
    }

    fn error(&self, msg: impl AsRef<str>) -> Token {
        Token::new(TokenKind::Error, self.arena.strdup(msg.as_ref()), self.line, self.filename.clone())
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> char {
        *self.source.get(self.current).unwrap_or(&'\0')
    }

    fn peek_at(&self, offset: usize) -> char {
        *self.source.get(self.current + offset).unwrap_or(&'\0')
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn slice(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    /// Pull the next token. Call repeatedly until `TokenKind::Eof`.
    pub fn next_token(&mut self) -> Token {
        if let Some(t) = self.pending_dedents.pop_front() {
            return t;
        }
        if let Some(t) = self.pending_layout_error.take() {
            return t;
        }

        if self.at_line_start {
            if let Some(layout) = self.handle_indentation() {
                return layout;
            }
        }

        self.skip_intra_line_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.handle_eof();
        }

        let c = self.advance();

        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
            return self.make(TokenKind::Newline, "\n");
        }
        if c == '#' {
            while !self.is_at_end() && self.peek() != '\n' {
                self.advance();
            }
            return self.next_token();
        }

        if c.is_ascii_digit() {
            return self.number();
        }
        if c.is_alphabetic() || c == '_' {
            return self.identifier_or_keyword();
        }
        if c == '"' {
            return self.string_literal(false);
        }
        if c == '\'' {
            return self.char_literal();
        }
        if c == '$' && self.peek() == '"' {
            self.advance();
            return self.string_literal(true);
        }

        self.operator_or_punct(c)
    }

    fn skip_intra_line_whitespace(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    /// Run the indentation protocol for a fresh logical line. Returns a
    /// layout token (INDENT/DEDENT/ERROR) if one must be emitted before
    /// lexing the line's first real token, or `None` if indentation did not
    /// change (including for blank/comment-only lines, which are skipped
    /// entirely and never affect the indent stack).
    fn handle_indentation(&mut self) -> Option<Token> {
        loop {
            let line_start = self.current;
            let mut spaces = 0usize;
            let mut saw_tab = false;
            loop {
                match self.peek() {
                    ' ' => {
                        spaces += 1;
                        self.advance();
                    }
                    '\t' => {
                        saw_tab = true;
                        self.advance();
                    }
                    // CR is ignored (spec §4.2 "CR is ignored"); it must not
                    // count toward indentation nor block the blank-line
                    // check below for CRLF-terminated blank lines.
                    '\r' => {
                        self.advance();
                    }
                    _ => break,
                }
            }

            // Blank line or comment-only line: consume and retry, no layout
            // token, no effect on the indent stack.
            if self.peek() == '\n' {
                self.advance();
                self.line += 1;
                continue;
            }
            if self.peek() == '#' {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
                if self.peek() == '\n' {
                    self.advance();
                    self.line += 1;
                }
                continue;
            }
            if self.is_at_end() {
                self.at_line_start = false;
                self.current = line_start;
                return None;
            }

            if saw_tab {
                self.at_line_start = false;
                return Some(self.error("tabs are not permitted for indentation"));
            }

            self.at_line_start = false;
            let top = *self.indent_stack.last().unwrap();
            if spaces == top {
                return None;
            }
            if spaces > top {
                self.indent_stack.push(spaces);
                return Some(self.make(TokenKind::Indent, ""));
            }

            // spaces < top: pop until top == spaces, queue one DEDENT per pop.
            while *self.indent_stack.last().unwrap() > spaces {
                self.indent_stack.pop();
                self.pending_dedents.push_back(self.make(TokenKind::Dedent, ""));
            }
            if *self.indent_stack.last().unwrap() != spaces {
                self.pending_layout_error = Some(self.error("inconsistent dedent"));
            }
            return self.pending_dedents.pop_front();
        }
    }

    fn handle_eof(&mut self) -> Token {
        if !self.eof_emitted {
            // Pop remaining indents so the parser sees matching DEDENTs.
            while self.indent_stack.len() > 1 {
                self.indent_stack.pop();
                self.pending_dedents.push_back(self.make(TokenKind::Dedent, ""));
            }
            self.eof_emitted = true;
            if let Some(t) = self.pending_dedents.pop_front() {
                return t;
            }
        }
        self.make(TokenKind::Eof, "")
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_at(1).is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            let mut text = self.slice();
            let is_d_suffixed = self.peek() == 'd';
            if is_d_suffixed {
                self.advance();
                text = self.slice();
                text.pop();
            }
            return match text.parse::<f64>() {
                Ok(v) => self
                    .make(TokenKind::Double, &self.slice())
                    .with_literal(Literal::Double(v)),
                Err(_) => self.error("malformed double literal"),
            };
        }

        if self.peek() == '.' {
            return self.error("malformed number: expected digit after '.'");
        }

        if self.peek() == 'l' {
            self.advance();
            let mut text = self.slice();
            text.pop();
            return match text.parse::<i64>() {
                Ok(v) => self
                    .make(TokenKind::Long, &self.slice())
                    .with_literal(Literal::Long(v)),
                Err(_) => self.error("malformed long literal"),
            };
        }

        let text = self.slice();
        match text.parse::<i64>() {
            Ok(v) => self.make(TokenKind::Int, &text).with_literal(Literal::Int(v)),
            Err(_) => self.error("malformed integer literal"),
        }
    }

    fn identifier_or_keyword(&mut self) -> Token {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let text = self.slice();
        if let Some(kind) = keyword_kind(&text) {
            if kind == TokenKind::True {
                return self.make(TokenKind::True, &text).with_literal(Literal::Bool(true));
            }
            if kind == TokenKind::False {
                return self.make(TokenKind::False, &text).with_literal(Literal::Bool(false));
            }
            return self.make(kind, &text);
        }
        self.make(TokenKind::Ident, &text)
    }

    fn char_literal(&mut self) -> Token {
        if self.peek() == '\'' {
            return self.error("empty char literal");
        }
        let c = if self.peek() == '\\' {
            self.advance();
            match self.escape_char() {
                Ok(c) => c,
                Err(msg) => return self.error(msg),
            }
        } else {
            self.advance()
        };
        if !self.matches('\'') {
            return self.error("unterminated char literal");
        }
        self.make(TokenKind::Char, &self.slice()).with_literal(Literal::Char(c))
    }

    fn escape_char(&mut self) -> Result<char, &'static str> {
        if self.is_at_end() {
            return Err("invalid escape sequence");
        }
        let c = self.advance();
        Ok(match c {
            '\\' => '\\',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '\'' => '\'',
            '"' => '"',
            '0' => '\0',
            _ => return Err("invalid escape sequence"),
        })
    }

    /// Lex a string literal. `interpolated` selects the `$"..."` flavour,
    /// whose brace-delimited expression pieces are preserved verbatim in the
    /// literal (the parser re-lexes/re-parses each piece, §4.3).
    fn string_literal(&mut self, interpolated: bool) -> Token {
        let mut value = String::new();
        let mut brace_depth = 0usize;
        loop {
            if self.is_at_end() {
                return self.error("unterminated string literal");
            }
            let c = self.peek();
            if c == '"' && brace_depth == 0 {
                self.advance();
                break;
            }
            if c == '\n' {
                return self.error("unterminated string literal");
            }
            if interpolated && c == '{' {
                brace_depth += 1;
                value.push(self.advance());
                continue;
            }
            if interpolated && c == '}' && brace_depth > 0 {
                brace_depth -= 1;
                value.push(self.advance());
                continue;
            }
            // Nested strings inside a brace expression: copy through
            // verbatim (including escapes) without re-interpreting them,
            // tracking their own quotes so an embedded `"` does not close
            // the outer interpolated string early.
            if brace_depth > 0 && (c == '"' || (c == '$' && self.peek_at(1) == '"')) {
                if c == '$' {
                    value.push(self.advance());
                }
                value.push(self.advance()); // opening quote
                loop {
                    if self.is_at_end() || self.peek() == '\n' {
                        return self.error("unterminated nested string literal");
                    }
                    let nc = self.advance();
                    value.push(nc);
                    if nc == '\\' && !self.is_at_end() {
                        value.push(self.advance());
                        continue;
                    }
                    if nc == '"' {
                        break;
                    }
                }
                continue;
            }
            if c == '\\' && brace_depth == 0 {
                self.advance();
                match self.escape_char() {
                    Ok(ch) => value.push(ch),
                    Err(msg) => return self.error(msg),
                }
                continue;
            }
            value.push(self.advance());
        }

        let arena_value = self.arena.strdup(&value);
        let kind = if interpolated {
            TokenKind::InterpolString
        } else {
            TokenKind::Str
        };
        let lexeme = self.slice();
        self.make(kind, &lexeme).with_literal(Literal::Str(arena_value))
    }

    fn operator_or_punct(&mut self, c: char) -> Token {
        macro_rules! tok {
            ($kind:expr) => {{
                let lexeme = self.slice();
                return self.make($kind, &lexeme);
            }};
        }
        match c {
            '+' => {
                if self.matches('+') {
                    tok!(TokenKind::PlusPlus)
                }
                tok!(TokenKind::Plus)
            }
            '-' => {
                if self.matches('-') {
                    tok!(TokenKind::MinusMinus)
                }
                tok!(TokenKind::Minus)
            }
            '*' => tok!(TokenKind::Star),
            '/' => tok!(TokenKind::Slash),
            '%' => tok!(TokenKind::Percent),
            '=' => {
                if self.matches('=') {
                    tok!(TokenKind::Eq)
                }
                if self.matches('>') {
                    tok!(TokenKind::FatArrow)
                }
                tok!(TokenKind::Assign)
            }
            '!' => {
                if self.matches('=') {
                    tok!(TokenKind::NotEq)
                }
                tok!(TokenKind::Bang)
            }
            '<' => {
                if self.matches('=') {
                    tok!(TokenKind::Le)
                }
                tok!(TokenKind::Lt)
            }
            '>' => {
                if self.matches('=') {
                    tok!(TokenKind::Ge)
                }
                tok!(TokenKind::Gt)
            }
            '&' => {
                if self.matches('&') {
                    tok!(TokenKind::AndAnd)
                }
                tok!(TokenKind::Amp)
            }
            '|' => {
                if self.matches('|') {
                    tok!(TokenKind::OrOr)
                }
                self.error("unexpected character '|'")
            }
            '(' => tok!(TokenKind::LParen),
            ')' => tok!(TokenKind::RParen),
            '[' => tok!(TokenKind::LBracket),
            ']' => tok!(TokenKind::RBracket),
            '{' => tok!(TokenKind::LBrace),
            '}' => tok!(TokenKind::RBrace),
            ';' => tok!(TokenKind::Semi),
            ':' => tok!(TokenKind::Colon),
            ',' => tok!(TokenKind::Comma),
            '.' => {
                if self.matches('.') {
                    if self.matches('.') {
                        tok!(TokenKind::DotDotDot)
                    }
                    tok!(TokenKind::DotDot)
                }
                tok!(TokenKind::Dot)
            }
            '@' => {
                // `@spawn` marker token for thread-spawn expressions.
                let save = self.current;
                while self.peek().is_alphabetic() {
                    self.advance();
                }
                let word: String = self.source[save..self.current].iter().collect();
                if word == "spawn" {
                    tok!(TokenKind::Spawn)
                }
                self.current = save;
                self.error("unexpected character '@'")
            }
            '#' => {
                // `#include` / `#link` pragmas.
                let save = self.current;
                while self.peek().is_alphabetic() {
                    self.advance();
                }
                let word: String = self.source[save..self.current].iter().collect();
                match word.as_str() {
                    "include" => tok!(TokenKind::Include),
                    "link" => tok!(TokenKind::Link),
                    _ => {
                        self.current = save;
                        self.error("unknown pragma")
                    }
                }
            }
            other => self.error(format!("unexpected character '{other}'")),
        }
    }
}

/// Collect every token from `source`, used by tests and by the
/// token-preservation round-trip property (spec §8).
pub fn tokenize_all(arena: &Arena, source: &str, filename: impl Into<Arc<str>>) -> Vec<Token> {
    let mut lexer = Lexer::new(arena, source, filename);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let arena = Arena::new();
        tokenize_all(&arena, src, "test.sn").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_indent_dedent() {
        let src = "fn main =>\n    var x = 1\n";
        let ks = kinds(src);
        assert_eq!(
            ks,
            vec![
                TokenKind::Fn,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::FatArrow,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_do_not_affect_indent() {
        let src = "fn main =>\n\n    # comment\n    var x = 1\n";
        let ks = kinds(src);
        assert_eq!(ks.iter().filter(|k| **k == TokenKind::Indent).count(), 1);
        assert_eq!(ks.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
    }

    #[test]
    fn crlf_blank_line_does_not_emit_spurious_newline() {
        let lf = kinds("fn main =>\n    var x = 1\n    var y = 2\n");
        let crlf_blank = kinds("fn main =>\r\n    var x = 1\r\n\r\n    var y = 2\r\n");
        assert_eq!(lf, crlf_blank);
    }

    #[test]
    fn mixed_tabs_and_spaces_is_error() {
        let src = "fn main =>\n\t    var x = 1\n";
        let ks = kinds(src);
        assert!(ks.contains(&TokenKind::Error));
    }

    #[test]
    fn nested_dedent_emits_one_per_level() {
        let src = "fn main =>\n    if true =>\n        var x = 1\n    var y = 2\n";
        let ks = kinds(src);
        // One INDENT for `fn` body, one for `if` body, then one DEDENT back
        // out of `if`, and later dedents to close `fn`.
        assert_eq!(ks.iter().filter(|k| **k == TokenKind::Indent).count(), 2);
        assert_eq!(ks.iter().filter(|k| **k == TokenKind::Dedent).count(), 2);
    }

    #[test]
    fn interpolated_string_preserves_braces() {
        let arena = Arena::new();
        let toks = tokenize_all(&arena, r#"$"v={x}!""#, "test.sn");
        let lit = &toks[0];
        assert_eq!(lit.kind, TokenKind::InterpolString);
        match &lit.literal {
            Some(Literal::Str(s)) => assert_eq!(*s, "v={x}!"),
            other => panic!("expected Str literal, got {other:?}"),
        }
    }

    #[test]
    fn nested_string_inside_interpolation_brace() {
        let arena = Arena::new();
        let toks = tokenize_all(&arena, r#"$"a={ "b" }c""#, "test.sn");
        let lit = &toks[0];
        match &lit.literal {
            Some(Literal::Str(s)) => assert_eq!(*s, r#"a={ "b" }c"#),
            other => panic!("expected Str literal, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_error() {
        let ks = kinds("\"abc");
        assert_eq!(ks[0], TokenKind::Error);
    }

    #[test]
    fn empty_char_literal_is_error() {
        let ks = kinds("''");
        assert_eq!(ks[0], TokenKind::Error);
    }

    #[test]
    fn long_and_double_suffixes() {
        let arena = Arena::new();
        let toks = tokenize_all(&arena, "42l 3.14 2.0d", "test.sn");
        assert_eq!(toks[0].kind, TokenKind::Long);
        assert_eq!(toks[1].kind, TokenKind::Double);
        assert_eq!(toks[2].kind, TokenKind::Double);
    }
}
