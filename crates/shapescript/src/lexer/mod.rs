//! Source text to token stream (spec §4.1).
//!
//! The lexer never hard-fails: an unrecognized character becomes a [`TokenKind::Unknown`]
//! token and the diagnostic is raised later, at first use, by the parser. That keeps a
//! single error-reporting path for the whole pipeline (spec §4.7, §9 "single-error
//! model").

use std::str::Chars;

use crate::diagnostics::SourceRange;
use crate::value::Color;

/// A keyword recognized by the lexer (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Define,
    Option,
    For,
    In,
    To,
    Step,
    If,
    Else,
    Switch,
    Case,
    And,
    Or,
    Not,
    Import,
}

impl Keyword {
    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "define" => Self::Define,
            "option" => Self::Option,
            "for" => Self::For,
            "in" => Self::In,
            "to" => Self::To,
            "step" => Self::Step,
            "if" => Self::If,
            "else" => Self::Else,
            "switch" => Self::Switch,
            "case" => Self::Case,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "import" => Self::Import,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Define => "define",
            Self::Option => "option",
            Self::For => "for",
            Self::In => "in",
            Self::To => "to",
            Self::Step => "step",
            Self::If => "if",
            Self::Else => "else",
            Self::Switch => "switch",
            Self::Case => "case",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Import => "import",
        }
    }
}

/// Punctuation and operator tokens (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Symbol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Dot => ".",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// One fragment of a (possibly interpolated) string literal.
///
/// `"a\(1 + 1)b"` lexes to `[Literal("a"), Expr(<tokens for `1 + 1`>), Literal("b")]`; the
/// parser turns this into a tuple expression rather than the lexer emitting a flat token
/// stream with fragment markers, which keeps the parser's string-handling in one place
/// (spec §4.1 "emitted as a sequence of string-fragment and expression tokens with an
/// implicit concatenating tuple" — this is the chosen concrete representation of that).
#[derive(Debug, Clone, PartialEq)]
pub enum StringSegment {
    Literal(String),
    Expr(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub segments: Vec<StringSegment>,
}

impl StringLiteral {
    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self.segments.as_slice(), [] | [StringSegment::Literal(_)])
    }

    #[must_use]
    pub fn plain_text(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [] => Some(""),
            [StringSegment::Literal(s)] => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(StringLiteral),
    HexColor(Color),
    Identifier(String),
    Keyword(Keyword),
    Symbol(Symbol),
    Newline,
    Eof,
    /// A character the lexer did not recognize; surfaced as a diagnostic on first use.
    Unknown(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SourceRange,
}

impl Token {
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(n) => format!("number '{n}'"),
            TokenKind::String(_) => "string".to_owned(),
            TokenKind::HexColor(_) => "hex color".to_owned(),
            TokenKind::Identifier(name) => format!("'{name}'"),
            TokenKind::Keyword(kw) => format!("'{}'", kw.as_str()),
            TokenKind::Symbol(sym) => format!("'{}'", sym.as_str()),
            TokenKind::Newline => "end of line".to_owned(),
            TokenKind::Eof => "end of file".to_owned(),
            TokenKind::Unknown(ch) => format!("'{ch}'"),
        }
    }
}

/// Scans a full source string into a flat token stream, stopping at EOF.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            offset: 0,
        }
    }

    #[must_use]
    pub fn tokenize(source: &'a str) -> Vec<Token> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.offset += ch.len_utf8() as u32;
        Some(ch)
    }

    fn next_token(&mut self) -> Token {
        loop {
            match self.peek() {
                Some('\n') => {
                    let start = self.offset;
                    self.bump();
                    return Token {
                        kind: TokenKind::Newline,
                        range: SourceRange::new(start, self.offset),
                    };
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let start = self.offset;
        let Some(ch) = self.peek() else {
            return Token {
                kind: TokenKind::Eof,
                range: SourceRange::new(start, start),
            };
        };

        let kind = match ch {
            '{' => self.single(Symbol::LBrace),
            '}' => self.single(Symbol::RBrace),
            '(' => self.single(Symbol::LParen),
            ')' => self.single(Symbol::RParen),
            '.' if !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.single(Symbol::Dot),
            '+' => self.single(Symbol::Plus),
            '-' => self.single(Symbol::Minus),
            '*' => self.single(Symbol::Star),
            '/' => self.single(Symbol::Slash),
            '%' => self.single(Symbol::Percent),
            '=' => self.single(Symbol::Eq),
            '<' => {
                self.bump();
                match self.peek() {
                    Some('>') => {
                        self.bump();
                        TokenKind::Symbol(Symbol::NotEq)
                    }
                    Some('=') => {
                        self.bump();
                        TokenKind::Symbol(Symbol::Le)
                    }
                    _ => TokenKind::Symbol(Symbol::Lt),
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Symbol(Symbol::Ge)
                } else {
                    TokenKind::Symbol(Symbol::Gt)
                }
            }
            '#' => self.lex_hex_color(),
            '"' => self.lex_string(),
            c if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) => self.lex_number(),
            c if is_identifier_start(c) => self.lex_identifier(),
            other => {
                self.bump();
                TokenKind::Unknown(other)
            }
        };

        Token {
            kind,
            range: SourceRange::new(start, self.offset),
        }
    }

    fn single(&mut self, sym: Symbol) -> TokenKind {
        self.bump();
        TokenKind::Symbol(sym)
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.offset;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else if c == '.' && !seen_dot && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                seen_dot = true;
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.source[start as usize..self.offset as usize];
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.offset;
        while let Some(c) = self.peek() {
            if is_identifier_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.source[start as usize..self.offset as usize];
        Keyword::from_str(text).map_or_else(|| TokenKind::Identifier(text.to_owned()), TokenKind::Keyword)
    }

    fn lex_hex_color(&mut self) -> TokenKind {
        self.bump(); // '#'
        let start = self.offset;
        while let Some(c) = self.peek() {
            if c.is_ascii_hexdigit() {
                self.bump();
            } else {
                break;
            }
        }
        let digits = &self.source[start as usize..self.offset as usize];
        TokenKind::HexColor(parse_hex_color(digits).unwrap_or(Color::CLEAR))
    }

    /// Lexes a double-quoted string, recursively tokenizing `\(...)` interpolations by
    /// scanning for the matching close paren (honoring nested parens and nested strings)
    /// and re-lexing that substring.
    fn lex_string(&mut self) -> TokenKind {
        self.bump(); // opening quote
        let mut segments = Vec::new();
        let mut literal = String::new();

        loop {
            match self.peek() {
                None => break,
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') if self.peek_at(1) == Some('(') => {
                    if !literal.is_empty() {
                        segments.push(StringSegment::Literal(std::mem::take(&mut literal)));
                    }
                    self.bump(); // backslash
                    self.bump(); // (
                    let expr_start = self.offset;
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.peek() {
                            None => break,
                            Some('(') => {
                                depth += 1;
                                self.bump();
                            }
                            Some(')') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                                self.bump();
                            }
                            Some('"') => {
                                // a nested string literal inside the interpolation: skip
                                // it wholesale so its parens don't confuse depth tracking.
                                self.bump();
                                while let Some(c) = self.peek() {
                                    self.bump();
                                    if c == '"' {
                                        break;
                                    }
                                }
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                    let expr_src = &self.source[expr_start as usize..self.offset as usize];
                    segments.push(StringSegment::Expr(Self::tokenize(expr_src)));
                    self.bump(); // closing )
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => literal.push('\n'),
                        Some('t') => literal.push('\t'),
                        Some('"') => literal.push('"'),
                        Some('\\') => literal.push('\\'),
                        Some(other) => literal.push(other),
                        None => {}
                    }
                }
                Some(c) => {
                    literal.push(c);
                    self.bump();
                }
            }
        }

        if !literal.is_empty() || segments.is_empty() {
            segments.push(StringSegment::Literal(literal));
        }
        TokenKind::String(StringLiteral { segments })
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Expands `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA` to a normalized [`Color`] (spec §4.1,
/// §8 "`#F00` and `#FF0000` produce the same color").
fn parse_hex_color(digits: &str) -> Option<Color> {
    fn expand(c: char) -> Option<u8> {
        c.to_digit(16).map(|d| (d * 17) as u8)
    }
    fn pair(s: &str, i: usize) -> Option<u8> {
        u8::from_str_radix(&s[i..i + 2], 16).ok()
    }

    let to_unit = |b: u8| f64::from(b) / 255.0;

    match digits.len() {
        3 => {
            let mut chars = digits.chars();
            let r = expand(chars.next()?)?;
            let g = expand(chars.next()?)?;
            let b = expand(chars.next()?)?;
            Some(Color::opaque(to_unit(r), to_unit(g), to_unit(b)))
        }
        4 => {
            let mut chars = digits.chars();
            let r = expand(chars.next()?)?;
            let g = expand(chars.next()?)?;
            let b = expand(chars.next()?)?;
            let a = expand(chars.next()?)?;
            Some(Color::new(to_unit(r), to_unit(g), to_unit(b), to_unit(a)))
        }
        6 => Some(Color::opaque(to_unit(pair(digits, 0)?), to_unit(pair(digits, 2)?), to_unit(pair(digits, 4)?))),
        8 => Some(Color::new(
            to_unit(pair(digits, 0)?),
            to_unit(pair(digits, 2)?),
            to_unit(pair(digits, 4)?),
            to_unit(pair(digits, 6)?),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_number_and_identifier() {
        let kinds = kinds("sphere 1.5");
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier("sphere".to_owned()), TokenKind::Number(1.5), TokenKind::Eof]
        );
    }

    #[test]
    fn recognizes_keywords() {
        let kinds = kinds("for i in 1 to 3");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::For),
                TokenKind::Identifier("i".to_owned()),
                TokenKind::Keyword(Keyword::In),
                TokenKind::Number(1.0),
                TokenKind::Keyword(Keyword::To),
                TokenKind::Number(3.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn not_equal_is_two_chars() {
        assert_eq!(kinds("<>"), vec![TokenKind::Symbol(Symbol::NotEq), TokenKind::Eof]);
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            kinds("< <= > >="),
            vec![
                TokenKind::Symbol(Symbol::Lt),
                TokenKind::Symbol(Symbol::Le),
                TokenKind::Symbol(Symbol::Gt),
                TokenKind::Symbol(Symbol::Ge),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_is_skipped() {
        assert_eq!(kinds("1 // comment\n2"), vec![TokenKind::Number(1.0), TokenKind::Newline, TokenKind::Number(2.0), TokenKind::Eof]);
    }

    #[test]
    fn hex_color_three_and_six_digit_agree() {
        let short = kinds("#F00");
        let long = kinds("#FF0000");
        assert_eq!(short, long);
    }

    #[test]
    fn hex_color_with_alpha() {
        match &kinds("#FF000080")[0] {
            TokenKind::HexColor(c) => {
                assert!((c.a - 128.0 / 255.0).abs() < 1e-9);
            }
            other => panic!("expected hex color, got {other:?}"),
        }
    }

    #[test]
    fn plain_string_has_one_literal_segment() {
        let kinds = kinds(r#""hello""#);
        match &kinds[0] {
            TokenKind::String(lit) => assert_eq!(lit.plain_text(), Some("hello")),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn string_escapes_are_decoded() {
        let kinds = kinds(r#""a\nb""#);
        match &kinds[0] {
            TokenKind::String(lit) => assert_eq!(lit.plain_text(), Some("a\nb")),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn interpolated_string_splits_into_segments() {
        let kinds = kinds(r#""a\(1 + 1)b""#);
        match &kinds[0] {
            TokenKind::String(lit) => {
                assert_eq!(lit.segments.len(), 3);
                assert_eq!(lit.segments[0], StringSegment::Literal("a".to_owned()));
                assert!(matches!(lit.segments[1], StringSegment::Expr(_)));
                assert_eq!(lit.segments[2], StringSegment::Literal("b".to_owned()));
            }
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn unknown_character_does_not_panic() {
        let kinds = kinds("@");
        assert_eq!(kinds, vec![TokenKind::Unknown('@'), TokenKind::Eof]);
    }

    #[test]
    fn member_dot_is_not_confused_with_decimal_point() {
        assert_eq!(kinds("v.x"), vec![
            TokenKind::Identifier("v".to_owned()),
            TokenKind::Symbol(Symbol::Dot),
            TokenKind::Identifier("x".to_owned()),
            TokenKind::Eof,
        ]);
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5), TokenKind::Eof]);
    }
}
