//! The single error type shared by the lexer, parser, and evaluator.
//!
//! ShapeScript has no user-level `try`/`catch` — every error is fatal to the statement
//! that produced it and bubbles straight to the program root (spec §7). That lets the
//! whole pipeline share one error enum instead of a per-stage error hierarchy.

use std::fmt;

use crate::value::Type;

/// A half-open byte range into the original source text.
///
/// Every AST node and token carries one of these (spec invariant I1). Line/column are
/// derived lazily from a [`LineIndex`] only when a report needs to be rendered, so the
/// hot lexer/parser/evaluator paths never pay for position bookkeeping they don't use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub start: u32,
    pub end: u32,
}

impl SourceRange {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn empty_at(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub fn join(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Maps byte offsets to 1-based line/column pairs.
///
/// Built once per source file and reused by every diagnostic rendered against it.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line. Always starts with `0`.
    line_starts: Vec<u32>,
    source_len: u32,
}

impl LineIndex {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, ch) in source.char_indices() {
            if ch == '\n' {
                // Safe cast: sources larger than u32::MAX bytes are not supported.
                line_starts.push((offset + 1) as u32);
            }
        }
        Self {
            line_starts,
            source_len: source.len() as u32,
        }
    }

    /// Returns the 1-based `(line, column)` for a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_at) => insert_at.saturating_sub(1),
        };
        let col = offset - self.line_starts[line];
        (line as u32 + 1, col + 1)
    }
}

/// One error type for the lexer, parser, and evaluator (spec §4.7, §7).
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeError {
    pub range: SourceRange,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // --- parser errors ---
    UnexpectedToken { actual: String, expected: String },
    UnmatchedBrace,
    UnknownOperator(String),
    DuplicateParameter(String),

    // --- evaluator errors ---
    UnknownSymbol { name: String, suggestion: Option<String> },
    UnknownMember { name: String, of: Type, suggestion: Option<String> },
    MissingArgument { for_: String, index: usize, expected: String },
    UnexpectedArgument { for_: String, max: usize },
    TypeMismatch { for_: String, index: Option<usize>, expected: String, got: Type },
    AssertionFailure(String),
    FileNotFound(String),
    FileAccessRestricted(String),
    UnknownFont { name: String, suggestion: Option<String> },
    UnusedValue(Type),
    ForwardReference(String),
    TooMuchRecursion,
    Cancelled,
    ContextNotAllowed { name: String, context: &'static str, suggestion: Option<String> },
    NotAvailableInContext { name: String, suggestion: Option<String> },
    ImportCycle(String),
    StepMustBeNonzero,
}

impl ShapeError {
    #[must_use]
    pub fn new(range: SourceRange, kind: ErrorKind) -> Self {
        Self { range, kind }
    }

    /// One-line human message, without hint or source excerpt.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.message()
    }

    /// An optional multi-sentence hint (spec §4.7).
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        self.kind.hint()
    }

    /// Renders `path:line:column: message`, a caret under the offending range, and an
    /// optional hint/suggestion line — the report format the bundled CLI prints to
    /// stderr (spec §6).
    #[must_use]
    pub fn to_report(&self, source: &str, path: &str) -> String {
        let index = LineIndex::new(source);
        let (line, col) = index.line_col(self.range.start);
        let mut out = format!("{path}:{line}:{col}: {}\n", self.message());

        if let Some(source_line) = source.lines().nth(line as usize - 1) {
            out.push_str(source_line);
            out.push('\n');
            for _ in 1..col {
                out.push(' ');
            }
            out.push('^');
            out.push('\n');
        }

        if let Some(hint) = self.hint() {
            out.push_str(&hint);
            out.push('\n');
        }
        if let Some(suggestion) = self.kind.suggestion() {
            out.push_str(&format!("Did you mean '{suggestion}'?\n"));
        }
        out
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ShapeError {}

impl ErrorKind {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnexpectedToken { actual, expected } => {
                format!("Unexpected token '{actual}', expected {expected}")
            }
            Self::UnmatchedBrace => "Unmatched brace".to_owned(),
            Self::UnknownOperator(op) => format!("Unknown operator '{op}'"),
            Self::DuplicateParameter(name) => format!("Duplicate parameter '{name}'"),
            Self::UnknownSymbol { name, .. } => format!("Unknown symbol '{name}'"),
            Self::UnknownMember { name, of, .. } => format!("Unknown member property '{name}' of {of}"),
            Self::MissingArgument { for_, index, expected } => {
                format!("Missing argument for '{for_}' at index {index}, expected {expected}")
            }
            Self::UnexpectedArgument { for_, max } => {
                format!("Unexpected argument for '{for_}', expected at most {max} argument(s)")
            }
            Self::TypeMismatch { for_, index, expected, got } => match index {
                Some(index) => format!("Type mismatch for '{for_}' at index {index}: expected {expected}, got {got}"),
                None => format!("Type mismatch for '{for_}': expected {expected}, got {got}"),
            },
            Self::AssertionFailure(msg) => msg.clone(),
            Self::FileNotFound(name) => format!("File not found: '{name}'"),
            Self::FileAccessRestricted(name) => format!("Unable to access file '{name}'"),
            Self::UnknownFont { name, .. } => format!("Unknown font '{name}'"),
            Self::UnusedValue(type_) => format!("Result of type {type_} is unused"),
            Self::ForwardReference(name) => format!("Forward reference to '{name}'"),
            Self::TooMuchRecursion => "Too much recursion".to_owned(),
            Self::Cancelled => "Evaluation was cancelled".to_owned(),
            Self::ContextNotAllowed { name, context, .. } => {
                format!("'{name}' is not available in this context ({context})")
            }
            Self::NotAvailableInContext { name, .. } => format!("'{name}' is not available in this context"),
            Self::ImportCycle(name) => format!("Circular import of '{name}'"),
            Self::StepMustBeNonzero => "Step value must be nonzero".to_owned(),
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MissingArgument { for_, expected, .. } => {
                Some(format!("'{for_}' requires {expected}. Check the argument count and try again."))
            }
            Self::TypeMismatch { expected, got, .. } => Some(format!(
                "Expected a value coercible to {expected} but received {got}, which cannot be converted."
            )),
            Self::ContextNotAllowed { name, context, .. } => Some(format!(
                "'{name}' can only be used where {context} geometry is being produced."
            )),
            Self::ImportCycle(name) => Some(format!(
                "'{name}' is already being imported further up the import chain."
            )),
            _ => None,
        }
    }

    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnknownSymbol { suggestion, .. }
            | Self::UnknownMember { suggestion, .. }
            | Self::UnknownFont { suggestion, .. }
            | Self::ContextNotAllowed { suggestion, .. }
            | Self::NotAvailableInContext { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

/// Computes the Levenshtein edit distance between two strings.
///
/// Used to power the "Did you mean '...'?" suggestions (spec §4.6, §4.7): a match is
/// offered when the distance is at most `ceil(len / 3)` against the set of names
/// visible in scope.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Finds the closest candidate name to `name`, if any candidate is within the
/// case-sensitive edit-distance threshold `ceil(len(name) / 3)` (spec §4.7).
#[must_use]
pub fn suggest_name<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let max_distance = name.chars().count().div_ceil(3).max(1);
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        if candidate == name {
            continue;
        }
        let dist = levenshtein(name, candidate);
        if dist <= max_distance && best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((candidate, dist));
        }
    }
    best.map(|(name, _)| name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn levenshtein_identical() {
        assert_eq!(levenshtein("sphere", "sphere"), 0);
    }

    #[test]
    fn levenshtein_one_typo() {
        assert_eq!(levenshtein("shpere", "sphere"), 2);
    }

    #[test]
    fn suggest_name_finds_close_match() {
        let candidates = ["sphere", "cube", "cylinder"];
        assert_eq!(suggest_name("spehre", candidates), Some("sphere".to_owned()));
    }

    #[test]
    fn suggest_name_no_match_when_too_far() {
        let candidates = ["sphere", "cube", "cylinder"];
        assert_eq!(suggest_name("xyz", candidates), None);
    }

    #[test]
    fn line_index_basic() {
        let index = LineIndex::new("abc\ndef\nghi");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(4), (2, 1));
        assert_eq!(index.line_col(9), (3, 2));
    }

    #[test]
    fn to_report_includes_caret() {
        let source = "sphere extrude\n";
        let err = ShapeError::new(
            SourceRange::new(7, 14),
            ErrorKind::TypeMismatch {
                for_: "extrude".to_owned(),
                index: None,
                expected: "path or block".to_owned(),
                got: Type::Mesh,
            },
        );
        let report = err.to_report(source, "test.shape");
        assert!(report.starts_with("test.shape:1:8:"));
        assert!(report.contains('^'));
    }
}
