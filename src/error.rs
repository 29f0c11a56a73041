use std::fmt;

use crate::parser::tokenizer::Span;

/// Kind of parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnterminatedTag,
    UnterminatedString,
    UnterminatedComment,
    UnclosedBlock,
    MismatchedBlock,
    UnexpectedToken,
    InvalidPath,
    InvalidNumber,
    InvalidCharacter,
    DuplicateHashKey,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::UnterminatedTag => "Unterminated tag",
            ParseErrorKind::UnterminatedString => "Unterminated string",
            ParseErrorKind::UnterminatedComment => "Unterminated comment",
            ParseErrorKind::UnclosedBlock => "Unclosed block",
            ParseErrorKind::MismatchedBlock => "Mismatched block close",
            ParseErrorKind::UnexpectedToken => "Unexpected token",
            ParseErrorKind::InvalidPath => "Invalid path",
            ParseErrorKind::InvalidNumber => "Invalid number",
            ParseErrorKind::InvalidCharacter => "Invalid character",
            ParseErrorKind::DuplicateHashKey => "Duplicate hash key",
        }
    }
}

/// Error during parsing. Always carries the byte offset and line of the
/// offending token; parsing stops at the first error, no partial tree is
/// returned.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
    pub related_span: Option<Span>,
    pub related_label: Option<String>,
    pub help: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            related_span: None,
            related_label: None,
            help: None,
        }
    }

    /// Add a related span (e.g. where the unclosed block was opened).
    pub fn with_related(mut self, span: Span) -> Self {
        self.related_span = Some(span);
        self
    }

    /// Set the label for the related span.
    pub fn with_related_label(mut self, label: impl Into<String>) -> Self {
        self.related_label = Some(label.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the error with source context.
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes.
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;36m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::new();
        output.push('\n');

        let line = self.span.start.line + 1;
        let col = self.span.start.col + 1;
        output.push_str(&format!(" {}file:{} {}:{}:{}\n", dim, reset, filename, line, col));
        output.push_str(&format!("{}error:{} {}\n", red, reset, self.message));

        if let Some(source_line) = source.lines().nth(self.span.start.line) {
            let width = line.to_string().len().max(2);
            output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset));
            output.push_str(&format!("{}{:>width$} |{} {}\n", dim, line, reset, source_line));

            let underline_start = self.span.start.col;
            let underline_len = if self.span.end.line == self.span.start.line {
                (self.span.end.col.saturating_sub(self.span.start.col)).max(1)
            } else {
                source_line.len().saturating_sub(underline_start).max(1)
            };
            output.push_str(&format!(
                "{}{:>width$} |{} {}{}{}{}\n",
                dim,
                "",
                reset,
                " ".repeat(underline_start),
                red,
                "^".repeat(underline_len),
                reset,
            ));
        }

        if let Some(related) = &self.related_span {
            let related_line = related.start.line + 1;
            if let Some(source_line) = source.lines().nth(related.start.line) {
                let width = related_line.to_string().len().max(2);
                output.push_str(&format!("{}{:>width$} |{} {}\n", dim, related_line, reset, source_line));
                let underline_start = related.start.col;
                let underline_len = if related.end.line == related.start.line {
                    (related.end.col.saturating_sub(related.start.col)).max(1)
                } else {
                    source_line.len().saturating_sub(underline_start).max(1)
                };
                let label = self.related_label.as_deref().unwrap_or("opened here");
                output.push_str(&format!(
                    "{}{:>width$} |{} {}{}{} {}{}\n",
                    dim,
                    "",
                    reset,
                    " ".repeat(underline_start),
                    dim,
                    "^".repeat(underline_len),
                    label,
                    reset,
                ));
            }
        }

        if let Some(help) = &self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        output.push('\n');
        output
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.span.start.line + 1,
            self.span.start.col + 1,
            self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Kind of evaluation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    UnknownHelper,
    UnknownPartial,
    PartialSyntax,
    HelperArity,
    TypeMismatch,
    TooMuchRecursion,
    InvalidContext,
    Internal,
}

/// Runtime failure during a render. No partial output is emitted: the whole
/// render buffer is discarded when one of these surfaces.
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
    /// Location of the node being evaluated, when one is known.
    pub span: Option<Span>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), span: None }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub(crate) fn helper_arity(name: &str, expected: usize, actual: usize) -> Self {
        EvalError::new(
            EvalErrorKind::HelperArity,
            format!(
                "helper '{}' called with wrong number of arguments, needed {} but got {}",
                name, expected, actual
            ),
        )
    }

    pub(crate) fn unknown_helper(name: &str) -> Self {
        EvalError::new(EvalErrorKind::UnknownHelper, format!("helper not found: '{}'", name))
    }

    pub(crate) fn unknown_partial(name: &str) -> Self {
        EvalError::new(EvalErrorKind::UnknownPartial, format!("partial not found: '{}'", name))
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        EvalError::new(EvalErrorKind::Internal, message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(
                f,
                "evaluation error at line {}, column {}: {}",
                span.start.line + 1,
                span.start.col + 1,
                self.message
            ),
            None => write!(f, "evaluation error: {}", self.message),
        }
    }
}

impl std::error::Error for EvalError {}

/// Invalid registration: duplicate helper or partial name, or an unusable
/// helper shape.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::Position;

    fn span_at(line: usize, col: usize, len: usize) -> Span {
        Span {
            start: Position { byte: 0, line, col },
            end: Position { byte: len, line, col: col + len },
        }
    }

    #[test]
    fn test_render_includes_location_and_carets() {
        let source = "hello {{#if x}\nworld\n";
        let err = ParseError::new(
            ParseErrorKind::UnterminatedTag,
            "this tag is never closed",
            span_at(0, 6, 8),
        )
        .with_help("close the tag with '}}'");

        let rendered = err.render(source, "test.hbs");
        assert!(rendered.contains("test.hbs:1:7"));
        assert!(rendered.contains("error: this tag is never closed"));
        assert!(rendered.contains("^^^^^^^^"));
        assert!(rendered.contains("help: close the tag with '}}'"));
    }

    #[test]
    fn test_helper_arity_message() {
        let err = EvalError::helper_arity("foo", 2, 1);
        let msg = err.to_string();
        assert!(msg.contains("'foo'"));
        assert!(msg.contains("needed 2"));
        assert!(msg.contains("got 1"));
    }
}
