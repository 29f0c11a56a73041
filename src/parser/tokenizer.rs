use serde::Serialize;

use crate::error::{ParseError, ParseErrorKind};

/// Position in source (byte offset, 0-indexed line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Byte offset in source
    pub byte: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub col: usize,
}

impl Position {
    pub fn new() -> Self {
        Self { byte: 0, line: 0, col: 0 }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

/// Span in source (a range from start position to end position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// What a `{{` opener introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{{expr}}`
    Mustache,
    /// `{{{expr}}}`, unescaped
    Raw,
    /// `{{& expr}}`, unescaped with a double-brace close
    Amp,
    /// `{{#expr}}`
    Block,
    /// `{{^expr}}` or bare `{{^}}`
    Inverse,
    /// `{{/expr}}`
    Close,
    /// `{{> name}}`
    Partial,
}

/// Tokens produced by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text between tags
    Content { text: String, span: Span },
    /// Entire `{{!...}}` / `{{!-- ... --}}` tag, with its `~` markers
    Comment { text: String, open_strip: bool, close_strip: bool, span: Span },
    /// `{{`-family opener; `strip` records a `~` right after the braces
    OpenTag { kind: TagKind, strip: bool, span: Span },
    /// `}}` or `}}}`; `strip` records a `~` right before the braces
    CloseTag { raw: bool, strip: bool, span: Span },
    /// Path segment or helper name; `original` keeps `[...]` quoting
    Ident { name: String, original: String, span: Span },
    /// `@` introducing a private-data path
    At { span: Span },
    /// `"..."` or `'...'`
    StringLit { value: String, span: Span },
    /// `-?[0-9]+(\.[0-9]+)?`
    NumberLit { value: f64, is_int: bool, original: String, span: Span },
    /// `true` / `false`
    BoolLit { value: bool, span: Span },
    /// `.` or `/` between path segments
    Sep { ch: char, span: Span },
    /// `(` opening a sub-expression
    OpenParen { span: Span },
    /// `)`
    CloseParen { span: Span },
    /// `=` between a hash key and its value
    Equals { span: Span },
    /// `|` delimiting block parameters
    Pipe { span: Span },
    /// End of input
    Eof { position: Position },
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::Content { span, .. } => *span,
            Token::Comment { span, .. } => *span,
            Token::OpenTag { span, .. } => *span,
            Token::CloseTag { span, .. } => *span,
            Token::Ident { span, .. } => *span,
            Token::At { span } => *span,
            Token::StringLit { span, .. } => *span,
            Token::NumberLit { span, .. } => *span,
            Token::BoolLit { span, .. } => *span,
            Token::Sep { span, .. } => *span,
            Token::OpenParen { span } => *span,
            Token::CloseParen { span } => *span,
            Token::Equals { span } => *span,
            Token::Pipe { span } => *span,
            Token::Eof { position } => Span { start: *position, end: *position },
        }
    }
}

/// Characters that terminate an identifier inside a tag.
fn is_ident_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '!' | '"'
                | '#'
                | '%'
                | '&'
                | '\''
                | '('
                | ')'
                | '*'
                | '+'
                | ','
                | '.'
                | '/'
                | ';'
                | '<'
                | '='
                | '>'
                | '@'
                | '['
                | '\\'
                | ']'
                | '^'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// Scanner for template source.
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: Position,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, bytes: source.as_bytes(), position: Position::new() }
    }

    /// Tokenize the entire source.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while !self.at_eof() {
            self.scan_content(&mut tokens);
            if self.at_eof() {
                break;
            }
            // Positioned at "{{"
            self.scan_tag(&mut tokens)?;
        }

        tokens.push(Token::Eof { position: self.position });
        Ok(tokens)
    }

    // === Content ===

    fn scan_content(&mut self, tokens: &mut Vec<Token>) {
        let start = self.position;
        let rest = &self.source[self.position.byte..];
        let end_rel = rest.find("{{").unwrap_or(rest.len());
        if end_rel == 0 {
            return;
        }

        let text = rest[..end_rel].to_string();
        self.advance_bytes(end_rel);
        tokens.push(Token::Content { text, span: Span { start, end: self.position } });
    }

    // === Tags ===

    fn scan_tag(&mut self, tokens: &mut Vec<Token>) -> Result<(), ParseError> {
        let open_start = self.position;
        self.advance_str("{{");

        let mut strip = false;
        if self.peek() == Some('~') {
            strip = true;
            self.advance();
        }

        let kind = match self.peek() {
            Some('{') => {
                self.advance();
                TagKind::Raw
            }
            Some('#') => {
                self.advance();
                TagKind::Block
            }
            Some('/') => {
                self.advance();
                TagKind::Close
            }
            Some('^') => {
                self.advance();
                TagKind::Inverse
            }
            Some('>') => {
                self.advance();
                TagKind::Partial
            }
            Some('&') => {
                self.advance();
                TagKind::Amp
            }
            Some('!') => {
                self.advance();
                return self.scan_comment(tokens, open_start, strip);
            }
            _ => TagKind::Mustache,
        };

        let open_span = Span { start: open_start, end: self.position };
        tokens.push(Token::OpenTag { kind, strip, span: open_span });

        self.scan_tag_interior(tokens, kind == TagKind::Raw, open_span)
    }

    fn scan_comment(
        &mut self,
        tokens: &mut Vec<Token>,
        open_start: Position,
        open_strip: bool,
    ) -> Result<(), ParseError> {
        let long_form = self.rest().starts_with("--");
        if long_form {
            self.advance_str("--");
        }

        let body_start = self.position.byte;
        let terminator = if long_form { "--" } else { "" };

        // Find `--}}` / `--~}}` for the long form, `}}` / `~}}` otherwise.
        let mut search = body_start;
        loop {
            let rest = &self.source[search..];
            let rel = match rest.find(terminator).filter(|_| long_form) {
                Some(rel) if long_form => rel,
                _ if long_form => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedComment,
                        "this comment is never closed",
                        Span { start: open_start, end: self.position },
                    )
                    .with_help("close the comment with '--}}'"));
                }
                _ => 0,
            };

            if long_form {
                let after = &rest[rel + 2..];
                let close_strip = after.starts_with("~}}");
                if close_strip || after.starts_with("}}") {
                    let text = self.source[body_start..search + rel].to_string();
                    let consumed = (search + rel - self.position.byte)
                        + 2
                        + if close_strip { 3 } else { 2 };
                    self.advance_bytes(consumed);
                    tokens.push(Token::Comment {
                        text,
                        open_strip,
                        close_strip,
                        span: Span { start: open_start, end: self.position },
                    });
                    return Ok(());
                }
                // A `--` not followed by `}}`; keep searching past it.
                search += rel + 2;
                continue;
            }

            // Short form: body runs to the first `}}`.
            let close_rel = rest.find("}}").ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::UnterminatedComment,
                    "this comment is never closed",
                    Span { start: open_start, end: self.position },
                )
                .with_help("close the comment with '}}'")
            })?;

            let mut body_end = search + close_rel;
            let close_strip = body_end > body_start && self.bytes[body_end - 1] == b'~';
            if close_strip {
                body_end -= 1;
            }
            let text = self.source[body_start..body_end].to_string();
            let consumed = (search + close_rel + 2) - self.position.byte;
            self.advance_bytes(consumed);
            tokens.push(Token::Comment {
                text,
                open_strip,
                close_strip,
                span: Span { start: open_start, end: self.position },
            });
            return Ok(());
        }
    }

    fn scan_tag_interior(
        &mut self,
        tokens: &mut Vec<Token>,
        raw: bool,
        open_span: Span,
    ) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();

            let start = self.position;
            let Some(c) = self.peek() else {
                return Err(ParseError::new(
                    ParseErrorKind::UnterminatedTag,
                    "this tag is never closed",
                    Span { start: self.position, end: self.position },
                )
                .with_related(open_span)
                .with_help(if raw { "close the tag with '}}}'" } else { "close the tag with '}}'" }));
            };

            match c {
                '~' if self.rest()[1..].starts_with("}}") => {
                    self.advance();
                    self.scan_close(tokens, raw, start, true, open_span)?;
                    return Ok(());
                }
                '}' => {
                    self.scan_close(tokens, raw, start, false, open_span)?;
                    return Ok(());
                }
                '(' => {
                    self.advance();
                    tokens.push(Token::OpenParen { span: Span { start, end: self.position } });
                }
                ')' => {
                    self.advance();
                    tokens.push(Token::CloseParen { span: Span { start, end: self.position } });
                }
                '=' => {
                    self.advance();
                    tokens.push(Token::Equals { span: Span { start, end: self.position } });
                }
                '|' => {
                    self.advance();
                    tokens.push(Token::Pipe { span: Span { start, end: self.position } });
                }
                '@' => {
                    self.advance();
                    tokens.push(Token::At { span: Span { start, end: self.position } });
                }
                '"' | '\'' => {
                    tokens.push(self.scan_string(c)?);
                }
                '[' => {
                    tokens.push(self.scan_bracket_segment()?);
                }
                '.' => {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        tokens.push(Token::Ident {
                            name: "..".to_string(),
                            original: "..".to_string(),
                            span: Span { start, end: self.position },
                        });
                    } else if self.prev_is_path_piece(tokens, start) {
                        // A dot between segments is just a separator.
                        tokens.push(Token::Sep { ch: '.', span: Span { start, end: self.position } });
                    } else if self.peek().map(is_ident_char).unwrap_or(false)
                        || matches!(self.peek(), Some('[') | Some('@'))
                    {
                        // Path-initial `.foo` is a scoped path: emit the lone
                        // dot, then the separator the grammar implies.
                        tokens.push(Token::Ident {
                            name: ".".to_string(),
                            original: ".".to_string(),
                            span: Span { start, end: self.position },
                        });
                        tokens.push(Token::Sep { ch: '.', span: Span { start, end: self.position } });
                    } else {
                        tokens.push(Token::Ident {
                            name: ".".to_string(),
                            original: ".".to_string(),
                            span: Span { start, end: self.position },
                        });
                    }
                }
                '/' => {
                    self.advance();
                    tokens.push(Token::Sep { ch: '/', span: Span { start, end: self.position } });
                }
                // After a separator a digit run is a path segment (`xs.1`),
                // not a number literal.
                '-' | '0'..='9' if !matches!(tokens.last(), Some(Token::Sep { .. })) => {
                    tokens.push(self.scan_number()?);
                }
                c if is_ident_char(c) => {
                    let ident = self.scan_ident();
                    let span = Span { start, end: self.position };
                    let after_sep = matches!(tokens.last(), Some(Token::Sep { .. }));
                    match ident.as_str() {
                        "true" if !after_sep => tokens.push(Token::BoolLit { value: true, span }),
                        "false" if !after_sep => tokens.push(Token::BoolLit { value: false, span }),
                        _ => tokens.push(Token::Ident { name: ident.clone(), original: ident, span }),
                    }
                }
                c => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidCharacter,
                        format!("unexpected character '{}' inside tag", c),
                        Span { start, end: start },
                    ));
                }
            }
        }
    }

    fn scan_close(
        &mut self,
        tokens: &mut Vec<Token>,
        raw: bool,
        start: Position,
        strip: bool,
        open_span: Span,
    ) -> Result<(), ParseError> {
        let expected = if raw { "}}}" } else { "}}" };
        if !self.rest().starts_with(expected) {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedTag,
                format!("expected '{}' to close this tag", expected),
                Span { start: self.position, end: self.position },
            )
            .with_related(open_span));
        }
        self.advance_str(expected);
        tokens.push(Token::CloseTag { raw, strip, span: Span { start, end: self.position } });
        Ok(())
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, ParseError> {
        let start = self.position;
        self.advance();

        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        "this string is never closed",
                        Span { start, end: self.position },
                    ));
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some(escaped) => {
                            value.push(escaped);
                            self.advance();
                        }
                        None => {
                            return Err(ParseError::new(
                                ParseErrorKind::UnterminatedString,
                                "this string is never closed",
                                Span { start, end: self.position },
                            ));
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::StringLit {
                        value,
                        span: Span { start, end: self.position },
                    });
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_bracket_segment(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.advance();

        let body_start = self.position.byte;
        while let Some(c) = self.peek() {
            if c == ']' {
                let name = self.source[body_start..self.position.byte].to_string();
                self.advance();
                return Ok(Token::Ident {
                    original: format!("[{}]", name),
                    name,
                    span: Span { start, end: self.position },
                });
            }
            self.advance();
        }

        Err(ParseError::new(
            ParseErrorKind::InvalidPath,
            "this '[' segment is never closed",
            Span { start, end: self.position },
        )
        .with_help("close the segment with ']'"))
    }

    fn scan_number(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        let number_start = self.position.byte;

        if self.peek() == Some('-') {
            self.advance();
        }
        let mut digits = 0;
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
            digits += 1;
        }
        let mut is_int = true;
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9')) {
            is_int = false;
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }

        let original = self.source[number_start..self.position.byte].to_string();
        let span = Span { start, end: self.position };

        if digits == 0 || self.peek().map(is_ident_char).unwrap_or(false) {
            return Err(ParseError::new(
                ParseErrorKind::InvalidNumber,
                format!("invalid number literal '{}'", original),
                span,
            ));
        }

        let value = original.parse::<f64>().map_err(|_| {
            ParseError::new(
                ParseErrorKind::InvalidNumber,
                format!("invalid number literal '{}'", original),
                span,
            )
        })?;

        Ok(Token::NumberLit { value, is_int, original, span })
    }

    fn scan_ident(&mut self) -> String {
        let start = self.position.byte;
        while self.peek().map(is_ident_char).unwrap_or(false) {
            self.advance();
        }
        self.source[start..self.position.byte].to_string()
    }

    // === Cursor helpers ===

    fn at_eof(&self) -> bool {
        self.position.byte >= self.bytes.len()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position.byte..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    /// True when the previous token can end a path (so a `.` after it is a
    /// separator, not a `this` reference).
    /// True when the token before `at` can continue a path, with nothing
    /// (not even whitespace) between it and `at`. A space before the dot
    /// starts a fresh param instead, as in `{{helper .foo}}`.
    fn prev_is_path_piece(&self, tokens: &[Token], at: Position) -> bool {
        match tokens.last() {
            Some(Token::Ident { span, .. }) | Some(Token::At { span }) => span.end.byte == at.byte,
            _ => false,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position.byte += c.len_utf8();
            if c == '\n' {
                self.position.line += 1;
                self.position.col = 0;
            } else {
                self.position.col += 1;
            }
        }
    }

    /// Advance over a known ASCII prefix.
    fn advance_str(&mut self, s: &str) {
        for _ in 0..s.len() {
            self.advance();
        }
    }

    /// Advance by `n` bytes, tracking lines and columns.
    fn advance_bytes(&mut self, n: usize) {
        let target = self.position.byte + n;
        while self.position.byte < target {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        Tokenizer::new(source).tokenize().unwrap()
    }

    #[test]
    fn test_content_and_mustache() {
        let tokens = tokenize("Hello {{name}}!");
        assert!(matches!(&tokens[0], Token::Content { text, .. } if text == "Hello "));
        assert!(matches!(&tokens[1], Token::OpenTag { kind: TagKind::Mustache, strip: false, .. }));
        assert!(matches!(&tokens[2], Token::Ident { name, .. } if name == "name"));
        assert!(matches!(&tokens[3], Token::CloseTag { raw: false, strip: false, .. }));
        assert!(matches!(&tokens[4], Token::Content { text, .. } if text == "!"));
        assert!(matches!(&tokens[5], Token::Eof { .. }));
    }

    #[test]
    fn test_raw_mustache() {
        let tokens = tokenize("{{{body}}}");
        assert!(matches!(&tokens[0], Token::OpenTag { kind: TagKind::Raw, .. }));
        assert!(matches!(&tokens[2], Token::CloseTag { raw: true, .. }));
    }

    #[test]
    fn test_amp_mustache() {
        let tokens = tokenize("{{& body}}");
        assert!(matches!(&tokens[0], Token::OpenTag { kind: TagKind::Amp, .. }));
        assert!(matches!(&tokens[2], Token::CloseTag { raw: false, .. }));
    }

    #[test]
    fn test_strip_markers() {
        let tokens = tokenize("{{~#if x~}}");
        assert!(matches!(&tokens[0], Token::OpenTag { kind: TagKind::Block, strip: true, .. }));
        assert!(matches!(tokens.last().unwrap(), Token::Eof { .. }));
        assert!(matches!(&tokens[2], Token::Ident { name, .. } if name == "x"));
        assert!(matches!(&tokens[3], Token::CloseTag { strip: true, .. }));
    }

    #[test]
    fn test_block_and_close_tags() {
        let tokens = tokenize("{{#each items}}{{/each}}");
        assert!(matches!(&tokens[0], Token::OpenTag { kind: TagKind::Block, .. }));
        assert!(matches!(&tokens[4], Token::OpenTag { kind: TagKind::Close, .. }));
    }

    #[test]
    fn test_path_separators() {
        let tokens = tokenize("{{a.b/c}}");
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == "a"));
        assert!(matches!(&tokens[2], Token::Sep { ch: '.', .. }));
        assert!(matches!(&tokens[3], Token::Ident { name, .. } if name == "b"));
        assert!(matches!(&tokens[4], Token::Sep { ch: '/', .. }));
        assert!(matches!(&tokens[5], Token::Ident { name, .. } if name == "c"));
    }

    #[test]
    fn test_multi_segment_path() {
        let tokens = tokenize("{{a.b.c}}");
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == "a"));
        assert!(matches!(&tokens[2], Token::Sep { ch: '.', .. }));
        assert!(matches!(&tokens[3], Token::Ident { name, .. } if name == "b"));
        assert!(matches!(&tokens[4], Token::Sep { ch: '.', .. }));
        assert!(matches!(&tokens[5], Token::Ident { name, .. } if name == "c"));
        assert!(matches!(&tokens[6], Token::CloseTag { .. }));
    }

    #[test]
    fn test_data_path_with_field() {
        let tokens = tokenize("{{@root.name}}");
        assert!(matches!(&tokens[1], Token::At { .. }));
        assert!(matches!(&tokens[2], Token::Ident { name, .. } if name == "root"));
        assert!(matches!(&tokens[3], Token::Sep { ch: '.', .. }));
        assert!(matches!(&tokens[4], Token::Ident { name, .. } if name == "name"));
    }

    #[test]
    fn test_spaced_dot_starts_a_param() {
        // `helper .foo` is a call with a scoped-path param, not `helper.foo`.
        let tokens = tokenize("{{helper .foo}}");
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == "helper"));
        assert!(matches!(&tokens[2], Token::Ident { name, .. } if name == "."));
        assert!(matches!(&tokens[3], Token::Sep { ch: '.', .. }));
        assert!(matches!(&tokens[4], Token::Ident { name, .. } if name == "foo"));
    }

    #[test]
    fn test_parent_path() {
        let tokens = tokenize("{{../x}}");
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == ".."));
        assert!(matches!(&tokens[2], Token::Sep { ch: '/', .. }));
        assert!(matches!(&tokens[3], Token::Ident { name, .. } if name == "x"));
    }

    #[test]
    fn test_this_dot() {
        let tokens = tokenize("{{.}}");
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == "."));
        assert!(matches!(&tokens[2], Token::CloseTag { .. }));

        let tokens = tokenize("{{./name}}");
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == "."));
        assert!(matches!(&tokens[2], Token::Sep { .. }));
    }

    #[test]
    fn test_data_path() {
        let tokens = tokenize("{{@index}}");
        assert!(matches!(&tokens[1], Token::At { .. }));
        assert!(matches!(&tokens[2], Token::Ident { name, .. } if name == "index"));
    }

    #[test]
    fn test_literals() {
        let tokens = tokenize(r#"{{foo "bar" 12 -1.5 true}}"#);
        assert!(matches!(&tokens[2], Token::StringLit { value, .. } if value == "bar"));
        assert!(
            matches!(&tokens[3], Token::NumberLit { value, is_int: true, original, .. }
                if *value == 12.0 && original == "12")
        );
        assert!(
            matches!(&tokens[4], Token::NumberLit { value, is_int: false, .. } if *value == -1.5)
        );
        assert!(matches!(&tokens[5], Token::BoolLit { value: true, .. }));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#"{{foo "a\"b"}}"#);
        assert!(matches!(&tokens[2], Token::StringLit { value, .. } if value == "a\"b"));
    }

    #[test]
    fn test_bracket_segment() {
        let tokens = tokenize("{{a.[foo bar].b}}");
        assert!(
            matches!(&tokens[3], Token::Ident { name, original, .. }
                if name == "foo bar" && original == "[foo bar]")
        );
    }

    #[test]
    fn test_hash_and_subexpression() {
        let tokens = tokenize("{{helper (inner x) key=1}}");
        assert!(matches!(&tokens[2], Token::OpenParen { .. }));
        assert!(matches!(&tokens[5], Token::CloseParen { .. }));
        assert!(matches!(&tokens[6], Token::Ident { name, .. } if name == "key"));
        assert!(matches!(&tokens[7], Token::Equals { .. }));
    }

    #[test]
    fn test_block_params() {
        let tokens = tokenize("{{#each items as |item i|}}");
        assert!(matches!(&tokens[3], Token::Ident { name, .. } if name == "as"));
        assert!(matches!(&tokens[4], Token::Pipe { .. }));
        assert!(matches!(&tokens[5], Token::Ident { name, .. } if name == "item"));
        assert!(matches!(&tokens[6], Token::Ident { name, .. } if name == "i"));
        assert!(matches!(&tokens[7], Token::Pipe { .. }));
    }

    #[test]
    fn test_comments() {
        let tokens = tokenize("a{{! simple }}b{{!-- long --}}c");
        assert!(matches!(&tokens[1], Token::Comment { text, .. } if text == " simple "));
        assert!(matches!(&tokens[3], Token::Comment { text, .. } if text == " long "));

        let tokens = tokenize("{{~! c ~}}");
        assert!(
            matches!(&tokens[0], Token::Comment { open_strip: true, close_strip: true, text, .. }
                if text == " c ")
        );
    }

    #[test]
    fn test_line_tracking() {
        let tokens = tokenize("line1\nline2 {{x}}");
        let Token::OpenTag { span, .. } = &tokens[1] else { panic!("expected OpenTag") };
        assert_eq!(span.start.line, 1);
        assert_eq!(span.start.col, 6);
    }

    #[test]
    fn test_unterminated_tag() {
        let err = Tokenizer::new("{{foo").tokenize().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedTag);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Tokenizer::new(r#"{{foo "bar}}"#).tokenize().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString);
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Tokenizer::new("{{!-- nope }}").tokenize().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_raw_close_mismatch() {
        let err = Tokenizer::new("{{{foo}}").tokenize().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedTag);
    }
}
