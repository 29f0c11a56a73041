use crate::ast::{
    Block, BooleanLiteral, Comment, Content, Expression, Hash, HashPair, Mustache, Node,
    NumberLiteral, Param, Partial, PartialName, PathExpression, Program, StringLiteral,
    SubExpression,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::parser::tokenizer::{Position, Span, TagKind, Token};

use crate::ast::Strip;

/// Builds the syntax tree from the token stream. Single pass, no lookahead
/// beyond two tokens; stops at the first error.
pub struct TreeBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl TreeBuilder {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn build(mut self) -> Result<Program, ParseError> {
        let program = self.parse_program(Vec::new(), false)?;

        match self.peek() {
            Token::Eof { .. } => Ok(program),
            Token::OpenTag { kind: TagKind::Close, span, .. } => Err(ParseError::new(
                ParseErrorKind::MismatchedBlock,
                "closing tag with no open block",
                *span,
            )),
            token => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("unexpected {}", describe(token)),
                token.span(),
            )),
        }
    }

    // === Programs ===

    /// Parses statements until end of input, a closing tag, or an `{{else}}`
    /// marker. Terminators are left for the caller.
    fn parse_program(
        &mut self,
        block_params: Vec<String>,
        in_block: bool,
    ) -> Result<Program, ParseError> {
        let start = self.peek().span().start;
        let mut body: Vec<Node> = Vec::new();

        loop {
            if in_block && self.at_else() {
                break;
            }

            match self.peek().clone() {
                Token::Eof { .. } => break,
                Token::OpenTag { kind: TagKind::Close, .. } => break,
                Token::Content { text, span } => {
                    self.advance();
                    body.push(Node::Content(Content {
                        value: text.clone(),
                        original: text,
                        left_stripped: false,
                        right_stripped: false,
                        span,
                    }));
                }
                Token::Comment { text, open_strip, close_strip, span } => {
                    self.advance();
                    body.push(Node::Comment(Comment {
                        value: text,
                        strip: Strip::new(open_strip, close_strip),
                        span,
                    }));
                }
                Token::OpenTag { kind: TagKind::Block, .. } => {
                    body.push(self.parse_block(false)?);
                }
                Token::OpenTag { kind: TagKind::Inverse, span, .. } => {
                    if matches!(self.peek_at(1), Token::CloseTag { .. }) {
                        // Bare `{{^}}` is an else marker; valid only inside
                        // a block, where at_else() catches it first.
                        return Err(ParseError::new(
                            ParseErrorKind::UnexpectedToken,
                            "'{{^}}' outside a block",
                            span,
                        ));
                    }
                    body.push(self.parse_block(true)?);
                }
                Token::OpenTag { kind: TagKind::Partial, .. } => {
                    body.push(self.parse_partial()?);
                }
                Token::OpenTag { kind, strip, span } => {
                    if !in_block && self.at_else() {
                        return Err(ParseError::new(
                            ParseErrorKind::UnexpectedToken,
                            "'{{else}}' outside a block",
                            span,
                        ));
                    }
                    self.advance();
                    let expression = self.parse_expression()?;
                    let (close_strip, close_span) = self.expect_close(span)?;
                    body.push(Node::Mustache(Mustache {
                        expression,
                        unescaped: matches!(kind, TagKind::Raw | TagKind::Amp),
                        strip: Strip::new(strip, close_strip),
                        span: Span { start: span.start, end: close_span.end },
                    }));
                }
                token => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        format!("unexpected {}", describe(&token)),
                        token.span(),
                    ));
                }
            }
        }

        let end = body.last().map(|n| n.span().end).unwrap_or(start);
        Ok(Program { body, block_params, chained: false, span: Span { start, end } })
    }

    /// True at `{{else ...}}` or the bare `{{^}}` marker.
    fn at_else(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Token::OpenTag { kind: TagKind::Mustache, .. }, Token::Ident { name, .. }) => {
                name == "else"
            }
            (Token::OpenTag { kind: TagKind::Inverse, .. }, Token::CloseTag { .. }) => true,
            _ => false,
        }
    }

    // === Blocks ===

    fn parse_block(&mut self, inverted: bool) -> Result<Node, ParseError> {
        let Token::OpenTag { strip, span: open_span, .. } = self.peek().clone() else {
            unreachable!("parse_block called off an open tag");
        };
        self.advance();

        let expression = self.parse_expression()?;
        let block_params = self.parse_block_params()?;
        let (open_close_strip, _) = self.expect_close(open_span)?;
        let open_strip = Strip::new(strip, open_close_strip);

        let open_name = expression.path.name_str().unwrap_or_default();

        let mut program = self.parse_program(block_params.clone(), true)?;
        program.block_params = block_params;

        let (inverse, inverse_strip, close_strip, end) =
            self.parse_block_tail(&open_name, open_span)?;

        let (program, inverse) = if inverted {
            // `{{^foo}}body{{/foo}}`: the body renders when foo is falsy.
            (inverse, Some(program))
        } else {
            (Some(program), inverse)
        };

        Ok(Node::Block(Box::new(Block {
            expression,
            program,
            inverse,
            open_strip,
            inverse_strip,
            close_strip,
            span: Span { start: open_span.start, end },
        })))
    }

    /// Parses everything after a block body: an optional `{{else}}` branch
    /// (possibly an `{{else helper ...}}` chain) and the closing tag.
    fn parse_block_tail(
        &mut self,
        open_name: &str,
        open_span: Span,
    ) -> Result<(Option<Program>, Strip, Strip, Position), ParseError> {
        if self.at_else() {
            let Token::OpenTag { strip: else_open, span: else_span, .. } = self.peek().clone()
            else {
                unreachable!("at_else off an open tag");
            };
            self.advance();
            if matches!(self.peek(), Token::Ident { .. }) {
                // Skip the `else` keyword itself; `{{^}}` has none.
                self.advance();
            }

            if matches!(self.peek(), Token::CloseTag { .. }) {
                // Plain `{{else}}` branch.
                let (else_close, _) = self.expect_close(else_span)?;
                let inverse_strip = Strip::new(else_open, else_close);
                let inverse = self.parse_program(Vec::new(), true)?;
                let (close_strip, end) = self.parse_close_tag(open_name, open_span)?;
                return Ok((Some(inverse), inverse_strip, close_strip, end));
            }

            // `{{else helper ...}}`: a chained block sharing the outer close.
            let chain_expression = self.parse_expression()?;
            let chain_params = self.parse_block_params()?;
            let (else_close, _) = self.expect_close(else_span)?;
            let else_strip = Strip::new(else_open, else_close);

            let mut chain_program = self.parse_program(chain_params.clone(), true)?;
            chain_program.block_params = chain_params;

            let (chain_inverse, chain_inverse_strip, close_strip, end) =
                self.parse_block_tail(open_name, open_span)?;

            let chain_span = Span { start: else_span.start, end };
            let inner = Block {
                expression: chain_expression,
                program: Some(chain_program),
                inverse: chain_inverse,
                open_strip: else_strip,
                inverse_strip: chain_inverse_strip,
                close_strip,
                span: chain_span,
            };
            let wrapper = Program {
                body: vec![Node::Block(Box::new(inner))],
                block_params: Vec::new(),
                chained: true,
                span: chain_span,
            };
            return Ok((Some(wrapper), else_strip, close_strip, end));
        }

        let (close_strip, end) = self.parse_close_tag(open_name, open_span)?;
        Ok((None, Strip::default(), close_strip, end))
    }

    fn parse_close_tag(
        &mut self,
        open_name: &str,
        open_span: Span,
    ) -> Result<(Strip, Position), ParseError> {
        match self.peek().clone() {
            Token::OpenTag { kind: TagKind::Close, strip, span } => {
                self.advance();
                let path = self.parse_path(false)?;
                let close_name = path.bare_original();
                if close_name != open_name {
                    return Err(ParseError::new(
                        ParseErrorKind::MismatchedBlock,
                        format!("expected '{{{{/{}}}}}', found '{{{{/{}}}}}'", open_name, close_name),
                        Span { start: span.start, end: path.span.end },
                    )
                    .with_related(open_span)
                    .with_related_label("block opened here"));
                }
                let (close_strip, close_span) = self.expect_close(span)?;
                Ok((Strip::new(strip, close_strip), close_span.end))
            }
            Token::Eof { position } => Err(ParseError::new(
                ParseErrorKind::UnclosedBlock,
                format!("block '{}' is never closed", open_name),
                Span { start: position, end: position },
            )
            .with_related(open_span)
            .with_related_label("block opened here")
            .with_help(format!("close the block with '{{{{/{}}}}}'", open_name))),
            token => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("unexpected {}", describe(&token)),
                token.span(),
            )),
        }
    }

    // === Partials ===

    fn parse_partial(&mut self) -> Result<Node, ParseError> {
        let Token::OpenTag { strip, span: open_span, .. } = self.peek().clone() else {
            unreachable!("parse_partial called off an open tag");
        };
        self.advance();

        let name = match self.peek().clone() {
            Token::StringLit { value, span } => {
                self.advance();
                PartialName::String(StringLiteral { value, span })
            }
            Token::OpenParen { .. } => PartialName::Sub(Box::new(self.parse_sub_expression()?)),
            _ => PartialName::Path(self.parse_path(false)?),
        };

        let mut params = Vec::new();
        let mut hash = None;
        loop {
            match self.peek() {
                Token::CloseTag { .. } => break,
                Token::Ident { .. } if matches!(self.peek_at(1), Token::Equals { .. }) => {
                    hash = Some(self.parse_hash()?);
                }
                _ => params.push(self.parse_param()?),
            }
        }

        let (close_strip, close_span) = self.expect_close(open_span)?;
        Ok(Node::Partial(Partial {
            name,
            params,
            hash,
            indent: String::new(),
            strip: Strip::new(strip, close_strip),
            span: Span { start: open_span.start, end: close_span.end },
        }))
    }

    // === Expressions ===

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let path = self.parse_param()?;
        let start = path.span().start;
        let mut end = path.span().end;

        let mut params = Vec::new();
        let mut hash = None;
        loop {
            match self.peek() {
                Token::CloseTag { .. } => break,
                Token::Ident { name, .. }
                    if name == "as" && matches!(self.peek_at(1), Token::Pipe { .. }) =>
                {
                    break;
                }
                Token::Ident { .. } if matches!(self.peek_at(1), Token::Equals { .. }) => {
                    let parsed = self.parse_hash()?;
                    end = parsed.span.end;
                    hash = Some(parsed);
                }
                _ => {
                    let param = self.parse_param()?;
                    end = param.span().end;
                    params.push(param);
                }
            }
        }

        Ok(Expression { path, params, hash, span: Span { start, end } })
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        match self.peek().clone() {
            Token::StringLit { value, span } => {
                self.advance();
                Ok(Param::String(StringLiteral { value, span }))
            }
            Token::NumberLit { value, is_int, original, span } => {
                self.advance();
                Ok(Param::Number(NumberLiteral { value, is_int, original, span }))
            }
            Token::BoolLit { value, span } => {
                self.advance();
                Ok(Param::Boolean(BooleanLiteral { value, span }))
            }
            Token::OpenParen { .. } => Ok(Param::Sub(Box::new(self.parse_sub_expression()?))),
            Token::At { .. } | Token::Ident { .. } => {
                let data = matches!(self.peek(), Token::At { .. });
                Ok(Param::Path(self.parse_path(data)?))
            }
            token => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("expected an expression, found {}", describe(&token)),
                token.span(),
            )),
        }
    }

    fn parse_sub_expression(&mut self) -> Result<SubExpression, ParseError> {
        let Token::OpenParen { span: open_span } = self.peek().clone() else {
            unreachable!("parse_sub_expression called off '('");
        };
        self.advance();

        let path = self.parse_param()?;
        let mut params = Vec::new();
        let mut hash = None;
        loop {
            match self.peek().clone() {
                Token::CloseParen { span } => {
                    self.advance();
                    let expr_end = hash
                        .as_ref()
                        .map(|h: &Hash| h.span.end)
                        .or_else(|| params.last().map(|p: &Param| p.span().end))
                        .unwrap_or(path.span().end);
                    let expression = Expression {
                        path,
                        params,
                        hash,
                        span: Span { start: open_span.end, end: expr_end },
                    };
                    return Ok(SubExpression {
                        expression,
                        span: Span { start: open_span.start, end: span.end },
                    });
                }
                Token::CloseTag { span, .. } => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        "this sub-expression is never closed",
                        span,
                    )
                    .with_related(open_span)
                    .with_help("close the sub-expression with ')'"));
                }
                Token::Eof { position } => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        "this sub-expression is never closed",
                        Span { start: position, end: position },
                    )
                    .with_related(open_span));
                }
                Token::Ident { .. } if matches!(self.peek_at(1), Token::Equals { .. }) => {
                    hash = Some(self.parse_hash()?);
                }
                _ => params.push(self.parse_param()?),
            }
        }
    }

    fn parse_path(&mut self, data: bool) -> Result<PathExpression, ParseError> {
        let start = self.peek().span().start;
        if data {
            self.advance();
        }

        let mut path = PathExpression::new(Span { start, end: start }, data);
        loop {
            match self.peek().clone() {
                Token::Ident { name, original, span } => {
                    self.advance();
                    path.part(&original, &name);
                    path.span.end = span.end;
                }
                token => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidPath,
                        format!("expected a path segment, found {}", describe(&token)),
                        token.span(),
                    ));
                }
            }

            match self.peek().clone() {
                Token::Sep { ch, span } => {
                    self.advance();
                    path.sep(ch);
                    path.span.end = span.end;
                }
                _ => break,
            }
        }

        Ok(path)
    }

    fn parse_hash(&mut self) -> Result<Hash, ParseError> {
        let mut pairs: Vec<HashPair> = Vec::new();
        let start = self.peek().span().start;
        let mut end = start;

        while let (Token::Ident { name, span, .. }, Token::Equals { .. }) =
            (self.peek().clone(), self.peek_at(1).clone())
        {
            self.advance();
            self.advance();
            let value = self.parse_param()?;
            let pair_span = Span { start: span.start, end: value.span().end };

            if let Some(first) = pairs.iter().find(|p| p.key == name) {
                return Err(ParseError::new(
                    ParseErrorKind::DuplicateHashKey,
                    format!("hash key '{}' given more than once", name),
                    pair_span,
                )
                .with_related(first.span)
                .with_related_label("first given here"));
            }

            end = pair_span.end;
            pairs.push(HashPair { key: name, value, span: pair_span });
        }

        Ok(Hash { pairs, span: Span { start, end } })
    }

    /// Parses `as |a b|` when present.
    fn parse_block_params(&mut self) -> Result<Vec<String>, ParseError> {
        let is_as = matches!(self.peek(), Token::Ident { name, .. } if name == "as")
            && matches!(self.peek_at(1), Token::Pipe { .. });
        if !is_as {
            return Ok(Vec::new());
        }
        self.advance();
        self.advance();

        let mut names = Vec::new();
        loop {
            match self.peek().clone() {
                Token::Ident { name, .. } => {
                    self.advance();
                    names.push(name);
                }
                Token::Pipe { .. } => {
                    self.advance();
                    return Ok(names);
                }
                token => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        format!("expected a block parameter name, found {}", describe(&token)),
                        token.span(),
                    ));
                }
            }
        }
    }

    // === Token helpers ===

    fn expect_close(&mut self, open_span: Span) -> Result<(bool, Span), ParseError> {
        match self.peek().clone() {
            Token::CloseTag { strip, span, .. } => {
                self.advance();
                Ok((strip, span))
            }
            token => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("expected '}}}}' to close this tag, found {}", describe(&token)),
                token.span(),
            )
            .with_related(open_span)),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Content { .. } => "content".to_string(),
        Token::Comment { .. } => "a comment".to_string(),
        Token::OpenTag { .. } => "'{{'".to_string(),
        Token::CloseTag { raw: true, .. } => "'}}}'".to_string(),
        Token::CloseTag { .. } => "'}}'".to_string(),
        Token::Ident { name, .. } => format!("'{}'", name),
        Token::At { .. } => "'@'".to_string(),
        Token::StringLit { .. } => "a string".to_string(),
        Token::NumberLit { original, .. } => format!("'{}'", original),
        Token::BoolLit { value, .. } => format!("'{}'", value),
        Token::Sep { ch, .. } => format!("'{}'", ch),
        Token::OpenParen { .. } => "'('".to_string(),
        Token::CloseParen { .. } => "')'".to_string(),
        Token::Equals { .. } => "'='".to_string(),
        Token::Pipe { .. } => "'|'".to_string(),
        Token::Eof { .. } => "end of template".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::Tokenizer;

    fn build(source: &str) -> Program {
        let tokens = Tokenizer::new(source).tokenize().unwrap();
        TreeBuilder::new(tokens).build().unwrap()
    }

    fn build_err(source: &str) -> ParseError {
        let tokens = Tokenizer::new(source).tokenize().unwrap();
        TreeBuilder::new(tokens).build().unwrap_err()
    }

    #[test]
    fn test_content_and_mustache() {
        let program = build("Hello {{name}}!");
        assert_eq!(program.body.len(), 3);
        assert!(matches!(&program.body[0], Node::Content(c) if c.value == "Hello "));
        let Node::Mustache(m) = &program.body[1] else { panic!("expected mustache") };
        assert!(!m.unescaped);
        assert_eq!(m.expression.helper_name(), Some("name"));
    }

    #[test]
    fn test_unescaped_forms() {
        let program = build("{{{a}}}{{& b}}");
        assert!(matches!(&program.body[0], Node::Mustache(m) if m.unescaped));
        assert!(matches!(&program.body[1], Node::Mustache(m) if m.unescaped));
    }

    #[test]
    fn test_block_with_else() {
        let program = build("{{#if ok}}yes{{else}}no{{/if}}");
        let Node::Block(block) = &program.body[0] else { panic!("expected block") };
        assert_eq!(block.expression.helper_name(), Some("if"));
        let body = &block.program.as_ref().unwrap().body;
        assert!(matches!(&body[0], Node::Content(c) if c.value == "yes"));
        let inverse = block.inverse.as_ref().unwrap();
        assert!(!inverse.chained);
        assert!(matches!(&inverse.body[0], Node::Content(c) if c.value == "no"));
    }

    #[test]
    fn test_else_chain() {
        let program = build("{{#if a}}A{{else if b}}B{{else}}C{{/if}}");
        let Node::Block(outer) = &program.body[0] else { panic!("expected block") };
        let chain = outer.inverse.as_ref().unwrap();
        assert!(chain.chained);
        let Node::Block(inner) = &chain.body[0] else { panic!("expected chained block") };
        assert_eq!(inner.expression.helper_name(), Some("if"));
        assert!(matches!(
            &inner.program.as_ref().unwrap().body[0],
            Node::Content(c) if c.value == "B"
        ));
        assert!(matches!(
            &inner.inverse.as_ref().unwrap().body[0],
            Node::Content(c) if c.value == "C"
        ));
    }

    #[test]
    fn test_inverted_section() {
        let program = build("{{^items}}empty{{/items}}");
        let Node::Block(block) = &program.body[0] else { panic!("expected block") };
        assert!(block.program.is_none());
        let inverse = block.inverse.as_ref().unwrap();
        assert!(matches!(&inverse.body[0], Node::Content(c) if c.value == "empty"));
    }

    #[test]
    fn test_caret_else_marker() {
        let program = build("{{#items}}some{{^}}none{{/items}}");
        let Node::Block(block) = &program.body[0] else { panic!("expected block") };
        assert!(matches!(
            &block.program.as_ref().unwrap().body[0],
            Node::Content(c) if c.value == "some"
        ));
        assert!(matches!(
            &block.inverse.as_ref().unwrap().body[0],
            Node::Content(c) if c.value == "none"
        ));
    }

    #[test]
    fn test_block_params() {
        let program = build("{{#each items as |item i|}}{{item}}{{/each}}");
        let Node::Block(block) = &program.body[0] else { panic!("expected block") };
        assert_eq!(block.program.as_ref().unwrap().block_params, vec!["item", "i"]);
    }

    #[test]
    fn test_params_and_hash() {
        let program = build(r#"{{helper a "b" 1 true key=x other="y"}}"#);
        let Node::Mustache(m) = &program.body[0] else { panic!("expected mustache") };
        assert_eq!(m.expression.params.len(), 4);
        let hash = m.expression.hash.as_ref().unwrap();
        assert_eq!(hash.pairs.len(), 2);
        assert_eq!(hash.pairs[0].key, "key");
        assert_eq!(hash.pairs[1].key, "other");
    }

    #[test]
    fn test_sub_expression() {
        let program = build("{{outer (inner x) y}}");
        let Node::Mustache(m) = &program.body[0] else { panic!("expected mustache") };
        let Param::Sub(sub) = &m.expression.params[0] else { panic!("expected sub-expression") };
        assert_eq!(sub.expression.helper_name(), Some("inner"));
        assert!(matches!(&m.expression.params[1], Param::Path(p) if p.parts == ["y"]));
    }

    #[test]
    fn test_partial_forms() {
        let program = build(r#"{{> header}}{{> "with space"}}{{> (pick) ctx key=1}}"#);
        let Node::Partial(p) = &program.body[0] else { panic!("expected partial") };
        assert!(matches!(&p.name, PartialName::Path(path) if path.parts == ["header"]));
        let Node::Partial(p) = &program.body[1] else { panic!("expected partial") };
        assert!(matches!(&p.name, PartialName::String(s) if s.value == "with space"));
        let Node::Partial(p) = &program.body[2] else { panic!("expected partial") };
        assert!(matches!(&p.name, PartialName::Sub(_)));
        assert_eq!(p.params.len(), 1);
        assert!(p.hash.is_some());
    }

    #[test]
    fn test_path_depth() {
        let program = build("{{../x.y}}");
        let Node::Mustache(m) = &program.body[0] else { panic!("expected mustache") };
        let path = m.expression.field_path().unwrap();
        assert_eq!(path.depth, 1);
        assert_eq!(path.parts, vec!["x", "y"]);
        assert!(path.scoped);
    }

    #[test]
    fn test_unclosed_block() {
        let err = build_err("{{#if x}}body");
        assert_eq!(err.kind, ParseErrorKind::UnclosedBlock);
        assert!(err.related_span.is_some());
    }

    #[test]
    fn test_mismatched_close() {
        let err = build_err("{{#if x}}body{{/each}}");
        assert_eq!(err.kind, ParseErrorKind::MismatchedBlock);
        assert!(err.message.contains("{{/if}}"));
        assert!(err.related_span.is_some());
    }

    #[test]
    fn test_stray_close() {
        let err = build_err("text{{/if}}");
        assert_eq!(err.kind, ParseErrorKind::MismatchedBlock);
    }

    #[test]
    fn test_else_outside_block() {
        let err = build_err("{{else}}");
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
    }

    #[test]
    fn test_duplicate_hash_key() {
        let err = build_err("{{helper key=1 key=2}}");
        assert_eq!(err.kind, ParseErrorKind::DuplicateHashKey);
        assert!(err.related_span.is_some());
    }

    #[test]
    fn test_strip_markers_recorded() {
        let program = build("{{~#if x~}} a {{~/if~}}");
        let Node::Block(block) = &program.body[0] else { panic!("expected block") };
        assert!(block.open_strip.open);
        assert!(block.open_strip.close);
        assert!(block.close_strip.open);
        assert!(block.close_strip.close);
    }
}
