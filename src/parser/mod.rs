//! Template parsing: tokenize, build the tree, apply whitespace control.

pub mod tokenizer;
pub mod tree_builder;
mod whitespace;

use crate::ast::Program;
use crate::error::ParseError;
use tokenizer::Tokenizer;
use tree_builder::TreeBuilder;

/// Parses template source into a compiled program.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Tokenizer::new(source).tokenize()?;
    let mut program = TreeBuilder::new(tokens).build()?;
    whitespace::process(&mut program);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    #[test]
    fn test_parse_pipeline() {
        let program = parse("a\n{{#if x}}\nb\n{{/if}}\nc").unwrap();
        assert_eq!(program.body.len(), 3);
        assert!(matches!(&program.body[0], Node::Content(c) if c.value == "a\n"));
        assert!(matches!(&program.body[1], Node::Block(_)));
        assert!(matches!(&program.body[2], Node::Content(c) if c.value == "c"));
    }

    #[test]
    fn test_parse_error_positions_survive() {
        let err = parse("line one\n{{#if x}}oops").unwrap_err();
        assert_eq!(err.span.start.line, 1);
    }
}
