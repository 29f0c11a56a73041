//! Post-parse whitespace control.
//!
//! Applies explicit `~` markers and the implicit standalone rules: block
//! tags, comments and partials that stand alone on a line swallow that
//! line's leading and trailing whitespace. Content nodes keep their source
//! text in `original`; only `value` is trimmed.

use crate::ast::{Block, Node, Partial, Program, Strip};

pub(crate) fn process(program: &mut Program) {
    let mut pass = WhitespacePass { root_seen: false };
    pass.visit_program(program);
}

struct WhitespacePass {
    root_seen: bool,
}

impl WhitespacePass {
    fn visit_program(&mut self, program: &mut Program) {
        let is_root = !self.root_seen;
        self.root_seen = true;

        for i in 0..program.body.len() {
            let strip = match &mut program.body[i] {
                Node::Content(_) => continue,
                Node::Mustache(mustache) => mustache.strip,
                Node::Comment(comment) => {
                    let mut strip = Strip::new(comment.strip.open, comment.strip.close);
                    strip.inline_standalone = true;
                    strip
                }
                Node::Partial(partial) => {
                    let mut strip = Strip::new(partial.strip.open, partial.strip.close);
                    strip.inline_standalone = true;
                    strip
                }
                Node::Block(block) => self.visit_block(block),
            };

            let prev_ws = prev_whitespace(&program.body, Some(i), is_root);
            let next_ws = next_whitespace(&program.body, Some(i), is_root);

            let open_standalone = strip.open_standalone && prev_ws;
            let close_standalone = strip.close_standalone && next_ws;
            let inline_standalone = strip.inline_standalone && prev_ws && next_ws;

            if strip.close {
                omit_right(&mut program.body, Some(i), true);
            }
            if strip.open {
                omit_left(&mut program.body, Some(i), true);
            }

            if inline_standalone {
                omit_right(&mut program.body, Some(i), false);
                if omit_left(&mut program.body, Some(i), false) {
                    let indent = match program.body.get(i - 1) {
                        Some(Node::Content(content)) => trailing_indent(&content.original),
                        _ => String::new(),
                    };
                    if let Some(Node::Partial(partial)) = program.body.get_mut(i) {
                        record_indent(partial, indent, strip);
                    }
                }
            }

            if open_standalone {
                if let Node::Block(block) = &mut program.body[i] {
                    if let Some(inner) = block.program.as_mut().or(block.inverse.as_mut()) {
                        omit_right(&mut inner.body, None, false);
                    }
                }
                omit_left(&mut program.body, Some(i), false);
            }

            if close_standalone {
                omit_right(&mut program.body, Some(i), false);
                if let Node::Block(block) = &mut program.body[i] {
                    if let Some(inner) = block.inverse.as_mut().or(block.program.as_mut()) {
                        omit_left(&mut inner.body, None, false);
                    }
                }
            }
        }
    }

    /// Processes a block's children, applies its inner trims, and reports
    /// the strip candidacy the enclosing program uses for standalone
    /// detection.
    fn visit_block(&mut self, block: &mut Block) -> Strip {
        if let Some(program) = &mut block.program {
            self.visit_program(program);
        }
        if let Some(inverse) = &mut block.inverse {
            self.visit_program(inverse);
        }

        let has_both = block.program.is_some() && block.inverse.is_some();

        let mut strip = Strip::new(block.open_strip.open, block.close_strip.close);
        if let Some(program) = block.program.as_ref().or(block.inverse.as_ref()) {
            strip.open_standalone = next_whitespace(&program.body, None, false);
            let close_body = if has_both {
                first_inverse_body(block).unwrap_or(&program.body)
            } else {
                &program.body
            };
            strip.close_standalone = prev_whitespace(close_body, None, false);
        }

        if block.open_strip.close {
            if let Some(program) = block.program.as_mut().or(block.inverse.as_mut()) {
                omit_right(&mut program.body, None, true);
            }
        }

        if has_both {
            if block.inverse_strip.open {
                if let Some(program) = &mut block.program {
                    omit_left(&mut program.body, None, true);
                }
            }
            if block.inverse_strip.close {
                if let Some(body) = first_inverse_body_mut(block) {
                    omit_right(body, None, true);
                }
            }
            if block.close_strip.open {
                if let Some(body) = last_inverse_body_mut(block) {
                    omit_left(body, None, true);
                }
            }

            // A standalone `{{else}}` swallows its own line too.
            let standalone_else = block
                .program
                .as_ref()
                .map(|p| prev_whitespace(&p.body, None, false))
                .unwrap_or(false)
                && first_inverse_body(block)
                    .map(|body| next_whitespace(body, None, false))
                    .unwrap_or(false);
            if standalone_else {
                if let Some(program) = &mut block.program {
                    omit_left(&mut program.body, None, false);
                }
                if let Some(body) = first_inverse_body_mut(block) {
                    omit_right(body, None, false);
                }
            }
        } else if block.close_strip.open {
            if let Some(program) = block.program.as_mut().or(block.inverse.as_mut()) {
                omit_left(&mut program.body, None, true);
            }
        }

        strip
    }
}

fn record_indent(partial: &mut Partial, indent: String, strip: Strip) {
    partial.strip = Strip { inline_standalone: true, ..strip };
    partial.indent = indent;
}

/// First branch of an else chain: for `{{else if}}` continuations this is
/// the chained block's own body, otherwise the inverse itself.
fn first_inverse_body(block: &Block) -> Option<&Vec<Node>> {
    let inverse = block.inverse.as_ref()?;
    if inverse.chained {
        match inverse.body.first() {
            Some(Node::Block(inner)) => inner.program.as_ref().map(|p| &p.body),
            _ => None,
        }
    } else {
        Some(&inverse.body)
    }
}

fn first_inverse_body_mut(block: &mut Block) -> Option<&mut Vec<Node>> {
    let inverse = block.inverse.as_mut()?;
    if inverse.chained {
        match inverse.body.first_mut() {
            Some(Node::Block(inner)) => inner.program.as_mut().map(|p| &mut p.body),
            _ => None,
        }
    } else {
        Some(&mut inverse.body)
    }
}

/// Last branch of an else chain, where the closing tag's left trim lands.
fn last_inverse_body_mut(block: &mut Block) -> Option<&mut Vec<Node>> {
    let mut current = block.inverse.as_mut()?;
    while current.chained {
        match current.body.last_mut() {
            Some(Node::Block(inner)) => match inner.program.as_mut() {
                Some(program) => current = program,
                None => return None,
            },
            _ => return None,
        }
    }
    Some(&mut current.body)
}

/// True when the node before `i` ends a line: its trailing whitespace run
/// contains a newline. At the template edge (`is_root`, no sibling) an
/// all-whitespace or absent predecessor also qualifies.
fn prev_whitespace(body: &[Node], i: Option<usize>, is_root: bool) -> bool {
    let idx = i.unwrap_or(body.len());
    if idx == 0 {
        return is_root;
    }
    let Node::Content(content) = &body[idx - 1] else {
        return false;
    };
    let at_edge = idx < 2 && is_root;
    trailing_run_has_newline(&content.original)
        || (at_edge && all_whitespace(&content.original))
}

/// Mirror of [`prev_whitespace`] for the node after `i`.
fn next_whitespace(body: &[Node], i: Option<usize>, is_root: bool) -> bool {
    let idx = i.map(|i| i + 1).unwrap_or(0);
    let Some(next) = body.get(idx) else {
        return is_root;
    };
    let Node::Content(content) = next else {
        return false;
    };
    let at_edge = body.get(idx + 1).is_none() && is_root;
    leading_run_has_newline(&content.original)
        || (at_edge && all_whitespace(&content.original))
}

/// Trims the start of the content node after `i` (or the first node when
/// `i` is `None`). Single mode removes one line break and the indentation
/// before it; multiple mode removes the whole whitespace run.
fn omit_right(body: &mut [Node], i: Option<usize>, multiple: bool) {
    let idx = i.map(|i| i + 1).unwrap_or(0);
    let Some(Node::Content(content)) = body.get_mut(idx) else {
        return;
    };
    if !multiple && content.right_stripped {
        return;
    }

    let trimmed = if multiple {
        content.value.trim_start().to_string()
    } else {
        strip_one_line_start(&content.value)
    };
    content.right_stripped = trimmed != content.value;
    content.value = trimmed;
}

/// Trims the end of the content node before `i` (or the last node when `i`
/// is `None`). Returns whether anything was removed.
fn omit_left(body: &mut [Node], i: Option<usize>, multiple: bool) -> bool {
    let idx = match i {
        Some(0) => return false,
        Some(i) => i - 1,
        None => match body.len() {
            0 => return false,
            len => len - 1,
        },
    };
    let Some(Node::Content(content)) = body.get_mut(idx) else {
        return false;
    };
    if !multiple && content.left_stripped {
        return false;
    }

    let trimmed = if multiple {
        content.value.trim_end().to_string()
    } else {
        content.value.trim_end_matches([' ', '\t']).to_string()
    };
    content.left_stripped = trimmed != content.value;
    content.value = trimmed;
    content.left_stripped
}

/// Removes leading spaces and tabs plus at most one line break.
fn strip_one_line_start(s: &str) -> String {
    let mut idx = 0;
    let bytes = s.as_bytes();
    while idx < bytes.len() && (bytes[idx] == b' ' || bytes[idx] == b'\t') {
        idx += 1;
    }
    if idx < bytes.len() && bytes[idx] == b'\r' {
        idx += 1;
    }
    if idx < bytes.len() && bytes[idx] == b'\n' {
        idx += 1;
    }
    s[idx..].to_string()
}

fn trailing_indent(s: &str) -> String {
    let trimmed = s.trim_end_matches([' ', '\t']);
    s[trimmed.len()..].to_string()
}

fn trailing_run_has_newline(s: &str) -> bool {
    s.chars().rev().take_while(|c| c.is_whitespace()).any(|c| c == '\n')
}

fn leading_run_has_newline(s: &str) -> bool {
    s.chars().take_while(|c| c.is_whitespace()).any(|c| c == '\n')
}

fn all_whitespace(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::Tokenizer;
    use crate::parser::tree_builder::TreeBuilder;

    fn pass(source: &str) -> Program {
        let tokens = Tokenizer::new(source).tokenize().unwrap();
        let mut program = TreeBuilder::new(tokens).build().unwrap();
        process(&mut program);
        program
    }

    fn content_value(node: &Node) -> &str {
        match node {
            Node::Content(c) => &c.value,
            _ => panic!("expected content, got {:?}", node),
        }
    }

    #[test]
    fn test_explicit_tilde_markers() {
        let program = pass("x \n {{~foo~}} \n y");
        assert_eq!(content_value(&program.body[0]), "x");
        assert_eq!(content_value(&program.body[2]), "y");
    }

    #[test]
    fn test_standalone_block_tags() {
        let program = pass("a\n{{#if x}}\nb\n{{/if}}\nc");
        assert_eq!(content_value(&program.body[0]), "a\n");
        let Node::Block(block) = &program.body[1] else { panic!("expected block") };
        let inner = block.program.as_ref().unwrap();
        assert_eq!(content_value(&inner.body[0]), "b\n");
        assert_eq!(content_value(&program.body[2]), "c");
    }

    #[test]
    fn test_standalone_else() {
        let program = pass("{{#if x}}\na\n{{else}}\nb\n{{/if}}\n");
        let Node::Block(block) = &program.body[0] else { panic!("expected block") };
        assert_eq!(content_value(&block.program.as_ref().unwrap().body[0]), "a\n");
        assert_eq!(content_value(&block.inverse.as_ref().unwrap().body[0]), "b\n");
    }

    #[test]
    fn test_inline_tags_keep_whitespace() {
        let program = pass("a {{#if x}}b{{/if}} c");
        assert_eq!(content_value(&program.body[0]), "a ");
        assert_eq!(content_value(&program.body[2]), " c");
    }

    #[test]
    fn test_mustache_never_standalone() {
        let program = pass("a\n{{x}}\nb");
        assert_eq!(content_value(&program.body[0]), "a\n");
        assert_eq!(content_value(&program.body[2]), "\nb");
    }

    #[test]
    fn test_standalone_comment() {
        let program = pass("a\n  {{! note }}  \nb");
        assert_eq!(content_value(&program.body[0]), "a\n");
        assert_eq!(content_value(&program.body[2]), "b");
    }

    #[test]
    fn test_comment_at_template_edge() {
        let program = pass("  {{! note }}\nx");
        assert_eq!(content_value(&program.body[0]), "");
        assert_eq!(content_value(&program.body[2]), "x");
    }

    #[test]
    fn test_partial_indent_capture() {
        let program = pass("line\n  {{> p}}\nafter");
        assert_eq!(content_value(&program.body[0]), "line\n");
        let Node::Partial(partial) = &program.body[1] else { panic!("expected partial") };
        assert_eq!(partial.indent, "  ");
        assert_eq!(content_value(&program.body[2]), "after");
    }

    #[test]
    fn test_inline_partial_keeps_indent_empty() {
        let program = pass("a {{> p}} b");
        let Node::Partial(partial) = &program.body[1] else { panic!("expected partial") };
        assert_eq!(partial.indent, "");
        assert_eq!(content_value(&program.body[0]), "a ");
        assert_eq!(content_value(&program.body[2]), " b");
    }

    #[test]
    fn test_original_preserved() {
        let program = pass("a\n{{#if x}}\nb\n{{/if}}\nc");
        let Node::Content(content) = &program.body[2] else { panic!("expected content") };
        assert_eq!(content.original, "\nc");
        assert!(content.right_stripped);
    }
}
