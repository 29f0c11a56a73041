use serde::Serialize;

pub use crate::parser::tokenizer::{Position, Span};

/// A statement in a template body.
#[derive(Debug, Clone, Serialize)]
pub enum Node {
    Content(Content),
    Comment(Comment),
    Mustache(Mustache),
    Block(Box<Block>),
    Partial(Partial),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Content(n) => n.span,
            Node::Comment(n) => n.span,
            Node::Mustache(n) => n.span,
            Node::Block(n) => n.span,
            Node::Partial(n) => n.span,
        }
    }
}

/// An ordered sequence of statements: the template root, a block body, or an
/// `{{else}}` branch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub body: Vec<Node>,
    /// Names bound by `as |a b|` on the enclosing block.
    pub block_params: Vec<String>,
    /// True when this program is the body of an `else if` continuation, so
    /// the whitespace pass treats it as part of the parent chain instead of
    /// an independent standalone candidate.
    pub chained: bool,
    pub span: Span,
}

/// A literal text run. `value` is the working text after whitespace control;
/// `original` is the source text, kept for the standalone-detection rules.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub value: String,
    pub original: String,
    pub left_stripped: bool,
    pub right_stripped: bool,
    pub span: Span,
}

/// `{{! ... }}` or `{{!-- ... --}}`; never rendered.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub value: String,
    pub strip: Strip,
    pub span: Span,
}

/// `{{expr}}`, `{{{expr}}}` or `{{& expr}}`.
#[derive(Debug, Clone, Serialize)]
pub struct Mustache {
    pub expression: Expression,
    /// True for the triple-stache and `&` forms: emit without HTML escaping.
    pub unescaped: bool,
    pub strip: Strip,
    pub span: Span,
}

/// `{{#expr}}...{{else}}...{{/expr}}` or the inverted `{{^expr}}...{{/expr}}`.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub expression: Expression,
    pub program: Option<Program>,
    pub inverse: Option<Program>,
    pub open_strip: Strip,
    pub inverse_strip: Strip,
    pub close_strip: Strip,
    pub span: Span,
}

/// `{{> name ...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct Partial {
    pub name: PartialName,
    pub params: Vec<Param>,
    pub hash: Option<Hash>,
    /// Indentation captured from the surrounding content when the tag stands
    /// alone on an indented line; re-applied to every rendered output line.
    pub indent: String,
    pub strip: Strip,
    pub span: Span,
}

/// A partial name: a static path, a string literal, or a sub-expression for
/// dynamic dispatch (`{{> (pick) }}`).
#[derive(Debug, Clone, Serialize)]
pub enum PartialName {
    Path(PathExpression),
    String(StringLiteral),
    Sub(Box<SubExpression>),
}

/// A call-like expression: `helperName param1 param2 key=value`.
#[derive(Debug, Clone, Serialize)]
pub struct Expression {
    pub path: Param,
    pub params: Vec<Param>,
    pub hash: Option<Hash>,
    pub span: Span,
}

impl Expression {
    /// The single-segment helper name, or `None` when this expression can
    /// only be a literal or a field reference.
    pub fn helper_name(&self) -> Option<&str> {
        match &self.path {
            Param::Path(path)
                if !path.data && !path.scoped && path.depth == 0 && path.parts.len() == 1 =>
            {
                Some(&path.parts[0])
            }
            _ => None,
        }
    }

    pub fn field_path(&self) -> Option<&PathExpression> {
        match &self.path {
            Param::Path(path) => Some(path),
            _ => None,
        }
    }
}

/// A value position inside an expression: path, literal or nested call.
#[derive(Debug, Clone, Serialize)]
pub enum Param {
    Path(PathExpression),
    String(StringLiteral),
    Boolean(BooleanLiteral),
    Number(NumberLiteral),
    Sub(Box<SubExpression>),
}

impl Param {
    pub fn span(&self) -> Span {
        match self {
            Param::Path(p) => p.span,
            Param::String(l) => l.span,
            Param::Boolean(l) => l.span,
            Param::Number(l) => l.span,
            Param::Sub(s) => s.span,
        }
    }

    /// The canonical string form of a path or literal, used for helper and
    /// partial name resolution.
    pub fn name_str(&self) -> Option<String> {
        match self {
            Param::Path(p) => Some(p.bare_original()),
            Param::String(l) => Some(l.value.clone()),
            Param::Boolean(l) => Some(l.canonical()),
            Param::Number(l) => Some(l.canonical()),
            Param::Sub(_) => None,
        }
    }
}

/// A parenthesized nested call: `(helper a b)`.
#[derive(Debug, Clone, Serialize)]
pub struct SubExpression {
    pub expression: Expression,
    pub span: Span,
}

/// A dotted, ancestor-aware reference into the context stack or private data:
/// `a.b`, `../x`, `@index`, `this`.
#[derive(Debug, Clone, Serialize)]
pub struct PathExpression {
    /// Raw source text, including separators and `[...]` quoting.
    pub original: String,
    /// Number of `../` segments: context-stack levels to ascend.
    pub depth: usize,
    pub parts: Vec<String>,
    /// True for `@`-prefixed private-data paths.
    pub data: bool,
    /// True when the path begins with `.`, `this` or `..`; such a path must
    /// not be reinterpreted as a helper call.
    pub scoped: bool,
    pub span: Span,
}

impl PathExpression {
    pub fn new(span: Span, data: bool) -> Self {
        PathExpression {
            original: if data { "@".to_string() } else { String::new() },
            depth: 0,
            parts: Vec::new(),
            data,
            scoped: false,
            span,
        }
    }

    /// Accumulates one path segment. `original` is the raw source text
    /// (brackets included), `name` the working segment.
    pub fn part(&mut self, original: &str, name: &str) {
        self.original.push_str(original);
        match name {
            ".." => {
                self.depth += 1;
                self.scoped = true;
            }
            "." | "this" => self.scoped = true,
            _ => self.parts.push(name.to_string()),
        }
    }

    /// Accumulates a `.` or `/` separator into the raw text.
    pub fn sep(&mut self, separator: char) {
        self.original.push(separator);
    }

    /// True for the `@root` data path.
    pub fn is_data_root(&self) -> bool {
        self.data && self.parts.first().map(String::as_str) == Some("root")
    }

    /// `original` with surrounding `[...]` quoting removed.
    pub fn bare_original(&self) -> String {
        let raw = self.original.as_str();
        if raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']') {
            raw[1..raw.len() - 1].to_string()
        } else {
            raw.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashPair {
    pub key: String,
    pub value: Param,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct StringLiteral {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct BooleanLiteral {
    pub value: bool,
    pub span: Span,
}

impl BooleanLiteral {
    pub fn canonical(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NumberLiteral {
    pub value: f64,
    /// True when the source had no decimal point and the value fits integer
    /// form; drives canonical display.
    pub is_int: bool,
    pub original: String,
    pub span: Span,
}

impl NumberLiteral {
    /// Canonical form: `"12"`, `"-1.5"`.
    pub fn canonical(&self) -> String {
        if self.is_int {
            (self.value as i64).to_string()
        } else {
            self.value.to_string()
        }
    }
}

/// Per-tag whitespace management. `open`/`close` record explicit `~` markers;
/// the standalone flags are computed by the whitespace pass and drive
/// implicit trimming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Strip {
    pub open: bool,
    pub close: bool,
    pub open_standalone: bool,
    pub close_standalone: bool,
    pub inline_standalone: bool,
}

impl Strip {
    pub fn new(open: bool, close: bool) -> Self {
        Strip { open, close, ..Strip::default() }
    }
}

/// Renders a deterministic textual dump of a compiled tree. Debug aid for
/// test failures, not a stability contract.
pub fn dump(program: &Program) -> String {
    let mut out = String::new();
    dump_program(program, 0, &mut out);
    out
}

fn pad(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn dump_program(program: &Program, depth: usize, out: &mut String) {
    pad(depth, out);
    out.push_str("PROGRAM");
    if !program.block_params.is_empty() {
        out.push_str(&format!(" as |{}|", program.block_params.join(" ")));
    }
    if program.chained {
        out.push_str(" (chained)");
    }
    out.push('\n');
    for node in &program.body {
        dump_node(node, depth + 1, out);
    }
}

fn dump_node(node: &Node, depth: usize, out: &mut String) {
    match node {
        Node::Content(content) => {
            pad(depth, out);
            out.push_str(&format!("CONTENT[ {:?} ]\n", content.value));
        }
        Node::Comment(comment) => {
            pad(depth, out);
            out.push_str(&format!("COMMENT[ {:?} ]\n", comment.value));
        }
        Node::Mustache(mustache) => {
            pad(depth, out);
            out.push_str(if mustache.unescaped { "RAW-MUSTACHE " } else { "MUSTACHE " });
            dump_expression(&mustache.expression, out);
            out.push('\n');
        }
        Node::Block(block) => {
            pad(depth, out);
            out.push_str("BLOCK ");
            dump_expression(&block.expression, out);
            out.push('\n');
            if let Some(program) = &block.program {
                dump_program(program, depth + 1, out);
            }
            if let Some(inverse) = &block.inverse {
                pad(depth + 1, out);
                out.push_str("ELSE\n");
                dump_program(inverse, depth + 1, out);
            }
        }
        Node::Partial(partial) => {
            pad(depth, out);
            out.push_str("PARTIAL ");
            match &partial.name {
                PartialName::Path(path) => out.push_str(&path.bare_original()),
                PartialName::String(lit) => out.push_str(&format!("{:?}", lit.value)),
                PartialName::Sub(sub) => {
                    out.push('(');
                    dump_expression(&sub.expression, out);
                    out.push(')');
                }
            }
            for param in &partial.params {
                out.push(' ');
                dump_param(param, out);
            }
            if let Some(hash) = &partial.hash {
                out.push(' ');
                dump_hash(hash, out);
            }
            if !partial.indent.is_empty() {
                out.push_str(&format!(" indent={:?}", partial.indent));
            }
            out.push('\n');
        }
    }
}

fn dump_expression(expression: &Expression, out: &mut String) {
    dump_param(&expression.path, out);
    for param in &expression.params {
        out.push(' ');
        dump_param(param, out);
    }
    if let Some(hash) = &expression.hash {
        out.push(' ');
        dump_hash(hash, out);
    }
}

fn dump_param(param: &Param, out: &mut String) {
    match param {
        Param::Path(path) => out.push_str(&format!("PATH:{}", path.original)),
        Param::String(lit) => out.push_str(&format!("{:?}", lit.value)),
        Param::Boolean(lit) => out.push_str(&format!("BOOLEAN:{}", lit.canonical())),
        Param::Number(lit) => out.push_str(&format!("NUMBER:{}", lit.canonical())),
        Param::Sub(sub) => {
            out.push('(');
            dump_expression(&sub.expression, out);
            out.push(')');
        }
    }
}

fn dump_hash(hash: &Hash, out: &mut String) {
    out.push_str("HASH{");
    for (i, pair) in hash.pairs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&pair.key);
        out.push('=');
        dump_param(&pair.value, out);
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span { start: Position::new(), end: Position::new() }
    }

    #[test]
    fn test_path_accumulation() {
        let mut path = PathExpression::new(span(), false);
        path.part("..", "..");
        path.sep('/');
        path.part("foo", "foo");
        path.sep('.');
        path.part("bar", "bar");

        assert_eq!(path.original, "../foo.bar");
        assert_eq!(path.depth, 1);
        assert!(path.scoped);
        assert_eq!(path.parts, vec!["foo", "bar"]);
    }

    #[test]
    fn test_data_root() {
        let mut path = PathExpression::new(span(), true);
        path.part("root", "root");
        path.sep('.');
        path.part("foo", "foo");
        assert!(path.is_data_root());
        assert_eq!(path.original, "@root.foo");
    }

    #[test]
    fn test_bracket_segment_bare_original() {
        let mut path = PathExpression::new(span(), false);
        path.part("[foo bar]", "foo bar");
        assert_eq!(path.bare_original(), "foo bar");
        assert_eq!(path.parts, vec!["foo bar"]);
    }

    #[test]
    fn test_number_canonical_roundtrip() {
        let int = NumberLiteral { value: 12.0, is_int: true, original: "12".into(), span: span() };
        assert_eq!(int.canonical(), "12");
        assert_eq!(int.canonical().parse::<f64>().unwrap(), int.value);

        let float =
            NumberLiteral { value: -1.5, is_int: false, original: "-1.5".into(), span: span() };
        assert_eq!(float.canonical(), "-1.5");
        assert_eq!(float.canonical().parse::<f64>().unwrap(), float.value);
    }

    #[test]
    fn test_helper_name_rules() {
        let mut path = PathExpression::new(span(), false);
        path.part("foo", "foo");
        let expr = Expression {
            path: Param::Path(path.clone()),
            params: vec![],
            hash: None,
            span: span(),
        };
        assert_eq!(expr.helper_name(), Some("foo"));

        // Scoped paths are never helper names.
        let mut scoped = PathExpression::new(span(), false);
        scoped.part("this", "this");
        scoped.sep('.');
        scoped.part("foo", "foo");
        let expr =
            Expression { path: Param::Path(scoped), params: vec![], hash: None, span: span() };
        assert_eq!(expr.helper_name(), None);

        // Multi-part paths are field references.
        path.sep('.');
        path.part("bar", "bar");
        let expr = Expression { path: Param::Path(path), params: vec![], hash: None, span: span() };
        assert_eq!(expr.helper_name(), None);
    }
}
