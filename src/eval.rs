//! Tree-walking evaluation of a compiled program.
//!
//! The evaluator keeps three pieces of scoped state: the context stack
//! (`..` ascends it), block parameter bindings, and the private data frame.
//! Output is buffered; a failing node discards the whole render.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::ast::{Block, Expression, Hash, Node, Param, Partial, PartialName, PathExpression, Program};
use crate::data_frame::DataFrame;
use crate::error::{EvalError, EvalErrorKind};
use crate::escape::escape;
use crate::helpers::{Helper, Options};
use crate::PartialDef;
use crate::value::Value;

/// Ceiling on nested program evaluations, shared by blocks and partials.
/// Self-including partials hit this instead of overflowing the stack, so it
/// must stay well below the native stack's capacity for eval frames.
const MAX_DEPTH: usize = 256;

static NULL: Value = Value::Null;

pub(crate) struct Evaluator<'p> {
    helpers: &'p HashMap<String, Arc<Helper>>,
    partials: &'p HashMap<String, Arc<PartialDef>>,
    ctx_stack: Vec<Value>,
    block_param_frames: Vec<BTreeMap<String, Value>>,
    frame: DataFrame,
    depth: usize,
}

impl<'p> Evaluator<'p> {
    pub(crate) fn new(
        helpers: &'p HashMap<String, Arc<Helper>>,
        partials: &'p HashMap<String, Arc<PartialDef>>,
        ctx: Value,
        frame: DataFrame,
    ) -> Self {
        Self {
            helpers,
            partials,
            ctx_stack: vec![ctx],
            block_param_frames: Vec::new(),
            frame,
            depth: 0,
        }
    }

    pub(crate) fn render(&mut self, program: &'p Program) -> Result<String, EvalError> {
        self.render_program(program, None, None, &[])
    }

    pub(crate) fn current_context(&self) -> &Value {
        self.ctx_stack.last().unwrap_or(&NULL)
    }

    pub(crate) fn data_frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Renders one program, scoping an optional context push, an optional
    /// data frame swap, and the block parameter bindings to it.
    pub(crate) fn render_program(
        &mut self,
        program: &'p Program,
        ctx: Option<Value>,
        frame: Option<DataFrame>,
        block_param_values: &[Value],
    ) -> Result<String, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::new(
                EvalErrorKind::TooMuchRecursion,
                "template nesting exceeds the evaluation depth limit",
            )
            .with_span(program.span));
        }
        self.depth += 1;

        let pushed_ctx = ctx.is_some();
        if let Some(ctx) = ctx {
            self.ctx_stack.push(ctx);
        }
        let saved_frame = frame.map(|f| std::mem::replace(&mut self.frame, f));
        let bindings: BTreeMap<String, Value> = program
            .block_params
            .iter()
            .cloned()
            .zip(block_param_values.iter().cloned())
            .collect();
        let pushed_params = !bindings.is_empty();
        if pushed_params {
            self.block_param_frames.push(bindings);
        }

        let result = self.render_body(program);

        if pushed_params {
            self.block_param_frames.pop();
        }
        if let Some(frame) = saved_frame {
            self.frame = frame;
        }
        if pushed_ctx {
            self.ctx_stack.pop();
        }
        self.depth -= 1;

        result
    }

    fn render_body(&mut self, program: &'p Program) -> Result<String, EvalError> {
        let mut out = String::new();
        for node in &program.body {
            match node {
                Node::Content(content) => out.push_str(&content.value),
                Node::Comment(_) => {}
                Node::Mustache(mustache) => {
                    let value = self.eval_expression(&mustache.expression, None, None)?;
                    let text = value.stringify();
                    if mustache.unescaped || value.is_safe() {
                        out.push_str(&text);
                    } else {
                        out.push_str(&escape(&text));
                    }
                }
                Node::Block(block) => out.push_str(&self.eval_block(block)?),
                Node::Partial(partial) => out.push_str(&self.eval_partial(partial)?),
            }
        }
        Ok(out)
    }

    // === Expressions ===

    fn eval_expression(
        &mut self,
        expr: &'p Expression,
        program: Option<&'p Program>,
        inverse: Option<&'p Program>,
    ) -> Result<Value, EvalError> {
        if let Some(name) = expr.helper_name() {
            let helpers = self.helpers;
            if let Some(helper) = helpers.get(name) {
                return self.call_helper(name, helper, expr, program, inverse);
            }
        }

        if !expr.params.is_empty() || expr.hash.is_some() {
            let name = expr.path.name_str().unwrap_or_default();
            return Err(EvalError::unknown_helper(&name).with_span(expr.span));
        }

        match &expr.path {
            Param::Path(path) => Ok(self.resolve_path(path)),
            other => self.eval_param(other),
        }
    }

    fn call_helper(
        &mut self,
        name: &str,
        helper: &'p Arc<Helper>,
        expr: &'p Expression,
        program: Option<&'p Program>,
        inverse: Option<&'p Program>,
    ) -> Result<Value, EvalError> {
        let mut params = Vec::with_capacity(expr.params.len());
        for param in &expr.params {
            params.push(self.eval_param(param)?);
        }
        let hash = self.eval_hash(expr.hash.as_ref())?;

        let mut options = Options { eval: self, params, hash, program, inverse };
        helper.call(name, &mut options).map_err(|e| match e.span {
            Some(_) => e,
            None => e.with_span(expr.span),
        })
    }

    fn eval_param(&mut self, param: &'p Param) -> Result<Value, EvalError> {
        match param {
            Param::Path(path) => Ok(self.resolve_path(path)),
            Param::String(lit) => Ok(Value::String(lit.value.clone())),
            Param::Boolean(lit) => Ok(Value::Bool(lit.value)),
            Param::Number(lit) => Ok(if lit.is_int {
                Value::Int(lit.value as i64)
            } else {
                Value::Float(lit.value)
            }),
            Param::Sub(sub) => self.eval_expression(&sub.expression, None, None),
        }
    }

    fn eval_hash(&mut self, hash: Option<&'p Hash>) -> Result<BTreeMap<String, Value>, EvalError> {
        let mut map = BTreeMap::new();
        if let Some(hash) = hash {
            for pair in &hash.pairs {
                let value = self.eval_param(&pair.value)?;
                map.insert(pair.key.clone(), value);
            }
        }
        Ok(map)
    }

    // === Path resolution ===

    fn resolve_path(&self, path: &PathExpression) -> Value {
        if path.data {
            return self.resolve_data_path(path);
        }

        // Block parameters shadow context fields, innermost binding first.
        if path.depth == 0 && !path.scoped {
            if let Some(first) = path.parts.first() {
                for frame in self.block_param_frames.iter().rev() {
                    if let Some(base) = frame.get(first) {
                        return walk(base, &path.parts[1..]).cloned().unwrap_or(Value::Null);
                    }
                }
            }
        }

        // Ascending past the stack bottom resolves to the undefined value.
        if path.depth >= self.ctx_stack.len() {
            return Value::Null;
        }
        let ctx = &self.ctx_stack[self.ctx_stack.len() - 1 - path.depth];
        walk(ctx, &path.parts).cloned().unwrap_or(Value::Null)
    }

    fn resolve_data_path(&self, path: &PathExpression) -> Value {
        if path.is_data_root() {
            let root = self.ctx_stack.first().unwrap_or(&NULL);
            return walk(root, &path.parts[1..]).cloned().unwrap_or(Value::Null);
        }
        let Some(first) = path.parts.first() else {
            return Value::Null;
        };
        let Some(base) = self.frame.get(first) else {
            return Value::Null;
        };
        walk(base, &path.parts[1..]).cloned().unwrap_or(Value::Null)
    }

    // === Blocks ===

    fn eval_block(&mut self, block: &'p Block) -> Result<String, EvalError> {
        let expr = &block.expression;
        if let Some(name) = expr.helper_name() {
            let helpers = self.helpers;
            if let Some(helper) = helpers.get(name) {
                let value = self.call_helper(
                    name,
                    helper,
                    expr,
                    block.program.as_ref(),
                    block.inverse.as_ref(),
                )?;
                return Ok(value.stringify());
            }
        }

        if !expr.params.is_empty() || expr.hash.is_some() {
            let name = expr.path.name_str().unwrap_or_default();
            return Err(EvalError::unknown_helper(&name).with_span(expr.span));
        }

        let value = match &expr.path {
            Param::Path(path) => self.resolve_path(path),
            other => self.eval_param(other)?,
        };

        match &value {
            // A bare section over a sequence iterates it.
            Value::Array(items) => {
                if items.is_empty() {
                    return self.render_inverse(block);
                }
                let Some(program) = &block.program else {
                    return Ok(String::new());
                };
                let length = items.len();
                let mut out = String::new();
                for (index, item) in items.iter().enumerate() {
                    let frame = self.frame.iteration_frame(length, index, None);
                    let bindings = [item.clone(), Value::Int(index as i64)];
                    out.push_str(&self.render_program(
                        program,
                        Some(item.clone()),
                        Some(frame),
                        &bindings,
                    )?);
                }
                Ok(out)
            }
            v if v.truthy() => match &block.program {
                Some(program) => {
                    let bindings = [value.clone()];
                    self.render_program(program, Some(value.clone()), None, &bindings)
                }
                None => Ok(String::new()),
            },
            _ => self.render_inverse(block),
        }
    }

    fn render_inverse(&mut self, block: &'p Block) -> Result<String, EvalError> {
        match &block.inverse {
            Some(inverse) => self.render_program(inverse, None, None, &[]),
            None => Ok(String::new()),
        }
    }

    // === Partials ===

    fn eval_partial(&mut self, partial: &'p Partial) -> Result<String, EvalError> {
        let name = match &partial.name {
            PartialName::Path(path) => path.bare_original(),
            PartialName::String(lit) => lit.value.clone(),
            PartialName::Sub(sub) => {
                self.eval_expression(&sub.expression, None, None)?.stringify()
            }
        };

        let partials = self.partials;
        let Some(def) = partials.get(&name) else {
            return Err(EvalError::unknown_partial(&name).with_span(partial.span));
        };
        let program = def.program().map_err(|e| e.with_span(partial.span))?;

        // An explicit first parameter replaces the context; hash arguments
        // overlay it.
        let mut ctx = match partial.params.first() {
            Some(param) => self.eval_param(param)?,
            None => self.current_context().clone(),
        };
        if let Some(hash) = &partial.hash {
            let overlay = self.eval_hash(Some(hash))?;
            ctx = match ctx {
                Value::Object(mut map) => {
                    map.extend(overlay);
                    Value::Object(map)
                }
                _ => Value::Object(overlay),
            };
        }

        // Partials render on a fresh context stack: `..` cannot reach into
        // the including template. Private data carries over as a child frame.
        let saved_ctx = std::mem::replace(&mut self.ctx_stack, vec![ctx]);
        let saved_params = std::mem::take(&mut self.block_param_frames);
        let frame_copy = self.frame.copy();
        let saved_frame = std::mem::replace(&mut self.frame, frame_copy);

        let result = self.render_program(program, None, None, &[]);

        self.ctx_stack = saved_ctx;
        self.block_param_frames = saved_params;
        self.frame = saved_frame;

        let output = result?;
        if partial.indent.is_empty() {
            Ok(output)
        } else {
            Ok(indent_lines(&output, &partial.indent))
        }
    }
}

fn walk<'v>(base: &'v Value, parts: &[String]) -> Option<&'v Value> {
    let mut current = base;
    for part in parts {
        current = current.get_field(part)?;
    }
    Some(current)
}

/// Re-applies a standalone partial's indentation to every output line. The
/// empty line after a trailing newline stays untouched.
fn indent_lines(s: &str, indent: &str) -> String {
    let lines: Vec<&str> = s.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::with_capacity(s.len() + indent.len() * lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.is_empty() && i == last {
            break;
        }
        out.push_str(indent);
        out.push_str(line);
    }
    out
}
