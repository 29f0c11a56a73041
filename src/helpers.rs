//! Helper registration and the builtin helper set.

use std::collections::BTreeMap;

use crate::ast::Program;
use crate::data_frame::DataFrame;
use crate::error::{EvalError, EvalErrorKind};
use crate::eval::Evaluator;
use crate::value::{Kind, Value};

/// Declared shape of one helper parameter. `Any` passes the value through;
/// the typed kinds coerce or reject at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Any,
    /// Coerced to the canonical string form.
    String,
    Number,
    Bool,
}

type HelperFn = Box<dyn Fn(&mut Options) -> Result<Value, EvalError> + Send + Sync>;

/// A registered helper: a parameter signature plus the function itself.
///
/// The signature is checked on every call. A fixed-arity helper invoked with
/// the wrong number of arguments fails the whole render; a variadic helper
/// only enforces its required minimum.
pub struct Helper {
    params: Vec<ParamKind>,
    variadic: bool,
    func: HelperFn,
}

impl Helper {
    pub fn new(
        params: Vec<ParamKind>,
        func: impl Fn(&mut Options) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self { params, variadic: false, func: Box::new(func) }
    }

    /// A helper accepting `required` parameters plus any number of extras.
    pub fn variadic(
        required: Vec<ParamKind>,
        func: impl Fn(&mut Options) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self { params: required, variadic: true, func: Box::new(func) }
    }

    pub(crate) fn call(&self, name: &str, options: &mut Options) -> Result<Value, EvalError> {
        let actual = options.params.len();
        let expected = self.params.len();
        let arity_ok = if self.variadic { actual >= expected } else { actual == expected };
        if !arity_ok {
            return Err(EvalError::helper_arity(name, expected, actual));
        }

        for (i, kind) in self.params.iter().enumerate() {
            coerce(name, i, *kind, &mut options.params[i])?;
        }

        (self.func)(options)
    }
}

impl std::fmt::Debug for Helper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Helper")
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .finish_non_exhaustive()
    }
}

fn coerce(name: &str, index: usize, kind: ParamKind, value: &mut Value) -> Result<(), EvalError> {
    match kind {
        ParamKind::Any => Ok(()),
        ParamKind::String => {
            if !matches!(value, Value::String(_) | Value::Safe(_)) {
                *value = Value::String(value.stringify());
            }
            Ok(())
        }
        ParamKind::Number => match value.kind() {
            Kind::Number => Ok(()),
            got => Err(type_mismatch(name, index, "number", got)),
        },
        ParamKind::Bool => match value.kind() {
            Kind::Bool => Ok(()),
            got => Err(type_mismatch(name, index, "boolean", got)),
        },
    }
}

fn type_mismatch(name: &str, index: usize, expected: &str, got: Kind) -> EvalError {
    EvalError::new(
        EvalErrorKind::TypeMismatch,
        format!(
            "helper '{}': parameter {} must be a {}, got {}",
            name,
            index + 1,
            expected,
            got.as_str()
        ),
    )
}

/// Call-time view a helper gets: evaluated parameters, the hash, and access
/// to the surrounding evaluation (context, private data, block rendering).
pub struct Options<'a, 'p> {
    pub(crate) eval: &'a mut Evaluator<'p>,
    pub(crate) params: Vec<Value>,
    pub(crate) hash: BTreeMap<String, Value>,
    pub(crate) program: Option<&'p Program>,
    pub(crate) inverse: Option<&'p Program>,
}

impl<'a, 'p> Options<'a, 'p> {
    /// The parameter at `index`, or null past the end.
    pub fn param(&self, index: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.params.get(index).unwrap_or(&NULL)
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn hash(&self) -> &BTreeMap<String, Value> {
        &self.hash
    }

    pub fn hash_prop(&self, name: &str) -> Option<&Value> {
        self.hash.get(name)
    }

    /// The current rendering context.
    pub fn context(&self) -> Value {
        self.eval.current_context().clone()
    }

    /// A private data value visible from the current frame.
    pub fn data(&self, name: &str) -> Option<Value> {
        self.eval.data_frame().get(name).cloned()
    }

    pub fn data_frame(&self) -> &DataFrame {
        self.eval.data_frame()
    }

    /// True when invoked in block form.
    pub fn is_block(&self) -> bool {
        self.program.is_some() || self.inverse.is_some()
    }

    /// Renders the block body against the current context.
    pub fn block(&mut self) -> Result<String, EvalError> {
        match self.program {
            Some(program) => self.eval.render_program(program, None, None, &[]),
            None => Ok(String::new()),
        }
    }

    /// Renders the block body with `ctx` pushed as the current context. The
    /// first block parameter, when declared, is bound to `ctx`.
    pub fn block_with(&mut self, ctx: &Value) -> Result<String, EvalError> {
        match self.program {
            Some(program) => {
                self.eval.render_program(program, Some(ctx.clone()), None, &[ctx.clone()])
            }
            None => Ok(String::new()),
        }
    }

    /// Renders the block body with a context, a private data frame, and the
    /// block parameter bindings for one iteration step.
    pub fn block_with_frame(
        &mut self,
        ctx: &Value,
        frame: DataFrame,
        block_param_values: &[Value],
    ) -> Result<String, EvalError> {
        match self.program {
            Some(program) => {
                self.eval.render_program(program, Some(ctx.clone()), Some(frame), block_param_values)
            }
            None => Ok(String::new()),
        }
    }

    /// Renders the `{{else}}` branch against the current context.
    pub fn inverse(&mut self) -> Result<String, EvalError> {
        match self.inverse {
            Some(program) => self.eval.render_program(program, None, None, &[]),
            None => Ok(String::new()),
        }
    }
}

// === Builtins ===

pub(crate) fn builtins() -> Vec<(&'static str, Helper)> {
    vec![
        ("if", Helper::new(vec![ParamKind::Any], if_helper)),
        ("unless", Helper::new(vec![ParamKind::Any], unless_helper)),
        ("with", Helper::new(vec![ParamKind::Any], with_helper)),
        ("each", Helper::new(vec![ParamKind::Any], each_helper)),
        ("log", Helper::variadic(vec![], log_helper)),
        ("lookup", Helper::new(vec![ParamKind::Any, ParamKind::String], lookup_helper)),
        ("equal", Helper::new(vec![ParamKind::Any, ParamKind::Any], equal_helper)),
    ]
}

/// `includeZero=true` makes a numeric zero condition render the main branch.
fn condition(options: &Options) -> bool {
    let value = options.param(0);
    if value.truthy() {
        return true;
    }
    let include_zero = options.hash_prop("includeZero").map(Value::truthy).unwrap_or(false);
    if !include_zero {
        return false;
    }
    matches!(value, Value::Int(0)) || matches!(value, Value::Float(f) if *f == 0.0)
}

fn if_helper(options: &mut Options) -> Result<Value, EvalError> {
    if condition(options) {
        options.block().map(Value::String)
    } else {
        options.inverse().map(Value::String)
    }
}

fn unless_helper(options: &mut Options) -> Result<Value, EvalError> {
    if condition(options) {
        options.inverse().map(Value::String)
    } else {
        options.block().map(Value::String)
    }
}

fn with_helper(options: &mut Options) -> Result<Value, EvalError> {
    let ctx = options.param(0).clone();
    if ctx.truthy() {
        options.block_with(&ctx).map(Value::String)
    } else {
        options.inverse().map(Value::String)
    }
}

fn each_helper(options: &mut Options) -> Result<Value, EvalError> {
    let value = options.param(0).clone();
    let mut out = String::new();

    match &value {
        Value::Array(items) => {
            if items.is_empty() {
                return options.inverse().map(Value::String);
            }
            let length = items.len();
            for (index, item) in items.iter().enumerate() {
                let frame = options.data_frame().iteration_frame(length, index, None);
                let bindings = [item.clone(), Value::Int(index as i64)];
                out.push_str(&options.block_with_frame(item, frame, &bindings)?);
            }
        }
        Value::Object(map) => {
            if map.is_empty() {
                return options.inverse().map(Value::String);
            }
            let length = map.len();
            for (index, (key, item)) in map.iter().enumerate() {
                let frame = options
                    .data_frame()
                    .iteration_frame(length, index, Some(Value::from(key.clone())));
                let bindings = [item.clone(), Value::from(key.clone())];
                out.push_str(&options.block_with_frame(item, frame, &bindings)?);
            }
        }
        // An uniterable truthy subject renders neither branch.
        v if v.truthy() => {}
        _ => return options.inverse().map(Value::String),
    }

    Ok(Value::String(out))
}

fn log_helper(options: &mut Options) -> Result<Value, EvalError> {
    let line =
        options.params().iter().map(Value::stringify).collect::<Vec<_>>().join(" ");
    tracing::info!("{}", line);
    Ok(Value::String(String::new()))
}

fn lookup_helper(options: &mut Options) -> Result<Value, EvalError> {
    let key = options.param(1).stringify();
    Ok(options.param(0).get_field(&key).cloned().unwrap_or(Value::Null))
}

/// Compares the canonical string forms, so `{{#equal count "3"}}` works
/// across value kinds.
fn equal_helper(options: &mut Options) -> Result<Value, EvalError> {
    let equal = options.param(0).stringify() == options.param(1).stringify();
    if options.is_block() {
        if equal {
            options.block().map(Value::String)
        } else {
            options.inverse().map(Value::String)
        }
    } else {
        Ok(Value::Bool(equal))
    }
}
