//! Logic-less templating with Handlebars semantics: mustache interpolation
//! with automatic HTML escaping, blocks with `{{else}}` branches, helper
//! dispatch, partials, and whitespace control.
//!
//! ```
//! use brace::Template;
//!
//! let template = Template::parse("Hello, {{name}}!").unwrap();
//! let output = template.render(serde_json::json!({"name": "world"})).unwrap();
//! assert_eq!(output, "Hello, world!");
//! ```
//!
//! Context data enters through `serde::Serialize` and is queried with
//! dotted paths; `../` ascends the context stack and `@`-paths read the
//! private data the engine maintains during iteration:
//!
//! ```
//! use brace::Template;
//!
//! let template = Template::parse("{{#each items}}{{@index}}:{{name}} {{/each}}").unwrap();
//! let output = template
//!     .render(serde_json::json!({"items": [{"name": "a"}, {"name": "b"}]}))
//!     .unwrap();
//! assert_eq!(output, "0:a 1:b ");
//! ```

pub mod ast;
mod data_frame;
mod error;
mod escape;
mod eval;
mod helpers;
pub mod parser;
mod value;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::Serialize;

pub use data_frame::DataFrame;
pub use error::{ConfigError, EvalError, EvalErrorKind, ParseError, ParseErrorKind};
pub use escape::escape;
pub use helpers::{Helper, Options, ParamKind};
pub use value::{to_value, Kind, Value};

use ast::Program;
use eval::Evaluator;

/// A partial's definition. Source-registered partials compile lazily on
/// first use and cache the result for the lifetime of the registration.
pub(crate) struct PartialDef {
    source: String,
    compiled: OnceLock<Result<Program, ParseError>>,
}

impl PartialDef {
    fn from_source(source: String) -> Self {
        Self { source, compiled: OnceLock::new() }
    }

    fn from_program(program: Program) -> Self {
        Self { source: String::new(), compiled: OnceLock::from(Ok(program)) }
    }

    pub(crate) fn program(&self) -> Result<&Program, EvalError> {
        match self.compiled.get_or_init(|| parser::parse(&self.source)) {
            Ok(program) => Ok(program),
            Err(err) => Err(EvalError::new(
                EvalErrorKind::PartialSyntax,
                format!("partial failed to parse: {}", err),
            )),
        }
    }
}

/// A compiled template plus its helper and partial registries.
///
/// Registration goes through interior locks, so a `Template` shared behind
/// an `Arc` can be rendered from many threads; each render works on a
/// snapshot of the registries taken when it starts.
pub struct Template {
    source: String,
    program: Program,
    helpers: RwLock<HashMap<String, Arc<Helper>>>,
    partials: RwLock<HashMap<String, Arc<PartialDef>>>,
}

impl Template {
    /// Compiles template source. The builtin helpers (`if`, `unless`,
    /// `with`, `each`, `log`, `lookup`, `equal`) come pre-registered.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let program = parser::parse(source)?;
        let mut builtin_map = HashMap::new();
        for (name, helper) in helpers::builtins() {
            builtin_map.insert(name.to_string(), Arc::new(helper));
        }
        Ok(Self {
            source: source.to_string(),
            program,
            helpers: RwLock::new(builtin_map),
            partials: RwLock::new(HashMap::new()),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled tree, e.g. for [`ast::dump`].
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Registers a helper. Names are taken once: re-registering (including
    /// shadowing a builtin) is a configuration error.
    pub fn register_helper(&self, name: &str, helper: Helper) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::new("helper name must not be empty"));
        }
        let mut map = self.helpers.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(name) {
            return Err(ConfigError::new(format!("helper '{}' is already registered", name)));
        }
        map.insert(name.to_string(), Arc::new(helper));
        Ok(())
    }

    /// Registers a partial from source. Compilation is deferred to the
    /// first `{{> name}}` that uses it.
    pub fn register_partial(&self, name: &str, source: &str) -> Result<(), ConfigError> {
        self.insert_partial(name, PartialDef::from_source(source.to_string()))
    }

    /// Registers an already-compiled template as a partial.
    pub fn register_partial_template(
        &self,
        name: &str,
        template: Template,
    ) -> Result<(), ConfigError> {
        self.insert_partial(name, PartialDef::from_program(template.program))
    }

    fn insert_partial(&self, name: &str, def: PartialDef) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::new("partial name must not be empty"));
        }
        let mut map = self.partials.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(name) {
            return Err(ConfigError::new(format!("partial '{}' is already registered", name)));
        }
        map.insert(name.to_string(), Arc::new(def));
        Ok(())
    }

    /// Renders with any serializable context.
    pub fn render<T: Serialize>(&self, data: T) -> Result<String, EvalError> {
        let ctx = to_value(data).map_err(|err| {
            EvalError::new(
                EvalErrorKind::InvalidContext,
                format!("context is not serializable: {}", err),
            )
        })?;
        self.render_value(ctx, DataFrame::new())
    }

    /// Renders with an explicit context value and a pre-populated private
    /// data frame.
    pub fn render_with(&self, ctx: Value, frame: DataFrame) -> Result<String, EvalError> {
        self.render_value(ctx, frame)
    }

    fn render_value(&self, ctx: Value, frame: DataFrame) -> Result<String, EvalError> {
        let helpers = self.helpers.read().unwrap_or_else(PoisonError::into_inner).clone();
        let partials = self.partials.read().unwrap_or_else(PoisonError::into_inner).clone();

        // Helpers run user code; a panic there must not tear down the host.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut evaluator = Evaluator::new(&helpers, &partials, ctx, frame);
            evaluator.render(&self.program)
        }));
        match result {
            Ok(render) => render,
            Err(_) => Err(EvalError::internal("a helper panicked during render")),
        }
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template").field("source", &self.source).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> String {
        Template::parse(source).unwrap().render(data).unwrap()
    }

    #[test]
    fn test_escaped_and_raw_interpolation() {
        assert_eq!(render("{{x}}", json!({"x": "a<b"})), "a&lt;b");
        assert_eq!(render("{{{x}}}", json!({"x": "a<b"})), "a<b");
        assert_eq!(render("{{& x}}", json!({"x": "a<b"})), "a<b");
    }

    #[test]
    fn test_parent_path() {
        let out = render(
            "{{#with inner}}{{value}}/{{../outer}}{{/with}}",
            json!({"inner": {"value": "i"}, "outer": "o"}),
        );
        assert_eq!(out, "i/o");
    }

    #[test]
    fn test_too_deep_parent_is_empty() {
        assert_eq!(render("{{../missing}}", json!({})), "");
    }

    #[test]
    fn test_data_root() {
        let out = render(
            "{{#each items}}{{@root.name}}{{/each}}",
            json!({"items": [1, 2], "name": "r"}),
        );
        assert_eq!(out, "rr");
    }

    #[test]
    fn test_custom_helper_and_safe_string() {
        let template = Template::parse("{{bold text}}").unwrap();
        template
            .register_helper(
                "bold",
                Helper::new(vec![ParamKind::String], |options| {
                    Ok(Value::Safe(format!("<b>{}</b>", escape(&options.param(0).stringify()))))
                }),
            )
            .unwrap();
        assert_eq!(template.render(json!({"text": "hi"})).unwrap(), "<b>hi</b>");
    }

    #[test]
    fn test_helper_arity_error() {
        let template = Template::parse("{{lookup a}}").unwrap();
        let err = template.render(json!({"a": {}})).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::HelperArity);
        assert!(err.to_string().contains("needed 2 but got 1"));
    }

    #[test]
    fn test_duplicate_registrations_rejected() {
        let template = Template::parse("x").unwrap();
        assert!(template.register_helper("if", Helper::variadic(vec![], |o| o.block().map(Value::String))).is_err());
        template.register_partial("p", "body").unwrap();
        assert!(template.register_partial("p", "other").is_err());
    }

    #[test]
    fn test_partial_render_and_context() {
        let template = Template::parse("{{> item entry}}").unwrap();
        template.register_partial("item", "[{{name}}]").unwrap();
        assert_eq!(template.render(json!({"entry": {"name": "n"}})).unwrap(), "[n]");
    }

    #[test]
    fn test_partial_hash_overlay() {
        let template = Template::parse("{{> greet name=\"o\"}}").unwrap();
        template.register_partial("greet", "{{greeting}} {{name}}").unwrap();
        assert_eq!(template.render(json!({"greeting": "hi", "name": "x"})).unwrap(), "hi o");
    }

    #[test]
    fn test_unknown_partial() {
        let template = Template::parse("{{> nope}}").unwrap();
        let err = template.render(json!({})).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownPartial);
    }

    #[test]
    fn test_partial_syntax_surfaces_at_render() {
        let template = Template::parse("{{> broken}}").unwrap();
        template.register_partial("broken", "{{#if x}}").unwrap();
        let err = template.render(json!({})).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::PartialSyntax);
    }

    #[test]
    fn test_self_including_partial_hits_depth_limit() {
        let template = Template::parse("{{> loop}}").unwrap();
        template.register_partial("loop", "{{> loop}}").unwrap();
        let err = template.render(json!({})).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TooMuchRecursion);
    }

    #[test]
    fn test_deep_nesting_within_limit_still_renders() {
        let levels = 100;
        let mut source = String::new();
        for _ in 0..levels {
            source.push_str("{{#if t}}");
        }
        source.push('x');
        for _ in 0..levels {
            source.push_str("{{/if}}");
        }
        let template = Template::parse(&source).unwrap();
        assert_eq!(template.render(json!({"t": true})).unwrap(), "x");
    }

    #[test]
    fn test_panicking_helper_is_contained() {
        let template = Template::parse("{{boom}}").unwrap();
        template
            .register_helper("boom", Helper::new(vec![], |_| panic!("helper bug")))
            .unwrap();
        let err = template.render(json!({})).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Internal);
    }

    #[test]
    fn test_render_with_seeded_data_frame() {
        let template = Template::parse("{{@cid}}").unwrap();
        let mut frame = DataFrame::new();
        frame.set("cid", "42");
        let out = template.render_with(Value::Object(Default::default()), frame).unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn test_concurrent_renders() {
        let template = std::sync::Arc::new(Template::parse("{{#each xs}}{{this}}{{/each}}").unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let template = template.clone();
                std::thread::spawn(move || template.render(json!({"xs": [1, 2, 3]})).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "123");
        }
    }
}
