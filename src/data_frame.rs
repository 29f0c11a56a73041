//! Private data frames: the `@`-prefixed values the engine manages alongside
//! the rendering context (`@index`, `@key`, `@first`, `@last`, `@length`).

use std::collections::BTreeMap;

use crate::value::Value;

/// A scoped record of private values, one frame per nested block scope.
///
/// Frames form a chain through owned parents: copying a frame yields a new
/// frame whose parent is the frame copied from, so sibling iteration frames
/// can never alias and writes to a child never leak upward.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    parent: Option<Box<DataFrame>>,
    data: BTreeMap<String, Value>,
}

impl DataFrame {
    pub fn new() -> Self {
        DataFrame::default()
    }

    /// Sets a private value on this frame. Names are stored without the `@`
    /// prefix (`set("cid", ...)` is read as `{{@cid}}`).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Looks a name up on this frame, falling back to the parent chain.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.data.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_deref().and_then(|p| p.get(name)),
        }
    }

    /// A new frame holding a copy of this frame's own values, parented to
    /// this frame.
    pub fn copy(&self) -> DataFrame {
        DataFrame {
            parent: Some(Box::new(self.clone())),
            data: self.data.clone(),
        }
    }

    /// A frame for one iteration step, carrying the standard iteration
    /// values. `key` is the map key or record field name; sequences pass
    /// `None` and expose only `@index`.
    pub(crate) fn iteration_frame(
        &self,
        length: usize,
        index: usize,
        key: Option<Value>,
    ) -> DataFrame {
        let mut frame = self.copy();
        frame.set("index", index as i64);
        frame.set("key", key.unwrap_or(Value::Null));
        frame.set("first", index == 0);
        frame.set("last", index + 1 == length);
        frame.set("length", length as i64);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_fallback() {
        let mut root = DataFrame::new();
        root.set("cid", "42");

        let mut child = root.copy();
        child.set("local", "here");

        assert_eq!(child.get("cid"), Some(&Value::from("42")));
        assert_eq!(child.get("local"), Some(&Value::from("here")));
        assert_eq!(root.get("local"), None);
    }

    #[test]
    fn test_copy_does_not_alias() {
        let mut root = DataFrame::new();
        root.set("n", 1i64);

        let mut a = root.copy();
        a.set("n", 2i64);
        let b = root.copy();

        assert_eq!(a.get("n"), Some(&Value::Int(2)));
        assert_eq!(b.get("n"), Some(&Value::Int(1)));
        assert_eq!(root.get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_iteration_frame() {
        let frame = DataFrame::new().iteration_frame(3, 0, None);
        assert_eq!(frame.get("index"), Some(&Value::Int(0)));
        assert_eq!(frame.get("first"), Some(&Value::Bool(true)));
        assert_eq!(frame.get("last"), Some(&Value::Bool(false)));
        assert_eq!(frame.get("length"), Some(&Value::Int(3)));
        assert_eq!(frame.get("key"), Some(&Value::Null));

        let frame = DataFrame::new().iteration_frame(3, 2, Some(Value::from("k")));
        assert_eq!(frame.get("last"), Some(&Value::Bool(true)));
        assert_eq!(frame.get("key"), Some(&Value::from("k")));
    }
}
