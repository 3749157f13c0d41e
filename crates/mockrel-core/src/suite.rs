//! Named collections of test methods
//!
//! A [`TestSuite`] is the target of class-level decoration: a named table
//! of members, some callable, some plain values. Decorating a suite wraps
//! every callable member whose name carries the test prefix and leaves the
//! rest untouched.

use crate::patch::PatchHandle;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Test method taking a context and the substitution handles
pub type TestFn<T> = Arc<dyn Fn(&mut T, &[PatchHandle]) -> anyhow::Result<()> + Send + Sync>;

/// Suite member
pub enum Member<T> {
    /// Callable member
    Method(TestFn<T>),
    /// Plain value
    Value(serde_json::Value),
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Method(f) => Self::Method(Arc::clone(f)),
            Self::Value(v) => Self::Value(v.clone()),
        }
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method(..)"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Named, ordered table of test members
#[derive(Debug, Clone)]
pub struct TestSuite<T> {
    name: String,
    members: IndexMap<String, Member<T>>,
}

impl<T: 'static> TestSuite<T> {
    /// Create empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    /// Add a method that ignores substitution handles
    #[must_use]
    pub fn method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.method_with_mocks(name, move |ctx, _| body(ctx))
    }

    /// Add a method receiving substitution handles
    #[must_use]
    pub fn method_with_mocks<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut T, &[PatchHandle]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.members.insert(name.into(), Member::Method(Arc::new(body)));
        self
    }

    /// Add a plain value
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.members.insert(name.into(), Member::Value(value));
        self
    }

    /// Suite name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Member<T>> {
        self.members.get(name)
    }

    /// Member names in declaration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.members.keys().map(String::as_str).collect()
    }

    /// Callable members whose name starts with `prefix`
    #[must_use]
    pub fn test_names(&self, prefix: &str) -> Vec<&str> {
        self.members
            .iter()
            .filter(|(name, member)| name.starts_with(prefix) && matches!(member, Member::Method(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Call a member
    ///
    /// # Errors
    /// Returns the method's error, or an error if the member is missing or
    /// not callable
    pub fn run(&self, name: &str, ctx: &mut T) -> anyhow::Result<()> {
        match self.members.get(name) {
            Some(Member::Method(body)) => body(ctx, &[]),
            Some(Member::Value(_)) => anyhow::bail!("'{}.{name}' is not callable", self.name),
            None => anyhow::bail!("'{}' has no member '{name}'", self.name),
        }
    }

    /// Run every test with a fresh context, collecting outcomes
    pub fn run_all<F>(&self, prefix: &str, mut make_ctx: F) -> Vec<(String, anyhow::Result<()>)>
    where
        F: FnMut() -> T,
    {
        self.test_names(prefix)
            .into_iter()
            .map(|name| {
                let mut ctx = make_ctx();
                (name.to_string(), self.run(name, &mut ctx))
            })
            .collect()
    }

    /// Replace callable members matching `prefix` with `wrap(member)`
    #[must_use]
    pub(crate) fn map_methods<F>(mut self, prefix: &str, wrap: F) -> Self
    where
        F: Fn(TestFn<T>) -> TestFn<T>,
    {
        for (name, member) in &mut self.members {
            if !name.starts_with(prefix) {
                continue;
            }
            if let Member::Method(body) = member {
                *body = wrap(Arc::clone(body));
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suite() -> TestSuite<Vec<&'static str>> {
        TestSuite::new("OrderTests")
            .method("test_a", |log: &mut Vec<&'static str>| {
                log.push("a");
                Ok(())
            })
            .method("helper", |log: &mut Vec<&'static str>| {
                log.push("helper");
                Ok(())
            })
            .value("test_fixture", json!({"id": 1}))
            .method("test_fails", |_| anyhow::bail!("nope"))
    }

    #[test]
    fn test_names_skip_values_and_helpers() {
        assert_eq!(suite().test_names("test"), ["test_a", "test_fails"]);
    }

    #[test]
    fn run_dispatches_by_name() {
        let suite = suite();
        let mut log = Vec::new();
        suite.run("test_a", &mut log).unwrap();
        suite.run("helper", &mut log).unwrap();
        assert_eq!(log, ["a", "helper"]);
    }

    #[test]
    fn run_rejects_values_and_missing() {
        let suite = suite();
        let mut log = Vec::new();
        assert!(suite.run("test_fixture", &mut log).is_err());
        assert!(suite.run("test_ghost", &mut log).is_err());
    }

    #[test]
    fn run_all_collects_outcomes() {
        let outcomes = suite().run_all("test", Vec::new);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.is_ok());
        assert!(outcomes[1].1.is_err());
    }

    #[test]
    fn map_methods_only_touches_prefixed() {
        let wrapped = suite().map_methods("test", |body| {
            let outer: TestFn<Vec<&'static str>> =
                Arc::new(move |log: &mut Vec<&'static str>, handles: &[PatchHandle]| {
                    log.push("wrap");
                    body(log, handles)
                });
            outer
        });
        let mut log = Vec::new();
        wrapped.run("test_a", &mut log).unwrap();
        wrapped.run("helper", &mut log).unwrap();
        assert_eq!(log, ["wrap", "a", "helper"]);
        assert!(matches!(wrapped.get("test_fixture"), Some(Member::Value(_))));
    }
}
