//! Composite patch lifecycle
//!
//! [`PatcherChain`] owns an ordered list of [`Patch`]es and activates them
//! as one unit. `start` applies them in declaration order and `stop`
//! reverts them in reverse, so a substitution is never torn down while a
//! later one still shadows it. Every other protocol is a thin adapter over
//! that pair:
//!
//! - scoped: [`PatcherChain::enter`] returns a [`ChainGuard`] that stops the
//!   chain on [`ChainGuard::exit`] or on drop, including during unwinding
//! - callable: [`PatcherChain::decorate`] and
//!   [`PatcherChain::decorate_with_mocks`] wrap a test body
//! - suite: [`PatcherChain::decorate_suite`] wraps every test method
//! - manual: [`PatcherChain::start`] / [`PatcherChain::stop`]
//!
//! Activation mutates bindings on shared model classes. Two chains touching
//! the same model must not be active on different threads at once.

use crate::config::MockConfig;
use crate::error::PatchResult;
use crate::patch::{Patch, PatchEntry, PatchHandle, PatchTarget};
use crate::state::{validate_transition, ChainState};
use crate::suite::{TestFn, TestSuite};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct ChainOptions {
    pass_mocks: bool,
    rollback_on_failure: bool,
    test_prefix: String,
}

impl From<&MockConfig> for ChainOptions {
    fn from(config: &MockConfig) -> Self {
        Self {
            pass_mocks: config.pass_mocks,
            rollback_on_failure: config.rollback_on_failure,
            test_prefix: config.test_prefix.clone(),
        }
    }
}

#[derive(Debug)]
struct ChainRun {
    state: ChainState,
    /// Patches applied by the last activation, counted from the front
    started: usize,
}

struct ChainInner {
    patches: Vec<Box<dyn Patch>>,
    options: ChainOptions,
    run: Mutex<ChainRun>,
}

/// Ordered set of patches activated and deactivated as one unit
///
/// Cloning yields another handle to the same chain and lifecycle.
#[derive(Clone)]
pub struct PatcherChain {
    inner: Arc<ChainInner>,
}

impl PatcherChain {
    /// Chain over `patches` that passes substitution handles to wrapped
    /// callables
    #[must_use]
    pub fn new(patches: Vec<Box<dyn Patch>>) -> Self {
        Self::with_config(patches, &MockConfig::default().with_pass_mocks(true))
    }

    /// Chain over `patches` using `config` for handle passing, rollback and
    /// the suite test prefix
    #[must_use]
    pub fn with_config(patches: Vec<Box<dyn Patch>>, config: &MockConfig) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                patches,
                options: ChainOptions::from(config),
                run: Mutex::new(ChainRun {
                    state: ChainState::Planned,
                    started: 0,
                }),
            }),
        }
    }

    /// Chain of [`crate::AttributePatch`]es for planned entries
    #[must_use]
    pub fn from_entries(entries: Vec<PatchEntry>, config: &MockConfig) -> Self {
        let patches = entries
            .into_iter()
            .map(|entry| Box::new(entry.into_patch()) as Box<dyn Patch>)
            .collect();
        Self::with_config(patches, config)
    }

    /// Number of patches
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.patches.len()
    }

    /// Check if chain holds no patches
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.patches.is_empty()
    }

    /// Whether wrapped callables receive the substitution handles
    #[inline]
    #[must_use]
    pub fn pass_mocks(&self) -> bool {
        self.inner.options.pass_mocks
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.inner.run.lock().state
    }

    /// Patch targets in activation order
    #[must_use]
    pub fn targets(&self) -> Vec<PatchTarget> {
        self.inner.patches.iter().map(|p| p.target()).collect()
    }

    /// Apply every patch in order
    ///
    /// # Errors
    /// Returns `IllegalTransition` if already active, or the first patch
    /// failure. On failure the patches applied so far are reverted when
    /// rollback is enabled; otherwise they stay applied and the chain is
    /// marked active so [`Self::stop`] can revert them.
    pub fn start(&self) -> PatchResult<Vec<PatchHandle>> {
        let mut run = self.inner.run.lock();
        validate_transition(run.state, ChainState::Active)?;

        let patches = &self.inner.patches;
        let mut handles = Vec::with_capacity(patches.len());
        for (index, patch) in patches.iter().enumerate() {
            match patch.start() {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    if self.inner.options.rollback_on_failure {
                        warn!(
                            patch = %patch.target(),
                            error = %err,
                            rolled_back = index,
                            "patch activation failed; rolling back"
                        );
                        if let Err(rollback) = unwind(&patches[..index]) {
                            warn!(
                                patch = %patch.target(),
                                error = %rollback,
                                "rollback incomplete; activation error takes precedence"
                            );
                        }
                    } else {
                        warn!(
                            patch = %patch.target(),
                            error = %err,
                            left_active = index,
                            "patch activation failed; chain left partially active"
                        );
                        run.state = ChainState::Active;
                        run.started = index;
                    }
                    return Err(err);
                }
            }
        }

        run.state = ChainState::Active;
        run.started = patches.len();
        debug!(patches = patches.len(), "patcher chain activated");
        Ok(handles)
    }

    /// Revert every applied patch in reverse order
    ///
    /// All applied patches are reverted even if some fail.
    ///
    /// # Errors
    /// Returns `IllegalTransition` if not active, or the first revert
    /// failure.
    pub fn stop(&self) -> PatchResult<()> {
        let mut run = self.inner.run.lock();
        validate_transition(run.state, ChainState::Inactive)?;
        let started = std::mem::take(&mut run.started);
        run.state = ChainState::Inactive;

        let result = unwind(&self.inner.patches[..started]);
        debug!(patches = started, "patcher chain deactivated");
        result
    }

    /// Activate and return a guard that deactivates on exit or drop
    ///
    /// # Errors
    /// Returns the activation error; nothing stays applied unless rollback
    /// is disabled.
    pub fn enter(&self) -> PatchResult<ChainGuard<'_>> {
        let handles = self.start()?;
        Ok(ChainGuard {
            chain: self,
            handles,
            exited: false,
        })
    }

    /// Run `f` with the chain active
    ///
    /// The chain is deactivated before this returns, and before a panic in
    /// `f` propagates.
    ///
    /// # Errors
    /// Returns activation or deactivation errors.
    pub fn scope<R>(&self, f: impl FnOnce(&[PatchHandle]) -> R) -> PatchResult<R> {
        let guard = self.enter()?;
        let out = f(guard.handles());
        guard.exit()?;
        Ok(out)
    }

    /// Wrap a test body so each call runs with the chain active
    pub fn decorate<T, R, F>(&self, f: F) -> impl Fn(&mut T) -> anyhow::Result<R>
    where
        F: Fn(&mut T) -> anyhow::Result<R>,
    {
        let chain = self.clone();
        move |ctx: &mut T| chain.run(ctx, &[], |ctx, _| f(ctx))
    }

    /// Wrap a test body that takes the substitution handles
    ///
    /// The body sees an empty slice when the chain does not pass mocks.
    pub fn decorate_with_mocks<T, R, F>(&self, f: F) -> impl Fn(&mut T) -> anyhow::Result<R>
    where
        F: Fn(&mut T, &[PatchHandle]) -> anyhow::Result<R>,
    {
        let chain = self.clone();
        move |ctx: &mut T| chain.run(ctx, &[], &f)
    }

    /// Wrap every test method of `suite`
    ///
    /// Methods whose name starts with the configured test prefix are
    /// wrapped; other members are returned untouched. Handles injected by
    /// an outer decoration are passed through ahead of this chain's own.
    #[must_use]
    pub fn decorate_suite<T: 'static>(&self, suite: TestSuite<T>) -> TestSuite<T> {
        debug!(suite = suite.name(), "decorating test suite");
        let prefix = self.inner.options.test_prefix.clone();
        suite.map_methods(&prefix, |body| {
            let chain = self.clone();
            let wrapped: TestFn<T> = Arc::new(move |ctx: &mut T, injected: &[PatchHandle]| {
                chain.run(ctx, injected, &*body)
            });
            wrapped
        })
    }

    fn run<T, R, F>(&self, ctx: &mut T, injected: &[PatchHandle], body: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut T, &[PatchHandle]) -> anyhow::Result<R>,
    {
        let guard = self.enter()?;
        let outcome = if self.pass_mocks() {
            let mut handles = injected.to_vec();
            handles.extend_from_slice(guard.handles());
            body(ctx, &handles)
        } else {
            body(ctx, injected)
        };

        match (outcome, guard.exit()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(stop_err)) => {
                warn!(error = %stop_err, "deactivation failed after test failure");
                Err(err)
            }
        }
    }
}

/// Stop `patches` in reverse, returning the first failure
fn unwind(patches: &[Box<dyn Patch>]) -> PatchResult<()> {
    let mut first = None;
    for patch in patches.iter().rev() {
        if let Err(err) = patch.stop() {
            warn!(patch = %patch.target(), error = %err, "patch deactivation failed");
            first.get_or_insert(err);
        }
    }
    first.map_or(Ok(()), Err)
}

impl fmt::Debug for PatcherChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatcherChain")
            .field("patches", &self.inner.patches)
            .field("options", &self.inner.options)
            .field("state", &self.state())
            .finish()
    }
}

/// Active chain scope
///
/// Deactivates the chain when [`ChainGuard::exit`] is called or the guard
/// is dropped.
#[derive(Debug)]
pub struct ChainGuard<'a> {
    chain: &'a PatcherChain,
    handles: Vec<PatchHandle>,
    exited: bool,
}

impl ChainGuard<'_> {
    /// Substitution handles in activation order
    #[inline]
    #[must_use]
    pub fn handles(&self) -> &[PatchHandle] {
        &self.handles
    }

    /// Deactivate, reporting failures
    ///
    /// # Errors
    /// Returns the first deactivation error.
    pub fn exit(mut self) -> PatchResult<()> {
        self.exited = true;
        self.chain.stop()
    }
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        if let Err(err) = self.chain.stop() {
            warn!(error = %err, "patcher chain deactivation failed on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchError;
    use mockrel_model::Attribute;
    use serde_json::json;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Debug)]
    struct Recording {
        name: &'static str,
        log: Log,
        fail_start: bool,
        fail_stop: bool,
    }

    impl Patch for Recording {
        fn target(&self) -> PatchTarget {
            PatchTarget::new("Fake", self.name)
        }

        fn start(&self) -> PatchResult<PatchHandle> {
            if self.fail_start {
                return Err(PatchError::attribute_not_found("Fake", self.name));
            }
            self.log.lock().push(format!("start {}", self.name));
            Ok(PatchHandle::new(
                self.target(),
                Attribute::Value(json!(self.name)),
            ))
        }

        fn stop(&self) -> PatchResult<()> {
            self.log.lock().push(format!("stop {}", self.name));
            if self.fail_stop {
                return Err(PatchError::NotStarted {
                    target: "Fake".into(),
                    attribute: self.name.into(),
                });
            }
            Ok(())
        }
    }

    fn patches(log: &Log, names: &[&'static str], failing: Option<&str>) -> Vec<Box<dyn Patch>> {
        names
            .iter()
            .map(|&name| {
                Box::new(Recording {
                    name,
                    log: Arc::clone(log),
                    fail_start: failing == Some(name),
                    fail_stop: false,
                }) as Box<dyn Patch>
            })
            .collect()
    }

    fn stops(log: &Log) -> Vec<String> {
        log.lock()
            .iter()
            .filter(|line| line.starts_with("stop"))
            .cloned()
            .collect()
    }

    #[test]
    fn teardown_mirrors_activation() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1", "p2", "p3"], None));

        let handles = chain.start().unwrap();
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[0].target().attribute, "p1");
        chain.stop().unwrap();

        assert_eq!(
            *log.lock(),
            ["start p1", "start p2", "start p3", "stop p3", "stop p2", "stop p1"]
        );
    }

    #[test]
    fn guard_exit_and_drop_deactivate() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1", "p2"], None));

        let guard = chain.enter().unwrap();
        assert_eq!(chain.state(), ChainState::Active);
        guard.exit().unwrap();
        assert_eq!(chain.state(), ChainState::Inactive);

        {
            let _guard = chain.enter().unwrap();
        }
        assert_eq!(chain.state(), ChainState::Inactive);
        assert_eq!(stops(&log).len(), 4);
    }

    #[test]
    fn panic_in_scope_still_deactivates() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1", "p2", "p3"], None));

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            chain.scope(|_| panic!("boom")).ok();
        }));

        assert!(outcome.is_err());
        assert_eq!(stops(&log), ["stop p3", "stop p2", "stop p1"]);
        assert_eq!(chain.state(), ChainState::Inactive);
    }

    #[test]
    fn failed_start_rolls_back_by_default() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1", "p2", "p3"], Some("p3")));

        let err = chain.start().unwrap_err();
        assert!(err.is_activation_failure());
        assert_eq!(stops(&log), ["stop p2", "stop p1"]);
        assert_eq!(chain.state(), ChainState::Planned);
    }

    #[test]
    fn incomplete_rollback_reports_activation_error() {
        let log = Log::default();
        let recording = |name, fail_start, fail_stop| {
            Box::new(Recording {
                name,
                log: Arc::clone(&log),
                fail_start,
                fail_stop,
            }) as Box<dyn Patch>
        };
        let chain = PatcherChain::new(vec![
            recording("p1", false, false),
            recording("p2", false, true),
            recording("p3", true, false),
        ]);

        let err = chain.start().unwrap_err();
        assert!(matches!(err, PatchError::AttributeNotFound { .. }));
        assert_eq!(stops(&log), ["stop p2", "stop p1"]);
        assert_eq!(chain.state(), ChainState::Planned);
    }

    #[test]
    fn failed_start_without_rollback_leaves_started_active() {
        let log = Log::default();
        let config = MockConfig::default().with_rollback_on_failure(false);
        let chain =
            PatcherChain::with_config(patches(&log, &["p1", "p2", "p3"], Some("p3")), &config);

        assert!(chain.start().is_err());
        assert!(stops(&log).is_empty());
        assert_eq!(chain.state(), ChainState::Active);

        chain.stop().unwrap();
        assert_eq!(stops(&log), ["stop p2", "stop p1"]);
    }

    #[test]
    fn reusable_across_cycles() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1"], None));

        for _ in 0..3 {
            chain.start().unwrap();
            chain.stop().unwrap();
        }
        assert_eq!(log.lock().len(), 6);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1"], None));

        assert!(matches!(
            chain.stop(),
            Err(PatchError::IllegalTransition { .. })
        ));
        chain.start().unwrap();
        assert!(matches!(
            chain.start(),
            Err(PatchError::IllegalTransition { .. })
        ));
        chain.stop().unwrap();
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn decorated_body_error_still_deactivates() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1", "p2"], None));
        let test = chain.decorate(|_: &mut ()| -> anyhow::Result<()> { anyhow::bail!("assertion") });

        let err = test(&mut ()).unwrap_err();
        assert_eq!(err.to_string(), "assertion");
        assert_eq!(stops(&log), ["stop p2", "stop p1"]);
    }

    #[test]
    fn handles_absorbed_unless_passed() {
        let log = Log::default();
        let counting = |seen: &mut usize, handles: &[PatchHandle]| -> anyhow::Result<usize> {
            *seen = handles.len();
            Ok(handles.len())
        };

        let passing = PatcherChain::new(patches(&log, &["p1", "p2"], None));
        let mut seen = 0;
        assert_eq!(passing.decorate_with_mocks(counting)(&mut seen).unwrap(), 2);

        let absorbing = PatcherChain::with_config(
            patches(&log, &["p1", "p2"], None),
            &MockConfig::default().with_pass_mocks(false),
        );
        assert_eq!(absorbing.decorate_with_mocks(counting)(&mut seen).unwrap(), 0);
    }

    #[test]
    fn suite_methods_run_inside_chain() {
        let log = Log::default();
        let chain = PatcherChain::new(patches(&log, &["p1"], None));
        let observer = Arc::clone(&log);
        let suite = TestSuite::new("Suite")
            .method_with_mocks("test_sees_handles", move |count: &mut usize, handles| {
                *count = handles.len();
                observer.lock().push("body".into());
                Ok(())
            })
            .method("helper", |count: &mut usize| {
                *count = 99;
                Ok(())
            });

        let suite = chain.decorate_suite(suite);
        let mut count = 0;
        suite.run("test_sees_handles", &mut count).unwrap();
        assert_eq!(count, 1);
        assert_eq!(*log.lock(), ["start p1", "body", "stop p1"]);

        suite.run("helper", &mut count).unwrap();
        assert_eq!(count, 99);
        assert_eq!(log.lock().len(), 3);
    }
}
