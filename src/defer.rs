//! Scope-exit guard for actions that must run on every exit path.
//!
//! Most releases in this crate are ordinary RAII (files, HTTP clients),
//! but a few side effects have no owning value; the pool's busy-count
//! release is the main one. `defer` wraps such an action in a guard that
//! fires exactly once when the scope ends, whether by fall-through, early
//! return, or unwinding.

/// Guard returned by [`defer`]. Runs its action when dropped.
pub struct Defer<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

/// Defers `action` until the end of the enclosing scope.
///
/// The returned guard must be bound to a named variable; binding to `_`
/// drops it immediately.
///
/// # Example
///
/// ```
/// use fcrawl::defer::defer;
///
/// let mut released = false;
/// {
///     let _guard = defer(|| released = true);
/// }
/// // the guard has fired
/// ```
#[must_use = "the action runs when the guard is dropped; binding to _ drops it immediately"]
pub fn defer<F: FnOnce()>(action: F) -> Defer<F> {
    Defer {
        action: Some(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_runs_on_scope_end() {
        let count = AtomicUsize::new(0);
        {
            let _guard = defer(|| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runs_on_early_return() {
        fn leave_early(count: &AtomicUsize) {
            let _guard = defer(|| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            if count.load(Ordering::SeqCst) == 0 {
                return;
            }
            unreachable!();
        }

        let count = AtomicUsize::new(0);
        leave_early(&count);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runs_on_unwind() {
        let count = AtomicUsize::new(0);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = defer(|| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runs_exactly_once() {
        let count = AtomicUsize::new(0);
        let guard = defer(|| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        drop(guard);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
