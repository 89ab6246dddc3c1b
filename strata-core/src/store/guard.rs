//! Dispatch Guard
//!
//! Enforces single-flight dispatch. The store owns one flag; a dispatch
//! holds it through a guard for the whole chain, setter and propagation.
//! Anything that tries to dispatch while the flag is held, including user
//! code running inside the current dispatch, fails fast instead of
//! re-entering.
//!
//! The flag is cleared when the guard drops, so it is released on every exit
//! path: normal return, early return with an error, or a panic unwinding
//! through user code.

use std::sync::atomic::{AtomicBool, Ordering};

/// Guard that clears the dispatching flag when dropped.
#[derive(Debug)]
pub struct DispatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DispatchGuard<'a> {
    /// Set `flag` and return a guard, or `None` if it was already set.
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_sets_and_clears_flag() {
        let flag = AtomicBool::new(false);

        {
            let _guard = DispatchGuard::acquire(&flag).unwrap();
            assert!(flag.load(Ordering::SeqCst));
        }

        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let flag = AtomicBool::new(false);
        let guard = DispatchGuard::acquire(&flag).unwrap();

        assert!(DispatchGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(DispatchGuard::acquire(&flag).is_some());
    }

    #[test]
    fn flag_cleared_after_panic() {
        let flag = AtomicBool::new(false);

        let result = std::panic::catch_unwind(|| {
            let _guard = DispatchGuard::acquire(&flag).unwrap();
            panic!("handler blew up");
        });

        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
