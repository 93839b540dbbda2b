//! Single-flight guard for pipeline ticks.
//!
//! A tick that finds another tick in progress is skipped, never queued.

use std::sync::atomic::{AtomicBool, Ordering};

/// At most one holder at a time.
#[derive(Debug, Default)]
pub struct TickGuard {
    busy: AtomicBool,
}

/// Proof of holding the guard; releases it on drop.
#[derive(Debug)]
pub struct TickPermit<'a> {
    guard: &'a TickGuard,
}

impl TickGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard, or `None` if a tick is already in progress.
    pub fn try_acquire(&self) -> Option<TickPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickPermit { guard: self })
    }

    /// Whether a tick currently holds the guard.
    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for TickPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let guard = TickGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());
    }

    #[test]
    fn released_on_drop() {
        let guard = TickGuard::new();
        drop(guard.try_acquire());
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }
}
