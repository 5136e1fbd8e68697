//! Exactly-once countdown for the page-settled signal.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counts outstanding image determinations and fires once when none remain.
///
/// Firing happens only on the transition to zero (or on [`SettleLatch::check`]
/// for an empty batch) and at most once. Both counters are atomic, so two
/// decrements racing to zero still produce a single fire.
#[derive(Debug)]
pub struct SettleLatch {
    remaining: AtomicUsize,
    fired: AtomicBool,
}

impl SettleLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            fired: AtomicBool::new(false),
        }
    }

    /// Determinations still outstanding.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Evaluate the zero condition without decrementing.
    ///
    /// Returns `true` if this call fired the latch.
    pub fn check(&self) -> bool {
        self.remaining() == 0 && self.try_fire()
    }

    /// Record one completed determination.
    ///
    /// Returns `true` if this call fired the latch. Decrementing an exhausted
    /// latch is ignored.
    pub fn count_down(&self) -> bool {
        match self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => self.try_fire(),
            Ok(_) => false,
            Err(_) => {
                log::warn!("Settle latch decremented after reaching zero");
                false
            }
        }
    }

    fn try_fire(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_batch_fires_on_check() {
        let latch = SettleLatch::new(0);
        assert!(latch.check());
        assert!(!latch.check());
        assert!(latch.has_fired());
    }

    #[test]
    fn test_fires_on_last_decrement_only() {
        let latch = SettleLatch::new(3);
        assert!(!latch.check());
        assert!(!latch.count_down());
        assert!(!latch.count_down());
        assert!(latch.count_down());
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_extra_decrements_do_not_refire() {
        let latch = SettleLatch::new(1);
        assert!(latch.count_down());
        assert!(!latch.count_down());
        assert!(!latch.check());
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_parallel_decrements_fire_once() {
        let latch = Arc::new(SettleLatch::new(64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || (0..8).filter(|_| latch.count_down()).count())
            })
            .collect();
        let fires: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(fires, 1);
        assert_eq!(latch.remaining(), 0);
    }
}
