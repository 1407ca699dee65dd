//! Per-object reference counter.
//!
//! # Invariants
//! - `add_ref` always increases the count by one.
//! - `release` never goes below zero; releasing at zero returns zero.
//! - Exactly one `release` call observes the 1 -> 0 transition.

use std::sync::atomic::{fence, AtomicU32, Ordering};

/// Atomic reference counter, starting at zero.
#[derive(Debug, Default)]
pub struct RefCount {
    refs: AtomicU32,
}

impl RefCount {
    pub const fn new() -> Self {
        Self {
            refs: AtomicU32::new(0),
        }
    }

    /// Increments and returns the new count.
    pub fn add_ref(&self) -> u32 {
        self.refs.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Decrements and returns the remaining count; a no-op at zero.
    pub fn release(&self) -> u32 {
        match self
            .refs
            .fetch_update(Ordering::Release, Ordering::Relaxed, |refs| {
                refs.checked_sub(1)
            }) {
            Ok(previous) => {
                let remaining = previous - 1;
                if remaining == 0 {
                    // Pairs with the Release ordering above so the freeing
                    // thread sees every write made under earlier references.
                    fence(Ordering::Acquire);
                }
                remaining
            }
            Err(_) => 0,
        }
    }

    pub fn count(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::RefCount;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_zero_and_counts_up_and_down() {
        let refs = RefCount::new();
        assert_eq!(refs.count(), 0);
        assert_eq!(refs.add_ref(), 1);
        assert_eq!(refs.add_ref(), 2);
        assert_eq!(refs.release(), 1);
        assert_eq!(refs.release(), 0);
    }

    #[test]
    fn release_at_zero_is_a_no_op() {
        let refs = RefCount::new();
        assert_eq!(refs.release(), 0);
        assert_eq!(refs.release(), 0);
        assert_eq!(refs.add_ref(), 1);
    }

    #[test]
    fn concurrent_pairs_leave_count_unchanged() {
        let refs = Arc::new(RefCount::new());
        refs.add_ref();

        let workers = (0..8)
            .map(|_| {
                let refs = Arc::clone(&refs);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        refs.add_ref();
                        refs.release();
                    }
                })
            })
            .collect::<Vec<_>>();
        for worker in workers {
            worker.join().expect("worker should not panic");
        }

        assert_eq!(refs.count(), 1);
    }

    #[test]
    fn exactly_one_release_observes_zero() {
        let refs = Arc::new(RefCount::new());
        for _ in 0..64 {
            refs.add_ref();
        }

        let workers = (0..64)
            .map(|_| {
                let refs = Arc::clone(&refs);
                thread::spawn(move || refs.release() == 0)
            })
            .collect::<Vec<_>>();
        let zero_transitions = workers
            .into_iter()
            .map(|worker| worker.join().expect("worker should not panic"))
            .filter(|reached_zero| *reached_zero)
            .count();

        assert_eq!(zero_transitions, 1);
    }
}
