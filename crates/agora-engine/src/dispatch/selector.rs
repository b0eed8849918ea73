//! Round-robin worker selection

use std::sync::{Mutex, PoisonError};

/// Cyclic worker index shared by every submitting caller
///
/// The lock is held only for the read-increment.
#[derive(Debug)]
pub struct RoundRobin {
    next: Mutex<usize>,
    workers: usize,
}

impl RoundRobin {
    /// `workers` must be at least 1
    pub fn new(workers: usize) -> Self {
        Self {
            next: Mutex::new(0),
            workers: workers.max(1),
        }
    }

    /// Return the current index and advance it
    pub fn next(&self) -> usize {
        // The counter is always valid, so a poisoned lock is still usable
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let selected = *next;
        *next = (selected + 1) % self.workers;
        selected
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_cycles_through_every_worker() {
        let selector = RoundRobin::new(3);
        let picks: Vec<usize> = (0..7).map(|_| selector.next()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_concurrent_callers_get_balanced_assignment() {
        let selector = Arc::new(RoundRobin::new(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let selector = Arc::clone(&selector);
                std::thread::spawn(move || (0..100).map(|_| selector.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts = [0usize; 4];
        for handle in handles {
            for pick in handle.join().unwrap() {
                counts[pick] += 1;
            }
        }
        assert_eq!(counts, [200, 200, 200, 200]);
    }

    proptest! {
        #[test]
        fn prop_kth_pick_is_k_mod_n(workers in 1usize..16, picks in 1usize..200) {
            let selector = RoundRobin::new(workers);
            for k in 0..picks {
                prop_assert_eq!(selector.next(), k % workers);
            }
        }
    }
}
