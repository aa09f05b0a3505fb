//! Monotonic process-number allocation.

use std::sync::atomic::{AtomicU32, Ordering};

/// Issues strictly increasing, process-unique workload numbers.
///
/// The first issued number is 1001. The allocator is an injected
/// collaborator rather than a process global so tests can own their own
/// counter.
#[derive(Debug)]
pub struct PidAllocator {
    next: AtomicU32,
}

impl PidAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1001),
        }
    }

    /// Return the next unique process number.
    pub fn next_pid(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    #[test]
    fn starts_above_one_thousand() {
        let pids = PidAllocator::new();
        assert_eq!(pids.next_pid(), 1001);
        assert_eq!(pids.next_pid(), 1002);
    }

    #[test]
    fn concurrent_callers_get_unique_pids() {
        let pids = Arc::new(PidAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pids = Arc::clone(&pids);
            handles.push(std::thread::spawn(move || {
                (0..100).map(|_| pids.next_pid()).collect::<Vec<_>>()
            }));
        }

        let mut all = Vec::new();
        for h in handles {
            all.extend(h.join().unwrap());
        }
        let unique: BTreeSet<u32> = all.iter().copied().collect();
        assert_eq!(unique.len(), 800);
        assert_eq!(*unique.iter().next().unwrap(), 1001);
        assert_eq!(*unique.iter().next_back().unwrap(), 1800);
    }
}
