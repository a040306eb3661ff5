use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for coalescer telemetry.
#[derive(Debug, Default)]
pub(crate) struct CoalescerCounters {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    full_triggers: AtomicU64,
    timeout_triggers: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl CoalescerCounters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self, reason: DispatchReason) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        match reason {
            DispatchReason::Full => self.full_triggers.fetch_add(1, Ordering::Relaxed),
            DispatchReason::Timeout => self.timeout_triggers.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CoalescerStats {
        CoalescerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            full_triggers: self.full_triggers.load(Ordering::Relaxed),
            timeout_triggers: self.timeout_triggers.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Which trigger detached a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchReason {
    /// The generation reached the maximum batch size.
    Full,
    /// The batch interval elapsed since the generation's first request.
    Timeout,
}

impl DispatchReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DispatchReason::Full => "full",
            DispatchReason::Timeout => "timeout",
        }
    }
}

/// Point-in-time copy of a coalescer's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Requests accepted into a generation
    pub submitted: u64,
    /// Generations handed to the batch processor
    pub dispatched: u64,
    /// Dispatches caused by reaching the maximum batch size
    pub full_triggers: u64,
    /// Dispatches caused by the batch interval elapsing
    pub timeout_triggers: u64,
    /// Dispatched generations whose waiters received an error
    pub failed: u64,
    /// Generations released by cancellation before dispatch
    pub cancelled: u64,
}

impl CoalescerStats {
    /// Average number of requests per dispatched batch.
    pub fn mean_batch_size(&self) -> f64 {
        if self.dispatched == 0 {
            0.0
        } else {
            self.submitted as f64 / self.dispatched as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_triggers() {
        let counters = CoalescerCounters::default();
        for _ in 0..4 {
            counters.record_submitted();
        }
        counters.record_dispatched(DispatchReason::Full);
        counters.record_dispatched(DispatchReason::Timeout);
        counters.record_failed();

        let stats = counters.snapshot();
        assert_eq!(stats.submitted, 4);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.full_triggers, 1);
        assert_eq!(stats.timeout_triggers, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.mean_batch_size(), 2.0);
    }

    #[test]
    fn test_empty_stats_have_zero_mean() {
        assert_eq!(CoalescerStats::default().mean_batch_size(), 0.0);
    }
}
