//! Flush policy configuration for [`MappedFileView`](crate::MappedFileView).
//!
//! Controls when writes to a read-write view are flushed to disk.

/// Policy controlling when to flush dirty pages to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Never flush implicitly; flush() must be called by the user.
    #[default]
    Never,
    /// Alias of Never for semantic clarity when using the builder API.
    Manual,
    /// Flush after every write.
    Always,
    /// Flush when at least N bytes have been written since the last flush.
    EveryBytes(usize),
    /// Flush after every W writes.
    EveryWrites(usize),
}

/// Running counters deciding when the next implicit flush is due.
#[derive(Debug, Clone, Default)]
pub(crate) struct FlushTracker {
    policy: FlushPolicy,
    pending_bytes: usize,
    pending_writes: usize,
}

impl FlushTracker {
    pub(crate) fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            pending_bytes: 0,
            pending_writes: 0,
        }
    }

    pub(crate) fn policy(&self) -> FlushPolicy {
        self.policy
    }

    /// Account for a write of `bytes`; returns true when a flush is due.
    pub(crate) fn record_write(&mut self, bytes: usize) -> bool {
        self.pending_bytes = self.pending_bytes.saturating_add(bytes);
        self.pending_writes = self.pending_writes.saturating_add(1);
        let due = match self.policy {
            FlushPolicy::Never | FlushPolicy::Manual => false,
            FlushPolicy::Always => true,
            FlushPolicy::EveryBytes(n) => self.pending_bytes >= n.max(1),
            FlushPolicy::EveryWrites(n) => self.pending_writes >= n.max(1),
        };
        if due {
            self.reset();
        }
        due
    }

    /// Forget pending counts after an explicit flush.
    pub(crate) fn reset(&mut self) {
        self.pending_bytes = 0;
        self.pending_writes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_never_due() {
        let mut t = FlushTracker::new(FlushPolicy::Manual);
        assert!(!t.record_write(1 << 20));
        assert!(!t.record_write(1));
    }

    #[test]
    fn byte_threshold() {
        let mut t = FlushTracker::new(FlushPolicy::EveryBytes(8));
        assert!(!t.record_write(5));
        assert!(t.record_write(3));
        assert!(!t.record_write(7));
    }

    #[test]
    fn write_count_threshold() {
        let mut t = FlushTracker::new(FlushPolicy::EveryWrites(2));
        assert!(!t.record_write(1));
        assert!(t.record_write(1));
        assert!(!t.record_write(1));
    }
}
