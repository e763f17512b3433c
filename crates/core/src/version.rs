//! Optimistic concurrency for versioned records.
//!
//! Records that are rewritten as a whole (the per-user conversation blob being
//! the main one) carry a monotonically increasing version. A writer states the
//! version it read; the store refuses the write if someone else got there
//! first.

/// A record with a monotonically increasing version.
pub trait Versioned {
    /// Current version. `0` means "never persisted".
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (administrative overwrites).
    Any,
    /// Require the stored record to be at an exact version (`0` = absent).
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    /// Version the record will carry once a write under this expectation
    /// succeeds against a record currently at `actual`.
    pub fn next_version(self, actual: u64) -> u64 {
        match self {
            ExpectedVersion::Any => actual + 1,
            ExpectedVersion::Exact(v) => v + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_expectation_matches_only_the_same_version() {
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(3).matches(4));
        assert!(ExpectedVersion::Any.matches(42));
    }

    #[test]
    fn next_version_increments_from_the_expected_version() {
        assert_eq!(ExpectedVersion::Exact(0).next_version(0), 1);
        assert_eq!(ExpectedVersion::Exact(7).next_version(7), 8);
        assert_eq!(ExpectedVersion::Any.next_version(5), 6);
    }
}
