// Size-based timeout budgets for uploads.

use std::time::Duration;

/// Files strictly larger than this get the large-file budget.
pub const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Connect, read and total time allowed for one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    pub connect: Duration,
    pub read: Duration,
    pub total: Duration,
}

impl TimeoutBudget {
    pub const DEFAULT: TimeoutBudget = TimeoutBudget {
        connect: Duration::from_secs(30),
        read: Duration::from_secs(300),
        total: Duration::from_secs(600),
    };

    pub const LARGE_FILE: TimeoutBudget = TimeoutBudget {
        connect: Duration::from_secs(30),
        read: Duration::from_secs(600),
        total: Duration::from_secs(900),
    };
}

/// Two-tier policy: `large` above `threshold` bytes, `default` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub threshold: u64,
    pub default: TimeoutBudget,
    pub large: TimeoutBudget,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            threshold: LARGE_FILE_THRESHOLD,
            default: TimeoutBudget::DEFAULT,
            large: TimeoutBudget::LARGE_FILE,
        }
    }
}

impl TimeoutPolicy {
    pub fn budget_for(&self, file_size: u64) -> TimeoutBudget {
        if file_size > self.threshold {
            self.large
        } else {
            self.default
        }
    }
}
