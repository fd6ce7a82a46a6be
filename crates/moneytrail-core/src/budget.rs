//! Work budgets for bounded searches.
//!
//! Simple-cycle enumeration is exponential in the worst case. Every search
//! runs under a `WorkBudget` that caps cycles found, search steps, wall-clock
//! time and optional cooperative cancellation. Hitting any cap stops the
//! search with a `TruncationReason`; results found so far are kept.
//!
//! # Example
//!
//! ```rust
//! use moneytrail_core::budget::{CancellationFlag, WorkBudget};
//! use std::time::Duration;
//!
//! let cancel = CancellationFlag::new();
//! let budget = WorkBudget::new(1_000, 100_000)
//!     .with_timeout(Duration::from_secs(2))
//!     .with_cancellation(cancel.clone());
//!
//! let mut meter = budget.meter();
//! assert!(meter.step().is_ok());
//! cancel.cancel();
//! ```

use crate::error::TruncationReason;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline and cancellation checks are amortised over this many steps.
const CHECK_INTERVAL: u64 = 1024;

// ============================================================================
// Deadline
// ============================================================================

/// Absolute wall-clock deadline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    deadline: Instant,
    original_timeout: Duration,
    created_at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            deadline: now + timeout,
            original_timeout: timeout,
            created_at: now,
        }
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// The timeout the deadline was created with.
    pub fn original_timeout(&self) -> Duration {
        self.original_timeout
    }

    /// Time since creation.
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared cooperative cancellation flag.
///
/// Cloning shares the flag; cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an uncancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Work Budget
// ============================================================================

/// Caps applied to a bounded search.
#[derive(Debug, Clone)]
pub struct WorkBudget {
    /// Maximum results (cycles) to collect.
    pub max_cycles: usize,
    /// Maximum search steps (edge expansions).
    pub max_steps: u64,
    /// Optional wall-clock deadline.
    pub deadline: Option<Deadline>,
    /// Optional cooperative cancellation.
    pub cancellation: Option<CancellationFlag>,
    /// Optional maximum cycle length; longer paths are not explored.
    pub max_cycle_length: Option<usize>,
}

impl Default for WorkBudget {
    fn default() -> Self {
        Self::new(10_000, 5_000_000)
    }
}

impl WorkBudget {
    /// Budget with cycle and step caps and no deadline.
    pub fn new(max_cycles: usize, max_steps: u64) -> Self {
        Self {
            max_cycles,
            max_steps,
            deadline: None,
            cancellation: None,
            max_cycle_length: None,
        }
    }

    /// Budget that never truncates on cycle or step counts.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, u64::MAX)
    }

    /// Set a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Deadline::after(timeout));
        self
    }

    /// Set an existing deadline.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    /// Limit explored path length.
    pub fn with_max_cycle_length(mut self, max_len: Option<usize>) -> Self {
        self.max_cycle_length = max_len;
        self
    }

    /// Start metering work against this budget.
    pub fn meter(&self) -> BudgetMeter<'_> {
        BudgetMeter {
            budget: self,
            steps: 0,
            cycles: 0,
        }
    }
}

/// Running counters for one search under a `WorkBudget`.
#[derive(Debug)]
pub struct BudgetMeter<'a> {
    budget: &'a WorkBudget,
    steps: u64,
    cycles: usize,
}

impl BudgetMeter<'_> {
    /// Account for one search step.
    pub fn step(&mut self) -> Result<(), TruncationReason> {
        if self.steps % CHECK_INTERVAL == 0 {
            self.check_external()?;
        }
        if self.steps >= self.budget.max_steps {
            return Err(TruncationReason::StepLimit);
        }
        self.steps += 1;
        Ok(())
    }

    /// Account for one collected result.
    ///
    /// Errors when the cap was already reached; the result must then be
    /// dropped and the search stopped.
    pub fn record_cycle(&mut self) -> Result<(), TruncationReason> {
        if self.cycles >= self.budget.max_cycles {
            return Err(TruncationReason::CycleLimit);
        }
        self.cycles += 1;
        Ok(())
    }

    /// True if no further results may be collected.
    pub fn cycles_exhausted(&self) -> bool {
        self.cycles >= self.budget.max_cycles
    }

    /// Steps consumed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Results collected so far.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Maximum path length, if any.
    pub fn max_cycle_length(&self) -> Option<usize> {
        self.budget.max_cycle_length
    }

    fn check_external(&self) -> Result<(), TruncationReason> {
        if let Some(flag) = &self.budget.cancellation {
            if flag.is_cancelled() {
                return Err(TruncationReason::Cancelled);
            }
        }
        if let Some(deadline) = &self.budget.deadline {
            if deadline.is_expired() {
                return Err(TruncationReason::Deadline);
            }
        }
        Ok(())
    }
}
