//! Token usage accounting
//!
//! [`UsageTotals`] is shared by every call made through one client. Updates are a
//! single locked add; the lock is never held across an `.await`.

use crate::wire::ChatUsage;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use std::sync::{Mutex, MutexGuard};

/// Prompt and completion tokens of one or more calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestUsage {
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
}

impl RequestUsage {
    /// Create a usage value
    #[must_use]
    pub const fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Prompt plus completion
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl From<Option<ChatUsage>> for RequestUsage {
    fn from(usage: Option<ChatUsage>) -> Self {
        usage.map_or_else(Self::default, |u| Self::new(u.prompt_tokens, u.completion_tokens))
    }
}

impl Add for RequestUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
        }
    }
}

impl AddAssign for RequestUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[derive(Debug, Default)]
struct Totals {
    actual: RequestUsage,
    total: RequestUsage,
}

/// Running usage of a client
///
/// `actual` counts calls that reached the backend; `total` would also include calls
/// answered from a cache. With no cache in front of the client the two are equal.
#[derive(Debug, Default)]
pub struct UsageTotals {
    inner: Mutex<Totals>,
}

impl UsageTotals {
    /// Start at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Totals> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add the usage of a completed backend call
    pub fn record(&self, usage: RequestUsage) {
        let mut totals = self.lock();
        totals.actual += usage;
        totals.total += usage;
    }

    /// Add usage served from a cache; counts toward `total` only
    pub fn record_cached(&self, usage: RequestUsage) {
        self.lock().total += usage;
    }

    /// Usage of calls that reached the backend
    #[must_use]
    pub fn actual(&self) -> RequestUsage {
        self.lock().actual
    }

    /// Usage including cached calls
    #[must_use]
    pub fn total(&self) -> RequestUsage {
        self.lock().total
    }

    /// Reset both views to zero
    pub fn reset(&self) {
        *self.lock() = Totals::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add() {
        let sum = RequestUsage::new(10, 5) + RequestUsage::new(3, 2);
        assert_eq!(sum, RequestUsage::new(13, 7));
        assert_eq!(sum.total_tokens(), 20);
    }

    #[test]
    fn test_from_missing_usage() {
        assert_eq!(RequestUsage::from(None), RequestUsage::default());
        let usage = RequestUsage::from(Some(ChatUsage {
            prompt_tokens: 4,
            completion_tokens: 2,
            total_tokens: 6,
        }));
        assert_eq!(usage, RequestUsage::new(4, 2));
    }

    #[test]
    fn test_totals_accumulate_and_reset() {
        let totals = UsageTotals::new();
        totals.record(RequestUsage::new(10, 1));
        totals.record(RequestUsage::new(5, 2));
        assert_eq!(totals.actual(), RequestUsage::new(15, 3));
        assert_eq!(totals.total(), totals.actual());

        totals.record_cached(RequestUsage::new(1, 1));
        assert_eq!(totals.total(), RequestUsage::new(16, 4));
        assert_eq!(totals.actual(), RequestUsage::new(15, 3));

        totals.reset();
        assert_eq!(totals.total(), RequestUsage::default());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let totals = Arc::new(UsageTotals::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let totals = Arc::clone(&totals);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        totals.record(RequestUsage::new(2, 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(totals.actual(), RequestUsage::new(16_000, 8_000));
    }
}
