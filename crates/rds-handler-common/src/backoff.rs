// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Callback delay policies.

use serde::{Deserialize, Serialize};

/// Strategy for computing the callback delay of a given attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Exponential backoff: base * 2^(attempt-1)
    ///
    /// First attempt: base * 1
    /// Second attempt: base * 2
    /// Third attempt: base * 4
    /// ...
    #[default]
    ExponentialBackoff,
    /// Same delay for every attempt
    Constant,
}

/// Delay policy for re-invocations, in whole seconds.
///
/// Delays are never below one second: a zero delay means "continue" inside
/// a pipeline and must not be produced by a waiting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    /// Delay of the first attempt in seconds.
    pub base_delay_secs: u32,
    /// Upper bound for any single delay in seconds.
    pub max_delay_secs: u32,
    /// Strategy for calculating delays.
    pub strategy: BackoffStrategy,
}

impl Backoff {
    /// Create a new backoff policy.
    pub fn new(base_delay_secs: u32, max_delay_secs: u32, strategy: BackoffStrategy) -> Self {
        Self {
            base_delay_secs,
            max_delay_secs,
            strategy,
        }
    }

    /// Exponential policy starting at `base_delay_secs` and capped at `max_delay_secs`.
    pub fn exponential(base_delay_secs: u32, max_delay_secs: u32) -> Self {
        Self::new(base_delay_secs, max_delay_secs, BackoffStrategy::ExponentialBackoff)
    }

    /// Constant policy.
    pub fn constant(delay_secs: u32) -> Self {
        Self::new(delay_secs, delay_secs, BackoffStrategy::Constant)
    }

    /// Calculate the delay for a given attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let multiplier = match self.strategy {
            BackoffStrategy::ExponentialBackoff => {
                2u32.saturating_pow(attempt.saturating_sub(1))
            }
            BackoffStrategy::Constant => 1,
        };
        self.base_delay_secs
            .saturating_mul(multiplier)
            .min(self.max_delay_secs)
            .max(1)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(5, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_default() {
        let backoff = Backoff::default();
        assert_eq!(backoff.base_delay_secs, 5);
        assert_eq!(backoff.max_delay_secs, 60);
        assert_eq!(backoff.strategy, BackoffStrategy::ExponentialBackoff);
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let backoff = Backoff::exponential(2, 30);

        assert_eq!(backoff.delay_for_attempt(1), 2);
        assert_eq!(backoff.delay_for_attempt(2), 4);
        assert_eq!(backoff.delay_for_attempt(3), 8);
        assert_eq!(backoff.delay_for_attempt(4), 16);
        assert_eq!(backoff.delay_for_attempt(5), 30);
        assert_eq!(backoff.delay_for_attempt(40), 30);
    }

    #[test]
    fn test_delays_are_non_decreasing_and_capped() {
        let backoff = Backoff::exponential(3, 100);
        let delays: Vec<u32> = (1..=64).map(|a| backoff.delay_for_attempt(a)).collect();

        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= 100));
        assert_eq!(*delays.last().unwrap(), 100);
    }

    #[test]
    fn test_constant_delay() {
        let backoff = Backoff::constant(10);
        assert_eq!(backoff.delay_for_attempt(1), 10);
        assert_eq!(backoff.delay_for_attempt(7), 10);
    }

    #[test]
    fn test_delay_never_zero() {
        let backoff = Backoff::exponential(0, 0);
        assert_eq!(backoff.delay_for_attempt(1), 1);
        assert_eq!(backoff.delay_for_attempt(0), 1);
    }
}
