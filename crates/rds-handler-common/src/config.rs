// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Handler configuration.

use std::env;
use std::str::FromStr;

use crate::backoff::{Backoff, BackoffStrategy};

/// Default stabilization timeout (3 hours).
pub const DEFAULT_STABILIZATION_TIMEOUT_SECS: u64 = 3 * 60 * 60;

/// Tuning shared by every step of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Delay policy while waiting for a resource to stabilize
    pub stabilization_backoff: Backoff,
    /// Delay policy for retryable remote errors (throttling, conflicts, ...)
    pub retry_backoff: Backoff,
    /// Maximum retries of a single step for retryable errors (default: 5)
    pub max_retries: u32,
    /// How long a single stabilization may stay pending before it fails
    /// (default: 3 hours)
    pub stabilization_timeout_secs: u64,
}

impl HandlerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `RDS_HANDLER_STABILIZATION_BASE_DELAY_SECS` - First stabilization delay (default: 5)
    /// - `RDS_HANDLER_STABILIZATION_MAX_DELAY_SECS` - Stabilization delay cap (default: 60)
    /// - `RDS_HANDLER_RETRY_BASE_DELAY_SECS` - First retry delay (default: 2)
    /// - `RDS_HANDLER_RETRY_MAX_DELAY_SECS` - Retry delay cap (default: 30)
    /// - `RDS_HANDLER_MAX_RETRIES` - Retry cap per step (default: 5)
    /// - `RDS_HANDLER_STABILIZATION_TIMEOUT_SECS` - Stabilization timeout (default: 10800)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let stabilization_backoff = Backoff::new(
            parse_var(
                "RDS_HANDLER_STABILIZATION_BASE_DELAY_SECS",
                defaults.stabilization_backoff.base_delay_secs,
            )?,
            parse_var(
                "RDS_HANDLER_STABILIZATION_MAX_DELAY_SECS",
                defaults.stabilization_backoff.max_delay_secs,
            )?,
            BackoffStrategy::ExponentialBackoff,
        );

        let retry_backoff = Backoff::new(
            parse_var(
                "RDS_HANDLER_RETRY_BASE_DELAY_SECS",
                defaults.retry_backoff.base_delay_secs,
            )?,
            parse_var(
                "RDS_HANDLER_RETRY_MAX_DELAY_SECS",
                defaults.retry_backoff.max_delay_secs,
            )?,
            BackoffStrategy::ExponentialBackoff,
        );

        let max_retries = parse_var("RDS_HANDLER_MAX_RETRIES", defaults.max_retries)?;

        let stabilization_timeout_secs = parse_var(
            "RDS_HANDLER_STABILIZATION_TIMEOUT_SECS",
            defaults.stabilization_timeout_secs,
        )?;

        if stabilization_backoff.base_delay_secs > stabilization_backoff.max_delay_secs {
            return Err(ConfigError::Invalid(
                "RDS_HANDLER_STABILIZATION_BASE_DELAY_SECS",
                "must not exceed RDS_HANDLER_STABILIZATION_MAX_DELAY_SECS",
            ));
        }
        if retry_backoff.base_delay_secs > retry_backoff.max_delay_secs {
            return Err(ConfigError::Invalid(
                "RDS_HANDLER_RETRY_BASE_DELAY_SECS",
                "must not exceed RDS_HANDLER_RETRY_MAX_DELAY_SECS",
            ));
        }

        Ok(Self {
            stabilization_backoff,
            retry_backoff,
            max_retries,
            stabilization_timeout_secs,
        })
    }

    /// Set the stabilization delay policy.
    pub fn with_stabilization_backoff(mut self, backoff: Backoff) -> Self {
        self.stabilization_backoff = backoff;
        self
    }

    /// Set the retry delay policy.
    pub fn with_retry_backoff(mut self, backoff: Backoff) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the retry cap.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the stabilization timeout.
    pub fn with_stabilization_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.stabilization_timeout_secs = timeout_secs;
        self
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            stabilization_backoff: Backoff::exponential(5, 60),
            retry_backoff: Backoff::exponential(2, 30),
            max_retries: 5,
            stabilization_timeout_secs: DEFAULT_STABILIZATION_TIMEOUT_SECS,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, "must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
