// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resumable reconciliation engine for RDS resource handlers.
//!
//! A handler is invoked repeatedly by a host scheduler, once per tick, with
//! no memory surviving between invocations except the [`CallbackContext`]
//! returned in the previous [`ProgressEvent`]. This crate provides the
//! pieces every handler pipeline is built from:
//!
//! - **Progress events**: continuation / yield / terminal results chained
//!   with [`ProgressEvent::then`]
//! - **Step guards**: [`exec_once`] skips mutating steps that already completed
//! - **Call chains**: [`CallChain`] issues a mutating call at most once and
//!   polls for stabilization, one probe per invocation
//! - **Error rule sets**: [`ErrorRuleSet`] maps remote errors to a small
//!   outcome taxonomy; [`handle_exception`] applies it at the step boundary
//! - **Versioned dispatch**: [`ApiVersionDispatcher`] negotiates the API
//!   generation once per resource
//! - **Async-failure detection**: [`check_failed_events`] scans the event
//!   stream after a mutation
//!
//! # Example
//!
//! ```ignore
//! let progress = ProgressEvent::progress(model, context)
//!     .then(|p| exec_once(p, "updated", |p| modify(p)))
//!     .await
//!     .then(|p| read(p))
//!     .await;
//! ```
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RDS_HANDLER_STABILIZATION_BASE_DELAY_SECS` | `5` | First stabilization delay |
//! | `RDS_HANDLER_STABILIZATION_MAX_DELAY_SECS` | `60` | Stabilization delay cap |
//! | `RDS_HANDLER_RETRY_BASE_DELAY_SECS` | `2` | First retry delay |
//! | `RDS_HANDLER_RETRY_MAX_DELAY_SECS` | `30` | Retry delay cap |
//! | `RDS_HANDLER_MAX_RETRIES` | `5` | Retries per step for retryable errors |
//! | `RDS_HANDLER_STABILIZATION_TIMEOUT_SECS` | `10800` | Stabilization timeout |

pub mod api;
pub mod backoff;
pub mod client;
pub mod config;
pub mod context;
pub mod drift;
pub mod error;
pub mod error_rules;
pub mod events;
pub mod guard;
pub mod logging;
pub mod progress;
pub mod request;
pub mod stabilize;
pub mod tagging;
pub mod versioned;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backoff::{Backoff, BackoffStrategy};
pub use client::RemoteClient;
pub use config::{ConfigError, HandlerConfig};
pub use context::CallbackContext;
pub use drift::report_drift;
pub use error::{HandlerError, RemoteError, Result};
pub use error_rules::{
    DEFAULT_ERROR_RULE_SET, ErrorMatcher, ErrorRule, ErrorRuleSet, ErrorStatus, HandlerErrorCode,
    handle_exception,
};
pub use events::check_failed_events;
pub use guard::{exec_once, exec_once_with};
pub use logging::{LoggingClient, RequestLogger, init_tracing};
pub use progress::{OperationStatus, ProgressEvent};
pub use request::{Action, ResourceHandlerRequest};
pub use stabilize::{CallChain, StabilizeOutcome, stabilize};
pub use tagging::{TagSet, Tags};
pub use versioned::{ApiVersion, ApiVersionDispatcher, VersionedClient, VersionedTable};
