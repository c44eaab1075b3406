// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stabilization poller and call chains.
//!
//! A stabilization never waits in-process. Each invocation performs one
//! remote read; while the predicate does not hold, the step yields with a
//! backoff delay and the host re-invokes later with the stored context.

use std::future::Future;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::HandlerConfig;
use crate::context::CallbackContext;
use crate::error::HandlerError;
use crate::error_rules::{ErrorRuleSet, ErrorStatus, HandlerErrorCode, handle_exception, retry_key};
use crate::progress::ProgressEvent;

/// Result of one stabilization probe.
#[derive(Debug)]
pub enum StabilizeOutcome {
    /// The predicate holds
    Stable,
    /// Still converging; re-invoke after `delay_seconds`
    Pending { delay_seconds: u32, attempt: u32 },
    /// Pending for longer than the configured timeout
    TimedOut { elapsed_secs: i64 },
    /// The probe itself failed
    Failed(HandlerError),
}

/// Probe once and report the stabilization state of step `key`.
///
/// Attempts are counted under `{key}.stabilize` and reset once stable. The
/// first probe records a "once" timestamp under the same key that bounds
/// the total stabilization time.
pub async fn stabilize<T, P, PFut, Pred>(
    context: &mut CallbackContext,
    key: &str,
    config: &HandlerConfig,
    poll: P,
    predicate: Pred,
) -> StabilizeOutcome
where
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<T, HandlerError>>,
    Pred: FnOnce(&T) -> bool,
{
    let counter = format!("{key}.stabilize");
    let now = Utc::now();
    context.timestamp_once(&counter, now);

    let observed = match poll().await {
        Ok(observed) => observed,
        Err(err) => return StabilizeOutcome::Failed(err),
    };

    if predicate(&observed) {
        context.reset_attempts(&counter);
        return StabilizeOutcome::Stable;
    }

    if let Some(started) = context.timestamp(&counter) {
        let elapsed_secs = (now - started).num_seconds();
        let timeout = i64::try_from(config.stabilization_timeout_secs).unwrap_or(i64::MAX);
        if elapsed_secs > timeout {
            return StabilizeOutcome::TimedOut { elapsed_secs };
        }
    }

    let attempt = context.increment_attempts(&counter);
    StabilizeOutcome::Pending {
        delay_seconds: config.stabilization_backoff.delay_for_attempt(attempt),
        attempt,
    }
}

/// A mutating call issued at most once, followed by its stabilization.
///
/// The "call issued" memo is stored as marker `{name}.issued`, so a step that
/// yields while stabilizing does not re-issue the call when it re-enters.
#[derive(Debug, Clone, Copy)]
pub struct CallChain<'a> {
    name: &'a str,
    config: &'a HandlerConfig,
    rules: &'a ErrorRuleSet,
    not_found_is_stable: bool,
}

impl<'a> CallChain<'a> {
    pub fn initiate(name: &'a str, config: &'a HandlerConfig, rules: &'a ErrorRuleSet) -> Self {
        Self {
            name,
            config,
            rules,
            not_found_is_stable: false,
        }
    }

    /// Treat a probe failing with a NotFound classification as stable.
    pub fn not_found_is_stable(mut self) -> Self {
        self.not_found_is_stable = true;
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    fn issued_key(&self) -> String {
        format!("{}.issued", self.name)
    }

    /// Whether an earlier invocation already issued this chain's call.
    pub fn is_issued(&self, context: &CallbackContext) -> bool {
        context.is_done(&self.issued_key())
    }

    /// Issue the call unless it was already issued by an earlier invocation.
    pub async fn make_service_call<M, T, E, C, CFut>(
        &self,
        mut progress: ProgressEvent<M>,
        call: C,
    ) -> ProgressEvent<M>
    where
        C: FnOnce() -> CFut,
        CFut: Future<Output = Result<T, E>>,
        E: Into<HandlerError>,
    {
        let issued = self.issued_key();
        if progress.context_mut().is_done(&issued) {
            debug!(step = self.name, "Call already issued, skipping");
            return progress;
        }

        match call().await {
            Ok(_) => {
                info!(step = self.name, "Call issued");
                let context = progress.context_mut();
                context.mark_done(&issued);
                context.reset_attempts(&retry_key(self.name));
                progress
            }
            Err(err) => {
                let mut event =
                    handle_exception(progress, self.name, err.into(), self.rules, self.config);
                if event.is_continuation() {
                    event.context_mut().mark_done(&issued);
                }
                event
            }
        }
    }

    /// Probe once; yield while pending.
    ///
    /// A probe that answers normally clears the retry count of the chain, so
    /// only consecutive retryable failures count toward the retry cap.
    pub async fn stabilize<M, T, P, PFut, Pred>(
        &self,
        mut progress: ProgressEvent<M>,
        poll: P,
        predicate: Pred,
    ) -> ProgressEvent<M>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T, HandlerError>>,
        Pred: FnOnce(&T) -> bool,
    {
        let outcome =
            stabilize(progress.context_mut(), self.name, self.config, poll, predicate).await;

        match outcome {
            StabilizeOutcome::Stable => {
                debug!(step = self.name, "Stabilized");
                progress.context_mut().reset_attempts(&retry_key(self.name));
                progress
            }
            StabilizeOutcome::Pending {
                delay_seconds,
                attempt,
            } => {
                progress.context_mut().reset_attempts(&retry_key(self.name));
                debug!(
                    step = self.name,
                    attempt = attempt,
                    delay_seconds = delay_seconds,
                    "Not stabilized yet"
                );
                progress.into_pending(delay_seconds, attempt)
            }
            StabilizeOutcome::TimedOut { elapsed_secs } => {
                warn!(step = self.name, elapsed_secs = elapsed_secs, "Stabilization timed out");
                progress.into_failed(
                    HandlerErrorCode::NotStabilized,
                    format!(
                        "{}: resource did not stabilize within {} seconds",
                        self.name, self.config.stabilization_timeout_secs
                    ),
                )
            }
            StabilizeOutcome::Failed(err) => {
                if self.not_found_is_stable && self.is_not_found(&err) {
                    debug!(step = self.name, "Resource gone, treating as stable");
                    return progress;
                }
                handle_exception(progress, self.name, err, self.rules, self.config)
            }
        }
    }

    /// Issue the call at most once, then stabilize.
    pub async fn run<M, T, E, C, CFut, U, P, PFut, Pred>(
        &self,
        progress: ProgressEvent<M>,
        call: C,
        poll: P,
        predicate: Pred,
    ) -> ProgressEvent<M>
    where
        C: FnOnce() -> CFut,
        CFut: Future<Output = Result<T, E>>,
        E: Into<HandlerError>,
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<U, HandlerError>>,
        Pred: FnOnce(&U) -> bool,
    {
        progress
            .then(|p| self.make_service_call(p, call))
            .await
            .then(|p| self.stabilize(p, poll, predicate))
            .await
    }

    fn is_not_found(&self, err: &HandlerError) -> bool {
        err.as_remote().is_some_and(|remote| {
            self.rules.classify(remote) == ErrorStatus::Fail(HandlerErrorCode::NotFound)
        })
    }
}
