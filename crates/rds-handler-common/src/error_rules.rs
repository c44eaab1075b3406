// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outcome taxonomy and error rule sets.
//!
//! Every remote failure is classified once, at the step that issued the
//! call, by walking an ordered [`ErrorRuleSet`]. The first matching rule
//! decides whether the step fails with a stable [`HandlerErrorCode`] or
//! treats the call as having reached the requested state.

use std::fmt;
use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::config::HandlerConfig;
use crate::error::{HandlerError, RemoteError};
use crate::progress::ProgressEvent;

/// Stable error codes reported on FAILED progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerErrorCode {
    NotFound,
    AlreadyExists,
    InvalidRequest,
    NotUpdatable,
    Throttling,
    ServiceInternal,
    Conflict,
    GeneralServiceException,
    AccessDenied,
    NotStabilized,
    InternalFailure,
}

impl HandlerErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerErrorCode::NotFound => "NotFound",
            HandlerErrorCode::AlreadyExists => "AlreadyExists",
            HandlerErrorCode::InvalidRequest => "InvalidRequest",
            HandlerErrorCode::NotUpdatable => "NotUpdatable",
            HandlerErrorCode::Throttling => "Throttling",
            HandlerErrorCode::ServiceInternal => "ServiceInternalError",
            HandlerErrorCode::Conflict => "ResourceConflict",
            HandlerErrorCode::GeneralServiceException => "GeneralServiceException",
            HandlerErrorCode::AccessDenied => "AccessDenied",
            HandlerErrorCode::NotStabilized => "NotStabilized",
            HandlerErrorCode::InternalFailure => "InternalFailure",
        }
    }

    /// Retryable codes yield IN_PROGRESS with retry backoff instead of failing.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerErrorCode::Throttling
                | HandlerErrorCode::ServiceInternal
                | HandlerErrorCode::Conflict
        )
    }
}

impl fmt::Display for HandlerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched rule decides for the failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// Fail the step with the given code
    Fail(HandlerErrorCode),
    /// The call reached (or had already reached) the requested state
    Ignore,
}

/// Matches a remote error identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMatcher {
    /// Exact service error code
    Code(&'static str),
    /// Service error code whose message contains the fragment
    CodeWithMessage(&'static str, &'static str),
    /// HTTP status code range (inclusive)
    StatusRange(RangeInclusive<u16>),
}

impl ErrorMatcher {
    pub fn matches(&self, err: &RemoteError) -> bool {
        match self {
            ErrorMatcher::Code(code) => err.code == *code,
            ErrorMatcher::CodeWithMessage(code, fragment) => {
                err.code == *code && err.message.contains(fragment)
            }
            ErrorMatcher::StatusRange(range) => range.contains(&err.status_code),
        }
    }
}

/// One (matcher, status) entry of a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRule {
    pub matcher: ErrorMatcher,
    pub status: ErrorStatus,
}

/// Ordered rule table; the first matching rule wins, otherwise the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRuleSet {
    rules: Vec<ErrorRule>,
    default: ErrorStatus,
}

impl ErrorRuleSet {
    /// Start an empty rule set. Unmatched errors fail with InternalFailure.
    pub fn builder() -> ErrorRuleSetBuilder {
        ErrorRuleSetBuilder {
            rules: Vec::new(),
            base: Vec::new(),
            default: ErrorStatus::Fail(HandlerErrorCode::InternalFailure),
        }
    }

    /// Start a rule set derived from `self`. Rules added to the builder
    /// are consulted before the rules of `self`; the default is inherited.
    pub fn extend(&self) -> ErrorRuleSetBuilder {
        ErrorRuleSetBuilder {
            rules: Vec::new(),
            base: self.rules.clone(),
            default: self.default,
        }
    }

    /// Classify a remote error.
    pub fn classify(&self, err: &RemoteError) -> ErrorStatus {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(err))
            .map(|rule| rule.status)
            .unwrap_or(self.default)
    }

    pub fn rules(&self) -> &[ErrorRule] {
        &self.rules
    }

    pub fn default_status(&self) -> ErrorStatus {
        self.default
    }
}

/// Builder for [`ErrorRuleSet`].
#[derive(Debug, Clone)]
pub struct ErrorRuleSetBuilder {
    rules: Vec<ErrorRule>,
    base: Vec<ErrorRule>,
    default: ErrorStatus,
}

impl ErrorRuleSetBuilder {
    pub fn with_rule(mut self, matcher: ErrorMatcher, status: ErrorStatus) -> Self {
        self.rules.push(ErrorRule { matcher, status });
        self
    }

    /// Map every listed error code to `status`.
    pub fn with_codes(mut self, codes: &[&'static str], status: ErrorStatus) -> Self {
        for &code in codes {
            self.rules.push(ErrorRule {
                matcher: ErrorMatcher::Code(code),
                status,
            });
        }
        self
    }

    pub fn with_message(
        self,
        code: &'static str,
        fragment: &'static str,
        status: ErrorStatus,
    ) -> Self {
        self.with_rule(ErrorMatcher::CodeWithMessage(code, fragment), status)
    }

    pub fn with_status_range(self, range: RangeInclusive<u16>, status: ErrorStatus) -> Self {
        self.with_rule(ErrorMatcher::StatusRange(range), status)
    }

    pub fn with_default(mut self, status: ErrorStatus) -> Self {
        self.default = status;
        self
    }

    pub fn build(self) -> ErrorRuleSet {
        let mut rules = self.rules;
        rules.extend(self.base);
        ErrorRuleSet {
            rules,
            default: self.default,
        }
    }
}

/// Rules every resource starts from.
pub static DEFAULT_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    ErrorRuleSet::builder()
        .with_codes(
            &[
                "ThrottlingException",
                "Throttling",
                "RequestLimitExceeded",
                "TooManyRequestsException",
            ],
            ErrorStatus::Fail(HandlerErrorCode::Throttling),
        )
        .with_codes(
            &[
                "AccessDenied",
                "AccessDeniedException",
                "NotAuthorized",
                "UnauthorizedOperation",
            ],
            ErrorStatus::Fail(HandlerErrorCode::AccessDenied),
        )
        .with_codes(
            &[
                "InvalidParameterValue",
                "InvalidParameterCombination",
                "MissingParameter",
                "ValidationException",
            ],
            ErrorStatus::Fail(HandlerErrorCode::InvalidRequest),
        )
        .with_codes(
            &["InternalFailure", "ServiceUnavailable"],
            ErrorStatus::Fail(HandlerErrorCode::ServiceInternal),
        )
        .with_status_range(500..=599, ErrorStatus::Fail(HandlerErrorCode::ServiceInternal))
        .build()
});

/// Context key counting consecutive retryable failures of `step`.
pub(crate) fn retry_key(step: &str) -> String {
    format!("{step}.retry")
}

/// Convert a step error into a progress event.
///
/// Remote errors go through `rules`; `Ignore` turns the event back into a
/// continuation so the pipeline proceeds. Retryable codes are retried with
/// the configured retry backoff until `config.max_retries` is exhausted.
pub fn handle_exception<M>(
    mut progress: ProgressEvent<M>,
    step: &str,
    err: HandlerError,
    rules: &ErrorRuleSet,
    config: &HandlerConfig,
) -> ProgressEvent<M> {
    let code = match &err {
        HandlerError::Remote(remote) => match rules.classify(remote) {
            ErrorStatus::Ignore => {
                warn!(step = step, error = %remote, "Ignoring remote error");
                return progress.into_continuation();
            }
            ErrorStatus::Fail(code) => code,
        },
        HandlerError::InvalidRequest(_) => HandlerErrorCode::InvalidRequest,
        HandlerError::NotStabilized(_) => HandlerErrorCode::NotStabilized,
        HandlerError::UnexpectedResponse(_) | HandlerError::Serialization(_) => {
            HandlerErrorCode::InternalFailure
        }
    };

    if code.is_retryable() {
        let attempt = progress.context_mut().increment_attempts(&retry_key(step));
        if attempt <= config.max_retries {
            let delay = config.retry_backoff.delay_for_attempt(attempt);
            warn!(
                step = step,
                attempt = attempt,
                delay_seconds = delay,
                error_code = %code,
                error = %err,
                "Retryable error, yielding"
            );
            return progress.into_pending(delay, attempt);
        }
    }

    error!(step = step, error_code = %code, error = %err, "Step failed");
    progress.into_failed(code, format!("{step}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::context::CallbackContext;
    use crate::progress::OperationStatus;

    fn rule_set() -> ErrorRuleSet {
        DEFAULT_ERROR_RULE_SET
            .extend()
            .with_codes(&["DBInstanceNotFound"], ErrorStatus::Fail(HandlerErrorCode::NotFound))
            .with_message(
                "InvalidDBInstanceState",
                "is already being deleted",
                ErrorStatus::Ignore,
            )
            .with_codes(
                &["InvalidDBInstanceState"],
                ErrorStatus::Fail(HandlerErrorCode::Conflict),
            )
            .build()
    }

    fn progress() -> ProgressEvent<String> {
        ProgressEvent::progress("model".to_string(), CallbackContext::new())
    }

    #[test]
    fn test_first_match_wins() {
        let rules = rule_set();

        let deleting =
            RemoteError::client("InvalidDBInstanceState", "Instance db-1 is already being deleted");
        assert_eq!(rules.classify(&deleting), ErrorStatus::Ignore);

        let other = RemoteError::client("InvalidDBInstanceState", "Instance db-1 is modifying");
        assert_eq!(
            rules.classify(&other),
            ErrorStatus::Fail(HandlerErrorCode::Conflict)
        );
    }

    #[test]
    fn test_extension_rules_precede_base() {
        let base = ErrorRuleSet::builder()
            .with_codes(&["Busy"], ErrorStatus::Fail(HandlerErrorCode::Conflict))
            .build();
        let derived = base.extend().with_codes(&["Busy"], ErrorStatus::Ignore).build();

        let err = RemoteError::client("Busy", "try later");
        assert_eq!(base.classify(&err), ErrorStatus::Fail(HandlerErrorCode::Conflict));
        assert_eq!(derived.classify(&err), ErrorStatus::Ignore);
        assert_eq!(derived.rules().len(), 2);
    }

    #[test]
    fn test_status_range_and_default() {
        let rules = rule_set();
        assert_eq!(
            rules.classify(&RemoteError::new("SomethingBroke", 503, "down")),
            ErrorStatus::Fail(HandlerErrorCode::ServiceInternal)
        );
        assert_eq!(
            rules.classify(&RemoteError::client("Unmapped", "?")),
            ErrorStatus::Fail(HandlerErrorCode::InternalFailure)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let rules = rule_set();
        let err = RemoteError::not_found("DBInstanceNotFound", "gone");
        let first = rules.classify(&err);
        for _ in 0..10 {
            assert_eq!(rules.classify(&err.clone()), first);
        }
    }

    #[test]
    fn test_handle_exception_ignore_continues() {
        let config = HandlerConfig::default();
        let err = RemoteError::client("InvalidDBInstanceState", "db-1 is already being deleted");

        let event = handle_exception(progress(), "delete", err.into(), &rule_set(), &config);

        assert!(event.is_continuation());
        assert!(event.error_code.is_none());
    }

    #[test]
    fn test_handle_exception_fails_with_code_and_step() {
        let config = HandlerConfig::default();
        let err = RemoteError::not_found("DBInstanceNotFound", "db-1 not found");

        let event = handle_exception(progress(), "rds::delete", err.into(), &rule_set(), &config);

        assert_eq!(event.status, OperationStatus::Failed);
        assert_eq!(event.error_code, Some(HandlerErrorCode::NotFound));
        assert_eq!(event.callback_delay_seconds, 0);
        let message = event.message.unwrap();
        assert!(message.starts_with("rds::delete: "));
        assert!(message.contains("db-1 not found"));
    }

    #[test]
    fn test_handle_exception_retries_then_fails() {
        let config = HandlerConfig::default()
            .with_retry_backoff(Backoff::exponential(2, 30))
            .with_max_retries(2);
        let err = || HandlerError::from(RemoteError::client("Throttling", "slow down"));

        let first = handle_exception(progress(), "modify", err(), &rule_set(), &config);
        assert_eq!(first.status, OperationStatus::InProgress);
        assert_eq!(first.callback_delay_seconds, 2);
        assert_eq!(first.attempt, 1);

        let second = handle_exception(first, "modify", err(), &rule_set(), &config);
        assert_eq!(second.callback_delay_seconds, 4);
        assert_eq!(second.attempt, 2);

        let third = handle_exception(second, "modify", err(), &rule_set(), &config);
        assert_eq!(third.status, OperationStatus::Failed);
        assert_eq!(third.error_code, Some(HandlerErrorCode::Throttling));
    }

    #[test]
    fn test_handle_exception_local_errors() {
        let config = HandlerConfig::default();

        let invalid = handle_exception(
            progress(),
            "validate",
            HandlerError::InvalidRequest("EngineLifecycleSupport cannot be modified.".into()),
            &rule_set(),
            &config,
        );
        assert_eq!(invalid.error_code, Some(HandlerErrorCode::InvalidRequest));

        let unexpected = handle_exception(
            progress(),
            "read",
            HandlerError::UnexpectedResponse("expected DbInstances".into()),
            &rule_set(),
            &config,
        );
        assert_eq!(unexpected.error_code, Some(HandlerErrorCode::InternalFailure));
    }
}
