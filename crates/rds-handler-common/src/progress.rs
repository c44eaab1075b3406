// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-invocation handler result.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::context::CallbackContext;
use crate::error::{HandlerError, Result};
use crate::error_rules::HandlerErrorCode;

/// Outcome kind of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    InProgress,
    Success,
    Failed,
}

/// The value returned to the host on every invocation.
///
/// An `InProgress` event with a zero delay is a continuation: the previous
/// step succeeded and the pipeline should proceed. Any other event ends the
/// current invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent<M> {
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_model: Option<M>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_models: Option<Vec<M>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_context: Option<CallbackContext>,
    pub callback_delay_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<HandlerErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl<M> ProgressEvent<M> {
    /// Continuation carrying `model` and `context`.
    pub fn progress(model: M, context: CallbackContext) -> Self {
        Self {
            status: OperationStatus::InProgress,
            resource_model: Some(model),
            resource_models: None,
            callback_context: Some(context),
            callback_delay_seconds: 0,
            error_code: None,
            message: None,
            attempt: 0,
            next_token: None,
        }
    }

    /// Ask the host to re-invoke after `delay_seconds`.
    pub fn in_progress_with_delay(
        model: M,
        context: CallbackContext,
        delay_seconds: u32,
        attempt: u32,
    ) -> Self {
        Self::progress(model, context).into_pending(delay_seconds, attempt)
    }

    /// Terminal success. The context is dropped.
    pub fn success(model: Option<M>) -> Self {
        Self {
            status: OperationStatus::Success,
            resource_model: model,
            resource_models: None,
            callback_context: None,
            callback_delay_seconds: 0,
            error_code: None,
            message: None,
            attempt: 0,
            next_token: None,
        }
    }

    /// Terminal success of a list request.
    pub fn success_list(models: Vec<M>, next_token: Option<String>) -> Self {
        Self {
            resource_models: Some(models),
            next_token,
            ..Self::success(None)
        }
    }

    /// Terminal failure.
    pub fn failed(
        model: Option<M>,
        context: Option<CallbackContext>,
        code: HandlerErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: OperationStatus::Failed,
            resource_model: model,
            resource_models: None,
            callback_context: context,
            callback_delay_seconds: 0,
            error_code: Some(code),
            message: Some(message.into()),
            attempt: 0,
            next_token: None,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.status == OperationStatus::InProgress && self.callback_delay_seconds == 0
    }

    /// True for an `InProgress` event that yields to the host.
    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::InProgress && self.callback_delay_seconds > 0
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == OperationStatus::Failed
    }

    /// Mutable access to the context, creating an empty one if absent.
    pub fn context_mut(&mut self) -> &mut CallbackContext {
        self.callback_context.get_or_insert_with(CallbackContext::new)
    }

    pub fn model(&self) -> Result<&M> {
        self.resource_model
            .as_ref()
            .ok_or_else(|| HandlerError::InvalidRequest("resource model is required".into()))
    }

    pub fn model_mut(&mut self) -> Result<&mut M> {
        self.resource_model
            .as_mut()
            .ok_or_else(|| HandlerError::InvalidRequest("resource model is required".into()))
    }

    pub fn into_continuation(mut self) -> Self {
        self.status = OperationStatus::InProgress;
        self.callback_delay_seconds = 0;
        self.error_code = None;
        self.message = None;
        self.context_mut();
        self
    }

    /// Turn into a yielded `InProgress`. The delay is never below one second.
    pub fn into_pending(mut self, delay_seconds: u32, attempt: u32) -> Self {
        self.status = OperationStatus::InProgress;
        self.callback_delay_seconds = delay_seconds.max(1);
        self.attempt = attempt;
        self.context_mut();
        self
    }

    /// Turn into a failure, keeping model and context.
    pub fn into_failed(mut self, code: HandlerErrorCode, message: impl Into<String>) -> Self {
        self.status = OperationStatus::Failed;
        self.callback_delay_seconds = 0;
        self.error_code = Some(code);
        self.message = Some(message.into());
        self
    }

    /// Apply `step` to a continuation; return any other event unchanged.
    pub async fn then<F, Fut>(self, step: F) -> Self
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Self>,
    {
        if self.is_continuation() {
            step(self).await
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_then_runs_on_continuation() {
        let event = ProgressEvent::progress(1u32, CallbackContext::new())
            .then(|mut p| async move {
                p.resource_model = Some(2);
                p
            })
            .await
            .then(|mut p| async move {
                p.context_mut().mark_done("second");
                p
            })
            .await;

        assert!(event.is_continuation());
        assert_eq!(event.resource_model, Some(2));
        assert!(event.callback_context.unwrap().is_done("second"));
    }

    #[tokio::test]
    async fn test_then_short_circuits_on_pending_and_failed() {
        let pending = ProgressEvent::progress(1u32, CallbackContext::new())
            .then(|p| async move { p.into_pending(30, 1) })
            .await
            .then(|_| async move { panic!("must not run after a yield") })
            .await;
        assert!(pending.is_pending());
        assert_eq!(pending.callback_delay_seconds, 30);

        let failed = ProgressEvent::progress(1u32, CallbackContext::new())
            .then(|p| async move { p.into_failed(HandlerErrorCode::NotUpdatable, "immutable") })
            .await
            .then(|_| async move { panic!("must not run after a failure") })
            .await;
        assert!(failed.is_failed());
        assert_eq!(failed.error_code, Some(HandlerErrorCode::NotUpdatable));
    }

    #[test]
    fn test_pending_delay_is_at_least_one_second() {
        let event = ProgressEvent::in_progress_with_delay("m", CallbackContext::new(), 0, 1);
        assert!(event.is_pending());
        assert_eq!(event.callback_delay_seconds, 1);
    }

    #[test]
    fn test_terminal_events_have_zero_delay() {
        let success: ProgressEvent<u8> = ProgressEvent::success(None);
        assert_eq!(success.callback_delay_seconds, 0);
        assert!(success.callback_context.is_none());

        let failed = ProgressEvent::in_progress_with_delay(1u8, CallbackContext::new(), 20, 3)
            .into_failed(HandlerErrorCode::Throttling, "too many retries");
        assert_eq!(failed.callback_delay_seconds, 0);
        assert!(failed.callback_context.is_some());
    }

    #[test]
    fn test_list_event_serialization() {
        let event = ProgressEvent::success_list(vec!["a", "b"], Some("token-2".into()));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["resourceModels"], serde_json::json!(["a", "b"]));
        assert_eq!(json["nextToken"], "token-2");
        assert!(json.get("callbackContext").is_none());
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let event: ProgressEvent<u8> = ProgressEvent::success(None);
        assert!(event.model().is_err());
    }
}
