// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Asynchronous-failure detection over the remote event stream.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::api::{Event, Request, Response, SourceType};
use crate::client::RemoteClient;
use crate::config::HandlerConfig;
use crate::error::HandlerError;
use crate::error_rules::{DEFAULT_ERROR_RULE_SET, HandlerErrorCode, handle_exception};
use crate::progress::ProgressEvent;

const DESCRIBE_EVENTS_STEP: &str = "rds::describe-events";

/// Fail `progress` if the resource emitted a failure event since `since`.
///
/// A mutation can be reported stable and still have failed asynchronously;
/// the failure is only visible in the event stream.
pub async fn check_failed_events<M, F>(
    client: &dyn RemoteClient,
    source_identifier: &str,
    source_type: SourceType,
    since: DateTime<Utc>,
    progress: ProgressEvent<M>,
    is_failure_event: F,
    config: &HandlerConfig,
) -> ProgressEvent<M>
where
    F: Fn(&Event) -> bool,
{
    let request = Request::DescribeEvents {
        source_identifier: source_identifier.to_string(),
        source_type,
        start_time: since,
        marker: None,
    };

    let events = match client.invoke_iterable(request).await {
        Ok(pages) => match collect_events(pages) {
            Ok(events) => events,
            Err(err) => {
                return handle_exception(
                    progress,
                    DESCRIBE_EVENTS_STEP,
                    err,
                    &DEFAULT_ERROR_RULE_SET,
                    config,
                );
            }
        },
        Err(err) => {
            return handle_exception(
                progress,
                DESCRIBE_EVENTS_STEP,
                err.into(),
                &DEFAULT_ERROR_RULE_SET,
                config,
            );
        }
    };

    debug!(
        source_identifier = source_identifier,
        count = events.len(),
        "Checked events for asynchronous failures"
    );

    match events.iter().find(|event| is_failure_event(event)) {
        Some(event) => {
            error!(
                source_identifier = source_identifier,
                message = %event.message,
                "Found failure event"
            );
            progress.into_failed(HandlerErrorCode::GeneralServiceException, event.message.clone())
        }
        None => progress,
    }
}

fn collect_events(pages: Vec<Response>) -> Result<Vec<Event>, HandlerError> {
    let mut events = Vec::new();
    for page in pages {
        match page {
            Response::Events { events: page, .. } => events.extend(page),
            other => {
                return Err(HandlerError::UnexpectedResponse(format!(
                    "expected Events, got {}",
                    other.shape()
                )));
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallbackContext;
    use crate::error::RemoteError;
    use crate::progress::OperationStatus;
    use crate::testing::MockClient;

    fn event(message: &str, categories: &[&str]) -> Event {
        Event {
            source_identifier: "db-1".into(),
            source_type: SourceType::DbInstance,
            message: message.into(),
            event_categories: categories.iter().map(|c| c.to_string()).collect(),
            date: Utc::now(),
        }
    }

    fn is_failure(event: &Event) -> bool {
        event.event_categories.iter().any(|c| c == "failure")
    }

    async fn check(mock: &MockClient) -> ProgressEvent<&'static str> {
        check_failed_events(
            mock,
            "db-1",
            SourceType::DbInstance,
            Utc::now(),
            ProgressEvent::progress("db-1", CallbackContext::new()),
            is_failure,
            &HandlerConfig::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_failure_event_fails_progress() {
        let mock = MockClient::new();
        mock.respond_pages(
            "DescribeEvents",
            Ok(vec![
                Response::Events {
                    events: vec![event(
                        "Finished applying modification",
                        &["configuration change"],
                    )],
                    marker: Some("page-2".into()),
                },
                Response::Events {
                    events: vec![event("Storage is incompatible", &["failure"])],
                    marker: None,
                },
            ]),
        );

        let progress = check(&mock).await;

        assert_eq!(progress.status, OperationStatus::Failed);
        assert_eq!(progress.error_code, Some(HandlerErrorCode::GeneralServiceException));
        assert_eq!(progress.message.as_deref(), Some("Storage is incompatible"));
    }

    #[tokio::test]
    async fn test_no_failure_passes_through() {
        let mock = MockClient::new();
        mock.respond_pages(
            "DescribeEvents",
            Ok(vec![Response::Events {
                events: vec![event("Rebooted", &["availability"])],
                marker: None,
            }]),
        );

        let progress = check(&mock).await;
        assert!(progress.is_continuation());
    }

    #[tokio::test]
    async fn test_describe_error_is_classified() {
        let mock = MockClient::new();
        mock.respond_pages(
            "DescribeEvents",
            Err(RemoteError::client("AccessDenied", "not allowed")),
        );

        let progress = check(&mock).await;
        assert_eq!(progress.error_code, Some(HandlerErrorCode::AccessDenied));
    }
}
