// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request logging and tracing setup.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{Request, Response};
use crate::client::RemoteClient;
use crate::error::RemoteError;

/// Placeholder logged instead of paginated and byte results.
pub const RESULT_LOG_OMITTED: &str = "[Result log omitted]";

const REDACTED: &str = "*** redacted ***";

/// Field names whose values never reach the log.
const SENSITIVE_FIELDS: &[&str] = &[
    "masterUserPassword",
    "MasterUserPassword",
    "tdeCredentialPassword",
    "TdeCredentialPassword",
];

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Install a fmt subscriber filtered by `RUST_LOG` (default: info).
///
/// Safe to call more than once; only the first call has an effect, and an
/// already installed global subscriber is left in place.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        use tracing_subscriber::layer::SubscriberExt;

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true);

        let subscriber = tracing_subscriber::Registry::default()
            .with(fmt)
            .with(filter);

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            warn!("Global tracing subscriber already installed");
        }
    });
}

/// Logs requests and responses of one handler invocation.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    stack_id: Option<String>,
    logical_resource_id: Option<String>,
}

impl RequestLogger {
    pub fn new(stack_id: Option<String>, logical_resource_id: Option<String>) -> Self {
        Self {
            stack_id,
            logical_resource_id,
        }
    }

    pub fn log_request(&self, request: &Request) {
        info!(
            stack_id = self.stack_id.as_deref().unwrap_or_default(),
            logical_resource_id = self.logical_resource_id.as_deref().unwrap_or_default(),
            operation = request.operation(),
            request = %redacted_json(request),
            "Remote request"
        );
    }

    pub fn log_response(&self, operation: &str, response: &Response) {
        info!(
            stack_id = self.stack_id.as_deref().unwrap_or_default(),
            logical_resource_id = self.logical_resource_id.as_deref().unwrap_or_default(),
            operation = operation,
            response = %redacted_json(response),
            "Remote response"
        );
    }

    pub fn log_omitted(&self, operation: &str) {
        info!(
            stack_id = self.stack_id.as_deref().unwrap_or_default(),
            logical_resource_id = self.logical_resource_id.as_deref().unwrap_or_default(),
            operation = operation,
            response = RESULT_LOG_OMITTED,
            "Remote response"
        );
    }

    pub fn log_error(&self, operation: &str, err: &RemoteError) {
        warn!(
            stack_id = self.stack_id.as_deref().unwrap_or_default(),
            logical_resource_id = self.logical_resource_id.as_deref().unwrap_or_default(),
            operation = operation,
            error_code = %err.code,
            status_code = err.status_code,
            error = %err.message,
            "Remote call failed"
        );
    }
}

/// JSON rendering of `value` with sensitive fields masked.
pub fn redacted_json<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(mut json) => {
            redact(&mut json);
            json
        }
        Err(err) => Value::String(format!("<unserializable: {err}>")),
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SENSITIVE_FIELDS.contains(&key.as_str()) {
                    if !field.is_null() {
                        *field = Value::String(REDACTED.to_string());
                    }
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Decorates a client with request/response logging.
///
/// Errors are logged and returned unchanged.
pub struct LoggingClient {
    inner: Arc<dyn RemoteClient>,
    logger: RequestLogger,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn RemoteClient>, logger: RequestLogger) -> Self {
        Self { inner, logger }
    }

    /// Wrap `inner` and return it as a trait object.
    pub fn wrap(inner: Arc<dyn RemoteClient>, logger: RequestLogger) -> Arc<dyn RemoteClient> {
        Arc::new(Self::new(inner, logger))
    }
}

#[async_trait]
impl RemoteClient for LoggingClient {
    async fn invoke(&self, request: Request) -> Result<Response, RemoteError> {
        let operation = request.operation();
        self.logger.log_request(&request);
        match self.inner.invoke(request).await {
            Ok(response) => {
                self.logger.log_response(operation, &response);
                Ok(response)
            }
            Err(err) => {
                self.logger.log_error(operation, &err);
                Err(err)
            }
        }
    }

    async fn invoke_iterable(&self, request: Request) -> Result<Vec<Response>, RemoteError> {
        let operation = request.operation();
        self.logger.log_request(&request);
        match self.inner.invoke_iterable(request).await {
            Ok(pages) => {
                self.logger.log_omitted(operation);
                Ok(pages)
            }
            Err(err) => {
                self.logger.log_error(operation, &err);
                Err(err)
            }
        }
    }

    async fn invoke_bytes(&self, request: Request) -> Result<Vec<u8>, RemoteError> {
        let operation = request.operation();
        self.logger.log_request(&request);
        match self.inner.invoke_bytes(request).await {
            Ok(bytes) => {
                self.logger.log_omitted(operation);
                Ok(bytes)
            }
            Err(err) => {
                self.logger.log_error(operation, &err);
                Err(err)
            }
        }
    }
}
