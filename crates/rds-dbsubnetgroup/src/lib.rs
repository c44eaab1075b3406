// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! RDS DB subnet group resource handlers.
//!
//! A subnet group is a dependent object of a DB instance. Its handlers use
//! the same resumable engine as the instance handlers with a single rule set
//! and a `Complete` status as the stabilization target.

pub mod handlers;
pub mod model;
pub mod rules;
pub mod translator;

use std::sync::Arc;

use rds_handler_common::{
    Action, CallbackContext, HandlerConfig, LoggingClient, ProgressEvent, RemoteClient,
    ResourceHandlerRequest,
};
use tracing::instrument;

pub use handlers::{CreateHandler, DeleteHandler, ListHandler, ReadHandler, UpdateHandler};
pub use model::{ResourceModel, Tag};

/// Run the handler for `action` once.
#[instrument(skip_all, fields(action = action.as_str()))]
pub async fn handle(
    action: Action,
    request: &ResourceHandlerRequest<ResourceModel>,
    context: CallbackContext,
    client: Arc<dyn RemoteClient>,
    config: &HandlerConfig,
) -> ProgressEvent<ResourceModel> {
    let client = LoggingClient::wrap(client, request.logger());
    let client = client.as_ref();
    let config = config.clone();
    match action {
        Action::Create => {
            CreateHandler::new(config)
                .handle_request(request, context, client)
                .await
        }
        Action::Read => ReadHandler::new(config).handle_request(request, context, client).await,
        Action::Update => {
            UpdateHandler::new(config)
                .handle_request(request, context, client)
                .await
        }
        Action::Delete => {
            DeleteHandler::new(config)
                .handle_request(request, context, client)
                .await
        }
        Action::List => ListHandler::new(config).handle_request(request, context, client).await,
    }
}
