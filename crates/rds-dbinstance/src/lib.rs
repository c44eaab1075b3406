// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! RDS DB instance resource handlers.
//!
//! Create, read, update, delete and list handlers for a DB instance, built on
//! the resumable engine in [`rds_handler_common`]. Every handler returns after
//! at most one mutating call or stabilization probe; the host re-invokes it
//! with the [`CallbackContext`] of the previous [`ProgressEvent`] until the
//! event is terminal.
//!
//! # Example
//!
//! ```ignore
//! let clients = Clients::single(rds_client, ec2_client);
//! let mut context = CallbackContext::new();
//! loop {
//!     let event = handle(Action::Update, &request, context, &clients, &config).await;
//!     if !event.is_pending() {
//!         break event;
//!     }
//!     context = event.callback_context.unwrap_or_default();
//! }
//! ```

pub mod handlers;
pub mod immutability;
pub mod model;
pub mod predicates;
pub mod remote;
pub mod rules;
pub mod status;
pub mod translator;

use rds_handler_common::{
    Action, CallbackContext, HandlerConfig, ProgressEvent, ResourceHandlerRequest,
};
use tracing::instrument;

pub use handlers::{
    Clients, CreateHandler, DeleteHandler, ListHandler, ReadHandler, UpdateHandler,
    default_handler_config,
};
pub use model::{DbInstanceRole, Endpoint, ResourceModel, Tag};

/// Run the handler for `action` once.
#[instrument(skip_all, fields(action = action.as_str()))]
pub async fn handle(
    action: Action,
    request: &ResourceHandlerRequest<ResourceModel>,
    context: CallbackContext,
    clients: &Clients,
    config: &HandlerConfig,
) -> ProgressEvent<ResourceModel> {
    let clients = clients.with_logging(&request.logger());
    let config = config.clone();
    match action {
        Action::Create => {
            CreateHandler::new(config)
                .handle_request(request, context, &clients)
                .await
        }
        Action::Read => {
            ReadHandler::new(config)
                .handle_request(request, context, &clients)
                .await
        }
        Action::Update => {
            UpdateHandler::new(config)
                .handle_request(request, context, &clients)
                .await
        }
        Action::Delete => {
            DeleteHandler::new(config)
                .handle_request(request, context, &clients)
                .await
        }
        Action::List => {
            ListHandler::new(config)
                .handle_request(request, context, &clients)
                .await
        }
    }
}
