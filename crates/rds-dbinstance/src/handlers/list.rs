// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::{
    CallbackContext, HandlerConfig, ProgressEvent, ResourceHandlerRequest, handle_exception,
};
use tracing::{debug, instrument};

use super::{Clients, default_handler_config};
use crate::model::ResourceModel;
use crate::remote::describe_db_instances;
use crate::rules::DEFAULT_DB_INSTANCE_ERROR_RULE_SET;
use crate::translator;

const DESCRIBE_DB_INSTANCES_STEP: &str = "rds::describe-db-instances";

/// Lists one page of instances per invocation.
pub struct ListHandler {
    config: HandlerConfig,
}

impl Default for ListHandler {
    fn default() -> Self {
        Self::new(default_handler_config())
    }
}

impl ListHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(next_token = ?request.next_token))]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        clients: &Clients,
    ) -> ProgressEvent<ResourceModel> {
        match describe_db_instances(clients.rds(), request.next_token.clone()).await {
            Ok((instances, marker)) => {
                debug!(count = instances.len(), has_more = marker.is_some(), "Listed DB instances");
                let models = instances
                    .iter()
                    .map(translator::translate_db_instance_from_sdk)
                    .collect();
                ProgressEvent::success_list(models, marker)
            }
            Err(err) => handle_exception(
                ProgressEvent::progress(request.desired_resource_state.clone(), context),
                DESCRIBE_DB_INSTANCES_STEP,
                err,
                &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                &self.config,
            ),
        }
    }
}
