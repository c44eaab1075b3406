// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::{
    CallbackContext, HandlerConfig, ProgressEvent, RemoteClient, ResourceHandlerRequest,
    handle_exception,
};
use tracing::instrument;

use super::describe;
use crate::model::ResourceModel;
use crate::rules::DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET;
use crate::translator;

const DESCRIBE_GROUPS_STEP: &str = "rds::describe-db-subnet-groups";

#[derive(Default)]
pub struct ListHandler {
    config: HandlerConfig,
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
        client: &dyn RemoteClient,
    ) -> ProgressEvent<ResourceModel> {
        let describe_request =
            translator::describe_db_subnet_groups_request(request.next_token.clone());
        match describe(client, describe_request).await {
            Ok((groups, marker)) => ProgressEvent::success_list(
                groups
                    .iter()
                    .map(translator::translate_db_subnet_group_from_sdk)
                    .collect(),
                marker,
            ),
            Err(err) => handle_exception(
                ProgressEvent::progress(request.desired_resource_state.clone(), context),
                DESCRIBE_GROUPS_STEP,
                err,
                &DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET,
                &self.config,
            ),
        }
    }
}
