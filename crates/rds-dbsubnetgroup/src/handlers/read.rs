// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::{
    CallbackContext, HandlerConfig, ProgressEvent, RemoteClient, ResourceHandlerRequest,
    handle_exception,
};
use tracing::instrument;

use super::{DESCRIBE_STEP, fetch_db_subnet_group};
use crate::model::ResourceModel;
use crate::rules::DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET;
use crate::translator;

#[derive(Default)]
pub struct ReadHandler {
    config: HandlerConfig,
}

impl ReadHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(db_subnet_group_name = %request.desired_resource_state.name()))]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        client: &dyn RemoteClient,
    ) -> ProgressEvent<ResourceModel> {
        let desired = &request.desired_resource_state;
        match fetch_db_subnet_group(client, desired.name()).await {
            Ok(group) => {
                let mut model = translator::translate_db_subnet_group_from_sdk(&group);
                model.tags = desired.tags.clone();
                ProgressEvent::success(Some(model))
            }
            Err(err) => handle_exception(
                ProgressEvent::progress(desired.clone(), context),
                DESCRIBE_STEP,
                err,
                &DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET,
                &self.config,
            ),
        }
    }
}
