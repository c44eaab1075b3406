// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::api::DbSubnetGroup;
use rds_handler_common::{
    CallChain, CallbackContext, HandlerConfig, ProgressEvent, RemoteClient,
    ResourceHandlerRequest, exec_once,
};
use tracing::instrument;

use super::{DELETED, fetch_db_subnet_group, invoke_mutation};
use crate::model::ResourceModel;
use crate::rules::DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET;
use crate::translator;

const DELETE_STEP: &str = "rds::delete-db-subnet-group";

#[derive(Default)]
pub struct DeleteHandler {
    config: HandlerConfig,
}

impl DeleteHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Delete the group; not-found while waiting means it is gone.
    #[instrument(skip_all, fields(db_subnet_group_name = %request.desired_resource_state.name()))]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        client: &dyn RemoteClient,
    ) -> ProgressEvent<ResourceModel> {
        let model = &request.desired_resource_state;
        let progress = exec_once(
            ProgressEvent::progress(model.clone(), context),
            DELETED,
            |progress| async move {
                let delete = translator::delete_db_subnet_group_request(model);
                CallChain::initiate(
                    DELETE_STEP,
                    &self.config,
                    &DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET,
                )
                .not_found_is_stable()
                .run(
                    progress,
                    || invoke_mutation(client, delete),
                    || fetch_db_subnet_group(client, model.name()),
                    |_: &DbSubnetGroup| false,
                )
                .await
            },
        )
        .await;

        if progress.is_continuation() {
            ProgressEvent::success(None)
        } else {
            progress
        }
    }
}
