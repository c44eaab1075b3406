// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::{
    CallChain, CallbackContext, HandlerConfig, ProgressEvent, RemoteClient,
    ResourceHandlerRequest, TagSet, exec_once,
};
use tracing::{info, instrument};

use super::read::ReadHandler;
use super::{CREATED, fetch_db_subnet_group, invoke_mutation, is_complete};
use crate::model::ResourceModel;
use crate::rules::DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET;
use crate::translator;

const CREATE_STEP: &str = "rds::create-db-subnet-group";

#[derive(Default)]
pub struct CreateHandler {
    config: HandlerConfig,
}

impl CreateHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Create the group and wait until it reports `Complete`.
    #[instrument(
        skip_all,
        fields(logical_resource_identifier = ?request.logical_resource_identifier)
    )]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        client: &dyn RemoteClient,
    ) -> ProgressEvent<ResourceModel> {
        let mut request = request.clone();
        if request.desired_resource_state.name().is_empty() {
            let name = translator::generate_name(
                request.stack_id.as_deref(),
                request.logical_resource_identifier.as_deref(),
            );
            info!(db_subnet_group_name = %name, "Generated DB subnet group name");
            request.desired_resource_state.db_subnet_group_name = Some(name);
        }
        let request = &request;
        let model = &request.desired_resource_state;
        let tags = TagSet::new(
            request.system_tags.clone(),
            request.desired_resource_tags.clone(),
            translator::translate_tags_to_sdk(&model.tags),
        )
        .merged();

        let progress = exec_once(
            ProgressEvent::progress(model.clone(), context),
            CREATED,
            |progress| async move {
                let create = translator::create_db_subnet_group_request(model, &tags);
                CallChain::initiate(
                    CREATE_STEP,
                    &self.config,
                    &DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET,
                )
                .run(
                    progress,
                    || invoke_mutation(client, create),
                    || fetch_db_subnet_group(client, model.name()),
                    is_complete,
                )
                .await
            },
        )
        .await;

        progress
            .then(|p| async move {
                let context = p.callback_context.unwrap_or_default();
                ReadHandler::new(self.config.clone())
                    .handle_request(request, context, client)
                    .await
            })
            .await
    }
}
