// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::tagging::reconcile_tags;
use rds_handler_common::{
    CallChain, CallbackContext, HandlerConfig, HandlerError, HandlerErrorCode, ProgressEvent,
    RemoteClient, ResourceHandlerRequest, TagSet, exec_once, handle_exception,
};
use tracing::instrument;

use super::read::ReadHandler;
use super::{DESCRIBE_STEP, UPDATED, fetch_db_subnet_group, invoke_mutation, is_complete};
use crate::model::ResourceModel;
use crate::rules::DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET;
use crate::translator;

const MODIFY_STEP: &str = "rds::modify-db-subnet-group";

#[derive(Default)]
pub struct UpdateHandler {
    config: HandlerConfig,
}

impl UpdateHandler {
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
        let Some(previous) = request.previous_resource_state.as_ref() else {
            return ProgressEvent::failed(
                Some(desired.clone()),
                Some(context),
                HandlerErrorCode::InvalidRequest,
                "previous resource state is required",
            );
        };
        let rules = &DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET;

        ProgressEvent::progress(desired.clone(), context)
            .then(|p| {
                exec_once(p, UPDATED, |p| async move {
                    let modify = translator::modify_db_subnet_group_request(desired);
                    CallChain::initiate(MODIFY_STEP, &self.config, rules)
                        .run(
                            p,
                            || invoke_mutation(client, modify),
                            || fetch_db_subnet_group(client, desired.name()),
                            is_complete,
                        )
                        .await
                })
            })
            .await
            .then(|p| async move {
                let previous_tags = TagSet::new(
                    request.previous_system_tags.clone(),
                    request.previous_resource_tags.clone(),
                    translator::translate_tags_to_sdk(&previous.tags),
                );
                let desired_tags = TagSet::new(
                    request.system_tags.clone(),
                    request.desired_resource_tags.clone(),
                    translator::translate_tags_to_sdk(&desired.tags),
                );
                if previous_tags.merged() == desired_tags.merged() {
                    return p;
                }
                let arn = match fetch_db_subnet_group(client, desired.name()).await {
                    Ok(group) => group.db_subnet_group_arn,
                    Err(err) => {
                        return handle_exception(p, DESCRIBE_STEP, err, rules, &self.config);
                    }
                };
                let Some(arn) = arn else {
                    let err = HandlerError::UnexpectedResponse(format!(
                        "DB subnet group {} has no ARN",
                        desired.name()
                    ));
                    return handle_exception(p, DESCRIBE_STEP, err, rules, &self.config);
                };
                reconcile_tags(
                    client,
                    &arn,
                    &previous_tags,
                    &desired_tags,
                    p,
                    rules,
                    &self.config,
                )
                .await
            })
            .await
            .then(|p| async move {
                let context = p.callback_context.unwrap_or_default();
                ReadHandler::new(self.config.clone())
                    .handle_request(request, context, client)
                    .await
            })
            .await
    }
}
