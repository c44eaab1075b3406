// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::{
    CallbackContext, HandlerConfig, ProgressEvent, ResourceHandlerRequest, handle_exception,
};
use tracing::instrument;

use super::steps::DESCRIBE_DB_INSTANCE_STEP;
use super::{Clients, default_handler_config};
use crate::model::ResourceModel;
use crate::remote::fetch_db_instance;
use crate::rules::DEFAULT_DB_INSTANCE_ERROR_RULE_SET;
use crate::translator;

pub struct ReadHandler {
    config: HandlerConfig,
}

impl Default for ReadHandler {
    fn default() -> Self {
        Self::new(default_handler_config())
    }
}

impl ReadHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Describe the instance and translate it into the resource model.
    #[instrument(
        skip_all,
        fields(db_instance_identifier = %request.desired_resource_state.identifier())
    )]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        clients: &Clients,
    ) -> ProgressEvent<ResourceModel> {
        let desired = &request.desired_resource_state;
        match fetch_db_instance(clients.rds(), desired.identifier()).await {
            Ok(instance) => {
                ProgressEvent::success(Some(translator::translate_db_instance_from_sdk(&instance)))
            }
            Err(err) => handle_exception(
                ProgressEvent::progress(desired.clone(), context),
                DESCRIBE_DB_INSTANCE_STEP,
                err,
                &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                &self.config,
            ),
        }
    }
}
