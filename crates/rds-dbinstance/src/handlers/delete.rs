// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use rds_handler_common::api::DbInstance;
use rds_handler_common::{
    CallChain, CallbackContext, HandlerConfig, ProgressEvent, ResourceHandlerRequest, exec_once,
};
use tracing::{info, instrument};

use super::{Clients, DELETED, default_handler_config};
use crate::model::ResourceModel;
use crate::predicates::{is_db_cluster_member, is_read_replica};
use crate::remote::{fetch_db_instance, invoke_mutation};
use crate::rules::DELETE_DB_INSTANCE_ERROR_RULE_SET;
use crate::translator;

const DELETE_STEP: &str = "rds::delete-db-instance";

pub struct DeleteHandler {
    config: HandlerConfig,
}

impl Default for DeleteHandler {
    fn default() -> Self {
        Self::new(default_handler_config())
    }
}

impl DeleteHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Delete the instance and wait until it is gone.
    ///
    /// Not-found after the delete call was issued means the deletion
    /// finished; not-found on the call itself fails with NotFound.
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
        let model = &request.desired_resource_state;
        let rds = clients.rds();
        let final_snapshot = final_snapshot_identifier(request);

        let progress = exec_once(
            ProgressEvent::progress(model.clone(), context),
            DELETED,
            |progress| async move {
                CallChain::initiate(DELETE_STEP, &self.config, &DELETE_DB_INSTANCE_ERROR_RULE_SET)
                    .not_found_is_stable()
                    .run(
                        progress,
                        || {
                            info!(final_snapshot = ?final_snapshot, "Deleting DB instance");
                            invoke_mutation(
                                rds,
                                translator::delete_db_instance_request(model, final_snapshot),
                            )
                        },
                        || fetch_db_instance(rds, model.identifier()),
                        |_: &DbInstance| false,
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

/// Cluster members and read replicas never take a final snapshot.
fn final_snapshot_identifier(request: &ResourceHandlerRequest<ResourceModel>) -> Option<String> {
    let model = &request.desired_resource_state;
    if !request.snapshot_requested || is_db_cluster_member(model) || is_read_replica(model) {
        return None;
    }
    Some(translator::final_snapshot_identifier(model))
}
