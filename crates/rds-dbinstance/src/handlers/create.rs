// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Create handler.
//!
//! A model without an identifier gets one derived from the stack and
//! logical id, so every re-invocation targets the same instance.

use rds_handler_common::{
    CallChain, CallbackContext, HandlerConfig, HandlerError, ProgressEvent,
    ResourceHandlerRequest, TagSet, exec_once, handle_exception,
};
use tracing::{info, instrument};

use super::read::ReadHandler;
use super::steps::{Progress, Steps, require_model};
use super::{CREATED, Clients, UPDATED_AFTER_CREATE, UPDATED_ROLES, default_handler_config};
use crate::model::ResourceModel;
use crate::predicates::{
    automatic_backup_replication_kms_key_id, automatic_backup_replication_region,
    automatic_backup_replication_retention_period, is_read_replica, is_stabilized_after_mutate,
    validate_automatic_backup_replication,
};
use crate::remote::{invoke_mutation, poll_db_instance};
use crate::rules::{DEFAULT_DB_INSTANCE_ERROR_RULE_SET, MODIFY_DB_INSTANCE_ERROR_RULE_SET};
use crate::translator;

const VALIDATE_STEP: &str = "rds::validate-create";
const CREATE_STEP: &str = "rds::create-db-instance";
const CREATE_READ_REPLICA_STEP: &str = "rds::create-db-instance-read-replica";
const MODIFY_AFTER_CREATE_STEP: &str = "rds::modify-db-instance-after-create";

pub struct CreateHandler {
    config: HandlerConfig,
}

impl Default for CreateHandler {
    fn default() -> Self {
        Self::new(default_handler_config())
    }
}

impl CreateHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    #[instrument(
        skip_all,
        fields(logical_resource_identifier = ?request.logical_resource_identifier)
    )]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        clients: &Clients,
    ) -> ProgressEvent<ResourceModel> {
        let mut request = request.clone();
        let desired = &mut request.desired_resource_state;
        if desired.identifier().is_empty() {
            let identifier = translator::generate_identifier(
                request.stack_id.as_deref(),
                request.logical_resource_identifier.as_deref(),
            );
            info!(db_instance_identifier = %identifier, "Generated DB instance identifier");
            desired.db_instance_identifier = Some(identifier);
        }

        if let Err(err) = validate(&request.desired_resource_state) {
            return handle_exception(
                ProgressEvent::progress(request.desired_resource_state.clone(), context),
                VALIDATE_STEP,
                err,
                &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                &self.config,
            );
        }

        let flow = CreateFlow {
            request: &request,
            steps: Steps::new(clients, &self.config),
            config: &self.config,
        };

        ProgressEvent::progress(request.desired_resource_state.clone(), context)
            .then(|p| flow.create(p))
            .await
            .then(|p| flow.modify_after_create(p))
            .await
            .then(|p| flow.steps.reboot_if_pending(p))
            .await
            .then(|p| flow.associate_roles(p))
            .await
            .then(|p| flow.start_backup_replication(p))
            .await
            .then(|p| flow.read_back(p))
            .await
    }
}

/// An engine is required unless the instance replicates another one.
fn validate(model: &ResourceModel) -> Result<(), HandlerError> {
    if !is_read_replica(model) && model.engine.as_deref().unwrap_or_default().is_empty() {
        return Err(HandlerError::InvalidRequest(
            "Engine is required to create a DB instance".into(),
        ));
    }
    validate_automatic_backup_replication(model)
}

struct CreateFlow<'a> {
    request: &'a ResourceHandlerRequest<ResourceModel>,
    steps: Steps<'a>,
    config: &'a HandlerConfig,
}

impl CreateFlow<'_> {
    fn desired(&self) -> &ResourceModel {
        &self.request.desired_resource_state
    }

    fn tags(&self) -> TagSet {
        TagSet::new(
            self.request.system_tags.clone(),
            self.request.desired_resource_tags.clone(),
            translator::translate_tags_to_sdk(&self.desired().tags),
        )
    }

    async fn create(&self, progress: Progress) -> Progress {
        exec_once(progress, CREATED, |progress| async move {
            let model = self.desired();
            let rds = self.steps.clients.rds();
            let tags = self.tags().merged();
            let (step, request) = if is_read_replica(model) {
                (
                    CREATE_READ_REPLICA_STEP,
                    translator::create_db_instance_read_replica_request(model, &tags),
                )
            } else {
                (
                    CREATE_STEP,
                    translator::create_db_instance_request(model, &tags),
                )
            };

            CallChain::initiate(step, self.config, &DEFAULT_DB_INSTANCE_ERROR_RULE_SET)
                .run(
                    progress,
                    || invoke_mutation(rds, request),
                    || poll_db_instance(rds, model.identifier()),
                    is_stabilized_after_mutate,
                )
                .await
        })
        .await
    }

    /// Read replicas inherit most settings from their source; the rest is
    /// applied by a modification once the replica is available.
    async fn modify_after_create(&self, progress: Progress) -> Progress {
        exec_once(progress, UPDATED_AFTER_CREATE, |progress| async move {
            let model = self.desired();
            if !is_read_replica(model) || !translator::needs_modify_after_create(model) {
                return progress;
            }
            let rds = self.steps.clients.rds();
            CallChain::initiate(
                MODIFY_AFTER_CREATE_STEP,
                self.config,
                &MODIFY_DB_INSTANCE_ERROR_RULE_SET,
            )
            .run(
                progress,
                || invoke_mutation(rds, translator::modify_db_instance_after_create_request(model)),
                || poll_db_instance(rds, model.identifier()),
                is_stabilized_after_mutate,
            )
            .await
        })
        .await
    }

    async fn associate_roles(&self, progress: Progress) -> Progress {
        exec_once(progress, UPDATED_ROLES, |progress| {
            self.steps
                .update_associated_roles(progress, &[], &self.desired().associated_roles)
        })
        .await
    }

    async fn read_back(&self, progress: Progress) -> Progress {
        let context = progress.callback_context.unwrap_or_default();
        ReadHandler::new(self.config.clone())
            .handle_request(self.request, context, self.steps.clients)
            .await
    }

    async fn start_backup_replication(&self, progress: Progress) -> Progress {
        let model = match require_model(&progress) {
            Ok(model) => model,
            Err(err) => {
                return handle_exception(
                    progress,
                    VALIDATE_STEP,
                    err,
                    &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                    self.config,
                );
            }
        };
        let Some(region) = automatic_backup_replication_region(&model) else {
            return progress;
        };

        self.steps
            .capture_replication_source(progress, true)
            .await
            .then(|p| {
                self.steps.start_backup_replication(
                    p,
                    region,
                    automatic_backup_replication_retention_period(&model),
                    automatic_backup_replication_kms_key_id(&model),
                )
            })
            .await
    }
}
