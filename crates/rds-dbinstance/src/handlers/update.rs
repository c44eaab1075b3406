// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Update handler.
//!
//! The step order is load-bearing: immutable changes are rejected before
//! anything is mutated, implicit fields are resolved before the modify call
//! reads the model, and storage-full instances get their storage increased
//! before the modify call that would otherwise be refused.

use chrono::Utc;
use rds_handler_common::api::{DbCluster, SourceType};
use rds_handler_common::tagging::reconcile_tags;
use rds_handler_common::{
    ApiVersion, CallChain, CallbackContext, HandlerConfig, HandlerError, HandlerErrorCode,
    ProgressEvent, ResourceHandlerRequest, TagSet, check_failed_events, exec_once,
    exec_once_with, handle_exception, report_drift,
};
use tracing::{debug, info, instrument};

use super::read::ReadHandler;
use super::steps::{DESCRIBE_DB_INSTANCE_STEP, Progress, Steps, require_model};
use super::{
    ALLOCATING_STORAGE, API_VERSION_DISPATCHER, Clients, DB_INSTANCE_ARN, READ_REPLICA_PROMOTED,
    RESOURCE_UPDATED_AT, STORAGE_ALLOCATED, UPDATED, UPDATED_ROLES, default_handler_config,
};
use crate::immutability::is_change_mutable;
use crate::model::ResourceModel;
use crate::predicates::{
    automatic_backup_replication_kms_key_id, automatic_backup_replication_region,
    automatic_backup_replication_retention_period, is_cluster_parameter_group_in_sync,
    is_cluster_parameter_group_pending_reboot, is_db_cluster_member, is_failure_event,
    is_option_group_in_sync, is_parameter_group_in_sync, is_rds_custom_oracle_instance,
    is_read_replica_promotion, is_stabilized_after_mutate, should_apply_immediately,
    should_start_automatic_backup_replication, should_stop_automatic_backup_replication,
    validate_automatic_backup_replication,
};
use crate::remote::{
    describe_db_engine_versions, fetch_db_cluster, fetch_db_instance, fetch_db_parameter_group,
    fetch_security_group, invoke_mutation, poll_db_instance,
};
use crate::rules::{DEFAULT_DB_INSTANCE_ERROR_RULE_SET, MODIFY_DB_INSTANCE_ERROR_RULE_SET};
use crate::status::DbInstanceStatus;
use crate::translator;

const OPERATION: &str = "UPDATE";
const DEFAULT_SECURITY_GROUP_NAME: &str = "default";

const VALIDATE_STEP: &str = "rds::validate-update";
const DESCRIBE_PARAMETER_GROUP_STEP: &str = "rds::describe-db-parameter-groups";
const DESCRIBE_SECURITY_GROUP_STEP: &str = "rds::describe-security-groups";
const ALLOCATE_STORAGE_STEP: &str = "rds::increase-allocated-storage";
const PROMOTE_STEP: &str = "rds::promote-read-replica";
const MODIFY_STEP: &str = "rds::modify-db-instance";
const PARAMETER_GROUP_DRIFT_STEP: &str = "rds::stabilize-db-parameter-group-drift";
const OPTION_GROUP_DRIFT_STEP: &str = "rds::stabilize-option-group-drift";
const CLUSTER_PARAMETER_GROUP_DRIFT_STEP: &str = "rds::stabilize-db-cluster-parameter-group-drift";

/// Properties that are never read back and so never count as drift.
const DRIFT_IGNORED_PROPERTIES: [&str; 9] = [
    "MasterUserPassword",
    "ApplyImmediately",
    "AllowMajorVersionUpgrade",
    "SourceRegion",
    "DeleteAutomatedBackups",
    "AutomaticBackupReplicationRegion",
    "AutomaticBackupReplicationRetentionPeriod",
    "AutomaticBackupReplicationKmsKeyId",
    "Endpoint",
];

pub struct UpdateHandler {
    config: HandlerConfig,
}

impl Default for UpdateHandler {
    fn default() -> Self {
        Self::new(default_handler_config())
    }
}

impl UpdateHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    #[instrument(
        skip_all,
        fields(
            operation = OPERATION,
            db_instance_identifier = %request.desired_resource_state.identifier()
        )
    )]
    pub async fn handle_request(
        &self,
        request: &ResourceHandlerRequest<ResourceModel>,
        context: CallbackContext,
        clients: &Clients,
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
        if let Err(err) = validate_automatic_backup_replication(desired) {
            return handle_exception(
                ProgressEvent::progress(desired.clone(), context),
                VALIDATE_STEP,
                err,
                &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                &self.config,
            );
        }

        let flow = UpdateFlow {
            request,
            previous,
            steps: Steps::new(clients, &self.config),
            config: &self.config,
        };

        // The deployed engine is only consulted when the previous model lacks one.
        let observed = if previous.engine.as_deref().unwrap_or_default().is_empty() {
            match fetch_db_instance(clients.rds(), previous.identifier()).await {
                Ok(instance) => Some(instance),
                Err(err) => {
                    return handle_exception(
                        ProgressEvent::progress(previous.clone(), context),
                        DESCRIBE_DB_INSTANCE_STEP,
                        err,
                        &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                        &self.config,
                    );
                }
            }
        } else {
            None
        };

        if !is_change_mutable(previous, desired, observed.as_ref()) {
            return ProgressEvent::failed(
                Some(desired.clone()),
                Some(context),
                HandlerErrorCode::NotUpdatable,
                "Resource is immutable",
            );
        }

        if request.driftable {
            info!("Reconciling resource drift");
            return flow.handle_resource_drift(context).await;
        }

        ProgressEvent::progress(desired.clone(), context)
            .then(|p| flow.validate_engine_lifecycle_support(p))
            .await
            .then(|p| flow.set_parameter_group_name(p))
            .await
            .then(|p| flow.set_default_vpc_security_group(p))
            .await
            .then(|p| flow.unset_max_allocated_storage(p))
            .await
            .then(|p| flow.allocate_storage(p))
            .await
            .then(|p| flow.promote_read_replica(p))
            .await
            .then(|p| flow.modify(p))
            .await
            .then(|p| flow.steps.reboot_if_pending(p))
            .await
            .then(|p| flow.update_associated_roles(p))
            .await
            .then(|p| flow.update_backup_replication(p))
            .await
            .then(|p| flow.update_tags(p))
            .await
            .then(|p| flow.read_back(p))
            .await
    }
}

struct UpdateFlow<'a> {
    request: &'a ResourceHandlerRequest<ResourceModel>,
    previous: &'a ResourceModel,
    steps: Steps<'a>,
    config: &'a HandlerConfig,
}

impl UpdateFlow<'_> {
    fn desired(&self) -> &ResourceModel {
        &self.request.desired_resource_state
    }

    fn fail(&self, progress: Progress, step: &str, err: HandlerError) -> Progress {
        handle_exception(
            progress,
            step,
            err,
            &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
            self.config,
        )
    }

    fn fail_modify(&self, progress: Progress, step: &str, err: HandlerError) -> Progress {
        handle_exception(
            progress,
            step,
            err,
            &MODIFY_DB_INSTANCE_ERROR_RULE_SET,
            self.config,
        )
    }

    async fn validate_engine_lifecycle_support(&self, progress: Progress) -> Progress {
        if self.desired().engine_lifecycle_support != self.previous.engine_lifecycle_support
            && !self.request.rollback
        {
            return self.fail_modify(
                progress,
                MODIFY_STEP,
                HandlerError::InvalidRequest("EngineLifecycleSupport cannot be modified.".into()),
            );
        }
        progress
    }

    /// On rollback of a combined parameter group and engine version change,
    /// keep the parameter group only if its family supports the engine version.
    async fn set_parameter_group_name(&self, mut progress: Progress) -> Progress {
        let desired = self.desired();
        let should_set = desired.db_parameter_group_name != self.previous.db_parameter_group_name
            && desired.engine_version != self.previous.engine_version
            && self.request.rollback;
        if !should_set {
            return progress;
        }
        let Some(name) = desired
            .db_parameter_group_name
            .as_deref()
            .filter(|name| !name.is_empty())
        else {
            return progress;
        };

        let rds = self.steps.clients.rds();
        let group = match fetch_db_parameter_group(rds, name).await {
            Ok(Some(group)) => group,
            Ok(None) => return progress,
            Err(err) => return self.fail(progress, DESCRIBE_PARAMETER_GROUP_STEP, err),
        };
        let versions = match describe_db_engine_versions(
            rds,
            &group.db_parameter_group_family,
            desired.engine.as_deref(),
            desired.engine_version.as_deref(),
        )
        .await
        {
            Ok(versions) => versions,
            Err(err) => return self.fail(progress, DESCRIBE_PARAMETER_GROUP_STEP, err),
        };

        if versions.is_empty() {
            debug!(
                db_parameter_group_name = name,
                "Parameter group family has no matching engine version, clearing"
            );
            if let Some(model) = progress.resource_model.as_mut() {
                model.db_parameter_group_name = None;
            }
        }
        progress
    }

    /// Cluster members inherit the cluster's VPC security groups and custom
    /// Oracle instances manage their own.
    async fn set_default_vpc_security_group(&self, mut progress: Progress) -> Progress {
        let desired = self.desired();
        if is_db_cluster_member(desired)
            || is_rds_custom_oracle_instance(desired)
            || !desired.vpc_security_groups.is_empty()
        {
            return progress;
        }

        let instance = match fetch_db_instance(self.steps.clients.rds(), desired.identifier()).await
        {
            Ok(instance) => instance,
            Err(err) => return self.fail(progress, DESCRIBE_SECURITY_GROUP_STEP, err),
        };
        let Some(vpc_id) = instance.db_subnet_group.and_then(|group| group.vpc_id) else {
            return progress;
        };
        let group = match fetch_security_group(
            self.steps.clients.ec2(),
            &vpc_id,
            DEFAULT_SECURITY_GROUP_NAME,
        )
        .await
        {
            Ok(group) => group,
            Err(err) => return self.fail(progress, DESCRIBE_SECURITY_GROUP_STEP, err),
        };

        if let Some(group_id) = group.map(|g| g.group_id).filter(|id| !id.is_empty()) {
            debug!(vpc_id = %vpc_id, group_id = %group_id, "Resolved default VPC security group");
            if let Some(model) = progress.resource_model.as_mut() {
                model.vpc_security_groups = vec![group_id];
            }
        }
        progress
    }

    /// Storage autoscaling is switched off by setting the ceiling to the
    /// currently allocated storage.
    async fn unset_max_allocated_storage(&self, mut progress: Progress) -> Progress {
        if self.previous.max_allocated_storage.is_none()
            || self.desired().max_allocated_storage.is_some()
        {
            return progress;
        }
        match fetch_db_instance(self.steps.clients.rds(), self.desired().identifier()).await {
            Ok(instance) => {
                if let Some(model) = progress.resource_model.as_mut() {
                    model.max_allocated_storage = instance.allocated_storage;
                }
                progress
            }
            Err(err) => self.fail_modify(progress, MODIFY_STEP, err),
        }
    }

    fn is_allocated_storage_increase(&self) -> bool {
        !self.request.rollback
            && translator::allocated_storage(self.desired())
                > translator::allocated_storage(self.previous)
    }

    /// A storage-full instance refuses every modification but a storage
    /// increase, so the increase goes first.
    async fn allocate_storage(&self, progress: Progress) -> Progress {
        exec_once_with(
            progress,
            |context| context.is_done(STORAGE_ALLOCATED),
            |context| context.mark_done(STORAGE_ALLOCATED),
            |mut progress| async move {
                if !self.is_allocated_storage_increase() {
                    return progress;
                }
                let rds = self.steps.clients.rds();
                let identifier = self.desired().identifier();

                if !progress.context_mut().is_done(ALLOCATING_STORAGE) {
                    match fetch_db_instance(rds, identifier).await {
                        Ok(instance)
                            if DbInstanceStatus::StorageFull
                                .equals_str(instance.db_instance_status.as_deref()) => {}
                        Ok(_) => return progress,
                        Err(err) => return self.fail_modify(progress, ALLOCATE_STORAGE_STEP, err),
                    }
                    progress.context_mut().mark_done(ALLOCATING_STORAGE);
                }

                let model = match require_model(&progress) {
                    Ok(model) => model,
                    Err(err) => return self.fail(progress, ALLOCATE_STORAGE_STEP, err),
                };
                info!(
                    allocated_storage = ?model.allocated_storage,
                    "Increasing storage of a full instance"
                );
                CallChain::initiate(
                    ALLOCATE_STORAGE_STEP,
                    self.config,
                    &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
                )
                .run(
                    progress,
                    || invoke_mutation(rds, translator::update_allocated_storage_request(&model)),
                    || poll_db_instance(rds, identifier),
                    is_stabilized_after_mutate,
                )
                .await
            },
        )
        .await
    }

    async fn promote_read_replica(&self, progress: Progress) -> Progress {
        exec_once(progress, READ_REPLICA_PROMOTED, |progress| async move {
            if !is_read_replica_promotion(self.previous, self.desired()) {
                return progress;
            }
            let model = match require_model(&progress) {
                Ok(model) => model,
                Err(err) => return self.fail(progress, PROMOTE_STEP, err),
            };
            let rds = self.steps.clients.rds();
            CallChain::initiate(PROMOTE_STEP, self.config, &DEFAULT_DB_INSTANCE_ERROR_RULE_SET)
                .run(
                    progress,
                    || invoke_mutation(rds, translator::promote_read_replica_request(&model)),
                    || poll_db_instance(rds, model.identifier()),
                    is_stabilized_after_mutate,
                )
                .await
        })
        .await
    }

    /// The primary modification, dispatched by negotiated API version and
    /// followed by a scan of the event stream for asynchronous failures.
    async fn modify(&self, progress: Progress) -> Progress {
        exec_once(progress, UPDATED, |mut progress| async move {
            progress
                .context_mut()
                .timestamp_once(RESOURCE_UPDATED_AT, Utc::now());
            let model = match require_model(&progress) {
                Ok(model) => model,
                Err(err) => return self.fail_modify(progress, MODIFY_STEP, err),
            };
            let version = API_VERSION_DISPATCHER.negotiate(&model, progress.context_mut());
            let clients = self.steps.clients;
            let rds = clients.rds();
            let previous = self.previous;
            let rollback = self.request.rollback;
            let desired = &model;
            let identifier = model.identifier();

            let progress = CallChain::initiate(
                MODIFY_STEP,
                self.config,
                &MODIFY_DB_INSTANCE_ERROR_RULE_SET,
            )
            .run(
                progress,
                || async move {
                    let request = match version {
                        ApiVersion::V12 => {
                            translator::modify_db_instance_v12_request(previous, desired, rollback)
                        }
                        ApiVersion::Default => {
                            let observed = fetch_db_instance(rds, identifier).await?;
                            translator::modify_db_instance_request(
                                previous, desired, &observed, rollback,
                            )
                        }
                    };
                    invoke_mutation(clients.rds.client(version), request).await
                },
                || poll_db_instance(rds, identifier),
                is_stabilized_after_mutate,
            )
            .await;

            let since = progress
                .callback_context
                .as_ref()
                .and_then(|context| context.timestamp(RESOURCE_UPDATED_AT))
                .unwrap_or_else(Utc::now);
            progress
                .then(|p| {
                    check_failed_events(
                        rds,
                        identifier,
                        SourceType::DbInstance,
                        since,
                        p,
                        is_failure_event,
                        self.config,
                    )
                })
                .await
        })
        .await
    }

    async fn update_associated_roles(&self, progress: Progress) -> Progress {
        exec_once(progress, UPDATED_ROLES, |progress| {
            self.steps.update_associated_roles(
                progress,
                &self.previous.associated_roles,
                &self.desired().associated_roles,
            )
        })
        .await
    }

    async fn update_backup_replication(&self, progress: Progress) -> Progress {
        let desired = self.desired();
        let stop = should_stop_automatic_backup_replication(self.previous, desired);
        let start = should_start_automatic_backup_replication(self.previous, desired);

        let mut progress = self
            .steps
            .capture_replication_source(progress, stop || start)
            .await;
        if stop {
            if let Some(region) = automatic_backup_replication_region(self.previous) {
                progress = progress
                    .then(|p| self.steps.stop_backup_replication(p, region))
                    .await;
            }
        }
        if start {
            if let Some(region) = automatic_backup_replication_region(desired) {
                progress = progress
                    .then(|p| {
                        self.steps.start_backup_replication(
                            p,
                            region,
                            automatic_backup_replication_retention_period(desired),
                            automatic_backup_replication_kms_key_id(desired),
                        )
                    })
                    .await;
            }
        }
        progress
    }

    fn tag_sets(&self) -> (TagSet, TagSet) {
        let request = self.request;
        let previous = TagSet::new(
            request.previous_system_tags.clone(),
            request.previous_resource_tags.clone(),
            translator::translate_tags_to_sdk(&self.previous.tags),
        );
        let desired = TagSet::new(
            request.system_tags.clone(),
            request.desired_resource_tags.clone(),
            translator::translate_tags_to_sdk(&self.desired().tags),
        );
        (previous, desired)
    }

    async fn update_tags(&self, progress: Progress) -> Progress {
        let (previous, desired) = self.tag_sets();
        if previous.merged() == desired.merged() {
            return progress;
        }

        let rds = self.steps.clients.rds();
        let captured = progress
            .callback_context
            .as_ref()
            .and_then(|context| context.get(DB_INSTANCE_ARN))
            .map(str::to_string);
        let arn = match captured {
            Some(arn) => arn,
            None => match fetch_db_instance(rds, self.desired().identifier()).await {
                Ok(instance) => match instance.db_instance_arn {
                    Some(arn) => arn,
                    None => {
                        let err = HandlerError::UnexpectedResponse(format!(
                            "DB instance {} has no ARN",
                            instance.db_instance_identifier
                        ));
                        return self.fail(progress, DESCRIBE_DB_INSTANCE_STEP, err);
                    }
                },
                Err(err) => return self.fail(progress, DESCRIBE_DB_INSTANCE_STEP, err),
            },
        };

        reconcile_tags(
            rds,
            &arn,
            &previous,
            &desired,
            progress,
            &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
            self.config,
        )
        .await
    }

    /// Read the instance back and report drift against the desired model.
    async fn read_back(&self, progress: Progress) -> Progress {
        let (_, desired_tags) = self.tag_sets();
        let mut expected = self.desired().clone();
        expected.tags = translator::translate_tags_from_sdk(&desired_tags.merged());

        let context = progress.callback_context.unwrap_or_default();
        let read = ReadHandler::new(self.config.clone())
            .handle_request(self.request, context, self.steps.clients)
            .await;
        report_drift(&expected, read, &DRIFT_IGNORED_PROPERTIES, OPERATION)
    }

    // ========================================================================
    // Drift sub-flow
    // ========================================================================

    async fn handle_resource_drift(&self, context: CallbackContext) -> Progress {
        ProgressEvent::progress(self.desired().clone(), context)
            .then(|p| self.reboot_for_drift(p))
            .await
            .then(|p| self.await_parameter_group_in_sync(p))
            .await
            .then(|p| self.await_option_group_in_sync(p))
            .await
            .then(|p| self.await_cluster_parameter_group(p))
            .await
            .then(|p| async move {
                let context = p.callback_context.unwrap_or_default();
                ReadHandler::new(self.config.clone())
                    .handle_request(self.request, context, self.steps.clients)
                    .await
            })
            .await
    }

    async fn should_reboot_cluster(&self, model: &ResourceModel) -> Result<bool, HandlerError> {
        let cluster_identifier = model.db_cluster_identifier.as_deref().unwrap_or_default();
        let cluster = fetch_db_cluster(self.steps.clients.rds(), cluster_identifier).await?;
        Ok(should_apply_immediately(model)
            && is_cluster_parameter_group_pending_reboot(&cluster, model.identifier()))
    }

    async fn reboot_for_drift(&self, mut progress: Progress) -> Progress {
        let chain = CallChain::initiate(
            super::steps::REBOOT_STEP,
            self.config,
            &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
        );
        if !chain.is_issued(progress.context_mut()) {
            let model = match require_model(&progress) {
                Ok(model) => model,
                Err(err) => return self.fail(progress, super::steps::REBOOT_STEP, err),
            };
            let reboot = match self.steps.should_reboot(&model).await {
                Ok(true) => Ok(true),
                Ok(false) if is_db_cluster_member(&model) => {
                    self.should_reboot_cluster(&model).await
                }
                other => other,
            };
            match reboot {
                Ok(true) => {}
                Ok(false) => return progress,
                Err(err) => return self.fail(progress, super::steps::REBOOT_STEP, err),
            }
        }
        self.steps.reboot_await(progress).await
    }

    async fn await_parameter_group_in_sync(&self, progress: Progress) -> Progress {
        let rds = self.steps.clients.rds();
        let identifier = self.desired().identifier();
        CallChain::initiate(
            PARAMETER_GROUP_DRIFT_STEP,
            self.config,
            &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
        )
        .stabilize(
            progress,
            || poll_db_instance(rds, identifier),
            is_parameter_group_in_sync,
        )
        .await
    }

    async fn await_option_group_in_sync(&self, progress: Progress) -> Progress {
        let rds = self.steps.clients.rds();
        let identifier = self.desired().identifier();
        CallChain::initiate(
            OPTION_GROUP_DRIFT_STEP,
            self.config,
            &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
        )
        .stabilize(
            progress,
            || poll_db_instance(rds, identifier),
            is_option_group_in_sync,
        )
        .await
    }

    async fn await_cluster_parameter_group(&self, progress: Progress) -> Progress {
        let desired = self.desired();
        if !is_db_cluster_member(desired) {
            return progress;
        }
        let rds = self.steps.clients.rds();
        let cluster_identifier = desired.db_cluster_identifier.as_deref().unwrap_or_default();
        let identifier = desired.identifier();
        CallChain::initiate(
            CLUSTER_PARAMETER_GROUP_DRIFT_STEP,
            self.config,
            &DEFAULT_DB_INSTANCE_ERROR_RULE_SET,
        )
        .stabilize(
            progress,
            || fetch_db_cluster(rds, cluster_identifier),
            |cluster: &DbCluster| is_cluster_parameter_group_in_sync(cluster, identifier),
        )
        .await
    }
}
