// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pipeline steps shared by the create and update handlers.

use std::collections::BTreeSet;

use rds_handler_common::api::DbInstance;
use rds_handler_common::{
    CallChain, HandlerConfig, HandlerError, ProgressEvent, Result, exec_once, exec_once_with,
    handle_exception,
};
use tracing::debug;

use super::{
    BACKUP_REPLICATION_STARTED, BACKUP_REPLICATION_STOPPED, Clients, DB_INSTANCE_ARN, KMS_KEY_ID,
    REBOOTED,
};
use crate::model::{DbInstanceRole, ResourceModel};
use crate::predicates::{
    has_role, is_backup_replication_started, is_backup_replication_stopped,
    is_parameter_group_pending_reboot, is_stabilized_after_reboot, lacks_role,
    should_apply_immediately,
};
use crate::remote::{fetch_db_instance, invoke_mutation, is_not_found, poll_db_instance};
use crate::rules::{
    ADD_ASSOCIATED_ROLES_ERROR_RULE_SET, BACKUP_REPLICATION_ERROR_RULE_SET,
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET, REBOOT_DB_INSTANCE_ERROR_RULE_SET,
    REMOVE_ASSOCIATED_ROLES_ERROR_RULE_SET,
};
use crate::translator;

pub(crate) const DESCRIBE_DB_INSTANCE_STEP: &str = "rds::describe-db-instance";
pub(crate) const REBOOT_STEP: &str = "rds::reboot-db-instance";
const ADD_ROLE_STEP: &str = "rds::add-role-to-db-instance";
const REMOVE_ROLE_STEP: &str = "rds::remove-role-from-db-instance";
const START_BACKUP_REPLICATION_STEP: &str = "rds::start-db-instance-automated-backups-replication";
const STOP_BACKUP_REPLICATION_STEP: &str = "rds::stop-db-instance-automated-backups-replication";

pub(crate) type Progress = ProgressEvent<ResourceModel>;

/// Model carried by a pipeline event.
pub(crate) fn require_model(progress: &Progress) -> Result<ResourceModel> {
    progress.model().cloned()
}

/// Clients and configuration every step runs with.
#[derive(Clone, Copy)]
pub(crate) struct Steps<'a> {
    pub clients: &'a Clients,
    pub config: &'a HandlerConfig,
}

impl<'a> Steps<'a> {
    pub fn new(clients: &'a Clients, config: &'a HandlerConfig) -> Self {
        Self { clients, config }
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

    /// A parameter change waits for a reboot that should happen now.
    ///
    /// A vanished instance never needs one.
    pub async fn should_reboot(&self, model: &ResourceModel) -> Result<bool> {
        match fetch_db_instance(self.clients.rds(), model.identifier()).await {
            Ok(instance) => {
                Ok(should_apply_immediately(model) && is_parameter_group_pending_reboot(&instance))
            }
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reboot and wait until the instance is available again.
    pub async fn reboot_await(&self, progress: Progress) -> Progress {
        let model = match require_model(&progress) {
            Ok(model) => model,
            Err(err) => return self.fail(progress, REBOOT_STEP, err),
        };
        let rds = self.clients.rds();
        let identifier = model.identifier();

        CallChain::initiate(REBOOT_STEP, self.config, &REBOOT_DB_INSTANCE_ERROR_RULE_SET)
            .run(
                progress,
                || invoke_mutation(rds, translator::reboot_db_instance_request(&model)),
                || poll_db_instance(rds, identifier),
                is_stabilized_after_reboot,
            )
            .await
    }

    /// Guarded reboot when a parameter change is pending reboot.
    ///
    /// Once the reboot is issued the step keeps stabilizing on re-entry even
    /// though the pending-reboot status has cleared.
    pub async fn reboot_if_pending(&self, progress: Progress) -> Progress {
        exec_once(progress, REBOOTED, |mut progress| async move {
            let chain =
                CallChain::initiate(REBOOT_STEP, self.config, &REBOOT_DB_INSTANCE_ERROR_RULE_SET);
            if !chain.is_issued(progress.context_mut()) {
                let model = match require_model(&progress) {
                    Ok(model) => model,
                    Err(err) => return self.fail(progress, REBOOT_STEP, err),
                };
                match self.should_reboot(&model).await {
                    Ok(true) => {}
                    Ok(false) => return progress,
                    Err(err) => return self.fail(progress, REBOOT_STEP, err),
                }
            }
            self.reboot_await(progress).await
        })
        .await
    }

    /// Reconcile role associations by set difference, removals first.
    pub async fn update_associated_roles(
        &self,
        progress: Progress,
        previous: &[DbInstanceRole],
        desired: &[DbInstanceRole],
    ) -> Progress {
        let previous: BTreeSet<&DbInstanceRole> = previous.iter().collect();
        let desired: BTreeSet<&DbInstanceRole> = desired.iter().collect();
        let model = match require_model(&progress) {
            Ok(model) => model,
            Err(err) => return self.fail(progress, ADD_ROLE_STEP, err),
        };
        let rds = self.clients.rds();
        let identifier = model.identifier();

        let mut progress = progress;
        for role in previous.difference(&desired) {
            let name = format!("{REMOVE_ROLE_STEP}:{}", role.role_arn);
            let chain = CallChain::initiate(
                &name,
                self.config,
                &REMOVE_ASSOCIATED_ROLES_ERROR_RULE_SET,
            );
            progress = progress
                .then(|p| {
                    chain.run(
                        p,
                        || {
                            invoke_mutation(
                                rds,
                                translator::remove_role_from_db_instance_request(&model, role),
                            )
                        },
                        || poll_db_instance(rds, identifier),
                        |instance: &DbInstance| lacks_role(instance, &role.role_arn),
                    )
                })
                .await;
        }

        for role in desired.difference(&previous) {
            let name = format!("{ADD_ROLE_STEP}:{}", role.role_arn);
            let chain =
                CallChain::initiate(&name, self.config, &ADD_ASSOCIATED_ROLES_ERROR_RULE_SET);
            progress = progress
                .then(|p| {
                    chain.run(
                        p,
                        || {
                            invoke_mutation(
                                rds,
                                translator::add_role_to_db_instance_request(&model, role),
                            )
                        },
                        || poll_db_instance(rds, identifier),
                        |instance: &DbInstance| {
                            has_role(instance, &role.role_arn, role.feature_name.as_deref())
                        },
                    )
                })
                .await;
        }

        progress
    }

    /// Record the instance ARN and KMS key id for the replication steps.
    ///
    /// Runs until the ARN is stored; `needed` is false when no replication
    /// change is requested.
    pub async fn capture_replication_source(&self, progress: Progress, needed: bool) -> Progress {
        exec_once_with(
            progress,
            |context| context.get(DB_INSTANCE_ARN).is_some(),
            |_| {},
            |mut progress| async move {
                if !needed {
                    return progress;
                }
                let model = match require_model(&progress) {
                    Ok(model) => model,
                    Err(err) => return self.fail(progress, DESCRIBE_DB_INSTANCE_STEP, err),
                };
                let instance = match fetch_db_instance(self.clients.rds(), model.identifier()).await
                {
                    Ok(instance) => instance,
                    Err(err) => return self.fail(progress, DESCRIBE_DB_INSTANCE_STEP, err),
                };
                let Some(arn) = instance.db_instance_arn else {
                    let err = HandlerError::UnexpectedResponse(format!(
                        "DB instance {} has no ARN",
                        instance.db_instance_identifier
                    ));
                    return self.fail(progress, DESCRIBE_DB_INSTANCE_STEP, err);
                };

                let context = progress.context_mut();
                context.set_once(DB_INSTANCE_ARN, arn);
                if let Some(kms_key_id) = instance.kms_key_id {
                    context.set_once(KMS_KEY_ID, kms_key_id);
                }
                progress
            },
        )
        .await
    }

    fn replication_source(&self, progress: &mut Progress) -> Result<String> {
        progress
            .context_mut()
            .get(DB_INSTANCE_ARN)
            .map(str::to_string)
            .ok_or_else(|| HandlerError::InvalidRequest("DB instance ARN was not captured".into()))
    }

    /// Guarded stop of cross-region backup replication into `region`.
    pub async fn stop_backup_replication(&self, progress: Progress, region: &str) -> Progress {
        exec_once(progress, BACKUP_REPLICATION_STOPPED, |mut progress| async move {
            let arn = match self.replication_source(&mut progress) {
                Ok(arn) => arn,
                Err(err) => return self.fail(progress, STOP_BACKUP_REPLICATION_STEP, err),
            };
            let model = match require_model(&progress) {
                Ok(model) => model,
                Err(err) => return self.fail(progress, STOP_BACKUP_REPLICATION_STEP, err),
            };
            let rds = self.clients.rds();
            debug!(region = region, "Stopping automated backups replication");

            CallChain::initiate(
                STOP_BACKUP_REPLICATION_STEP,
                self.config,
                &BACKUP_REPLICATION_ERROR_RULE_SET,
            )
            .run(
                progress,
                || {
                    invoke_mutation(
                        rds,
                        translator::stop_db_instance_automated_backups_replication_request(
                            &arn, region,
                        ),
                    )
                },
                || poll_db_instance(rds, model.identifier()),
                is_backup_replication_stopped,
            )
            .await
        })
        .await
    }

    /// Guarded start of cross-region backup replication into `region`.
    ///
    /// Without an explicit `kms_key_id` the key captured from the source
    /// instance is used.
    pub async fn start_backup_replication(
        &self,
        progress: Progress,
        region: &str,
        retention_period: Option<i32>,
        kms_key_id: Option<&str>,
    ) -> Progress {
        exec_once(progress, BACKUP_REPLICATION_STARTED, |mut progress| async move {
            let arn = match self.replication_source(&mut progress) {
                Ok(arn) => arn,
                Err(err) => return self.fail(progress, START_BACKUP_REPLICATION_STEP, err),
            };
            let captured_key = progress
                .callback_context
                .as_ref()
                .and_then(|context| context.get(KMS_KEY_ID));
            let kms_key_id = kms_key_id.or(captured_key).map(str::to_string);
            let model = match require_model(&progress) {
                Ok(model) => model,
                Err(err) => return self.fail(progress, START_BACKUP_REPLICATION_STEP, err),
            };
            let rds = self.clients.rds();
            debug!(region = region, "Starting automated backups replication");

            CallChain::initiate(
                START_BACKUP_REPLICATION_STEP,
                self.config,
                &BACKUP_REPLICATION_ERROR_RULE_SET,
            )
            .run(
                progress,
                || {
                    invoke_mutation(
                        rds,
                        translator::start_db_instance_automated_backups_replication_request(
                            &arn,
                            retention_period,
                            kms_key_id.as_deref(),
                            region,
                        ),
                    )
                },
                || poll_db_instance(rds, model.identifier()),
                is_backup_replication_started,
            )
            .await
        })
        .await
    }
}
