// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Model and observed-state predicates used by the handler pipelines.

use rds_handler_common::api::{DbCluster, DbInstance, Event};
use rds_handler_common::HandlerError;

use crate::model::ResourceModel;
use crate::status::{
    DbInstanceRoleStatus, DbInstanceStatus, DbParameterGroupStatus, OptionGroupStatus,
    VpcSecurityGroupStatus,
};

const CUSTOM_ORACLE_ENGINE_PREFIX: &str = "custom-oracle";
const FAILURE_EVENT_CATEGORY: &str = "failure";

/// Event messages that report a failed asynchronous operation without the
/// `failure` category.
const FAILURE_EVENT_MESSAGES: [&str; 3] = [
    "could not be upgraded",
    "is in an incompatible state",
    "could not be started",
];

// ============================================================================
// Model predicates
// ============================================================================

fn has_value(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

pub fn is_db_cluster_member(model: &ResourceModel) -> bool {
    has_value(&model.db_cluster_identifier)
}

pub fn is_rds_custom_oracle_instance(model: &ResourceModel) -> bool {
    model
        .engine
        .as_deref()
        .is_some_and(|engine| engine.starts_with(CUSTOM_ORACLE_ENGINE_PREFIX))
}

pub fn is_read_replica(model: &ResourceModel) -> bool {
    has_value(&model.source_db_instance_identifier)
}

/// The previous model replicated another instance and the desired one does not.
pub fn is_read_replica_promotion(previous: &ResourceModel, desired: &ResourceModel) -> bool {
    is_read_replica(previous) && !is_read_replica(desired)
}

pub fn automatic_backup_replication_region(model: &ResourceModel) -> Option<&str> {
    model
        .automatic_backup_replication_region
        .as_deref()
        .filter(|region| !region.is_empty())
}

pub fn automatic_backup_replication_retention_period(model: &ResourceModel) -> Option<i32> {
    model
        .automatic_backup_replication_retention_period
        .or(model.backup_retention_period)
}

pub fn automatic_backup_replication_kms_key_id(model: &ResourceModel) -> Option<&str> {
    model.automatic_backup_replication_kms_key_id.as_deref()
}

fn backup_replication_settings(model: &ResourceModel) -> (Option<&str>, Option<i32>, Option<&str>) {
    (
        automatic_backup_replication_region(model),
        automatic_backup_replication_retention_period(model),
        automatic_backup_replication_kms_key_id(model),
    )
}

/// Replication is configured in the previous model and its settings change.
pub fn should_stop_automatic_backup_replication(
    previous: &ResourceModel,
    desired: &ResourceModel,
) -> bool {
    automatic_backup_replication_region(previous).is_some()
        && backup_replication_settings(previous) != backup_replication_settings(desired)
}

/// Replication is configured in the desired model and its settings change.
pub fn should_start_automatic_backup_replication(
    previous: &ResourceModel,
    desired: &ResourceModel,
) -> bool {
    automatic_backup_replication_region(desired).is_some()
        && backup_replication_settings(previous) != backup_replication_settings(desired)
}

/// A replication retention period or key only makes sense with a region.
pub fn validate_automatic_backup_replication(model: &ResourceModel) -> Result<(), HandlerError> {
    if automatic_backup_replication_region(model).is_none()
        && (model.automatic_backup_replication_retention_period.is_some()
            || has_value(&model.automatic_backup_replication_kms_key_id))
    {
        return Err(HandlerError::InvalidRequest(
            "AutomaticBackupReplicationRegion is required to configure backup replication".into(),
        ));
    }
    Ok(())
}

/// Changes apply immediately unless the model says otherwise.
pub fn should_apply_immediately(model: &ResourceModel) -> bool {
    model.apply_immediately.unwrap_or(true)
}

/// DB security groups are only accepted by the 2012 API generation.
pub fn requires_v12_api(model: &ResourceModel) -> bool {
    !model.db_security_groups.is_empty()
}

// ============================================================================
// Observed-state predicates
// ============================================================================

/// Err when the instance sits in a status it will not leave on its own.
pub fn check_terminal_status(instance: &DbInstance) -> Result<(), HandlerError> {
    let status = instance
        .db_instance_status
        .as_deref()
        .and_then(DbInstanceStatus::parse);
    match status {
        Some(status) if status.is_terminal() => Err(HandlerError::NotStabilized(format!(
            "DB instance {} is in state {}",
            instance.db_instance_identifier,
            status.as_str()
        ))),
        _ => Ok(()),
    }
}

pub fn is_instance_available(instance: &DbInstance) -> bool {
    DbInstanceStatus::Available.equals_str(instance.db_instance_status.as_deref())
}

pub fn is_parameter_group_not_applying(instance: &DbInstance) -> bool {
    !instance.db_parameter_groups.iter().any(|group| {
        DbParameterGroupStatus::Applying.equals_str(Some(group.parameter_apply_status.as_str()))
    })
}

pub fn is_parameter_group_in_sync(instance: &DbInstance) -> bool {
    instance.db_parameter_groups.iter().all(|group| {
        DbParameterGroupStatus::InSync.equals_str(Some(group.parameter_apply_status.as_str()))
    })
}

pub fn is_parameter_group_pending_reboot(instance: &DbInstance) -> bool {
    instance.db_parameter_groups.first().is_some_and(|group| {
        DbParameterGroupStatus::PendingReboot
            .equals_str(Some(group.parameter_apply_status.as_str()))
    })
}

pub fn is_option_group_in_sync(instance: &DbInstance) -> bool {
    instance
        .option_group_memberships
        .iter()
        .all(|membership| OptionGroupStatus::InSync.equals_str(Some(membership.status.as_str())))
}

pub fn is_vpc_security_groups_active(instance: &DbInstance) -> bool {
    instance
        .vpc_security_groups
        .iter()
        .all(|group| group.status == VpcSecurityGroupStatus::Active.as_str())
}

pub fn is_roles_settled(instance: &DbInstance) -> bool {
    !instance
        .associated_roles
        .iter()
        .any(|role| DbInstanceRoleStatus::Pending.equals_str(role.status.as_deref()))
}

/// Stable after a create, modify, promotion or storage change.
pub fn is_stabilized_after_mutate(instance: &DbInstance) -> bool {
    is_instance_available(instance)
        && is_parameter_group_not_applying(instance)
        && is_option_group_in_sync(instance)
        && is_vpc_security_groups_active(instance)
        && is_roles_settled(instance)
}

pub fn is_stabilized_after_reboot(instance: &DbInstance) -> bool {
    is_instance_available(instance) && is_parameter_group_not_applying(instance)
}

pub fn has_role(instance: &DbInstance, role_arn: &str, feature_name: Option<&str>) -> bool {
    instance.associated_roles.iter().any(|role| {
        role.role_arn == role_arn
            && role.feature_name.as_deref() == feature_name
            && DbInstanceRoleStatus::Active.equals_str(role.status.as_deref())
    })
}

pub fn lacks_role(instance: &DbInstance, role_arn: &str) -> bool {
    !instance
        .associated_roles
        .iter()
        .any(|role| role.role_arn == role_arn)
}

pub fn is_backup_replication_started(instance: &DbInstance) -> bool {
    !instance.automated_backups_replications.is_empty()
}

pub fn is_backup_replication_stopped(instance: &DbInstance) -> bool {
    instance.automated_backups_replications.is_empty()
}

/// Cluster parameter group status of `identifier` as a cluster member.
pub fn cluster_parameter_group_status<'a>(
    cluster: &'a DbCluster,
    identifier: &str,
) -> Option<&'a str> {
    cluster
        .db_cluster_members
        .iter()
        .find(|member| member.db_instance_identifier.eq_ignore_ascii_case(identifier))
        .and_then(|member| member.db_cluster_parameter_group_status.as_deref())
}

pub fn is_cluster_parameter_group_in_sync(cluster: &DbCluster, identifier: &str) -> bool {
    cluster_parameter_group_status(cluster, identifier)
        .is_none_or(|status| DbParameterGroupStatus::InSync.equals_str(Some(status)))
}

pub fn is_cluster_parameter_group_pending_reboot(cluster: &DbCluster, identifier: &str) -> bool {
    DbParameterGroupStatus::PendingReboot
        .equals_str(cluster_parameter_group_status(cluster, identifier))
}

/// An event reporting that an asynchronous operation on the instance failed.
pub fn is_failure_event(event: &Event) -> bool {
    event
        .event_categories
        .iter()
        .any(|category| category == FAILURE_EVENT_CATEGORY)
        || FAILURE_EVENT_MESSAGES
            .iter()
            .any(|phrase| event.message.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rds_handler_common::api::{
        DbClusterMember, DbInstanceRole, DbParameterGroupStatus as ParameterGroupStatus,
        SourceType,
    };

    fn instance(status: &str) -> DbInstance {
        DbInstance {
            db_instance_identifier: "db-1".into(),
            db_instance_status: Some(status.into()),
            ..Default::default()
        }
    }

    fn with_parameter_status(mut instance: DbInstance, status: &str) -> DbInstance {
        instance.db_parameter_groups = vec![ParameterGroupStatus {
            db_parameter_group_name: "pg".into(),
            parameter_apply_status: status.into(),
        }];
        instance
    }

    #[test]
    fn test_read_replica_promotion() {
        let previous = ResourceModel {
            source_db_instance_identifier: Some("source".into()),
            ..Default::default()
        };
        assert!(is_read_replica_promotion(&previous, &ResourceModel::default()));
        assert!(!is_read_replica_promotion(&previous, &previous));
        assert!(!is_read_replica_promotion(&ResourceModel::default(), &previous));
    }

    #[test]
    fn test_backup_replication_region_change_stops_and_starts() {
        let previous = ResourceModel {
            automatic_backup_replication_region: Some("us-west-1".into()),
            ..Default::default()
        };
        let desired = ResourceModel {
            automatic_backup_replication_region: Some("us-west-2".into()),
            ..Default::default()
        };

        assert!(should_stop_automatic_backup_replication(&previous, &desired));
        assert!(should_start_automatic_backup_replication(&previous, &desired));
        assert!(!should_stop_automatic_backup_replication(&previous, &previous));
        assert!(should_stop_automatic_backup_replication(&previous, &ResourceModel::default()));
        assert!(!should_start_automatic_backup_replication(&previous, &ResourceModel::default()));
    }

    #[test]
    fn test_apply_immediately_defaults_to_true() {
        assert!(should_apply_immediately(&ResourceModel::default()));
        let model = ResourceModel {
            apply_immediately: Some(false),
            ..Default::default()
        };
        assert!(!should_apply_immediately(&model));
    }

    #[test]
    fn test_custom_oracle_and_cluster_member() {
        let model = ResourceModel {
            engine: Some("custom-oracle-ee".into()),
            db_cluster_identifier: Some(String::new()),
            ..Default::default()
        };
        assert!(is_rds_custom_oracle_instance(&model));
        assert!(!is_db_cluster_member(&model));
    }

    #[test]
    fn test_stabilized_after_mutate() {
        assert!(is_stabilized_after_mutate(&instance("available")));
        assert!(!is_stabilized_after_mutate(&instance("modifying")));
        assert!(!is_stabilized_after_mutate(&with_parameter_status(
            instance("available"),
            "applying"
        )));

        let mut pending_role = instance("available");
        pending_role.associated_roles = vec![DbInstanceRole {
            role_arn: "arn:role".into(),
            feature_name: None,
            status: Some("PENDING".into()),
        }];
        assert!(!is_stabilized_after_mutate(&pending_role));
    }

    #[test]
    fn test_pending_reboot() {
        assert!(is_parameter_group_pending_reboot(&with_parameter_status(
            instance("available"),
            "pending-reboot"
        )));
        assert!(!is_parameter_group_pending_reboot(&instance("available")));
    }

    #[test]
    fn test_terminal_status_is_an_error() {
        assert!(check_terminal_status(&instance("incompatible-parameters")).is_err());
        assert!(check_terminal_status(&instance("modifying")).is_ok());
        assert!(check_terminal_status(&instance("some-new-status")).is_ok());
    }

    #[test]
    fn test_cluster_member_parameter_status_is_case_insensitive() {
        let cluster = DbCluster {
            db_cluster_identifier: "cluster-1".into(),
            status: Some("available".into()),
            db_cluster_members: vec![DbClusterMember {
                db_instance_identifier: "DB-1".into(),
                db_cluster_parameter_group_status: Some("pending-reboot".into()),
                is_cluster_writer: true,
            }],
        };
        assert!(is_cluster_parameter_group_pending_reboot(&cluster, "db-1"));
        assert!(!is_cluster_parameter_group_in_sync(&cluster, "db-1"));
        assert!(is_cluster_parameter_group_in_sync(&cluster, "db-2"));
    }

    #[test]
    fn test_failure_event() {
        let event = |categories: Vec<String>, message: &str| Event {
            source_identifier: "db-1".into(),
            source_type: SourceType::DbInstance,
            message: message.into(),
            event_categories: categories,
            date: Utc::now(),
        };

        assert!(is_failure_event(&event(vec!["failure".into()], "Storage full")));
        assert!(is_failure_event(&event(
            vec!["maintenance".into()],
            "Database instance could not be upgraded because of incompatible parameters"
        )));
        assert!(!is_failure_event(&event(vec!["backup".into()], "Backing up DB instance")));
    }

    #[test]
    fn test_backup_replication_settings_require_region() {
        let mut model = ResourceModel {
            automatic_backup_replication_retention_period: Some(7),
            ..Default::default()
        };
        assert!(matches!(
            validate_automatic_backup_replication(&model),
            Err(HandlerError::InvalidRequest(_))
        ));

        model.automatic_backup_replication_region = Some("eu-west-1".into());
        assert!(validate_automatic_backup_replication(&model).is_ok());
    }
}
