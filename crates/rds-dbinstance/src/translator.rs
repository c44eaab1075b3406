// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Model to request and response to model translation.

use rds_handler_common::api::{
    CreateDbInstanceInput, CreateDbInstanceReadReplicaInput, DbInstance, DeleteDbInstanceInput,
    ModifyDbInstanceInput, Request, Tag as ApiTag,
};
use rds_handler_common::tagging::{from_api_tags, to_api_tags};
use rds_handler_common::Tags;
use sha2::{Digest, Sha256};

use crate::model::{DbInstanceRole, Endpoint, ResourceModel, Tag};
use crate::predicates::should_apply_immediately;

const MAX_IDENTIFIER_LENGTH: usize = 63;
const IDENTIFIER_SUFFIX_LENGTH: usize = 12;
const FINAL_SNAPSHOT_SUFFIX: &str = "final-snapshot";

// ============================================================================
// Helpers
// ============================================================================

/// Allocated storage in GiB; unparsable or missing values count as zero.
pub fn allocated_storage(model: &ResourceModel) -> i32 {
    model
        .allocated_storage
        .as_deref()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn port(model: &ResourceModel) -> Option<i32> {
    model.port.as_deref().and_then(|p| p.trim().parse().ok())
}

fn changed<T: Clone + PartialEq>(previous: &Option<T>, desired: &Option<T>) -> Option<T> {
    if previous != desired { desired.clone() } else { None }
}

/// Deterministic identifier for a model created without one.
///
/// Lowercase, starts with a letter, at most 63 characters, and stable for the
/// same stack and logical id so a re-invoked create targets the same instance.
pub fn generate_identifier(stack_id: Option<&str>, logical_id: Option<&str>) -> String {
    let logical = logical_id.unwrap_or("dbinstance");
    let mut prefix: String = logical
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if !prefix.starts_with(|c: char| c.is_ascii_alphabetic()) {
        prefix.insert(0, 'd');
    }
    prefix.truncate(MAX_IDENTIFIER_LENGTH - IDENTIFIER_SUFFIX_LENGTH - 1);

    let mut hasher = Sha256::new();
    hasher.update(stack_id.unwrap_or_default().as_bytes());
    hasher.update(logical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{prefix}-{}", &digest[..IDENTIFIER_SUFFIX_LENGTH])
}

pub fn final_snapshot_identifier(model: &ResourceModel) -> String {
    let mut identifier = format!("{}-{FINAL_SNAPSHOT_SUFFIX}", model.identifier());
    identifier.truncate(255);
    identifier
}

// ============================================================================
// Tags
// ============================================================================

pub fn translate_tags_to_sdk(tags: &[Tag]) -> Tags {
    tags.iter()
        .map(|tag| (tag.key.clone(), tag.value.clone()))
        .collect()
}

pub fn translate_tags_from_sdk(tags: &Tags) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

// ============================================================================
// Requests
// ============================================================================

pub fn create_db_instance_request(model: &ResourceModel, tags: &Tags) -> Request {
    Request::CreateDbInstance(Box::new(CreateDbInstanceInput {
        db_instance_identifier: model.identifier().to_string(),
        db_instance_class: model.db_instance_class.clone(),
        engine: model.engine.clone(),
        engine_version: model.engine_version.clone(),
        engine_lifecycle_support: model.engine_lifecycle_support.clone(),
        allocated_storage: model.allocated_storage.as_ref().map(|_| allocated_storage(model)),
        max_allocated_storage: model.max_allocated_storage,
        storage_type: model.storage_type.clone(),
        iops: model.iops,
        kms_key_id: model.kms_key_id.clone(),
        storage_encrypted: model.storage_encrypted,
        master_username: model.master_username.clone(),
        master_user_password: model.master_user_password.clone(),
        db_name: model.db_name.clone(),
        db_cluster_identifier: model.db_cluster_identifier.clone(),
        db_parameter_group_name: model.db_parameter_group_name.clone(),
        option_group_name: model.option_group_name.clone(),
        db_subnet_group_name: model.db_subnet_group_name.clone(),
        db_security_groups: model.db_security_groups.clone(),
        vpc_security_group_ids: model.vpc_security_groups.clone(),
        availability_zone: model.availability_zone.clone(),
        multi_az: model.multi_az,
        backup_retention_period: model.backup_retention_period,
        preferred_backup_window: model.preferred_backup_window.clone(),
        preferred_maintenance_window: model.preferred_maintenance_window.clone(),
        port: port(model),
        publicly_accessible: model.publicly_accessible,
        deletion_protection: model.deletion_protection,
        auto_minor_version_upgrade: model.auto_minor_version_upgrade,
        tags: to_api_tags(tags),
    }))
}

pub fn create_db_instance_read_replica_request(model: &ResourceModel, tags: &Tags) -> Request {
    Request::CreateDbInstanceReadReplica(Box::new(CreateDbInstanceReadReplicaInput {
        db_instance_identifier: model.identifier().to_string(),
        source_db_instance_identifier: model
            .source_db_instance_identifier
            .clone()
            .unwrap_or_default(),
        source_region: model.source_region.clone(),
        db_instance_class: model.db_instance_class.clone(),
        availability_zone: model.availability_zone.clone(),
        kms_key_id: model.kms_key_id.clone(),
        db_subnet_group_name: model.db_subnet_group_name.clone(),
        vpc_security_group_ids: model.vpc_security_groups.clone(),
        multi_az: model.multi_az,
        publicly_accessible: model.publicly_accessible,
        deletion_protection: model.deletion_protection,
        tags: to_api_tags(tags),
    }))
}

/// Properties a read replica cannot take at creation and receives through a
/// follow-up modification.
pub fn needs_modify_after_create(model: &ResourceModel) -> bool {
    model.allocated_storage.is_some()
        || model.max_allocated_storage.is_some()
        || model.backup_retention_period.is_some()
        || model.db_parameter_group_name.is_some()
        || model.engine_version.is_some()
        || model.preferred_backup_window.is_some()
        || model.preferred_maintenance_window.is_some()
}

pub fn modify_db_instance_after_create_request(model: &ResourceModel) -> Request {
    Request::ModifyDbInstance(Box::new(ModifyDbInstanceInput {
        db_instance_identifier: model.identifier().to_string(),
        apply_immediately: true,
        allocated_storage: model.allocated_storage.as_ref().map(|_| allocated_storage(model)),
        max_allocated_storage: model.max_allocated_storage,
        backup_retention_period: model.backup_retention_period,
        db_parameter_group_name: model.db_parameter_group_name.clone(),
        engine_version: model.engine_version.clone(),
        preferred_backup_window: model.preferred_backup_window.clone(),
        preferred_maintenance_window: model.preferred_maintenance_window.clone(),
        ..Default::default()
    }))
}

/// Fields of `desired` that differ from `previous`.
fn modify_input(
    previous: &ResourceModel,
    desired: &ResourceModel,
    rollback: bool,
) -> ModifyDbInstanceInput {
    let mut input = ModifyDbInstanceInput {
        db_instance_identifier: desired.identifier().to_string(),
        apply_immediately: should_apply_immediately(desired),
        db_instance_class: changed(&previous.db_instance_class, &desired.db_instance_class),
        engine_version: changed(&previous.engine_version, &desired.engine_version),
        allow_major_version_upgrade: desired.allow_major_version_upgrade,
        max_allocated_storage: changed(
            &previous.max_allocated_storage,
            &desired.max_allocated_storage,
        ),
        master_user_password: changed(
            &previous.master_user_password,
            &desired.master_user_password,
        ),
        db_parameter_group_name: changed(
            &previous.db_parameter_group_name,
            &desired.db_parameter_group_name,
        ),
        option_group_name: changed(&previous.option_group_name, &desired.option_group_name),
        multi_az: changed(&previous.multi_az, &desired.multi_az),
        backup_retention_period: changed(
            &previous.backup_retention_period,
            &desired.backup_retention_period,
        ),
        preferred_backup_window: changed(
            &previous.preferred_backup_window,
            &desired.preferred_backup_window,
        ),
        preferred_maintenance_window: changed(
            &previous.preferred_maintenance_window,
            &desired.preferred_maintenance_window,
        ),
        publicly_accessible: changed(&previous.publicly_accessible, &desired.publicly_accessible),
        deletion_protection: changed(&previous.deletion_protection, &desired.deletion_protection),
        auto_minor_version_upgrade: changed(
            &previous.auto_minor_version_upgrade,
            &desired.auto_minor_version_upgrade,
        ),
        ..Default::default()
    };

    if previous.vpc_security_groups != desired.vpc_security_groups {
        input.vpc_security_group_ids = desired.vpc_security_groups.clone();
    }

    // Storage type and provisioned iops are applied together.
    if previous.storage_type != desired.storage_type || previous.iops != desired.iops {
        input.storage_type = desired.storage_type.clone();
        input.iops = desired.iops;
    }

    // Storage never shrinks on rollback.
    let previous_storage = allocated_storage(previous);
    let desired_storage = allocated_storage(desired);
    if previous_storage != desired_storage && !(rollback && desired_storage < previous_storage) {
        input.allocated_storage = desired.allocated_storage.as_ref().map(|_| desired_storage);
    }

    input
}

/// Modification for the current API generation.
///
/// The observed instance drops changes that are already deployed, such as
/// an engine version upgraded out of band, and storage below what is
/// allocated.
pub fn modify_db_instance_request(
    previous: &ResourceModel,
    desired: &ResourceModel,
    observed: &DbInstance,
    rollback: bool,
) -> Request {
    let mut input = modify_input(previous, desired, rollback);

    if input.engine_version.is_some() && input.engine_version == observed.engine_version {
        input.engine_version = None;
    }
    if let (Some(requested), Some(current)) =
        (input.allocated_storage, observed.allocated_storage)
    {
        if requested < current {
            input.allocated_storage = None;
        }
    }
    if input.max_allocated_storage.is_none()
        && previous.max_allocated_storage.is_some()
        && desired.max_allocated_storage.is_some()
        && desired.max_allocated_storage != observed.max_allocated_storage
    {
        input.max_allocated_storage = desired.max_allocated_storage;
    }

    Request::ModifyDbInstance(Box::new(input))
}

/// Modification for the 2012 API generation, which also carries DB
/// security groups.
pub fn modify_db_instance_v12_request(
    previous: &ResourceModel,
    desired: &ResourceModel,
    rollback: bool,
) -> Request {
    let mut input = modify_input(previous, desired, rollback);
    if previous.db_security_groups != desired.db_security_groups {
        input.db_security_groups = desired.db_security_groups.clone();
    }
    // The 2012 generation has no storage autoscaling.
    input.max_allocated_storage = None;
    Request::ModifyDbInstance(Box::new(input))
}

pub fn update_allocated_storage_request(model: &ResourceModel) -> Request {
    Request::ModifyDbInstance(Box::new(ModifyDbInstanceInput {
        db_instance_identifier: model.identifier().to_string(),
        apply_immediately: true,
        allocated_storage: Some(allocated_storage(model)),
        ..Default::default()
    }))
}

pub fn promote_read_replica_request(model: &ResourceModel) -> Request {
    Request::PromoteReadReplica {
        db_instance_identifier: model.identifier().to_string(),
        backup_retention_period: model.backup_retention_period,
    }
}

pub fn reboot_db_instance_request(model: &ResourceModel) -> Request {
    Request::RebootDbInstance {
        db_instance_identifier: model.identifier().to_string(),
    }
}

pub fn delete_db_instance_request(
    model: &ResourceModel,
    final_snapshot_identifier: Option<String>,
) -> Request {
    Request::DeleteDbInstance(DeleteDbInstanceInput {
        db_instance_identifier: model.identifier().to_string(),
        skip_final_snapshot: final_snapshot_identifier.is_none(),
        final_db_snapshot_identifier: final_snapshot_identifier,
        delete_automated_backups: model.delete_automated_backups,
    })
}

pub fn describe_db_instance_request(identifier: &str) -> Request {
    Request::DescribeDbInstances {
        db_instance_identifier: Some(identifier.to_string()),
        marker: None,
    }
}

pub fn describe_db_instances_request(marker: Option<String>) -> Request {
    Request::DescribeDbInstances {
        db_instance_identifier: None,
        marker,
    }
}

pub fn add_role_to_db_instance_request(model: &ResourceModel, role: &DbInstanceRole) -> Request {
    Request::AddRoleToDbInstance {
        db_instance_identifier: model.identifier().to_string(),
        role_arn: role.role_arn.clone(),
        feature_name: role.feature_name.clone(),
    }
}

pub fn remove_role_from_db_instance_request(
    model: &ResourceModel,
    role: &DbInstanceRole,
) -> Request {
    Request::RemoveRoleFromDbInstance {
        db_instance_identifier: model.identifier().to_string(),
        role_arn: role.role_arn.clone(),
        feature_name: role.feature_name.clone(),
    }
}

pub fn start_db_instance_automated_backups_replication_request(
    db_instance_arn: &str,
    backup_retention_period: Option<i32>,
    kms_key_id: Option<&str>,
    region: &str,
) -> Request {
    Request::StartDbInstanceAutomatedBackupsReplication {
        source_db_instance_arn: db_instance_arn.to_string(),
        backup_retention_period,
        kms_key_id: kms_key_id.map(str::to_string),
        region: region.to_string(),
    }
}

pub fn stop_db_instance_automated_backups_replication_request(
    db_instance_arn: &str,
    region: &str,
) -> Request {
    Request::StopDbInstanceAutomatedBackupsReplication {
        source_db_instance_arn: db_instance_arn.to_string(),
        region: region.to_string(),
    }
}

pub fn describe_db_parameter_groups_request(name: &str) -> Request {
    Request::DescribeDbParameterGroups {
        db_parameter_group_name: name.to_string(),
    }
}

pub fn describe_db_engine_versions_request(
    family: &str,
    engine: Option<&str>,
    engine_version: Option<&str>,
) -> Request {
    Request::DescribeDbEngineVersions {
        db_parameter_group_family: family.to_string(),
        engine: engine.map(str::to_string),
        engine_version: engine_version.map(str::to_string),
    }
}

pub fn describe_security_groups_request(vpc_id: &str, group_name: &str) -> Request {
    Request::DescribeSecurityGroups {
        vpc_id: vpc_id.to_string(),
        group_name: group_name.to_string(),
    }
}

// ============================================================================
// Responses
// ============================================================================

fn translate_tags(tags: &[ApiTag]) -> Vec<Tag> {
    translate_tags_from_sdk(&from_api_tags(tags))
}

/// Observed instance as a model. Write-only properties stay unset.
pub fn translate_db_instance_from_sdk(instance: &DbInstance) -> ResourceModel {
    let mut associated_roles: Vec<DbInstanceRole> = instance
        .associated_roles
        .iter()
        .map(|role| DbInstanceRole {
            role_arn: role.role_arn.clone(),
            feature_name: role.feature_name.clone(),
        })
        .collect();
    associated_roles.sort();

    ResourceModel {
        db_instance_identifier: Some(instance.db_instance_identifier.clone()),
        db_instance_arn: instance.db_instance_arn.clone(),
        db_instance_class: instance.db_instance_class.clone(),
        engine: instance.engine.clone(),
        engine_version: instance.engine_version.clone(),
        engine_lifecycle_support: instance.engine_lifecycle_support.clone(),
        allocated_storage: instance.allocated_storage.map(|s| s.to_string()),
        max_allocated_storage: instance.max_allocated_storage,
        storage_type: instance.storage_type.clone(),
        iops: instance.iops,
        storage_encrypted: instance.storage_encrypted,
        kms_key_id: instance.kms_key_id.clone(),
        master_username: instance.master_username.clone(),
        db_name: instance.db_name.clone(),
        db_cluster_identifier: instance.db_cluster_identifier.clone(),
        db_parameter_group_name: instance
            .db_parameter_groups
            .first()
            .map(|group| group.db_parameter_group_name.clone()),
        option_group_name: instance
            .option_group_memberships
            .first()
            .map(|membership| membership.option_group_name.clone()),
        db_subnet_group_name: instance
            .db_subnet_group
            .as_ref()
            .map(|group| group.db_subnet_group_name.clone()),
        db_security_groups: instance.db_security_groups.clone(),
        vpc_security_groups: instance
            .vpc_security_groups
            .iter()
            .map(|group| group.vpc_security_group_id.clone())
            .collect(),
        availability_zone: instance.availability_zone.clone(),
        multi_az: instance.multi_az,
        backup_retention_period: instance.backup_retention_period,
        preferred_backup_window: instance.preferred_backup_window.clone(),
        preferred_maintenance_window: instance.preferred_maintenance_window.clone(),
        port: instance.endpoint.as_ref().map(|e| e.port.to_string()),
        publicly_accessible: instance.publicly_accessible,
        deletion_protection: instance.deletion_protection,
        auto_minor_version_upgrade: instance.auto_minor_version_upgrade,
        source_db_instance_identifier: instance.read_replica_source_db_instance_identifier.clone(),
        associated_roles,
        endpoint: instance.endpoint.as_ref().map(|e| Endpoint {
            address: e.address.clone(),
            port: e.port.to_string(),
            hosted_zone_id: e.hosted_zone_id.clone(),
        }),
        tags: translate_tags(&instance.tag_list),
        ..Default::default()
    }
}
