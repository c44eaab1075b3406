// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire envelope of the remote database and network services.
//!
//! Every call is a [`Request`] variant answered by a [`Response`] variant.
//! Handlers match the expected variant and treat anything else as an
//! unexpected response:
//!
//! ```ignore
//! let request = Request::DescribeDbInstances {
//!     db_instance_identifier: Some(id),
//!     marker: None,
//! };
//! match client.invoke(request).await? {
//!     Response::DbInstances { db_instances, .. } => Ok(db_instances),
//!     _ => Err(HandlerError::UnexpectedResponse("expected DbInstances".into())),
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Observed shapes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbInstanceRole {
    pub role_arn: String,
    pub feature_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbParameterGroupStatus {
    pub db_parameter_group_name: String,
    pub parameter_apply_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionGroupMembership {
    pub option_group_name: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VpcSecurityGroupMembership {
    pub vpc_security_group_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subnet {
    pub subnet_identifier: String,
    pub availability_zone: Option<String>,
    pub subnet_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbSubnetGroup {
    pub db_subnet_group_name: String,
    pub db_subnet_group_description: Option<String>,
    pub db_subnet_group_arn: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_group_status: Option<String>,
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoint {
    pub address: String,
    pub port: i32,
    pub hosted_zone_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomatedBackupsReplication {
    pub db_instance_automated_backups_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbInstance {
    pub db_instance_identifier: String,
    pub db_instance_arn: Option<String>,
    pub db_instance_status: Option<String>,
    pub db_instance_class: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub engine_lifecycle_support: Option<String>,
    pub allocated_storage: Option<i32>,
    pub max_allocated_storage: Option<i32>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub kms_key_id: Option<String>,
    pub storage_encrypted: Option<bool>,
    pub db_cluster_identifier: Option<String>,
    pub read_replica_source_db_instance_identifier: Option<String>,
    pub db_parameter_groups: Vec<DbParameterGroupStatus>,
    pub option_group_memberships: Vec<OptionGroupMembership>,
    pub db_subnet_group: Option<DbSubnetGroup>,
    pub db_security_groups: Vec<String>,
    pub vpc_security_groups: Vec<VpcSecurityGroupMembership>,
    pub associated_roles: Vec<DbInstanceRole>,
    pub multi_az: Option<bool>,
    pub availability_zone: Option<String>,
    pub backup_retention_period: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub publicly_accessible: Option<bool>,
    pub deletion_protection: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub master_username: Option<String>,
    pub db_name: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub automated_backups_replications: Vec<AutomatedBackupsReplication>,
    pub tag_list: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbClusterMember {
    pub db_instance_identifier: String,
    pub db_cluster_parameter_group_status: Option<String>,
    pub is_cluster_writer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbCluster {
    pub db_cluster_identifier: String,
    pub status: Option<String>,
    pub db_cluster_members: Vec<DbClusterMember>,
}

/// Kind of resource an event was emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    DbInstance,
    DbCluster,
    DbSubnetGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub source_identifier: String,
    pub source_type: SourceType,
    pub message: String,
    #[serde(default)]
    pub event_categories: Vec<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbParameterGroup {
    pub db_parameter_group_name: String,
    pub db_parameter_group_family: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbEngineVersion {
    pub engine: String,
    pub engine_version: String,
    pub db_parameter_group_family: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    pub vpc_id: Option<String>,
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateDbInstanceInput {
    pub db_instance_identifier: String,
    pub db_instance_class: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub engine_lifecycle_support: Option<String>,
    pub allocated_storage: Option<i32>,
    pub max_allocated_storage: Option<i32>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub kms_key_id: Option<String>,
    pub storage_encrypted: Option<bool>,
    pub master_username: Option<String>,
    pub master_user_password: Option<String>,
    pub db_name: Option<String>,
    pub db_cluster_identifier: Option<String>,
    pub db_parameter_group_name: Option<String>,
    pub option_group_name: Option<String>,
    pub db_subnet_group_name: Option<String>,
    pub db_security_groups: Vec<String>,
    pub vpc_security_group_ids: Vec<String>,
    pub availability_zone: Option<String>,
    pub multi_az: Option<bool>,
    pub backup_retention_period: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub port: Option<i32>,
    pub publicly_accessible: Option<bool>,
    pub deletion_protection: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateDbInstanceReadReplicaInput {
    pub db_instance_identifier: String,
    pub source_db_instance_identifier: String,
    pub source_region: Option<String>,
    pub db_instance_class: Option<String>,
    pub availability_zone: Option<String>,
    pub kms_key_id: Option<String>,
    pub db_subnet_group_name: Option<String>,
    pub vpc_security_group_ids: Vec<String>,
    pub multi_az: Option<bool>,
    pub publicly_accessible: Option<bool>,
    pub deletion_protection: Option<bool>,
    pub tags: Vec<Tag>,
}

/// Only the set fields are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModifyDbInstanceInput {
    pub db_instance_identifier: String,
    pub apply_immediately: bool,
    pub db_instance_class: Option<String>,
    pub engine_version: Option<String>,
    pub allow_major_version_upgrade: Option<bool>,
    pub allocated_storage: Option<i32>,
    pub max_allocated_storage: Option<i32>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub master_user_password: Option<String>,
    pub db_parameter_group_name: Option<String>,
    pub option_group_name: Option<String>,
    pub db_security_groups: Vec<String>,
    pub vpc_security_group_ids: Vec<String>,
    pub multi_az: Option<bool>,
    pub backup_retention_period: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub publicly_accessible: Option<bool>,
    pub deletion_protection: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteDbInstanceInput {
    pub db_instance_identifier: String,
    pub skip_final_snapshot: bool,
    pub final_db_snapshot_identifier: Option<String>,
    pub delete_automated_backups: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbSubnetGroupInput {
    pub db_subnet_group_name: String,
    pub db_subnet_group_description: Option<String>,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "input", rename_all_fields = "camelCase")]
pub enum Request {
    // Database instances
    CreateDbInstance(Box<CreateDbInstanceInput>),
    CreateDbInstanceReadReplica(Box<CreateDbInstanceReadReplicaInput>),
    ModifyDbInstance(Box<ModifyDbInstanceInput>),
    DeleteDbInstance(DeleteDbInstanceInput),
    RebootDbInstance {
        db_instance_identifier: String,
    },
    PromoteReadReplica {
        db_instance_identifier: String,
        backup_retention_period: Option<i32>,
    },
    DescribeDbInstances {
        db_instance_identifier: Option<String>,
        marker: Option<String>,
    },
    DescribeDbClusters {
        db_cluster_identifier: String,
    },
    AddRoleToDbInstance {
        db_instance_identifier: String,
        role_arn: String,
        feature_name: Option<String>,
    },
    RemoveRoleFromDbInstance {
        db_instance_identifier: String,
        role_arn: String,
        feature_name: Option<String>,
    },
    StartDbInstanceAutomatedBackupsReplication {
        source_db_instance_arn: String,
        backup_retention_period: Option<i32>,
        kms_key_id: Option<String>,
        region: String,
    },
    StopDbInstanceAutomatedBackupsReplication {
        source_db_instance_arn: String,
        region: String,
    },
    DescribeDbParameterGroups {
        db_parameter_group_name: String,
    },
    DescribeDbEngineVersions {
        db_parameter_group_family: String,
        engine: Option<String>,
        engine_version: Option<String>,
    },
    DownloadDbLogFilePortion {
        db_instance_identifier: String,
        log_file_name: String,
    },

    // Subnet groups
    CreateDbSubnetGroup(DbSubnetGroupInput),
    ModifyDbSubnetGroup(DbSubnetGroupInput),
    DeleteDbSubnetGroup {
        db_subnet_group_name: String,
    },
    DescribeDbSubnetGroups {
        db_subnet_group_name: Option<String>,
        marker: Option<String>,
    },

    // Shared
    AddTagsToResource {
        resource_name: String,
        tags: Vec<Tag>,
    },
    RemoveTagsFromResource {
        resource_name: String,
        tag_keys: Vec<String>,
    },
    DescribeEvents {
        source_identifier: String,
        source_type: SourceType,
        start_time: DateTime<Utc>,
        marker: Option<String>,
    },

    // Network
    DescribeSecurityGroups {
        vpc_id: String,
        group_name: String,
    },
}

impl Request {
    /// Service operation name.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::CreateDbInstance(_) => "CreateDBInstance",
            Request::CreateDbInstanceReadReplica(_) => "CreateDBInstanceReadReplica",
            Request::ModifyDbInstance(_) => "ModifyDBInstance",
            Request::DeleteDbInstance(_) => "DeleteDBInstance",
            Request::RebootDbInstance { .. } => "RebootDBInstance",
            Request::PromoteReadReplica { .. } => "PromoteReadReplica",
            Request::DescribeDbInstances { .. } => "DescribeDBInstances",
            Request::DescribeDbClusters { .. } => "DescribeDBClusters",
            Request::AddRoleToDbInstance { .. } => "AddRoleToDBInstance",
            Request::RemoveRoleFromDbInstance { .. } => "RemoveRoleFromDBInstance",
            Request::StartDbInstanceAutomatedBackupsReplication { .. } => {
                "StartDBInstanceAutomatedBackupsReplication"
            }
            Request::StopDbInstanceAutomatedBackupsReplication { .. } => {
                "StopDBInstanceAutomatedBackupsReplication"
            }
            Request::DescribeDbParameterGroups { .. } => "DescribeDBParameterGroups",
            Request::DescribeDbEngineVersions { .. } => "DescribeDBEngineVersions",
            Request::DownloadDbLogFilePortion { .. } => "DownloadDBLogFilePortion",
            Request::CreateDbSubnetGroup(_) => "CreateDBSubnetGroup",
            Request::ModifyDbSubnetGroup(_) => "ModifyDBSubnetGroup",
            Request::DeleteDbSubnetGroup { .. } => "DeleteDBSubnetGroup",
            Request::DescribeDbSubnetGroups { .. } => "DescribeDBSubnetGroups",
            Request::AddTagsToResource { .. } => "AddTagsToResource",
            Request::RemoveTagsFromResource { .. } => "RemoveTagsFromResource",
            Request::DescribeEvents { .. } => "DescribeEvents",
            Request::DescribeSecurityGroups { .. } => "DescribeSecurityGroups",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "output", rename_all_fields = "camelCase")]
pub enum Response {
    DbInstance(Box<DbInstance>),
    DbInstances {
        db_instances: Vec<DbInstance>,
        marker: Option<String>,
    },
    DbClusters(Vec<DbCluster>),
    Events {
        events: Vec<Event>,
        marker: Option<String>,
    },
    DbParameterGroups(Vec<DbParameterGroup>),
    DbEngineVersions(Vec<DbEngineVersion>),
    SecurityGroups(Vec<SecurityGroup>),
    DbSubnetGroup(DbSubnetGroup),
    DbSubnetGroups {
        db_subnet_groups: Vec<DbSubnetGroup>,
        marker: Option<String>,
    },
    /// Acknowledgement without a payload
    Empty,
}

impl Response {
    /// Shape name, used in "expected X" messages and logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Response::DbInstance(_) => "DbInstance",
            Response::DbInstances { .. } => "DbInstances",
            Response::DbClusters(_) => "DbClusters",
            Response::Events { .. } => "Events",
            Response::DbParameterGroups(_) => "DbParameterGroups",
            Response::DbEngineVersions(_) => "DbEngineVersions",
            Response::SecurityGroups(_) => "SecurityGroups",
            Response::DbSubnetGroup(_) => "DbSubnetGroup",
            Response::DbSubnetGroups { .. } => "DbSubnetGroups",
            Response::Empty => "Empty",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope_shape() {
        let request = Request::RebootDbInstance {
            db_instance_identifier: "db-1".into(),
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["operation"], "RebootDbInstance");
        assert_eq!(json["input"]["dbInstanceIdentifier"], "db-1");
        assert_eq!(request.operation(), "RebootDBInstance");
    }

    #[test]
    fn test_modify_input_uses_camel_case() {
        let request = Request::ModifyDbInstance(Box::new(ModifyDbInstanceInput {
            db_instance_identifier: "db-1".into(),
            apply_immediately: true,
            master_user_password: Some("secret".into()),
            ..Default::default()
        }));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["input"]["dbInstanceIdentifier"], "db-1");
        assert_eq!(json["input"]["masterUserPassword"], "secret");
    }

    #[test]
    fn test_observed_instance_tolerates_missing_fields() {
        let instance: DbInstance =
            serde_json::from_str(r#"{"dbInstanceIdentifier":"db-1","dbInstanceStatus":"available"}"#)
                .unwrap();
        assert_eq!(instance.db_instance_status.as_deref(), Some("available"));
        assert!(instance.db_parameter_groups.is_empty());
    }
}
