// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error rule sets of the DB instance step families.

use once_cell::sync::Lazy;
use rds_handler_common::{DEFAULT_ERROR_RULE_SET, ErrorRuleSet, ErrorStatus, HandlerErrorCode};

pub const DB_INSTANCE_NOT_FOUND: &str = "DBInstanceNotFound";
pub const DB_CLUSTER_NOT_FOUND: &str = "DBClusterNotFoundFault";
pub const INVALID_DB_INSTANCE_STATE: &str = "InvalidDBInstanceState";

pub static DEFAULT_DB_INSTANCE_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_ERROR_RULE_SET
        .extend()
        .with_codes(
            &[DB_INSTANCE_NOT_FOUND, "DBInstanceNotFoundFault", DB_CLUSTER_NOT_FOUND],
            ErrorStatus::Fail(HandlerErrorCode::NotFound),
        )
        .with_codes(
            &["DBInstanceAlreadyExists", "DBInstanceAlreadyExistsFault"],
            ErrorStatus::Fail(HandlerErrorCode::AlreadyExists),
        )
        .with_codes(
            &[INVALID_DB_INSTANCE_STATE, "InvalidDBClusterStateFault"],
            ErrorStatus::Fail(HandlerErrorCode::Conflict),
        )
        .with_codes(
            &[
                "DBSubnetGroupNotFoundFault",
                "DBParameterGroupNotFound",
                "OptionGroupNotFoundFault",
                "DBSecurityGroupNotFound",
                "InvalidSubnet",
                "StorageTypeNotSupported",
                "InvalidVPCNetworkStateFault",
            ],
            ErrorStatus::Fail(HandlerErrorCode::InvalidRequest),
        )
        .with_codes(
            &["KMSKeyNotAccessibleFault"],
            ErrorStatus::Fail(HandlerErrorCode::AccessDenied),
        )
        .build()
});

pub static MODIFY_DB_INSTANCE_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET
        .extend()
        .with_message(
            "InvalidParameterCombination",
            "No modifications were requested",
            ErrorStatus::Ignore,
        )
        .with_codes(
            &["InvalidDBSecurityGroupState"],
            ErrorStatus::Fail(HandlerErrorCode::InvalidRequest),
        )
        .build()
});

pub static REBOOT_DB_INSTANCE_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET
        .extend()
        .with_message(INVALID_DB_INSTANCE_STATE, "is rebooting", ErrorStatus::Ignore)
        .build()
});

pub static ADD_ASSOCIATED_ROLES_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET
        .extend()
        .with_codes(&["DBInstanceRoleAlreadyExists"], ErrorStatus::Ignore)
        .with_codes(
            &["DBInstanceRoleQuotaExceeded"],
            ErrorStatus::Fail(HandlerErrorCode::InvalidRequest),
        )
        .build()
});

pub static REMOVE_ASSOCIATED_ROLES_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET
        .extend()
        .with_codes(&["DBInstanceRoleNotFound"], ErrorStatus::Ignore)
        .build()
});

pub static BACKUP_REPLICATION_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET
        .extend()
        .with_codes(&["DBInstanceAutomatedBackupNotFound"], ErrorStatus::Ignore)
        .with_codes(
            &["DBInstanceAutomatedBackupQuotaExceeded"],
            ErrorStatus::Fail(HandlerErrorCode::InvalidRequest),
        )
        .build()
});

pub static DELETE_DB_INSTANCE_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_DB_INSTANCE_ERROR_RULE_SET
        .extend()
        .with_message(
            INVALID_DB_INSTANCE_STATE,
            "is already being deleted",
            ErrorStatus::Ignore,
        )
        .with_codes(
            &["DBSnapshotAlreadyExists"],
            ErrorStatus::Fail(HandlerErrorCode::AlreadyExists),
        )
        .build()
});
