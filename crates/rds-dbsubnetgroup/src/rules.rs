// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use once_cell::sync::Lazy;
use rds_handler_common::{DEFAULT_ERROR_RULE_SET, ErrorRuleSet, ErrorStatus, HandlerErrorCode};

pub const DB_SUBNET_GROUP_NOT_FOUND: &str = "DBSubnetGroupNotFoundFault";

pub static DEFAULT_DB_SUBNET_GROUP_ERROR_RULE_SET: Lazy<ErrorRuleSet> = Lazy::new(|| {
    DEFAULT_ERROR_RULE_SET
        .extend()
        .with_codes(
            &[DB_SUBNET_GROUP_NOT_FOUND],
            ErrorStatus::Fail(HandlerErrorCode::NotFound),
        )
        .with_codes(
            &["DBSubnetGroupAlreadyExists"],
            ErrorStatus::Fail(HandlerErrorCode::AlreadyExists),
        )
        .with_codes(
            &[
                "InvalidSubnet",
                "DBSubnetGroupDoesNotCoverEnoughAZs",
                "DBSubnetQuotaExceededFault",
                "DBSubnetGroupQuotaExceeded",
            ],
            ErrorStatus::Fail(HandlerErrorCode::InvalidRequest),
        )
        .with_codes(
            &["InvalidDBSubnetGroupStateFault", "SubnetAlreadyInUse"],
            ErrorStatus::Fail(HandlerErrorCode::Conflict),
        )
        .build()
});
