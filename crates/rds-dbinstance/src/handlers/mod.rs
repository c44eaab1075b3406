// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DB instance handlers.
//!
//! Each handler is invoked once per host tick with the context returned by
//! the previous invocation and folds its pipeline with
//! [`ProgressEvent::then`](rds_handler_common::ProgressEvent::then).

mod create;
mod delete;
mod list;
mod read;
mod steps;
mod update;

use std::sync::Arc;

use once_cell::sync::Lazy;
use rds_handler_common::{
    ApiVersion, ApiVersionDispatcher, HandlerConfig, LoggingClient, RemoteClient, RequestLogger,
    VersionedClient, VersionedTable,
};

use crate::model::ResourceModel;
use crate::predicates::requires_v12_api;

pub use create::CreateHandler;
pub use delete::DeleteHandler;
pub use list::ListHandler;
pub use read::ReadHandler;
pub use update::UpdateHandler;

/// DB instances take far longer than other resources to converge.
pub const DB_INSTANCE_STABILIZATION_TIMEOUT_SECS: u64 = 36 * 60 * 60;

/// Handler configuration with the DB instance stabilization timeout.
pub fn default_handler_config() -> HandlerConfig {
    HandlerConfig::default().with_stabilization_timeout_secs(DB_INSTANCE_STABILIZATION_TIMEOUT_SECS)
}

// Context markers
pub(crate) const CREATED: &str = "created";
pub(crate) const UPDATED_AFTER_CREATE: &str = "updatedAfterCreate";
pub(crate) const STORAGE_ALLOCATED: &str = "storageAllocated";
pub(crate) const ALLOCATING_STORAGE: &str = "allocatingStorage";
pub(crate) const READ_REPLICA_PROMOTED: &str = "readReplicaPromoted";
pub(crate) const UPDATED: &str = "updated";
pub(crate) const REBOOTED: &str = "rebooted";
pub(crate) const UPDATED_ROLES: &str = "updatedRoles";
pub(crate) const BACKUP_REPLICATION_STOPPED: &str = "automaticBackupReplicationStopped";
pub(crate) const BACKUP_REPLICATION_STARTED: &str = "automaticBackupReplicationStarted";
pub(crate) const DELETED: &str = "deleted";

// Context timestamps and scratch values
pub(crate) const RESOURCE_UPDATED_AT: &str = "resourceUpdatedAt";
pub(crate) const DB_INSTANCE_ARN: &str = "dbInstanceArn";
pub(crate) const KMS_KEY_ID: &str = "kmsKeyId";

pub(crate) static API_VERSION_DISPATCHER: Lazy<ApiVersionDispatcher<ResourceModel>> =
    Lazy::new(|| ApiVersionDispatcher::new().with_version(ApiVersion::V12, requires_v12_api));

/// Remote clients a handler talks to.
#[derive(Clone)]
pub struct Clients {
    pub rds: VersionedClient,
    pub ec2: Arc<dyn RemoteClient>,
}

impl Clients {
    pub fn new(rds: VersionedClient, ec2: Arc<dyn RemoteClient>) -> Self {
        Self { rds, ec2 }
    }

    /// One database client for every API version.
    pub fn single(rds: Arc<dyn RemoteClient>, ec2: Arc<dyn RemoteClient>) -> Self {
        Self::new(VersionedTable::new(rds), ec2)
    }

    /// The same clients decorated with request/response logging.
    pub fn with_logging(&self, logger: &RequestLogger) -> Self {
        Self {
            rds: self
                .rds
                .map(|client| LoggingClient::wrap(Arc::clone(client), logger.clone())),
            ec2: LoggingClient::wrap(Arc::clone(&self.ec2), logger.clone()),
        }
    }

    pub fn rds(&self) -> &dyn RemoteClient {
        self.rds.default_client()
    }

    pub fn ec2(&self) -> &dyn RemoteClient {
        self.ec2.as_ref()
    }
}
