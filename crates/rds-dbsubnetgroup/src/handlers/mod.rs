// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DB subnet group handlers.

mod create;
mod delete;
mod list;
mod read;
mod update;

use rds_handler_common::api::{DbSubnetGroup, Request, Response};
use rds_handler_common::{HandlerError, RemoteClient, RemoteError, Result};

use crate::rules::DB_SUBNET_GROUP_NOT_FOUND;
use crate::translator;

pub use create::CreateHandler;
pub use delete::DeleteHandler;
pub use list::ListHandler;
pub use read::ReadHandler;
pub use update::UpdateHandler;

pub(crate) const CREATED: &str = "created";
pub(crate) const UPDATED: &str = "updated";
pub(crate) const DELETED: &str = "deleted";

pub(crate) const DESCRIBE_STEP: &str = "rds::describe-db-subnet-group";

const COMPLETE: &str = "Complete";

fn unexpected(expected: &str, response: &Response) -> HandlerError {
    HandlerError::UnexpectedResponse(format!("expected {expected}, got {}", response.shape()))
}

/// Describe one group. An empty result is reported as not found.
pub(crate) async fn fetch_db_subnet_group(
    client: &dyn RemoteClient,
    name: &str,
) -> Result<DbSubnetGroup> {
    let (groups, _) = describe(client, translator::describe_db_subnet_group_request(name)).await?;
    groups.into_iter().next().ok_or_else(|| {
        RemoteError::not_found(
            DB_SUBNET_GROUP_NOT_FOUND,
            format!("DBSubnetGroup {name} not found"),
        )
        .into()
    })
}

pub(crate) async fn describe(
    client: &dyn RemoteClient,
    request: Request,
) -> Result<(Vec<DbSubnetGroup>, Option<String>)> {
    match client.invoke(request).await? {
        Response::DbSubnetGroups {
            db_subnet_groups,
            marker,
        } => Ok((db_subnet_groups, marker)),
        other => Err(unexpected("DbSubnetGroups", &other)),
    }
}

pub(crate) async fn invoke_mutation(client: &dyn RemoteClient, request: Request) -> Result<()> {
    client.invoke(request).await?;
    Ok(())
}

pub(crate) fn is_complete(group: &DbSubnetGroup) -> bool {
    group.subnet_group_status.as_deref() == Some(COMPLETE)
}
