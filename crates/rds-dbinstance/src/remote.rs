// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Describe calls shared by the handlers.

use rds_handler_common::api::{
    DbCluster, DbEngineVersion, DbInstance, DbParameterGroup, Request, Response, SecurityGroup,
};
use rds_handler_common::{
    ErrorStatus, HandlerError, HandlerErrorCode, RemoteClient, RemoteError, Result,
};

use crate::predicates::check_terminal_status;
use crate::rules::{DB_CLUSTER_NOT_FOUND, DB_INSTANCE_NOT_FOUND, DEFAULT_DB_INSTANCE_ERROR_RULE_SET};
use crate::translator;

fn unexpected(expected: &str, response: &Response) -> HandlerError {
    HandlerError::UnexpectedResponse(format!("expected {expected}, got {}", response.shape()))
}

/// Describe one instance. An empty result is reported as not found.
pub async fn fetch_db_instance(client: &dyn RemoteClient, identifier: &str) -> Result<DbInstance> {
    match client
        .invoke(translator::describe_db_instance_request(identifier))
        .await?
    {
        Response::DbInstances { db_instances, .. } => {
            db_instances.into_iter().next().ok_or_else(|| {
                RemoteError::not_found(
                    DB_INSTANCE_NOT_FOUND,
                    format!("DBInstance {identifier} not found"),
                )
                .into()
            })
        }
        other => Err(unexpected("DbInstances", &other)),
    }
}

/// Stabilization probe: the instance, or an error once it reached a status
/// it will not leave on its own.
pub async fn poll_db_instance(client: &dyn RemoteClient, identifier: &str) -> Result<DbInstance> {
    let instance = fetch_db_instance(client, identifier).await?;
    check_terminal_status(&instance)?;
    Ok(instance)
}

/// Whether `err` reports a missing instance or cluster.
pub fn is_not_found(err: &HandlerError) -> bool {
    err.as_remote().is_some_and(|remote| {
        DEFAULT_DB_INSTANCE_ERROR_RULE_SET.classify(remote)
            == ErrorStatus::Fail(HandlerErrorCode::NotFound)
    })
}

/// One page of instances and the marker of the next page.
pub async fn describe_db_instances(
    client: &dyn RemoteClient,
    marker: Option<String>,
) -> Result<(Vec<DbInstance>, Option<String>)> {
    match client
        .invoke(translator::describe_db_instances_request(marker))
        .await?
    {
        Response::DbInstances {
            db_instances,
            marker,
        } => Ok((db_instances, marker)),
        other => Err(unexpected("DbInstances", &other)),
    }
}

pub async fn fetch_db_cluster(client: &dyn RemoteClient, identifier: &str) -> Result<DbCluster> {
    let request = Request::DescribeDbClusters {
        db_cluster_identifier: identifier.to_string(),
    };
    match client.invoke(request).await? {
        Response::DbClusters(clusters) => clusters.into_iter().next().ok_or_else(|| {
            RemoteError::not_found(
                DB_CLUSTER_NOT_FOUND,
                format!("DBCluster {identifier} not found"),
            )
            .into()
        }),
        other => Err(unexpected("DbClusters", &other)),
    }
}

/// Security group `group_name` of `vpc_id`, if any.
pub async fn fetch_security_group(
    client: &dyn RemoteClient,
    vpc_id: &str,
    group_name: &str,
) -> Result<Option<SecurityGroup>> {
    match client
        .invoke(translator::describe_security_groups_request(vpc_id, group_name))
        .await?
    {
        Response::SecurityGroups(groups) => Ok(groups.into_iter().next()),
        other => Err(unexpected("SecurityGroups", &other)),
    }
}

pub async fn fetch_db_parameter_group(
    client: &dyn RemoteClient,
    name: &str,
) -> Result<Option<DbParameterGroup>> {
    match client
        .invoke(translator::describe_db_parameter_groups_request(name))
        .await?
    {
        Response::DbParameterGroups(groups) => Ok(groups.into_iter().next()),
        other => Err(unexpected("DbParameterGroups", &other)),
    }
}

pub async fn describe_db_engine_versions(
    client: &dyn RemoteClient,
    family: &str,
    engine: Option<&str>,
    engine_version: Option<&str>,
) -> Result<Vec<DbEngineVersion>> {
    match client
        .invoke(translator::describe_db_engine_versions_request(
            family,
            engine,
            engine_version,
        ))
        .await?
    {
        Response::DbEngineVersions(versions) => Ok(versions),
        other => Err(unexpected("DbEngineVersions", &other)),
    }
}

/// Acknowledgement of a mutating call; any payload is accepted.
pub async fn invoke_mutation(client: &dyn RemoteClient, request: Request) -> Result<()> {
    client.invoke(request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rds_handler_common::testing::MockClient;

    #[tokio::test]
    async fn test_empty_describe_is_not_found() {
        let client = MockClient::new();
        client.respond(
            "DescribeDBInstances",
            Ok(Response::DbInstances {
                db_instances: vec![],
                marker: None,
            }),
        );

        let err = fetch_db_instance(&client, "db-1").await.unwrap_err();
        let remote = err.as_remote().unwrap();
        assert_eq!(
            DEFAULT_DB_INSTANCE_ERROR_RULE_SET.classify(remote),
            ErrorStatus::Fail(HandlerErrorCode::NotFound)
        );
    }

    #[tokio::test]
    async fn test_poll_fails_on_terminal_status() {
        let client = MockClient::new();
        client.respond(
            "DescribeDBInstances",
            Ok(Response::DbInstances {
                db_instances: vec![DbInstance {
                    db_instance_identifier: "db-1".into(),
                    db_instance_status: Some("incompatible-parameters".into()),
                    ..Default::default()
                }],
                marker: None,
            }),
        );

        let err = poll_db_instance(&client, "db-1").await.unwrap_err();
        assert!(matches!(err, HandlerError::NotStabilized(_)));
        assert!(!is_not_found(&err));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_unexpected() {
        let client = MockClient::new();
        client.respond("DescribeDBInstances", Ok(Response::Empty));

        let err = fetch_db_instance(&client, "db-1").await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::UnexpectedResponse(message) if message.contains("expected DbInstances")
        ));
    }

    #[tokio::test]
    async fn test_missing_security_group_is_none() {
        let client = MockClient::new();
        client.respond("DescribeSecurityGroups", Ok(Response::SecurityGroups(vec![])));

        let group = fetch_security_group(&client, "vpc-1", "default").await.unwrap();
        assert!(group.is_none());
    }
}
