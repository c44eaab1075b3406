// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Delete handler: success once the group is gone, not-found asymmetry and
//! unclassified failures.

use rds_dbsubnetgroup::{DeleteHandler, ResourceModel};
use rds_handler_common::api::Response;
use rds_handler_common::testing::MockClient;
use rds_handler_common::{
    CallbackContext, HandlerErrorCode, OperationStatus, RemoteError, ResourceHandlerRequest,
};

fn request() -> ResourceHandlerRequest<ResourceModel> {
    ResourceHandlerRequest::new(ResourceModel {
        db_subnet_group_name: Some("subnets".into()),
        db_subnet_group_description: "app subnets".into(),
        subnet_ids: vec!["subnet-1".into(), "subnet-2".into()],
        tags: vec![],
    })
}

fn gone() -> RemoteError {
    RemoteError::not_found("DBSubnetGroupNotFoundFault", "DBSubnetGroup subnets not found")
}

#[tokio::test]
async fn test_simple_success() {
    let rds = MockClient::new();
    rds.respond("DeleteDBSubnetGroup", Ok(Response::Empty));
    rds.respond("DescribeDBSubnetGroups", Err(gone()));

    let event = DeleteHandler::default()
        .handle_request(&request(), CallbackContext::new(), &rds)
        .await;

    assert_eq!(event.status, OperationStatus::Success);
    assert!(event.callback_context.is_none());
    assert_eq!(event.callback_delay_seconds, 0);
    assert!(event.resource_models.is_none());
    assert!(event.message.is_none());
    assert!(event.error_code.is_none());
    assert_eq!(
        rds.operations(),
        vec!["DeleteDBSubnetGroup", "DescribeDBSubnetGroups"]
    );
}

#[tokio::test]
async fn test_simple_not_found() {
    let rds = MockClient::new();
    rds.respond("DeleteDBSubnetGroup", Err(gone()));

    let event = DeleteHandler::default()
        .handle_request(&request(), CallbackContext::new(), &rds)
        .await;

    assert_eq!(event.status, OperationStatus::Failed);
    assert!(event.callback_context.is_some());
    assert_eq!(event.callback_delay_seconds, 0);
    assert!(event.resource_models.is_none());
    assert_eq!(event.error_code, Some(HandlerErrorCode::NotFound));
    assert_eq!(rds.operations(), vec!["DeleteDBSubnetGroup"]);
}

#[tokio::test]
async fn test_simple_exception() {
    let rds = MockClient::new();
    rds.respond(
        "DeleteDBSubnetGroup",
        Err(RemoteError::client("UnknownFault", "something went wrong")),
    );

    let event = DeleteHandler::default()
        .handle_request(&request(), CallbackContext::new(), &rds)
        .await;

    assert_eq!(event.status, OperationStatus::Failed);
    assert!(event.callback_context.is_some());
    assert_eq!(event.error_code, Some(HandlerErrorCode::InternalFailure));
    assert_eq!(rds.operations(), vec!["DeleteDBSubnetGroup"]);
}
