// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Read and list handlers, and the action dispatcher.

mod common;

use rds_dbinstance::{ListHandler, ReadHandler, default_handler_config, handle};
use rds_handler_common::api::{DbInstance, Response};
use rds_handler_common::{
    Action, CallbackContext, HandlerErrorCode, RemoteError, ResourceHandlerRequest,
};

use common::{TestEnv, available, model};

#[tokio::test]
async fn test_read_translates_observed_instance() {
    let env = TestEnv::new();
    env.describe([DbInstance {
        allocated_storage: Some(100),
        ..available()
    }]);

    let event = ReadHandler::default()
        .handle_request(
            &ResourceHandlerRequest::new(model()),
            CallbackContext::new(),
            &env.clients,
        )
        .await;

    assert!(event.is_success());
    let read = event.resource_model.unwrap();
    assert_eq!(read.db_instance_identifier.as_deref(), Some("db-1"));
    assert_eq!(read.allocated_storage.as_deref(), Some("100"));
    assert!(read.master_user_password.is_none());
}

#[tokio::test]
async fn test_read_of_missing_instance_is_not_found() {
    let env = TestEnv::new();
    env.rds.respond(
        "DescribeDBInstances",
        Err(RemoteError::not_found("DBInstanceNotFound", "DBInstance db-1 not found")),
    );

    let event = ReadHandler::default()
        .handle_request(
            &ResourceHandlerRequest::new(model()),
            CallbackContext::new(),
            &env.clients,
        )
        .await;

    assert!(event.is_failed());
    assert_eq!(event.error_code, Some(HandlerErrorCode::NotFound));
}

#[tokio::test]
async fn test_list_returns_one_page_and_token() {
    let env = TestEnv::new();
    let second = DbInstance {
        db_instance_identifier: "db-2".into(),
        ..available()
    };
    env.rds.respond(
        "DescribeDBInstances",
        Ok(Response::DbInstances {
            db_instances: vec![available(), second],
            marker: Some("page-2".into()),
        }),
    );

    let request = ResourceHandlerRequest::new(model()).with_next_token("page-1");
    let event = ListHandler::default()
        .handle_request(&request, CallbackContext::new(), &env.clients)
        .await;

    assert!(event.is_success());
    assert_eq!(event.next_token.as_deref(), Some("page-2"));
    let identifiers: Vec<_> = event
        .resource_models
        .unwrap()
        .into_iter()
        .filter_map(|m| m.db_instance_identifier)
        .collect();
    assert_eq!(identifiers, vec!["db-1", "db-2"]);
}

#[tokio::test]
async fn test_handle_dispatches_by_action() {
    let env = TestEnv::new();
    env.describe([available()]);

    let event = handle(
        Action::Read,
        &ResourceHandlerRequest::new(model()),
        CallbackContext::new(),
        &env.clients,
        &default_handler_config(),
    )
    .await;

    assert!(event.is_success());
    assert_eq!(env.rds.operations(), vec!["DescribeDBInstances"]);
}
