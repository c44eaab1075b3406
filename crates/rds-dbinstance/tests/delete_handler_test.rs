// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Delete handler scenarios.

mod common;

use rds_dbinstance::{DeleteHandler, ResourceModel};
use rds_handler_common::api::Request;
use rds_handler_common::{CallbackContext, HandlerErrorCode, RemoteError, ResourceHandlerRequest};

use common::{TestEnv, instance, model, run_to_completion};

fn gone() -> RemoteError {
    RemoteError::not_found("DBInstanceNotFound", "DBInstance db-1 not found")
}

fn delete_inputs(env: &TestEnv) -> Vec<rds_handler_common::api::DeleteDbInstanceInput> {
    env.rds
        .calls_for("DeleteDBInstance")
        .into_iter()
        .map(|request| match request {
            Request::DeleteDbInstance(input) => input,
            other => panic!("unexpected request {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_not_found_after_delete_is_success() {
    let env = TestEnv::new();
    env.acknowledge("DeleteDBInstance");
    env.rds.respond("DescribeDBInstances", Err(gone()));

    let event = DeleteHandler::default()
        .handle_request(
            &ResourceHandlerRequest::new(model()),
            CallbackContext::new(),
            &env.clients,
        )
        .await;

    assert!(event.is_success(), "{event:?}");
    assert!(event.resource_model.is_none());
    assert!(event.callback_context.is_none());
}

#[tokio::test]
async fn test_not_found_on_delete_call_is_not_found() {
    let env = TestEnv::new();
    env.rds.respond("DeleteDBInstance", Err(gone()));

    let event = DeleteHandler::default()
        .handle_request(
            &ResourceHandlerRequest::new(model()),
            CallbackContext::new(),
            &env.clients,
        )
        .await;

    assert!(event.is_failed());
    assert_eq!(event.error_code, Some(HandlerErrorCode::NotFound));
    assert_eq!(env.rds.call_count("DescribeDBInstances"), 0);
}

#[tokio::test]
async fn test_delete_waits_and_issues_call_once() {
    let env = TestEnv::new();
    env.acknowledge("DeleteDBInstance");
    env.describe([instance("deleting"), instance("deleting")]);
    env.rds.respond("DescribeDBInstances", Err(gone()));

    let handler = DeleteHandler::default();
    let request = ResourceHandlerRequest::new(model());
    let (event, invocations) =
        run_to_completion(|context| handler.handle_request(&request, context, &env.clients)).await;

    assert!(event.is_success(), "{event:?}");
    assert_eq!(invocations, 3);
    assert_eq!(env.rds.call_count("DeleteDBInstance"), 1);
}

#[tokio::test]
async fn test_already_being_deleted_is_ignored() {
    let env = TestEnv::new();
    env.rds.respond(
        "DeleteDBInstance",
        Err(RemoteError::client(
            "InvalidDBInstanceState",
            "Instance db-1 is already being deleted.",
        )),
    );
    env.rds.respond("DescribeDBInstances", Err(gone()));

    let event = DeleteHandler::default()
        .handle_request(
            &ResourceHandlerRequest::new(model()),
            CallbackContext::new(),
            &env.clients,
        )
        .await;

    assert!(event.is_success(), "{event:?}");
}

#[tokio::test]
async fn test_final_snapshot_only_when_requested_for_standalone_instance() {
    let env = TestEnv::new();
    env.acknowledge("DeleteDBInstance");
    env.rds.respond("DescribeDBInstances", Err(gone()));
    let handler = DeleteHandler::default();

    let request = ResourceHandlerRequest::new(model()).with_snapshot_requested(true);
    handler
        .handle_request(&request, CallbackContext::new(), &env.clients)
        .await;

    let member = ResourceModel {
        db_cluster_identifier: Some("cluster-1".into()),
        ..model()
    };
    let request = ResourceHandlerRequest::new(member).with_snapshot_requested(true);
    handler
        .handle_request(&request, CallbackContext::new(), &env.clients)
        .await;

    let inputs = delete_inputs(&env);
    assert_eq!(
        inputs[0].final_db_snapshot_identifier.as_deref(),
        Some("db-1-final-snapshot")
    );
    assert!(!inputs[0].skip_final_snapshot);
    assert!(inputs[1].final_db_snapshot_identifier.is_none());
    assert!(inputs[1].skip_final_snapshot);
}
