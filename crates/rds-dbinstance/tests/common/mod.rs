// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures for the DB instance handler tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;

use rds_dbinstance::{Clients, ResourceModel};
use rds_handler_common::api::{DbInstance, Event, Response};
use rds_handler_common::testing::MockClient;
use rds_handler_common::{CallbackContext, ProgressEvent};

pub const DB_INSTANCE_IDENTIFIER: &str = "db-1";
pub const DB_INSTANCE_ARN: &str = "arn:aws:rds:us-east-1:123456789012:db:db-1";

/// Scripted database and network clients.
pub struct TestEnv {
    pub rds: Arc<MockClient>,
    pub ec2: Arc<MockClient>,
    pub clients: Clients,
}

impl TestEnv {
    pub fn new() -> Self {
        let rds = Arc::new(MockClient::new());
        let ec2 = Arc::new(MockClient::new());
        let clients = Clients::single(rds.clone(), ec2.clone());
        Self { rds, ec2, clients }
    }

    /// Queue one DescribeDBInstances answer per instance; the last repeats.
    pub fn describe(&self, instances: impl IntoIterator<Item = DbInstance>) {
        for instance in instances {
            self.rds.respond(
                "DescribeDBInstances",
                Ok(Response::DbInstances {
                    db_instances: vec![instance],
                    marker: None,
                }),
            );
        }
    }

    pub fn no_events(&self) {
        self.events(vec![]);
    }

    pub fn events(&self, events: Vec<Event>) {
        self.rds.respond_pages(
            "DescribeEvents",
            Ok(vec![Response::Events {
                events,
                marker: None,
            }]),
        );
    }

    pub fn acknowledge(&self, operation: &'static str) {
        self.rds.respond(operation, Ok(Response::Empty));
    }
}

pub fn model() -> ResourceModel {
    ResourceModel {
        db_instance_identifier: Some(DB_INSTANCE_IDENTIFIER.into()),
        db_instance_class: Some("db.t3.small".into()),
        engine: Some("mysql".into()),
        engine_version: Some("8.0.35".into()),
        allocated_storage: Some("20".into()),
        vpc_security_groups: vec!["sg-1".into()],
        ..Default::default()
    }
}

pub fn instance(status: &str) -> DbInstance {
    DbInstance {
        db_instance_identifier: DB_INSTANCE_IDENTIFIER.into(),
        db_instance_arn: Some(DB_INSTANCE_ARN.into()),
        db_instance_status: Some(status.into()),
        db_instance_class: Some("db.t3.small".into()),
        engine: Some("mysql".into()),
        engine_version: Some("8.0.35".into()),
        ..Default::default()
    }
}

pub fn available() -> DbInstance {
    instance("available")
}

/// Context as the host would hand it back: serialized and parsed again.
pub fn resume(event: &ProgressEvent<ResourceModel>) -> CallbackContext {
    let json = event
        .callback_context
        .as_ref()
        .expect("pending event carries a context")
        .to_json()
        .unwrap();
    CallbackContext::from_json(&json).unwrap()
}

/// Re-invoke `invoke` with the returned context until the event is terminal.
pub async fn run_to_completion<F, Fut>(mut invoke: F) -> (ProgressEvent<ResourceModel>, usize)
where
    F: FnMut(CallbackContext) -> Fut,
    Fut: Future<Output = ProgressEvent<ResourceModel>>,
{
    let mut context = CallbackContext::new();
    for invocation in 1..=20 {
        let event = invoke(context).await;
        if !event.is_pending() {
            return (event, invocation);
        }
        assert!(event.callback_delay_seconds >= 1);
        context = resume(&event);
    }
    panic!("handler did not reach a terminal event");
}
