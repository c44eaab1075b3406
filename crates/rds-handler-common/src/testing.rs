// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scripted remote client for tests.
//!
//! Responses are queued per operation name (see [`Request::operation`]).
//! Each call consumes the head of its queue; the last scripted response is
//! repeated for every further call. Calling an unscripted operation panics.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{Request, Response};
use crate::client::RemoteClient;
use crate::error::RemoteError;

type Queue<T> = Mutex<HashMap<&'static str, VecDeque<Result<T, RemoteError>>>>;

#[derive(Default)]
pub struct MockClient {
    responses: Queue<Response>,
    pages: Queue<Vec<Response>>,
    bytes: Queue<Vec<u8>>,
    calls: Mutex<Vec<Request>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `operation`.
    pub fn respond(&self, operation: &'static str, result: Result<Response, RemoteError>) {
        push(&self.responses, operation, result);
    }

    /// Queue the pages of a paginated `operation`.
    pub fn respond_pages(
        &self,
        operation: &'static str,
        result: Result<Vec<Response>, RemoteError>,
    ) {
        push(&self.pages, operation, result);
    }

    /// Queue the payload of a byte-returning `operation`.
    pub fn respond_bytes(&self, operation: &'static str, result: Result<Vec<u8>, RemoteError>) {
        push(&self.bytes, operation, result);
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests received for `operation`.
    pub fn calls_for(&self, operation: &str) -> Vec<Request> {
        self.calls()
            .into_iter()
            .filter(|r| r.operation() == operation)
            .collect()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls_for(operation).len()
    }

    /// Operation names in call order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().iter().map(Request::operation).collect()
    }

    fn record(&self, request: Request) -> &'static str {
        let operation = request.operation();
        self.calls.lock().unwrap().push(request);
        operation
    }
}

fn push<T>(queue: &Queue<T>, operation: &'static str, result: Result<T, RemoteError>) {
    queue
        .lock()
        .unwrap()
        .entry(operation)
        .or_default()
        .push_back(result);
}

fn next<T: Clone>(queue: &Queue<T>, operation: &'static str) -> Result<T, RemoteError> {
    let mut queue = queue.lock().unwrap();
    let scripted = queue
        .get_mut(operation)
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| panic!("no scripted response for {operation}"));
    if scripted.len() > 1 {
        scripted.pop_front().unwrap()
    } else {
        scripted.front().cloned().unwrap()
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn invoke(&self, request: Request) -> Result<Response, RemoteError> {
        let operation = self.record(request);
        next(&self.responses, operation)
    }

    async fn invoke_iterable(&self, request: Request) -> Result<Vec<Response>, RemoteError> {
        let operation = self.record(request);
        next(&self.pages, operation)
    }

    async fn invoke_bytes(&self, request: Request) -> Result<Vec<u8>, RemoteError> {
        let operation = self.record(request);
        next(&self.bytes, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reboot() -> Request {
        Request::RebootDbInstance {
            db_instance_identifier: "db-1".into(),
        }
    }

    #[tokio::test]
    async fn test_queue_then_repeat_last() {
        let mock = MockClient::new();
        mock.respond("RebootDBInstance", Err(RemoteError::client("Throttling", "slow")));
        mock.respond("RebootDBInstance", Ok(Response::Empty));

        assert!(mock.invoke(reboot()).await.is_err());
        assert_eq!(mock.invoke(reboot()).await, Ok(Response::Empty));
        assert_eq!(mock.invoke(reboot()).await, Ok(Response::Empty));
        assert_eq!(mock.call_count("RebootDBInstance"), 3);
        assert_eq!(mock.operations(), vec!["RebootDBInstance"; 3]);
    }

    #[tokio::test]
    #[should_panic(expected = "no scripted response for RebootDBInstance")]
    async fn test_unscripted_operation_panics() {
        let mock = MockClient::new();
        let _ = mock.invoke(reboot()).await;
    }
}
