// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Remote client interface.

use async_trait::async_trait;

use crate::api::{Request, Response};
use crate::error::RemoteError;

/// Client for the remote service.
///
/// Credential injection and transport are the implementor's concern; the
/// handlers only see requests, responses and classified remote errors.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Issue a single request.
    async fn invoke(&self, request: Request) -> Result<Response, RemoteError>;

    /// Issue a paginated request and collect every page.
    async fn invoke_iterable(&self, request: Request) -> Result<Vec<Response>, RemoteError>;

    /// Issue a request whose result is a raw byte payload.
    async fn invoke_bytes(&self, request: Request) -> Result<Vec<u8>, RemoteError>;
}
