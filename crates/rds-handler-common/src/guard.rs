// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Idempotent step guard.

use std::future::Future;

use tracing::debug;

use crate::context::CallbackContext;
use crate::progress::ProgressEvent;

/// Run `body` unless `is_done` already holds for the context.
///
/// The marker is set through `mark_done` only when `body` neither failed nor
/// yielded; a yielded step re-enters on the next invocation.
pub async fn exec_once_with<M, D, S, F, Fut>(
    mut progress: ProgressEvent<M>,
    is_done: D,
    mark_done: S,
    body: F,
) -> ProgressEvent<M>
where
    D: FnOnce(&CallbackContext) -> bool,
    S: FnOnce(&mut CallbackContext),
    F: FnOnce(ProgressEvent<M>) -> Fut,
    Fut: Future<Output = ProgressEvent<M>>,
{
    if is_done(progress.context_mut()) {
        return progress;
    }

    let mut result = body(progress).await;
    if result.is_continuation() || result.is_success() {
        if let Some(context) = result.callback_context.as_mut() {
            mark_done(context);
        }
    }
    result
}

/// [`exec_once_with`] keyed by a context marker.
pub async fn exec_once<M, F, Fut>(
    progress: ProgressEvent<M>,
    key: &str,
    body: F,
) -> ProgressEvent<M>
where
    F: FnOnce(ProgressEvent<M>) -> Fut,
    Fut: Future<Output = ProgressEvent<M>>,
{
    exec_once_with(
        progress,
        |context| {
            let done = context.is_done(key);
            if done {
                debug!(step = key, "Step already completed, skipping");
            }
            done
        },
        |context| context.mark_done(key),
        body,
    )
    .await
}
