// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Handler request.

use serde::{Deserialize, Serialize};

use crate::logging::RequestLogger;
use crate::tagging::Tags;

/// Lifecycle action requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Read => "READ",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
            Action::List => "LIST",
        }
    }
}

/// Everything the host passes to a handler besides the progress context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHandlerRequest<M> {
    pub desired_resource_state: M,
    #[serde(default)]
    pub previous_resource_state: Option<M>,
    #[serde(default)]
    pub desired_resource_tags: Tags,
    #[serde(default)]
    pub previous_resource_tags: Tags,
    #[serde(default)]
    pub system_tags: Tags,
    #[serde(default)]
    pub previous_system_tags: Tags,
    #[serde(default)]
    pub rollback: bool,
    #[serde(default)]
    pub driftable: bool,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub stack_id: Option<String>,
    #[serde(default)]
    pub logical_resource_identifier: Option<String>,
    /// Whether the host asked for a final snapshot on delete.
    #[serde(default)]
    pub snapshot_requested: bool,
}

impl<M> ResourceHandlerRequest<M> {
    pub fn new(desired_resource_state: M) -> Self {
        Self {
            desired_resource_state,
            previous_resource_state: None,
            desired_resource_tags: Tags::new(),
            previous_resource_tags: Tags::new(),
            system_tags: Tags::new(),
            previous_system_tags: Tags::new(),
            rollback: false,
            driftable: false,
            next_token: None,
            stack_id: None,
            logical_resource_identifier: None,
            snapshot_requested: false,
        }
    }

    pub fn with_previous(mut self, previous: M) -> Self {
        self.previous_resource_state = Some(previous);
        self
    }

    pub fn with_stack_tags(mut self, previous: Tags, desired: Tags) -> Self {
        self.previous_resource_tags = previous;
        self.desired_resource_tags = desired;
        self
    }

    pub fn with_system_tags(mut self, previous: Tags, desired: Tags) -> Self {
        self.previous_system_tags = previous;
        self.system_tags = desired;
        self
    }

    pub fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    pub fn with_driftable(mut self, driftable: bool) -> Self {
        self.driftable = driftable;
        self
    }

    pub fn with_next_token(mut self, next_token: impl Into<String>) -> Self {
        self.next_token = Some(next_token.into());
        self
    }

    pub fn with_stack(
        mut self,
        stack_id: impl Into<String>,
        logical_id: impl Into<String>,
    ) -> Self {
        self.stack_id = Some(stack_id.into());
        self.logical_resource_identifier = Some(logical_id.into());
        self
    }

    pub fn with_snapshot_requested(mut self, snapshot_requested: bool) -> Self {
        self.snapshot_requested = snapshot_requested;
        self
    }

    /// Logger tagged with this request's stack identifiers.
    pub fn logger(&self) -> RequestLogger {
        RequestLogger::new(self.stack_id.clone(), self.logical_resource_identifier.clone())
    }
}
