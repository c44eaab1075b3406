// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API-version negotiation and version-keyed tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RemoteClient;
use crate::context::CallbackContext;

/// Context scratch key holding the negotiated version.
pub const API_VERSION_KEY: &str = "apiVersion";

/// Service API generation a resource is managed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApiVersion {
    #[default]
    Default,
    /// Legacy API generation (classic DB security groups)
    V12,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::Default => "DEFAULT",
            ApiVersion::V12 => "V12",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEFAULT" => Some(ApiVersion::Default),
            "V12" => Some(ApiVersion::V12),
            _ => None,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values keyed by API version with a mandatory default entry.
#[derive(Debug, Clone)]
pub struct VersionedTable<T> {
    default: T,
    entries: HashMap<ApiVersion, T>,
}

impl<T> VersionedTable<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, version: ApiVersion, value: T) -> Self {
        self.entries.insert(version, value);
        self
    }

    /// Entry for `version`, falling back to the default entry.
    pub fn select(&self, version: ApiVersion) -> &T {
        self.entries.get(&version).unwrap_or(&self.default)
    }

    pub fn default_entry(&self) -> &T {
        &self.default
    }

    /// Table of `f` applied to every entry.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> VersionedTable<U> {
        VersionedTable {
            default: f(&self.default),
            entries: self
                .entries
                .iter()
                .map(|(version, value)| (*version, f(value)))
                .collect(),
        }
    }
}

/// Remote clients keyed by API version.
pub type VersionedClient = VersionedTable<Arc<dyn RemoteClient>>;

impl VersionedTable<Arc<dyn RemoteClient>> {
    pub fn default_client(&self) -> &dyn RemoteClient {
        self.default.as_ref()
    }

    pub fn client(&self, version: ApiVersion) -> &dyn RemoteClient {
        self.select(version).as_ref()
    }
}

/// Negotiates the API version of a resource once per operation.
pub struct ApiVersionDispatcher<M> {
    rules: Vec<(ApiVersion, fn(&M) -> bool)>,
}

impl<M> ApiVersionDispatcher<M> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Select `version` for models matching `predicate`. Earlier rules win.
    pub fn with_version(mut self, version: ApiVersion, predicate: fn(&M) -> bool) -> Self {
        self.rules.push((version, predicate));
        self
    }

    /// Version memoized in `context`, or negotiated from `model` and memoized.
    pub fn negotiate(&self, model: &M, context: &mut CallbackContext) -> ApiVersion {
        if let Some(version) = context.get(API_VERSION_KEY).and_then(ApiVersion::parse) {
            return version;
        }

        let version = self
            .rules
            .iter()
            .find(|(_, predicate)| predicate(model))
            .map(|(version, _)| *version)
            .unwrap_or_default();
        debug!(api_version = %version, "Negotiated API version");
        context.set(API_VERSION_KEY, version.as_str());
        version
    }
}

impl<M> Default for ApiVersionDispatcher<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Model {
        security_groups: Vec<String>,
    }

    fn dispatcher() -> ApiVersionDispatcher<Model> {
        ApiVersionDispatcher::<Model>::new()
            .with_version(ApiVersion::V12, |m| !m.security_groups.is_empty())
    }

    #[test]
    fn test_table_select_is_total() {
        let table = VersionedTable::new("default").with(ApiVersion::V12, "legacy");
        assert_eq!(*table.select(ApiVersion::V12), "legacy");
        assert_eq!(*table.select(ApiVersion::Default), "default");

        let only_default = VersionedTable::new(1);
        assert_eq!(*only_default.select(ApiVersion::V12), 1);

        let lengths = table.map(|name| name.len());
        assert_eq!(*lengths.select(ApiVersion::V12), 6);
        assert_eq!(*lengths.default_entry(), 7);
    }

    #[test]
    fn test_negotiation_is_memoized() {
        let mut context = CallbackContext::new();
        let legacy = Model {
            security_groups: vec!["default".into()],
        };

        assert_eq!(dispatcher().negotiate(&legacy, &mut context), ApiVersion::V12);
        assert_eq!(context.get(API_VERSION_KEY), Some("V12"));

        let modern = Model {
            security_groups: vec![],
        };
        assert_eq!(dispatcher().negotiate(&modern, &mut context), ApiVersion::V12);
    }

    #[test]
    fn test_negotiation_defaults() {
        let mut context = CallbackContext::new();
        let modern = Model {
            security_groups: vec![],
        };
        assert_eq!(dispatcher().negotiate(&modern, &mut context), ApiVersion::Default);
        assert_eq!(context.get(API_VERSION_KEY), Some("DEFAULT"));
    }
}
