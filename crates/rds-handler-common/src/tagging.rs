// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tag namespaces and tag reconciliation.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::api::{Request, Tag};
use crate::client::RemoteClient;
use crate::config::HandlerConfig;
use crate::error::RemoteError;
use crate::error_rules::{ErrorRuleSet, ErrorStatus, HandlerErrorCode, handle_exception};
use crate::progress::ProgressEvent;

const ADD_TAGS_STEP: &str = "rds::add-tags-to-resource";
const REMOVE_TAGS_STEP: &str = "rds::remove-tags-from-resource";

pub type Tags = BTreeMap<String, String>;

/// Tags of one resource split by the namespace that owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub system_tags: Tags,
    pub stack_tags: Tags,
    pub resource_tags: Tags,
}

impl TagSet {
    pub fn new(system_tags: Tags, stack_tags: Tags, resource_tags: Tags) -> Self {
        Self {
            system_tags,
            stack_tags,
            resource_tags,
        }
    }

    /// All tags; resource tags win over stack tags win over system tags.
    pub fn merged(&self) -> Tags {
        let mut merged = self.system_tags.clone();
        merged.extend(self.stack_tags.clone());
        merged.extend(self.resource_tags.clone());
        merged
    }

    /// The same set without system tags.
    pub fn without_system_tags(&self) -> Self {
        Self {
            system_tags: Tags::new(),
            ..self.clone()
        }
    }
}

/// Pairs of `desired` that are missing from or differ in `previous`.
pub fn tags_to_add(previous: &Tags, desired: &Tags) -> Tags {
    desired
        .iter()
        .filter(|(key, value)| previous.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Keys of `previous` that are absent from `desired`.
pub fn tags_to_remove(previous: &Tags, desired: &Tags) -> Vec<String> {
    previous
        .keys()
        .filter(|key| !desired.contains_key(*key))
        .cloned()
        .collect()
}

pub fn to_api_tags(tags: &Tags) -> Vec<Tag> {
    tags.iter().map(|(k, v)| Tag::new(k, v)).collect()
}

pub fn from_api_tags(tags: &[Tag]) -> Tags {
    tags.iter()
        .map(|tag| (tag.key.clone(), tag.value.clone()))
        .collect()
}

/// Bring the tags of `resource_arn` from `previous` to `desired`.
///
/// When adding the full set is denied, the addition is retried once
/// without system tags.
pub async fn reconcile_tags<M>(
    client: &dyn RemoteClient,
    resource_arn: &str,
    previous: &TagSet,
    desired: &TagSet,
    progress: ProgressEvent<M>,
    rules: &ErrorRuleSet,
    config: &HandlerConfig,
) -> ProgressEvent<M> {
    let previous_tags = previous.merged();
    let desired_tags = desired.merged();

    let remove = tags_to_remove(&previous_tags, &desired_tags);
    if !remove.is_empty() {
        info!(resource = resource_arn, count = remove.len(), "Removing tags");
        let request = Request::RemoveTagsFromResource {
            resource_name: resource_arn.to_string(),
            tag_keys: remove,
        };
        if let Err(err) = client.invoke(request).await {
            return handle_exception(progress, REMOVE_TAGS_STEP, err.into(), rules, config);
        }
    }

    let add = tags_to_add(&previous_tags, &desired_tags);
    if add.is_empty() {
        return progress;
    }

    info!(resource = resource_arn, count = add.len(), "Adding tags");
    let err = match add_tags(client, resource_arn, &add).await {
        Ok(()) => return progress,
        Err(err) => err,
    };

    if rules.classify(&err) != ErrorStatus::Fail(HandlerErrorCode::AccessDenied)
        || desired.system_tags.is_empty()
    {
        return handle_exception(progress, ADD_TAGS_STEP, err.into(), rules, config);
    }

    warn!(
        resource = resource_arn,
        error = %err,
        "Tagging denied, retrying without system tags"
    );
    let fallback = tags_to_add(&previous_tags, &desired.without_system_tags().merged());
    if fallback.is_empty() {
        return progress;
    }
    match add_tags(client, resource_arn, &fallback).await {
        Ok(()) => progress,
        Err(err) => handle_exception(progress, ADD_TAGS_STEP, err.into(), rules, config),
    }
}

async fn add_tags(
    client: &dyn RemoteClient,
    resource_arn: &str,
    tags: &Tags,
) -> Result<(), RemoteError> {
    client
        .invoke(Request::AddTagsToResource {
            resource_name: resource_arn.to_string(),
            tags: to_api_tags(tags),
        })
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Response;
    use crate::context::CallbackContext;
    use crate::error_rules::DEFAULT_ERROR_RULE_SET;
    use crate::testing::MockClient;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const ARN: &str = "arn:aws:rds:us-east-1:123456789012:db:db-1";

    #[test]
    fn test_tag_diff() {
        let previous = tags(&[("a", "1"), ("b", "2")]);
        let desired = tags(&[("b", "3"), ("c", "4")]);

        assert_eq!(tags_to_remove(&previous, &desired), vec!["a".to_string()]);
        assert_eq!(tags_to_add(&previous, &desired), tags(&[("b", "3"), ("c", "4")]));
    }

    #[test]
    fn test_merge_precedence() {
        let set = TagSet::new(
            tags(&[("owner", "system"), ("aws:cloudformation:stack-id", "s-1")]),
            tags(&[("owner", "stack"), ("env", "stack")]),
            tags(&[("env", "resource")]),
        );

        assert_eq!(
            set.merged(),
            tags(&[
                ("aws:cloudformation:stack-id", "s-1"),
                ("env", "resource"),
                ("owner", "stack"),
            ])
        );
    }

    #[tokio::test]
    async fn test_reconcile_removes_then_adds() {
        let mock = MockClient::new();
        mock.respond("RemoveTagsFromResource", Ok(Response::Empty));
        mock.respond("AddTagsToResource", Ok(Response::Empty));

        let previous = TagSet::new(Tags::new(), Tags::new(), tags(&[("a", "1"), ("b", "2")]));
        let desired = TagSet::new(Tags::new(), Tags::new(), tags(&[("b", "3"), ("c", "4")]));

        let progress = reconcile_tags(
            &mock,
            ARN,
            &previous,
            &desired,
            ProgressEvent::progress((), CallbackContext::new()),
            &DEFAULT_ERROR_RULE_SET,
            &HandlerConfig::default(),
        )
        .await;

        assert!(progress.is_continuation());
        assert_eq!(
            mock.calls(),
            vec![
                Request::RemoveTagsFromResource {
                    resource_name: ARN.into(),
                    tag_keys: vec!["a".into()],
                },
                Request::AddTagsToResource {
                    resource_name: ARN.into(),
                    tags: vec![Tag::new("b", "3"), Tag::new("c", "4")],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unchanged_tags_make_no_calls() {
        let mock = MockClient::new();
        let set = TagSet::new(tags(&[("sys", "1")]), tags(&[("stack", "1")]), Tags::new());

        let progress = reconcile_tags(
            &mock,
            ARN,
            &set,
            &set,
            ProgressEvent::progress((), CallbackContext::new()),
            &DEFAULT_ERROR_RULE_SET,
            &HandlerConfig::default(),
        )
        .await;

        assert!(progress.is_continuation());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_denied_system_tags_fall_back() {
        let mock = MockClient::new();
        mock.respond(
            "AddTagsToResource",
            Err(RemoteError::client("AccessDenied", "no tagging of aws: keys")),
        );
        mock.respond("AddTagsToResource", Ok(Response::Empty));

        let desired = TagSet::new(
            tags(&[("aws:cloudformation:stack-name", "s")]),
            Tags::new(),
            tags(&[("env", "prod")]),
        );

        let progress = reconcile_tags(
            &mock,
            ARN,
            &TagSet::default(),
            &desired,
            ProgressEvent::progress((), CallbackContext::new()),
            &DEFAULT_ERROR_RULE_SET,
            &HandlerConfig::default(),
        )
        .await;

        assert!(progress.is_continuation());
        let calls = mock.calls_for("AddTagsToResource");
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            Request::AddTagsToResource {
                resource_name: ARN.into(),
                tags: vec![Tag::new("env", "prod")],
            }
        );
    }
}
