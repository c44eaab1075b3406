// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Model to request and response to model translation.

use rds_handler_common::Tags;
use rds_handler_common::api::{DbSubnetGroup, DbSubnetGroupInput, Request};
use rds_handler_common::tagging::to_api_tags;
use sha2::{Digest, Sha256};

use crate::model::{ResourceModel, Tag};

const MAX_NAME_LENGTH: usize = 255;
const NAME_SUFFIX_LENGTH: usize = 12;

/// Deterministic lowercase name for a model created without one.
pub fn generate_name(stack_id: Option<&str>, logical_id: Option<&str>) -> String {
    let logical = logical_id.unwrap_or("dbsubnetgroup");
    let mut prefix: String = logical
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    prefix.truncate(MAX_NAME_LENGTH - NAME_SUFFIX_LENGTH - 1);

    let mut hasher = Sha256::new();
    hasher.update(stack_id.unwrap_or_default().as_bytes());
    hasher.update(logical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{prefix}-{}", &digest[..NAME_SUFFIX_LENGTH])
}

pub fn translate_tags_to_sdk(tags: &[Tag]) -> Tags {
    tags.iter()
        .map(|tag| (tag.key.clone(), tag.value.clone()))
        .collect()
}

fn input(model: &ResourceModel) -> DbSubnetGroupInput {
    DbSubnetGroupInput {
        db_subnet_group_name: model.name().to_string(),
        db_subnet_group_description: Some(model.db_subnet_group_description.clone()),
        subnet_ids: model.subnet_ids.clone(),
        tags: vec![],
    }
}

pub fn create_db_subnet_group_request(model: &ResourceModel, tags: &Tags) -> Request {
    Request::CreateDbSubnetGroup(DbSubnetGroupInput {
        tags: to_api_tags(tags),
        ..input(model)
    })
}

pub fn modify_db_subnet_group_request(model: &ResourceModel) -> Request {
    Request::ModifyDbSubnetGroup(input(model))
}

pub fn delete_db_subnet_group_request(model: &ResourceModel) -> Request {
    Request::DeleteDbSubnetGroup {
        db_subnet_group_name: model.name().to_string(),
    }
}

pub fn describe_db_subnet_group_request(name: &str) -> Request {
    Request::DescribeDbSubnetGroups {
        db_subnet_group_name: Some(name.to_string()),
        marker: None,
    }
}

pub fn describe_db_subnet_groups_request(marker: Option<String>) -> Request {
    Request::DescribeDbSubnetGroups {
        db_subnet_group_name: None,
        marker,
    }
}

/// Observed group as a model. Tags are not part of the describe response.
pub fn translate_db_subnet_group_from_sdk(group: &DbSubnetGroup) -> ResourceModel {
    ResourceModel {
        db_subnet_group_name: Some(group.db_subnet_group_name.clone()),
        db_subnet_group_description: group.db_subnet_group_description.clone().unwrap_or_default(),
        subnet_ids: group
            .subnets
            .iter()
            .map(|subnet| subnet.subnet_identifier.clone())
            .collect(),
        tags: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rds_handler_common::api::Subnet;

    #[test]
    fn test_generated_name_is_stable_and_lowercase() {
        let name = generate_name(Some("stack/1"), Some("App_Subnets"));

        assert_eq!(name, generate_name(Some("stack/1"), Some("App_Subnets")));
        assert_ne!(name, generate_name(Some("stack/2"), Some("App_Subnets")));
        assert!(name.starts_with("appsubnets-"));
        assert_eq!(name.len(), "appsubnets-".len() + NAME_SUFFIX_LENGTH);
    }

    #[test]
    fn test_observed_group_lists_subnet_ids() {
        let group = DbSubnetGroup {
            db_subnet_group_name: "subnets".into(),
            db_subnet_group_description: Some("app".into()),
            subnets: vec![
                Subnet {
                    subnet_identifier: "subnet-1".into(),
                    ..Default::default()
                },
                Subnet {
                    subnet_identifier: "subnet-2".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let model = translate_db_subnet_group_from_sdk(&group);

        assert_eq!(model.name(), "subnets");
        assert_eq!(model.subnet_ids, vec!["subnet-1", "subnet-2"]);
    }
}
