// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DB subnet group resource model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResourceModel {
    #[serde(rename = "DBSubnetGroupName", skip_serializing_if = "Option::is_none")]
    pub db_subnet_group_name: Option<String>,
    #[serde(rename = "DBSubnetGroupDescription")]
    pub db_subnet_group_description: String,
    pub subnet_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ResourceModel {
    pub fn name(&self) -> &str {
        self.db_subnet_group_name.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_property_names() {
        let model = ResourceModel {
            db_subnet_group_name: Some("subnets".into()),
            db_subnet_group_description: "app subnets".into(),
            subnet_ids: vec!["subnet-1".into()],
            tags: vec![],
        };

        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["DBSubnetGroupName"], "subnets");
        assert_eq!(json["DBSubnetGroupDescription"], "app subnets");
        assert_eq!(json["SubnetIds"][0], "subnet-1");
        assert!(json.get("Tags").is_none());
    }
}
