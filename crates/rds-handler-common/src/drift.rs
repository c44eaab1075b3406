// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Drift reporting.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::progress::ProgressEvent;

/// Top-level properties set in `desired` whose observed value differs.
///
/// Properties listed in `ignored` (write-only or server-normalized values)
/// are never reported.
pub fn detect_drift<M: Serialize>(
    desired: &M,
    observed: &M,
    ignored: &[&str],
) -> Result<Vec<String>> {
    let desired = serde_json::to_value(desired)?;
    let observed = serde_json::to_value(observed)?;

    let (Value::Object(desired), Value::Object(observed)) = (desired, observed) else {
        return Ok(Vec::new());
    };

    Ok(desired
        .iter()
        .filter(|(key, value)| !value.is_null() && !ignored.contains(&key.as_str()))
        .filter(|(key, value)| observed.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect())
}

/// Log the drift between `desired` and the model of a successful read, then
/// return the read result unchanged.
pub fn report_drift<M: Serialize>(
    desired: &M,
    read: ProgressEvent<M>,
    ignored: &[&str],
    operation: &str,
) -> ProgressEvent<M> {
    if !read.is_success() {
        return read;
    }
    let Some(observed) = read.resource_model.as_ref() else {
        return read;
    };

    match detect_drift(desired, observed, ignored) {
        Ok(drifted) if !drifted.is_empty() => {
            warn!(
                operation = operation,
                drifted_properties = ?drifted,
                "Resource drift detected"
            );
        }
        Ok(_) => {}
        Err(err) => warn!(operation = operation, error = %err, "Drift detection failed"),
    }
    read
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Default)]
    #[serde(rename_all = "PascalCase")]
    struct Model {
        #[serde(skip_serializing_if = "Option::is_none")]
        instance_class: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        allocated_storage: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        master_user_password: Option<String>,
    }

    #[test]
    fn test_detects_changed_properties_only() {
        let desired = Model {
            instance_class: Some("db.m5.large".into()),
            allocated_storage: Some("100".into()),
            master_user_password: Some("secret".into()),
        };
        let observed = Model {
            instance_class: Some("db.m5.xlarge".into()),
            allocated_storage: Some("100".into()),
            master_user_password: None,
        };

        let drifted = detect_drift(&desired, &observed, &["MasterUserPassword"]).unwrap();
        assert_eq!(drifted, vec!["InstanceClass".to_string()]);
    }

    #[test]
    fn test_unset_desired_properties_are_not_drift() {
        let desired = Model::default();
        let observed = Model {
            instance_class: Some("db.m5.large".into()),
            ..Default::default()
        };
        assert!(detect_drift(&desired, &observed, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_report_passes_read_result_through() {
        let read = ProgressEvent::success(Some(Model::default()));
        let result = report_drift(&Model::default(), read, &[], "UPDATE");
        assert!(result.is_success());
    }
}
