// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structural changes an update cannot apply in place.

use rds_handler_common::api::DbInstance;
use tracing::debug;

use crate::model::ResourceModel;

const MYSQL: &str = "mysql";
const AURORA_MYSQL: &str = "aurora-mysql";
const ORACLE_SE: &str = "oracle-se";
const ORACLE_SE1: &str = "oracle-se1";
const ORACLE_SE2: &str = "oracle-se2";

fn eq_ignore_case(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// Engine upgrades the service performs in place.
fn is_upgrade_to_aurora_mysql(previous: Option<&str>, desired: Option<&str>) -> bool {
    eq_ignore_case(previous, Some(MYSQL)) && eq_ignore_case(desired, Some(AURORA_MYSQL))
}

fn is_upgrade_to_oracle_se2(previous: Option<&str>, desired: Option<&str>) -> bool {
    (eq_ignore_case(previous, Some(ORACLE_SE)) || eq_ignore_case(previous, Some(ORACLE_SE1)))
        && eq_ignore_case(desired, Some(ORACLE_SE2))
}

fn is_engine_mutable(
    previous: &ResourceModel,
    desired: &ResourceModel,
    observed: Option<&DbInstance>,
) -> bool {
    let previous_engine = previous.engine.as_deref().filter(|e| !e.is_empty());
    let desired_engine = desired.engine.as_deref();

    // A previous model without an engine is compared against what is deployed.
    if previous_engine.is_none() {
        if let Some(instance) = observed {
            return eq_ignore_case(instance.engine.as_deref(), desired_engine);
        }
    }

    eq_ignore_case(previous_engine, desired_engine)
        || is_upgrade_to_aurora_mysql(previous_engine, desired_engine)
        || is_upgrade_to_oracle_se2(previous_engine, desired_engine)
}

fn is_source_identifier_mutable(previous: &ResourceModel, desired: &ResourceModel) -> bool {
    previous.source_db_instance_identifier == desired.source_db_instance_identifier
        || crate::predicates::is_read_replica_promotion(previous, desired)
}

fn is_availability_zone_mutable(previous: &ResourceModel, desired: &ResourceModel) -> bool {
    desired.multi_az == Some(true)
        || desired.availability_zone.is_none()
        || previous.availability_zone == desired.availability_zone
}

/// Whether `previous` can be reconciled into `desired` without replacement.
///
/// `observed` is only consulted when the previous model carries no engine.
pub fn is_change_mutable(
    previous: &ResourceModel,
    desired: &ResourceModel,
    observed: Option<&DbInstance>,
) -> bool {
    let engine = is_engine_mutable(previous, desired, observed);
    let source = is_source_identifier_mutable(previous, desired);
    let region = previous.source_region == desired.source_region;
    let availability_zone = is_availability_zone_mutable(previous, desired);

    let mutable = engine && source && region && availability_zone;
    if !mutable {
        debug!(
            engine = engine,
            source_identifier = source,
            source_region = region,
            availability_zone = availability_zone,
            "Change is not mutable"
        );
    }
    mutable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(engine: &str) -> ResourceModel {
        ResourceModel {
            db_instance_identifier: Some("db-1".into()),
            engine: Some(engine.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_engine_change_is_immutable() {
        assert!(!is_change_mutable(&model("postgres"), &model("mysql"), None));
        assert!(is_change_mutable(&model("postgres"), &model("POSTGRES"), None));
    }

    #[test]
    fn test_engine_upgrades_are_mutable() {
        assert!(is_change_mutable(&model("mysql"), &model("aurora-mysql"), None));
        assert!(is_change_mutable(&model("oracle-se1"), &model("oracle-se2"), None));
        assert!(is_change_mutable(&model("oracle-se"), &model("oracle-se2"), None));
        assert!(!is_change_mutable(&model("aurora-mysql"), &model("mysql"), None));
    }

    #[test]
    fn test_missing_previous_engine_uses_observed() {
        let previous = ResourceModel {
            db_instance_identifier: Some("db-1".into()),
            ..Default::default()
        };
        let observed = DbInstance {
            db_instance_identifier: "db-1".into(),
            engine: Some("postgres".into()),
            ..Default::default()
        };

        assert!(is_change_mutable(&previous, &model("postgres"), Some(&observed)));
        assert!(!is_change_mutable(&previous, &model("mysql"), Some(&observed)));
    }

    #[test]
    fn test_source_identifier_only_changes_through_promotion() {
        let mut replica = model("mysql");
        replica.source_db_instance_identifier = Some("source-1".into());
        let mut other_source = replica.clone();
        other_source.source_db_instance_identifier = Some("source-2".into());

        assert!(is_change_mutable(&replica, &model("mysql"), None));
        assert!(!is_change_mutable(&replica, &other_source, None));
        assert!(!is_change_mutable(&model("mysql"), &replica, None));
    }

    #[test]
    fn test_source_region_is_immutable() {
        let mut previous = model("mysql");
        previous.source_region = Some("us-east-1".into());
        let mut desired = model("mysql");
        desired.source_region = Some("eu-west-1".into());

        assert!(!is_change_mutable(&previous, &desired, None));
    }

    #[test]
    fn test_availability_zone_moves_only_with_multi_az() {
        let mut previous = model("mysql");
        previous.availability_zone = Some("us-east-1a".into());
        let mut desired = model("mysql");
        desired.availability_zone = Some("us-east-1b".into());

        assert!(!is_change_mutable(&previous, &desired, None));

        desired.multi_az = Some(true);
        assert!(is_change_mutable(&previous, &desired, None));

        desired.multi_az = None;
        desired.availability_zone = None;
        assert!(is_change_mutable(&previous, &desired, None));
    }
}
