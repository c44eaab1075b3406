// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status vocabularies reported by the service.

/// DB instance lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbInstanceStatus {
    Available,
    BackingUp,
    Creating,
    Deleting,
    Failed,
    InaccessibleEncryptionCredentials,
    IncompatibleNetwork,
    IncompatibleOptionGroup,
    IncompatibleParameters,
    IncompatibleRestore,
    Modifying,
    Rebooting,
    StorageFull,
    StorageOptimization,
}

impl DbInstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbInstanceStatus::Available => "available",
            DbInstanceStatus::BackingUp => "backing-up",
            DbInstanceStatus::Creating => "creating",
            DbInstanceStatus::Deleting => "deleting",
            DbInstanceStatus::Failed => "failed",
            DbInstanceStatus::InaccessibleEncryptionCredentials => {
                "inaccessible-encryption-credentials"
            }
            DbInstanceStatus::IncompatibleNetwork => "incompatible-network",
            DbInstanceStatus::IncompatibleOptionGroup => "incompatible-option-group",
            DbInstanceStatus::IncompatibleParameters => "incompatible-parameters",
            DbInstanceStatus::IncompatibleRestore => "incompatible-restore",
            DbInstanceStatus::Modifying => "modifying",
            DbInstanceStatus::Rebooting => "rebooting",
            DbInstanceStatus::StorageFull => "storage-full",
            DbInstanceStatus::StorageOptimization => "storage-optimization",
        }
    }

    pub fn equals_str(&self, status: Option<&str>) -> bool {
        status == Some(self.as_str())
    }

    /// Statuses an instance does not leave without operator action.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DbInstanceStatus::Failed
                | DbInstanceStatus::InaccessibleEncryptionCredentials
                | DbInstanceStatus::IncompatibleNetwork
                | DbInstanceStatus::IncompatibleOptionGroup
                | DbInstanceStatus::IncompatibleParameters
                | DbInstanceStatus::IncompatibleRestore
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        const ALL: [DbInstanceStatus; 14] = [
            DbInstanceStatus::Available,
            DbInstanceStatus::BackingUp,
            DbInstanceStatus::Creating,
            DbInstanceStatus::Deleting,
            DbInstanceStatus::Failed,
            DbInstanceStatus::InaccessibleEncryptionCredentials,
            DbInstanceStatus::IncompatibleNetwork,
            DbInstanceStatus::IncompatibleOptionGroup,
            DbInstanceStatus::IncompatibleParameters,
            DbInstanceStatus::IncompatibleRestore,
            DbInstanceStatus::Modifying,
            DbInstanceStatus::Rebooting,
            DbInstanceStatus::StorageFull,
            DbInstanceStatus::StorageOptimization,
        ];
        ALL.into_iter().find(|status| status.as_str() == s)
    }
}

/// Apply status of a parameter group (instance or cluster level).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbParameterGroupStatus {
    Applying,
    InSync,
    PendingReboot,
}

impl DbParameterGroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbParameterGroupStatus::Applying => "applying",
            DbParameterGroupStatus::InSync => "in-sync",
            DbParameterGroupStatus::PendingReboot => "pending-reboot",
        }
    }

    pub fn equals_str(&self, status: Option<&str>) -> bool {
        status == Some(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionGroupStatus {
    InSync,
    Pending,
}

impl OptionGroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionGroupStatus::InSync => "in-sync",
            OptionGroupStatus::Pending => "pending-apply",
        }
    }

    pub fn equals_str(&self, status: Option<&str>) -> bool {
        status == Some(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpcSecurityGroupStatus {
    Active,
}

impl VpcSecurityGroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VpcSecurityGroupStatus::Active => "active",
        }
    }
}

/// Status of an IAM role association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbInstanceRoleStatus {
    Active,
    Pending,
    Invalid,
}

impl DbInstanceRoleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbInstanceRoleStatus::Active => "ACTIVE",
            DbInstanceRoleStatus::Pending => "PENDING",
            DbInstanceRoleStatus::Invalid => "INVALID",
        }
    }

    pub fn equals_str(&self, status: Option<&str>) -> bool {
        status == Some(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_status_round_trip() {
        for status in ["available", "storage-full", "incompatible-parameters"] {
            assert_eq!(DbInstanceStatus::parse(status).map(|s| s.as_str()), Some(status));
        }
        assert_eq!(DbInstanceStatus::parse("unknown-status"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(DbInstanceStatus::IncompatibleParameters.is_terminal());
        assert!(!DbInstanceStatus::StorageFull.is_terminal());
        assert!(!DbInstanceStatus::Modifying.is_terminal());
    }

    #[test]
    fn test_equals_str() {
        assert!(DbParameterGroupStatus::PendingReboot.equals_str(Some("pending-reboot")));
        assert!(!DbParameterGroupStatus::InSync.equals_str(None));
        assert!(DbInstanceRoleStatus::Active.equals_str(Some("ACTIVE")));
    }
}
