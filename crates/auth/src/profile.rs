use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{Store, StoreId, UserId};

use crate::{PermissionSet, Role};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Single,
    Multiple,
    Global,
}

/// A user's store-access scope.
///
/// When `is_global_access` is set, `assigned_store_ids` is advisory only:
/// every store is accessible and per-store assignments stay dormant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAccessProfile {
    pub user_id: UserId,
    pub role: Role,
    pub access_type: AccessType,
    pub is_global_access: bool,
    pub assigned_store_ids: BTreeSet<StoreId>,
}

impl StoreAccessProfile {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            access_type: AccessType::Single,
            is_global_access: false,
            assigned_store_ids: BTreeSet::new(),
        }
    }

    /// Recompute `access_type` from the global flag and the assigned set.
    pub fn refresh_access_type(&mut self) {
        self.access_type = if self.is_global_access {
            AccessType::Global
        } else if self.assigned_store_ids.len() > 1 {
            AccessType::Multiple
        } else {
            AccessType::Single
        };
    }

    pub fn can_access(&self, store_id: StoreId) -> bool {
        self.is_global_access || self.assigned_store_ids.contains(&store_id)
    }

    /// Stores the user may act upon, given the directory's active stores.
    pub fn effective_stores(&self, known_stores: &[Store]) -> Vec<StoreId> {
        if self.is_global_access {
            known_stores.iter().map(|s| s.id).collect()
        } else {
            self.assigned_store_ids.iter().copied().collect()
        }
    }
}

/// Per-(user, store) permission grant. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStoreAssignment {
    pub user_id: UserId,
    pub store_id: StoreId,
    pub permissions: PermissionSet,
    pub assigned_by: Option<UserId>,
    pub assigned_at: DateTime<Utc>,
}
