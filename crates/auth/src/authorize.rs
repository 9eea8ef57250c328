use serde::Serialize;
use thiserror::Error;

use stockwise_core::{StoreId, UserId};

use crate::{default_permissions, PermissionSet, StoreAccessProfile, StoreAction, UserStoreAssignment};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user has no store access profile")]
    NoProfile,

    #[error("store {store_id} is not assigned to the user")]
    StoreNotAssigned { store_id: StoreId },

    #[error("forbidden: missing permission '{action}' on store {store_id}")]
    Forbidden { store_id: StoreId, action: StoreAction },
}

/// Permission bits the profile holds on `store_id`.
///
/// - Global profiles hold every bit.
/// - Otherwise the store must be assigned; the assignment row's bits apply, and
///   a store listed on the profile without a row falls back to the role default.
pub fn effective_permissions(
    profile: &StoreAccessProfile,
    assignment: Option<&UserStoreAssignment>,
    store_id: StoreId,
) -> PermissionSet {
    if profile.is_global_access {
        return PermissionSet::all();
    }
    if !profile.assigned_store_ids.contains(&store_id) {
        return PermissionSet::empty();
    }
    match assignment {
        Some(a) if a.store_id == store_id && a.user_id == profile.user_id => a.permissions,
        _ => default_permissions(profile.role),
    }
}

/// Pure permission gate.
///
/// Denied when the user has no profile, or the profile is not global and the
/// store is outside its assigned set, or the bit for `action` is unset.
pub fn authorize(
    profile: Option<&StoreAccessProfile>,
    assignment: Option<&UserStoreAssignment>,
    store_id: StoreId,
    action: StoreAction,
) -> Result<(), AuthzError> {
    let Some(profile) = profile else {
        return Err(AuthzError::NoProfile);
    };

    if profile.is_global_access {
        return Ok(());
    }

    if !profile.assigned_store_ids.contains(&store_id) {
        return Err(AuthzError::StoreNotAssigned { store_id });
    }

    if effective_permissions(profile, assignment, store_id).contains(action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { store_id, action })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoProfile,
    StoreNotAssigned,
    MissingPermission,
}

/// Why a request was (or would be) allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub user_id: UserId,
    pub store_id: StoreId,
    pub action: StoreAction,
    pub granted: bool,
    pub reason: String,
    pub effective_permissions: Vec<StoreAction>,
    pub denial: Option<DenialKind>,
    pub suggestions: Vec<String>,
}

pub fn explain_authorization(
    user_id: UserId,
    profile: Option<&StoreAccessProfile>,
    assignment: Option<&UserStoreAssignment>,
    store_id: StoreId,
    action: StoreAction,
) -> AuthorizationExplanation {
    let Some(profile) = profile else {
        return AuthorizationExplanation {
            user_id,
            store_id,
            action,
            granted: false,
            reason: format!("User {user_id} has no store access profile"),
            effective_permissions: vec![],
            denial: Some(DenialKind::NoProfile),
            suggestions: vec!["Register the user with a role before assigning stores".to_string()],
        };
    };

    let effective = effective_permissions(profile, assignment, store_id);
    let granted = authorize(Some(profile), assignment, store_id, action).is_ok();

    let (reason, denial, suggestions) = if profile.is_global_access {
        (
            format!("Global access ({}) grants every action on every store", profile.role),
            None,
            vec![],
        )
    } else if !profile.assigned_store_ids.contains(&store_id) {
        (
            format!("Store {store_id} is not among the user's assigned stores"),
            Some(DenialKind::StoreNotAssigned),
            vec![
                format!("Assign the user to store {store_id}"),
                "Enable global access for the user".to_string(),
            ],
        )
    } else if granted {
        let source = if assignment.is_some() {
            "store assignment"
        } else {
            "role default"
        };
        (format!("'{action}' is granted by the {source}"), None, vec![])
    } else {
        (
            format!("'{action}' is not set on store {store_id}; current permissions: {effective}"),
            Some(DenialKind::MissingPermission),
            vec![format!("Grant '{action}' on the store assignment")],
        )
    };

    AuthorizationExplanation {
        user_id,
        store_id,
        action,
        granted,
        reason,
        effective_permissions: effective.actions(),
        denial,
        suggestions,
    }
}
