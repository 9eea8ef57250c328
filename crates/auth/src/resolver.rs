//! Access profile resolution and idempotent assignment mutations.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use stockwise_core::{Clock, StoreDirectory, StoreId, SystemClock, UserId};

use crate::authorize::{self, AuthorizationExplanation, AuthzError};
use crate::{
    default_permissions, AccessRepository, PermissionSet, Role, StoreAccessProfile, StoreAction,
    UserStoreAssignment,
};

/// The permission check services depend on.
pub trait PermissionGate: Send + Sync {
    fn check(&self, user_id: UserId, store_id: StoreId, action: StoreAction) -> Result<(), AuthzError>;
}

impl<G> PermissionGate for Arc<G>
where
    G: PermissionGate + ?Sized,
{
    fn check(&self, user_id: UserId, store_id: StoreId, action: StoreAction) -> Result<(), AuthzError> {
        (**self).check(user_id, store_id, action)
    }
}

/// Resolves store-access profiles and answers permission questions.
///
/// Mutations (`assign_user_to_store`, `remove_user_from_store`,
/// `set_user_global_access`) are idempotent. Enabling global access leaves
/// per-store assignments in place; they become dormant until it is disabled.
/// Every mutation runs its load-modify-save under one writer lock.
pub struct AccessProfileResolver<R, D> {
    repo: R,
    directory: D,
    clock: Arc<dyn Clock>,
    writer: Mutex<()>,
}

impl<R, D> AccessProfileResolver<R, D>
where
    R: AccessRepository,
    D: StoreDirectory,
{
    pub fn new(repo: R, directory: D) -> Self {
        Self {
            repo,
            directory,
            clock: Arc::new(SystemClock),
            writer: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolve(&self, user_id: UserId) -> Option<StoreAccessProfile> {
        self.repo.profile(user_id)
    }

    /// All active stores when global, otherwise the assigned set.
    pub fn effective_stores(&self, profile: &StoreAccessProfile) -> Vec<StoreId> {
        profile.effective_stores(&self.directory.active_stores())
    }

    pub fn default_permissions(&self, role: Role) -> PermissionSet {
        default_permissions(role)
    }

    pub fn permissions_for(&self, user_id: UserId, store_id: StoreId) -> PermissionSet {
        match self.repo.profile(user_id) {
            Some(profile) => {
                let row = self.repo.assignment(user_id, store_id);
                authorize::effective_permissions(&profile, row.as_ref(), store_id)
            }
            None => PermissionSet::empty(),
        }
    }

    pub fn check(&self, user_id: UserId, store_id: StoreId, action: StoreAction) -> Result<(), AuthzError> {
        let profile = self.repo.profile(user_id);
        let row = self.repo.assignment(user_id, store_id);
        let outcome = authorize::authorize(profile.as_ref(), row.as_ref(), store_id, action);
        if let Err(err) = &outcome {
            debug!(%user_id, %store_id, %action, error = %err, "store access denied");
        }
        outcome
    }

    pub fn authorize(&self, user_id: UserId, store_id: StoreId, action: StoreAction) -> bool {
        self.check(user_id, store_id, action).is_ok()
    }

    pub fn explain(&self, user_id: UserId, store_id: StoreId, action: StoreAction) -> AuthorizationExplanation {
        let profile = self.repo.profile(user_id);
        let row = self.repo.assignment(user_id, store_id);
        authorize::explain_authorization(user_id, profile.as_ref(), row.as_ref(), store_id, action)
    }

    /// Create the user's profile, or update its role if one exists.
    pub fn register_user(&self, user_id: UserId, role: Role) -> StoreAccessProfile {
        let _writer = self.lock_writer();
        let profile = match self.repo.profile(user_id) {
            Some(mut existing) => {
                existing.role = role;
                existing
            }
            None => StoreAccessProfile::new(user_id, role),
        };
        self.repo.save_profile(profile.clone());
        info!(%user_id, %role, "store access profile registered");
        profile
    }

    /// Grant `user_id` access to `store_id`.
    ///
    /// `permissions = None` uses the role default. Re-assigning with the same
    /// bits is a no-op that returns the existing row.
    pub fn assign_user_to_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
        permissions: Option<PermissionSet>,
        assigned_by: Option<UserId>,
    ) -> Result<UserStoreAssignment, AuthzError> {
        let _writer = self.lock_writer();
        let mut profile = self.repo.profile(user_id).ok_or(AuthzError::NoProfile)?;
        let permissions = permissions.unwrap_or_else(|| default_permissions(profile.role));

        if let Some(existing) = self.repo.assignment(user_id, store_id) {
            if existing.permissions == permissions && profile.assigned_store_ids.contains(&store_id) {
                return Ok(existing);
            }
        }

        let row = UserStoreAssignment {
            user_id,
            store_id,
            permissions,
            assigned_by,
            assigned_at: self.clock.now(),
        };
        self.repo.save_assignment(row.clone());

        profile.assigned_store_ids.insert(store_id);
        profile.refresh_access_type();
        self.repo.save_profile(profile);

        info!(%user_id, %store_id, %permissions, "user assigned to store");
        Ok(row)
    }

    /// Revoke every permission on `store_id`. Returns whether anything changed.
    pub fn remove_user_from_store(&self, user_id: UserId, store_id: StoreId) -> bool {
        let _writer = self.lock_writer();
        let removed_row = self.repo.delete_assignment(user_id, store_id);

        let removed_from_profile = match self.repo.profile(user_id) {
            Some(mut profile) => {
                let removed = profile.assigned_store_ids.remove(&store_id);
                if removed {
                    profile.refresh_access_type();
                    self.repo.save_profile(profile);
                }
                removed
            }
            None => false,
        };

        let changed = removed_row || removed_from_profile;
        if changed {
            info!(%user_id, %store_id, "user removed from store");
        }
        changed
    }

    pub fn set_user_global_access(&self, user_id: UserId, enabled: bool) -> Result<StoreAccessProfile, AuthzError> {
        let _writer = self.lock_writer();
        let mut profile = self.repo.profile(user_id).ok_or(AuthzError::NoProfile)?;
        if profile.is_global_access != enabled {
            profile.is_global_access = enabled;
            profile.refresh_access_type();
            self.repo.save_profile(profile.clone());
            info!(%user_id, enabled, "global store access changed");
        }
        Ok(profile)
    }

    /// `assign_user_to_store` on behalf of `actor`, who needs `manage_users` on the store.
    pub fn assign_user_to_store_as(
        &self,
        actor_id: UserId,
        user_id: UserId,
        store_id: StoreId,
        permissions: Option<PermissionSet>,
    ) -> Result<UserStoreAssignment, AuthzError> {
        self.check(actor_id, store_id, StoreAction::ManageUsers)?;
        self.assign_user_to_store(user_id, store_id, permissions, Some(actor_id))
    }

    /// `remove_user_from_store` on behalf of `actor`, who needs `manage_users` on the store.
    pub fn remove_user_from_store_as(
        &self,
        actor_id: UserId,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<bool, AuthzError> {
        self.check(actor_id, store_id, StoreAction::ManageUsers)?;
        Ok(self.remove_user_from_store(user_id, store_id))
    }

    pub fn assignments_for(&self, user_id: UserId) -> Vec<UserStoreAssignment> {
        self.repo.assignments_for(user_id)
    }

    // The lock guards no data, so a panicked holder leaves nothing to repair.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R, D> PermissionGate for AccessProfileResolver<R, D>
where
    R: AccessRepository,
    D: StoreDirectory,
{
    fn check(&self, user_id: UserId, store_id: StoreId, action: StoreAction) -> Result<(), AuthzError> {
        AccessProfileResolver::check(self, user_id, store_id, action)
    }
}
