use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockwise_core::{StoreId, UserId};

use crate::{StoreAccessProfile, UserStoreAssignment};

/// Storage for access profiles and per-store assignments.
///
/// Injected into [`crate::AccessProfileResolver`] so the backend is swappable.
pub trait AccessRepository: Send + Sync {
    fn profile(&self, user_id: UserId) -> Option<StoreAccessProfile>;
    fn save_profile(&self, profile: StoreAccessProfile);

    fn assignment(&self, user_id: UserId, store_id: StoreId) -> Option<UserStoreAssignment>;
    /// Insert or replace the assignment for `(user_id, store_id)`.
    fn save_assignment(&self, assignment: UserStoreAssignment);
    /// Returns whether a row was removed.
    fn delete_assignment(&self, user_id: UserId, store_id: StoreId) -> bool;
    fn assignments_for(&self, user_id: UserId) -> Vec<UserStoreAssignment>;
}

impl<R> AccessRepository for Arc<R>
where
    R: AccessRepository + ?Sized,
{
    fn profile(&self, user_id: UserId) -> Option<StoreAccessProfile> {
        (**self).profile(user_id)
    }

    fn save_profile(&self, profile: StoreAccessProfile) {
        (**self).save_profile(profile)
    }

    fn assignment(&self, user_id: UserId, store_id: StoreId) -> Option<UserStoreAssignment> {
        (**self).assignment(user_id, store_id)
    }

    fn save_assignment(&self, assignment: UserStoreAssignment) {
        (**self).save_assignment(assignment)
    }

    fn delete_assignment(&self, user_id: UserId, store_id: StoreId) -> bool {
        (**self).delete_assignment(user_id, store_id)
    }

    fn assignments_for(&self, user_id: UserId) -> Vec<UserStoreAssignment> {
        (**self).assignments_for(user_id)
    }
}

/// In-memory repository for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccessRepository {
    profiles: RwLock<HashMap<UserId, StoreAccessProfile>>,
    assignments: RwLock<HashMap<(UserId, StoreId), UserStoreAssignment>>,
}

impl InMemoryAccessRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccessRepository for InMemoryAccessRepository {
    fn profile(&self, user_id: UserId) -> Option<StoreAccessProfile> {
        let map = self.profiles.read().ok()?;
        map.get(&user_id).cloned()
    }

    fn save_profile(&self, profile: StoreAccessProfile) {
        if let Ok(mut map) = self.profiles.write() {
            map.insert(profile.user_id, profile);
        }
    }

    fn assignment(&self, user_id: UserId, store_id: StoreId) -> Option<UserStoreAssignment> {
        let map = self.assignments.read().ok()?;
        map.get(&(user_id, store_id)).cloned()
    }

    fn save_assignment(&self, assignment: UserStoreAssignment) {
        if let Ok(mut map) = self.assignments.write() {
            map.insert((assignment.user_id, assignment.store_id), assignment);
        }
    }

    fn delete_assignment(&self, user_id: UserId, store_id: StoreId) -> bool {
        match self.assignments.write() {
            Ok(mut map) => map.remove(&(user_id, store_id)).is_some(),
            Err(_) => false,
        }
    }

    fn assignments_for(&self, user_id: UserId) -> Vec<UserStoreAssignment> {
        let map = match self.assignments.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut rows: Vec<UserStoreAssignment> = map
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.store_id);
        rows
    }
}
