//! `stockwise-auth`: store-access profiles and the permission gate.
//!
//! Decides who may mutate stock where. Storage is behind [`AccessRepository`];
//! the decision functions in [`authorize`] are pure.

pub mod authorize;
pub mod permissions;
pub mod profile;
pub mod repository;
pub mod resolver;
pub mod roles;

pub use authorize::{
    authorize, effective_permissions, explain_authorization, AuthorizationExplanation, AuthzError,
    DenialKind,
};
pub use permissions::{default_permissions, PermissionSet, StoreAction};
pub use profile::{AccessType, StoreAccessProfile, UserStoreAssignment};
pub use repository::{AccessRepository, InMemoryAccessRepository};
pub use resolver::{AccessProfileResolver, PermissionGate};
pub use roles::Role;
