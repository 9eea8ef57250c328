use serde::{Deserialize, Serialize};

use crate::Role;

/// Actions gated per store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreAction {
    Create,
    Edit,
    Delete,
    ViewReports,
    ManageStock,
    ManageUsers,
}

impl StoreAction {
    pub const ALL: [StoreAction; 6] = [
        StoreAction::Create,
        StoreAction::Edit,
        StoreAction::Delete,
        StoreAction::ViewReports,
        StoreAction::ManageStock,
        StoreAction::ManageUsers,
    ];

    const fn bit(self) -> u8 {
        match self {
            StoreAction::Create => 1 << 0,
            StoreAction::Edit => 1 << 1,
            StoreAction::Delete => 1 << 2,
            StoreAction::ViewReports => 1 << 3,
            StoreAction::ManageStock => 1 << 4,
            StoreAction::ManageUsers => 1 << 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreAction::Create => "can_create",
            StoreAction::Edit => "can_edit",
            StoreAction::Delete => "can_delete",
            StoreAction::ViewReports => "can_view_reports",
            StoreAction::ManageStock => "can_manage_stock",
            StoreAction::ManageUsers => "can_manage_users",
        }
    }
}

impl core::fmt::Display for StoreAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-store permission bits.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(u8);

impl PermissionSet {
    const MASK: u8 = 0b0011_1111;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::MASK)
    }

    pub fn of(actions: &[StoreAction]) -> Self {
        actions.iter().fold(Self::empty(), |set, a| set.with(*a))
    }

    /// Build from raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, action: StoreAction) -> bool {
        self.0 & action.bit() != 0
    }

    #[must_use]
    pub const fn with(self, action: StoreAction) -> Self {
        Self(self.0 | action.bit())
    }

    #[must_use]
    pub const fn without(self, action: StoreAction) -> Self {
        Self(self.0 & !action.bit())
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn actions(self) -> Vec<StoreAction> {
        StoreAction::ALL
            .into_iter()
            .filter(|a| self.contains(*a))
            .collect()
    }
}

impl core::fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.actions().iter().map(|a| a.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Role → default permission table.
///
/// Used when a store assignment is created without explicit permissions.
pub fn default_permissions(role: Role) -> PermissionSet {
    use StoreAction::*;

    match role {
        Role::Admin => PermissionSet::all(),
        Role::Manager => PermissionSet::of(&[Create, Edit, Delete, ViewReports, ManageStock]),
        Role::Accountant => PermissionSet::of(&[Edit, ViewReports]),
        Role::Salesperson => PermissionSet::of(&[Create, ViewReports]),
        Role::Warehouse => PermissionSet::of(&[Create, Edit, ManageStock]),
        Role::Viewer => PermissionSet::of(&[ViewReports]),
    }
}
