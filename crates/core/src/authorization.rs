//! Permissions and the authorization gate.
//!
//! The gate answers one question: does this principal hold this permission? It is used to
//! decide which actions a hosting layer should *offer* for a lab ([`offerable_actions`]) and
//! which ones [`crate::workflow::LabWorkflow`] will accept from a principal. Whether a
//! transition is *legal* is decided by the validator alone, from the lab's state.

use crate::error::LabError;
use crate::lab::{LabAction, LabStatus};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    /// View a single lab request (and edit its content while requested).
    ViewLab,
    /// List lab requests.
    ViewLabs,
    /// Create lab requests.
    RequestLab,
    CompleteLab,
    CancelLab,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewLab => "read:lab",
            Permission::ViewLabs => "read:labs",
            Permission::RequestLab => "write:lab",
            Permission::CompleteLab => "complete:lab",
            Permission::CancelLab => "cancel:lab",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = LabError;

    /// Accepts either the scoped form (`complete:lab`) or the variant name (`CompleteLab`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "read:lab" | "ViewLab" => Ok(Permission::ViewLab),
            "read:labs" | "ViewLabs" => Ok(Permission::ViewLabs),
            "write:lab" | "RequestLab" => Ok(Permission::RequestLab),
            "complete:lab" | "CompleteLab" => Ok(Permission::CompleteLab),
            "cancel:lab" | "CancelLab" => Ok(Permission::CancelLab),
            other => Err(LabError::InvalidInput(format!(
                "unknown permission '{other}'"
            ))),
        }
    }
}

/// The acting user and the permissions they were granted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn new(id: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id: id.into(),
            permissions: permissions.into_iter().collect(),
        }
    }
}

pub trait AuthorizationGate {
    fn has_permission(&self, principal: &Principal, permission: Permission) -> bool;
}

/// Gate that trusts the permissions already attached to the principal.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrantedPermissions;

impl AuthorizationGate for GrantedPermissions {
    fn has_permission(&self, principal: &Principal, permission: Permission) -> bool {
        principal.permissions.contains(&permission)
    }
}

impl<G: AuthorizationGate + ?Sized> AuthorizationGate for &G {
    fn has_permission(&self, principal: &Principal, permission: Permission) -> bool {
        (**self).has_permission(principal, permission)
    }
}

/// The permission a principal needs before `action` is offered or accepted.
pub fn required_permission(action: LabAction) -> Permission {
    match action {
        LabAction::Update => Permission::ViewLab,
        LabAction::Complete => Permission::CompleteLab,
        LabAction::Cancel => Permission::CancelLab,
    }
}

/// Actions a hosting layer should present for a lab in `status`, in display order.
///
/// Terminal labs offer nothing. Otherwise each action is offered when the principal holds
/// its [`required_permission`].
pub fn offerable_actions<G: AuthorizationGate + ?Sized>(
    status: LabStatus,
    principal: &Principal,
    gate: &G,
) -> Vec<LabAction> {
    if status.is_terminal() {
        return Vec::new();
    }

    LabAction::ALL
        .into_iter()
        .filter(|action| gate.has_permission(principal, required_permission(*action)))
        .collect()
}
