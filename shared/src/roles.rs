//! Role vocabulary and the reconciliation rule between coarse and fine roles.
//!
//! A fine role of `sub_admin` always carries the coarse role `admin`. Every
//! profile write takes its roles from a [`RoleAssignment`], which is only
//! constructed through [`RoleAssignment::reconcile`].

pub const ADMIN: &str = "admin";
pub const USER: &str = "user";

pub const SUB_ADMIN: &str = "sub_admin";
pub const RESEARCHER: &str = "researcher";

/// Treat blank strings the same as a missing field.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Coarse role to assign for the requested pair.
pub fn effective_role(requested_role: Option<&str>, requested_wbl_role: Option<&str>) -> String {
    if present(requested_wbl_role) == Some(SUB_ADMIN) {
        return ADMIN.to_string();
    }
    present(requested_role).unwrap_or(USER).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    role: String,
    wbl_role: String,
}

impl RoleAssignment {
    /// Fine role defaults to `researcher` when none is requested.
    pub fn reconcile(requested_role: Option<&str>, requested_wbl_role: Option<&str>) -> Self {
        Self {
            role: effective_role(requested_role, requested_wbl_role),
            wbl_role: present(requested_wbl_role).unwrap_or(RESEARCHER).to_string(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn wbl_role(&self) -> &str {
        &self.wbl_role
    }
}
