use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Account role. Governs which access tier an account may use.
///
/// `Admin` is the platform operator (cross-tenant visibility);
/// `TenantAdmin` manages one organization; `User` is a regular member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AccountRole {
    Admin,
    TenantAdmin,
    User,
}

impl AccountRole {
    /// Passes the admin tier: platform admins only.
    pub fn is_admin(self) -> bool {
        matches!(self, AccountRole::Admin)
    }

    /// Passes the tenant-admin tier: admins and tenant admins.
    pub fn is_tenant_admin(self) -> bool {
        matches!(self, AccountRole::Admin | AccountRole::TenantAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn string_round_trip() {
        assert_eq!(AccountRole::TenantAdmin.to_string(), "tenantAdmin");
        assert_eq!(
            AccountRole::from_str("tenantAdmin").unwrap(),
            AccountRole::TenantAdmin
        );
        assert_eq!(AccountRole::from_str("user").unwrap(), AccountRole::User);
        assert!(AccountRole::from_str("superuser").is_err());
    }

    #[test]
    fn tier_predicates() {
        assert!(AccountRole::Admin.is_admin());
        assert!(AccountRole::Admin.is_tenant_admin());
        assert!(!AccountRole::TenantAdmin.is_admin());
        assert!(AccountRole::TenantAdmin.is_tenant_admin());
        assert!(!AccountRole::User.is_admin());
        assert!(!AccountRole::User.is_tenant_admin());
    }
}
