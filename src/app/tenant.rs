//! Tenant isolation enforcement.
//!
//! All tenant-owned tables are protected by Postgres row-level security
//! keyed on two transaction-scoped settings: `app.current_tenant_id` and
//! `app.bypass_rls`. Connections come from a shared pool, so the settings
//! must be (re)installed at the start of every transaction — a connection
//! reused across tenants carries nothing over, because `set_config(..., true)`
//! dies with the transaction that set it.
//!
//! **Rule**: SQL touching guarded tables only ever runs through a
//! [`ScopedDb`]. There is no way to get a connection out of it without the
//! scope settings applied first.

use sqlx::{PgPool, Postgres, Transaction};

use crate::app::domain::OrganizationId;

/// Setting consulted by the tenant-isolation policies.
pub const CURRENT_TENANT_SETTING: &str = "app.current_tenant_id";

/// Setting consulted by the bypass policies.
pub const BYPASS_SETTING: &str = "app.bypass_rls";

/// Sentinel installed as the tenant id when bypassing: never a valid ULID,
/// so the isolation policy can never match it.
pub const INVALID_TENANT_SENTINEL: &str = "-1";

/// Which rows a database handle may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// Rows of exactly one organization. Bypass is forced off.
    Guarded(OrganizationId),
    /// All rows. The tenant id is pinned to an invalid sentinel so only the
    /// bypass policy can match.
    Bypassed,
}

impl TenantScope {
    /// The `(setting, value)` pairs to install, in application order:
    /// tenant id first, then the bypass flag.
    pub fn settings(&self) -> [(&'static str, String); 2] {
        match self {
            TenantScope::Guarded(org) => [
                (CURRENT_TENANT_SETTING, org.as_str()),
                (BYPASS_SETTING, "off".to_string()),
            ],
            TenantScope::Bypassed => [
                (CURRENT_TENANT_SETTING, INVALID_TENANT_SENTINEL.to_string()),
                (BYPASS_SETTING, "on".to_string()),
            ],
        }
    }
}

/// Errors specific to the scoped executor.
#[derive(Debug)]
pub enum TenantDbError {
    Sqlx(sqlx::Error),
    /// Sequential (statement-list) transactions are refused: there is no
    /// hook to install the scope settings ahead of each sub-operation, and
    /// running them unscoped would silently leak across tenants.
    SequentialTransaction,
}

impl std::fmt::Display for TenantDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantDbError::Sqlx(e) => write!(f, "database error: {e}"),
            TenantDbError::SequentialTransaction => write!(
                f,
                "sequential (batch) transactions are not supported by the tenant guard; \
                 use an interactive transaction via ScopedDb::begin"
            ),
        }
    }
}

impl std::error::Error for TenantDbError {}

impl From<sqlx::Error> for TenantDbError {
    fn from(e: sqlx::Error) -> Self {
        TenantDbError::Sqlx(e)
    }
}

/// A database handle bound to one [`TenantScope`].
///
/// Single queries and interactive multi-statement transactions share the
/// same surface: `begin()` opens a transaction, installs the scope settings
/// on its connection, and hands the transaction back. Callers issue their
/// operations and `commit()`. Nothing here ever opens a transaction inside
/// another one — nested `BEGIN` would break rollback semantics.
#[derive(Clone)]
pub struct ScopedDb {
    pool: PgPool,
    scope: TenantScope,
}

impl ScopedDb {
    /// Handle restricted to one organization's rows.
    pub fn guarded(pool: PgPool, organization: OrganizationId) -> Self {
        Self {
            pool,
            scope: TenantScope::Guarded(organization),
        }
    }

    /// Handle with tenant filtering disabled. Used for pre-login lookups
    /// (sessions, account-by-email) and platform-admin operations.
    pub fn bypassed(pool: PgPool) -> Self {
        Self {
            pool,
            scope: TenantScope::Bypassed,
        }
    }

    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    /// Open a transaction with the scope settings installed.
    ///
    /// The two `set_config` statements run first, in order, on the same
    /// connection the caller's operations will use. Both are
    /// transaction-local, so the next transaction on this pooled connection
    /// starts clean no matter what scope it belongs to.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for (setting, value) in self.scope.settings() {
            sqlx::query("SELECT set_config($1, $2, true)")
                .bind(setting)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        Ok(tx)
    }

    /// Sequential statement lists are refused outright. Scope settings can
    /// only be installed by a statement running ahead of each operation,
    /// which a batch gives no hook for.
    pub fn batch(&self, _statements: &[&str]) -> Result<(), TenantDbError> {
        Err(TenantDbError::SequentialTransaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_settings_in_order() {
        let org = OrganizationId::new();
        let scope = TenantScope::Guarded(org.clone());
        let settings = scope.settings();
        assert_eq!(settings[0], (CURRENT_TENANT_SETTING, org.as_str()));
        assert_eq!(settings[1], (BYPASS_SETTING, "off".to_string()));
    }

    #[test]
    fn bypassed_settings_pin_invalid_tenant() {
        let settings = TenantScope::Bypassed.settings();
        assert_eq!(
            settings[0],
            (CURRENT_TENANT_SETTING, INVALID_TENANT_SENTINEL.to_string())
        );
        assert_eq!(settings[1], (BYPASS_SETTING, "on".to_string()));
    }

    #[test]
    fn sentinel_is_not_a_ulid() {
        assert!(OrganizationId::from_string(INVALID_TENANT_SENTINEL).is_err());
    }

    #[tokio::test]
    async fn batch_is_refused() {
        // connect_lazy never touches the network; the refusal is unconditional
        let pool = PgPool::connect_lazy("postgres://unused@localhost/unused").unwrap();
        let db = ScopedDb::bypassed(pool);
        let err = db.batch(&["SELECT 1", "SELECT 2"]).unwrap_err();
        assert!(matches!(err, TenantDbError::SequentialTransaction));
        assert!(err.to_string().contains("not supported"));
    }
}
