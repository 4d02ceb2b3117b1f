use async_trait::async_trait;
use sqlx::PgPool;

use super::{Seed, SeedOutcome};
use crate::app::{db, domain::AccountId, tenant::ScopedDb};

/// Upserts the default organization and its admin account from
/// DEFAULT_ORGANIZATION_ID / DEFAULT_ADMIN_EMAIL. Skipped when either env
/// var is absent, so the seed can run later once they are set.
pub struct DefaultAdmin;

#[async_trait]
impl Seed for DefaultAdmin {
    fn version(&self) -> i64 {
        20260801000000
    }

    fn description(&self) -> &str {
        "default organization and admin account"
    }

    async fn run(&self, pool: &PgPool) -> Result<SeedOutcome, sqlx::Error> {
        let (organization_id, admin_email) = match (
            std::env::var("DEFAULT_ORGANIZATION_ID"),
            std::env::var("DEFAULT_ADMIN_EMAIL"),
        ) {
            (Ok(org), Ok(email)) => (org, email),
            _ => {
                tracing::info!("DEFAULT_ORGANIZATION_ID / DEFAULT_ADMIN_EMAIL not set, skipping");
                return Ok(SeedOutcome::Skipped);
            }
        };

        let scoped = ScopedDb::bypassed(pool.clone());
        let mut tx = scoped.begin().await?;
        db::organizations::upsert(
            &mut *tx,
            &organization_id,
            "Default organization",
            &db::organizations::generate_api_key(),
        )
        .await?;
        db::accounts::upsert_admin(
            &mut *tx,
            &AccountId::new(),
            &admin_email.to_lowercase(),
            &organization_id,
        )
        .await?;
        tx.commit().await?;

        Ok(SeedOutcome::Applied)
    }
}
