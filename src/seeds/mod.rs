mod default_admin;

use async_trait::async_trait;
use sqlx::PgPool;

/// Outcome of running a seed. Skipped seeds are not recorded so they may run again later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Seed executed and made changes; record in _qa3_seeds.
    Applied,
    /// Seed chose not to run (e.g. env not set); do not record.
    Skipped,
}

/// A database seed. Seeds run in version order and are tracked for idempotency.
///
/// Seed bodies write through `ScopedDb::bypassed` — the application role is
/// subject to row-level security, so a bare pool connection could not insert
/// tenant-owned rows at all.
#[async_trait]
pub trait Seed: Send + Sync {
    /// Unique version identifier (timestamp format: YYYYMMDDHHMMSS).
    fn version(&self) -> i64;

    /// Human-readable description of the seed.
    fn description(&self) -> &str;

    /// Execute the seed. Uses the db layer; no raw SQL.
    /// Return Skipped when the seed opts out (e.g. missing env); it will not be recorded.
    async fn run(&self, pool: &PgPool) -> Result<SeedOutcome, sqlx::Error>;
}

/// All seeds in execution order (sorted by version).
pub fn all_seeds() -> Vec<Box<dyn Seed>> {
    let mut seeds: Vec<Box<dyn Seed>> = vec![Box::new(default_admin::DefaultAdmin)];
    seeds.sort_by_key(|s| s.version());
    seeds
}

/// Run all pending seeds using the given pool.
pub async fn run_seeds(pool: &PgPool) -> Result<(), sqlx::Error> {
    ensure_seeds_table(pool).await?;
    let applied = applied_versions(pool).await?;
    for seed in all_seeds() {
        let version = seed.version();
        let description = seed.description();
        if applied.contains(&version) {
            continue;
        }
        match seed.run(pool).await? {
            SeedOutcome::Applied => {
                tracing::info!(version, description, "seed applied");
                record_seed(pool, version, description).await?;
            }
            SeedOutcome::Skipped => {}
        }
    }
    Ok(())
}

async fn ensure_seeds_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _qa3_seeds (\
            version BIGINT PRIMARY KEY, \
            description TEXT NOT NULL, \
            installed_on TIMESTAMPTZ NOT NULL DEFAULT now()\
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM _qa3_seeds")
        .fetch_all(pool)
        .await
}

async fn record_seed(pool: &PgPool, version: i64, description: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO _qa3_seeds (version, description) VALUES ($1, $2)")
        .bind(version)
        .bind(description)
        .execute(pool)
        .await?;
    Ok(())
}
