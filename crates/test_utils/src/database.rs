//! Claim Store Test Utilities
//!
//! In-memory stores for most tests, and an opt-in PostgreSQL store for
//! integration tests. The PostgreSQL helpers return `None` unless
//! `TEST_DATABASE_URL` is set, so suites skip cleanly without a database.

use std::sync::Arc;

use sqlx::PgPool;

use domain_claims::{Claim, ClaimStore};
use infra_db::{create_pool, run_migrations, DatabaseConfig, InMemoryClaimStore, PostgresClaimStore};

/// Environment variable naming the test database
pub const TEST_DATABASE_URL_VAR: &str = "TEST_DATABASE_URL";

/// Returns an empty in-memory store
pub fn memory_store() -> Arc<InMemoryClaimStore> {
    Arc::new(InMemoryClaimStore::new())
}

/// Returns an in-memory store holding `claims`
///
/// # Panics
///
/// Panics if a claim cannot be saved
pub async fn seeded_memory_store(claims: &[Claim]) -> Arc<InMemoryClaimStore> {
    let store = memory_store();
    for claim in claims {
        store.save_claim(claim).await.expect("failed to seed claim");
    }
    store
}

/// Connects to the test database, migrates it and empties `claim_cases`
///
/// Returns `None` when `TEST_DATABASE_URL` is unset.
///
/// # Panics
///
/// Panics if the variable is set but the database cannot be prepared
pub async fn postgres_test_pool() -> Option<PgPool> {
    let url = std::env::var(TEST_DATABASE_URL_VAR).ok()?;

    let pool = create_pool(DatabaseConfig::new(url).max_connections(5))
        .await
        .expect("failed to connect to test database");
    run_migrations(&pool)
        .await
        .expect("failed to migrate test database");
    sqlx::query("TRUNCATE claim_cases")
        .execute(&pool)
        .await
        .expect("failed to clean claim_cases");

    Some(pool)
}

/// PostgreSQL claim store on a clean test database, if one is configured
pub async fn postgres_test_store() -> Option<PostgresClaimStore> {
    postgres_test_pool().await.map(PostgresClaimStore::new)
}
