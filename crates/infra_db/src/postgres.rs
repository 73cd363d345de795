//! PostgreSQL claim store
//!
//! Each claim is stored as one JSONB document in `claim_cases`. The status and
//! timestamps are duplicated into plain columns so listing can filter and sort
//! without touching the document.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimStore};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let store: Arc<dyn ClaimStore> = Arc::new(PostgresClaimStore::new(pool));
//! ```

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::ports::{ClaimQuery, ClaimStore};
use domain_claims::Claim;

use crate::error::DatabaseError;

const UPSERT_CLAIM: &str = r#"
    INSERT INTO claim_cases (claim_id, claim_number, status, document, created_at, updated_at, version)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (claim_id) DO UPDATE SET
        status = EXCLUDED.status,
        document = EXCLUDED.document,
        updated_at = EXCLUDED.updated_at,
        version = EXCLUDED.version
"#;

const UPDATE_CLAIM_IF_VERSION: &str = r#"
    UPDATE claim_cases
    SET status = $2, document = $3, updated_at = $4, version = $5
    WHERE claim_id = $1 AND version = $6
"#;

const CLAIM_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM claim_cases WHERE claim_id = $1)";

const SELECT_CLAIM: &str = "SELECT document FROM claim_cases WHERE claim_id = $1";

const LIST_CLAIMS: &str = r#"
    SELECT document
    FROM claim_cases
    WHERE ($1::TEXT IS NULL OR status = $1)
    ORDER BY created_at DESC, claim_id DESC
    LIMIT $2 OFFSET $3
"#;

const DELETE_CLAIM: &str = "DELETE FROM claim_cases WHERE claim_id = $1";

/// PostgreSQL-backed implementation of the ClaimStore port
///
/// Database errors are translated to `PortError` through `DatabaseError`.
#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    pool: PgPool,
}

impl PostgresClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-claim-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-claim-store",
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row: Option<(Json<Claim>,)> = sqlx::query_as(SELECT_CLAIM)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        row.map(|(Json(claim),)| claim)
            .ok_or_else(|| DatabaseError::not_found("Claim", id).into())
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id, status = %claim.status))]
    async fn save_claim(&self, claim: &Claim) -> Result<(), PortError> {
        sqlx::query(UPSERT_CLAIM)
            .bind(claim.id.as_uuid())
            .bind(&claim.claim_number)
            .bind(claim.status.as_str())
            .bind(Json(claim))
            .bind(claim.created_at)
            .bind(claim.updated_at)
            .bind(claim.version as i32)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        debug!("Claim saved");
        Ok(())
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id, status = %claim.status))]
    async fn update_claim(&self, claim: &Claim, expected_version: u32) -> Result<(), PortError> {
        let result = sqlx::query(UPDATE_CLAIM_IF_VERSION)
            .bind(claim.id.as_uuid())
            .bind(claim.status.as_str())
            .bind(Json(claim))
            .bind(claim.updated_at)
            .bind(claim.version as i32)
            .bind(expected_version as i32)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            debug!("Claim updated");
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar(CLAIM_EXISTS)
            .bind(claim.id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if exists {
            Err(DatabaseError::Conflict(format!(
                "claim {} is no longer at version {}",
                claim.id, expected_version
            ))
            .into())
        } else {
            Err(DatabaseError::not_found("Claim", claim.id).into())
        }
    }

    #[instrument(skip(self))]
    async fn list_claims(&self, query: ClaimQuery) -> Result<Vec<Claim>, PortError> {
        let rows: Vec<(Json<Claim>,)> = sqlx::query_as(LIST_CLAIMS)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.limit.map(|l| l as i64))
            .bind(query.offset.unwrap_or(0) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(|(Json(claim),)| claim).collect())
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn delete_claim(&self, id: ClaimId) -> Result<(), PortError> {
        let result = sqlx::query(DELETE_CLAIM)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", id).into());
        }
        Ok(())
    }
}
