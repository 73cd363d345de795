//! In-memory claim store
//!
//! The default backend. Claims live in a `HashMap` behind a tokio `RwLock`
//! and are lost when the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::ports::{ClaimQuery, ClaimStore};
use domain_claims::Claim;

#[derive(Debug, Clone, Default)]
pub struct InMemoryClaimStore {
    claims: Arc<RwLock<HashMap<ClaimId, Claim>>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored claims
    pub async fn len(&self) -> usize {
        self.claims.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.claims.read().await.is_empty()
    }
}

impl DomainPort for InMemoryClaimStore {}

#[async_trait]
impl HealthCheckable for InMemoryClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-claim-store", 0)
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        self.claims
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Claim", id))
    }

    async fn save_claim(&self, claim: &Claim) -> Result<(), PortError> {
        debug!(claim_id = %claim.id, status = %claim.status, "Saving claim");
        self.claims.write().await.insert(claim.id, claim.clone());
        Ok(())
    }

    async fn update_claim(&self, claim: &Claim, expected_version: u32) -> Result<(), PortError> {
        let mut claims = self.claims.write().await;
        let stored = claims
            .get_mut(&claim.id)
            .ok_or_else(|| PortError::not_found("Claim", claim.id))?;

        if stored.version != expected_version {
            debug!(claim_id = %claim.id, expected_version, stored_version = stored.version, "Stale claim update");
            return Err(PortError::conflict(format!(
                "claim {} was modified concurrently",
                claim.id
            )));
        }
        *stored = claim.clone();
        Ok(())
    }

    async fn list_claims(&self, query: ClaimQuery) -> Result<Vec<Claim>, PortError> {
        let mut claims: Vec<Claim> = self
            .claims
            .read()
            .await
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();

        claims.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(query.paginate(claims))
    }

    async fn delete_claim(&self, id: ClaimId) -> Result<(), PortError> {
        match self.claims.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(PortError::not_found("Claim", id)),
        }
    }
}
