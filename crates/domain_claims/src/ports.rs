//! Claims Domain Ports
//!
//! The `ClaimStore` trait is everything the pipeline needs from persistence.
//! Adapters live in `infra_db`:
//!
//! - **In-memory adapter**: the default backend, state lost on restart
//! - **PostgreSQL adapter**: claims stored as JSONB documents
//! - **Mock adapter**: this module, for tests without `infra_db`
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_claims::ports::ClaimStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn ClaimStore> = Arc::new(InMemoryClaimStore::new());
//! let processor = ClaimProcessor::new(store, &PipelineSettings::default());
//! ```

use async_trait::async_trait;

use core_kernel::{ClaimId, DomainPort, HealthCheckable, PortError};

use crate::claim::{Claim, ClaimStatus};

/// Filter for listing claims
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    /// Only claims in this status
    pub status: Option<ClaimStatus>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Number of results to skip
    pub offset: Option<usize>,
}

impl ClaimQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: ClaimStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Returns true if the claim passes the status filter
    pub fn matches(&self, claim: &Claim) -> bool {
        self.status.map_or(true, |s| claim.status == s)
    }

    /// Applies offset and limit to results already in order
    pub fn paginate(&self, claims: Vec<Claim>) -> Vec<Claim> {
        claims
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Persistence port for claims
///
/// Listing returns claims newest first.
#[async_trait]
pub trait ClaimStore: DomainPort + HealthCheckable {
    /// Retrieves a claim, or `PortError::NotFound`
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Inserts or replaces a claim
    async fn save_claim(&self, claim: &Claim) -> Result<(), PortError>;

    /// Replaces a stored claim only if its version is still `expected_version`
    ///
    /// Fails with `PortError::Conflict` when another writer got there first,
    /// or `PortError::NotFound` when the claim was deleted in the meantime.
    async fn update_claim(&self, claim: &Claim, expected_version: u32) -> Result<(), PortError>;

    /// Lists claims matching the query
    async fn list_claims(&self, query: ClaimQuery) -> Result<Vec<Claim>, PortError>;

    /// Deletes a claim, or `PortError::NotFound`
    async fn delete_claim(&self, id: ClaimId) -> Result<(), PortError>;
}

/// Convenience methods over any claim store
#[async_trait]
pub trait ClaimStoreExt: ClaimStore {
    /// Returns true if a claim with this id exists
    async fn exists(&self, id: ClaimId) -> Result<bool, PortError> {
        match self.get_claim(id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<T: ClaimStore + ?Sized> ClaimStoreExt for T {}

/// Mock implementation of ClaimStore for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory mock store that can be switched to fail writes
    #[derive(Debug, Default)]
    pub struct MockClaimStore {
        claims: Arc<RwLock<HashMap<ClaimId, Claim>>>,
        fail_saves: AtomicBool,
    }

    impl MockClaimStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with claims for testing
        pub async fn with_claims(claims: Vec<Claim>) -> Self {
            let store = Self::new();
            for claim in claims {
                store.claims.write().await.insert(claim.id, claim);
            }
            store
        }

        /// Makes every following save fail with a connection error
        pub fn fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }

        pub async fn len(&self) -> usize {
            self.claims.read().await.len()
        }
    }

    impl DomainPort for MockClaimStore {}

    #[async_trait]
    impl HealthCheckable for MockClaimStore {
        async fn health_check(&self) -> HealthCheckResult {
            if self.fail_saves.load(Ordering::SeqCst) {
                HealthCheckResult::unhealthy("mock-claim-store", "saves disabled")
            } else {
                HealthCheckResult::healthy("mock-claim-store", 0)
            }
        }
    }

    #[async_trait]
    impl ClaimStore for MockClaimStore {
        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.claims
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn save_claim(&self, claim: &Claim) -> Result<(), PortError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock store unavailable"));
            }
            self.claims.write().await.insert(claim.id, claim.clone());
            Ok(())
        }

        async fn update_claim(&self, claim: &Claim, expected_version: u32) -> Result<(), PortError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock store unavailable"));
            }
            let mut claims = self.claims.write().await;
            match claims.get(&claim.id) {
                None => Err(PortError::not_found("Claim", claim.id)),
                Some(stored) if stored.version != expected_version => Err(PortError::conflict(
                    format!("claim {} is at version {}", claim.id, stored.version),
                )),
                Some(_) => {
                    claims.insert(claim.id, claim.clone());
                    Ok(())
                }
            }
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
            self.claims
                .write()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Claim", id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockClaimStore;
    use super::*;
    use crate::document::DocumentUpload;
    use chrono::Utc;

    fn claim() -> Claim {
        Claim::open(vec![DocumentUpload::new("a.pdf", Vec::<u8>::new())], Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_mock_round_trip_and_delete() {
        let store = MockClaimStore::new();
        let claim = claim();
        store.save_claim(&claim).await.unwrap();

        assert!(store.exists(claim.id).await.unwrap());
        assert_eq!(store.get_claim(claim.id).await.unwrap().id, claim.id);

        store.delete_claim(claim.id).await.unwrap();
        assert!(!store.exists(claim.id).await.unwrap());
        assert!(store.delete_claim(claim.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let mut rejected = claim();
        rejected.reject("bad scan").unwrap();
        let store = MockClaimStore::with_claims(vec![claim(), rejected.clone()]).await;

        let all = store.list_claims(ClaimQuery::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only = store
            .list_claims(ClaimQuery::with_status(ClaimStatus::Rejected))
            .await
            .unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, rejected.id);
    }

    #[tokio::test]
    async fn test_update_requires_expected_version() {
        let store = MockClaimStore::new();
        let mut claim = claim();
        store.save_claim(&claim).await.unwrap();

        let loaded = claim.version;
        claim.update_status(ClaimStatus::Classifying).unwrap();
        store.update_claim(&claim, loaded).await.unwrap();

        let err = store.update_claim(&claim, loaded).await.unwrap_err();
        assert!(err.is_conflict());

        store.delete_claim(claim.id).await.unwrap();
        let err = store.update_claim(&claim, claim.version).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists(claim.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let store = MockClaimStore::new();
        store.fail_saves(true);
        let err = store.save_claim(&claim()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(!store.health_check().await.is_operational());
    }
}
