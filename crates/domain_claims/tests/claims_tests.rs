//! Pipeline tests for domain_claims

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{ClaimId, Currency, Money};

use domain_claims::claim::ClaimStatus;
use domain_claims::document::{DocumentType, DocumentUpload};
use domain_claims::error::ClaimError;
use domain_claims::ports::mock::MockClaimStore;
use domain_claims::ports::{ClaimQuery, ClaimStore};
use domain_claims::service::ClaimProcessor;
use domain_claims::settings::PipelineSettings;

fn processor() -> (Arc<MockClaimStore>, ClaimProcessor) {
    let store = Arc::new(MockClaimStore::new());
    let processor = ClaimProcessor::new(store.clone(), &PipelineSettings::default());
    (store, processor)
}

fn scans() -> Vec<DocumentUpload> {
    vec![
        DocumentUpload::new("病历.pdf", vec![0x25, 0x50, 0x44, 0x46]),
        DocumentUpload::new("发票.jpg", vec![0xff, 0xd8, 0xff]),
    ]
}

// ============================================================================
// Full pipeline
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_scanned_documents_run_end_to_end() {
        let (_store, processor) = processor();
        let claim = processor.upload(scans()).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::Uploaded);

        let classifying = processor.begin_classification(claim.id).await.unwrap();
        assert_eq!(classifying.status, ClaimStatus::Classifying);

        let classified = processor.run_classification(claim.id).await.unwrap();
        assert_eq!(classified.status, ClaimStatus::Extracting);
        let types: Vec<_> = classified
            .documents
            .iter()
            .map(|d| d.document_type)
            .collect();
        assert_eq!(types, vec![Some(DocumentType::MedicalRecord), Some(DocumentType::Invoice)]);
        let results = classified.classification_results.as_ref().unwrap();
        assert!(results.iter().all(|r| r.below_threshold));

        processor.begin_extraction(claim.id).await.unwrap();
        let extracted = processor.run_extraction(claim.id).await.unwrap();
        assert_eq!(extracted.status, ClaimStatus::Evaluating);
        assert_eq!(extracted.insured_person.as_deref(), Some("张三"));
        assert_eq!(extracted.claim_amount, Some(Money::new(dec!(5000), Currency::CNY)));
        assert_eq!(
            extracted.incident_date.map(|d| d.to_string()),
            Some("2023-10-05".to_string())
        );

        let evaluation = processor.evaluate(claim.id, None).await.unwrap();
        assert!(evaluation.coverage_applicable);
        assert_eq!(evaluation.recommended_payout, Money::new(dec!(4500), Currency::CNY));
        assert!(!evaluation.requires_manual_review);

        let stored = processor.get(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Completed);
        assert_eq!(stored.liability_evaluation, Some(evaluation));

        let report = processor.report(claim.id).await.unwrap();
        assert_eq!(report.recommendation, "根据AI评估结果，建议按责任范围进行赔付");
        assert_eq!(report.details.document_count, 2);
    }

    #[tokio::test]
    async fn test_text_upload_is_read_directly() {
        let (_store, processor) = processor();
        let claim = processor
            .upload(vec![DocumentUpload::new(
                "contract.txt",
                "保险合同\n投保人：李四\n被保险人：王五\n保单号：P2023001\n生效日期：2023-01-01",
            )])
            .await
            .unwrap();

        processor.begin_classification(claim.id).await.unwrap();
        let classified = processor.run_classification(claim.id).await.unwrap();
        assert_eq!(
            classified.documents[0].document_type,
            Some(DocumentType::InsuranceContract)
        );

        let extracted = processor.run_extraction(claim.id).await.unwrap();
        assert_eq!(extracted.policy_holder.as_deref(), Some("李四"));
        assert_eq!(extracted.insured_person.as_deref(), Some("王五"));
    }

    #[tokio::test]
    async fn test_evaluation_without_extraction_is_not_covered() {
        let (_store, processor) = processor();
        let claim = processor.upload(scans()).await.unwrap();

        let evaluation = processor.evaluate(claim.id, None).await.unwrap();
        assert!(!evaluation.coverage_applicable);
        assert!(evaluation.recommended_payout.is_zero());
        assert!(evaluation.requires_manual_review);

        let report = processor.report(claim.id).await.unwrap();
        assert_eq!(report.recommendation, "建议拒赔或转人工复核");
    }

    #[tokio::test]
    async fn test_completed_claim_can_be_reevaluated() {
        let (_store, processor) = processor();
        let claim = processor.upload(scans()).await.unwrap();
        processor.evaluate(claim.id, None).await.unwrap();

        let again = processor.evaluate(claim.id, Some("accident_insurance")).await.unwrap();
        assert_eq!(again.product_code, "accident_insurance");
    }
}

// ============================================================================
// Failures
// ============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let (store, processor) = processor();
        let result = processor.upload(vec![]).await;
        assert!(matches!(result, Err(ClaimError::NoDocuments)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_claim() {
        let (_store, processor) = processor();
        let err = processor.get(ClaimId::new()).await.unwrap_err();
        assert!(matches!(err, ClaimError::ClaimNotFound(_)));
        assert!(err.is_not_found());

        let err = processor.begin_classification(ClaimId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_transition_is_reported() {
        let (_store, processor) = processor();
        let claim = processor.upload(scans()).await.unwrap();
        processor.evaluate(claim.id, None).await.unwrap();

        let err = processor.begin_classification(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn test_failed_evaluation_rejects_claim_and_allows_retry() {
        let (store, processor) = processor();
        let claim = processor
            .upload(vec![
                DocumentUpload::new("record.txt", "诊断：骨折"),
                DocumentUpload::new("invoice.txt", "发票金额：$300"),
            ])
            .await
            .unwrap();

        processor.begin_classification(claim.id).await.unwrap();
        processor.run_classification(claim.id).await.unwrap();
        processor.run_extraction(claim.id).await.unwrap();

        let err = processor.evaluate(claim.id, None).await.unwrap_err();
        assert!(matches!(err, ClaimError::Amount(_)));

        let stored = store.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Rejected);
        assert!(stored.rejection_reason.unwrap().starts_with("evaluation failed"));

        let retried = processor.begin_classification(claim.id).await.unwrap();
        assert_eq!(retried.status, ClaimStatus::Classifying);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let (store, processor) = processor();
        let claim = processor.upload(scans()).await.unwrap();

        store.fail_saves(true);
        let err = processor.begin_classification(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::Storage(_)));

        store.fail_saves(false);
        let stored = processor.get(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Uploaded);
    }
}

// ============================================================================
// Listing
// ============================================================================

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_and_delete() {
        let (_store, processor) = processor();
        let first = processor.upload(scans()).await.unwrap();
        let second = processor.upload(scans()).await.unwrap();

        let claims = processor.list(ClaimQuery::all()).await.unwrap();
        assert_eq!(claims.len(), 2);

        processor.delete(first.id).await.unwrap();
        let claims = processor.list(ClaimQuery::all()).await.unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].id, second.id);

        assert!(processor.delete(first.id).await.unwrap_err().is_not_found());
    }
}

// ============================================================================
// Concurrent stages
// ============================================================================

mod concurrency_tests {
    use super::*;

    use async_trait::async_trait;
    use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};
    use tokio::sync::Mutex;

    /// What another writer does right after a stage has loaded its claim
    enum Interleave {
        Delete,
        Reject(&'static str),
    }

    /// Mock store that lets one interleaved write land after the next read
    #[derive(Default)]
    struct InterleavingStore {
        inner: MockClaimStore,
        pending: Mutex<Option<Interleave>>,
    }

    impl InterleavingStore {
        async fn after_next_read(&self, action: Interleave) {
            *self.pending.lock().await = Some(action);
        }
    }

    impl DomainPort for InterleavingStore {}

    #[async_trait]
    impl HealthCheckable for InterleavingStore {
        async fn health_check(&self) -> HealthCheckResult {
            self.inner.health_check().await
        }
    }

    #[async_trait]
    impl ClaimStore for InterleavingStore {
        async fn get_claim(&self, id: ClaimId) -> Result<domain_claims::Claim, PortError> {
            let claim = self.inner.get_claim(id).await?;
            match self.pending.lock().await.take() {
                Some(Interleave::Delete) => self.inner.delete_claim(id).await?,
                Some(Interleave::Reject(reason)) => {
                    let mut other = claim.clone();
                    other.reject(reason).map_err(|e| PortError::internal(e.to_string()))?;
                    self.inner.save_claim(&other).await?;
                }
                None => {}
            }
            Ok(claim)
        }

        async fn save_claim(&self, claim: &domain_claims::Claim) -> Result<(), PortError> {
            self.inner.save_claim(claim).await
        }

        async fn update_claim(
            &self,
            claim: &domain_claims::Claim,
            expected_version: u32,
        ) -> Result<(), PortError> {
            self.inner.update_claim(claim, expected_version).await
        }

        async fn list_claims(&self, query: ClaimQuery) -> Result<Vec<domain_claims::Claim>, PortError> {
            self.inner.list_claims(query).await
        }

        async fn delete_claim(&self, id: ClaimId) -> Result<(), PortError> {
            self.inner.delete_claim(id).await
        }
    }

    fn interleaving_processor() -> (Arc<InterleavingStore>, ClaimProcessor) {
        let store = Arc::new(InterleavingStore::default());
        let processor = ClaimProcessor::new(store.clone(), &PipelineSettings::default());
        (store, processor)
    }

    #[tokio::test]
    async fn test_extraction_waits_for_classification() {
        let (store, processor) = processor();
        let claim = processor.upload(scans()).await.unwrap();
        processor.begin_classification(claim.id).await.unwrap();

        let err = processor.begin_extraction(claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::StageInProgress { .. }));
        assert!(err.is_conflict());
        assert_eq!(store.get_claim(claim.id).await.unwrap().status, ClaimStatus::Classifying);

        let classified = processor.run_classification(claim.id).await.unwrap();
        assert_eq!(classified.status, ClaimStatus::Extracting);
        assert!(classified.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_delete_during_stage_is_not_undone() {
        let (store, processor) = interleaving_processor();
        let claim = processor.upload(scans()).await.unwrap();
        processor.begin_classification(claim.id).await.unwrap();

        store.after_next_read(Interleave::Delete).await;
        let err = processor.run_classification(claim.id).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.inner.len().await, 0);
    }

    #[tokio::test]
    async fn test_stale_stage_leaves_newer_write_in_place() {
        let (store, processor) = interleaving_processor();
        let claim = processor.upload(scans()).await.unwrap();
        processor.begin_classification(claim.id).await.unwrap();
        processor.run_classification(claim.id).await.unwrap();

        store.after_next_read(Interleave::Reject("withdrawn by claimant")).await;
        let err = processor.run_extraction(claim.id).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Rejected);
        assert_eq!(stored.rejection_reason.as_deref(), Some("withdrawn by claimant"));
        assert!(stored.extraction_results.is_none());
    }
}
