//! Claim processing service
//!
//! `ClaimProcessor` drives a claim through the pipeline stages and persists
//! every transition through the `ClaimStore` port. The classification and
//! extraction stages are split into a `begin_*` half, which marks the claim and
//! returns quickly, and a `run_*` half meant for a background task.
//!
//! Every stage writes back with `ClaimStore::update_claim` against the version
//! it loaded. A stage that lost a race to another writer, or whose claim was
//! deleted under it, gives up without touching the stored claim.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::ClaimId;
use crate::claim::Claim;
use crate::claim::ClaimStatus;
use crate::classifier::DocumentClassifier;
use crate::document::DocumentUpload;
use crate::error::ClaimError;
use crate::extractor::KeywordExtractor;
use crate::liability::{LiabilityEvaluation, LiabilityEvaluator};
use crate::ports::{ClaimQuery, ClaimStore};
use crate::report::ClaimReport;
use crate::settings::PipelineSettings;

/// Orchestrates classification, extraction and evaluation of claims
pub struct ClaimProcessor {
    store: Arc<dyn ClaimStore>,
    classifier: DocumentClassifier,
    extractor: KeywordExtractor,
    evaluator: LiabilityEvaluator,
}

impl ClaimProcessor {
    /// Creates a processor with the built-in classifier, extractor and evaluator
    ///
    /// # Arguments
    ///
    /// * `store` - Persistence adapter
    /// * `settings` - Thresholds for the pipeline stages
    pub fn new(store: Arc<dyn ClaimStore>, settings: &PipelineSettings) -> Self {
        Self {
            store,
            classifier: DocumentClassifier::new(settings.classification_threshold),
            extractor: KeywordExtractor::new(settings.extraction_max_fields),
            evaluator: LiabilityEvaluator::new(settings.evaluation_threshold),
        }
    }

    /// Replaces the classifier
    pub fn with_classifier(mut self, classifier: DocumentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces the extractor
    pub fn with_extractor(mut self, extractor: KeywordExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    /// Opens a claim from uploaded files and stores it
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::NoDocuments` when `uploads` is empty
    #[instrument(skip(self, uploads), fields(files = uploads.len()))]
    pub async fn upload(&self, uploads: Vec<DocumentUpload>) -> Result<Claim, ClaimError> {
        let claim = Claim::open(uploads, Utc::now())?;
        self.store.save_claim(&claim).await?;

        info!(
            claim_id = %claim.id,
            claim_number = %claim.claim_number,
            documents = claim.documents.len(),
            "Claim opened"
        );
        Ok(claim)
    }

    /// Retrieves a claim
    pub async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.store.get_claim(id).await.map_err(|e| {
            if e.is_not_found() {
                ClaimError::ClaimNotFound(id.to_string())
            } else {
                ClaimError::Storage(e)
            }
        })
    }

    /// Lists claims, newest first
    pub async fn list(&self, query: ClaimQuery) -> Result<Vec<Claim>, ClaimError> {
        Ok(self.store.list_claims(query).await?)
    }

    /// Deletes a claim
    pub async fn delete(&self, id: ClaimId) -> Result<(), ClaimError> {
        self.get(id).await?;
        self.store.delete_claim(id).await?;
        info!(claim_id = %id, "Claim deleted");
        Ok(())
    }

    /// Marks a claim as being classified
    pub async fn begin_classification(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.transition(id, ClaimStatus::Classifying).await
    }

    /// Classifies every document of a claim and moves it on to extraction
    ///
    /// A failure after the claim was loaded rejects the claim.
    #[instrument(skip(self))]
    pub async fn run_classification(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        let mut claim = self.get(id).await?;
        let loaded = claim.version;
        let results = self.classifier.classify_all(&claim.documents);
        let flagged = results.iter().filter(|r| r.below_threshold).count();

        let outcome = match claim.apply_classification(results) {
            Ok(()) => self.store.update_claim(&claim, loaded).await.map_err(ClaimError::from),
            Err(e) => Err(e),
        };
        self.finish_stage(id, "classification", outcome).await?;

        info!(
            claim_id = %id,
            documents = claim.documents.len(),
            low_confidence = flagged,
            "Documents classified"
        );
        Ok(claim)
    }

    /// Marks a claim as being extracted
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::StageInProgress` while classification is running
    pub async fn begin_extraction(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        let claim = self.get(id).await?;
        if claim.status == ClaimStatus::Classifying {
            return Err(ClaimError::StageInProgress {
                status: claim.status.to_string(),
            });
        }
        self.advance(claim, ClaimStatus::Extracting).await
    }

    /// Extracts fields from every document and moves the claim on to evaluation
    ///
    /// Documents that were never classified are read as medical records.
    #[instrument(skip(self))]
    pub async fn run_extraction(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        let mut claim = self.get(id).await?;
        let loaded = claim.version;
        let results = self.extractor.extract_all(&claim.documents);
        let field_count: usize = results.iter().map(|r| r.extracted_fields.len()).sum();

        let outcome = match claim.apply_extraction(results) {
            Ok(()) => self.store.update_claim(&claim, loaded).await.map_err(ClaimError::from),
            Err(e) => Err(e),
        };
        self.finish_stage(id, "extraction", outcome).await?;

        info!(
            claim_id = %id,
            fields = field_count,
            insured_person = claim.insured_person.as_deref().unwrap_or("-"),
            "Fields extracted"
        );
        Ok(claim)
    }

    /// Evaluates liability and completes the claim
    ///
    /// # Arguments
    ///
    /// * `id` - The claim to evaluate
    /// * `contract_terms` - Free text naming the insured product, if known
    #[instrument(skip(self, contract_terms))]
    pub async fn evaluate(
        &self,
        id: ClaimId,
        contract_terms: Option<&str>,
    ) -> Result<LiabilityEvaluation, ClaimError> {
        let mut claim = self.get(id).await?;
        let loaded = claim.version;
        claim.update_status(ClaimStatus::Evaluating)?;

        let results = claim.extraction_results.clone().unwrap_or_default();
        let outcome = self
            .evaluator
            .evaluate(&results, contract_terms, Utc::now().date_naive());
        let evaluation = self.finish_stage(id, "evaluation", outcome).await?;

        claim.apply_evaluation(evaluation.clone())?;
        self.store.update_claim(&claim, loaded).await?;
        Ok(evaluation)
    }

    /// Builds the processing report of a claim
    pub async fn report(&self, id: ClaimId) -> Result<ClaimReport, ClaimError> {
        let claim = self.get(id).await?;
        Ok(ClaimReport::build(&claim, Utc::now()))
    }

    async fn transition(&self, id: ClaimId, status: ClaimStatus) -> Result<Claim, ClaimError> {
        let claim = self.get(id).await?;
        self.advance(claim, status).await
    }

    async fn advance(&self, mut claim: Claim, status: ClaimStatus) -> Result<Claim, ClaimError> {
        let loaded = claim.version;
        claim.update_status(status)?;
        self.store.update_claim(&claim, loaded).await?;
        info!(claim_id = %claim.id, status = %status, "Claim stage started");
        Ok(claim)
    }

    /// Rejects the claim when a stage failed, then passes the outcome through
    ///
    /// A stage that lost its claim to another writer or to a delete leaves
    /// the stored claim alone.
    async fn finish_stage<T>(
        &self,
        id: ClaimId,
        stage: &str,
        outcome: Result<T, ClaimError>,
    ) -> Result<T, ClaimError> {
        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if error.is_conflict() || error.is_not_found() {
            warn!(claim_id = %id, stage, error = %error, "Claim changed while the stage ran");
            return Err(error);
        }

        warn!(claim_id = %id, stage, error = %error, "Claim stage failed");
        let reason = format!("{} failed: {}", stage, error);
        match self.store.get_claim(id).await {
            Ok(mut stored) => {
                let loaded = stored.version;
                if stored.reject(reason).is_ok() {
                    if let Err(e) = self.store.update_claim(&stored, loaded).await {
                        warn!(claim_id = %id, error = %e, "Could not persist rejection");
                    }
                }
            }
            Err(e) => warn!(claim_id = %id, error = %e, "Could not load claim to reject it"),
        }
        Err(error)
    }
}
