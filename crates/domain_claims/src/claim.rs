//! Claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClaimId, Money};
use crate::classifier::ClassificationResult;
use crate::document::{ClaimDocument, DocumentUpload};
use crate::error::ClaimError;
use crate::extractor::{self, ExtractionResult};
use crate::liability::LiabilityEvaluation;

/// Claim processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Documents received
    Uploaded,
    /// Documents being classified
    Classifying,
    /// Fields being extracted
    Extracting,
    /// Liability being evaluated
    Evaluating,
    /// Evaluation stored
    Completed,
    /// A processing stage failed
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Uploaded => "uploaded",
            ClaimStatus::Classifying => "classifying",
            ClaimStatus::Extracting => "extracting",
            ClaimStatus::Evaluating => "evaluating",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Rejected => "rejected",
        }
    }

    /// Parses the snake_case form used in storage
    pub fn parse(s: &str) -> Option<ClaimStatus> {
        use ClaimStatus::*;
        [Uploaded, Classifying, Extracting, Evaluating, Completed, Rejected]
            .into_iter()
            .find(|status| status.as_str() == s)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An insurance claim and the evidence attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Human-readable claim number
    pub claim_number: String,
    /// Status
    pub status: ClaimStatus,
    /// Uploaded documents in upload order
    pub documents: Vec<ClaimDocument>,
    /// 投保人
    pub policy_holder: Option<String>,
    /// 被保险人
    pub insured_person: Option<String>,
    /// 出险日期
    pub incident_date: Option<NaiveDate>,
    /// 索赔金额
    pub claim_amount: Option<Money>,
    pub classification_results: Option<Vec<ClassificationResult>>,
    pub extraction_results: Option<Vec<ExtractionResult>>,
    pub liability_evaluation: Option<LiabilityEvaluation>,
    /// Why the claim was rejected, when a stage failed
    pub rejection_reason: Option<String>,
    /// Bumped on every status change; stores use it to detect lost updates
    #[serde(default = "initial_version")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Opens a claim from uploaded files
    pub fn open(uploads: Vec<DocumentUpload>, now: DateTime<Utc>) -> Result<Self, ClaimError> {
        if uploads.is_empty() {
            return Err(ClaimError::NoDocuments);
        }

        let id = ClaimId::new_v7();
        let documents = uploads
            .into_iter()
            .map(|upload| ClaimDocument::from_upload(id, upload, now))
            .collect();

        Ok(Self {
            id,
            claim_number: generate_claim_number(id, now),
            status: ClaimStatus::Uploaded,
            documents,
            policy_holder: None,
            insured_person: None,
            incident_date: None,
            claim_amount: None,
            classification_results: None,
            extraction_results: None,
            liability_evaluation: None,
            rejection_reason: None,
            version: initial_version(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Updates the status
    pub fn update_status(&mut self, status: ClaimStatus) -> Result<(), ClaimError> {
        if !self.can_transition_to(status) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.version += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the claim as rejected after a failed stage
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), ClaimError> {
        self.update_status(ClaimStatus::Rejected)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }

    /// Records classification output and moves the claim on to extraction
    pub fn apply_classification(
        &mut self,
        results: Vec<ClassificationResult>,
    ) -> Result<(), ClaimError> {
        self.update_status(ClaimStatus::Extracting)?;
        for (document, result) in self.documents.iter_mut().zip(&results) {
            document.document_type = Some(result.predicted_type);
            document.classification_confidence = Some(result.confidence);
        }
        self.classification_results = Some(results);
        Ok(())
    }

    /// Records extraction output, fills claim-level hints, and moves on to evaluation
    pub fn apply_extraction(&mut self, results: Vec<ExtractionResult>) -> Result<(), ClaimError> {
        self.update_status(ClaimStatus::Evaluating)?;
        let merged = extractor::merge_fields(&results);

        let lookup = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| merged.get(*name).map(|f| f.field_value.clone()))
        };

        if let Some(person) = lookup(&["insured_person", "patient_name", "name"]) {
            self.insured_person = Some(person);
        }
        if let Some(holder) = lookup(&["policy_holder", "account_holder"]) {
            self.policy_holder = Some(holder);
        }
        if let Some(date) = lookup(&["accident_date", "admission_date"])
            .and_then(|v| extractor::parse_date(&v))
        {
            self.incident_date = Some(date);
        }
        if let Some(amount) = lookup(&["invoice_amount"]).and_then(|v| extractor::parse_amount(&v)) {
            self.claim_amount = Some(amount);
        }

        self.extraction_results = Some(results);
        Ok(())
    }

    /// Stores a liability evaluation and completes the claim
    pub fn apply_evaluation(&mut self, evaluation: LiabilityEvaluation) -> Result<(), ClaimError> {
        self.update_status(ClaimStatus::Completed)?;
        self.liability_evaluation = Some(evaluation);
        Ok(())
    }

    /// Checks if transition is valid
    fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self.status, target),
            (Uploaded, Classifying) |
            (Uploaded, Extracting) |
            (Uploaded, Evaluating) |
            (Uploaded, Rejected) |
            (Classifying, Extracting) |
            (Classifying, Rejected) |
            (Extracting, Classifying) |
            (Extracting, Extracting) |
            (Extracting, Evaluating) |
            (Extracting, Rejected) |
            (Evaluating, Evaluating) |
            (Evaluating, Completed) |
            (Evaluating, Rejected) |
            (Completed, Evaluating) |
            (Rejected, Classifying)
        )
    }
}

fn initial_version() -> u32 {
    1
}

fn generate_claim_number(id: ClaimId, now: DateTime<Utc>) -> String {
    format!(
        "CLM-{}-{:07}",
        now.format("%Y%m%d"),
        id.as_uuid().as_u128() % 10_000_000
    )
}
