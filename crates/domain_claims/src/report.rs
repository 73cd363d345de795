//! Claim processing report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::ClaimId;
use crate::claim::{Claim, ClaimStatus};
use crate::classifier::ClassificationResult;
use crate::extractor::ExtractionResult;
use crate::liability::LiabilityEvaluation;

const RECOMMEND_PAYOUT: &str = "根据AI评估结果，建议按责任范围进行赔付";
const RECOMMEND_REVIEW: &str = "建议拒赔或转人工复核";
const RECOMMEND_PENDING: &str = "评估尚未完成";

/// Everything known about a claim's processing so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub status: ClaimStatus,
    pub document_count: usize,
    pub classification_results: Option<Vec<ClassificationResult>>,
    pub extraction_results: Option<Vec<ExtractionResult>>,
    pub liability_evaluation: Option<LiabilityEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReport {
    pub claim_id: ClaimId,
    pub claim_number: String,
    pub summary: String,
    pub details: ReportDetails,
    pub recommendation: String,
    pub generated_at: DateTime<Utc>,
}

impl ClaimReport {
    pub fn build(claim: &Claim, generated_at: DateTime<Utc>) -> Self {
        let recommendation = match &claim.liability_evaluation {
            Some(e) if e.coverage_applicable && e.exclusion_factors.is_empty() => RECOMMEND_PAYOUT,
            Some(_) => RECOMMEND_REVIEW,
            None => RECOMMEND_PENDING,
        };

        Self {
            claim_id: claim.id,
            claim_number: claim.claim_number.clone(),
            summary: format!("理赔案件 {} 处理报告", claim.id),
            details: ReportDetails {
                status: claim.status,
                document_count: claim.documents.len(),
                classification_results: claim.classification_results.clone(),
                extraction_results: claim.extraction_results.clone(),
                liability_evaluation: claim.liability_evaluation.clone(),
            },
            recommendation: recommendation.to_string(),
            generated_at,
        }
    }
}
