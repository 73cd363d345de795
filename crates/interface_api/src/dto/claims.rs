//! Claims DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::ClaimId;
use domain_claims::{Claim, ClaimQuery, ClaimStatus, LiabilityEvaluation};

use crate::error::ApiError;

pub const UPLOAD_MESSAGE: &str = "文档上传成功";
pub const CLASSIFY_MESSAGE: &str = "文档分类任务已启动";
pub const EXTRACT_MESSAGE: &str = "信息提取任务已启动";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub claim_id: ClaimId,
    pub claim_number: String,
    pub message: String,
    pub document_count: usize,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListClaimsParams {
    pub status: Option<String>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListClaimsParams {
    /// Validates the parameters and turns them into a store query
    pub fn into_query(self) -> Result<ClaimQuery, ApiError> {
        self.validate()?;
        let status = match self.status.as_deref() {
            Some(s) => Some(
                ClaimStatus::parse(s)
                    .ok_or_else(|| ApiError::BadRequest(format!("Unknown claim status: {}", s)))?,
            ),
            None => None,
        };
        Ok(ClaimQuery {
            status,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// One row of the claim listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: ClaimId,
    pub claim_number: String,
    pub status: ClaimStatus,
    pub document_count: usize,
    pub insured_person: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Claim> for ClaimSummary {
    fn from(claim: &Claim) -> Self {
        Self {
            claim_id: claim.id,
            claim_number: claim.claim_number.clone(),
            status: claim.status,
            document_count: claim.documents.len(),
            insured_person: claim.insured_person.clone(),
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

/// Reply to a stage that continues in the background
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskAccepted {
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct EvaluateRequest {
    /// Free text naming the insured product
    #[validate(length(max = 10000, message = "contract_terms is too long"))]
    pub contract_terms: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub claim_id: ClaimId,
    pub liability_result: LiabilityEvaluation,
}
