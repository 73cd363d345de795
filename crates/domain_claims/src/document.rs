//! Claim documents and their text content

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, DocumentId};
use crate::error::ClaimError;

/// Kind of evidence a claim document carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// 病历
    MedicalRecord,
    /// 事故报告
    AccidentReport,
    /// 发票
    Invoice,
    /// 身份证明
    IdentityCard,
    /// 银行流水
    BankStatement,
    /// 保险合同
    InsuranceContract,
}

impl DocumentType {
    /// All supported types, in classification table order
    pub const ALL: [DocumentType; 6] = [
        DocumentType::MedicalRecord,
        DocumentType::AccidentReport,
        DocumentType::Invoice,
        DocumentType::IdentityCard,
        DocumentType::BankStatement,
        DocumentType::InsuranceContract,
    ];

    /// Display label shown to claim handlers
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::MedicalRecord => "病历",
            DocumentType::AccidentReport => "事故报告",
            DocumentType::Invoice => "发票",
            DocumentType::IdentityCard => "身份证明",
            DocumentType::BankStatement => "银行流水",
            DocumentType::InsuranceContract => "保险合同",
        }
    }

    /// Snake-case code used on the wire and in storage
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::MedicalRecord => "medical_record",
            DocumentType::AccidentReport => "accident_report",
            DocumentType::Invoice => "invoice",
            DocumentType::IdentityCard => "identity_card",
            DocumentType::BankStatement => "bank_statement",
            DocumentType::InsuranceContract => "insurance_contract",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = ClaimError;

    /// Accepts either the code or the display label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.code() == s || t.label() == s)
            .ok_or_else(|| ClaimError::UnknownDocumentType(s.to_string()))
    }
}

/// A file received for a claim, before it is attached
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// A document attached to a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDocument {
    pub id: DocumentId,
    pub filename: String,
    /// Logical storage path, `uploads/{claim_id}/{filename}`
    pub file_path: String,
    pub size: u64,
    /// Decoded text for plain-text uploads
    pub content: Option<String>,
    pub document_type: Option<DocumentType>,
    pub classification_confidence: Option<f64>,
    pub upload_time: DateTime<Utc>,
}

impl ClaimDocument {
    /// Attaches an upload to a claim
    ///
    /// Only `.txt` uploads that decode as UTF-8 keep their text; other formats
    /// would need OCR or PDF parsing and are represented by stand-in text.
    pub fn from_upload(claim_id: ClaimId, upload: DocumentUpload, now: DateTime<Utc>) -> Self {
        let filename = base_name(&upload.filename).to_string();
        let size = upload.bytes.len() as u64;
        let content = if filename.to_lowercase().ends_with(".txt") {
            String::from_utf8(upload.bytes).ok()
        } else {
            None
        };

        Self {
            id: DocumentId::new_v7(),
            file_path: format!("uploads/{}/{}", claim_id.as_uuid(), filename),
            filename,
            size,
            content,
            document_type: None,
            classification_confidence: None,
            upload_time: now,
        }
    }

    /// Text the classifier sees
    pub fn classification_text(&self) -> String {
        match &self.content {
            Some(text) => text.clone(),
            None => format!("模拟文档内容来自: {}", self.filename),
        }
    }

    /// Text the field extractor sees
    pub fn extraction_text(&self) -> String {
        match &self.content {
            Some(text) => text.clone(),
            None => format!("模拟文档内容来自: {}\n{}", self.file_path, SAMPLE_EXTRACTION_TEXT),
        }
    }

    /// Type used for extraction, falling back to medical record when unclassified
    pub fn effective_type(&self) -> DocumentType {
        self.document_type.unwrap_or(DocumentType::MedicalRecord)
    }
}

/// Stand-in content for documents whose text cannot be read directly
pub const SAMPLE_EXTRACTION_TEXT: &str = "患者：张三\n诊断：急性阑尾炎\n入院日期：2023年10月5日\n出院日期：2023年10月10日\n医院：XX市人民医院\n主治医师：李医生\n发票号码：12345678\n发票金额：¥5000.00\n开票日期：2023年10月10日";

fn base_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}
