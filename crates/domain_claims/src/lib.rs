//! Claims Document Domain
//!
//! This crate turns uploaded claim documents into a liability decision:
//! documents are classified by keyword, key fields are extracted with regular
//! expressions, and the merged fields are evaluated against a catalogued
//! insurance product. It also holds the upload wizard sessions that front the
//! pipeline.
//!
//! # Claim Lifecycle
//!
//! ```text
//! Uploaded -> Classifying -> Extracting -> Evaluating -> Completed
//!     \            \             \             \
//!      +------------+-------------+-------------+--> Rejected -> Classifying
//! ```

pub mod claim;
pub mod document;
pub mod classifier;
pub mod extractor;
pub mod liability;
pub mod report;
pub mod settings;
pub mod ports;
pub mod service;
pub mod wizard;
pub mod error;

pub use claim::{Claim, ClaimStatus};
pub use document::{ClaimDocument, DocumentType, DocumentUpload};
pub use classifier::{ClassificationResult, DocumentClassifier};
pub use extractor::{ExtractedField, ExtractionResult, KeywordExtractor};
pub use liability::{LiabilityEvaluation, LiabilityEvaluator, PolicyTerms, RiskFactor, RiskSeverity};
pub use report::ClaimReport;
pub use settings::PipelineSettings;
pub use ports::{ClaimQuery, ClaimStore, ClaimStoreExt};
pub use service::ClaimProcessor;
pub use wizard::{UploadedFile, WizardError, WizardPhase, WizardSession, WizardSnapshot};
pub use error::ClaimError;
