//! Keyword-based document classification
//!
//! Each supported document type owns a keyword list. A document scores one
//! point per keyword its text contains; the highest score wins, with ties
//! going to the type listed first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::DocumentId;
use crate::document::{ClaimDocument, DocumentType};

/// Confidence reported when no keyword matched at all
pub const NO_MATCH_CONFIDENCE: f64 = 0.1;

/// Number of alternative types reported next to the prediction
const ALTERNATIVE_COUNT: usize = 3;

/// Outcome of classifying one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_id: DocumentId,
    pub predicted_type: DocumentType,
    pub confidence: f64,
    pub alternative_types: Vec<DocumentType>,
    /// True when the confidence is under the configured threshold
    pub below_threshold: bool,
}

/// Classifies claim documents by keyword matching
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    keyword_table: Vec<(DocumentType, Vec<String>)>,
    confidence_threshold: f64,
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl DocumentClassifier {
    /// Creates a classifier with the built-in keyword table
    pub fn new(confidence_threshold: f64) -> Self {
        let keyword_table = default_keywords()
            .into_iter()
            .map(|(doc_type, words)| (doc_type, words.iter().map(|w| w.to_string()).collect()))
            .collect();

        Self {
            keyword_table,
            confidence_threshold,
        }
    }

    /// Adds extra keywords for a document type
    pub fn with_keywords(mut self, doc_type: DocumentType, keywords: &[&str]) -> Self {
        if let Some((_, words)) = self.keyword_table.iter_mut().find(|(t, _)| *t == doc_type) {
            words.extend(keywords.iter().map(|k| k.to_string()));
        }
        self
    }

    /// Types this classifier can predict, in table order
    pub fn supported_types(&self) -> Vec<DocumentType> {
        self.keyword_table.iter().map(|(t, _)| *t).collect()
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Classifies raw text, returning the predicted type and its confidence
    pub fn classify_text(&self, text: &str) -> (DocumentType, f64) {
        let text = text.to_lowercase();

        let mut best: Option<(DocumentType, usize)> = None;
        for (doc_type, keywords) in &self.keyword_table {
            let score = keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .count();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((*doc_type, score));
            }
        }

        match best {
            Some((doc_type, score)) if score > 0 => {
                (doc_type, (score as f64 / self.expected_matches() as f64).min(1.0))
            }
            _ => (DocumentType::MedicalRecord, NO_MATCH_CONFIDENCE),
        }
    }

    /// Classifies a single document
    pub fn classify(&self, document: &ClaimDocument) -> ClassificationResult {
        let (predicted_type, confidence) = self.classify_text(&document.classification_text());
        debug!(
            document = %document.id,
            filename = %document.filename,
            predicted = predicted_type.code(),
            confidence,
            "Document classified"
        );

        ClassificationResult {
            document_id: document.id,
            predicted_type,
            confidence,
            alternative_types: self.alternatives(predicted_type),
            below_threshold: confidence < self.confidence_threshold,
        }
    }

    /// Classifies every document of a claim, preserving order
    pub fn classify_all(&self, documents: &[ClaimDocument]) -> Vec<ClassificationResult> {
        documents.iter().map(|d| self.classify(d)).collect()
    }

    /// Average keyword count per type, used as the full-confidence score
    fn expected_matches(&self) -> usize {
        let total: usize = self.keyword_table.iter().map(|(_, k)| k.len()).sum();
        (total / self.keyword_table.len().max(1)).max(1)
    }

    fn alternatives(&self, primary: DocumentType) -> Vec<DocumentType> {
        self.keyword_table
            .iter()
            .map(|(t, _)| *t)
            .filter(|t| *t != primary)
            .take(ALTERNATIVE_COUNT)
            .collect()
    }
}

fn default_keywords() -> Vec<(DocumentType, &'static [&'static str])> {
    vec![
        (
            DocumentType::MedicalRecord,
            &["病历", "诊断", "入院", "出院", "医嘱", "检查", "检验", "病理", "门诊"],
        ),
        (
            DocumentType::AccidentReport,
            &["事故", "现场", "交警", "认定书", "碰撞", "损伤", "报案", "调查"],
        ),
        (
            DocumentType::Invoice,
            &["发票", "金额", "费用", "收据", "结算", "收费", "凭证"],
        ),
        (
            DocumentType::IdentityCard,
            &["身份证", "姓名", "性别", "出生", "地址", "证件"],
        ),
        (
            DocumentType::BankStatement,
            &["银行", "流水", "转账", "账户", "存款", "取款", "余额"],
        ),
        (
            DocumentType::InsuranceContract,
            &["保险", "合同", "条款", "投保", "受益", "保费", "保障"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_keywords_defaults_to_medical_record() {
        let classifier = DocumentClassifier::default();
        assert_eq!(
            classifier.classify_text("lorem ipsum"),
            (DocumentType::MedicalRecord, NO_MATCH_CONFIDENCE)
        );
    }

    #[test]
    fn test_confidence_scales_with_matches() {
        let classifier = DocumentClassifier::default();
        // 44 keywords over 6 types: seven matches mean full confidence
        let (doc_type, confidence) = classifier.classify_text("发票 金额 费用");
        assert_eq!(doc_type, DocumentType::Invoice);
        assert!((confidence - 3.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_capped_at_one() {
        let classifier = DocumentClassifier::default();
        let text = "病历 诊断 入院 出院 医嘱 检查 检验 病理 门诊";
        assert_eq!(classifier.classify_text(text), (DocumentType::MedicalRecord, 1.0));
    }

    #[test]
    fn test_ties_go_to_table_order() {
        let classifier = DocumentClassifier::default();
        // one medical keyword, one invoice keyword
        let (doc_type, _) = classifier.classify_text("门诊收据");
        assert_eq!(doc_type, DocumentType::MedicalRecord);
    }

    #[test]
    fn test_alternatives_exclude_prediction() {
        let classifier = DocumentClassifier::default();
        let alternatives = classifier.alternatives(DocumentType::MedicalRecord);
        assert_eq!(
            alternatives,
            vec![
                DocumentType::AccidentReport,
                DocumentType::Invoice,
                DocumentType::IdentityCard
            ]
        );
    }

    #[test]
    fn test_custom_keywords_extend_table() {
        let classifier = DocumentClassifier::default()
            .with_keywords(DocumentType::BankStatement, &["statement"]);
        let (doc_type, _) = classifier.classify_text("Monthly STATEMENT");
        assert_eq!(doc_type, DocumentType::BankStatement);
    }
}
