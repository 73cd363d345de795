//! Field extraction from classified documents
//!
//! Every document type carries a set of regular-expression field definitions.
//! A definition yields at most one field per document: the first match, with
//! the value taken from the pattern's last capture group.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use core_kernel::{Currency, DocumentId, Money};
use crate::document::{ClaimDocument, DocumentType};
use crate::error::ClaimError;

/// Confidence assigned to every regex match
pub const MATCH_CONFIDENCE: f64 = 0.9;

/// Field count at which a document counts as fully extracted
const IDEAL_FIELD_COUNT: usize = 5;

/// Byte span of an extracted value within the document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPosition {
    pub start: usize,
    pub end: usize,
}

/// A named value read from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field_name: String,
    pub field_value: String,
    pub confidence: f64,
    pub description: String,
    pub page_number: Option<u32>,
    pub position: Option<FieldPosition>,
}

/// Fields extracted from one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: DocumentId,
    pub document_type: DocumentType,
    pub extracted_fields: Vec<ExtractedField>,
    pub extraction_accuracy: f64,
}

impl ExtractionResult {
    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&ExtractedField> {
        self.extracted_fields.iter().find(|f| f.field_name == name)
    }
}

/// One extractable field of a document type
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub description: String,
    pub pattern: Regex,
}

impl FieldDefinition {
    /// Compiles a definition; matching is case-insensitive
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, ClaimError> {
        let name = name.into();
        let pattern = Regex::new(&format!("(?i){}", pattern)).map_err(|e| {
            ClaimError::InvalidFieldPattern {
                field: name.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            name,
            description: description.into(),
            pattern,
        })
    }
}

static DEFAULT_DEFINITIONS: Lazy<Vec<(DocumentType, Vec<FieldDefinition>)>> = Lazy::new(|| {
    FIELD_TABLE
        .iter()
        .map(|(doc_type, fields)| {
            let definitions = fields
                .iter()
                .map(|(name, description, pattern)| {
                    FieldDefinition::new(*name, *description, pattern)
                        .expect("Invalid built-in field pattern")
                })
                .collect();
            (*doc_type, definitions)
        })
        .collect()
});

const DATE: &str = r"(\d{4}[-年]\d{1,2}[-月]\d{1,2}[日天]?)";

type FieldSpec = (&'static str, &'static str, &'static str);

static FIELD_TABLE: Lazy<Vec<(DocumentType, Vec<(&'static str, &'static str, String)>)>> =
    Lazy::new(|| {
        fn owned(specs: &[FieldSpec]) -> Vec<(&'static str, &'static str, String)> {
            specs
                .iter()
                .map(|(name, description, pattern)| (*name, *description, pattern.replace("{DATE}", DATE)))
                .collect()
        }

        vec![
            (
                DocumentType::MedicalRecord,
                owned(&[
                    ("patient_name", "患者姓名", r"患者[：:]\s*([^\n\r]+)"),
                    ("diagnosis", "诊断结果", r"(诊断|初步诊断)[：:]\s*([^\n\r]+)"),
                    ("admission_date", "入院日期", r"(入院日期|住院日期)[：:]\s*{DATE}"),
                    ("discharge_date", "出院日期", r"(出院日期)[：:]\s*{DATE}"),
                    ("hospital_name", "医院名称", r"(医院|医疗机构)[：:]\s*([^\n\r]+)"),
                    ("doctor_name", "医生姓名", r"(主治医师|医生)[：:]\s*([^\n\r]+)"),
                    ("medical_history", "既往病史", r"(既往史|既往病史)[：:]\s*([^\n\r]+)"),
                    ("treatment_details", "治疗经过", r"(治疗经过|治疗方案)[：:]\s*([^\n\r]+)"),
                    ("medications", "用药情况", r"(用药|药品|处方)[：:]\s*([^\n\r]+)"),
                    ("gender", "性别", r"性别[：:]\s*([男女])"),
                    ("age", "年龄", r"年龄[：:]\s*(\d{1,3})"),
                ]),
            ),
            (
                DocumentType::AccidentReport,
                owned(&[
                    ("accident_date", "事故日期", r"(事故日期|发生时间)[：:]\s*{DATE}"),
                    ("accident_location", "事故地点", r"(事故地点|现场位置)[：:]\s*([^\n\r]+)"),
                    ("parties_involved", "涉及人员", r"(当事人|涉事人员)[：:]\s*([^\n\r]+)"),
                    ("accident_description", "事故描述", r"(事故经过|简要描述)[：:]\s*([^\n\r]+)"),
                    ("police_station", "执法单位", r"(交警队|派出所)[：:]\s*([^\n\r]+)"),
                ]),
            ),
            (
                DocumentType::Invoice,
                owned(&[
                    ("invoice_number", "发票号码", r"(发票号码|发票号)[：:]\s*([A-Z\d]+)"),
                    ("invoice_amount", "发票金额", r"(金额|合计)[：:]\s*([¥￥\$\w]+\d+(?:\.\d+)?)"),
                    ("invoice_date", "开票日期", r"(开票日期|日期)[：:]\s*{DATE}"),
                    ("provider", "提供商", r"(销售方|收款方|供应商)[：:]\s*([^\n\r]+)"),
                    ("recipient", "接收方", r"(购买方|付款方|客户)[：:]\s*([^\n\r]+)"),
                ]),
            ),
            (
                DocumentType::IdentityCard,
                owned(&[
                    ("name", "姓名", r"姓名[：:]\s*([^\n\r]+)"),
                    ("id_number", "身份证号", r"身份证号[：:]\s*(\d{17}[\dXx])"),
                    ("gender", "性别", r"性别[：:]\s*([^\n\r]+)"),
                    ("birth_date", "出生日期", r"出生[：:]\s*{DATE}"),
                    ("address", "地址", r"住址[：:]\s*([^\n\r]+)"),
                ]),
            ),
            (
                DocumentType::BankStatement,
                owned(&[
                    ("account_number", "账户号码", r"(账号|卡号)[：:]\s*([\d\s]+)"),
                    ("account_holder", "账户持有人", r"(户名|账户持有人)[：:]\s*([^\n\r]+)"),
                    ("balance", "余额", r"(余额|当前余额)[：:]\s*([¥￥\$\w]+\d+(?:\.\d+)?)"),
                    ("statement_period", "账单期间", r"(账单期间|对账单期间)[：:]\s*([^\n\r]+)"),
                ]),
            ),
            (
                DocumentType::InsuranceContract,
                owned(&[
                    ("policy_number", "保单号", r"(保单号|保险单号)[：:]\s*([A-Z\d]+)"),
                    ("policy_holder", "投保人", r"(投保人)[：:]\s*([^\n\r]+)"),
                    ("insured_person", "被保险人", r"(被保险人)[：:]\s*([^\n\r]+)"),
                    ("coverage_amount", "保险金额", r"(保险金额|保额)[：:]\s*([¥￥\$\w]+\d+(?:\.\d+)?)"),
                    ("effective_date", "生效日期", r"(生效日期|保险期间)[：:]\s*{DATE}"),
                ]),
            ),
        ]
    });

/// Extracts key fields from claim documents
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    definitions: Vec<(DocumentType, Vec<FieldDefinition>)>,
    max_fields: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(20)
    }
}

impl KeywordExtractor {
    /// Creates an extractor with the built-in field definitions
    pub fn new(max_fields: usize) -> Self {
        Self {
            definitions: DEFAULT_DEFINITIONS.clone(),
            max_fields,
        }
    }

    /// Registers an additional field for a document type
    pub fn with_definition(
        mut self,
        doc_type: DocumentType,
        name: &str,
        description: &str,
        pattern: &str,
    ) -> Result<Self, ClaimError> {
        let definition = FieldDefinition::new(name, description, pattern)?;
        match self.definitions.iter_mut().find(|(t, _)| *t == doc_type) {
            Some((_, fields)) => fields.push(definition),
            None => self.definitions.push((doc_type, vec![definition])),
        }
        Ok(self)
    }

    pub fn max_fields(&self) -> usize {
        self.max_fields
    }

    /// Field definitions for a document type
    pub fn definitions_for(&self, doc_type: DocumentType) -> &[FieldDefinition] {
        self.definitions
            .iter()
            .find(|(t, _)| *t == doc_type)
            .map(|(_, fields)| fields.as_slice())
            .unwrap_or(&[])
    }

    /// Extracts fields from raw text as the given document type
    pub fn extract_fields(&self, text: &str, doc_type: DocumentType) -> Vec<ExtractedField> {
        self.definitions_for(doc_type)
            .iter()
            .filter_map(|definition| {
                let captures = definition.pattern.captures(text)?;
                let value = captures.iter().skip(1).flatten().last()?;
                let trimmed = value.as_str().trim();
                if trimmed.is_empty() {
                    return None;
                }

                let lead = value.as_str().len() - value.as_str().trim_start().len();
                let start = value.start() + lead;
                Some(ExtractedField {
                    field_name: definition.name.clone(),
                    field_value: trimmed.to_string(),
                    confidence: MATCH_CONFIDENCE,
                    description: definition.description.clone(),
                    page_number: None,
                    position: Some(FieldPosition {
                        start,
                        end: start + trimmed.len(),
                    }),
                })
            })
            .take(self.max_fields)
            .collect()
    }

    /// Extracts fields from a document using its classified type
    pub fn extract(&self, document: &ClaimDocument) -> ExtractionResult {
        let document_type = document.effective_type();
        let extracted_fields = self.extract_fields(&document.extraction_text(), document_type);
        let extraction_accuracy = extraction_accuracy(&extracted_fields);

        debug!(
            document = %document.id,
            document_type = document_type.code(),
            fields = extracted_fields.len(),
            accuracy = extraction_accuracy,
            "Fields extracted"
        );

        ExtractionResult {
            document_id: document.id,
            document_type,
            extracted_fields,
            extraction_accuracy,
        }
    }

    /// Extracts every document of a claim, preserving order
    pub fn extract_all(&self, documents: &[ClaimDocument]) -> Vec<ExtractionResult> {
        documents.iter().map(|d| self.extract(d)).collect()
    }
}

/// Blends average confidence with field completeness
pub fn extraction_accuracy(fields: &[ExtractedField]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }

    let avg_confidence = fields.iter().map(|f| f.confidence).sum::<f64>() / fields.len() as f64;
    let completeness = (fields.len() as f64 / IDEAL_FIELD_COUNT as f64).min(1.0);
    avg_confidence * 0.7 + completeness * 0.3
}

/// Merges fields of several documents by name; later documents win
pub fn merge_fields(results: &[ExtractionResult]) -> BTreeMap<String, ExtractedField> {
    let mut merged = BTreeMap::new();
    for field in results.iter().flat_map(|r| &r.extracted_fields) {
        merged.insert(field.field_name.clone(), field.clone());
    }
    merged
}

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\s*[-年/.]\s*(\d{1,2})\s*[-月/.]\s*(\d{1,2})").expect("Invalid date regex pattern")
});

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Invalid number regex pattern"));

/// Parses dates written as `2023-10-05`, `2023/10/5` or `2023年10月5日`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let captures = DATE_PATTERN.captures(value)?;
    let year = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let day = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses the first number in an amount string, picking the currency from its symbol
///
/// Thousands separators are ignored. Amounts without a symbol are CNY.
pub fn parse_amount(value: &str) -> Option<Money> {
    let cleaned = value.replace(',', "");
    let number = NUMBER_PATTERN.find(&cleaned)?;

    let currency = ["HK$", "￥", "¥", "$", "€"]
        .into_iter()
        .find(|symbol| cleaned.contains(symbol))
        .and_then(Currency::from_symbol)
        .unwrap_or_default();

    Money::parse(number.as_str(), currency).ok()
}
