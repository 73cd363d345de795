//! Liability evaluation
//!
//! Merges the fields extracted from all documents of a claim and checks them
//! against a catalogued insurance product: coverage, exclusions, risk rules,
//! payout and an overall confidence.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use core_kernel::{Currency, Money, Rate};
use crate::error::ClaimError;
use crate::extractor::{self, ExtractedField, ExtractionResult};

/// Product used when contract terms name no catalogued product
pub const DEFAULT_PRODUCT: &str = "health_insurance_basic";

/// Invoice amount above which a claim is flagged as unusually expensive
const ABNORMAL_COST_THRESHOLD: rust_decimal::Decimal = dec!(20000);

const BASE_CONFIDENCE: f64 = 0.9;
const MIN_CONFIDENCE: f64 = 0.1;

type FieldMap = BTreeMap<String, ExtractedField>;

/// Terms of a catalogued insurance product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTerms {
    pub code: String,
    pub name: String,
    pub coverage: Vec<String>,
    pub exclusions: Vec<String>,
    /// 年度报销上限
    pub annual_limit: Option<Money>,
    /// 单次住院上限
    pub per_stay_limit: Option<Money>,
    /// 意外身故
    pub accidental_death_limit: Option<Money>,
    /// 意外医疗
    pub accident_medical_limit: Option<Money>,
    /// 自付比例
    pub self_pay: Rate,
    pub waiting_period_days: i64,
}

impl PolicyTerms {
    /// 基本医疗保险
    pub fn health_insurance_basic() -> Self {
        Self {
            code: "health_insurance_basic".to_string(),
            name: "基本医疗保险".to_string(),
            coverage: strings(&["住院费用", "手术费用", "药品费用(医保目录内)"]),
            exclusions: strings(&["既往症", "美容手术", "牙科治疗", "生育相关"]),
            annual_limit: Some(Money::new(dec!(100000), Currency::CNY)),
            per_stay_limit: Some(Money::new(dec!(30000), Currency::CNY)),
            accidental_death_limit: None,
            accident_medical_limit: None,
            self_pay: Rate::from_percentage(dec!(10)),
            waiting_period_days: 30,
        }
    }

    /// 意外伤害保险
    pub fn accident_insurance() -> Self {
        Self {
            code: "accident_insurance".to_string(),
            name: "意外伤害保险".to_string(),
            coverage: strings(&["意外身故", "意外伤残", "意外医疗费用"]),
            exclusions: strings(&["自杀", "酒驾", "战争", "高风险运动"]),
            annual_limit: None,
            per_stay_limit: None,
            accidental_death_limit: Some(Money::new(dec!(500000), Currency::CNY)),
            accident_medical_limit: Some(Money::new(dec!(50000), Currency::CNY)),
            self_pay: Rate::new(dec!(0)),
            waiting_period_days: 0,
        }
    }

    /// The most a single claim can pay out under this product
    pub fn payout_cap(&self) -> Option<Money> {
        self.annual_limit.or(self.accident_medical_limit)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Severity of a detected risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskSeverity::Low => write!(f, "low"),
            RiskSeverity::Medium => write!(f, "medium"),
            RiskSeverity::High => write!(f, "high"),
        }
    }
}

/// A risk rule that fired for a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub severity: RiskSeverity,
    pub description: String,
}

/// A named check over the merged claim fields
#[derive(Clone)]
pub struct RiskRule {
    pub name: &'static str,
    pub severity: RiskSeverity,
    pub description: &'static str,
    check: fn(&FieldMap, NaiveDate) -> bool,
}

impl fmt::Debug for RiskRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish()
    }
}

impl RiskRule {
    fn matches(&self, fields: &FieldMap, today: NaiveDate) -> bool {
        (self.check)(fields, today)
    }

    fn to_factor(&self) -> RiskFactor {
        RiskFactor {
            name: self.name.to_string(),
            severity: self.severity,
            description: self.description.to_string(),
        }
    }
}

fn default_rules() -> Vec<RiskRule> {
    vec![
        RiskRule {
            name: "性别年龄不符",
            severity: RiskSeverity::High,
            description: "被保险人性别与年龄不匹配",
            check: gender_age_inconsistent,
        },
        RiskRule {
            name: "既往症检测",
            severity: RiskSeverity::High,
            description: "疑似既往症",
            check: pre_existing_condition,
        },
        RiskRule {
            name: "费用异常高",
            severity: RiskSeverity::Medium,
            description: "费用超出合理范围",
            check: abnormal_cost,
        },
        RiskRule {
            name: "诊断与用药不符",
            severity: RiskSeverity::High,
            description: "药物与诊断不匹配",
            check: medication_mismatch,
        },
    ]
}

fn field<'a>(fields: &'a FieldMap, name: &str) -> &'a str {
    fields.get(name).map(|f| f.field_value.as_str()).unwrap_or("")
}

fn gender_age_inconsistent(fields: &FieldMap, today: NaiveDate) -> bool {
    let age = match field(fields, "age").parse::<i64>() {
        Ok(age) => age,
        Err(_) => match extractor::parse_date(field(fields, "birth_date")) {
            Some(birth) => (today - birth).num_days() / 365,
            None => return false,
        },
    };

    let diagnosis = field(fields, "diagnosis");
    field(fields, "gender").contains('女')
        && age < 18
        && ["孕", "产", "妇科"].iter().any(|k| diagnosis.contains(k))
}

fn pre_existing_condition(fields: &FieldMap, _today: NaiveDate) -> bool {
    let history = field(fields, "medical_history").to_lowercase();
    let diagnosis = field(fields, "diagnosis").to_lowercase();
    !history.is_empty() && !diagnosis.is_empty() && history.contains(&diagnosis)
}

fn abnormal_cost(fields: &FieldMap, _today: NaiveDate) -> bool {
    extractor::parse_amount(field(fields, "invoice_amount"))
        .map(|amount| amount.amount() > ABNORMAL_COST_THRESHOLD)
        .unwrap_or(false)
}

fn medication_mismatch(fields: &FieldMap, _today: NaiveDate) -> bool {
    let diagnosis = field(fields, "diagnosis");
    field(fields, "medications").contains("抗生素")
        && !diagnosis.contains("感染")
        && !diagnosis.contains("炎症")
}

/// Outcome of a liability evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiabilityEvaluation {
    /// Product the claim was evaluated against
    pub product_code: String,
    pub coverage_applicable: bool,
    pub exclusion_factors: Vec<String>,
    pub risk_factors: Vec<RiskFactor>,
    pub coverage_limit: Option<Money>,
    pub recommended_payout: Money,
    pub evaluation_reasons: Vec<String>,
    pub confidence: f64,
    pub requires_manual_review: bool,
}

/// Evaluates claim liability against catalogued products
#[derive(Debug, Clone)]
pub struct LiabilityEvaluator {
    catalog: Vec<PolicyTerms>,
    rules: Vec<RiskRule>,
    manual_review_threshold: f64,
}

impl Default for LiabilityEvaluator {
    fn default() -> Self {
        Self::new(0.75)
    }
}

impl LiabilityEvaluator {
    pub fn new(manual_review_threshold: f64) -> Self {
        Self {
            catalog: vec![
                PolicyTerms::health_insurance_basic(),
                PolicyTerms::accident_insurance(),
            ],
            rules: default_rules(),
            manual_review_threshold,
        }
    }

    pub fn catalog(&self) -> &[PolicyTerms] {
        &self.catalog
    }

    pub fn manual_review_threshold(&self) -> f64 {
        self.manual_review_threshold
    }

    /// Picks the product named by the contract terms, by code or name
    pub fn select_product(&self, contract_terms: Option<&str>) -> &PolicyTerms {
        let named = contract_terms.and_then(|terms| {
            self.catalog
                .iter()
                .find(|p| terms.contains(p.code.as_str()) || terms.contains(p.name.as_str()))
        });

        named
            .or_else(|| self.catalog.iter().find(|p| p.code == DEFAULT_PRODUCT))
            .unwrap_or(&self.catalog[0])
    }

    /// Evaluates a claim from its extraction results
    pub fn evaluate(
        &self,
        results: &[ExtractionResult],
        contract_terms: Option<&str>,
        today: NaiveDate,
    ) -> Result<LiabilityEvaluation, ClaimError> {
        let fields = extractor::merge_fields(results);
        let policy = self.select_product(contract_terms);

        let (coverage_applicable, coverage_issues) = check_coverage(&fields, policy);
        let exclusion_factors = check_exclusions(&fields, policy);
        let risk_factors: Vec<RiskFactor> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(&fields, today))
            .map(RiskRule::to_factor)
            .collect();

        let recommended_payout =
            recommended_payout(&fields, policy, coverage_applicable, &exclusion_factors)?;
        let confidence = evaluation_confidence(
            coverage_applicable,
            exclusion_factors.len(),
            risk_factors.len(),
        );
        let evaluation_reasons = evaluation_reasons(
            coverage_applicable,
            &coverage_issues,
            &exclusion_factors,
            &risk_factors,
        );

        debug!(
            product = %policy.code,
            fields = fields.len(),
            exclusions = exclusion_factors.len(),
            risks = risk_factors.len(),
            "Liability checks applied"
        );

        let evaluation = LiabilityEvaluation {
            product_code: policy.code.clone(),
            coverage_applicable,
            exclusion_factors,
            risk_factors,
            coverage_limit: policy.payout_cap(),
            recommended_payout,
            evaluation_reasons,
            confidence,
            requires_manual_review: confidence < self.manual_review_threshold,
        };

        info!(
            product = %evaluation.product_code,
            covered = evaluation.coverage_applicable,
            payout = %evaluation.recommended_payout,
            confidence = evaluation.confidence,
            manual_review = evaluation.requires_manual_review,
            "Liability evaluated"
        );

        Ok(evaluation)
    }
}

fn check_coverage(fields: &FieldMap, policy: &PolicyTerms) -> (bool, Vec<String>) {
    let mut issues = Vec::new();

    if field(fields, "diagnosis").is_empty() {
        issues.push("缺少诊断信息，无法确认是否在保障范围内".to_string());
    }

    if policy.waiting_period_days > 0 {
        let effective = extractor::parse_date(field(fields, "effective_date"));
        let incident = extractor::parse_date(field(fields, "accident_date"))
            .or_else(|| extractor::parse_date(field(fields, "admission_date")));
        if let (Some(effective), Some(incident)) = (effective, incident) {
            let elapsed = (incident - effective).num_days();
            if elapsed < policy.waiting_period_days {
                issues.push(format!(
                    "出险日期在{}天等待期内（生效后第{}天）",
                    policy.waiting_period_days, elapsed
                ));
            }
        }
    }

    (issues.is_empty(), issues)
}

fn check_exclusions(fields: &FieldMap, policy: &PolicyTerms) -> Vec<String> {
    let diagnosis = field(fields, "diagnosis").to_lowercase();
    let treatment = field(fields, "treatment_details").to_lowercase();

    policy
        .exclusions
        .iter()
        .filter(|exclusion| {
            let exclusion = exclusion.to_lowercase();
            diagnosis.contains(&exclusion) || treatment.contains(&exclusion)
        })
        .cloned()
        .collect()
}

fn recommended_payout(
    fields: &FieldMap,
    policy: &PolicyTerms,
    coverage_applicable: bool,
    exclusion_factors: &[String],
) -> Result<Money, ClaimError> {
    if !coverage_applicable || !exclusion_factors.is_empty() {
        return Ok(Money::zero(Currency::CNY));
    }

    let invoice = match extractor::parse_amount(field(fields, "invoice_amount")) {
        Some(amount) => amount,
        None => return Ok(Money::zero(Currency::CNY)),
    };

    let mut payout = policy.self_pay.complement().apply(&invoice);
    if let Some(cap) = policy.payout_cap() {
        payout = payout.checked_min(&cap)?;
    }
    Ok(payout.round_to_currency())
}

fn evaluation_confidence(coverage_applicable: bool, exclusions: usize, risks: usize) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if !coverage_applicable {
        confidence -= 0.3;
    }
    confidence -= 0.2 * exclusions as f64;
    confidence -= 0.1 * risks as f64;

    ((confidence * 10_000.0).round() / 10_000.0).max(MIN_CONFIDENCE)
}

fn evaluation_reasons(
    coverage_applicable: bool,
    coverage_issues: &[String],
    exclusion_factors: &[String],
    risk_factors: &[RiskFactor],
) -> Vec<String> {
    let mut reasons = Vec::new();

    if coverage_applicable {
        reasons.push("案件在保险保障范围内".to_string());
    } else {
        reasons.push("案件可能不在保障范围内".to_string());
        reasons.extend(coverage_issues.iter().cloned());
    }

    if !exclusion_factors.is_empty() {
        reasons.push(format!(
            "发现{}个免责因素: {}",
            exclusion_factors.len(),
            exclusion_factors.join(", ")
        ));
    }

    if !risk_factors.is_empty() {
        let names: Vec<&str> = risk_factors.iter().map(|r| r.name.as_str()).collect();
        reasons.push(format!(
            "检测到{}个风险点: {}",
            risk_factors.len(),
            names.join(", ")
        ));
    }

    if coverage_issues.is_empty() && exclusion_factors.is_empty() && risk_factors.is_empty() {
        reasons.push("未发现明显风险或免责情况".to_string());
    }

    reasons
}
