//! Pre-built Test Fixtures
//!
//! Sample document texts, amounts and dates. The texts carry the labels the
//! keyword classifier and field extractor look for, so a claim opened from
//! them runs the whole pipeline on real content.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fake::faker::name::raw::Name;
use fake::locales::ZH_CN;
use fake::Fake;
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use core_kernel::{ClaimId, Currency, Money, SessionId};
use domain_claims::DocumentUpload;

/// Fixture for claim document texts
pub struct DocumentFixtures;

impl DocumentFixtures {
    /// Inpatient medical record of 张三
    pub const MEDICAL_RECORD: &'static str = "住院病历\n\
        患者：张三\n\
        性别：男\n\
        年龄：38\n\
        诊断：急性阑尾炎\n\
        入院日期：2024年3月5日\n\
        出院日期：2024年3月10日\n\
        医院：北京市朝阳医院\n\
        主治医师：李明\n\
        治疗经过：腹腔镜阑尾切除术，术后检查恢复良好\n\
        医嘱：出院后一周复查";

    /// Hospital invoice for the stay above, ¥5000.00
    pub const INVOICE: &'static str = "医疗收费发票\n\
        发票号码：FP20240310001\n\
        金额：¥5000.00\n\
        开票日期：2024年3月10日\n\
        收款方：北京市朝阳医院\n\
        付款方：张三\n\
        费用明细：手术费 住院费";

    /// Identity card of 张三
    pub const IDENTITY_CARD: &'static str = "居民身份证\n\
        姓名：张三\n\
        性别：男\n\
        出生：1986年4月12日\n\
        住址：北京市朝阳区建国路1号\n\
        身份证号：110105198604120011";

    /// Traffic accident report
    pub const ACCIDENT_REPORT: &'static str = "道路交通事故认定书\n\
        事故日期：2024年2月1日\n\
        事故地点：朝阳区建国路与东三环交叉口\n\
        当事人：张三\n\
        事故经过：两车碰撞，驾驶员轻微损伤\n\
        交警队：朝阳交通支队";

    /// Policy contract of the basic health product
    pub const INSURANCE_CONTRACT: &'static str = "基本医疗保险合同\n\
        保单号：HIB2024000123\n\
        投保人：张三\n\
        被保险人：张三\n\
        保险金额：¥100000\n\
        生效日期：2024年1月1日\n\
        保障条款见附件";

    /// Text that matches no classifier keyword
    pub const UNRELATED: &'static str = "lorem ipsum dolor sit amet";

    /// Medical record, invoice and identity card as plain-text uploads
    pub fn standard_uploads() -> Vec<DocumentUpload> {
        vec![
            DocumentUpload::new("病历.txt", Self::MEDICAL_RECORD.as_bytes()),
            DocumentUpload::new("发票.txt", Self::INVOICE.as_bytes()),
            DocumentUpload::new("身份证.txt", Self::IDENTITY_CARD.as_bytes()),
        ]
    }

    /// A scanned document whose content cannot be read directly
    pub fn scanned_upload(name: &str) -> DocumentUpload {
        DocumentUpload::new(name, vec![0x25, 0x50, 0x44, 0x46, 0x2d])
    }

    /// Medical record of a randomly named patient
    pub fn medical_record_for(patient: &str) -> String {
        Self::MEDICAL_RECORD.replace("张三", patient)
    }
}

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Invoice amount of [`DocumentFixtures::INVOICE`]
    pub fn invoice_total() -> Money {
        Money::new(dec!(5000.00), Currency::CNY)
    }

    /// Invoice total after the 10% self-pay share of the health product
    pub fn expected_health_payout() -> Money {
        Money::new(dec!(4500.00), Currency::CNY)
    }

    /// Annual limit of the health product
    pub fn health_annual_limit() -> Money {
        Money::new(dec!(100000), Currency::CNY)
    }

    pub fn cny_zero() -> Money {
        Money::zero(Currency::CNY)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// When fixture claims are opened
    pub fn opened_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 9, 30, 0).unwrap()
    }

    /// Day fixture claims are evaluated on
    pub fn evaluation_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    /// Admission date in [`DocumentFixtures::MEDICAL_RECORD`]
    pub fn admission_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

static FIXED_CLAIM_ID: Lazy<ClaimId> = Lazy::new(|| {
    "CLM-0190c8a2-5b1e-7c3d-9f00-000000000001"
        .parse()
        .expect("Invalid fixture claim id")
});

impl IdFixtures {
    /// The same claim id on every call
    pub fn claim_id() -> ClaimId {
        *FIXED_CLAIM_ID
    }

    /// A claim id that no store knows
    pub fn unknown_claim_id() -> ClaimId {
        ClaimId::new()
    }

    pub fn session_id() -> SessionId {
        SessionId::new()
    }
}

/// Fixture for generated people
pub struct PersonFixtures;

impl PersonFixtures {
    /// A random Chinese full name
    pub fn chinese_name() -> String {
        Name(ZH_CN).fake()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_claim_id_is_stable() {
        assert_eq!(IdFixtures::claim_id(), IdFixtures::claim_id());
        assert_ne!(IdFixtures::unknown_claim_id(), IdFixtures::claim_id());
    }

    #[test]
    fn test_medical_record_for_replaces_patient() {
        let name = PersonFixtures::chinese_name();
        assert!(!name.is_empty());
        let text = DocumentFixtures::medical_record_for(&name);
        assert!(text.contains(&format!("患者：{}", name)));
    }

    #[test]
    fn test_standard_uploads_are_text() {
        let uploads = DocumentFixtures::standard_uploads();
        assert_eq!(uploads.len(), 3);
        assert!(uploads.iter().all(|u| u.filename.ends_with(".txt")));
    }
}
