//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_claims::wizard::UploadedFile;
use domain_claims::{ClaimStatus, DocumentType};

/// Strategy for generating every ClaimStatus
pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop_oneof![
        Just(ClaimStatus::Uploaded),
        Just(ClaimStatus::Classifying),
        Just(ClaimStatus::Extracting),
        Just(ClaimStatus::Evaluating),
        Just(ClaimStatus::Completed),
        Just(ClaimStatus::Rejected),
    ]
}

/// Strategy for generating every DocumentType
pub fn document_type_strategy() -> impl Strategy<Value = DocumentType> {
    proptest::sample::select(DocumentType::ALL.to_vec())
}

/// Strategy for CNY amounts with fen precision, up to 1,000,000 yuan
pub fn cny_money_strategy() -> impl Strategy<Value = Money> {
    (0i64..100_000_000i64).prop_map(|fen| Money::new(Decimal::new(fen, 2), Currency::CNY))
}

/// Strategy for invoice amount text such as `¥1234.56`
pub fn invoice_amount_text_strategy() -> impl Strategy<Value = String> {
    (1u64..1_000_000u64, 0u32..100u32).prop_map(|(yuan, fen)| format!("¥{}.{:02}", yuan, fen))
}

/// Strategy for files picked in the upload wizard
pub fn uploaded_file_strategy() -> impl Strategy<Value = UploadedFile> {
    ("[a-z0-9]{1,12}\\.(pdf|jpg|png|txt)", 0u64..50_000_000u64)
        .prop_map(|(name, size)| UploadedFile::new(name, size))
}

/// Strategy for ASCII text, which never contains a classifier keyword
pub fn keyword_free_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,]{0,80}"
}
