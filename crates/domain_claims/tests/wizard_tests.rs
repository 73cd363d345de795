//! Property tests for upload wizard sessions

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;
use tokio::sync::RwLock;

use domain_claims::wizard::{
    complete_after, UploadedFile, WizardError, WizardPhase, WizardSession, FINAL_STEP,
};

const LABELS: [&str; 3] = ["病历", "发票", "身份证明"];

fn file_strategy() -> impl Strategy<Value = UploadedFile> {
    ("[a-z]{1,8}\\.(pdf|jpg|txt)", 0u64..10_000_000).prop_map(|(name, size)| UploadedFile::new(name, size))
}

#[derive(Debug, Clone)]
enum Action {
    Select(Vec<UploadedFile>),
    Remove(usize),
    Start,
    Complete,
    Reset,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        prop::collection::vec(file_strategy(), 0..5).prop_map(Action::Select),
        (0usize..5).prop_map(Action::Remove),
        Just(Action::Start),
        Just(Action::Complete),
        Just(Action::Reset),
    ]
}

proptest! {
    #[test]
    fn processed_rows_follow_upload_order(files in prop::collection::vec(file_strategy(), 1..20)) {
        let mut session = WizardSession::default();
        session.select_files(files.clone());
        let ticket = session.start_processing().unwrap();
        prop_assert!(session.complete_processing(ticket, Utc::now()));

        prop_assert_eq!(session.documents().len(), files.len());
        for (i, (row, file)) in session.documents().iter().zip(&files).enumerate() {
            prop_assert_eq!(&row.name, &file.name);
            prop_assert_eq!(row.document_type.as_str(), LABELS[i % 3]);
        }

        prop_assert_eq!(session.fields().len(), 6);
        for field in session.fields() {
            prop_assert!((0.0..=1.0).contains(&field.confidence));
        }
    }

    #[test]
    fn phase_invariants_hold_under_any_actions(actions in prop::collection::vec(action_strategy(), 0..30)) {
        let mut session = WizardSession::default();
        let mut last_ticket = None;

        for action in actions {
            match action {
                Action::Select(files) => session.select_files(files),
                Action::Remove(index) => {
                    if let Some(name) = session.files().get(index).map(|f| f.name.clone()) {
                        session.remove_file(&name);
                    }
                }
                Action::Start => {
                    let step = session.step();
                    match session.start_processing() {
                        Ok(ticket) => last_ticket = Some(ticket),
                        Err(WizardError::NoFilesSelected) => {
                            prop_assert!(session.files().is_empty());
                            prop_assert_eq!(session.step(), step);
                        }
                    }
                }
                Action::Complete => {
                    if let Some(ticket) = last_ticket {
                        session.complete_processing(ticket, Utc::now());
                    }
                }
                Action::Reset => {
                    session.reset();
                    prop_assert!(session.files().is_empty());
                    prop_assert!(session.documents().is_empty());
                    prop_assert!(session.fields().is_empty());
                    prop_assert_eq!(session.step(), 0);
                }
            }

            prop_assert!(!(session.is_processing() && session.shows_results()));
            prop_assert_eq!(session.shows_results(), session.step() == FINAL_STEP);
            if session.phase() == WizardPhase::Results {
                prop_assert!(!session.documents().is_empty());
            } else {
                prop_assert!(session.documents().is_empty());
            }
        }
    }
}

#[tokio::test]
async fn test_delayed_completion_on_shared_session() {
    let session = Arc::new(RwLock::new(WizardSession::default()));
    let ticket = {
        let mut guard = session.write().await;
        guard.select_files(vec![UploadedFile::new("a.pdf", 10)]);
        guard.start_processing().unwrap()
    };

    let task = {
        let session = session.clone();
        tokio::spawn(async move { complete_after(&session, ticket, Duration::from_millis(10)).await })
    };

    assert!(session.read().await.is_processing());
    assert!(task.await.unwrap());
    assert!(session.read().await.shows_results());
}

#[tokio::test]
async fn test_reset_during_delay_drops_results() {
    let session = Arc::new(RwLock::new(WizardSession::default()));
    let ticket = {
        let mut guard = session.write().await;
        guard.select_files(vec![UploadedFile::new("a.pdf", 10)]);
        guard.start_processing().unwrap()
    };

    let task = {
        let session = session.clone();
        tokio::spawn(async move { complete_after(&session, ticket, Duration::from_millis(50)).await })
    };

    session.write().await.reset();
    assert!(!task.await.unwrap());

    let guard = session.read().await;
    assert_eq!(guard.step(), 0);
    assert!(guard.documents().is_empty());
    assert_eq!(guard.phase(), WizardPhase::Idle);
}
