//! Test Data Builders
//!
//! Builders for claims and wizard sessions. Tests name only what matters to
//! them and take fixture defaults for the rest.

use chrono::{DateTime, Utc};

use domain_claims::wizard::{UploadedFile, WizardSession};
use domain_claims::{Claim, DocumentUpload};

use crate::fixtures::{DocumentFixtures, TemporalFixtures};

/// Builder for claims in the `uploaded` state
pub struct TestClaimBuilder {
    uploads: Vec<DocumentUpload>,
    opened_at: DateTime<Utc>,
}

impl Default for TestClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClaimBuilder {
    /// Creates a builder with no documents
    pub fn new() -> Self {
        Self {
            uploads: Vec::new(),
            opened_at: TemporalFixtures::opened_at(),
        }
    }

    /// Adds the medical record, invoice and identity card fixtures
    pub fn with_standard_documents(mut self) -> Self {
        self.uploads.extend(DocumentFixtures::standard_uploads());
        self
    }

    /// Adds a plain-text document
    pub fn with_text(mut self, filename: &str, text: &str) -> Self {
        self.uploads.push(DocumentUpload::new(filename, text.as_bytes()));
        self
    }

    /// Adds a document whose content cannot be read directly
    pub fn with_scan(mut self, filename: &str) -> Self {
        self.uploads.push(DocumentFixtures::scanned_upload(filename));
        self
    }

    pub fn opened_at(mut self, at: DateTime<Utc>) -> Self {
        self.opened_at = at;
        self
    }

    /// Returns the uploads without opening a claim
    pub fn uploads(self) -> Vec<DocumentUpload> {
        self.uploads
    }

    /// Opens the claim
    ///
    /// # Panics
    ///
    /// Panics if no document was added
    pub fn build(self) -> Claim {
        Claim::open(self.uploads, self.opened_at).expect("claim needs at least one document")
    }
}

/// Builder for wizard sessions
pub struct TestWizardBuilder {
    files: Vec<UploadedFile>,
    processed: bool,
}

impl Default for TestWizardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWizardBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            processed: false,
        }
    }

    /// Selects files with the given names, 1 KiB each
    pub fn with_files(mut self, names: &[&str]) -> Self {
        self.files
            .extend(names.iter().map(|name| UploadedFile::new(*name, 1024)));
        self
    }

    /// Runs processing to completion before returning the session
    pub fn processed(mut self) -> Self {
        self.processed = true;
        self
    }

    /// Builds the session
    ///
    /// # Panics
    ///
    /// Panics if processing was requested without files
    pub fn build(self) -> WizardSession {
        let mut session = WizardSession::new(TemporalFixtures::opened_at());
        session.select_files(self.files);
        if self.processed {
            let ticket = session
                .start_processing()
                .expect("processing needs selected files");
            session.complete_processing(ticket, TemporalFixtures::opened_at());
        }
        session
    }
}
