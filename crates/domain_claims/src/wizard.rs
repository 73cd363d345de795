//! Upload wizard sessions
//!
//! A session walks a user through four steps: upload, classification,
//! extraction and evaluation. Processing is simulated: after a delay the
//! session produces one document row per selected file and a fixed set of
//! extracted fields.
//!
//! Processing runs are identified by a [`ProcessingTicket`]. Resetting a
//! session invalidates every ticket issued before the reset, so a delayed
//! completion that arrives late is dropped instead of resurrecting results.
//! A run works on the files selected when it started; later edits to the
//! selection apply to the next run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use core_kernel::{DocumentId, SessionId};
use crate::document::DocumentType;

/// Status label of a file once selected
pub const FILE_STATUS_DONE: &str = "done";

/// Status label of a processed document row
pub const DOCUMENT_STATUS_DONE: &str = "已完成";

/// Document types assigned to rows, cycled by upload position
const ROW_TYPES: [DocumentType; 3] = [
    DocumentType::MedicalRecord,
    DocumentType::Invoice,
    DocumentType::IdentityCard,
];

/// Fields reported for every processed session
const FIXED_FIELDS: [(&str, &str, f64); 6] = [
    ("患者姓名", "张三", 0.98),
    ("身份证号", "110101199001011234", 0.95),
    ("就诊医院", "XX市人民医院", 0.96),
    ("诊断结果", "急性阑尾炎", 0.92),
    ("发票金额", "¥5000.00", 0.97),
    ("就诊日期", "2023-10-05", 0.94),
];

/// A wizard step with its fixed title and description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WizardStep {
    pub index: usize,
    pub title: &'static str,
    pub description: &'static str,
}

pub const STEPS: [WizardStep; 4] = [
    WizardStep { index: 0, title: "上传文档", description: "上传理赔相关文档" },
    WizardStep { index: 1, title: "文档分类", description: "AI自动分类文档" },
    WizardStep { index: 2, title: "信息提取", description: "提取关键信息" },
    WizardStep { index: 3, title: "责任评估", description: "评估理赔责任" },
];

/// Index of the terminal step
pub const FINAL_STEP: usize = STEPS.len() - 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("请先上传文件")]
    NoFilesSelected,
}

/// A file picked by the user; only metadata is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub status: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            status: FILE_STATUS_DONE.to_string(),
        }
    }
}

/// One processed document as shown in the results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub name: String,
    /// Display label such as `病历`
    pub document_type: String,
    pub status: String,
    pub upload_time: DateTime<Utc>,
}

/// One extracted field as shown in the results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRow {
    pub field_name: String,
    pub field_value: String,
    pub confidence: f64,
}

/// What the session is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    /// Waiting for files and a start
    Idle,
    /// Simulated processing in flight
    Processing,
    /// Results tables shown
    Results,
}

/// Identifies one processing run of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessingTicket(u64);

impl ProcessingTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// State of one wizard session
#[derive(Debug, Clone)]
pub struct WizardSession {
    id: SessionId,
    files: Vec<UploadedFile>,
    /// Files captured by the run in flight
    queued: Vec<UploadedFile>,
    documents: Vec<DocumentRow>,
    fields: Vec<FieldRow>,
    step: usize,
    phase: WizardPhase,
    generation: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl WizardSession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new_v7(),
            files: Vec::new(),
            queued: Vec::new(),
            documents: Vec::new(),
            fields: Vec::new(),
            step: 0,
            phase: WizardPhase::Idle,
            generation: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn documents(&self) -> &[DocumentRow] {
        &self.documents
    }

    pub fn fields(&self) -> &[FieldRow] {
        &self.fields
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn current_step(&self) -> WizardStep {
        STEPS[self.step]
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.phase == WizardPhase::Processing
    }

    pub fn shows_results(&self) -> bool {
        self.phase == WizardPhase::Results
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the selected files
    pub fn select_files(&mut self, files: Vec<UploadedFile>) {
        self.files = files;
        self.touch();
    }

    /// Removes the first file with the given name
    pub fn remove_file(&mut self, name: &str) -> bool {
        match self.files.iter().position(|f| f.name == name) {
            Some(index) => {
                self.files.remove(index);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Starts a processing run
    ///
    /// Fails without touching the session when no file is selected. Starting
    /// again from the results view clears the previous rows first.
    pub fn start_processing(&mut self) -> Result<ProcessingTicket, WizardError> {
        if self.files.is_empty() {
            return Err(WizardError::NoFilesSelected);
        }

        if self.phase == WizardPhase::Results {
            self.documents.clear();
            self.fields.clear();
            self.step = 0;
        }

        self.queued = self.files.clone();
        self.generation += 1;
        self.phase = WizardPhase::Processing;
        self.touch();

        debug!(session = %self.id, generation = self.generation, files = self.files.len(), "Processing started");
        Ok(ProcessingTicket(self.generation))
    }

    /// Applies the results of a processing run
    ///
    /// Returns false when the ticket is stale, i.e. the session was reset or
    /// restarted after it was issued.
    pub fn complete_processing(&mut self, ticket: ProcessingTicket, now: DateTime<Utc>) -> bool {
        if ticket.0 != self.generation || self.phase != WizardPhase::Processing {
            debug!(session = %self.id, ticket = ticket.0, "Ignoring stale processing ticket");
            return false;
        }

        self.documents = std::mem::take(&mut self.queued)
            .into_iter()
            .enumerate()
            .map(|(i, file)| DocumentRow {
                id: DocumentId::new_v7(),
                name: file.name,
                document_type: ROW_TYPES[i % ROW_TYPES.len()].label().to_string(),
                status: DOCUMENT_STATUS_DONE.to_string(),
                upload_time: now,
            })
            .collect();

        self.fields = FIXED_FIELDS
            .iter()
            .map(|(name, value, confidence)| FieldRow {
                field_name: name.to_string(),
                field_value: value.to_string(),
                confidence: *confidence,
            })
            .collect();

        self.phase = WizardPhase::Results;
        self.step = FINAL_STEP;
        self.updated_at = now;

        info!(session = %self.id, documents = self.documents.len(), "Processing completed");
        true
    }

    /// Starts processing, waits, then completes
    pub async fn run_processing(&mut self, delay: Duration) -> Result<(), WizardError> {
        let ticket = self.start_processing()?;
        tokio::time::sleep(delay).await;
        self.complete_processing(ticket, Utc::now());
        Ok(())
    }

    /// Clears everything and returns to the first step
    pub fn reset(&mut self) {
        self.files.clear();
        self.queued.clear();
        self.documents.clear();
        self.fields.clear();
        self.step = 0;
        self.phase = WizardPhase::Idle;
        self.generation += 1;
        self.touch();
    }

    /// Serializable view of the session
    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            session_id: self.id,
            step: self.step,
            steps: STEPS.to_vec(),
            phase: self.phase,
            processing: self.is_processing(),
            show_results: self.shows_results(),
            files: self.files.clone(),
            documents: self.documents.clone(),
            fields: self.fields.clone(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Completes a processing run on a shared session after a delay
///
/// The lock is only taken once the delay has elapsed.
pub async fn complete_after(
    session: &RwLock<WizardSession>,
    ticket: ProcessingTicket,
    delay: Duration,
) -> bool {
    tokio::time::sleep(delay).await;
    session.write().await.complete_processing(ticket, Utc::now())
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub session_id: SessionId,
    pub step: usize,
    pub steps: Vec<WizardStep>,
    pub phase: WizardPhase,
    pub processing: bool,
    pub show_results: bool,
    pub files: Vec<UploadedFile>,
    pub documents: Vec<DocumentRow>,
    pub fields: Vec<FieldRow>,
}
