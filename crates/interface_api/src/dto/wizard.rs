//! Upload wizard DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_claims::UploadedFile;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct FileDescriptor {
    #[validate(length(min = 1, max = 255, message = "file name must be 1-255 characters"))]
    pub name: String,
    pub size: u64,
}

/// Replaces the selected file list of a session
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SelectFilesRequest {
    #[validate(nested)]
    pub files: Vec<FileDescriptor>,
}

impl SelectFilesRequest {
    pub fn into_files(self) -> Vec<UploadedFile> {
        self.files
            .into_iter()
            .map(|f| UploadedFile::new(f.name, f.size))
            .collect()
    }
}
