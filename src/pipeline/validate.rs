//! Upload validation: the gate every batch passes before extraction starts.
//!
//! Rules are checked in a fixed order and the first failure wins, so a
//! batch that is both too large and of the wrong type reports the same
//! error on every run.

use thiserror::Error;

use crate::config::{ALLOWED_MIME_TYPES, MAX_FILES, MAX_FILE_SIZE};

/// An uploaded document: immutable bytes plus the metadata that arrived
/// with them
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Errors reported by batch validation. Messages are shown to the user
/// verbatim.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Please select at least one file")]
    NoFilesSelected,

    #[error("Maximum {max} files allowed")]
    TooManyFiles { count: usize, max: usize },

    #[error("Unsupported file type: {file_name}. Only TXT and PDF files are supported.")]
    UnsupportedType { file_name: String, mime_type: String },

    #[error("File too large: {file_name}. Maximum size is {max_mb} MB.")]
    FileTooLarge {
        file_name: String,
        size_bytes: u64,
        max_mb: u64,
    },
}

/// Check a batch against count, type, and size limits.
///
/// Files are scanned in input order; within a file the type check runs
/// before the size check.
pub fn validate(files: &[UploadedFile]) -> Result<(), ValidationError> {
    if files.is_empty() {
        return Err(ValidationError::NoFilesSelected);
    }
    if files.len() > MAX_FILES {
        return Err(ValidationError::TooManyFiles {
            count: files.len(),
            max: MAX_FILES,
        });
    }
    for file in files {
        if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            return Err(ValidationError::UnsupportedType {
                file_name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            });
        }
        if file.size_bytes() > MAX_FILE_SIZE {
            return Err(ValidationError::FileTooLarge {
                file_name: file.name.clone(),
                size_bytes: file.size_bytes(),
                max_mb: MAX_FILE_SIZE / (1024 * 1024),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_file(name: &str, bytes: Vec<u8>) -> UploadedFile {
        UploadedFile::new(name, "text/plain", bytes)
    }

    #[test]
    fn empty_batch_rejected() {
        let err = validate(&[]).unwrap_err();
        assert!(matches!(err, ValidationError::NoFilesSelected));
        assert_eq!(err.to_string(), "Please select at least one file");
    }

    #[test]
    fn six_files_rejected() {
        let files: Vec<UploadedFile> = (0..6)
            .map(|i| text_file(&format!("f{i}.txt"), b"hello".to_vec()))
            .collect();
        let err = validate(&files).unwrap_err();
        assert!(matches!(err, ValidationError::TooManyFiles { count: 6, max: 5 }));
        assert_eq!(err.to_string(), "Maximum 5 files allowed");
    }

    #[test]
    fn five_files_of_99mb_accepted() {
        let files: Vec<UploadedFile> = (0..5)
            .map(|i| text_file(&format!("big{i}.txt"), vec![0u8; 99 * 1024 * 1024]))
            .collect();
        assert!(validate(&files).is_ok());
    }

    #[test]
    fn exactly_100mb_accepted() {
        let files = vec![text_file("edge.txt", vec![0u8; 100 * 1024 * 1024])];
        assert!(validate(&files).is_ok());
    }

    #[test]
    fn oversized_file_rejected_with_name() {
        let files = vec![
            text_file("ok.txt", b"fine".to_vec()),
            text_file("huge.txt", vec![0u8; 100 * 1024 * 1024 + 1]),
        ];
        let err = validate(&files).unwrap_err();
        match err {
            ValidationError::FileTooLarge { file_name, max_mb, .. } => {
                assert_eq!(file_name, "huge.txt");
                assert_eq!(max_mb, 100);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_mime_rejected_with_name() {
        let files = vec![UploadedFile::new("photo.png", "image/png", b"\x89PNG".to_vec())];
        let err = validate(&files).unwrap_err();
        match &err {
            ValidationError::UnsupportedType { file_name, mime_type } => {
                assert_eq!(file_name, "photo.png");
                assert_eq!(mime_type, "image/png");
            }
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Unsupported file type: photo.png. Only TXT and PDF files are supported."
        );
    }

    #[test]
    fn pdf_mime_accepted() {
        let files = vec![UploadedFile::new("doc.pdf", "application/pdf", b"%PDF-1.4".to_vec())];
        assert!(validate(&files).is_ok());
    }

    #[test]
    fn type_checked_before_size_for_same_file() {
        let files = vec![UploadedFile::new(
            "huge.bmp",
            "image/bmp",
            vec![0u8; 100 * 1024 * 1024 + 1],
        )];
        let err = validate(&files).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn zero_byte_file_passes_validation() {
        // Emptiness is an extraction concern, not a validation one
        let files = vec![text_file("empty.txt", Vec::new())];
        assert!(validate(&files).is_ok());
    }
}
