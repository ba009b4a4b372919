//! Upload validation and summaries

use crate::error::{Result, StudyGuideError};

/// Default upload limit: 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A file attachment handed over by the chat platform
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read an upload from a local file
    pub async fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { filename, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check size, extension and encoding; returns the decoded text
pub fn validate_upload(upload: &Upload, max_bytes: u64) -> Result<String> {
    if upload.size() > max_bytes {
        return Err(StudyGuideError::FileTooLarge { max_bytes });
    }

    if !crate::utils::is_text_file(&upload.filename) {
        return Err(StudyGuideError::UnsupportedFileType(upload.filename.clone()));
    }

    String::from_utf8(upload.bytes.clone()).map_err(|_| StudyGuideError::InvalidEncoding)
}

/// Short description of an uploaded knowledge base
pub fn summarize(content: &str) -> String {
    let lines: Vec<&str> = content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return "Empty file".to_string();
    };

    let mut parts = Vec::new();

    if lines.iter().any(|line| line.starts_with('#')) {
        parts.push("Contains headers/sections");
    }
    if lines.iter().any(|line| line.contains('?')) {
        parts.push("Contains questions");
    }
    if lines
        .iter()
        .any(|line| line.starts_with('-') || line.starts_with('*') || line.starts_with('•'))
    {
        parts.push("Contains bullet points");
    }

    parts.push(match lines.len() {
        n if n > 100 => "Large document",
        n if n > 20 => "Medium document",
        _ => "Small document",
    });

    format!(
        "{}\n\nPreview: {}",
        parts.join(", "),
        crate::utils::truncate_chars(first, 100)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_utf8_text() {
        let upload = Upload::new("cafe.txt", "Wifi: cafe123 ☕".as_bytes().to_vec());
        assert_eq!(validate_upload(&upload, DEFAULT_MAX_UPLOAD_BYTES).unwrap(), "Wifi: cafe123 ☕");
    }

    #[test]
    fn test_rejects_large_file_first() {
        let upload = Upload::new("big.pdf", vec![b'a'; 11]);
        assert!(matches!(
            validate_upload(&upload, 10),
            Err(StudyGuideError::FileTooLarge { max_bytes: 10 })
        ));
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let upload = Upload::new("notes.md", b"# notes".to_vec());
        assert!(matches!(
            validate_upload(&upload, DEFAULT_MAX_UPLOAD_BYTES),
            Err(StudyGuideError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let upload = Upload::new("latin1.txt", vec![0x43, 0x61, 0x66, 0xe9]);
        assert!(matches!(
            validate_upload(&upload, DEFAULT_MAX_UPLOAD_BYTES),
            Err(StudyGuideError::InvalidEncoding)
        ));
    }

    #[test]
    fn test_summary_patterns() {
        let content = "# Cafe Guide\n\n- Opens 9am\nWhere is the wifi?\n";
        assert_eq!(
            summarize(content),
            "Contains headers/sections, Contains questions, Contains bullet points, Small document\n\nPreview: # Cafe Guide"
        );
    }

    #[test]
    fn test_summary_size_classes() {
        let medium = "line\n".repeat(21);
        assert!(summarize(&medium).starts_with("Medium document"));

        let large = "line\n".repeat(101);
        assert!(summarize(&large).starts_with("Large document"));

        assert_eq!(summarize("  \n\n"), "Empty file");
    }

    #[test]
    fn test_summary_preview_is_cut() {
        let long_line = "x".repeat(150);
        assert!(summarize(&long_line).ends_with(&format!("{}...", "x".repeat(100))));
    }
}
