//! Raw text loading for contract documents

use crate::error::ExtractorError;
use std::path::Path;
use tracing::debug;

/// Document formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// UTF-8 text, including markdown
    Text,
    /// PDF with a text layer
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from the extension, falling back to the file header
    pub fn detect(path: &Path, bytes: &[u8]) -> Self {
        let is_pdf_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf_extension || bytes.starts_with(b"%PDF-") {
            DocumentFormat::Pdf
        } else {
            DocumentFormat::Text
        }
    }
}

/// Load the text of a document
///
/// Fails with an input error when the path does not exist.
pub async fn load_document(path: &Path) -> Result<String, ExtractorError> {
    if !path.exists() {
        return Err(ExtractorError::Input(format!(
            "Document not found: {}",
            path.display()
        )));
    }

    let load_error = |reason: String| ExtractorError::Load {
        path: path.display().to_string(),
        reason,
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| load_error(e.to_string()))?;
    let format = DocumentFormat::detect(path, &bytes);
    debug!("Loading {} ({:?}, {} bytes)", path.display(), format, bytes.len());

    let text = match format {
        DocumentFormat::Pdf => {
            // PDF text extraction is CPU-bound
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| load_error(e.to_string()))?
                .map_err(|e| load_error(e.to_string()))?
        }
        DocumentFormat::Text => {
            String::from_utf8(bytes).map_err(|_| load_error("not valid UTF-8 text".to_string()))?
        }
    };

    if text.trim().is_empty() {
        return Err(load_error("no extractable text".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            DocumentFormat::detect(Path::new("msa.PDF"), b""),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::detect(Path::new("upload.bin"), b"%PDF-1.7\n"),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::detect(Path::new("contract.md"), b"# Terms"),
            DocumentFormat::Text
        );
    }

    #[tokio::test]
    async fn test_load_text_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contract.txt");
        std::fs::write(&path, "Uptime shall be at least 99.9%.").unwrap();
        let text = load_document(&path).await.unwrap();
        assert_eq!(text, "Uptime shall be at least 99.9%.");
    }

    #[tokio::test]
    async fn test_missing_document_is_input_error() {
        let result = load_document(Path::new("/nonexistent/contract.pdf")).await;
        assert!(matches!(result, Err(ExtractorError::Input(_))));
    }

    #[tokio::test]
    async fn test_empty_and_binary_documents_fail() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "  \n").unwrap();
        assert!(matches!(
            load_document(&empty).await,
            Err(ExtractorError::Load { .. })
        ));

        let binary = dir.path().join("blob.dat");
        std::fs::write(&binary, [0xff, 0xfe, 0x00, 0x81]).unwrap();
        assert!(matches!(
            load_document(&binary).await,
            Err(ExtractorError::Load { .. })
        ));
    }
}
