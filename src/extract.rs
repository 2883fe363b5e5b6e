use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{error, info};
use serde::Deserialize;
use thiserror::Error;

/// Recognised document kinds, dispatched by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Docx,
    Image,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "webp" | "tif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Plain text recovered from a document, one string per page. Sources
/// without a page structure come back as a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }

    /// Full-document flattening for consumers that narrate straight
    /// through without page navigation.
    pub fn flatten(&self) -> String {
        self.pages.join("\n")
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported document type: {0}")]
    Unsupported(PathBuf),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("importer command is empty or unparseable: {0}")]
    BadCommand(String),
    #[error("failed to launch importer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("importer exited with status {status}: {stderr}")]
    ImporterFailed { status: i32, stderr: String },
    #[error("importer produced invalid output: {0}")]
    InvalidOutput(#[source] serde_json::Error),
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

/// Envelope printed by the importer helpers on stdout.
#[derive(Debug, Deserialize)]
struct ImporterOutput {
    ok: bool,
    #[serde(default)]
    pages: Vec<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// External text-extraction collaborator. Plain text is read directly;
/// every other kind is delegated to a helper command that receives the
/// file path as its final argument and prints a JSON envelope.
pub struct Extractor {
    pdf_command: String,
    docx_command: String,
    ocr_command: String,
}

impl Extractor {
    pub fn from_env() -> Self {
        Self {
            pdf_command: std::env::var("READER_IMPORT_PDF_COMMAND")
                .unwrap_or_else(|_| "python scripts/import_pdf.py".to_string()),
            docx_command: std::env::var("READER_IMPORT_DOCX_COMMAND")
                .unwrap_or_else(|_| "python scripts/import_docx.py".to_string()),
            ocr_command: std::env::var("READER_OCR_COMMAND")
                .unwrap_or_else(|_| "python scripts/ocr_image.py".to_string()),
        }
    }

    #[cfg(test)]
    fn with_commands(command: &str) -> Self {
        Self {
            pdf_command: command.to_string(),
            docx_command: command.to_string(),
            ocr_command: command.to_string(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<ExtractedDocument, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ExtractError::Unsupported(path.to_path_buf()))?;
        info!("extracting {:?} document {}", kind, path.display());

        match kind {
            DocumentKind::Text => {
                let text = fs::read_to_string(path)
                    .map_err(|err| ExtractError::Io(path.to_path_buf(), err))?;
                Ok(ExtractedDocument { pages: vec![text] })
            }
            DocumentKind::Pdf => self.run_importer(&self.pdf_command, path),
            DocumentKind::Docx => self.run_importer(&self.docx_command, path),
            DocumentKind::Image => self.run_importer(&self.ocr_command, path),
        }
    }

    fn run_importer(&self, raw_command: &str, path: &Path) -> Result<ExtractedDocument, ExtractError> {
        let mut parts = shlex::split(raw_command)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| ExtractError::BadCommand(raw_command.to_string()))?;
        let program = parts.remove(0);

        let output = Command::new(program)
            .args(parts)
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(ExtractError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let status = output.status.code().unwrap_or_default();
            error!("importer exited with status {status}: {stderr}");
            return Err(ExtractError::ImporterFailed { status, stderr });
        }

        let parsed: ImporterOutput =
            serde_json::from_slice(&output.stdout).map_err(ExtractError::InvalidOutput)?;
        if !parsed.ok {
            return Err(ExtractError::Rejected {
                code: parsed.code.unwrap_or_else(|| "IMPORT_FAILED".to_string()),
                message: parsed
                    .message
                    .unwrap_or_else(|| "importer rejected the document".to_string()),
            });
        }

        let pages = if !parsed.pages.is_empty() {
            parsed.pages
        } else {
            vec![parsed.text.unwrap_or_default()]
        };
        info!("imported {} page(s)", pages.len());
        Ok(ExtractedDocument { pages })
    }
}
