//! Plain-text extraction for uploaded files.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::ExtractorConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("temp file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns file content into searchable text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// `Ok(None)` when the type carries no extractable text.
    async fn extract(&self, content: &[u8], kind: &str) -> Result<Option<String>, ExtractError>;
}

/// PDFs go through an external `pdftotext`; `text/*` is decoded as UTF-8.
pub struct CommandExtractor {
    pdftotext_bin: String,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            pdftotext_bin: config.pdftotext_bin.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn pdf_to_text(&self, content: &[u8]) -> Result<String, ExtractError> {
        let input = scratch_file()?;
        tokio::fs::write(input.path(), content).await?;

        self.run_pdftotext(input.path()).await
    }

    async fn run_pdftotext(&self, input: &std::path::Path) -> Result<String, ExtractError> {
        let program = self.pdftotext_bin.clone();
        let child = Command::new(&program)
            .arg("-enc")
            .arg("UTF-8")
            .arg(input)
            .arg("-")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ExtractError::Spawn { program, source }),
            Err(_) => {
                return Err(ExtractError::Timeout {
                    program,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(ExtractError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Input file for the converter; removed on drop, including when the
/// extraction future is cancelled.
fn scratch_file() -> std::io::Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix("blobpad-extract-")
        .suffix(".pdf")
        .tempfile()
}

fn is_pdf(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("application/pdf")
}

fn is_text(kind: &str) -> bool {
    kind.get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("text/"))
}

#[async_trait]
impl TextExtractor for CommandExtractor {
    async fn extract(&self, content: &[u8], kind: &str) -> Result<Option<String>, ExtractError> {
        if is_pdf(kind) {
            let text = self.pdf_to_text(content).await?;
            debug!(bytes = content.len(), chars = text.len(), "Extracted PDF text");
            Ok(Some(text))
        } else if is_text(kind) {
            Ok(Some(String::from_utf8_lossy(content).into_owned()))
        } else {
            Ok(None)
        }
    }
}
