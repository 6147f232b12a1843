use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("failed to read audio file {path}: {source}")]
    ReadAudio {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transcription service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transcription job failed: {0}")]
    JobFailed(String),
    #[error("unexpected response from transcription service: {0}")]
    InvalidResponse(String),
}

/// A hosted speech-to-text service. Implementations take a path to
/// normalized audio and return the transcript text, or fail. Failures
/// are not retried anywhere; they abort the batch.
pub trait TranscriptionBackend: Send + Sync {
    fn name(&self) -> &str;
    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}
