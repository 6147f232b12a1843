use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::config::TranscriptionConfig;
use crate::transcribe::backend::{TranscriptionBackend, TranscriptionError};

pub struct AssemblyAiBackend {
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for AssemblyAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyAiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl AssemblyAiBackend {
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        let api_key = if config.api_key.is_empty() {
            std::env::var("VOICEBATCH_ASSEMBLYAI_KEY").map_err(|_| {
                anyhow::anyhow!(
                    "Transcription API key not configured. \
                     Set [transcription] api_key or VOICEBATCH_ASSEMBLYAI_KEY"
                )
            })?
        } else {
            config.api_key.clone()
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            client,
        })
    }

    /// Upload the raw audio bytes; returns the service-side URL of the upload.
    fn upload(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let bytes = std::fs::read(audio_path).map_err(|source| TranscriptionError::ReadAudio {
            path: audio_path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            "Uploading {} ({} bytes) for transcription",
            audio_path.display(),
            bytes.len()
        );

        let response = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()?;
        let body = read_json(response)?;

        body["upload_url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TranscriptionError::InvalidResponse("missing upload_url".to_string()))
    }

    /// Create a transcript job for an uploaded file; returns the job id.
    fn create_job(&self, upload_url: &str) -> Result<String, TranscriptionError> {
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&serde_json::json!({ "audio_url": upload_url }))
            .send()?;
        let body = read_json(response)?;

        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TranscriptionError::InvalidResponse("missing job id".to_string()))
    }

    /// Poll the job until it completes or fails. No overall deadline; the
    /// per-request timeout is the only bound.
    fn poll_job(&self, job_id: &str) -> Result<String, TranscriptionError> {
        loop {
            let response = self
                .client
                .get(format!("{}/v2/transcript/{}", self.base_url, job_id))
                .header("authorization", &self.api_key)
                .send()?;
            let body = read_json(response)?;

            match body["status"].as_str() {
                Some("completed") => {
                    return body["text"]
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            TranscriptionError::InvalidResponse(
                                "completed job has no text".to_string(),
                            )
                        });
                }
                Some("error") => {
                    let message = body["error"].as_str().unwrap_or("unknown error");
                    return Err(TranscriptionError::JobFailed(message.to_string()));
                }
                Some(_) => {
                    tracing::debug!("Transcript job {} still processing", job_id);
                    std::thread::sleep(self.poll_interval);
                }
                None => {
                    return Err(TranscriptionError::InvalidResponse(
                        "missing job status".to_string(),
                    ));
                }
            }
        }
    }
}

impl TranscriptionBackend for AssemblyAiBackend {
    fn name(&self) -> &str {
        "assemblyai"
    }

    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let upload_url = self.upload(audio_path)?;
        let job_id = self.create_job(&upload_url)?;
        self.poll_job(&job_id)
    }
}

fn read_json(
    response: reqwest::blocking::Response,
) -> Result<serde_json::Value, TranscriptionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .unwrap_or_else(|_| "unable to read response body".to_string());
        return Err(TranscriptionError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json()?)
}
