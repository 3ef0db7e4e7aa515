use super::multipart::MultipartForm;
use crate::config::UploadConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, trace};

/// Largest audio clip accepted from the server
const MAX_AUDIO_BYTES: u64 = 16 * 1024 * 1024;

/// Longest error body kept in a `TransportError::Status`
const MAX_ERROR_BODY: usize = 512;

/// Server reply to a frame upload. Every field is optional; a body that is not
/// JSON still counts as a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub scene_description: Option<String>,
    #[serde(default)]
    pub audio_path: Option<String>,
}

impl UploadReceipt {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(receipt) => receipt,
            Err(e) => {
                debug!("Upload response is not a receipt ({}), ignoring body", e);
                Self::default()
            }
        }
    }
}

/// Where encoded frames go
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// POST one multipart frame upload
    async fn upload_frame(
        &self,
        sequence: u64,
        form: MultipartForm,
    ) -> Result<UploadReceipt, TransportError>;

    /// Download the most recent narration clip
    async fn fetch_audio(&self) -> Result<Vec<u8>, TransportError>;
}

/// Blocking `ureq` agent driven from tokio's blocking pool
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    upload_url: String,
    audio_url: String,
}

impl HttpTransport {
    pub fn new(config: &UploadConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();

        Self {
            agent,
            upload_url: join_url(&config.base_url, &config.upload_path),
            audio_url: join_url(&config.base_url, &config.audio_path),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }
}

#[async_trait]
impl FrameTransport for HttpTransport {
    async fn upload_frame(
        &self,
        sequence: u64,
        form: MultipartForm,
    ) -> Result<UploadReceipt, TransportError> {
        let agent = self.agent.clone();
        let url = self.upload_url.clone();

        tokio::task::spawn_blocking(move || {
            trace!("POST {} ({} bytes) for frame {}", url, form.len(), sequence);
            let response = check_status(
                &url,
                agent
                    .post(&url)
                    .set("Content-Type", &form.content_type())
                    .send_bytes(form.body()),
            )?;

            // Any 2xx counts as delivered; the receipt is informational
            match response.into_string() {
                Ok(body) => Ok(UploadReceipt::from_body(&body)),
                Err(e) => {
                    debug!("Unreadable upload response from {} ({}), ignoring body", url, e);
                    Ok(UploadReceipt::default())
                }
            }
        })
        .await
        .map_err(|e| TransportError::Task {
            details: e.to_string(),
        })?
    }

    async fn fetch_audio(&self) -> Result<Vec<u8>, TransportError> {
        let agent = self.agent.clone();
        let url = self.audio_url.clone();

        tokio::task::spawn_blocking(move || {
            let response = check_status(&url, agent.post(&url).call())?;

            let mut audio = Vec::new();
            response
                .into_reader()
                .take(MAX_AUDIO_BYTES)
                .read_to_end(&mut audio)
                .map_err(|e| TransportError::Response {
                    url: url.clone(),
                    details: e.to_string(),
                })?;

            debug!("Fetched {} bytes of audio from {}", audio.len(), url);
            Ok(audio)
        })
        .await
        .map_err(|e| TransportError::Task {
            details: e.to_string(),
        })?
    }
}

/// Turn a ureq outcome into a 2xx response or a `TransportError`
fn check_status(
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, TransportError> {
    match result {
        Ok(response) if (200..300).contains(&response.status()) => Ok(response),
        Ok(response) | Err(ureq::Error::Status(_, response)) => {
            let status = response.status();
            let mut body = response.into_string().unwrap_or_default();
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            Err(TransportError::Status {
                url: url.to_string(),
                status,
                body,
            })
        }
        Err(e) => Err(TransportError::Request {
            url: url.to_string(),
            details: e.to_string(),
        }),
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
