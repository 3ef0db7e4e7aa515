use super::multipart::MultipartForm;
use super::transport::{FrameTransport, UploadReceipt};
use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

/// In-memory transport that records what it was asked to send
#[derive(Default)]
pub struct MockTransport {
    uploads: Mutex<Vec<u64>>,
    bodies: Mutex<Vec<Vec<u8>>>,
    failing: Mutex<HashSet<u64>>,
    delays: Mutex<Vec<(u64, Duration)>>,
    audio: Vec<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(audio: &[u8]) -> Self {
        Self {
            audio: audio.to_vec(),
            ..Self::default()
        }
    }

    /// Fail the upload of frame `sequence`
    pub fn fail_frame(&self, sequence: u64) {
        self.failing.lock().insert(sequence);
    }

    /// Hold the upload of frame `sequence` for `delay`
    pub fn delay_frame(&self, sequence: u64, delay: Duration) {
        self.delays.lock().push((sequence, delay));
    }

    /// Sequences whose upload completed, in completion order
    pub fn uploaded(&self) -> Vec<u64> {
        self.uploads.lock().clone()
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.bodies.lock().len()
    }
}

#[async_trait]
impl FrameTransport for MockTransport {
    async fn upload_frame(
        &self,
        sequence: u64,
        form: MultipartForm,
    ) -> Result<UploadReceipt, TransportError> {
        self.bodies.lock().push(form.body().to_vec());

        let delay = self
            .delays
            .lock()
            .iter()
            .find(|(seq, _)| *seq == sequence)
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&sequence) {
            return Err(TransportError::Status {
                url: "mock://upload-frame".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }

        self.uploads.lock().push(sequence);
        Ok(UploadReceipt {
            message: Some("ok".to_string()),
            scene_description: Some(format!("frame {}", sequence)),
            audio_path: None,
        })
    }

    async fn fetch_audio(&self) -> Result<Vec<u8>, TransportError> {
        Ok(self.audio.clone())
    }
}
