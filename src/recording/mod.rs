//! Recording the active capture into a downloadable artifact.
//!
//! The controller borrows the capture stream, buffers emitted data segments
//! in arrival order, and on stop assembles them into one artifact handed to
//! the download sink. The chunk buffer is cleared when the next recording
//! starts, not at stop.

#[cfg(test)]
mod tests;

use chrono::{DateTime, SecondsFormat, Utc};
use crossbeam_channel::Receiver;

use crate::auth::Session;
use crate::capture::CaptureHandle;
use crate::error::RecordingError;
use crate::platform::{CodecProfile, DownloadSink, MediaRecorder, RecorderHost};
use crate::storage::generate_id;

/// Observable recording state. Stopped is the flushed-but-not-reused phase
/// between stop and the next start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Stopped,
}

/// A finalized recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub data: Vec<u8>,
}

struct RecordingSession {
    id: String,
    username: String,
    recorder: Box<dyn MediaRecorder>,
    segments: Receiver<Vec<u8>>,
    chunks: Vec<Vec<u8>>,
    state: RecordingState,
    started_at: DateTime<Utc>,
}

/// Consumes the active capture stream and produces downloadable artifacts.
pub struct RecordingController {
    current: Option<RecordingSession>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn state(&self) -> RecordingState {
        self.current
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(RecordingState::Idle)
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Buffered chunk count of the current session.
    pub fn chunk_count(&self) -> usize {
        self.current.as_ref().map(|s| s.chunks.len()).unwrap_or(0)
    }

    /// Start recording the given capture. Clears any previously buffered
    /// chunks.
    pub fn start(
        &mut self,
        session: Option<&Session>,
        capture: Option<&CaptureHandle>,
        recorder_host: &mut dyn RecorderHost,
    ) -> Result<(), RecordingError> {
        let session = session.ok_or(RecordingError::NotAuthenticated)?;
        let capture = capture.ok_or(RecordingError::NoActiveCapture)?;

        if let Some(previous) = self.current.take() {
            if previous.state == RecordingState::Recording {
                // The lifecycle controller gates this path; if it is hit
                // anyway the superseded recorder must not keep running.
                log::warn!("recording {} replaced while still running", previous.id);
                let mut recorder = previous.recorder;
                recorder.stop();
            }
        }

        let profile = CodecProfile::webm_vp9();
        let parts = recorder_host
            .create_recorder(capture.stream(), &profile)
            .map_err(RecordingError::RecorderUnsupported)?;

        let mut recorder = parts.recorder;
        recorder.start();

        let id = generate_id();
        log::info!("recording {} started for '{}'", id, session.username);

        self.current = Some(RecordingSession {
            id,
            username: session.username.clone(),
            recorder,
            segments: parts.segments,
            chunks: Vec::new(),
            state: RecordingState::Recording,
            started_at: Utc::now(),
        });
        Ok(())
    }

    /// Drain emitted data segments into the chunk buffer, preserving
    /// arrival order and skipping empty segments.
    pub fn poll_segments(&mut self) {
        if let Some(session) = &mut self.current {
            for segment in session.segments.try_iter() {
                if !segment.is_empty() {
                    session.chunks.push(segment);
                }
            }
        }
    }

    /// Stop and finalize. No-op returning `None` unless currently
    /// Recording; otherwise assembles the buffered chunks into an artifact,
    /// hands it to the download sink and reports it back.
    pub fn stop(&mut self, downloads: &mut dyn DownloadSink) -> Option<Artifact> {
        let session = self.current.as_mut()?;
        if session.state != RecordingState::Recording {
            return None;
        }

        // Flush: stop the recorder first so the final segment is emitted,
        // then drain before assembling.
        session.recorder.stop();
        session.state = RecordingState::Stopped;
        for segment in session.segments.try_iter() {
            if !segment.is_empty() {
                session.chunks.push(segment);
            }
        }

        let data: Vec<u8> = session.chunks.concat();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let filename = format!(
            "{}-screen-recording-{}.{}",
            session.username,
            timestamp,
            CodecProfile::webm_vp9().extension
        );

        let duration = Utc::now() - session.started_at;
        log::info!(
            "recording {} stopped: {} chunks, {} bytes, {:.1}s",
            session.id,
            session.chunks.len(),
            data.len(),
            duration.num_milliseconds() as f64 / 1000.0
        );

        let artifact = Artifact { filename, data };
        if let Err(err) = downloads.save(&artifact.filename, &artifact.data) {
            log::error!("could not save recording {}: {}", session.id, err);
        }
        Some(artifact)
    }
}

impl Default for RecordingController {
    fn default() -> Self {
        Self::new()
    }
}
