//! Session lifecycle: the composition root.
//!
//! One controller owns the session, the capture handle and the platform
//! capabilities, and sequences every cross-cutting transition: auth gating,
//! capture acquisition/teardown, recording start/stop and fullscreen
//! presentation. Sub-controllers never call each other; all ordering runs
//! through here.

#[cfg(test)]
mod tests;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::auth::{Session, SessionAuthenticator};
use crate::capture::{CaptureConfig, CaptureController, StreamInfo};
use crate::error::{AuthError, CaptureError, PresentationError, RecordingError};
use crate::platform::{event_channel, Platform, PlatformEvent};
use crate::presentation::PresentationController;
use crate::recording::{Artifact, RecordingController, RecordingState};
use crate::storage::StateStore;

/// Aggregate status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    NotSharing,
    Sharing,
    Recording,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NotSharing => write!(f, "Not sharing"),
            Status::Sharing => write!(f, "Sharing"),
            Status::Recording => write!(f, "Recording..."),
            Status::Error => write!(f, "Error"),
        }
    }
}

/// Capability flags a presentation layer reads to enable its controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    pub can_start: bool,
    pub can_stop: bool,
    pub can_record: bool,
    pub can_stop_record: bool,
    pub can_fullscreen: bool,
}

/// Composes the sub-controllers and enforces the cross-component
/// invariants.
pub struct SessionLifecycleController {
    auth: SessionAuthenticator,
    capture: CaptureController,
    recording: RecordingController,
    presentation: PresentationController,
    platform: Platform,
    events_tx: Sender<PlatformEvent>,
    events_rx: Receiver<PlatformEvent>,
    status: Status,
    info: String,
}

impl SessionLifecycleController {
    /// Build the controller over a state store and a platform capability
    /// set, restoring any persisted session.
    pub fn new(store: Box<dyn StateStore>, mut platform: Platform) -> Self {
        let (events_tx, events_rx) = event_channel();
        platform.fullscreen.set_change_notifier(events_tx.clone());

        let mut auth = SessionAuthenticator::new(store);
        auth.restore_session();

        Self {
            auth,
            capture: CaptureController::new(),
            recording: RecordingController::new(),
            presentation: PresentationController::new(),
            platform,
            events_tx,
            events_rx,
            status: Status::NotSharing,
            info: String::new(),
        }
    }

    // ── Display hooks ───────────────────────────────────────────────

    pub fn status(&self) -> Status {
        self.status
    }

    /// Detail line next to the status: stream description while sharing,
    /// error detail on failure, guidance otherwise.
    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn controls(&self) -> Controls {
        let signed_in = self.auth.is_authenticated();
        let capturing = self.capture.is_capturing();
        let recording = self.recording.is_recording();
        Controls {
            can_start: signed_in && !capturing,
            can_stop: capturing,
            can_record: signed_in && capturing && !recording,
            can_stop_record: recording,
            can_fullscreen: capturing,
        }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.auth.current().map(|s| s.username.as_str())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.presentation.is_fullscreen()
    }

    /// The fullscreen overlay, present only while fullscreen.
    pub fn overlay(&self) -> Option<&crate::presentation::Overlay> {
        self.presentation.overlay()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    /// Negotiated description of the live capture.
    pub fn stream_info(&self) -> Result<StreamInfo, CaptureError> {
        self.capture.describe()
    }

    /// The quality settings the next capture starts with.
    pub fn capture_config(&self) -> CaptureConfig {
        self.capture.config()
    }

    // ── Authentication ──────────────────────────────────────────────

    pub fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        match self.auth.register(username, password) {
            Ok(()) => {
                self.info = "Registration succeeded, sign in to continue".to_string();
                Ok(())
            }
            Err(err) => {
                self.show_error(&err);
                Err(err)
            }
        }
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<Session, AuthError> {
        match self.auth.login(username, password) {
            Ok(session) => {
                self.info.clear();
                Ok(session)
            }
            Err(err) => {
                self.show_error(&err);
                Err(err)
            }
        }
    }

    /// Sign out. An active capture is fully stopped first, recording
    /// teardown included, before the session is cleared.
    pub fn logout(&mut self) {
        if self.capture.is_capturing() {
            self.stop_capture();
        }
        self.auth.logout();
    }

    // ── Capture ─────────────────────────────────────────────────────

    /// Start sharing with the given quality settings.
    pub fn start_capture(&mut self, config: CaptureConfig) -> Result<StreamInfo, CaptureError> {
        self.capture.set_config(config);
        self.start_capture_with_current_config()
    }

    fn start_capture_with_current_config(&mut self) -> Result<StreamInfo, CaptureError> {
        match self.capture.start(
            self.auth.current(),
            self.platform.display.as_mut(),
            &self.events_tx,
        ) {
            Ok(_) => {
                let info = self.capture.describe()?;
                self.status = Status::Sharing;
                self.info = match self.current_user() {
                    Some(username) => format!("user: {} | {}", username, info),
                    None => info.to_string(),
                };
                Ok(info)
            }
            Err(err) => {
                self.show_error(&err);
                Err(err)
            }
        }
    }

    /// Stop sharing. Forces any active recording through its stop (artifact
    /// flushed) before the capture is released, then leaves fullscreen.
    pub fn stop_capture(&mut self) {
        if self.recording.is_recording() {
            log::info!("stopping capture: forcing active recording to stop first");
            self.recording.stop(self.platform.downloads.as_mut());
        }

        self.capture.stop();

        if self.presentation.is_fullscreen() {
            self.presentation.exit(self.platform.fullscreen.as_mut());
        }

        self.status = Status::NotSharing;
        self.info.clear();
    }

    /// Apply new quality settings. While capturing this restarts the
    /// capture stop-then-start, which terminates any in-progress recording;
    /// while idle it only updates the configuration for the next start.
    pub fn update_quality(&mut self, config: CaptureConfig) -> Result<(), CaptureError> {
        self.capture.set_config(config);
        if self.capture.is_capturing() {
            self.stop_capture();
            self.start_capture_with_current_config()?;
        }
        Ok(())
    }

    // ── Recording ───────────────────────────────────────────────────

    pub fn start_recording(&mut self) -> Result<(), RecordingError> {
        match self.recording.start(
            self.auth.current(),
            self.capture.active(),
            self.platform.recorder.as_mut(),
        ) {
            Ok(()) => {
                self.status = Status::Recording;
                Ok(())
            }
            Err(err) => {
                self.show_error(&err);
                Err(err)
            }
        }
    }

    /// Stop recording and hand the artifact to the download side-channel.
    /// No-op when not recording.
    pub fn stop_recording(&mut self) -> Option<Artifact> {
        let artifact = self.recording.stop(self.platform.downloads.as_mut())?;
        if self.capture.is_capturing() {
            self.status = Status::Sharing;
        }
        Some(artifact)
    }

    // ── Presentation ────────────────────────────────────────────────

    /// Enter fullscreen. Only available while a capture is active.
    pub fn enter_fullscreen(&mut self) -> Result<(), PresentationError> {
        if !self.capture.is_capturing() {
            return Err(PresentationError::Rejected(
                "no active capture to present".to_string(),
            ));
        }
        let username = self.auth.current().map(|s| s.username.clone());
        let result = self
            .presentation
            .enter(username.as_deref(), self.platform.fullscreen.as_mut());
        if let Err(err) = &result {
            // Fullscreen failures leave the session usable; report only.
            log::warn!("{}", err);
            self.info = err.to_string();
        }
        result
    }

    pub fn exit_fullscreen(&mut self) {
        self.presentation.exit(self.platform.fullscreen.as_mut());
    }

    pub fn toggle_fullscreen(&mut self) -> Result<(), PresentationError> {
        if self.presentation.is_fullscreen() {
            self.exit_fullscreen();
            Ok(())
        } else {
            self.enter_fullscreen()
        }
    }

    /// Escape key convenience: exits fullscreen when fullscreen.
    pub fn handle_escape(&mut self) {
        self.presentation
            .handle_escape(self.platform.fullscreen.as_mut());
    }

    // ── Platform events ─────────────────────────────────────────────

    /// Drain queued platform notifications and recorder segments. Call
    /// from the host's event loop tick.
    pub fn pump_events(&mut self) {
        self.recording.poll_segments();

        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                PlatformEvent::TrackEnded { capture_id } => {
                    if self.capture.is_current(capture_id) {
                        // Device or OS ended the stream: same path as a
                        // manual stop, cascades included.
                        log::info!("capture {} ended externally", capture_id);
                        self.stop_capture();
                    } else {
                        log::debug!("stale ended notification for capture {}", capture_id);
                    }
                }
                PlatformEvent::FullscreenChanged { fullscreen } => {
                    let username = self.auth.current().map(|s| s.username.clone());
                    self.presentation
                        .handle_fullscreen_changed(fullscreen, username.as_deref());
                }
            }
        }
    }

    fn show_error(&mut self, err: &dyn std::fmt::Display) {
        self.status = Status::Error;
        self.info = err.to_string();
    }
}
