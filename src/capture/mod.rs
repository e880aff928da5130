//! Display capture acquisition and teardown.
//!
//! The controller is a linear Idle -> Capturing -> Idle machine. At most one
//! capture exists at a time and this controller is its sole owner; the
//! recording controller only ever borrows the stream.


use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::error::CaptureError;
use crate::platform::{
    AudioConstraints, CaptureId, CaptureStream, CursorMode, DisplayMediaError, DisplayMediaHost,
    PlatformEvent, StreamConstraints, StreamSettings,
};

/// Capture quality settings chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Requested frames per second.
    pub frame_rate: u32,
    /// Requested video track height; width follows at 16:9.
    pub target_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            target_height: 720,
        }
    }
}

impl CaptureConfig {
    /// Clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.frame_rate = self.frame_rate.clamp(10, 60);
        self.target_height = self.target_height.clamp(480, 2160);
    }

    /// Width preference derived from the target height at 16:9.
    pub fn ideal_width(&self) -> u32 {
        self.target_height * 16 / 9
    }

    /// The constraint set sent to the display media host.
    pub fn constraints(&self) -> StreamConstraints {
        StreamConstraints {
            cursor: CursorMode::Always,
            frame_rate: self.frame_rate,
            height: self.target_height,
            ideal_width: self.ideal_width(),
            audio: AudioConstraints {
                echo_cancellation: true,
                noise_suppression: true,
                sample_rate: 44_100,
            },
        }
    }
}

/// Negotiated description of the live capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub device_label: String,
}

impl From<StreamSettings> for StreamInfo {
    fn from(s: StreamSettings) -> Self {
        Self {
            width: s.width,
            height: s.height,
            frame_rate: s.frame_rate,
            device_label: s.device_label,
        }
    }
}

impl std::fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} @ {} FPS ({})",
            self.width, self.height, self.frame_rate, self.device_label
        )
    }
}

/// The one live capture.
pub struct CaptureHandle {
    id: CaptureId,
    stream: Box<dyn CaptureStream>,
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl CaptureHandle {
    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub fn stream(&self) -> &dyn CaptureStream {
        self.stream.as_ref()
    }
}

/// Acquires and releases the shared display stream; owns the capture
/// configuration.
pub struct CaptureController {
    config: CaptureConfig,
    active: Option<CaptureHandle>,
    next_capture_id: CaptureId,
    request_in_flight: bool,
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            config: CaptureConfig::default(),
            active: None,
            next_capture_id: 1,
            request_in_flight: false,
        }
    }

    /// The configuration the next capture starts with.
    pub fn config(&self) -> CaptureConfig {
        self.config
    }

    /// Replace the configuration, clamping it to valid ranges. Takes
    /// effect at the next start.
    pub fn set_config(&mut self, mut config: CaptureConfig) {
        config.validate();
        self.config = config;
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// The active capture, if any.
    pub fn active(&self) -> Option<&CaptureHandle> {
        self.active.as_ref()
    }

    /// Acquire a display-plus-audio stream with the owned configuration.
    ///
    /// Requires a signed-in session. A second call while a request is
    /// outstanding or a capture is live is rejected; callers sequence
    /// stop-then-start for restarts.
    pub fn start(
        &mut self,
        session: Option<&Session>,
        display: &mut dyn DisplayMediaHost,
        events: &Sender<PlatformEvent>,
    ) -> Result<&CaptureHandle, CaptureError> {
        if session.is_none() {
            return Err(CaptureError::NotAuthenticated);
        }
        if self.request_in_flight || self.active.is_some() {
            return Err(CaptureError::RequestPending);
        }
        let config = self.config;

        self.request_in_flight = true;
        let result = display.request_capture(&config.constraints());
        self.request_in_flight = false;

        let mut stream = result.map_err(|err| match err {
            DisplayMediaError::Unsupported => CaptureError::Unsupported,
            DisplayMediaError::Denied(reason) => CaptureError::Denied(reason),
        })?;

        let id = self.next_capture_id;
        self.next_capture_id += 1;
        stream.set_ended_notifier(events.clone(), id);

        let settings = stream.settings();
        log::info!(
            "capture {} started: {}x{} @ {} fps ({})",
            id,
            settings.width,
            settings.height,
            settings.frame_rate,
            settings.device_label
        );

        Ok(&*self.active.insert(CaptureHandle { id, stream }))
    }

    /// Release all tracks and return to Idle. Safe to call when already
    /// Idle.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.stream.stop_tracks();
            log::info!("capture {} stopped", handle.id);
        }
    }

    /// Describe the negotiated stream.
    pub fn describe(&self) -> Result<StreamInfo, CaptureError> {
        self.active
            .as_ref()
            .map(|handle| StreamInfo::from(handle.stream.settings()))
            .ok_or(CaptureError::NoActiveCapture)
    }

    /// Whether a notification with this id belongs to the live capture.
    /// Notifications from a torn-down capture must be discarded.
    pub fn is_current(&self, capture_id: CaptureId) -> bool {
        self.active
            .as_ref()
            .map(|handle| handle.id == capture_id)
            .unwrap_or(false)
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}
