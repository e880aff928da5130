//! In-process mock platform.
//!
//! Grants every capability synchronously and exposes knobs to deny, report
//! unsupported, end tracks, flip fullscreen from outside the app, and feed
//! recorder segments. Tests and demos drive the whole lifecycle through it.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

use super::{
    CaptureId, CaptureStream, CodecProfile, DisplayMediaError, DisplayMediaHost, DownloadSink,
    FullscreenHost, FullscreenRequestError, MediaRecorder, Platform, PlatformEvent, RecorderHost,
    RecorderParts, RecorderState, StreamConstraints, StreamSettings,
};

/// How the mock display answers capture requests.
#[derive(Debug, Clone)]
enum GrantMode {
    Grant,
    Deny(String),
    Unsupported,
}

struct StreamInner {
    settings: StreamSettings,
    live: bool,
    notifier: Option<(Sender<PlatformEvent>, CaptureId)>,
}

struct DisplayInner {
    mode: GrantMode,
    device_label: String,
    last_constraints: Option<StreamConstraints>,
    current: Option<Arc<Mutex<StreamInner>>>,
}

/// Mock display media host. Clones share state.
#[derive(Clone)]
pub struct MockDisplay {
    inner: Arc<Mutex<DisplayInner>>,
}

impl MockDisplay {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DisplayInner {
                mode: GrantMode::Grant,
                device_label: "Mock Display 1".to_string(),
                last_constraints: None,
                current: None,
            })),
        }
    }

    /// Make the next requests fail as if the user cancelled the picker.
    pub fn deny(&self, reason: &str) {
        self.inner.lock().mode = GrantMode::Deny(reason.to_string());
    }

    /// Make the host report no capture capability at all.
    pub fn set_unsupported(&self) {
        self.inner.lock().mode = GrantMode::Unsupported;
    }

    /// Constraints of the most recent request, granted or not.
    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        self.inner.lock().last_constraints.clone()
    }

    /// Whether the most recently granted stream still has live tracks.
    pub fn stream_live(&self) -> bool {
        self.inner
            .lock()
            .current
            .as_ref()
            .map(|stream| stream.lock().live)
            .unwrap_or(false)
    }

    /// Simulate the device/OS ending the video track of the live stream.
    pub fn end_video_track(&self) {
        let stream = self.inner.lock().current.clone();
        if let Some(stream) = stream {
            let mut inner = stream.lock();
            if inner.live {
                inner.live = false;
                if let Some((events, capture_id)) = &inner.notifier {
                    let _ = events.send(PlatformEvent::TrackEnded {
                        capture_id: *capture_id,
                    });
                }
            }
        }
    }
}

impl DisplayMediaHost for MockDisplay {
    fn request_capture(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CaptureStream>, DisplayMediaError> {
        let mut inner = self.inner.lock();
        inner.last_constraints = Some(constraints.clone());

        match &inner.mode {
            GrantMode::Unsupported => Err(DisplayMediaError::Unsupported),
            GrantMode::Deny(reason) => Err(DisplayMediaError::Denied(reason.clone())),
            GrantMode::Grant => {
                // Negotiation: the mock grants exactly what was asked for,
                // honoring the ideal width.
                let stream = Arc::new(Mutex::new(StreamInner {
                    settings: StreamSettings {
                        width: constraints.ideal_width,
                        height: constraints.height,
                        frame_rate: constraints.frame_rate,
                        device_label: inner.device_label.clone(),
                    },
                    live: true,
                    notifier: None,
                }));
                inner.current = Some(Arc::clone(&stream));
                Ok(Box::new(MockStream { inner: stream }))
            }
        }
    }
}

struct MockStream {
    inner: Arc<Mutex<StreamInner>>,
}

impl CaptureStream for MockStream {
    fn settings(&self) -> StreamSettings {
        self.inner.lock().settings.clone()
    }

    fn is_live(&self) -> bool {
        self.inner.lock().live
    }

    fn stop_tracks(&mut self) {
        // A locally stopped track fires no ended notification.
        self.inner.lock().live = false;
    }

    fn set_ended_notifier(&mut self, events: Sender<PlatformEvent>, capture_id: CaptureId) {
        self.inner.lock().notifier = Some((events, capture_id));
    }
}

struct RecorderHostInner {
    supported: bool,
    feed: Option<Sender<Vec<u8>>>,
}

/// Mock recorder host. `emit_segment` feeds the most recent recorder.
#[derive(Clone)]
pub struct MockRecorderHost {
    inner: Arc<Mutex<RecorderHostInner>>,
}

impl MockRecorderHost {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecorderHostInner {
                supported: true,
                feed: None,
            })),
        }
    }

    /// Make recorder creation fail for any profile.
    pub fn set_unsupported(&self) {
        self.inner.lock().supported = false;
    }

    /// Emit one data segment from the active recorder.
    pub fn emit_segment(&self, data: &[u8]) {
        if let Some(feed) = &self.inner.lock().feed {
            let _ = feed.send(data.to_vec());
        }
    }
}

impl RecorderHost for MockRecorderHost {
    fn create_recorder(
        &mut self,
        _stream: &dyn CaptureStream,
        profile: &CodecProfile,
    ) -> Result<RecorderParts, String> {
        let mut inner = self.inner.lock();
        if !inner.supported {
            return Err(format!("no recorder available for {}", profile.mime_type));
        }
        let (tx, rx) = unbounded();
        inner.feed = Some(tx);
        Ok(RecorderParts {
            recorder: Box::new(MockRecorder {
                state: RecorderState::Inactive,
            }),
            segments: rx,
        })
    }
}

struct MockRecorder {
    state: RecorderState,
}

impl MediaRecorder for MockRecorder {
    fn start(&mut self) {
        self.state = RecorderState::Recording;
    }

    fn stop(&mut self) {
        self.state = RecorderState::Inactive;
    }

    fn state(&self) -> RecorderState {
        self.state
    }
}

struct FullscreenInner {
    supported: bool,
    reject: Option<String>,
    fullscreen: bool,
    notifier: Option<Sender<PlatformEvent>>,
}

impl FullscreenInner {
    fn notify(&self) {
        if let Some(events) = &self.notifier {
            let _ = events.send(PlatformEvent::FullscreenChanged {
                fullscreen: self.fullscreen,
            });
        }
    }
}

/// Mock fullscreen host. `force_exit` models an OS-level exit key.
#[derive(Clone)]
pub struct MockFullscreen {
    inner: Arc<Mutex<FullscreenInner>>,
}

impl MockFullscreen {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FullscreenInner {
                supported: true,
                reject: None,
                fullscreen: false,
                notifier: None,
            })),
        }
    }

    /// Make the host report no fullscreen capability.
    pub fn set_unsupported(&self) {
        self.inner.lock().supported = false;
    }

    /// Make fullscreen requests fail with the given reason.
    pub fn reject(&self, reason: &str) {
        self.inner.lock().reject = Some(reason.to_string());
    }

    /// Simulate the platform leaving fullscreen without this app asking.
    pub fn force_exit(&self) {
        let mut inner = self.inner.lock();
        if inner.fullscreen {
            inner.fullscreen = false;
            inner.notify();
        }
    }
}

impl FullscreenHost for MockFullscreen {
    fn request_fullscreen(&mut self) -> Result<(), FullscreenRequestError> {
        let mut inner = self.inner.lock();
        if !inner.supported {
            return Err(FullscreenRequestError::Unsupported);
        }
        if let Some(reason) = &inner.reject {
            return Err(FullscreenRequestError::Rejected(reason.clone()));
        }
        if !inner.fullscreen {
            inner.fullscreen = true;
            inner.notify();
        }
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), String> {
        let mut inner = self.inner.lock();
        if !inner.supported {
            return Err("no fullscreen capability".to_string());
        }
        if inner.fullscreen {
            inner.fullscreen = false;
            inner.notify();
        }
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.inner.lock().fullscreen
    }

    fn set_change_notifier(&mut self, events: Sender<PlatformEvent>) {
        self.inner.lock().notifier = Some(events);
    }
}

/// Download sink that records saves in memory.
#[derive(Clone, Default)]
pub struct MemoryDownloadSink {
    saves: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryDownloadSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filenames saved so far, in save order.
    pub fn saved_filenames(&self) -> Vec<String> {
        self.saves.lock().iter().map(|(name, _)| name.clone()).collect()
    }
}

impl DownloadSink for MemoryDownloadSink {
    fn save(&mut self, filename: &str, data: &[u8]) -> std::io::Result<()> {
        self.saves.lock().push((filename.to_string(), data.to_vec()));
        Ok(())
    }
}

/// The full mock capability set, with handles kept for the test.
#[derive(Clone)]
pub struct MockPlatform {
    pub display: MockDisplay,
    pub recorder: MockRecorderHost,
    pub fullscreen: MockFullscreen,
    pub downloads: MemoryDownloadSink,
}

impl MockPlatform {
    /// A platform that grants every request.
    pub fn always_granting() -> Self {
        Self {
            display: MockDisplay::new(),
            recorder: MockRecorderHost::new(),
            fullscreen: MockFullscreen::new(),
            downloads: MemoryDownloadSink::new(),
        }
    }

    /// Boxed capability set sharing this mock's state.
    pub fn platform(&self) -> Platform {
        Platform {
            display: Box::new(self.display.clone()),
            recorder: Box::new(self.recorder.clone()),
            fullscreen: Box::new(self.fullscreen.clone()),
            downloads: Box::new(self.downloads.clone()),
        }
    }
}
