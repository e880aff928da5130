//! Platform capability interfaces.
//!
//! The controllers never touch an OS surface directly; display capture,
//! media recording, fullscreen and artifact download are collaborators
//! behind the traits in this module. Externally-triggered transitions
//! (device unplug, OS-level fullscreen exit) arrive as [`PlatformEvent`]s
//! on a channel so they are replayed on the caller's thread instead of
//! firing callbacks into controller state.

pub mod mock;

use std::fs;
use std::io;
use std::path::PathBuf;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Identifies one handed-out capture, so late notifications from a
/// torn-down capture can be recognized and discarded.
pub type CaptureId = u64;

/// Notifications pushed by the platform, drained by the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The video track of a capture ended (device unplug, OS "stop sharing").
    TrackEnded { capture_id: CaptureId },
    /// The platform fullscreen flag changed, regardless of trigger source.
    FullscreenChanged { fullscreen: bool },
}

/// Create the channel platform implementations push events into.
pub fn event_channel() -> (Sender<PlatformEvent>, Receiver<PlatformEvent>) {
    unbounded()
}

/// Cursor rendering mode requested from the capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Always,
    Motion,
    Never,
}

/// Audio track constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate: u32,
}

/// Constraints passed to [`DisplayMediaHost::request_capture`].
///
/// `ideal_width` is a preference, not a requirement; the host may negotiate
/// a different width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub cursor: CursorMode,
    pub frame_rate: u32,
    pub height: u32,
    pub ideal_width: u32,
    pub audio: AudioConstraints,
}

/// Negotiated settings of a live stream's video track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub device_label: String,
}

/// Why a capture request produced no stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMediaError {
    /// The platform rejected the request or the user cancelled the picker.
    Denied(String),
    /// The platform has no display capture capability.
    Unsupported,
}

/// Display-plus-audio capture acquisition.
pub trait DisplayMediaHost {
    fn request_capture(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CaptureStream>, DisplayMediaError>;
}

/// A live capture stream.
pub trait CaptureStream {
    /// Negotiated settings of the video track.
    fn settings(&self) -> StreamSettings;

    /// Whether any track is still live.
    fn is_live(&self) -> bool;

    /// Stop every track. Idempotent.
    fn stop_tracks(&mut self);

    /// Register where end-of-stream notifications for this capture go.
    fn set_ended_notifier(&mut self, events: Sender<PlatformEvent>, capture_id: CaptureId);
}

/// Container/codec pair a recorder is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecProfile {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

impl CodecProfile {
    /// The single profile this app records with.
    pub const fn webm_vp9() -> Self {
        Self {
            mime_type: "video/webm;codecs=vp9",
            extension: "webm",
        }
    }
}

/// Readable recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
}

/// A platform media recorder bound to one stream.
pub trait MediaRecorder {
    fn start(&mut self);
    fn stop(&mut self);
    fn state(&self) -> RecorderState;
}

/// A recorder plus the channel its data segments arrive on.
///
/// Channel FIFO order is the emission order; the consumer must not reorder.
pub struct RecorderParts {
    pub recorder: Box<dyn MediaRecorder>,
    pub segments: Receiver<Vec<u8>>,
}

/// Recorder construction.
pub trait RecorderHost {
    /// Create a recorder for the stream, or an error describing why the
    /// codec profile cannot be recorded on this platform.
    fn create_recorder(
        &mut self,
        stream: &dyn CaptureStream,
        profile: &CodecProfile,
    ) -> Result<RecorderParts, String>;
}

/// Why a fullscreen request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullscreenRequestError {
    /// No fullscreen capability on this platform.
    Unsupported,
    /// The platform refused the transition.
    Rejected(String),
}

/// Platform fullscreen capability for the presentation container.
///
/// The change notification must fire on every transition, including ones
/// this process initiated; the flag read back from the platform is the
/// source of truth.
pub trait FullscreenHost {
    fn request_fullscreen(&mut self) -> Result<(), FullscreenRequestError>;

    /// Best-effort exit; an error is reported, never fatal.
    fn exit_fullscreen(&mut self) -> Result<(), String>;

    fn is_fullscreen(&self) -> bool;

    fn set_change_notifier(&mut self, events: Sender<PlatformEvent>);
}

/// Client-side save side-channel for finished artifacts.
pub trait DownloadSink {
    fn save(&mut self, filename: &str, data: &[u8]) -> io::Result<()>;
}

/// Download sink writing artifacts into a directory.
#[derive(Debug)]
pub struct FileDownloadSink {
    dir: PathBuf,
}

impl FileDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sink into the user's download directory, falling back to the
    /// current directory when the platform has none.
    pub fn open_default() -> Self {
        let dir = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }
}

impl DownloadSink for FileDownloadSink {
    fn save(&mut self, filename: &str, data: &[u8]) -> io::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let path = self.dir.join(filename);
        fs::write(&path, data)?;
        log::info!("saved recording to {}", path.display());
        Ok(())
    }
}

/// The full capability set a session lifecycle runs against.
pub struct Platform {
    pub display: Box<dyn DisplayMediaHost>,
    pub recorder: Box<dyn RecorderHost>,
    pub fullscreen: Box<dyn FullscreenHost>,
    pub downloads: Box<dyn DownloadSink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_profile_is_webm_vp9() {
        let profile = CodecProfile::webm_vp9();
        assert_eq!(profile.mime_type, "video/webm;codecs=vp9");
        assert_eq!(profile.extension, "webm");
    }

    #[test]
    fn test_event_channel_preserves_order() {
        let (tx, rx) = event_channel();
        tx.send(PlatformEvent::TrackEnded { capture_id: 1 }).unwrap();
        tx.send(PlatformEvent::FullscreenChanged { fullscreen: true })
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            PlatformEvent::TrackEnded { capture_id: 1 }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PlatformEvent::FullscreenChanged { fullscreen: true }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_file_download_sink_writes_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("downloads");
        let mut sink = FileDownloadSink::new(&dir);

        sink.save("alice-screen-recording-test.webm", &[1, 2, 3])
            .unwrap();

        let written = fs::read(dir.join("alice-screen-recording-test.webm")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }
}
