//! Lifecycle tests: gating, cascades, reconciliation and the full
//! share-record-download flow against the mock platform.

use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::capture::CaptureConfig;
use crate::platform::mock::{MockDisplay, MockPlatform};
use crate::platform::DownloadSink;
use crate::storage::{FileStore, MemoryStore};

fn controller(mock: &MockPlatform) -> SessionLifecycleController {
    crate::logging::try_init();
    SessionLifecycleController::new(Box::new(MemoryStore::new()), mock.platform())
}

fn signed_in(mock: &MockPlatform) -> SessionLifecycleController {
    let mut app = controller(mock);
    app.register("alice", "pw1").unwrap();
    app.login("alice", "pw1").unwrap();
    app
}

fn config_720p30() -> CaptureConfig {
    CaptureConfig {
        frame_rate: 30,
        target_height: 720,
    }
}

#[test]
fn test_controls_locked_until_login() {
    let mock = MockPlatform::always_granting();
    let mut app = controller(&mock);

    let controls = app.controls();
    assert!(!controls.can_start);
    assert!(!controls.can_stop);
    assert!(!controls.can_record);
    assert!(!controls.can_stop_record);
    assert!(!controls.can_fullscreen);

    app.register("alice", "pw1").unwrap();
    app.login("alice", "pw1").unwrap();

    let controls = app.controls();
    assert!(controls.can_start);
    assert!(!controls.can_stop);
    assert!(!controls.can_record);
}

#[test]
fn test_capture_and_recording_require_login() {
    let mock = MockPlatform::always_granting();
    let mut app = controller(&mock);

    assert!(matches!(
        app.start_capture(config_720p30()),
        Err(CaptureError::NotAuthenticated)
    ));
    assert!(matches!(
        app.start_recording(),
        Err(RecordingError::NotAuthenticated)
    ));
    assert_eq!(app.status(), Status::Error);
}

#[test]
fn test_start_capture_flips_controls_and_status() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    let info = app.start_capture(config_720p30()).unwrap();
    assert_eq!(info.width, 1280);
    assert_eq!(info.height, 720);

    assert_eq!(app.status(), Status::Sharing);
    assert_eq!(app.status().to_string(), "Sharing");
    assert!(app.info().contains("alice"));
    assert!(app.info().contains("1280x720"));

    let controls = app.controls();
    assert!(!controls.can_start);
    assert!(controls.can_stop);
    assert!(controls.can_record);
    assert!(!controls.can_stop_record);
    assert!(controls.can_fullscreen);
}

#[test]
fn test_capture_denied_surfaces_error() {
    let mock = MockPlatform::always_granting();
    mock.display.deny("picker dismissed");
    let mut app = signed_in(&mock);

    let err = app.start_capture(config_720p30()).unwrap_err();
    assert!(matches!(err, CaptureError::Denied(_)));
    assert_eq!(app.status(), Status::Error);
    assert!(app.info().contains("picker dismissed"));
    assert!(app.controls().can_start);
}

#[test]
fn test_end_to_end_share_record_download() {
    let mock = MockPlatform::always_granting();
    let mut app = controller(&mock);

    app.register("alice", "pw1").unwrap();
    let session = app.login("alice", "pw1").unwrap();
    assert_eq!(session.username, "alice");

    app.start_capture(config_720p30()).unwrap();
    assert!(!app.controls().can_start);

    app.start_recording().unwrap();
    assert_eq!(app.status(), Status::Recording);
    assert_eq!(app.recording_state(), RecordingState::Recording);

    mock.recorder.emit_segment(&[1, 2]);
    mock.recorder.emit_segment(&[3]);
    app.pump_events();

    let artifact = app.stop_recording().expect("artifact expected");
    assert!(artifact.filename.starts_with("alice-screen-recording-"));
    assert!(artifact.filename.ends_with(".webm"));
    assert_eq!(artifact.data, vec![1, 2, 3]);
    assert_eq!(app.status(), Status::Sharing);
    assert_eq!(mock.downloads.saved_filenames(), vec![artifact.filename.clone()]);

    app.stop_capture();
    assert_eq!(app.status(), Status::NotSharing);
    assert_eq!(app.info(), "");

    let controls = app.controls();
    assert!(controls.can_start);
    assert!(!controls.can_stop);
    assert!(!controls.can_record);
    assert!(!controls.can_stop_record);
    assert!(!controls.can_fullscreen);
}

/// Sink that records whether the capture stream was still live at the
/// moment each artifact was handed over.
#[derive(Clone)]
struct LivenessProbeSink {
    display: MockDisplay,
    saves: Arc<Mutex<Vec<(String, bool)>>>,
}

impl DownloadSink for LivenessProbeSink {
    fn save(&mut self, filename: &str, _data: &[u8]) -> std::io::Result<()> {
        self.saves
            .lock()
            .push((filename.to_string(), self.display.stream_live()));
        Ok(())
    }
}

#[test]
fn test_stop_capture_finalizes_recording_before_release() {
    let mock = MockPlatform::always_granting();
    let probe = LivenessProbeSink {
        display: mock.display.clone(),
        saves: Arc::new(Mutex::new(Vec::new())),
    };
    let mut platform = mock.platform();
    platform.downloads = Box::new(probe.clone());

    let mut app = SessionLifecycleController::new(Box::new(MemoryStore::new()), platform);
    app.register("alice", "pw1").unwrap();
    app.login("alice", "pw1").unwrap();
    app.start_capture(config_720p30()).unwrap();
    app.start_recording().unwrap();
    mock.recorder.emit_segment(&[9]);

    app.stop_capture();

    let saves = probe.saves.lock();
    assert_eq!(saves.len(), 1, "recording must be flushed exactly once");
    // The artifact was produced before the capture handle was released.
    assert!(saves[0].1, "stream was already released at flush time");
    assert_eq!(app.recording_state(), RecordingState::Stopped);
    assert!(!mock.display.stream_live());
}

#[test]
fn test_stop_capture_twice_is_harmless() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.stop_capture();
    let controls = app.controls();

    app.stop_capture();
    assert_eq!(app.controls(), controls);
    assert_eq!(app.status(), Status::NotSharing);
}

#[test]
fn test_logout_tears_down_capture_and_recording() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.start_recording().unwrap();
    mock.recorder.emit_segment(&[4]);

    app.logout();

    assert!(app.current_user().is_none());
    assert!(!mock.display.stream_live());
    assert_eq!(mock.downloads.saved_filenames().len(), 1);
    assert!(!app.controls().can_start);
}

#[test]
fn test_quality_change_restarts_capture() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.start_recording().unwrap();
    mock.recorder.emit_segment(&[5]);

    app.update_quality(CaptureConfig {
        frame_rate: 60,
        target_height: 1080,
    })
    .unwrap();

    // Still sharing, now at the new quality.
    let info = app.stream_info().unwrap();
    assert_eq!(info.height, 1080);
    assert_eq!(info.width, 1920);
    assert_eq!(info.frame_rate, 60);
    assert_eq!(app.status(), Status::Sharing);

    // The restart terminated the in-progress recording and flushed it.
    assert_ne!(app.recording_state(), RecordingState::Recording);
    assert_eq!(mock.downloads.saved_filenames().len(), 1);
}

#[test]
fn test_quality_change_while_idle_only_updates_config() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.update_quality(CaptureConfig {
        frame_rate: 60,
        target_height: 1080,
    })
    .unwrap();
    assert_eq!(app.status(), Status::NotSharing);

    // The stored settings apply at the next start.
    assert_eq!(app.capture_config().target_height, 1080);
    assert_eq!(app.capture_config().frame_rate, 60);
}

#[test]
fn test_track_ended_cascades_like_manual_stop() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.start_recording().unwrap();
    app.enter_fullscreen().unwrap();
    mock.recorder.emit_segment(&[6]);

    // Device unplug: the platform ends the video track.
    mock.display.end_video_track();
    app.pump_events();

    assert_eq!(app.status(), Status::NotSharing);
    assert!(!app.is_fullscreen());
    assert_ne!(app.recording_state(), RecordingState::Recording);
    assert_eq!(mock.downloads.saved_filenames().len(), 1);
    assert!(app.controls().can_start);
}

#[test]
fn test_fullscreen_requires_active_capture() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    assert!(matches!(
        app.enter_fullscreen(),
        Err(PresentationError::Rejected(_))
    ));
    assert!(!app.controls().can_fullscreen);
}

#[test]
fn test_fullscreen_overlay_shows_current_user() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.enter_fullscreen().unwrap();

    assert!(app.is_fullscreen());
    assert_eq!(app.overlay().unwrap().username.as_deref(), Some("alice"));
}

#[test]
fn test_external_fullscreen_exit_reconciles() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.enter_fullscreen().unwrap();

    // OS-level exit: only the change notification reaches us.
    mock.fullscreen.force_exit();
    app.pump_events();

    assert!(!app.is_fullscreen());
    assert!(app.overlay().is_none());
    // Sharing is untouched.
    assert_eq!(app.status(), Status::Sharing);
}

#[test]
fn test_toggle_fullscreen_round_trip() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.toggle_fullscreen().unwrap();
    assert!(app.is_fullscreen());

    app.toggle_fullscreen().unwrap();
    assert!(!app.is_fullscreen());
}

#[test]
fn test_escape_exits_fullscreen() {
    let mock = MockPlatform::always_granting();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    app.enter_fullscreen().unwrap();

    app.handle_escape();
    assert!(!app.is_fullscreen());

    // Escape while Normal does nothing.
    app.handle_escape();
    assert!(!app.is_fullscreen());
}

#[test]
fn test_fullscreen_unsupported_is_non_fatal() {
    let mock = MockPlatform::always_granting();
    mock.fullscreen.set_unsupported();
    let mut app = signed_in(&mock);

    app.start_capture(config_720p30()).unwrap();
    let err = app.enter_fullscreen().unwrap_err();

    assert!(matches!(err, PresentationError::FullscreenUnsupported));
    // Sharing carries on.
    assert_eq!(app.status(), Status::Sharing);
    assert!(app.controls().can_stop);
}

#[test]
fn test_register_feedback_and_duplicate() {
    let mock = MockPlatform::always_granting();
    let mut app = controller(&mock);

    app.register("alice", "pw1").unwrap();
    assert!(app.info().contains("sign in"));

    let err = app.register("alice", "pw2").unwrap_err();
    assert!(matches!(err, AuthError::DuplicateUser(_)));
    assert_eq!(app.status(), Status::Error);
}

#[test]
fn test_restored_session_unlocks_controls() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("state.json");
    let mock = MockPlatform::always_granting();

    {
        let store = FileStore::open(&path).unwrap();
        let mut app = SessionLifecycleController::new(Box::new(store), mock.platform());
        app.register("alice", "pw1").unwrap();
        app.login("alice", "pw1").unwrap();
    }

    // New process: the persisted session is trusted.
    let store = FileStore::open(&path).unwrap();
    let app = SessionLifecycleController::new(Box::new(store), mock.platform());
    assert_eq!(app.current_user(), Some("alice"));
    assert!(app.controls().can_start);
}
