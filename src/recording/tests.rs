//! Unit tests for recording and artifact assembly.

use chrono::Utc;

use super::*;
use crate::capture::CaptureController;
use crate::error::RecordingError;
use crate::platform::event_channel;
use crate::platform::mock::MockPlatform;

fn session() -> Session {
    Session {
        username: "alice".to_string(),
        login_at: Utc::now(),
    }
}

/// A capturing controller backed by the given mock.
fn capturing(mock: &MockPlatform) -> CaptureController {
    let mut capture = CaptureController::new();
    let (tx, _rx) = event_channel();
    capture
        .start(Some(&session()), &mut mock.display.clone(), &tx)
        .unwrap();
    capture
}

#[test]
fn test_start_requires_session() {
    let mock = MockPlatform::always_granting();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();

    let err = recording
        .start(None, capture.active(), &mut mock.recorder.clone())
        .unwrap_err();

    assert!(matches!(err, RecordingError::NotAuthenticated));
    assert_eq!(recording.state(), RecordingState::Idle);
}

#[test]
fn test_start_requires_capture() {
    let mock = MockPlatform::always_granting();
    let mut recording = RecordingController::new();

    let err = recording
        .start(Some(&session()), None, &mut mock.recorder.clone())
        .unwrap_err();

    assert!(matches!(err, RecordingError::NoActiveCapture));
}

#[test]
fn test_unsupported_recorder_reports_detail() {
    let mock = MockPlatform::always_granting();
    mock.recorder.set_unsupported();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();

    let err = recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap_err();

    assert!(
        matches!(err, RecordingError::RecorderUnsupported(ref detail)
            if detail.contains("video/webm;codecs=vp9"))
    );
}

#[test]
fn test_segments_buffered_in_arrival_order() {
    let mock = MockPlatform::always_granting();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();

    recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap();
    assert_eq!(recording.state(), RecordingState::Recording);

    mock.recorder.emit_segment(&[1, 2]);
    mock.recorder.emit_segment(&[]);
    mock.recorder.emit_segment(&[3]);
    recording.poll_segments();

    // Empty segment skipped, order preserved.
    assert_eq!(recording.chunk_count(), 2);
}

#[test]
fn test_stop_assembles_artifact_in_order() {
    let mock = MockPlatform::always_granting();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();
    let mut sink = mock.downloads.clone();

    recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap();
    mock.recorder.emit_segment(&[1, 2]);
    mock.recorder.emit_segment(&[3, 4, 5]);
    recording.poll_segments();

    let artifact = recording.stop(&mut sink).expect("artifact expected");

    assert!(artifact.filename.starts_with("alice-screen-recording-"));
    assert!(artifact.filename.ends_with(".webm"));
    assert_eq!(artifact.data, vec![1, 2, 3, 4, 5]);
    assert_eq!(mock.downloads.saved_filenames(), vec![artifact.filename.clone()]);
    assert_eq!(recording.state(), RecordingState::Stopped);
}

#[test]
fn test_stop_flushes_pending_segments() {
    let mock = MockPlatform::always_granting();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();
    let mut sink = mock.downloads.clone();

    recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap();
    // Never polled before stop; the final drain must pick these up.
    mock.recorder.emit_segment(&[7]);
    mock.recorder.emit_segment(&[8]);

    let artifact = recording.stop(&mut sink).expect("artifact expected");
    assert_eq!(artifact.data, vec![7, 8]);
}

#[test]
fn test_stop_when_idle_is_noop() {
    let mock = MockPlatform::always_granting();
    let mut recording = RecordingController::new();
    let mut sink = mock.downloads.clone();

    assert!(recording.stop(&mut sink).is_none());
    assert!(mock.downloads.saved_filenames().is_empty());
}

#[test]
fn test_stop_twice_produces_one_artifact() {
    let mock = MockPlatform::always_granting();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();
    let mut sink = mock.downloads.clone();

    recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap();
    mock.recorder.emit_segment(&[1]);

    assert!(recording.stop(&mut sink).is_some());
    assert!(recording.stop(&mut sink).is_none());
    assert_eq!(mock.downloads.saved_filenames().len(), 1);
}

#[test]
fn test_chunks_retained_until_next_start() {
    let mock = MockPlatform::always_granting();
    let capture = capturing(&mock);
    let mut recording = RecordingController::new();
    let mut sink = mock.downloads.clone();

    recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap();
    mock.recorder.emit_segment(&[1]);
    recording.poll_segments();
    recording.stop(&mut sink);

    // Buffer survives the stop...
    assert_eq!(recording.chunk_count(), 1);

    // ...and is cleared when a new recording begins.
    recording
        .start(Some(&session()), capture.active(), &mut mock.recorder.clone())
        .unwrap();
    assert_eq!(recording.chunk_count(), 0);
}
