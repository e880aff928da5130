//! Central error types for ScreenShare.
//!
//! Each controller surface gets its own typed error enum so callers can
//! match on exactly the failures that surface can produce. All errors
//! carry a user-facing message via `Display`.

use thiserror::Error;

/// Errors from the persisted key-value state store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state was not valid JSON
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No data directory could be resolved for the backing file
    #[error("no data directory available for persisted state")]
    DataDirUnavailable,
}

/// Errors from registration and login.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Username or password was empty
    #[error("username and password must not be empty")]
    InvalidInput,

    /// Registration attempted with a username that already exists
    #[error("username '{0}' is already taken")]
    DuplicateUser(String),

    /// Unknown username or wrong password
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The user store could not be read or persisted
    #[error("user store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from acquiring or describing a display capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No user is signed in
    #[error("sign in before sharing the screen")]
    NotAuthenticated,

    /// The platform rejected the request or the user cancelled the picker
    #[error("screen capture denied: {0}")]
    Denied(String),

    /// The platform has no display capture capability
    #[error("screen capture is not supported on this platform")]
    Unsupported,

    /// Operation requires a live capture and none is active
    #[error("no active screen capture")]
    NoActiveCapture,

    /// A capture request is already in flight
    #[error("a screen capture request is already pending")]
    RequestPending,
}

/// Errors from starting a recording.
#[derive(Error, Debug)]
pub enum RecordingError {
    /// No user is signed in
    #[error("sign in before recording")]
    NotAuthenticated,

    /// Recording requires a live capture and none is active
    #[error("no active screen capture to record")]
    NoActiveCapture,

    /// The platform cannot instantiate a recorder for the codec profile
    #[error("recording is not supported: {0}")]
    RecorderUnsupported(String),
}

/// Errors from fullscreen presentation.
#[derive(Error, Debug)]
pub enum PresentationError {
    /// The platform has no fullscreen capability
    #[error("fullscreen is not supported on this platform")]
    FullscreenUnsupported,

    /// The platform refused the fullscreen request
    #[error("could not enter fullscreen: {0}")]
    Rejected(String),
}
