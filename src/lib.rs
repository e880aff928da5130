//! Screen sharing session lifecycle.
//!
//! A signed-in user captures their screen, optionally records it to a
//! downloadable file, and watches it fullscreen. The crate's core is
//! [`session::SessionLifecycleController`], which owns the one session and
//! the one capture handle and sequences every transition across
//! authentication, capture, recording and presentation. Platform
//! primitives (display capture, media recording, fullscreen, download)
//! stay behind the [`platform`] traits; [`platform::mock::MockPlatform`]
//! drives the whole flow in tests.

pub mod auth;
pub mod capture;
pub mod error;
pub mod logging;
pub mod platform;
pub mod presentation;
pub mod recording;
pub mod session;
pub mod storage;

pub use auth::Session;
pub use capture::{CaptureConfig, StreamInfo};
pub use error::{AuthError, CaptureError, PresentationError, RecordingError, StoreError};
pub use platform::Platform;
pub use recording::{Artifact, RecordingState};
pub use session::{Controls, SessionLifecycleController, Status};
