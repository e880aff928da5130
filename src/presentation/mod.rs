//! Fullscreen presentation and the overlay control bar.
//!
//! The internal flag mirrors the platform's fullscreen state and is
//! reconciled against its change notifications; the platform is always the
//! source of truth, whoever triggered the transition.

use crate::error::PresentationError;
use crate::platform::{FullscreenHost, FullscreenRequestError};

/// The control bar shown only while fullscreen: viewer name plus an exit
/// control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub username: Option<String>,
}

/// Manages fullscreen entry/exit and the overlay.
pub struct PresentationController {
    fullscreen: bool,
    overlay: Option<Overlay>,
}

impl PresentationController {
    pub fn new() -> Self {
        Self {
            fullscreen: false,
            overlay: None,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// The overlay, present only while fullscreen.
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Enter fullscreen and attach the overlay.
    pub fn enter(
        &mut self,
        username: Option<&str>,
        host: &mut dyn FullscreenHost,
    ) -> Result<(), PresentationError> {
        host.request_fullscreen().map_err(|err| match err {
            FullscreenRequestError::Unsupported => PresentationError::FullscreenUnsupported,
            FullscreenRequestError::Rejected(reason) => PresentationError::Rejected(reason),
        })?;

        self.fullscreen = true;
        self.attach_overlay(username);
        log::info!("entered fullscreen");
        Ok(())
    }

    /// Leave fullscreen. Best-effort: platform failures are logged, never
    /// propagated; the overlay and styling are removed either way. Safe to
    /// call when already Normal.
    pub fn exit(&mut self, host: &mut dyn FullscreenHost) {
        if let Err(err) = host.exit_fullscreen() {
            log::warn!("fullscreen exit failed: {}", err);
        }
        if self.fullscreen {
            log::info!("left fullscreen");
        }
        self.fullscreen = false;
        self.overlay = None;
    }

    /// Toggle between Normal and Fullscreen.
    pub fn toggle(
        &mut self,
        username: Option<&str>,
        host: &mut dyn FullscreenHost,
    ) -> Result<(), PresentationError> {
        if self.fullscreen {
            self.exit(host);
            Ok(())
        } else {
            self.enter(username, host)
        }
    }

    /// Escape is a convenience trigger only: exits when fullscreen, does
    /// nothing otherwise.
    pub fn handle_escape(&mut self, host: &mut dyn FullscreenHost) {
        if self.fullscreen {
            self.exit(host);
        }
    }

    /// Reconcile against a platform change notification, the authoritative
    /// state. Handles transitions this app never requested, like an
    /// OS-level exit key.
    pub fn handle_fullscreen_changed(&mut self, fullscreen: bool, username: Option<&str>) {
        if fullscreen == self.fullscreen {
            return;
        }
        log::info!(
            "platform fullscreen changed to {}, reconciling",
            fullscreen
        );
        self.fullscreen = fullscreen;
        if fullscreen {
            self.attach_overlay(username);
        } else {
            self.overlay = None;
        }
    }

    fn attach_overlay(&mut self, username: Option<&str>) {
        self.overlay = Some(Overlay {
            username: username.map(str::to_string),
        });
    }
}

impl Default for PresentationController {
    fn default() -> Self {
        Self::new()
    }
}
