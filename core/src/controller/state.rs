//! Per-surface overlay state and refresh results

use std::path::PathBuf;

use serde::Serialize;
use watermark_types::{DEFAULT_DISPLAYED_TEXT, OverlayPosition, Visibility};

use crate::error::{AttachError, FieldError};

/// Lifecycle of the overlay on its surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPhase {
    /// Nothing attached (not ready, disabled, or attach failed)
    #[default]
    Detached,
    /// Attached and showing text or an image
    Visible,
    /// Enabled but with nothing to show, so attach was skipped
    Hidden,
    /// Surface closed; all subscriptions released
    Closed,
}

/// Visual state owned by one controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRenderState {
    pub phase: OverlayPhase,
    /// Text content as last handed to the render target
    pub text: String,
    pub visibility: Visibility,
    pub image: Option<PathBuf>,
    pub position: OverlayPosition,
    /// Cached until the host reports a rename
    pub document_path: Option<PathBuf>,
    /// Reposition once the render target re-measures the new content
    pub reposition_after_measure: bool,
    /// `None` until the first text refresh, which never counts as a change
    #[serde(skip)]
    pub(crate) last_resolved_text: Option<String>,
}

impl Default for OverlayRenderState {
    fn default() -> Self {
        Self {
            phase: OverlayPhase::Detached,
            text: DEFAULT_DISPLAYED_TEXT.to_string(),
            visibility: Visibility::Hidden,
            image: None,
            position: OverlayPosition::default(),
            document_path: None,
            reposition_after_measure: false,
            last_resolved_text: None,
        }
    }
}

/// How a refresh ended
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Options not loaded yet; a load was requested
    NotReady,
    Disabled,
    /// Nothing to display after processing
    Hidden,
    Visible,
    /// Surface was mid-layout; the next trigger retries
    AttachDeferred,
    AttachFailed(AttachError),
    /// Controller already torn down
    Closed,
}

/// Result of one refresh, with every per-field failure it hit
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub outcome: RefreshOutcome,
    pub errors: Vec<FieldError>,
    pub text_changed: bool,
}

impl RefreshReport {
    pub(crate) fn early(outcome: RefreshOutcome) -> Self {
        Self {
            outcome,
            errors: Vec::new(),
            text_changed: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.outcome == RefreshOutcome::Visible
    }
}
