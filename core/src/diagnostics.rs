//! User-visible diagnostics output
//!
//! Per-field and attach failures are written here so the user can see why
//! part of their configuration did not take effect.

/// Output channel for user-facing messages (an output pane in most hosts)
pub trait Diagnostics {
    fn write(&self, message: &str);

    /// Bring the channel to the front
    fn activate(&self);
}

/// Diagnostics routed through `tracing` under the `watermark::diagnostics`
/// target, for hosts without an output pane of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn write(&self, message: &str) {
        tracing::warn!(target: "watermark::diagnostics", "{}", message);
    }

    fn activate(&self) {
        tracing::info!(target: "watermark::diagnostics", "diagnostics activated");
    }
}
