//! Host surface abstraction
//!
//! The engine never draws. It drives a [`RenderTarget`] owned by the host's
//! adornment layer and reads geometry from a [`ViewportSource`].

use std::path::Path;

use watermark_types::{
    Color, FontWeight, OverlayPosition, OverlaySize, ViewportGeometry, Visibility,
};

use crate::error::{AttachError, RenderError};

/// Visual element hosted by one editor surface.
///
/// `attach` and `detach` must be idempotent; the controller detaches before
/// every refresh and attaches again only when there is something to show.
pub trait RenderTarget {
    fn attach(&mut self) -> Result<(), AttachError>;
    fn detach(&mut self);

    /// Rendered size from the most recent layout pass
    fn measured_size(&self) -> OverlaySize;

    fn set_text(&mut self, text: &str);
    fn set_image(&mut self, path: &Path) -> Result<(), RenderError>;
    fn clear_image(&mut self);
    fn set_visibility(&mut self, visibility: Visibility);

    fn set_font_size(&mut self, size: f64) -> Result<(), RenderError>;
    fn set_font_family(&mut self, family: &str) -> Result<(), RenderError>;
    fn set_font_weight(&mut self, weight: FontWeight);

    fn set_foreground(&mut self, color: Color);
    fn set_background(&mut self, color: Color);
    fn set_border_color(&mut self, color: Color);

    fn set_padding(&mut self, padding: f64);
    fn set_margin(&mut self, margin: f64);
    fn set_opacity(&mut self, opacity: f64);

    fn set_position(&mut self, position: OverlayPosition);
}

/// Reports the surface's current viewport edges
pub trait ViewportSource {
    fn viewport(&self) -> ViewportGeometry;
}
