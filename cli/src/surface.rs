//! Headless editor surfaces
//!
//! Stand-ins for an editor's adornment layer: they record what the engine
//! asked them to draw and estimate the rendered size the way a layout pass
//! would.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use watermark_core::{
    AttachError, OverlayController, RenderError, RenderTarget, SurfaceEvent, SurfaceEventBus,
    ViewportSource,
};
use watermark_types::{
    Color, FontWeight, OverlayPosition, OverlaySize, ViewportGeometry, Visibility,
};

/// Approximate glyph advance as a fraction of the font size
const CHAR_WIDTH_RATIO: f64 = 0.6;
const LINE_HEIGHT_RATIO: f64 = 1.2;
/// Placeholder size for images, which are never decoded
const IMAGE_SIZE: f64 = 64.0;

/// Everything the engine has applied to one surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeadlessView {
    pub viewport: ViewportGeometry,
    pub attached: bool,
    pub text: String,
    pub image: Option<PathBuf>,
    pub visibility: Visibility,
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: FontWeight,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub border_color: Option<Color>,
    pub padding: f64,
    pub margin: f64,
    pub opacity: f64,
    pub position: OverlayPosition,
    pub measured: OverlaySize,
    /// Set by `measure`; replaces the estimate until cleared
    pub measure_override: Option<OverlaySize>,
}

impl HeadlessView {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: ViewportGeometry::new(0.0, height, 0.0, width),
            ..Default::default()
        }
    }

    /// Size a layout pass would give the current content
    pub fn estimate_size(&self) -> OverlaySize {
        if let Some(size) = self.measure_override {
            return size;
        }
        let inset = 2.0 * self.padding;
        match self.visibility {
            Visibility::Hidden => OverlaySize::default(),
            Visibility::Image => OverlaySize::new(IMAGE_SIZE + inset, IMAGE_SIZE + inset),
            Visibility::Text => {
                let longest = self
                    .text
                    .lines()
                    .map(|line| line.chars().count())
                    .max()
                    .unwrap_or(0);
                let lines = self.text.lines().count().max(1);
                OverlaySize::new(
                    longest as f64 * self.font_size * CHAR_WIDTH_RATIO + inset,
                    lines as f64 * self.font_size * LINE_HEIGHT_RATIO + inset,
                )
            }
        }
    }
}

pub type SharedView = Rc<RefCell<HeadlessView>>;

/// Render target writing into a shared [`HeadlessView`]
pub struct HeadlessTarget(pub SharedView);

impl RenderTarget for HeadlessTarget {
    fn attach(&mut self) -> Result<(), AttachError> {
        let mut view = self.0.borrow_mut();
        if view.viewport.width() <= 0.0 || view.viewport.height() <= 0.0 {
            return Err(AttachError::MidLayout);
        }
        view.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        self.0.borrow_mut().attached = false;
    }

    fn measured_size(&self) -> OverlaySize {
        self.0.borrow().measured
    }

    fn set_text(&mut self, text: &str) {
        self.0.borrow_mut().text = text.to_string();
    }

    fn set_image(&mut self, path: &Path) -> Result<(), RenderError> {
        if !path.is_file() {
            return Err(RenderError::ImageLoad {
                path: path.to_path_buf(),
                reason: "not a file".to_string(),
            });
        }
        self.0.borrow_mut().image = Some(path.to_path_buf());
        Ok(())
    }

    fn clear_image(&mut self) {
        self.0.borrow_mut().image = None;
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        self.0.borrow_mut().visibility = visibility;
    }

    fn set_font_size(&mut self, size: f64) -> Result<(), RenderError> {
        self.0.borrow_mut().font_size = size;
        Ok(())
    }

    fn set_font_family(&mut self, family: &str) -> Result<(), RenderError> {
        if family.trim().is_empty() {
            return Err(RenderError::UnknownFontFamily(family.to_string()));
        }
        self.0.borrow_mut().font_family = family.to_string();
        Ok(())
    }

    fn set_font_weight(&mut self, weight: FontWeight) {
        self.0.borrow_mut().font_weight = weight;
    }

    fn set_foreground(&mut self, color: Color) {
        self.0.borrow_mut().foreground = Some(color);
    }

    fn set_background(&mut self, color: Color) {
        self.0.borrow_mut().background = Some(color);
    }

    fn set_border_color(&mut self, color: Color) {
        self.0.borrow_mut().border_color = Some(color);
    }

    fn set_padding(&mut self, padding: f64) {
        self.0.borrow_mut().padding = padding;
    }

    fn set_margin(&mut self, margin: f64) {
        self.0.borrow_mut().margin = margin;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.0.borrow_mut().opacity = opacity;
    }

    fn set_position(&mut self, position: OverlayPosition) {
        self.0.borrow_mut().position = position;
    }
}

pub struct HeadlessViewport(pub SharedView);

impl ViewportSource for HeadlessViewport {
    fn viewport(&self) -> ViewportGeometry {
        self.0.borrow().viewport
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Surface
// ─────────────────────────────────────────────────────────────────────────────

/// One open editor surface and the controller driving its overlay
pub struct Surface {
    pub id: u32,
    pub document: Rc<RefCell<Option<PathBuf>>>,
    pub view: SharedView,
    pub events: SurfaceEventBus,
    pub controller: OverlayController,
}

impl Surface {
    /// Re-measure after the engine changed the content.
    ///
    /// Publishes `ContentMeasured` when the size moved and returns whether it
    /// did. The controller decides whether that calls for a new position.
    pub fn settle(&self) -> bool {
        let changed = {
            let mut view = self.view.borrow_mut();
            let size = view.estimate_size();
            let changed = size != view.measured;
            view.measured = size;
            changed
        };
        if changed {
            self.events.publish(&SurfaceEvent::ContentMeasured);
        }
        changed
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.view.borrow_mut().viewport = ViewportGeometry::new(0.0, height, 0.0, width);
        self.events.publish(&SurfaceEvent::ViewportResized);
    }

    /// Force a measured size, as if layout produced it
    pub fn measure(&self, size: Option<OverlaySize>) {
        self.view.borrow_mut().measure_override = size;
        self.settle();
    }

    pub fn rename(&self, path: PathBuf) {
        *self.document.borrow_mut() = Some(path);
        self.events.publish(&SurfaceEvent::DocumentRenamed);
    }

    pub fn close(&self) {
        self.events.publish(&SurfaceEvent::Closed);
    }

    pub fn document_label(&self) -> String {
        self.document
            .borrow()
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<untitled>".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_estimate() {
        let view = HeadlessView {
            text: "main.ts".to_string(),
            visibility: Visibility::Text,
            font_size: 10.0,
            padding: 3.0,
            ..HeadlessView::new(1000.0, 600.0)
        };
        let size = view.estimate_size();
        assert!((size.width - 48.0).abs() < 1e-9);
        assert!((size.height - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_override_wins() {
        let view = HeadlessView {
            text: "anything".to_string(),
            visibility: Visibility::Text,
            font_size: 16.0,
            measure_override: Some(OverlaySize::new(80.0, 18.0)),
            ..HeadlessView::new(1000.0, 600.0)
        };
        assert_eq!(view.estimate_size(), OverlaySize::new(80.0, 18.0));
    }

    #[test]
    fn test_zero_viewport_is_mid_layout() {
        let view = Rc::new(RefCell::new(HeadlessView::new(0.0, 0.0)));
        let mut target = HeadlessTarget(Rc::clone(&view));
        assert_eq!(target.attach(), Err(AttachError::MidLayout));
        assert!(!view.borrow().attached);

        view.borrow_mut().viewport = ViewportGeometry::new(0.0, 100.0, 0.0, 100.0);
        assert_eq!(target.attach(), Ok(()));
        assert!(view.borrow().attached);
    }

    #[test]
    fn test_blank_font_family_rejected() {
        let view = Rc::new(RefCell::new(HeadlessView::new(100.0, 100.0)));
        let mut target = HeadlessTarget(view);
        assert_eq!(
            target.set_font_family("  "),
            Err(RenderError::UnknownFontFamily("  ".to_string()))
        );
    }
}
