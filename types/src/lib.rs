//! Shared option and geometry types for the editor watermark
//!
//! This crate contains the serializable option snapshot and the small value
//! types exchanged between the update engine (watermark-core) and its hosts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RGBA color, one byte per channel
pub type Color = [u8; 4];

/// Prefix that switches the overlay from text to image display
pub const IMAGE_DIRECTIVE: &str = "IMG:";

/// Text shown until the user configures their own
pub const DEFAULT_DISPLAYED_TEXT: &str = "Go to Tools > Options > Water Mark to change this text.";

// ─────────────────────────────────────────────────────────────────────────────
// Watermark Options
// ─────────────────────────────────────────────────────────────────────────────

/// User-configurable watermark options.
///
/// Hosts hand the engine an immutable snapshot of this on every refresh.
/// Fields are applied independently, so a bad value in one of them never
/// stops the others from taking effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub position_top: bool,
    #[serde(default = "default_true")]
    pub position_left: bool,

    /// Raw template text, or `IMG:<path>` to show an image
    #[serde(default = "default_displayed_text")]
    pub displayed_text: String,
    #[serde(default = "default_text_size")]
    pub text_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family_name: String,
    #[serde(default)]
    pub is_font_bold: bool,

    // Color specs: a named color or `#RRGGBB` style hex
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_border_background")]
    pub border_background: String,

    /// Pixels between the border and the edge of the editor
    #[serde(default = "default_border_margin")]
    pub border_margin: f64,
    /// Pixels between the text and the border
    #[serde(default = "default_border_padding")]
    pub border_padding: f64,
    #[serde(default = "default_border_opacity")]
    pub border_opacity: f64,
}

fn default_true() -> bool {
    true
}
fn default_displayed_text() -> String {
    DEFAULT_DISPLAYED_TEXT.to_string()
}
fn default_text_size() -> f64 {
    16.0
}
fn default_font_family() -> String {
    "Consolas".to_string()
}
fn default_text_color() -> String {
    "Red".to_string()
}
fn default_border_color() -> String {
    "Gray".to_string()
}
fn default_border_background() -> String {
    "White".to_string()
}
fn default_border_margin() -> f64 {
    10.0
}
fn default_border_padding() -> f64 {
    3.0
}
fn default_border_opacity() -> f64 {
    0.7
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            position_top: false,
            position_left: true,
            displayed_text: default_displayed_text(),
            text_size: default_text_size(),
            font_family_name: default_font_family(),
            is_font_bold: false,
            text_color: default_text_color(),
            border_color: default_border_color(),
            border_background: default_border_background(),
            border_margin: default_border_margin(),
            border_padding: default_border_padding(),
            border_opacity: default_border_opacity(),
        }
    }
}

impl WatermarkOptions {
    /// What the displayed text asks the overlay to show
    pub fn display_content(&self) -> DisplayContent<'_> {
        DisplayContent::parse(&self.displayed_text)
    }

    /// Font weight selected by `is_font_bold`
    pub fn font_weight(&self) -> FontWeight {
        if self.is_font_bold {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display Content
// ─────────────────────────────────────────────────────────────────────────────

/// Content requested by the displayed text option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayContent<'a> {
    /// Template text, still containing any `${...}` tokens
    Text(&'a str),
    /// Image file path taken from an `IMG:` directive
    Image(PathBuf),
}

impl<'a> DisplayContent<'a> {
    /// Split an `IMG:` directive from template text.
    ///
    /// The prefix match is exact and case-sensitive; everything after it is
    /// the image path.
    pub fn parse(text: &'a str) -> Self {
        match text.strip_prefix(IMAGE_DIRECTIVE) {
            Some(path) => DisplayContent::Image(PathBuf::from(path.trim())),
            None => DisplayContent::Text(text),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, DisplayContent::Image(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Visible edges of the editor viewport, in host pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl ViewportGeometry {
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Last measured rendered size of the overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlaySize {
    pub width: f64,
    pub height: f64,
}

impl OverlaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Overlay origin within the viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayPosition {
    pub x: f64,
    pub y: f64,
}

impl OverlayPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visual Modes
// ─────────────────────────────────────────────────────────────────────────────

/// Which of the overlay's content slots is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Text,
    Image,
    #[default]
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}
