//! Error types for the overlay update engine

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Option fields that are applied independently during a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DisplayedText,
    Image,
    TextSize,
    FontFamily,
    TextColor,
    BorderColor,
    BorderBackground,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::DisplayedText => "displayed text",
            Field::Image => "image",
            Field::TextSize => "text size",
            Field::FontFamily => "font family",
            Field::TextColor => "text color",
            Field::BorderColor => "border color",
            Field::BorderBackground => "background",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a single field could not be applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldFailure {
    #[error("not a known color name or hex value")]
    UnknownColor,

    #[error("size must be a positive number")]
    InvalidSize,

    #[error("file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A per-field failure, reported with the offending field and value
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unable to apply {field} = {value:?}: {reason}")]
pub struct FieldError {
    pub field: Field,
    pub value: String,
    #[source]
    pub reason: FieldFailure,
}

impl FieldError {
    pub fn new(field: Field, value: impl Into<String>, reason: impl Into<FieldFailure>) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Failures deriving a template token from the active document path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("document path {} has no file name", .0.display())]
    NoFileName(PathBuf),

    #[error("document path {} has no parent directory", .0.display())]
    NoParentDirectory(PathBuf),

    #[error("no project contains {}", .0.display())]
    NoProject(PathBuf),
}

/// Errors from render target property setters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("font family '{0}' is not available")]
    UnknownFontFamily(String),

    #[error("failed to load image {}: {reason}", path.display())]
    ImageLoad { path: PathBuf, reason: String },

    #[error("value rejected by render target: {0}")]
    Rejected(String),
}

/// Errors from attaching the overlay to its surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The surface is still laying out, usually while a document loads
    #[error("surface is mid-layout")]
    MidLayout,

    #[error("unable to display the watermark: {0}")]
    Failed(String),
}

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[source] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),

    #[error("failed to locate configuration file")]
    Path(#[source] confy::ConfyError),

    #[error("failed to watch configuration directory {}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
