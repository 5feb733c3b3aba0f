pub mod bus;
pub mod colors;
pub mod controller;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod options;
pub mod position;
pub mod surface;
pub mod template;

// Re-exports for convenience
pub use bus::{
    EventBus, RefreshEventBus, RefreshRequest, SubscriptionToken, SurfaceEvent, SurfaceEventBus,
};
pub use controller::{
    OverlayController, OverlayPhase, OverlayRenderState, RefreshOutcome, RefreshReport,
    SurfaceServices,
};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use document::{DocumentContext, ManifestProjectLookup, ProjectLookup};
pub use error::{AttachError, ConfigError, Field, FieldError, FieldFailure, RenderError, TemplateError};
pub use options::{ConfigStore, ConfigWatcher, InMemoryOptions, NotReady, OptionsProvider};
pub use position::compute_position;
pub use surface::{RenderTarget, ViewportSource};
pub use template::{ResolvedTemplate, TemplateContext, Token, resolve_template};
pub use watermark_types as types;
