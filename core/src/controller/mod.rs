//! Per-surface overlay controller
//!
//! One [`OverlayController`] exists per editor surface. It subscribes to the
//! shared refresh bus and to its own surface's events, and on every trigger
//! rebuilds the overlay from the current options snapshot:
//!
//! ```text
//!   Refresh / ViewportResized / DocumentRenamed
//!                  │
//!                  ▼
//!   detach ─► options ─► content ─► font ─► colors ─► spacing ─► position ─► attach
//!                                                                   │
//!                   text changed + right-aligned, or unmeasured ───┘
//!                                                │
//!                              ContentMeasured ─► Reposition (refresh bus)
//! ```
//!
//! Each field is applied independently; a failure is reported and the
//! refresh carries on with the next field.

mod state;


pub use state::{OverlayPhase, OverlayRenderState, RefreshOutcome, RefreshReport};

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::thread::{self, ThreadId};

use watermark_types::{Color, DisplayContent, OverlaySize, Visibility, WatermarkOptions};

use crate::bus::{RefreshEventBus, RefreshRequest, SubscriptionToken, SurfaceEvent, SurfaceEventBus};
use crate::colors;
use crate::diagnostics::Diagnostics;
use crate::document::{DocumentContext, ProjectLookup};
use crate::error::{AttachError, Field, FieldError, FieldFailure};
use crate::options::OptionsProvider;
use crate::position::compute_position;
use crate::surface::{RenderTarget, ViewportSource};
use crate::template::{TemplateContext, resolve_template};

/// Host services one controller needs
pub struct SurfaceServices {
    pub render: Box<dyn RenderTarget>,
    pub viewport: Box<dyn ViewportSource>,
    pub document: Box<dyn DocumentContext>,
    pub options: Rc<dyn OptionsProvider>,
    pub projects: Rc<dyn ProjectLookup>,
    pub diagnostics: Rc<dyn Diagnostics>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller handle
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps the overlay of one surface in sync with the options.
///
/// Bus handlers hold only a weak reference to the controller state, so
/// dropping the handle releases everything; drop also unsubscribes.
pub struct OverlayController {
    inner: Rc<RefCell<Inner>>,
}

impl OverlayController {
    /// Subscribe to both buses and run the first refresh
    pub fn new(
        services: SurfaceServices,
        surface_bus: &SurfaceEventBus,
        refresh_bus: &RefreshEventBus,
    ) -> Self {
        let inner = Rc::new(RefCell::new(Inner::new(
            services,
            surface_bus.clone(),
            refresh_bus.clone(),
        )));

        let subscriptions = subscribe_all(&inner, surface_bus, refresh_bus);
        let report = {
            let mut inner = inner.borrow_mut();
            inner.subscriptions = subscriptions;
            inner.refresh()
        };
        tracing::debug!(outcome = ?report.outcome, "overlay controller created");

        Self { inner }
    }

    /// Rebuild the overlay now. `None` if the controller is mid-update.
    pub fn refresh(&self) -> Option<RefreshReport> {
        self.inner.try_borrow_mut().ok().map(|mut inner| inner.refresh())
    }

    /// Recompute the position only
    pub fn reposition(&self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.reposition();
        }
    }

    /// Forget the cached document path; the next refresh queries it again
    pub fn invalidate_document_path(&self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.invalidate_document_path();
        }
    }

    /// The render target finished measuring new content.
    ///
    /// Broadcasts a reposition request if the last refresh deferred one.
    /// Returns whether it did.
    pub fn on_content_measured(&self) -> bool {
        let (due, bus) = match self.inner.try_borrow_mut() {
            Ok(mut inner) => (inner.take_deferred_reposition(), inner.refresh_bus.clone()),
            Err(_) => return false,
        };
        if due {
            bus.publish(&RefreshRequest::Reposition);
        }
        due
    }

    /// Tear down as if the surface had closed
    pub fn close(&self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.teardown();
        }
    }

    pub fn state(&self) -> OverlayRenderState {
        self.inner.borrow().state.clone()
    }

    pub fn phase(&self) -> OverlayPhase {
        self.inner.borrow().state.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase() == OverlayPhase::Closed
    }
}

impl Drop for OverlayController {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.unsubscribe_all();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Subscription {
    Surface(SubscriptionToken),
    Refresh(SubscriptionToken),
}

/// Run `f` against live, unborrowed controller state
fn with_inner<R>(weak: &Weak<RefCell<Inner>>, f: impl FnOnce(&mut Inner) -> R) -> Option<R> {
    let inner = weak.upgrade()?;
    let mut guard = match inner.try_borrow_mut() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::debug!("overlay busy, skipping nested trigger");
            return None;
        }
    };
    Some(f(&mut guard))
}

fn subscribe_all(
    inner: &Rc<RefCell<Inner>>,
    surface_bus: &SurfaceEventBus,
    refresh_bus: &RefreshEventBus,
) -> Vec<Subscription> {
    let mut subscriptions = Vec::with_capacity(5);

    let weak = Rc::downgrade(inner);
    subscriptions.push(Subscription::Surface(surface_bus.subscribe(move |event| {
        if *event == SurfaceEvent::ViewportResized {
            with_inner(&weak, |inner| inner.refresh());
        }
    })));

    let weak = Rc::downgrade(inner);
    subscriptions.push(Subscription::Surface(surface_bus.subscribe(move |event| {
        if *event == SurfaceEvent::DocumentRenamed {
            with_inner(&weak, |inner| {
                inner.invalidate_document_path();
                inner.refresh()
            });
        }
    })));

    let weak = Rc::downgrade(inner);
    let reposition_bus = refresh_bus.clone();
    subscriptions.push(Subscription::Surface(surface_bus.subscribe(move |event| {
        if *event != SurfaceEvent::ContentMeasured {
            return;
        }
        // Borrow released before publishing so our own handler can run
        let due = with_inner(&weak, |inner| inner.take_deferred_reposition()).unwrap_or(false);
        if due {
            reposition_bus.publish(&RefreshRequest::Reposition);
        }
    })));

    let weak = Rc::downgrade(inner);
    subscriptions.push(Subscription::Surface(surface_bus.subscribe(move |event| {
        if *event == SurfaceEvent::Closed {
            with_inner(&weak, |inner| inner.teardown());
        }
    })));

    let weak = Rc::downgrade(inner);
    subscriptions.push(Subscription::Refresh(refresh_bus.subscribe(
        move |request| match request {
            RefreshRequest::Refresh => {
                with_inner(&weak, |inner| inner.refresh());
            }
            RefreshRequest::Reposition => {
                with_inner(&weak, |inner| inner.reposition());
            }
        },
    )));

    subscriptions
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller state
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    render: Box<dyn RenderTarget>,
    viewport: Box<dyn ViewportSource>,
    document: Box<dyn DocumentContext>,
    options: Rc<dyn OptionsProvider>,
    projects: Rc<dyn ProjectLookup>,
    diagnostics: Rc<dyn Diagnostics>,
    state: OverlayRenderState,
    surface_bus: SurfaceEventBus,
    refresh_bus: RefreshEventBus,
    subscriptions: Vec<Subscription>,
    owner: ThreadId,
}

impl Inner {
    fn new(
        services: SurfaceServices,
        surface_bus: SurfaceEventBus,
        refresh_bus: RefreshEventBus,
    ) -> Self {
        Self {
            render: services.render,
            viewport: services.viewport,
            document: services.document,
            options: services.options,
            projects: services.projects,
            diagnostics: services.diagnostics,
            state: OverlayRenderState::default(),
            surface_bus,
            refresh_bus,
            subscriptions: Vec::new(),
            owner: thread::current().id(),
        }
    }

    fn refresh(&mut self) -> RefreshReport {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "overlay refreshed off its surface thread"
        );

        if self.state.phase == OverlayPhase::Closed {
            return RefreshReport::early(RefreshOutcome::Closed);
        }

        self.render.detach();
        self.state.phase = OverlayPhase::Detached;

        let options = match self.options.snapshot() {
            Ok(options) => options,
            Err(_) => {
                tracing::debug!("options not ready, requesting load");
                self.options.request_initialize();
                return RefreshReport::early(RefreshOutcome::NotReady);
            }
        };

        if !options.enabled {
            return RefreshReport::early(RefreshOutcome::Disabled);
        }

        let mut errors = Vec::new();
        let text_changed = self.apply_content(&options, &mut errors);
        self.apply_font(&options, &mut errors);
        self.apply_colors(&options, &mut errors);
        self.apply_spacing(&options);
        self.apply_position(&options, text_changed);

        let blank = self.state.visibility == Visibility::Text && self.state.text.trim().is_empty();
        let outcome = if blank {
            self.render.set_visibility(Visibility::Hidden);
            self.state.visibility = Visibility::Hidden;
            self.state.phase = OverlayPhase::Hidden;
            RefreshOutcome::Hidden
        } else {
            self.attach()
        };

        for error in &errors {
            tracing::warn!(field = %error.field, value = %error.value, error = %error.reason, "field not applied");
            self.diagnostics.write(&error.to_string());
        }

        RefreshReport {
            outcome,
            errors,
            text_changed,
        }
    }

    /// Set text or image; returns whether the resolved text changed
    fn apply_content(&mut self, options: &WatermarkOptions, errors: &mut Vec<FieldError>) -> bool {
        match options.display_content() {
            DisplayContent::Image(path) => {
                self.render.set_visibility(Visibility::Image);
                self.state.visibility = Visibility::Image;

                let result = if path.exists() {
                    self.render.set_image(&path).map_err(FieldFailure::from)
                } else {
                    Err(FieldFailure::MissingFile(path.clone()))
                };
                match result {
                    Ok(()) => self.state.image = Some(path),
                    Err(reason) => {
                        self.render.clear_image();
                        self.state.image = None;
                        errors.push(FieldError::new(
                            Field::Image,
                            path.display().to_string(),
                            reason,
                        ));
                    }
                }
                false
            }
            DisplayContent::Text(raw) => {
                let path = self.document_path();
                let ctx = SurfaceTemplateContext {
                    path: path.as_deref(),
                    projects: self.projects.as_ref(),
                };
                let resolved = resolve_template(raw, &ctx);
                errors.extend(
                    resolved
                        .errors
                        .into_iter()
                        .map(|e| FieldError::new(Field::DisplayedText, raw, e)),
                );

                let changed = self
                    .state
                    .last_resolved_text
                    .as_ref()
                    .is_some_and(|previous| *previous != resolved.text);

                self.render.set_text(&resolved.text);
                self.render.set_visibility(Visibility::Text);
                self.state.visibility = Visibility::Text;
                self.state.text.clone_from(&resolved.text);
                self.state.last_resolved_text = Some(resolved.text);
                changed
            }
        }
    }

    fn apply_font(&mut self, options: &WatermarkOptions, errors: &mut Vec<FieldError>) {
        let size = options.text_size;
        let applied = if size.is_finite() && size > 0.0 {
            self.render.set_font_size(size).map_err(FieldFailure::from)
        } else {
            Err(FieldFailure::InvalidSize)
        };
        if let Err(reason) = applied {
            errors.push(FieldError::new(Field::TextSize, size.to_string(), reason));
        }

        if let Err(e) = self.render.set_font_family(&options.font_family_name) {
            errors.push(FieldError::new(
                Field::FontFamily,
                options.font_family_name.as_str(),
                e,
            ));
        }

        self.render.set_font_weight(options.font_weight());
    }

    fn apply_colors(&mut self, options: &WatermarkOptions, errors: &mut Vec<FieldError>) {
        let targets: [(Field, &str, fn(&mut dyn RenderTarget, Color)); 3] = [
            (Field::TextColor, options.text_color.as_str(), |r, c| r.set_foreground(c)),
            (Field::BorderColor, options.border_color.as_str(), |r, c| r.set_border_color(c)),
            (Field::BorderBackground, options.border_background.as_str(), |r, c| {
                r.set_background(c)
            }),
        ];

        for (field, spec, apply) in targets {
            match colors::resolve(spec) {
                Some(color) => apply(self.render.as_mut(), color),
                None => errors.push(FieldError::new(field, spec, FieldFailure::UnknownColor)),
            }
        }
    }

    fn apply_spacing(&mut self, options: &WatermarkOptions) {
        self.render.set_padding(options.border_padding);
        self.render.set_margin(options.border_margin);
        self.render.set_opacity(options.border_opacity);
    }

    fn apply_position(&mut self, options: &WatermarkOptions, text_changed: bool) {
        let unmeasured = self.render.measured_size() == OverlaySize::default();
        self.place(options);
        // Right-aligned content grows leftwards, so the stale width is wrong
        if text_changed && !options.position_left {
            self.state.reposition_after_measure = true;
        }
        // Nothing measured yet: a right or bottom edge lands on the corner
        if unmeasured && !(options.position_left && options.position_top) {
            self.state.reposition_after_measure = true;
        }
    }

    fn place(&mut self, options: &WatermarkOptions) {
        let viewport = self.viewport.viewport();
        let position = compute_position(
            &viewport,
            self.render.measured_size(),
            options.position_top,
            options.position_left,
        );
        self.render.set_position(position);
        self.state.position = position;
    }

    fn attach(&mut self) -> RefreshOutcome {
        match self.render.attach() {
            Ok(()) => {
                self.state.phase = OverlayPhase::Visible;
                RefreshOutcome::Visible
            }
            Err(AttachError::MidLayout) => {
                tracing::debug!("surface mid-layout, overlay attaches on next trigger");
                RefreshOutcome::AttachDeferred
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to attach overlay");
                self.diagnostics.write(&e.to_string());
                self.diagnostics.activate();
                RefreshOutcome::AttachFailed(e)
            }
        }
    }

    fn reposition(&mut self) {
        if self.state.phase != OverlayPhase::Visible {
            return;
        }
        match self.options.snapshot() {
            Ok(options) if options.enabled => self.place(&options),
            _ => {}
        }
    }

    fn take_deferred_reposition(&mut self) -> bool {
        std::mem::take(&mut self.state.reposition_after_measure)
    }

    fn document_path(&mut self) -> Option<PathBuf> {
        if self.state.document_path.is_none() {
            self.state.document_path = self.document.current_document_path();
            if let Some(path) = &self.state.document_path {
                tracing::debug!(path = %path.display(), "document path cached");
            }
        }
        self.state.document_path.clone()
    }

    fn invalidate_document_path(&mut self) {
        self.state.document_path = None;
    }

    fn teardown(&mut self) {
        if self.state.phase == OverlayPhase::Closed {
            return;
        }
        self.unsubscribe_all();
        self.render.detach();
        self.state.phase = OverlayPhase::Closed;
        self.state.reposition_after_measure = false;
        tracing::debug!("overlay controller closed");
    }

    fn unsubscribe_all(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            match subscription {
                Subscription::Surface(token) => self.surface_bus.unsubscribe(token),
                Subscription::Refresh(token) => self.refresh_bus.unsubscribe(token),
            };
        }
    }
}

/// Template tokens resolved against this surface's cached document
struct SurfaceTemplateContext<'a> {
    path: Option<&'a Path>,
    projects: &'a dyn ProjectLookup,
}

impl TemplateContext for SurfaceTemplateContext<'_> {
    fn document_path(&self) -> Option<&Path> {
        self.path
    }

    fn project_name(&self, path: &Path) -> Option<String> {
        self.projects.project_name_for(path)
    }
}
