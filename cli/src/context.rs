use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use watermark_core::{
    ConfigStore, ConfigWatcher, Diagnostics, ManifestProjectLookup, OptionsProvider,
    OverlayController, RefreshEventBus, RefreshRequest, SurfaceEventBus, SurfaceServices,
};

use crate::surface::{HeadlessTarget, HeadlessView, HeadlessViewport, Surface};

/// Name shown in front of every output pane line
const PANE_TITLE: &str = "Water Mark";

/// The host's user-visible output pane
#[derive(Debug, Default)]
pub struct OutputPane {
    messages: RefCell<Vec<String>>,
    activated: Cell<bool>,
}

impl OutputPane {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn was_activated(&self) -> bool {
        self.activated.get()
    }
}

impl Diagnostics for OutputPane {
    fn write(&self, message: &str) {
        println!("[{PANE_TITLE}] {message}");
        self.messages.borrow_mut().push(message.to_string());
    }

    fn activate(&self) {
        if !self.activated.replace(true) {
            println!("[{PANE_TITLE}] output pane activated");
        }
    }
}

/// Holds all state for the CLI host.
///
/// Surfaces and their controllers are single-threaded; only the config
/// store's background load runs elsewhere.
pub struct CliContext {
    pub store: Rc<ConfigStore>,
    pub refresh_bus: RefreshEventBus,
    pub pane: Rc<OutputPane>,
    surfaces: BTreeMap<u32, Surface>,
    next_id: u32,
    watcher: Option<ConfigWatcher>,
    watch_attempted: bool,
}

impl CliContext {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store: Rc::new(store),
            refresh_bus: RefreshEventBus::new(),
            pane: Rc::new(OutputPane::default()),
            surfaces: BTreeMap::new(),
            next_id: 1,
            watcher: None,
            watch_attempted: false,
        }
    }

    /// Open a surface showing `document`, wire its controller, and broadcast
    /// the document-shown refresh
    pub fn open_surface(&mut self, document: Option<PathBuf>, width: f64, height: f64) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        let view = Rc::new(RefCell::new(HeadlessView::new(width, height)));
        let document = Rc::new(RefCell::new(document));
        let events = SurfaceEventBus::new();

        let doc = Rc::clone(&document);
        let services = SurfaceServices {
            render: Box::new(HeadlessTarget(Rc::clone(&view))),
            viewport: Box::new(HeadlessViewport(Rc::clone(&view))),
            document: Box::new(move || doc.borrow().clone()),
            options: Rc::clone(&self.store) as Rc<dyn OptionsProvider>,
            projects: Rc::new(ManifestProjectLookup),
            diagnostics: Rc::clone(&self.pane) as Rc<dyn Diagnostics>,
        };
        let controller = OverlayController::new(services, &events, &self.refresh_bus);

        self.surfaces.insert(
            id,
            Surface {
                id,
                document,
                view,
                events,
                controller,
            },
        );
        tracing::debug!(surface = id, "surface opened");

        self.broadcast_refresh();
        id
    }

    pub fn surface(&self, id: u32) -> Result<&Surface, String> {
        self.surfaces
            .get(&id)
            .ok_or_else(|| format!("no surface with id {id}"))
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    pub fn close_surface(&mut self, id: u32) -> Result<(), String> {
        let surface = self
            .surfaces
            .remove(&id)
            .ok_or_else(|| format!("no surface with id {id}"))?;
        surface.close();
        tracing::debug!(surface = id, "surface closed");
        Ok(())
    }

    pub fn broadcast_refresh(&self) {
        let delivered = self.refresh_bus.publish(&RefreshRequest::Refresh);
        tracing::debug!(delivered, "refresh broadcast");
    }

    /// Let every surface lay out its new content
    pub fn settle(&self) {
        // Repositioning never changes content size
        for surface in self.surfaces.values() {
            surface.settle();
        }
    }

    /// Pick up a finished background load or an external edit of the
    /// options file, refreshing every overlay if either happened
    pub fn poll_config(&mut self) {
        let mut changed = false;

        if self.store.take_ready_signal() {
            tracing::info!("options ready");
            changed = true;
        }

        if !self.watch_attempted && self.store.is_ready() {
            self.watch_attempted = true;
            self.watcher = self.start_watcher();
        }

        if let Some(watcher) = self.watcher.as_mut()
            && watcher.take_changed()
        {
            match self.store.load_blocking() {
                Ok(_) => {
                    tracing::info!(path = %watcher.path().display(), "options file changed");
                    changed = true;
                }
                Err(e) => tracing::warn!(error = %e, "failed to reload options"),
            }
        }

        if changed {
            self.broadcast_refresh();
        }
    }

    fn start_watcher(&self) -> Option<ConfigWatcher> {
        let path = match self.store.config_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "options file path unavailable");
                return None;
            }
        };
        match ConfigWatcher::new(&path) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "not watching options file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Handle;
    use watermark_core::OverlayPhase;
    use watermark_types::{OverlayPosition, OverlaySize};

    fn context_with(options_toml: &str) -> (tempfile::TempDir, CliContext) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, options_toml).unwrap();
        let ctx = CliContext::new(ConfigStore::at_path(&path, Handle::current()));
        ctx.store.load_blocking().unwrap();
        (dir, ctx)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_resolves_and_places_after_layout() {
        let (_dir, mut ctx) = context_with(
            "displayed_text = \"${currentFileName}\"\n\
             position_left = false\n\
             text_size = 10.0\n\
             border_padding = 3.0\n",
        );

        let id = ctx.open_surface(Some(PathBuf::from("/proj/src/main.ts")), 1000.0, 600.0);
        ctx.settle();

        let surface = ctx.surface(id).unwrap();
        let state = surface.controller.state();
        assert_eq!(state.phase, OverlayPhase::Visible);
        assert_eq!(state.text, "main.ts");
        // 7 glyphs at 6px plus padding: 48 x 18
        assert_eq!(state.position, OverlayPosition::new(952.0, 582.0));
        assert!(surface.view.borrow().attached);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_measure_alone_keeps_position() {
        let (_dir, mut ctx) = context_with(
            "displayed_text = \"hello\"\n\
             position_left = false\n",
        );
        let id = ctx.open_surface(None, 1000.0, 600.0);
        ctx.settle();

        let surface = ctx.surface(id).unwrap();
        let placed = surface.controller.state().position;
        assert!(!surface.controller.state().reposition_after_measure);

        // Same text, new layout size: the overlay stays where it was
        assert!(!surface.settle());
        surface.measure(Some(OverlaySize::new(200.0, 18.0)));
        assert_eq!(surface.controller.state().position, placed);
        assert_eq!(surface.view.borrow().position, placed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_color_reaches_output_pane() {
        let (_dir, mut ctx) = context_with("text_color = \"Blorange\"\n");
        ctx.open_surface(Some(PathBuf::from("/proj/a.rs")), 800.0, 400.0);

        let messages = ctx.pane.messages();
        assert!(!messages.is_empty());
        assert!(messages.iter().all(|m| m.contains("text color")));
        assert!(messages[0].contains("Blorange"));
        assert!(!ctx.pane.was_activated());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_releases_subscriptions() {
        let (_dir, mut ctx) = context_with("");
        let first = ctx.open_surface(None, 800.0, 400.0);
        let second = ctx.open_surface(None, 800.0, 400.0);
        assert_eq!(ctx.refresh_bus.subscriber_count(), 2);

        ctx.close_surface(first).unwrap();
        assert_eq!(ctx.refresh_bus.subscriber_count(), 1);
        assert!(ctx.surface(first).is_err());
        assert!(ctx.surface(second).is_ok());
        assert!(ctx.close_surface(first).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_zero_sized_surface_attaches_after_resize() {
        let (_dir, mut ctx) = context_with("displayed_text = \"hello\"\n");
        let id = ctx.open_surface(None, 0.0, 0.0);
        assert_eq!(ctx.surface(id).unwrap().controller.phase(), OverlayPhase::Detached);
        assert!(ctx.pane.messages().is_empty());

        ctx.surface(id).unwrap().resize(640.0, 480.0);
        assert_eq!(ctx.surface(id).unwrap().controller.phase(), OverlayPhase::Visible);
    }
}
