//! Option snapshots and their persistence
//!
//! The engine only ever reads options. Hosts implement [`OptionsProvider`]
//! over whatever owns them; [`ConfigStore`] is the confy-backed default.

mod store;
mod watcher;

pub use store::ConfigStore;
pub use watcher::ConfigWatcher;

use std::cell::RefCell;

use thiserror::Error;
use watermark_types::WatermarkOptions;

/// The options source has not finished loading yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("options are not loaded yet")]
pub struct NotReady;

/// Read access to the current options
pub trait OptionsProvider {
    /// Immutable snapshot of the current options
    fn snapshot(&self) -> Result<WatermarkOptions, NotReady>;

    /// Ask a not-ready source to start loading.
    ///
    /// Must return immediately; the result shows up in a later `snapshot`.
    fn request_initialize(&self);
}

/// Options held in memory, for hosts that manage persistence themselves
#[derive(Debug, Default)]
pub struct InMemoryOptions {
    options: RefCell<Option<WatermarkOptions>>,
}

impl InMemoryOptions {
    pub fn new(options: WatermarkOptions) -> Self {
        Self {
            options: RefCell::new(Some(options)),
        }
    }

    /// A source that reports not-ready until `set` is called
    pub fn not_ready() -> Self {
        Self::default()
    }

    pub fn set(&self, options: WatermarkOptions) {
        *self.options.borrow_mut() = Some(options);
    }

    pub fn update(&self, f: impl FnOnce(&mut WatermarkOptions)) {
        let mut slot = self.options.borrow_mut();
        f(slot.get_or_insert_with(WatermarkOptions::default));
    }
}

impl OptionsProvider for InMemoryOptions {
    fn snapshot(&self) -> Result<WatermarkOptions, NotReady> {
        self.options.borrow().clone().ok_or(NotReady)
    }

    fn request_initialize(&self) {}
}
