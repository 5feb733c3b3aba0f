//! Persisted options, loaded with confy

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::runtime::Handle;
use watermark_types::WatermarkOptions;

use super::{NotReady, OptionsProvider};
use crate::error::ConfigError;

const APP_NAME: &str = "watermark";
const CONFIG_NAME: &str = "options";

#[derive(Debug, Clone)]
enum Location {
    /// Platform config directory, resolved by confy
    Default,
    File(PathBuf),
}

impl Location {
    fn load(&self) -> Result<WatermarkOptions, ConfigError> {
        let loaded = match self {
            Location::Default => confy::load(APP_NAME, CONFIG_NAME),
            Location::File(path) => confy::load_path(path),
        };
        loaded.map_err(ConfigError::Load)
    }

    fn store(&self, options: &WatermarkOptions) -> Result<(), ConfigError> {
        let stored = match self {
            Location::Default => confy::store(APP_NAME, CONFIG_NAME, options),
            Location::File(path) => confy::store_path(path, options),
        };
        stored.map_err(ConfigError::Save)
    }

    fn path(&self) -> Result<PathBuf, ConfigError> {
        match self {
            Location::Default => {
                confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).map_err(ConfigError::Path)
            }
            Location::File(path) => Ok(path.clone()),
        }
    }
}

/// Watermark options persisted as TOML.
///
/// Starts out not ready. `request_initialize` loads the file on the tokio
/// blocking pool and returns at once; clones share the loaded snapshot.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    options: Arc<RwLock<Option<WatermarkOptions>>>,
    loading: Arc<AtomicBool>,
    became_ready: Arc<AtomicBool>,
    location: Location,
    runtime: Handle,
}

impl ConfigStore {
    /// Store in the platform config directory (`watermark/options.toml`)
    pub fn new(runtime: Handle) -> Self {
        Self::with_location(Location::Default, runtime)
    }

    /// Store at an explicit file path
    pub fn at_path(path: impl Into<PathBuf>, runtime: Handle) -> Self {
        Self::with_location(Location::File(path.into()), runtime)
    }

    fn with_location(location: Location, runtime: Handle) -> Self {
        Self {
            options: Arc::new(RwLock::new(None)),
            loading: Arc::new(AtomicBool::new(false)),
            became_ready: Arc::new(AtomicBool::new(false)),
            location,
            runtime,
        }
    }

    pub fn config_path(&self) -> Result<PathBuf, ConfigError> {
        self.location.path()
    }

    pub fn is_ready(&self) -> bool {
        self.options.read().map(|o| o.is_some()).unwrap_or(false)
    }

    /// True once after a background load completes
    pub fn take_ready_signal(&self) -> bool {
        self.became_ready.swap(false, Ordering::AcqRel)
    }

    /// Load the file on the calling thread and publish the result
    pub fn load_blocking(&self) -> Result<WatermarkOptions, ConfigError> {
        let options = self.location.load()?;
        publish(&self.options, options.clone());
        Ok(options)
    }

    /// Apply `f` to the current options (defaults if not loaded) and save
    pub fn update(
        &self,
        f: impl FnOnce(&mut WatermarkOptions),
    ) -> Result<WatermarkOptions, ConfigError> {
        let mut options = self.snapshot().unwrap_or_default();
        f(&mut options);
        self.save(&options)?;
        Ok(options)
    }

    pub fn save(&self, options: &WatermarkOptions) -> Result<(), ConfigError> {
        self.location.store(options)?;
        publish(&self.options, options.clone());
        tracing::debug!("watermark options saved");
        Ok(())
    }

    pub fn is_config_file(&self, path: &Path) -> bool {
        self.config_path()
            .map(|config| config.file_name() == path.file_name())
            .unwrap_or(false)
    }
}

fn publish(slot: &RwLock<Option<WatermarkOptions>>, options: WatermarkOptions) {
    match slot.write() {
        Ok(mut guard) => *guard = Some(options),
        Err(poisoned) => *poisoned.into_inner() = Some(options),
    }
}

impl OptionsProvider for ConfigStore {
    fn snapshot(&self) -> Result<WatermarkOptions, NotReady> {
        self.options
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(NotReady)
    }

    fn request_initialize(&self) {
        if self.loading.swap(true, Ordering::AcqRel) {
            return;
        }

        let options = Arc::clone(&self.options);
        let loading = Arc::clone(&self.loading);
        let became_ready = Arc::clone(&self.became_ready);
        let location = self.location.clone();

        tracing::debug!("loading watermark options in background");
        self.runtime.spawn_blocking(move || {
            match location.load() {
                Ok(loaded) => {
                    publish(&options, loaded);
                    became_ready.store(true, Ordering::Release);
                    tracing::info!("watermark options loaded");
                }
                Err(e) => tracing::warn!(error = %e, "failed to load watermark options"),
            }
            loading.store(false, Ordering::Release);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_not_ready_until_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "displayed_text = \"hello\"\n").unwrap();

        let store = ConfigStore::at_path(&path, Handle::current());
        assert_eq!(store.snapshot(), Err(NotReady));

        store.request_initialize();
        let mut signalled = false;
        for _ in 0..400 {
            if store.take_ready_signal() {
                signalled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(signalled);

        let options = store.snapshot().unwrap();
        assert_eq!(options.displayed_text, "hello");
        assert_eq!(options.font_family_name, "Consolas");
        assert!(store.is_ready());
        assert!(!store.take_ready_signal());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");

        let store = ConfigStore::at_path(&path, Handle::current());
        let saved = store
            .update(|o| {
                o.text_color = "Blue".to_string();
                o.position_top = true;
            })
            .unwrap();
        assert_eq!(saved.text_color, "Blue");
        assert_eq!(store.snapshot().unwrap(), saved);

        let reopened = ConfigStore::at_path(&path, Handle::current());
        let loaded = reopened.load_blocking().unwrap();
        assert_eq!(loaded, saved);
        assert!(reopened.is_config_file(&path));
    }
}
