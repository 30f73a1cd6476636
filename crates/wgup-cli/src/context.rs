//! Shared state handed to command handlers.

use wgup_core::ConfigStore;
use wgup_keys::KeyProvider;

use crate::config::Settings;
use crate::error::CliError;
use crate::service::ServiceManager;

/// Settings plus the collaborators every command needs.
///
/// The store is loaded on first use so commands that never touch it, such
/// as `version`, do not read the config directory.
pub struct Context {
    settings: Settings,
    store: Option<ConfigStore>,
    keys: Box<dyn KeyProvider>,
    service: Box<dyn ServiceManager>,
}

impl Context {
    /// Builds the context with the collaborators selected by `settings`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let keys = settings.key_provider();
        let service = Box::new(settings.service_manager());
        Self::with_parts(settings, keys, service)
    }

    /// Builds the context from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        settings: Settings,
        keys: Box<dyn KeyProvider>,
        service: Box<dyn ServiceManager>,
    ) -> Self {
        Self {
            settings,
            store: None,
            keys,
            service,
        }
    }

    /// Invocation settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The service manager.
    #[must_use]
    pub fn service(&self) -> &dyn ServiceManager {
        self.service.as_ref()
    }

    /// The config store, loaded on first call.
    ///
    /// # Errors
    ///
    /// Returns the load error; a version mismatch or malformed document is
    /// fatal.
    pub fn store(&mut self) -> Result<&mut ConfigStore, CliError> {
        loaded(&mut self.store, &self.settings)
    }

    /// The config store together with the key provider, for operations that
    /// generate keys.
    ///
    /// # Errors
    ///
    /// Same as [`Context::store`].
    pub fn store_and_keys(&mut self) -> Result<(&mut ConfigStore, &dyn KeyProvider), CliError> {
        let store = loaded(&mut self.store, &self.settings)?;
        Ok((store, self.keys.as_ref()))
    }
}

fn loaded<'a>(
    slot: &'a mut Option<ConfigStore>,
    settings: &Settings,
) -> Result<&'a mut ConfigStore, CliError> {
    let store = match slot.take() {
        Some(store) => store,
        None => ConfigStore::open(&settings.config_dir)?,
    };
    Ok(slot.insert(store))
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("loaded", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn context(dir: &std::path::Path) -> Context {
        let cli = Cli::parse_from([
            "wgup",
            "--config-dir",
            dir.to_str().expect("utf-8 path"),
            "version",
        ]);
        Context::new(Settings::from_cli(&cli))
    }

    #[test]
    fn store_loads_lazily() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(dir.path());
        assert!(format!("{ctx:?}").contains("loaded: false"));

        assert_eq!(ctx.store().expect("empty store").interfaces().len(), 0);
        assert!(format!("{ctx:?}").contains("loaded: true"));
    }

    #[test]
    fn load_errors_surface_on_first_access() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(wgup_core::INTERFACES_FILE),
            r#"{"version": 99, "interfaces": []}"#,
        )
        .expect("write");
        let mut ctx = context(dir.path());
        let err = ctx.store().expect_err("version mismatch");
        assert!(matches!(
            err,
            CliError::Core(wgup_core::Error::ConfigVersion { found: 99, .. })
        ));
    }
}
