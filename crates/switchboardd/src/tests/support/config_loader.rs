//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use switchboard_config::{Config, ListenEndpoint, PluginDirective};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Service name configured by [`TestConfigLoader`].
pub const TEST_SERVICE_NAME: &str = "switchboard-test";

/// Loader that binds an ephemeral loopback port and logs under a temporary
/// directory.
pub struct TestConfigLoader {
    _dir: TempDir,
    log_directory: Utf8PathBuf,
    listen: ListenEndpoint,
    plugins: Vec<PluginDirective>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary log directory");
        let log_directory = Utf8PathBuf::from_path_buf(dir.path().join("logs"))
            .expect("temporary log directory was not valid UTF-8");
        Self {
            _dir: dir,
            log_directory,
            listen: ListenEndpoint::new("127.0.0.1", 0),
            plugins: Vec::new(),
        }
    }

    /// Adds a plugin directive to the loaded configuration.
    #[must_use]
    pub fn with_directive(mut self, directive: PluginDirective) -> Self {
        self.plugins.push(directive);
        self
    }

    /// Binds `listen` instead of an ephemeral port.
    #[must_use]
    pub fn with_listen(mut self, listen: ListenEndpoint) -> Self {
        self.listen = listen;
        self
    }

    /// Directory the remote logging service writes to.
    #[must_use]
    pub fn log_directory(&self) -> &Utf8Path {
        &self.log_directory
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen: self.listen.clone(),
            service_name: TEST_SERVICE_NAME.to_owned(),
            service_id: Some("urn:uuid:switchboard-test".to_owned()),
            plugins: self.plugins.clone(),
            log_directory: self.log_directory.clone(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid listen endpoint.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("switchboardd"),
            OsString::from("--listen"),
            OsString::from("invalid://endpoint"),
        ];
        Config::load_from_iter(args)
    }
}
