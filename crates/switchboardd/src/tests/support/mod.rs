//! Test harness utilities shared by the daemon suites.

mod config_loader;
mod reporter;

pub use config_loader::{FailingConfigLoader, TEST_SERVICE_NAME, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
