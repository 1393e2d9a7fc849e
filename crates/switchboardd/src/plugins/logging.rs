//! Remote logging service.
//!
//! Clients record messages in named logs with `logging.log(name, level,
//! message)`. Each message is emitted through `tracing` and appended to
//! `<log_directory>/<name>.log`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;
use switchboard_config::{Config, default_log_directory};
use switchboard_plugins::{Plugin, PluginError, PluginManager};
use switchboard_rpc::{
    CallError, CallResult, ParamType, ParameterDescriptor, Params, ProcedureDescriptor, RpcError,
    ServiceBundle,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{Level, debug, error, info, trace, warn};

/// Identifier of the remote logging plugin.
pub const RPC_LOGGING_PLUGIN: &str = "switchboard.rpclogging";

/// Namespace the remote logging plugin serves.
pub const LOGGING_SERVICE: &str = "logging";

const LOG_PROCEDURE: &str = "log";
const REMOTE_TARGET: &str = "switchboard::remote";

/// Plugin serving the `logging` namespace.
#[derive(Debug)]
pub struct RpcLogging {
    directory: Utf8PathBuf,
    descriptor: ProcedureDescriptor,
    files: Mutex<()>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LogArgs {
    name: Value,
    level: Value,
    message: Value,
}

impl RpcLogging {
    /// Builds the plugin, writing logs under the configured log directory.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Failed`] when the procedure metadata is
    /// invalid.
    pub fn from_manager(manager: &PluginManager) -> Result<Self, PluginError> {
        let directory = manager.context::<Config>().map_or_else(default_log_directory, |config| {
            config.log_directory().to_owned()
        });
        Self::new(directory)
    }

    /// Builds the plugin writing logs under `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Failed`] when the procedure metadata is
    /// invalid.
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Result<Self, PluginError> {
        let descriptor = ProcedureDescriptor::builder(LOG_PROCEDURE)
            .summary("Logs a message to the named logger with a given log level.")
            .param(ParameterDescriptor::named("name", ParamType::Str))
            .param(ParameterDescriptor::named("level", ParamType::Num))
            .param(ParameterDescriptor::named("message", ParamType::Str))
            .build()
            .map_err(|error| PluginError::failed(error.to_string()))?;
        Ok(Self {
            directory: directory.into(),
            descriptor,
            files: Mutex::new(()),
        })
    }

    /// Directory receiving the named logs.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    fn log(&self, params: Params) -> CallResult {
        let LogArgs {
            name,
            level,
            message,
        } = params.decode()?;
        let (Value::String(name), Some(level), Value::String(message)) =
            (name, level.as_f64(), message)
        else {
            return Ok(Value::Null);
        };
        let level = tracing_level(level);
        emit(level, &name, &message);
        self.append(&name, level, &message)
            .map_err(CallError::failure)?;
        Ok(Value::Null)
    }

    fn append(&self, name: &str, level: Level, message: &str) -> io::Result<()> {
        if Utf8Path::new(name).file_name() != Some(name) {
            warn!(target: REMOTE_TARGET, logger = name, "log name is not a plain file name");
            return Ok(());
        }
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(io::Error::other)?;
        let line = format!("{timestamp} {:<8} {message}\n", level.as_str());
        let path = self.directory.join(format!("{name}.log"));
        let _guard = self
            .files
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }
}

impl Plugin for RpcLogging {
    fn initialise(&self, _manager: &PluginManager) -> Result<(), PluginError> {
        fs::create_dir_all(&self.directory).map_err(|error| {
            PluginError::failed(format!(
                "failed to create log directory '{}': {error}",
                self.directory
            ))
        })
    }
}

impl ServiceBundle for RpcLogging {
    fn service_name(&self) -> &str {
        LOGGING_SERVICE
    }

    fn procedure_names(&self) -> Vec<String> {
        vec![String::from(LOG_PROCEDURE)]
    }

    fn describe_procedure(&self, name: &str) -> Option<ProcedureDescriptor> {
        (name == LOG_PROCEDURE).then(|| self.descriptor.clone())
    }

    fn invoke(&self, name: &str, params: Params) -> CallResult {
        if name == LOG_PROCEDURE {
            self.log(params)
        } else {
            Err(RpcError::method_not_found(format!("{name} in service {LOGGING_SERVICE}")).into())
        }
    }
}

/// Maps a numeric level onto `tracing` levels: 40 and above is an error,
/// 30 a warning, 20 info, 10 debug and anything lower trace.
fn tracing_level(level: f64) -> Level {
    if level >= 40.0 {
        Level::ERROR
    } else if level >= 30.0 {
        Level::WARN
    } else if level >= 20.0 {
        Level::INFO
    } else if level >= 10.0 {
        Level::DEBUG
    } else {
        Level::TRACE
    }
}

fn emit(level: Level, logger: &str, message: &str) {
    match level {
        Level::ERROR => error!(target: REMOTE_TARGET, logger, "{message}"),
        Level::WARN => warn!(target: REMOTE_TARGET, logger, "{message}"),
        Level::INFO => info!(target: REMOTE_TARGET, logger, "{message}"),
        Level::DEBUG => debug!(target: REMOTE_TARGET, logger, "{message}"),
        _ => trace!(target: REMOTE_TARGET, logger, "{message}"),
    }
}
