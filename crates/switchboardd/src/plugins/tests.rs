//! Tests for the built-in plugin set.

use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use switchboard_config::{Config, PluginDirective, PluginState};
use switchboard_plugins::{ExtensionRegistry, PluginError, PluginManager, RegistryError};
use switchboard_rpc::ServiceIdentity;
use tempfile::TempDir;

use super::*;
use crate::environment::ConfigEnablementPolicy;
use crate::routing::RoutingDispatchEngine;

struct Harness {
    _dir: TempDir,
    logs: Utf8PathBuf,
    engine: RoutingDispatchEngine,
}

impl Harness {
    fn call(&self, method: &str, params: &Value) -> Value {
        let request = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
        let response = self
            .engine
            .handle(&request.to_string())
            .expect("request carries an id");
        serde_json::from_str(&response).expect("response is JSON")
    }
}

fn builtin_plugins() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    register_builtin_plugins(&mut registry).expect("built-ins register");
    registry
}

fn harness_with(directives: Vec<PluginDirective>) -> Harness {
    harness_from(directives, builtin_plugins())
}

fn harness_from(directives: Vec<PluginDirective>, registry: ExtensionRegistry) -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let logs = Utf8PathBuf::from_path_buf(dir.path().join("logs")).expect("UTF-8 temp path");
    let config = Arc::new(Config {
        log_directory: logs.clone(),
        plugins: directives,
        ..Config::default()
    });
    let policy = Arc::new(ConfigEnablementPolicy::new(Arc::clone(&config)));
    let manager = PluginManager::new(Arc::new(registry), policy).with_context(config);
    let engine = RoutingDispatchEngine::new(
        ServiceIdentity::new("switchboard", "urn:uuid:plugins"),
        Arc::new(manager),
    );
    Harness {
        _dir: dir,
        logs,
        engine,
    }
}

#[fixture]
fn harness() -> Harness {
    harness_with(Vec::new())
}

#[rstest]
fn log_appends_to_the_named_file(harness: Harness) {
    let response = harness.call("logging.log", &json!(["device", 30, "battery low"]));
    assert_eq!(response["result"], Value::Null);
    assert!(response.get("error").is_none(), "unexpected error: {response}");

    let contents = fs::read_to_string(harness.logs.join("device.log")).expect("log file written");
    assert!(contents.contains("WARN"), "missing level: {contents}");
    assert!(contents.ends_with("battery low\n"), "missing message: {contents}");
}

#[rstest]
fn log_accepts_keyed_arguments(harness: Harness) {
    let params = json!({"name": "device", "level": 10, "message": "booted"});
    let response = harness.call("logging.log", &params);
    assert_eq!(response["result"], Value::Null);

    let contents = fs::read_to_string(harness.logs.join("device.log")).expect("log file written");
    assert!(contents.contains("DEBUG"), "missing level: {contents}");
}

#[rstest]
#[case::numeric_name(json!([7, 30, "message"]))]
#[case::textual_level(json!(["device", "loud", "message"]))]
#[case::structured_message(json!(["device", 30, {"text": "message"}]))]
#[case::path_like_name(json!(["../escape", 30, "message"]))]
fn non_conforming_arguments_are_ignored(harness: Harness, #[case] params: Value) {
    let response = harness.call("logging.log", &params);
    assert_eq!(response["result"], Value::Null);
    assert!(!harness.logs.join("device.log").exists());
    assert!(!harness.logs.join("../escape.log").exists());
}

#[rstest]
#[case::missing_argument(json!(["device", 30]))]
#[case::extra_argument(json!(["device", 30, "message", "extra"]))]
#[case::unknown_key(json!({"name": "device", "level": 30, "message": "m", "colour": "red"}))]
fn call_shape_mismatches_are_invalid_params(harness: Harness, #[case] params: Value) {
    let response = harness.call("logging.log", &params);
    assert_eq!(response["error"]["code"], json!(-32602));
}

#[rstest]
fn unknown_members_are_not_found(harness: Harness) {
    let response = harness.call("logging.rotate", &json!([]));
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[rstest]
fn logging_procedures_are_listed(harness: Harness) {
    let response = harness.call("system.listMethods", &json!([]));
    assert_eq!(response["result"], json!(["logging.log"]));

    let response = harness.call("system.methodHelp", &json!(["logging.log"]));
    assert_eq!(
        response["result"],
        json!("Logs a message to the named logger with a given log level.")
    );
}

#[test]
fn disabled_logging_plugin_is_unreachable() {
    let harness = harness_with(vec![PluginDirective::new(
        RPC_LOGGING_PLUGIN,
        PluginState::Disabled,
    )]);
    let response = harness.call("logging.log", &json!(["device", 30, "message"]));
    assert_eq!(response["error"]["code"], json!(-32601));
    assert!(!harness.logs.exists(), "disabled plugin must not initialise");
}

#[test]
fn panicking_service_provider_does_not_silence_dispatch() {
    let mut registry = builtin_plugins();
    registry
        .define("acme.broken", |_| -> Result<RpcLogging, PluginError> {
            panic!("service factory exploded")
        })
        .expect("broken is new")
        .implements::<RpcService, _>(|plugin| plugin);
    let harness = harness_from(Vec::new(), registry);

    let response = harness.call("nonexistent.method", &json!([]));
    assert_eq!(response["error"]["code"], json!(-32601));

    let response = harness.call("logging.log", &json!(["device", 30, "still here"]));
    assert_eq!(response["result"], Value::Null);
    assert!(response.get("error").is_none(), "unexpected error: {response}");
}

#[test]
fn built_ins_register_once() {
    let mut registry = ExtensionRegistry::new();
    register_builtin_plugins(&mut registry).expect("first registration");
    let error = register_builtin_plugins(&mut registry).expect_err("second registration");
    assert!(matches!(error, RegistryError::DuplicatePlugin { .. }));
}
