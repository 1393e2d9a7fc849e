//! Unit tests for the extension registry.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::manager::AlwaysEnabled;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct Greeting;

impl Interface for Greeting {
    type Object = dyn Greeter;
    const ID: InterfaceId = InterfaceId::new("test.greeting");
}

struct Farewell;

impl Interface for Farewell {
    type Object = dyn Greeter;
    const ID: InterfaceId = InterfaceId::new("test.farewell");
}

struct English;

impl Plugin for English {}

impl Greeter for English {
    fn greet(&self) -> String {
        String::from("hello")
    }
}

struct French;

impl Plugin for French {}

impl Greeter for French {
    fn greet(&self) -> String {
        String::from("bonjour")
    }
}

#[fixture]
fn registry() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    registry
        .define("test.french", |_| Ok(French))
        .expect("french is new")
        .implements::<Greeting, _>(|plugin| plugin);
    registry
        .define("test.english", |_| Ok(English))
        .expect("english is new")
        .implements::<Greeting, _>(|plugin| plugin)
        .implements::<Farewell, _>(|plugin| plugin);
    registry
}

#[rstest]
fn providers_follow_definition_order(registry: ExtensionRegistry) {
    let providers: Vec<&str> = registry
        .providers_of(Greeting::ID)
        .iter()
        .map(PluginId::as_str)
        .collect();
    assert_eq!(providers, ["test.french", "test.english"]);
}

#[rstest]
fn unknown_interface_has_no_providers(registry: ExtensionRegistry) {
    assert!(
        registry
            .providers_of(InterfaceId::new("test.unknown"))
            .is_empty()
    );
}

#[rstest]
fn interfaces_are_recorded_per_provider(registry: ExtensionRegistry) {
    let farewell: Vec<&str> = registry
        .providers_of(Farewell::ID)
        .iter()
        .map(PluginId::as_str)
        .collect();
    assert_eq!(farewell, ["test.english"]);
}

#[rstest]
fn duplicate_definition_is_rejected(mut registry: ExtensionRegistry) {
    let result = registry.define("test.english", |_| Ok(English));
    assert!(matches!(
        result.err(),
        Some(RegistryError::DuplicatePlugin { plugin }) if plugin.as_str() == "test.english"
    ));
}

#[rstest]
fn lists_plugins_in_identifier_order(registry: ExtensionRegistry) {
    let plugins: Vec<&str> = registry.plugins().map(PluginId::as_str).collect();
    assert_eq!(plugins, ["test.english", "test.french"]);
    assert!(registry.contains("test.french"));
    assert!(!registry.contains("test.german"));
}

#[rstest]
fn casts_instances_through_declared_interfaces(registry: ExtensionRegistry) {
    let registry = Arc::new(registry);
    let manager = PluginManager::new(Arc::clone(&registry), Arc::new(AlwaysEnabled));
    let french = PluginId::new("test.french");
    let instance = registry
        .construct(&french, &manager)
        .expect("french constructs");

    let greeter = registry
        .cast::<Greeting>(&french, Arc::clone(&instance.any))
        .expect("french greets");
    assert_eq!(greeter.greet(), "bonjour");
    assert!(registry.cast::<Farewell>(&french, instance.any).is_none());
}

#[rstest]
fn constructing_unknown_plugin_fails(registry: ExtensionRegistry) {
    let registry = Arc::new(registry);
    let manager = PluginManager::new(Arc::clone(&registry), Arc::new(AlwaysEnabled));
    let result = registry.construct(&PluginId::new("test.german"), &manager);
    assert!(matches!(result, Err(PluginError::NotRegistered { .. })));
}

#[test]
fn factory_failures_name_the_plugin() {
    let mut registry = ExtensionRegistry::new();
    registry
        .define("test.broken", |_| -> Result<English, PluginError> {
            Err(PluginError::failed("no dictionary"))
        })
        .expect("broken is new");
    let registry = Arc::new(registry);
    let manager = PluginManager::new(Arc::clone(&registry), Arc::new(AlwaysEnabled));

    let error = registry
        .construct(&PluginId::new("test.broken"), &manager)
        .err()
        .expect("factory fails");
    assert!(matches!(error, PluginError::Construction { .. }));
    assert!(error.to_string().contains("no dictionary"));
}
