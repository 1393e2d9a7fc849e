//! Behaviour-driven tests for extension points and plugin enablement.

use std::sync::{Arc, Mutex};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::{
    EnablementPolicy, ExtensionPoint, ExtensionRegistry, Interface, InterfaceId, Plugin,
    PluginError, PluginId, PluginManager,
};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    registry: ExtensionRegistry,
    manager: Option<PluginManager>,
    constructed: Arc<Mutex<Vec<String>>>,
    greetings: Vec<String>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

trait Greets: Send + Sync {
    fn greeting(&self) -> &str;
}

struct Greeting;

impl Interface for Greeting {
    type Object = dyn Greets;
    const ID: InterfaceId = InterfaceId::new("behaviour.greeting");
}

struct Greeter {
    greeting: String,
    fails: bool,
}

impl Plugin for Greeter {
    fn initialise(&self, _manager: &PluginManager) -> Result<(), PluginError> {
        if self.fails {
            return Err(PluginError::failed("greeter lost its voice"));
        }
        Ok(())
    }
}

impl Greets for Greeter {
    fn greeting(&self) -> &str {
        &self.greeting
    }
}

struct DenyList(Vec<String>);

impl EnablementPolicy for DenyList {
    fn is_enabled(&self, plugin: &PluginId) -> bool {
        !self.0.iter().any(|denied| denied == plugin.as_str())
    }
}

fn define_greeter(world: &mut TestWorld, plugin: &str, fails: bool) {
    let constructed = Arc::clone(&world.constructed);
    let id = plugin.to_owned();
    let greeting = plugin.rsplit('.').next().unwrap_or(plugin).to_owned();
    world
        .registry
        .define(plugin, move |_| {
            constructed
                .lock()
                .expect("construction log")
                .push(id.clone());
            Ok(Greeter {
                greeting: greeting.clone(),
                fails,
            })
        })
        .expect("greeter is new")
        .implements::<Greeting, _>(|greeter| greeter);
}

fn install_manager(world: &mut TestWorld, denied: Vec<String>) {
    let registry = std::mem::take(&mut world.registry);
    world.manager = Some(PluginManager::new(
        Arc::new(registry),
        Arc::new(DenyList(denied)),
    ));
}

fn manager(world: &TestWorld) -> &PluginManager {
    world.manager.as_ref().expect("manager configured")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("greeters {first} and {second} are defined")]
fn given_greeters(world: &mut TestWorld, first: String, second: String) {
    define_greeter(world, first.trim_matches('"'), false);
    define_greeter(world, second.trim_matches('"'), false);
}

#[given("a failing greeter {plugin} is defined")]
fn given_failing_greeter(world: &mut TestWorld, plugin: String) {
    define_greeter(world, plugin.trim_matches('"'), true);
}

#[given("a permissive plugin manager")]
fn given_permissive_manager(world: &mut TestWorld) {
    install_manager(world, Vec::new());
}

#[given("a plugin manager that disables {plugin}")]
fn given_restrictive_manager(world: &mut TestWorld, plugin: String) {
    install_manager(world, vec![plugin.trim_matches('"').to_owned()]);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the greeting extensions are read")]
fn when_extensions_read(world: &mut TestWorld) {
    let greetings = ExtensionPoint::<Greeting>::new()
        .extensions(manager(world))
        .iter()
        .map(|greeter| greeter.greeting().to_owned())
        .collect();
    world.greetings = greetings;
}

#[when("{plugin} is disabled")]
fn when_plugin_disabled(world: &mut TestWorld, plugin: String) {
    manager(world)
        .set_enabled(&PluginId::new(plugin.trim_matches('"')), false)
        .expect("state lock");
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the greetings are {expected}")]
fn then_greetings(world: &mut TestWorld, expected: String) {
    let expected: Vec<&str> = expected
        .trim_matches('"')
        .split(',')
        .filter(|greeting| !greeting.is_empty())
        .collect();
    assert_eq!(world.greetings, expected);
}

#[then("{plugin} was never constructed")]
fn then_never_constructed(world: &mut TestWorld, plugin: String) {
    let plugin = plugin.trim_matches('"');
    let constructed = world.constructed.lock().expect("construction log");
    assert!(
        constructed.iter().all(|id| id != plugin),
        "'{plugin}' was constructed: {constructed:?}"
    );
}

#[then("{plugin} was constructed once")]
fn then_constructed_once(world: &mut TestWorld, plugin: String) {
    let plugin = plugin.trim_matches('"');
    let constructed = world.constructed.lock().expect("construction log");
    let count = constructed.iter().filter(|id| *id == plugin).count();
    assert_eq!(count, 1, "construction log: {constructed:?}");
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/plugin_activation.feature")]
fn plugin_activation_behaviour(world: TestWorld) {
    let _ = world;
}
