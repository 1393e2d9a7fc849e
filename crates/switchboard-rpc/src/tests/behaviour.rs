//! Behaviour-driven tests for request dispatch.

use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    CallError, CallResult, DispatchEngine, ParamType, ParameterDescriptor, Params,
    ProcedureDescriptor, ProcedureSet, ServiceIdentity,
};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    engine: Option<DispatchEngine>,
    response: Option<Option<String>>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    path: String,
}

fn list(params: Params) -> CallResult {
    let ListArgs { path } = params.decode()?;
    Ok(json!([format!("{path}/a"), format!("{path}/b")]))
}

fn files_service(name: &str) -> ProcedureSet {
    let list_descriptor = ProcedureDescriptor::builder("list")
        .summary("Lists a directory")
        .param(ParameterDescriptor::named("path", ParamType::Str))
        .returns(ParamType::Arr)
        .build()
        .expect("valid descriptor");
    let broken_descriptor = ProcedureDescriptor::builder("broken")
        .build()
        .expect("valid descriptor");
    ProcedureSet::new(name)
        .with(list_descriptor, list)
        .with(broken_descriptor, |_params: Params| -> CallResult {
            Err(CallError::failure("always broken"))
        })
}

fn response_value(world: &TestWorld) -> Value {
    let text = world
        .response
        .as_ref()
        .expect("no request sent")
        .as_ref()
        .expect("expected a response");
    serde_json::from_str(text).expect("response is JSON")
}

fn described_names(world: &TestWorld) -> Vec<String> {
    response_value(world)["result"]["procs"]
        .as_array()
        .expect("procs array")
        .iter()
        .filter_map(|proc| proc["name"].as_str().map(str::to_owned))
        .collect()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a dispatch engine with a {service} service")]
fn given_engine(world: &mut TestWorld, service: String) {
    let mut engine = DispatchEngine::new(ServiceIdentity::new("behaviour", "urn:uuid:behaviour"));
    engine
        .register_service(Arc::new(files_service(service.trim_matches('"'))))
        .expect("register service");
    world.engine = Some(engine);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the client sends {request}")]
fn when_client_sends(world: &mut TestWorld, request: String) {
    let engine = world.engine.as_ref().expect("engine configured");
    world.response = Some(engine.handle(&request));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the response result is {expected}")]
fn then_result(world: &mut TestWorld, expected: String) {
    let expected: Value = serde_json::from_str(&expected).expect("expected value is JSON");
    assert_eq!(response_value(world)["result"], expected);
}

#[then("the response error code is {code}")]
fn then_error_code(world: &mut TestWorld, code: i64) {
    assert_eq!(response_value(world)["error"]["code"], json!(code));
}

#[then("the response id is {id}")]
fn then_response_id(world: &mut TestWorld, id: String) {
    let expected: Value = serde_json::from_str(&id).expect("expected id is JSON");
    assert_eq!(response_value(world)["id"], expected);
}

#[then("no response is produced")]
fn then_no_response(world: &mut TestWorld) {
    let response = world.response.as_ref().expect("no request sent");
    assert!(response.is_none(), "unexpected response: {response:?}");
}

#[then("the described procedures include {name}")]
fn then_described_include(world: &mut TestWorld, name: String) {
    let expected = name.trim_matches('"');
    let names = described_names(world);
    assert!(
        names.iter().any(|n| n == expected),
        "expected '{expected}' in {names:?}"
    );
}

#[then("the described procedures exclude {name}")]
fn then_described_exclude(world: &mut TestWorld, name: String) {
    let unexpected = name.trim_matches('"');
    let names = described_names(world);
    assert!(
        names.iter().all(|n| n != unexpected),
        "did not expect '{unexpected}' in {names:?}"
    );
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/dispatch.feature")]
fn dispatch_behaviour(world: TestWorld) {
    let _ = world;
}
