//! Then steps for walker dispatch BDD scenarios.

use super::world::DispatchWorld;
use rstest_bdd_macros::then;
use serde_json::Value;
use walker_runtime::capability::services::CapabilityError;

#[then(r#"walker "{name}" resolves as "{kind}""#)]
fn walker_resolves_as(world: &mut DispatchWorld, name: String, kind: String) -> Result<(), eyre::Report> {
    let resolution = world.dispatcher()?.cache().resolve(&name)?;
    let actual = serde_json::to_value(resolution.outcome().kind())?;
    if actual != Value::String(kind.clone()) {
        return Err(eyre::eyre!("expected walker '{name}' to resolve as {kind}, got {actual}"));
    }
    Ok(())
}

#[then(r#"the invocation succeeds with operation "{operation}""#)]
fn invocation_succeeds(world: &mut DispatchWorld, operation: String) -> Result<(), eyre::Report> {
    let result = world
        .last_invocation()?
        .as_ref()
        .map_err(|err| eyre::eyre!("invocation was rejected: {err}"))?;
    if !result.is_success() {
        return Err(eyre::eyre!("expected success, got {result:?}"));
    }
    let invoked = result.operation_invoked().map(|name| name.as_str());
    if invoked != Some(operation.as_str()) {
        return Err(eyre::eyre!("expected operation {operation}, got {invoked:?}"));
    }
    Ok(())
}

#[then(r#"the fallback response echoes parameter "{key}" as "{value}""#)]
fn fallback_echoes_parameter(
    world: &mut DispatchWorld,
    key: String,
    value: String,
) -> Result<(), eyre::Report> {
    let expected: Value = serde_json::from_str(&value)?;
    let result = world
        .last_invocation()?
        .as_ref()
        .map_err(|err| eyre::eyre!("invocation was rejected: {err}"))?;
    let data = result
        .data()
        .ok_or_else(|| eyre::eyre!("fallback response carries no data"))?;
    if data.get("status") != Some(&Value::from("fallback")) {
        return Err(eyre::eyre!("expected a fallback response, got {data}"));
    }
    let echoed = data.get("parameters").and_then(|parameters| parameters.get(&key));
    if echoed != Some(&expected) {
        return Err(eyre::eyre!("expected {key} = {expected}, got {echoed:?}"));
    }
    Ok(())
}

#[then(r#"the invocation fails with message "{message}""#)]
fn invocation_fails(world: &mut DispatchWorld, message: String) -> Result<(), eyre::Report> {
    let result = world
        .last_invocation()?
        .as_ref()
        .map_err(|err| eyre::eyre!("invocation was rejected: {err}"))?;
    if result.is_success() || result.message() != Some(message.as_str()) {
        return Err(eyre::eyre!("expected error '{message}', got {result:?}"));
    }
    if result.operation_invoked().is_some() {
        return Err(eyre::eyre!("error results must not name an operation"));
    }
    Ok(())
}

#[then("health reports {count:usize} walkers present")]
fn health_reports_present(world: &mut DispatchWorld, count: usize) -> Result<(), eyre::Report> {
    let health = world.dispatcher()?.cache().health();
    let present = health.values().filter(|present| **present).count();
    if present != count || health.len() != count {
        return Err(eyre::eyre!("expected {count} present walkers, got {health:?}"));
    }
    Ok(())
}

#[then("the invocation is rejected as unknown")]
fn invocation_rejected(world: &mut DispatchWorld) -> Result<(), eyre::Report> {
    let result = world.last_invocation()?;
    if !matches!(result, Err(CapabilityError::UnknownCapability(_))) {
        return Err(eyre::eyre!("expected unknown capability error, got {result:?}"));
    }
    Ok(())
}

#[then("no walker has been resolved")]
fn nothing_resolved(world: &mut DispatchWorld) -> Result<(), eyre::Report> {
    let dispatcher = world.dispatcher()?;
    let runs = dispatcher.cache().pipeline().resolution_count();
    if runs != 0 || !dispatcher.cache().loaded().is_empty() {
        return Err(eyre::eyre!("expected no resolutions, pipeline ran {runs} times"));
    }
    Ok(())
}
