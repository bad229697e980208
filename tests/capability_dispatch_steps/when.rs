//! When steps for walker dispatch BDD scenarios.

use super::world::{DispatchWorld, run_async, start};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use serde_json::Value;
use walker_runtime::capability::domain::Parameters;

#[when("the runtime starts")]
fn runtime_starts(world: &mut DispatchWorld) -> Result<(), eyre::Report> {
    start(world).wrap_err("assemble runtime from configuration")
}

#[when(r#"walker "{name}" is invoked"#)]
fn walker_invoked(world: &mut DispatchWorld, name: String) -> Result<(), eyre::Report> {
    let result = run_async(world.dispatcher()?.invoke(&name, None, Parameters::new()));
    world.last_invocation = Some(result);
    Ok(())
}

#[when(r#"walker "{name}" is invoked with operation "{operation}""#)]
fn walker_invoked_with_operation(
    world: &mut DispatchWorld,
    name: String,
    operation: String,
) -> Result<(), eyre::Report> {
    let result = run_async(world.dispatcher()?.invoke(&name, Some(&operation), Parameters::new()));
    world.last_invocation = Some(result);
    Ok(())
}

#[when(r#"walker "{name}" is invoked with parameter "{key}" set to "{value}""#)]
fn walker_invoked_with_parameter(
    world: &mut DispatchWorld,
    name: String,
    key: String,
    value: String,
) -> Result<(), eyre::Report> {
    let parsed: Value = serde_json::from_str(&value).wrap_err("parameter value is JSON")?;
    let mut parameters = Parameters::new();
    parameters.insert(key, parsed);
    let result = run_async(world.dispatcher()?.invoke(&name, None, parameters));
    world.last_invocation = Some(result);
    Ok(())
}

#[when(r#"walker "{name}" gains a source artifact"#)]
fn walker_gains_source(world: &mut DispatchWorld, name: String) -> Result<(), eyre::Report> {
    world.write_source(&name)
}

#[when("the runtime reloads")]
fn runtime_reloads(world: &mut DispatchWorld) -> Result<(), eyre::Report> {
    let report = world.dispatcher()?.cache().reload();
    if report.total() != world.names.len() {
        return Err(eyre::eyre!(
            "expected {} reloaded walkers, got {}",
            world.names.len(),
            report.total()
        ));
    }
    Ok(())
}
