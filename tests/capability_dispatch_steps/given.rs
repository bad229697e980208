//! Given steps for walker dispatch BDD scenarios.

use super::world::DispatchWorld;
use rstest_bdd_macros::given;
use serde_json::Value;
use std::sync::Arc;
use walker_runtime::capability::{
    adapters::NativeCapability,
    domain::{Capability, OperationError, OperationName},
};

#[given(r#"walkers "{first}", "{second}" and "{third}" are registered"#)]
fn walkers_are_registered(world: &mut DispatchWorld, first: String, second: String, third: String) {
    world.names = vec![first, second, third];
}

#[given(r#"walker "{name}" is linked natively with operation "{operation}""#)]
fn walker_linked_natively(
    world: &mut DispatchWorld,
    name: String,
    operation: String,
) -> Result<(), eyre::Report> {
    let operation_name = OperationName::new(operation.as_str())?;
    let natives = std::mem::take(&mut world.natives);
    world.natives = natives.with_module(format!("walkers.{name}"), move || {
        let label = operation_name.to_string();
        Arc::new(
            NativeCapability::new().with_operation(operation_name.clone(), move |_| {
                Ok(Value::String(format!("{label} done")))
            }),
        ) as Arc<dyn Capability>
    });
    Ok(())
}

#[given(r#"walker "{name}" has a native operation "{operation}" that fails with "{message}""#)]
fn walker_with_failing_operation(
    world: &mut DispatchWorld,
    name: String,
    operation: String,
    message: String,
) -> Result<(), eyre::Report> {
    let operation_name = OperationName::new(operation.as_str())?;
    let natives = std::mem::take(&mut world.natives);
    world.natives = natives.with_module(format!("walkers.{name}"), move || {
        let reason = message.clone();
        Arc::new(
            NativeCapability::new().with_operation(operation_name.clone(), move |_| {
                Err(OperationError::Failed(reason.clone()))
            }),
        ) as Arc<dyn Capability>
    });
    Ok(())
}

#[given(r#"walker "{name}" has a source artifact"#)]
fn walker_has_source(world: &mut DispatchWorld, name: String) -> Result<(), eyre::Report> {
    world.write_source(&name)
}

#[given("source execution is enabled")]
fn source_execution_enabled(world: &mut DispatchWorld) {
    world.source_execution = true;
}
