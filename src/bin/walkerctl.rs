//! Operator tool for the walker runtime.
//!
//! Usage:
//!
//! ```text
//! walkerctl init <config-path>
//! walkerctl health <config-path>
//! walkerctl operations <config-path> <name>
//! walkerctl invoke <config-path> <name> [operation|-] [params-json]
//! ```
//!
//! `init` reports which walker source artifacts exist, resolves every
//! registered walker and prints the health report. `invoke` prints the
//! invocation result envelope as JSON; `-` leaves operation selection to the
//! dispatcher.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::DefaultClock;
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Builder;
use walker_runtime::capability::adapters::NativeModuleTable;
use walker_runtime::capability::domain::{
    CapabilityRegistry, InvocationResult, Parameters, ResourceLocator,
};
use walker_runtime::capability::services::{CapabilityError, Dispatcher};
use walker_runtime::config::{ConfigError, LoaderConfig};
use walker_runtime::telemetry::init_tracing;

/// Time allowed for blocking work to finish after an invocation returns.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
enum CliError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error("invalid parameters: {0}")]
    Parameters(String),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(String),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, PartialEq)]
enum Command {
    Init,
    Health,
    Operations {
        name: String,
    },
    Invoke {
        name: String,
        operation: Option<String>,
        parameters: Parameters,
    },
}

fn main() -> Result<(), BoxError> {
    init_tracing().map_err(CliError::from)?;
    let args = collect_args()?;
    run(args.into_iter()).map_err(Into::into)
}

fn collect_args() -> Result<Vec<String>, CliError> {
    env::args_os()
        .map(|arg_os| {
            arg_os
                .into_string()
                .map_err(|_| CliError::InvalidArgs("argument is not valid UTF-8".into()))
        })
        .collect()
}

fn run(args: impl Iterator<Item = String>) -> Result<(), CliError> {
    let (command, config_path) = parse_args(args)?;
    let config = LoaderConfig::load(&config_path)?;
    let dispatcher = config.dispatcher(
        Arc::new(NativeModuleTable::new()),
        Arc::new(DefaultClock),
    )?;

    match command {
        Command::Init => {
            report_source_artifacts(dispatcher.cache().registry());
            warm(&dispatcher);
            write_json(&dispatcher.cache().health_report())
        }
        Command::Health => {
            warm(&dispatcher);
            write_json(&dispatcher.cache().health_report())
        }
        Command::Operations { name } => write_json(&dispatcher.operations(&name)?),
        Command::Invoke {
            name,
            operation,
            parameters,
        } => {
            let result = invoke(&dispatcher, &name, operation.as_deref(), parameters)?;
            write_json(&result)
        }
    }
}

fn parse_args(
    mut args: impl Iterator<Item = String>,
) -> Result<(Command, Utf8PathBuf), CliError> {
    let _program = args.next();
    let command_name = args
        .next()
        .ok_or_else(|| CliError::InvalidArgs("missing command argument".into()))?;
    let config_path = args
        .next()
        .map(Utf8PathBuf::from)
        .ok_or_else(|| CliError::InvalidArgs("missing config path argument".into()))?;

    let command = match command_name.as_str() {
        "init" => Command::Init,
        "health" => Command::Health,
        "operations" => Command::Operations {
            name: required(args.next(), "capability name")?,
        },
        "invoke" => {
            let name = required(args.next(), "capability name")?;
            let operation = args.next().filter(|hint| hint != "-");
            let parameters = args
                .next()
                .map(|raw| parse_parameters(&raw))
                .transpose()?
                .unwrap_or_default();
            Command::Invoke {
                name,
                operation,
                parameters,
            }
        }
        other => {
            return Err(CliError::InvalidArgs(format!(
                "unknown command '{other}'; expected init, health, operations, or invoke"
            )));
        }
    };

    if let Some(extra) = args.next() {
        return Err(CliError::InvalidArgs(format!(
            "unexpected extra argument: {extra}"
        )));
    }
    Ok((command, config_path))
}

fn required(value: Option<String>, what: &str) -> Result<String, CliError> {
    value.ok_or_else(|| CliError::InvalidArgs(format!("missing {what} argument")))
}

fn parse_parameters(raw: &str) -> Result<Parameters, CliError> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(parameters)) => Ok(parameters),
        Ok(_) => Err(CliError::Parameters("expected a JSON object".into())),
        Err(err) => Err(CliError::Parameters(err.to_string())),
    }
}

fn invoke(
    dispatcher: &Dispatcher<DefaultClock>,
    name: &str,
    operation: Option<&str>,
    parameters: Parameters,
) -> Result<InvocationResult, CliError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::RuntimeInit)?;
    let result = runtime.block_on(dispatcher.invoke(name, operation, parameters));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(result?)
}

fn warm(dispatcher: &Dispatcher<DefaultClock>) {
    let health = dispatcher.cache().health();
    let present = health.values().filter(|present| **present).count();
    tracing::info!(present, total = health.len(), "capabilities resolved");
}

fn report_source_artifacts(registry: &CapabilityRegistry) {
    let mut found = 0_usize;
    for descriptor in registry.descriptors() {
        let Some(source) = descriptor.locator().source_path() else {
            tracing::info!(capability = %descriptor.name(), "no source artifact registered");
            continue;
        };
        if source_exists(descriptor.locator()) {
            found += 1;
            tracing::info!(capability = %descriptor.name(), source = %source, "found source artifact");
        } else {
            tracing::warn!(capability = %descriptor.name(), source = %source, "missing source artifact");
        }
    }
    tracing::info!(found, total = registry.len(), "source artifact check complete");
}

fn source_exists(locator: &ResourceLocator) -> bool {
    let (Some(dir_path), Some(file_name)) = (
        locator.source_dir(),
        locator.source_path().and_then(Utf8Path::file_name),
    ) else {
        return false;
    };
    Dir::open_ambient_dir(dir_path, ambient_authority())
        .map(|dir| dir.is_file(file_name))
        .unwrap_or(false)
}

fn write_json(value: &impl Serialize) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)
        .map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(stdout).map_err(|err| CliError::Output(err.to_string()))
}
