use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    FieldErrors, FormEngine, InvisibleFieldValidation, OperationRegistry, Severity,
    configuration_schema, resolve,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Declarative form engine CLI",
    long_about = "Checks form configurations and evaluates them against JSON data"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    Skip,
    Validate,
    Warn,
}

impl From<PolicyArg> for InvisibleFieldValidation {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Skip => InvisibleFieldValidation::Skip,
            PolicyArg::Validate => InvisibleFieldValidation::Validate,
            PolicyArg::Warn => InvisibleFieldValidation::Warn,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Check a configuration for structural violations.
    Check {
        /// Path to the form configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Known delegate component; repeat to build a catalog.
        #[arg(long = "component", value_name = "NAME")]
        components: Vec<String>,
    },
    /// Print fields, dependencies and policy of a configuration.
    Describe {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
    },
    /// Print the visibility map for a data snapshot.
    Visibility {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
    },
    /// Validate a data snapshot; fails when blocking errors remain.
    Validate {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
        /// Override the configuration's invisible-field policy.
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// Print the resets owed after a field changed between two snapshots.
    Cascade {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Dot-path of the field that changed.
        #[arg(long, value_name = "FIELD")]
        field: String,
        /// Data before the change.
        #[arg(long, value_name = "PREVIOUS")]
        previous: PathBuf,
        /// Data after the change.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
        /// Print the data with resets applied instead of the resets.
        #[arg(long)]
        apply: bool,
    },
    /// Print the initial form data.
    Defaults {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Optional JSON deep-merged over the defaults.
        #[arg(long, value_name = "OVERRIDES")]
        overrides: Option<PathBuf>,
    },
    /// Print the JSON Schema of the configuration format.
    Schema,
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Check { config, components } => run_check(config, components),
        Command::Describe { config } => run_describe(config),
        Command::Visibility { config, data } => run_visibility(config, data),
        Command::Validate {
            config,
            data,
            policy,
        } => run_validate(config, data, policy),
        Command::Cascade {
            config,
            field,
            previous,
            data,
            apply,
        } => run_cascade(config, field, previous, data, apply),
        Command::Defaults { config, overrides } => run_defaults(config, overrides),
        Command::Schema => print_json(&configuration_schema()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn read_json(path: &Path) -> CliResult<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))?;
    Ok(value)
}

fn load_engine(path: &Path) -> CliResult<FormEngine> {
    let config = read_json(path)?;
    Ok(FormEngine::from_value(&config)?)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_check(config_path: PathBuf, components: Vec<String>) -> CliResult<()> {
    let config = read_json(&config_path)?;
    let catalog: BTreeSet<String> = components.into_iter().collect();
    let engine = if catalog.is_empty() {
        FormEngine::from_value(&config)?
    } else {
        let registry = OperationRegistry::with_defaults();
        FormEngine::from_value_with(&config, registry, Some(&catalog))?
    };
    println!(
        "Configuration ok: {} fields, {} dependency parents",
        engine.tree().fields().len(),
        engine.dependencies().len()
    );
    Ok(())
}

fn run_describe(config_path: PathBuf) -> CliResult<()> {
    let config = read_json(&config_path)?;
    let payload: Value = serde_json::from_str(&form_component::describe(&config.to_string()))?;
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return Err(error.into());
    }
    print_json(&payload)
}

fn run_visibility(config_path: PathBuf, data_path: PathBuf) -> CliResult<()> {
    let engine = load_engine(&config_path)?;
    let data = read_json(&data_path)?;
    print_json(&engine.visibility(&data))
}

fn run_validate(
    config_path: PathBuf,
    data_path: PathBuf,
    policy: Option<PolicyArg>,
) -> CliResult<()> {
    let engine = load_engine(&config_path)?;
    let data = read_json(&data_path)?;
    let policy = policy.map(Into::into).unwrap_or_else(|| engine.policy());
    debug!(?policy, "validating form data");

    let visibility = engine.visibility(&data);
    let errors = resolve(&data, engine.validator(), &visibility, policy);
    let blocking = errors.values().any(|error| error.is_blocking());
    println!(
        "Validation result: {}",
        if blocking { "invalid" } else { "valid" }
    );
    describe_errors(&errors);

    if blocking {
        Err("validation failed".into())
    } else {
        Ok(())
    }
}

fn describe_errors(errors: &FieldErrors) {
    if errors.is_empty() {
        return;
    }
    println!("Errors:");
    for (path, error) in errors {
        let marker = match error.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!("  {path} [{marker}] {} - {}", error.code, error.message);
    }
}

fn run_cascade(
    config_path: PathBuf,
    field: String,
    previous_path: PathBuf,
    data_path: PathBuf,
    apply: bool,
) -> CliResult<()> {
    let engine = load_engine(&config_path)?;
    if engine.tree().field(&field).is_none() {
        return Err(format!("unknown field `{field}`").into());
    }
    let previous = read_json(&previous_path)?;
    let data = read_json(&data_path)?;
    let resets = engine.on_field_changed(&field, &previous, &data);
    if apply {
        print_json(&engine.apply_resets(&data, &resets))
    } else {
        print_json(&resets)
    }
}

fn run_defaults(config_path: PathBuf, overrides_path: Option<PathBuf>) -> CliResult<()> {
    let engine = load_engine(&config_path)?;
    let overrides = match overrides_path {
        Some(path) => read_json(&path)?,
        None => Value::Object(Map::new()),
    };
    print_json(&engine.initial_data(&overrides))
}
