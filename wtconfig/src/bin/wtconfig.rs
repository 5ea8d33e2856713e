//! wtconfig CLI
//!
//! Turns a rules document and a requirements export into validated
//! work-time configuration tables, validates existing tables, and revises
//! rules until generation reproduces a known-good configuration.
//!
//! Usage:
//!   wtconfig generate --requirements req.csv --rules rules.txt --inputs refs/ --output config.json
//!   wtconfig correct --requirements req.csv --rules rules.txt --inputs refs/ \
//!       --expected good.json --actual config.json --output config.json

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use wtconfig::config::AppConfig;
use wtconfig::generator::GeneratorFactory;
use wtconfig::schema::samples;
use wtconfig::session::FileRulesStore;
use wtconfig::validation::ReferenceKeys;
use wtconfig::{
    AggregateScope, ContextAssembler, CorrectionLoop, FilePersister, GenerationAdapter,
    GenerationContext, Persister, SchemaRegistry, Session, Validator, Verdict,
};

#[derive(Parser)]
#[command(name = "wtconfig", author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config (defaults to ./wtconfig.toml when present)
    #[arg(short, long, global = true, env = "WTCONFIG_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Inputs {
    /// Tabular requirements export (CSV)
    #[arg(long)]
    requirements: PathBuf,

    /// Transformation rules text
    #[arg(long)]
    rules: PathBuf,

    /// Directory of reference JSON tables
    #[arg(long)]
    inputs: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate configuration tables and commit them to OUTPUT
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(long)]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        config_file: PathBuf,

        /// Reference tables used to resolve keys outside the aggregate
        #[arg(long)]
        inputs: Option<PathBuf>,
    },

    /// Revise the rules until generation matches the expected configuration
    ///
    /// Each revision is written back to the rules file immediately. There is
    /// no rollback: when the loop does not converge the rules file holds the
    /// last attempt.
    Correct {
        #[command(flatten)]
        inputs: Inputs,

        /// Known-good configuration
        #[arg(long)]
        expected: PathBuf,

        /// Configuration produced by the current rules
        #[arg(long)]
        actual: PathBuf,

        /// Overrides pipeline.max_correction_iterations
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Where the last synthesized configuration is committed
        #[arg(long)]
        output: PathBuf,

        /// Exit 0 even when the loop did not converge
        #[arg(long)]
        allow_unconverged: bool,
    },

    /// Print entity field specs or the aggregate JSON Schema
    Schema {
        /// Entity name or list key (e.g. EmployeeType, wt_et_dt)
        entity: Option<String>,

        /// Print a valid sample document instead
        #[arg(long, conflicts_with = "entity")]
        sample: bool,
    },
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// `*.json` files of `dir`, keyed by file name.
fn read_reference_tables(dir: &Path) -> Result<BTreeMap<String, Value>> {
    let mut tables = BTreeMap::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let value: Value = serde_json::from_str(&read_text(&path)?)
            .with_context(|| format!("reference table {} is not valid JSON", path.display()))?;
        debug!("loaded reference table {}", name);
        tables.insert(name, value);
    }
    Ok(tables)
}

fn assemble(inputs: &Inputs) -> Result<GenerationContext> {
    let rules = read_text(&inputs.rules)?;
    let requirements = read_text(&inputs.requirements)?;
    let references = read_reference_tables(&inputs.inputs)?;
    Ok(ContextAssembler::new().assemble(&rules, &requirements, references)?)
}

fn build_adapter(config: &AppConfig, validator: Validator) -> Result<GenerationAdapter> {
    let api_key = config.generator.credential()?;
    let generator = GeneratorFactory::create(&config.generator, api_key)?;
    let info = generator.info();
    info!("generator: {} ({})", info.name, info.model);
    Ok(GenerationAdapter::new(generator, validator, config.generator.timeout()))
}

async fn generate(config: &AppConfig, inputs: &Inputs, output: &Path) -> Result<()> {
    let context = assemble(inputs)?;
    let validator = config.pipeline.validator();
    let adapter = build_adapter(config, validator.clone())?;
    let set = adapter.synthesize(&context).await?;
    let persister = FilePersister::new(output, validator.with_reference(context.reference_keys()));
    let handle = persister.save(&set)?;
    println!("{}", handle.path.display());
    Ok(())
}

fn validate(config: &AppConfig, file: &Path, inputs: Option<&Path>) -> Result<()> {
    let reference = match inputs {
        Some(dir) => ReferenceKeys::from_tables(&read_reference_tables(dir)?),
        None => ReferenceKeys::new(),
    };
    let validator = config.pipeline.validator().with_reference(reference);
    let value: Value = serde_json::from_str(&read_text(file)?)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let violations = match validator.validate_json(&value)? {
        Verdict::Valid(_) => {
            println!("{}: valid", file.display());
            return Ok(());
        }
        Verdict::ShapeInvalid(report) => report.violations,
        Verdict::Invalid(report) => report.violations,
    };
    for v in &violations {
        println!("{}", v);
    }
    bail!("{}: {} violation(s)", file.display(), violations.len())
}

async fn correct(
    config: &AppConfig,
    inputs: &Inputs,
    expected: &Path,
    actual: &Path,
    max_iterations: Option<usize>,
    output: &Path,
    allow_unconverged: bool,
) -> Result<()> {
    let context = assemble(inputs)?;
    let validator = config
        .pipeline
        .validator()
        .with_reference(context.reference_keys());
    let persister = FilePersister::new(output, validator.clone());
    let expected_set = persister
        .load_path(expected)
        .with_context(|| format!("expected configuration {}", expected.display()))?;
    let actual_set = persister
        .load_path(actual)
        .with_context(|| format!("actual configuration {}", actual.display()))?;

    let session = Session::new(
        context.rules(),
        Arc::new(FileRulesStore::new(&inputs.rules)),
    );
    let correction = CorrectionLoop::new(build_adapter(config, validator)?);
    let max_iterations = max_iterations.unwrap_or(config.pipeline.max_correction_iterations);
    let outcome = correction
        .correct(&session, &context, &expected_set, actual_set, max_iterations)
        .await?;

    persister.save(&outcome.configuration)?;
    println!(
        "converged: {} after {} iteration(s); rules in {}",
        outcome.converged,
        outcome.iterations,
        inputs.rules.display()
    );
    if !outcome.converged && !allow_unconverged {
        bail!("correction did not converge within {} iteration(s)", max_iterations);
    }
    Ok(())
}

fn schema(config: &AppConfig, entity: Option<&str>, sample: bool) -> Result<()> {
    let scope = config.pipeline.aggregate_scope;
    let registry = SchemaRegistry::builtin();
    if sample {
        let set = match scope {
            AggregateScope::Core => samples::core_configuration(),
            AggregateScope::Full => samples::full_configuration(),
        };
        println!("{}", serde_json::to_string_pretty(&set.to_document(scope)?)?);
        return Ok(());
    }
    match entity {
        Some(name) => {
            for field in registry.describe(name)? {
                println!(
                    "{:<40} {:<12} {}",
                    field.name,
                    field.semantic.to_string(),
                    if field.nullable { "nullable" } else { "required" }
                );
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&registry.target_schema(scope)?)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    wtconfig::logging::init_tracing(cli.verbose, cli.quiet);
    let config = AppConfig::load(cli.config.as_deref())?;
    debug!("pipeline config: {:?}", config.pipeline);

    match cli.command {
        Commands::Generate { inputs, output } => generate(&config, &inputs, &output).await,
        Commands::Validate {
            config_file,
            inputs,
        } => validate(&config, &config_file, inputs.as_deref()),
        Commands::Correct {
            inputs,
            expected,
            actual,
            max_iterations,
            output,
            allow_unconverged,
        } => {
            correct(
                &config,
                &inputs,
                &expected,
                &actual,
                max_iterations,
                &output,
                allow_unconverged,
            )
            .await
        }
        Commands::Schema { entity, sample } => schema(&config, entity.as_deref(), sample),
    }
}
