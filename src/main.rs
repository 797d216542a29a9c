use benchlog::config::{BenchlogConfig, ConfigError, OutputFormat};
use benchlog::db;
use benchlog::input::{self, InputError};
use benchlog::parsers::{Dispatcher, ParseError};
use benchlog::registry::{RegistryError, SchemaRegistry};
use benchlog::report::BuildReport;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Extract structured benchmark results from CI build logs: split the log
/// into iterations, pull metrics per benchmark schema, and report a build
/// verdict.
#[derive(Parser, Debug)]
#[command(name = "benchlog", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "benchlog.toml", global = true)]
    config: PathBuf,

    /// Extra logging (per-iteration classification)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse build logs and print one report per input
    Parse {
        /// Log files or glob patterns ("-" for stdin, ".zst" is decompressed)
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Build name (default: from config, else the file name)
        #[arg(short, long)]
        build_name: Option<String>,

        /// Schema table (overrides config)
        #[arg(long)]
        schemas: Option<PathBuf>,

        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Store reports in the database
        #[arg(long)]
        store: bool,

        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print which parser, if any, accepts each input
    Probe {
        /// Log files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Build name passed to the probes
        #[arg(short, long)]
        build_name: Option<String>,

        /// Schema table (overrides config)
        #[arg(long)]
        schemas: Option<PathBuf>,
    },

    /// List benchmark routes and their metrics
    Schemas {
        /// Schema table (overrides config)
        #[arg(long)]
        schemas: Option<PathBuf>,
    },

    /// List stored builds, newest first
    History {
        /// Maximum rows
        #[arg(short, long, default_value_t = 20)]
        limit: u32,

        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} of {1} inputs failed")]
    Partial(usize, usize),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "benchlog failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = BenchlogConfig::load(&cli.config)?;

    match cli.command {
        Command::Parse {
            inputs,
            build_name,
            schemas,
            format,
            store,
            db,
        } => {
            let registry = load_registry(schemas.as_deref(), &config)?;
            let build_name = build_name.or(config.parse.default_build_name.clone());
            let options = ParseOptions {
                build_name,
                format: format.unwrap_or(config.output.format),
                pretty: config.output.pretty,
                db: store.then(|| db.unwrap_or_else(|| config.database.path.clone())),
            };
            run_parse(&inputs, registry, &options)
        }
        Command::Probe {
            inputs,
            build_name,
            schemas,
        } => {
            let registry = load_registry(schemas.as_deref(), &config)?;
            run_probe(&inputs, registry, build_name.as_deref())
        }
        Command::Schemas { schemas } => {
            let registry = load_registry(schemas.as_deref(), &config)?;
            print_schemas(&registry);
            Ok(())
        }
        Command::History { limit, db } => {
            let path = db.unwrap_or(config.database.path);
            run_history(&path, limit)
        }
    }
}

fn load_registry(
    override_path: Option<&Path>,
    config: &BenchlogConfig,
) -> Result<SchemaRegistry, RegistryError> {
    match override_path.or(config.registry.path.as_deref()) {
        Some(path) => SchemaRegistry::load(path),
        None => SchemaRegistry::builtin(),
    }
}

struct ParseOptions {
    build_name: Option<String>,
    format: OutputFormat,
    pretty: bool,
    db: Option<PathBuf>,
}

fn run_parse(
    patterns: &[String],
    registry: SchemaRegistry,
    options: &ParseOptions,
) -> Result<(), CliError> {
    let paths = input::expand_inputs(patterns)?;
    let dispatcher = Dispatcher::new(registry);
    let mut conn = match &options.db {
        Some(path) => Some(db::open_or_create(path)?),
        None => None,
    };

    let failures = parse_inputs(
        &paths,
        &dispatcher,
        options,
        conn.as_mut(),
        &mut std::io::stdout().lock(),
    );
    if failures > 0 {
        return Err(CliError::Partial(failures, paths.len()));
    }
    Ok(())
}

/// Parse, print and optionally store each input. A failing input is logged
/// and skipped. Returns the number of failed inputs.
fn parse_inputs(
    paths: &[PathBuf],
    dispatcher: &Dispatcher,
    options: &ParseOptions,
    mut conn: Option<&mut Connection>,
    out: &mut impl Write,
) -> usize {
    let mut failures = 0;
    for path in paths {
        if let Err(e) = parse_one(path, dispatcher, options, conn.as_deref_mut(), out) {
            tracing::error!(error = %e, input = %path.display(), "failed to parse input");
            failures += 1;
        }
    }
    failures
}

fn parse_one(
    path: &Path,
    dispatcher: &Dispatcher,
    options: &ParseOptions,
    conn: Option<&mut Connection>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let build_name = options
        .build_name
        .clone()
        .unwrap_or_else(|| input::build_name_from_path(path));

    let log = input::read_log(path)?;
    let report = dispatcher.parse(&build_name, &log)?;
    write_report(out, &report, options)?;

    if let Some(conn) = conn {
        let id = db::store_report(conn, &path.display().to_string(), &report)?;
        tracing::info!(build_id = id, input = %path.display(), "stored report");
    }
    Ok(())
}

fn write_report(
    out: &mut impl Write,
    report: &BuildReport,
    options: &ParseOptions,
) -> Result<(), CliError> {
    match options.format {
        OutputFormat::Json if options.pretty => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(report)?)?,
        OutputFormat::Summary => write!(out, "{}", report.render_summary())?,
    }
    Ok(())
}

fn run_probe(
    patterns: &[String],
    registry: SchemaRegistry,
    build_name: Option<&str>,
) -> Result<(), CliError> {
    let paths = input::expand_inputs(patterns)?;
    let dispatcher = Dispatcher::new(registry);
    let failures = probe_inputs(
        &paths,
        &dispatcher,
        build_name,
        &mut std::io::stdout().lock(),
    );
    if failures > 0 {
        return Err(CliError::Partial(failures, paths.len()));
    }
    Ok(())
}

/// Print the accepting parser per input. Unreadable inputs are logged and
/// skipped. Returns the number of failed inputs.
fn probe_inputs(
    paths: &[PathBuf],
    dispatcher: &Dispatcher,
    build_name: Option<&str>,
    out: &mut impl Write,
) -> usize {
    let mut failures = 0;
    for path in paths {
        if let Err(e) = probe_one(path, dispatcher, build_name, out) {
            tracing::error!(error = %e, input = %path.display(), "failed to probe input");
            failures += 1;
        }
    }
    failures
}

fn probe_one(
    path: &Path,
    dispatcher: &Dispatcher,
    build_name: Option<&str>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let log = input::read_log(path)?;
    let name = build_name
        .map(str::to_string)
        .unwrap_or_else(|| input::build_name_from_path(path));
    let parser = dispatcher
        .select(&name, &log)
        .map_or("none", |p| p.name());
    writeln!(out, "{}\t{}", path.display(), parser)?;
    Ok(())
}

fn print_schemas(registry: &SchemaRegistry) {
    for (benchmark, variant, schema_id) in registry.routes() {
        println!("{benchmark}\t{variant}\t{schema_id}");
        let Some(schema) = registry.schema(schema_id) else {
            continue;
        };
        if schema.outer.is_some() {
            println!("    (warm runs only)");
        }
        for metric in &schema.metrics {
            match metric.aggregate {
                Some(agg) => println!("    {} [{}]", metric.name, agg.as_str()),
                None => println!("    {}", metric.name),
            }
        }
    }
}

fn run_history(path: &Path, limit: u32) -> Result<(), CliError> {
    let conn = db::open_or_create(path)?;
    for b in db::list_builds(&conn, limit)? {
        println!(
            "{:>5}  {}  {:<16} {:<4} {:<15} {}/{} passed  {}  {}",
            b.id,
            b.parsed_at,
            b.build_name,
            b.kind,
            b.build_result,
            b.passed,
            b.iterations,
            b.machine.as_deref().unwrap_or("-"),
            b.source
        );
    }
    Ok(())
}
