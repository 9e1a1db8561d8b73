//! sqlport: Hive to Snowflake SQL converter
//!
//! # Usage
//!
//! ```bash
//! # Convert one script, print to stdout
//! sqlport convert etl/load_events.hql --catalog tables.toml
//!
//! # Convert a directory and write a JSON report
//! sqlport batch hive/ snowflake/ --catalog tables.toml --report report.json
//!
//! # Check converted output for leftovers
//! sqlport validate snowflake/load_events.sql
//! ```

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlport::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlport")]
#[command(version)]
#[command(about = "Statement-aware Hive to Snowflake SQL converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlport convert load_events.hql --catalog tables.toml
    cat job.sql | sqlport convert - --no-format
    sqlport batch hive/ snowflake/ --report report.json")]
struct Cli {
    /// Configuration file (defaults to ./sqlport.toml)
    #[arg(long, global = true, env = "SQLPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one script
    Convert {
        /// Script to convert, or `-` for stdin
        file: String,

        /// Table catalog (TOML or JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Write the converted script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the rewritten layout instead of pretty-printing
        #[arg(long)]
        no_format: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert every .sql/.hql file in a directory
    Batch {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Write a JSON report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Report source-dialect constructs left in a script
    Validate { file: PathBuf },
    /// Show how a script splits into statements
    Split { file: String },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sqlport=debug")
    } else {
        EnvFilter::try_from_env("SQLPORT_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("sqlport=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config =
        ConverterConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match &cli.command {
        Commands::Convert {
            file,
            catalog,
            output,
            no_format,
            json,
        } => {
            let mut config = config;
            if let Some(path) = catalog {
                config.catalog_path = Some(path.clone());
            }
            if *no_format {
                config.format = false;
            }
            convert(file, output.as_deref(), *json, &config, cli.verbose)
        }
        Commands::Batch {
            input,
            output,
            catalog,
            report,
        } => {
            let mut config = config;
            if let Some(path) = catalog {
                config.catalog_path = Some(path.clone());
            }
            batch(input, output, report.as_deref(), &config)
        }
        Commands::Validate { file } => validate(file),
        Commands::Split { file } => show_split(file),
    }
}

fn read_script(file: &str) -> Result<String> {
    if file == "-" {
        let mut script = String::new();
        std::io::stdin()
            .read_to_string(&mut script)
            .context("failed to read stdin")?;
        return Ok(script);
    }
    fs::read_to_string(file).with_context(|| format!("failed to read {file}"))
}

fn convert(
    file: &str,
    output: Option<&Path>,
    json: bool,
    config: &ConverterConfig,
    verbose: bool,
) -> Result<()> {
    let script = read_script(file)?;
    let converter = Converter::from_config(config).context("failed to set up converter")?;
    if verbose {
        eprintln!("{} {}", "Input:".dimmed(), file.yellow());
    }

    let result = converter
        .convert(&script)
        .with_context(|| format!("cannot convert {file}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", result.text))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} statement(s) written to {}",
                "✓".green(),
                result.statements,
                path.display().to_string().cyan()
            );
        }
        None => println!("{}", result.text),
    }

    print_warnings(&result.warnings);
    Ok(())
}

fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("{} {}", warnings.len().to_string().yellow().bold(), "warning(s):".yellow());
    for warning in warnings {
        let line = warning.line.map(|l| format!("line {l}")).unwrap_or_default();
        eprintln!(
            "  {} {:>9}  {}",
            format!("[{}]", warning.category).dimmed(),
            line.cyan(),
            warning.message
        );
    }
}

fn batch(
    input: &Path,
    output: &Path,
    report: Option<&Path>,
    config: &ConverterConfig,
) -> Result<()> {
    let converter = Converter::from_config(config).context("failed to set up converter")?;
    let summary = convert_dir(input, output, &converter)
        .with_context(|| format!("cannot convert {}", input.display()))?;

    for file in &summary.files {
        let name = file.path.display().to_string();
        match &file.error {
            Some(error) => println!("{} {}  {}", "✗".red(), name, error.red()),
            None => println!(
                "{} {}  {} statement(s), {} warning(s)",
                "✓".green(),
                name,
                file.statements,
                file.warnings.len()
            ),
        }
    }

    println!();
    println!(
        "{} converted, {} failed, {} warning(s)",
        summary.succeeded().to_string().green(),
        summary.failed().to_string().red(),
        summary.warning_count().to_string().yellow()
    );

    if let Some(path) = report {
        fs::write(path, summary.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("{} report written to {}", "✓".green(), path.display().to_string().cyan());
    }

    if summary.failed() > 0 {
        anyhow::bail!("{} file(s) failed to convert", summary.failed());
    }
    Ok(())
}

fn validate(file: &Path) -> Result<()> {
    let sql = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let report = Validator::new().validate(&sql)?;

    if report.is_valid() {
        println!("{} no source-dialect constructs found", "✓".green());
        return Ok(());
    }

    for issue in &report.issues {
        println!(
            "{:>5}  {}  {}",
            issue.line.to_string().cyan(),
            issue.matched.yellow(),
            issue.suggestion.dimmed()
        );
    }
    anyhow::bail!("{} issue(s) found", report.issues.len())
}

fn show_split(file: &str) -> Result<()> {
    let script = read_script(file)?;
    let statements = split(&script).with_context(|| format!("cannot split {file}"))?;

    println!("{}", format!("{} statement(s)", statements.len()).cyan().bold());
    for (i, stmt) in statements.iter().enumerate() {
        let first = stmt.text.lines().next().unwrap_or_default();
        println!(
            "{:>4}  {}  {}  {}",
            (i + 1).to_string().dimmed(),
            format!("offset {}", stmt.offset).dimmed(),
            format!("line {}", stmt.line).yellow(),
            first
        );
    }
    Ok(())
}
