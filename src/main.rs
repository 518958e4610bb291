use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use bulletin_engine::catalog::{ProgramCatalog, ProgramConfig};
use bulletin_engine::config::{Config, ConfigOverrides};
use bulletin_engine::grading::parser::{analyze_cell, CellAnalysis};
use bulletin_engine::output::csv::{programs_to_csv, reports_to_csv};
use bulletin_engine::output::files::write_report_files;
use bulletin_engine::output::json::render_json;
use bulletin_engine::output::table::{
    render_cell_table, render_programs_table, render_reports_table, render_units_table,
};
use bulletin_engine::roster::appreciations::{attach_appreciations, parse_appreciations};
use bulletin_engine::roster::batch::evaluate_batch;
use bulletin_engine::roster::loader::load_rows;
use bulletin_engine::roster::normalize::normalize_name;
use bulletin_engine::roster::StudentReport;
use bulletin_engine::server::run_server;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "bulletin-engine",
    about = "Report card grade aggregation and ECTS validation"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Program catalog TOML replacing the built-in one.
    #[arg(long)]
    catalog: Option<String>,
    /// ECTS credit JSON file.
    #[arg(long)]
    ects: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Evaluate {
        #[arg(short, long)]
        input: PathBuf,
        /// Program key; detected from the input file name when omitted.
        #[arg(short, long)]
        program: Option<String>,
        /// `NAME: comment` lines.
        #[arg(short, long)]
        appreciations: Option<PathBuf>,
        /// Write per-student placeholder files into this directory.
        #[arg(long = "out-dir")]
        out_dir: Option<String>,
        /// Write per-student placeholder files into the configured directory.
        #[arg(long)]
        write: bool,
        /// Show the unit breakdown of one student.
        #[arg(long)]
        student: Option<String>,
    },
    Programs,
    Parse {
        cell: String,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let out_dir = match &cli.command {
        Commands::Evaluate { out_dir, .. } => out_dir.clone(),
        _ => None,
    };
    config.apply_overrides(ConfigOverrides {
        catalog_path: cli.catalog.clone(),
        ects_path: cli.ects.clone(),
        output_dir: out_dir,
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let catalog = config.load_catalog()?;

    match &cli.command {
        Commands::Evaluate {
            input,
            program,
            appreciations,
            out_dir,
            write,
            student,
        } => {
            let program = resolve_program(&catalog, program.as_deref(), input)?;
            let mut rows = load_rows(input, config.batch.header_row)?;
            if let Some(path) = appreciations {
                let text = fs::read_to_string(path).with_context(|| {
                    format!("failed reading appreciations: {}", path.display())
                })?;
                let matched = attach_appreciations(&mut rows, &parse_appreciations(&text));
                info!(matched, "attached appreciations");
            }

            let outcome = evaluate_batch(program, &rows, config.batch_options());
            if out_dir.is_some() || *write {
                let today = chrono::Local::now().date_naive();
                let written = write_report_files(
                    &config.resolved_output_dir(),
                    &outcome.reports,
                    program.template.as_deref(),
                    today,
                )?;
                info!(
                    files = written.len(),
                    dir = %config.resolved_output_dir().display(),
                    "wrote report files"
                );
            }

            match student {
                Some(name) => print_student(&outcome.reports, name, cli.output)?,
                None => print_reports(&outcome.reports, cli.output)?,
            }
        }
        Commands::Programs => print_programs(&catalog, cli.output)?,
        Commands::Parse { cell } => print_cell(&analyze_cell(cell), cli.output)?,
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn resolve_program<'a>(
    catalog: &'a ProgramCatalog,
    key: Option<&str>,
    input: &Path,
) -> Result<&'a ProgramConfig> {
    if let Some(key) = key {
        return Ok(catalog.get(key)?);
    }
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("cannot detect program from {}", input.display()))?;
    let program = catalog
        .detect(file_name)
        .with_context(|| format!("pass --program; no program matches {file_name}"))?;
    info!(program = %program.key, file = file_name, "detected program");
    Ok(program)
}

fn print_reports(reports: &[StudentReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_reports_table(reports)),
        OutputFormat::Json => println!("{}", render_json(reports)?),
        OutputFormat::Csv => print!("{}", reports_to_csv(reports)?),
    }
    Ok(())
}

fn print_student(reports: &[StudentReport], name: &str, format: OutputFormat) -> Result<()> {
    let wanted = normalize_name(name);
    let matches: Vec<StudentReport> = reports
        .iter()
        .filter(|report| normalize_name(&report.student.name) == wanted)
        .cloned()
        .collect();
    if matches.is_empty() {
        warn!(student = name, "no student with that name in the input");
        return Ok(());
    }
    match format {
        OutputFormat::Table => {
            for report in &matches {
                println!("{}", render_units_table(report));
            }
        }
        _ => print_reports(&matches, format)?,
    }
    Ok(())
}

fn print_programs(catalog: &ProgramCatalog, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_programs_table(catalog.programs())),
        OutputFormat::Json => {
            let programs: Vec<&ProgramConfig> = catalog.programs().collect();
            println!("{}", render_json(&programs)?);
        }
        OutputFormat::Csv => print!("{}", programs_to_csv(catalog.programs())?),
    }
    Ok(())
}

fn print_cell(analysis: &CellAnalysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_cell_table(analysis)),
        OutputFormat::Json => println!("{}", render_json(analysis)?),
        OutputFormat::Csv => {
            warn!("CSV output for parse not implemented, using JSON");
            println!("{}", render_json(analysis)?);
        }
    }
    Ok(())
}
