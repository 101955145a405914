use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_gene_prioritizer::app::App;
use kira_gene_prioritizer::config::{ConfigLoader, ConfigOverrides};
use kira_gene_prioritizer::dataset::DatasetEngine;
use kira_gene_prioritizer::error::KiraError;
use kira_gene_prioritizer::knowledge::{HpoHttpClient, default_hpo_path, fetch_hpo};
use kira_gene_prioritizer::ontology::TraversalPolicy;
use kira_gene_prioritizer::output::{OutputFormat, OutputTarget, PrioritizedOutput};
use kira_gene_prioritizer::prioritize::Prioritizer;

#[derive(Parser)]
#[command(name = "kira-gp")]
#[command(about = "Prioritize candidate genes for a set of HPO phenotypes")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Retrieve, aggregate and rank genes for phenotypes")]
    Run(RunArgs),
    #[command(about = "Download the HPO ontology (hp.obo)")]
    FetchHpo(FetchHpoArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<String>,

    /// Gene-disease association dump (JSON, optionally .gz).
    #[arg(long)]
    database: Option<Utf8PathBuf>,

    /// HPO ontology in OBO format, needed with --max-distance.
    #[arg(long)]
    ontology: Option<Utf8PathBuf>,

    #[arg(short = 'p', long = "phenotype")]
    phenotypes: Vec<String>,

    /// Also use phenotypes up to this many ontology edges away.
    #[arg(long)]
    max_distance: Option<u32>,

    #[arg(long, value_enum)]
    traversal: Option<TraversalPolicy>,

    #[arg(long, value_enum)]
    prioritizer: Option<Prioritizer>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file; must not exist yet. Defaults to stdout.
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct FetchHpoArgs {
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidFormat { .. }
        | KiraError::InvalidUri { .. }
        | KiraError::IdentityMismatch { .. }
        | KiraError::MissingConfig
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::InvalidConfig(_)
        | KiraError::OutputExists(_) => 2,
        KiraError::SourceUnavailable(_)
        | KiraError::KnowledgeHttp(_)
        | KiraError::KnowledgeStatus { .. } => 3,
        _ => 1,
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            init_tracing(args.verbose);
            run_prioritization(args)
        }
        Commands::FetchHpo(args) => {
            init_tracing(false);
            run_fetch_hpo(args)
        }
    }
}

fn run_prioritization(args: RunArgs) -> miette::Result<()> {
    let overrides = ConfigOverrides {
        database: args.database,
        ontology: args.ontology,
        phenotypes: args.phenotypes,
        max_distance: args.max_distance,
        traversal: args.traversal,
        prioritizer: args.prioritizer,
        output_format: args.format,
        output: args.output,
    };
    let config = ConfigLoader::resolve_with_overrides(args.config.as_deref(), overrides)?;

    let engine = DatasetEngine::open(config.database.as_std_path())?;
    let result = App::new(engine).run(&config)?;

    let target = OutputTarget::from_path(config.output.clone());
    PrioritizedOutput::new(config.output_format, target).write(&result)?;
    Ok(())
}

fn run_fetch_hpo(args: FetchHpoArgs) -> miette::Result<()> {
    let destination = match args.output {
        Some(path) => path,
        None => default_hpo_path()?,
    };
    let client = HpoHttpClient::new()?;
    let result = fetch_hpo(&client, destination.as_std_path())?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).into_diagnostic()?;
        println!("{json}");
    } else {
        println!(
            "hp.obo {} ({} bytes) -> {}",
            result.header.data_version.as_deref().unwrap_or("unknown version"),
            result.bytes,
            result.path
        );
    }
    Ok(())
}
