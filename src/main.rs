use agentic_fem::agent::InsightReporter;
use agentic_fem::config::PipelineConfig;
use agentic_fem::context::Context;
use agentic_fem::executor::{Classifier, SignatureClassifier};
use agentic_fem::llm;
use agentic_fem::model::SimulationRequest;
use agentic_fem::orchestrator::{Orchestrator, PipelineRun, Resolution};
use agentic_fem::protocol::Outcome;
use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentic-fem", version, about = "Generate and repair FEniCS simulations from plain-language requests")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full clarify → parse → generate → execute → repair pipeline
    Run {
        /// Natural-language simulation request
        request: Option<String>,

        /// Read the request from a file instead
        #[arg(short, long, conflicts_with = "request")]
        file: Option<PathBuf>,

        #[arg(long)]
        max_iterations: Option<u32>,

        /// Write an explanatory report after a successful run
        #[arg(long)]
        report: bool,

        /// Report language
        #[arg(long)]
        language: Option<String>,
    },
    /// Classify captured simulation output without running anything
    Classify {
        output: PathBuf,

        #[arg(long, default_value_t = 0)]
        exit_status: i32,

        /// Captured stderr, if kept separately
        #[arg(long)]
        stderr: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default},reqwest=warn,hyper=warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config
        .apply_env_overrides(|key| std::env::var(key).ok())
        .context("applying environment overrides")?;
    Ok(config)
}

fn print_summary(run: &PipelineRun) {
    for attempt in &run.attempts {
        let label = format!("attempt {}", attempt.index + 1);
        match attempt.resolution {
            Resolution::Succeeded => println!("{} {}", label.bold(), "succeeded".green()),
            Resolution::NoCandidate => println!("{} {}", label.bold(), "no code generated".yellow()),
            Resolution::Patched => println!("{} {}", label.bold(), "failed, patched".yellow()),
            Resolution::Reparsed => println!("{} {}", label.bold(), "failed, re-parsed".yellow()),
            Resolution::Exhausted => println!("{} {}", label.bold(), "failed".yellow()),
        }
    }

    if run.succeeded() {
        println!("{}", "Simulation completed successfully.".green().bold());
        if let Some(execution) = run.final_execution()
            && let Outcome::Success { output } = &execution.outcome
            && !output.is_empty()
        {
            println!("--- OUTPUT ---\n{output}");
        }
    } else {
        println!(
            "{}",
            format!("Gave up after {} attempts.", run.attempts.len()).red().bold()
        );
        if let Some(diagnosis) = run.last_diagnosis() {
            println!("--- LAST DIAGNOSIS ---\n{}", diagnosis.hint);
        }
    }
}

fn run_pipeline(
    config: PipelineConfig,
    request: Option<String>,
    file: Option<PathBuf>,
    report: bool,
) -> anyhow::Result<ExitCode> {
    let text = match (request, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading request from {}", path.display()))?,
        (None, None) => bail!("provide a request or --file"),
    };
    let request = SimulationRequest::new(&text)?;

    let generator = llm::connect(&config.llm).context("connecting to the language model")?;
    tracing::info!(generator = generator.name(), model = %config.llm.model, "Pipeline starting");
    let context = Context::new(generator).with_audit(config.audit_trail());

    let orchestrator = Orchestrator::new(&context, config.executor()?, config.retry_policy());
    let run = orchestrator.run(&request);
    print_summary(&run);

    if !run.succeeded() {
        return Ok(ExitCode::FAILURE);
    }

    if report && let Some(program) = run.final_program() {
        let reporter = InsightReporter::new(&context, config.pipeline.report_path.clone());
        match reporter.generate(program, &config.pipeline.report_language) {
            Ok(_) => println!("Report written to {}", reporter.report_path().display()),
            Err(e) => eprintln!("{} {e}", "report failed:".yellow()),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn classify(output: PathBuf, exit_status: i32, stderr: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let stdout = fs::read_to_string(&output)
        .with_context(|| format!("reading captured output {}", output.display()))?;
    let stderr = match stderr {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("reading captured stderr {}", path.display()))?,
        None => String::new(),
    };

    match SignatureClassifier::new().classify(Some(exit_status), stdout.trim(), stderr.trim()) {
        Outcome::Success { .. } => {
            println!("{}", "success".green());
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failure { error } => {
            println!("{}\n{error}", "failure".red());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            request,
            file,
            max_iterations,
            report,
            language,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(max) = max_iterations {
                config.pipeline.max_iterations = max;
            }
            if let Some(language) = language {
                config.pipeline.report_language = language;
            }
            config.validate()?;
            run_pipeline(config, request, file, report)
        }
        Command::Classify {
            output,
            exit_status,
            stderr,
        } => classify(output, exit_status, stderr),
    }
}
