//! qcflow CLI - battery repack inspection station
//!
//! Command-line front-end for the qcflow inspection engine: prepares a
//! station directory, lists the inspection steps, and runs a technician's
//! inspection session from the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qcflow_core::catalog;
use qcflow_core::config::DEFAULT_CONFIG_TOML;
use qcflow_core::{Collaborators, InspectionEngine, QcConfig, SessionSnapshot, StepDefinition};
use std::path::{Path, PathBuf};
use tracing::{error, info};

mod console;

/// qcflow - battery repack inspection station
///
/// Walks a technician through the 21-step repack checklist and keeps the
/// audit trail of every scan.
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Station directory (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
}

/// Available qcflow commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize a station directory
    ///
    /// Creates .qcflow/ with a default config.toml and the data directory.
    Init,

    /// List the inspection steps
    Steps,

    /// Run an inspection session
    ///
    /// Checks in to the project and reads answers from stdin until quit,
    /// checkout, or end of input.
    Run {
        /// Project to check in to (defaults to station.project_id)
        #[arg(short, long)]
        project: Option<i64>,

        /// Continue the saved session instead of starting a new one
        #[arg(long)]
        resume: bool,
    },

    /// Show the saved session, if any
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing subscriber
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = run_command(cli.command, cli.root).await {
        // Log with tracing
        error!("Command failed: {:#}", e);
        // Also print to stderr for CLI users
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing subscriber for structured logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("qcflow=debug,qcflow_core=debug,qcflow_guide=debug")
    } else {
        EnvFilter::new("qcflow=info,qcflow_core=info,qcflow_guide=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the specified command
async fn run_command(command: Commands, root: Option<PathBuf>) -> Result<()> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match command {
        Commands::Init => {
            info!("Initializing station in {}", root.display());
            run_init(&root)
        }
        Commands::Steps => {
            run_steps();
            Ok(())
        }
        Commands::Run { project, resume } => run_inspection(&root, project, resume).await,
        Commands::Status => run_status(&root),
    }
}

/// Run the init command
fn run_init(root: &Path) -> Result<()> {
    let config = QcConfig::new(root.to_path_buf());

    if config.config_file.exists() {
        anyhow::bail!(
            "Station already initialized: {}",
            config.config_file.display()
        );
    }

    if let Some(parent) = config.config_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&config.config_file, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to write {}", config.config_file.display()))?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    println!("✔ Created {}", config.config_file.display());
    println!("✔ Created {}", config.data_dir.display());
    println!("\nStation initialized.");
    println!("\nNext steps:");
    println!("  qcflow steps                 List the inspection steps");
    println!("  qcflow run --project <ID>    Start inspecting");

    Ok(())
}

/// Run the steps command
fn run_steps() {
    for step in catalog::steps() {
        println!("{}", describe_step(step));
    }
}

fn describe_step(step: &StepDefinition) -> String {
    let mut flags = Vec::new();
    if step.requires_scan() {
        flags.push(format!("scan x{}", step.scan_count()));
    }
    if step.requires_multiple_operators {
        flags.push("2 operators".to_string());
    }
    if step.is_branch_step() {
        flags.push("categories".to_string());
    }

    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    format!(
        "{:>2}. {:<14} {}{}",
        step.number.get(),
        step.phase.as_str(),
        step.prompt,
        flags
    )
}

/// Run the inspection console
async fn run_inspection(root: &Path, project: Option<i64>, resume: bool) -> Result<()> {
    let config = load_config(root).context("Failed to load qcflow configuration")?;
    let tick_ms = config.timer.tick_ms;

    let tools = Collaborators::standard(&config);

    let mut engine = if resume {
        InspectionEngine::restore(config, tools).context("Failed to restore saved session")?
    } else {
        InspectionEngine::new(config, tools).context("Failed to start inspection engine")?
    };

    if resume && engine.is_checked_in() {
        info!("Resumed saved session");
    } else {
        if resume {
            println!("No saved session, starting a new one.");
        }
        let project_id = project
            .or(engine.config().station.project_id)
            .context("No project given - use --project or set station.project_id")?;
        let session_id = engine
            .check_in(project_id)
            .context("Failed to check in")?;
        println!("✔ Checked in to project {project_id} (session {session_id})");
    }

    console::run_station(engine, tick_ms).await
}

/// Run the status command
fn run_status(root: &Path) -> Result<()> {
    let config = load_config(root).context("Failed to load qcflow configuration")?;

    let Some(snapshot) = SessionSnapshot::load(&config.snapshot_file)? else {
        println!("No saved session.");
        return Ok(());
    };

    let session = snapshot.cursor.session();
    let step = snapshot.cursor.current()?;
    println!("Project:   {}", snapshot.project_id);
    println!("Session:   {}", session.session_id);
    println!("Step:      {}", describe_step(step).trim_start());
    println!("Answered:  {}", session.answers.len());
    println!("Counter:   {}", snapshot.counter);
    println!("Units:     {}", snapshot.timer.completed_units());
    println!("Saved at:  {}", snapshot.saved_at.to_rfc3339());

    Ok(())
}

/// Load qcflow configuration from .qcflow/config.toml
fn load_config(root: &Path) -> Result<QcConfig> {
    let qcflow_dir = root.join(qcflow_core::config::QCFLOW_DIR);
    if !qcflow_dir.exists() {
        anyhow::bail!(
            "Station not initialized. Run 'qcflow init' first.\n\
             Expected directory: {}",
            qcflow_dir.display()
        );
    }

    Ok(QcConfig::load(root.to_path_buf())?)
}
