//! Gavel judge CLI
//!
//! A command-line tool for judging code submissions in sandboxed containers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gavel::{Config, EXAMPLE_CONFIG, Judge, LanguageId, Submission, Sweeper};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gavel")]
#[command(about = "A tool for judging code submissions in sandboxed containers")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: gavel.toml)
        #[arg(short, long, default_value = "gavel.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Judge a source file against a problem's test cases
    Judge {
        /// Source file to judge
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language profile id (e.g., 1 for Python, 2 for C++)
        #[arg(short, long)]
        language: u32,

        /// Problem id whose assets to judge against
        #[arg(short, long)]
        problem: u64,

        /// Submitting user id
        #[arg(short, long, default_value = "0")]
        user: u64,

        /// Override the configured submission deadline, in seconds
        #[arg(short, long)]
        deadline: Option<f64>,
    },

    /// List configured languages
    Languages,

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Judge {
            source,
            language,
            problem,
            user,
            deadline,
        } => run_judge(config, &source, language, problem, user, deadline).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_judge(
    config: Config,
    source: &PathBuf,
    language_id: u32,
    problem_id: u64,
    user_id: u64,
    deadline: Option<f64>,
) -> Result<()> {
    // Validate the language before touching anything else so the error
    // message lists what is available.
    let language = config
        .get_language(LanguageId::new(language_id))
        .context("unknown language id (see `gavel languages`)")?;

    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    info!(language = %language.name, problem_id, "judging submission");

    // Backstop reclamation of leaked workspace entries while we run
    let sweeper = Sweeper::new(
        config.workspace.root.clone(),
        config.workspace.retention_age(),
        config.workspace.sweep_interval(),
    )
    .spawn();

    let deadline = deadline.map(Duration::from_secs_f64).or(config.deadline());

    let submission = Submission {
        solution_id: 0,
        user_id,
        problem_id,
        language_id,
        code,
        submitted_at: Utc::now(),
    };

    let judge = Judge::new(config);
    let result = judge.judge_with_deadline(&submission, deadline).await;

    sweeper.abort();

    let summary = result.context("judging failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to render summary")?
    );

    // Non-zero exit when any case missed, for scripting
    if summary.correct_cases == summary.total_cases {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn list_languages(config: &Config) {
    println!("Configured languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(id, _)| **id);

    for (id, lang) in languages {
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        println!("  {:<4} {:<16} {} ({})", id, lang.name, lang.image, lang_type);
    }
}

fn show_config(config: &Config) {
    println!("Sandbox limits:");
    println!("  Memory: {} MB", config.limits.memory_mb);
    println!("  CPUs: {}", config.limits.cpus);
    println!("  Scratch size: {} MB", config.limits.scratch_size_mb);
    println!("  Case timeout: {}s", config.limits.case_timeout);
    println!();
    println!("Max concurrency: {}", config.max_concurrency);
    println!(
        "Submission deadline: {}",
        match config.submission_deadline {
            Some(secs) => format!("{secs}s"),
            None => "none".to_string(),
        }
    );
    println!();
    println!("Docker binary: {}", config.docker_binary().display());
    println!("Asset root: {}", config.asset_root.display());
    println!("Workspace root: {}", config.workspace.root.display());
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
