//! One-shot project generator.
//!
//! Asks a model for a complete application and writes the files it returns
//! into a new project directory. Reads `OLLAMA_URL` and `OPENROUTER_KEY`
//! from the environment.
//!
//! # Examples
//!
//! ```sh
//! # Prompts for anything not given on the command line
//! keel-gen
//!
//! keel-gen --app-type "reputation management system" --project-name repman
//! OPENROUTER_KEY=sk-... keel-gen --model claude --app-type "clinic scheduler" \
//!     --project-name clinic --output-dir out --artifacts-dir out/debug
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use keel::registry::{LLAMA_ID, ModelRegistry};
use keel_gen::{GenConfig, generate_project};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// One-shot project generator powered by keel.
#[derive(Parser)]
#[command(name = "keel-gen")]
struct Cli {
    /// Kind of application to generate. Prompted for when omitted.
    #[arg(long)]
    app_type: Option<String>,

    /// Project directory name. Prompted for when omitted.
    #[arg(long)]
    project_name: Option<String>,

    /// Registry id of the model to use.
    #[arg(long, default_value = LLAMA_ID)]
    model: String,

    /// Directory for raw/cleaned/repaired response artifacts.
    #[arg(long, default_value = ".")]
    artifacts_dir: PathBuf,

    /// Parent directory of the generated project.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn prompt_line(label: &str) -> Result<String, String> {
    print!("{label}: ");
    std::io::stdout().flush().map_err(|e| e.to_string())?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read {label}: {e}"))?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_type = match cli.app_type {
        Some(t) => t,
        None => {
            println!("What kind of application would you like to create?");
            prompt_line("Application type (e.g., reputation management system)")?
        }
    };
    let project_name = match cli.project_name {
        Some(n) => n,
        None => prompt_line("Project name (this will be your directory name)")?,
    };

    let config = GenConfig::new(app_type, project_name)
        .with_model(cli.model)
        .with_artifacts_dir(cli.artifacts_dir)
        .with_output_dir(cli.output_dir);

    let registry = ModelRegistry::from_env().map_err(|e| e.to_string())?;

    println!("\nGenerating code for your application...");
    let outcome = generate_project(&registry, &config)
        .await
        .map_err(|e| e.to_string())?;

    println!("\nProject directory: {}", outcome.project_dir.display());
    for entry in &outcome.report.entries {
        match &entry.result {
            Ok(path) => println!("  created  {}", path.display()),
            Err(e) => println!("  skipped  {}: {e}", entry.path),
        }
    }
    let written = outcome.report.written().len();
    println!(
        "\n{written} of {} file(s) written.",
        outcome.report.entries.len()
    );
    Ok(())
}
