//! One-shot project generator.
//!
//! `keel-gen` asks a model for a complete application as a single JSON
//! object of file path → file content, recovers that object from whatever
//! the model actually wrote, and writes the files under a new project
//! directory.
//!
//! # Library usage
//!
//! ```ignore
//! use keel::registry::ModelRegistry;
//! use keel_gen::{GenConfig, generate_project};
//!
//! let registry = ModelRegistry::from_env()?;
//! let config = GenConfig::new("appointment scheduler", "scheduler")
//!     .with_output_dir("out");
//! let outcome = generate_project(&registry, &config).await?;
//! println!("{} file(s) written", outcome.report.written().len());
//! ```

pub mod config;

pub use config::GenConfig;

use std::path::PathBuf;

use keel::materialize::{Materializer, WriteReport, write_file_tree};
use keel::prompt::generation_prompt;
use keel::registry::ModelRegistry;
use keel::{Message, ParseError, ProviderError};
use thiserror::Error;
use tracing::info;

/// Why a generation run produced no project.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("{0} must not be empty")]
    MissingInput(&'static str),
    #[error("model call failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("could not read files from the model response: {0}")]
    Parse(#[from] ParseError),
    /// The response parsed, but no entry could be written.
    #[error("no files were written to {}", .0.display())]
    NothingWritten(PathBuf),
}

/// A finished run.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub project_dir: PathBuf,
    pub report: WriteReport,
}

/// Generate a project: prompt the model, extract the file tree, write it.
///
/// Succeeds when at least one file was written; per-file failures are in
/// the returned report.
pub async fn generate_project(
    registry: &ModelRegistry,
    config: &GenConfig,
) -> Result<GenerationOutcome, GenError> {
    if config.app_type.trim().is_empty() {
        return Err(GenError::MissingInput("application type"));
    }
    if config.project_name.trim().is_empty() {
        return Err(GenError::MissingInput("project name"));
    }

    let provider = registry.provider(Some(config.model.as_str()))?;
    info!(
        "Generating a {} with {}",
        config.app_type,
        provider.name()
    );

    let request = vec![Message::user(generation_prompt(&config.app_type))];
    let response = provider.converse(&request).await?;
    info!("Model answered with {} chars", response.len());

    let tree = Materializer::new()
        .with_artifact_dir(&config.artifacts_dir)
        .extract(&response)?;
    info!("Recovered {} file(s)", tree.len());

    let project_dir = config.project_dir();
    let report = write_file_tree(&tree, &project_dir);
    if report.written().is_empty() {
        return Err(GenError::NothingWritten(project_dir));
    }

    Ok(GenerationOutcome {
        project_dir,
        report,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keel::provider::ScriptedProvider;

    use super::*;

    fn registry(provider: ScriptedProvider) -> ModelRegistry {
        ModelRegistry::new("llama").register("llama", "Test", "scripted", Arc::new(provider))
    }

    fn config(dir: &std::path::Path) -> GenConfig {
        GenConfig::new("todo app", "todo")
            .with_output_dir(dir.join("out"))
            .with_artifacts_dir(dir.join("artifacts"))
    }

    #[tokio::test]
    async fn writes_project_and_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "Here is the app:\n```json\n{\"app/main.py\": \"print('hi')\\n\", \"requirements.txt\": \"Flask\"}\n```";
        let outcome = generate_project(&registry(ScriptedProvider::new().reply(reply)), &config(dir.path()))
            .await
            .unwrap();

        assert_eq!(outcome.project_dir, dir.path().join("out/todo"));
        assert!(outcome.report.all_written());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/todo/app/main.py")).unwrap(),
            "print('hi')\n"
        );
        assert!(dir.path().join("artifacts/raw_response.txt").exists());
        assert!(dir.path().join("artifacts/cleaned_response.txt").exists());
    }

    #[tokio::test]
    async fn prompt_names_the_application_type() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new().reply("{\"a\": \"1\"}"));
        let registry = ModelRegistry::new("llama").register("llama", "Test", "scripted", provider.clone());
        generate_project(&registry, &config(dir.path())).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0][0].content.contains("Create a complete todo app."));
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_project(&registry(ScriptedProvider::new().fail("offline")), &config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Provider(_)));
        assert!(!dir.path().join("out/todo").exists());
    }

    #[tokio::test]
    async fn unparseable_reply_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_project(
            &registry(ScriptedProvider::new().reply("Sorry, I can't do that.")),
            &config(dir.path()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenError::Parse(ParseError::NoMapping)));
        assert!(dir.path().join("artifacts/raw_response.txt").exists());
    }

    #[tokio::test]
    async fn partial_write_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "{\"ok.txt\": \"1\", \"../escape.txt\": \"2\"}";
        let outcome = generate_project(&registry(ScriptedProvider::new().reply(reply)), &config(dir.path()))
            .await
            .unwrap();
        assert_eq!(outcome.report.written(), vec!["ok.txt"]);
        assert_eq!(outcome.report.failures().len(), 1);
        assert!(!dir.path().join("out/escape.txt").exists());
    }

    #[tokio::test]
    async fn nothing_written_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "{\"../../x.txt\": \"1\"}";
        let err = generate_project(&registry(ScriptedProvider::new().reply(reply)), &config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::NothingWritten(_)));
    }

    #[tokio::test]
    async fn unknown_model_and_missing_inputs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(ScriptedProvider::new());
        let err = generate_project(&registry, &config(dir.path()).with_model("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Provider(ProviderError::Unavailable(_))));

        let err = generate_project(&registry, &GenConfig::new("", "x")).await.unwrap_err();
        assert!(matches!(err, GenError::MissingInput(_)));
    }
}
