//! Generator settings with defaults.

use std::path::PathBuf;

use keel::registry::LLAMA_ID;

/// Settings for one generation run.
///
/// Mirrors the `keel-gen` command line; the defaults are the CLI defaults.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Kind of application to generate (e.g. `"reputation management system"`).
    pub app_type: String,
    /// Directory name of the generated project.
    pub project_name: String,
    /// Registry id of the model. Default: `"llama"`.
    pub model: String,
    /// Where `raw_response.txt` and friends are saved. Default: `"."`.
    pub artifacts_dir: PathBuf,
    /// Parent directory of the project directory. Default: `"."`.
    pub output_dir: PathBuf,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            app_type: String::new(),
            project_name: String::new(),
            model: LLAMA_ID.to_string(),
            artifacts_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
        }
    }
}

impl GenConfig {
    pub fn new(app_type: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            app_type: app_type.into(),
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// `<output_dir>/<project_name>`.
    pub fn project_dir(&self) -> PathBuf {
        self.output_dir.join(&self.project_name)
    }
}
