//! Prompt-kind detection and system prompt templates.
//!
//! The chat flow picks a system prompt per user turn from a keyword
//! heuristic. The one-shot generator uses [`generation_prompt`], which asks
//! for the whole project as a single JSON object of file name → content.

/// Which system prompt applies to a user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// The user wants a whole project planned out.
    Project,
    /// The user is asking about code.
    Code,
    Default,
}

const PROJECT_KEYWORDS: &[&str] = &["create project", "develop", "build application", "make app"];
const CODE_KEYWORDS: &[&str] = &["code", "function", "class", "program"];

/// Tech stack embedded in the project prompt.
pub const DEFAULT_TECH_STACK: &[&str] = &[
    "Flask",
    "SQLite",
    "Flask-SQLAlchemy",
    "Basic HTML/CSS",
    "JWT for authentication",
    "Logging",
];

/// Classify `message` by keyword. Project keywords win over code keywords.
pub fn detect_prompt_kind(message: &str) -> PromptKind {
    let lower = message.to_lowercase();
    if PROJECT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        PromptKind::Project
    } else if CODE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        PromptKind::Code
    } else {
        PromptKind::Default
    }
}

/// Render the system prompt for `kind`. The project template uses `message`
/// as the project name.
pub fn system_prompt(kind: PromptKind, message: &str) -> String {
    match kind {
        PromptKind::Project => project_prompt(message, DEFAULT_TECH_STACK),
        PromptKind::Code => CODE_PROMPT.to_string(),
        PromptKind::Default => DEFAULT_PROMPT.to_string(),
    }
}

const CODE_PROMPT: &str = "\
When you show code:
1. Use markdown formatting.
2. Put code in fenced blocks tagged with the language (```python, ```javascript, ```html, ```css).
3. Explain what the code does before and after each block.
4. Use markdown headings, lists and emphasis where they help.";

const DEFAULT_PROMPT: &str = "You are a helpful AI assistant with expertise in programming.";

fn project_prompt(project_name: &str, tech_stack: &[&str]) -> String {
    let stack: String = tech_stack.iter().map(|t| format!("- {t}\n")).collect();
    format!(
        "You are an expert developer helping build complete, working business \
applications. Give step-by-step instructions that can be followed without \
further questions.

Current project: {project_name}

Instructions:
1. Give exact commands to run.
2. Show every file with its full content.
3. Include all setup steps.
4. Write production-quality code with error handling and logging.
5. Comment the code where it is not obvious.

Structure your answer as:
1. Project analysis: overview, core features, architecture, database schema, API endpoints.
2. Step-by-step instructions, each with an explanation, complete code, the expected result and how to test it.

Tech stack:
{stack}
Finish with the deployment steps and how to validate the result."
    )
}

/// Prompt for the one-shot generator: the entire `app_type` project as one
/// JSON object mapping file paths to file contents.
pub fn generation_prompt(app_type: &str) -> String {
    format!(
        r#"You are an expert Python developer. Create a complete {app_type}. Return ONLY a JSON object that maps each file path to that file's full contents.

The object MUST look exactly like this:
{{
    "app/main.py": "from flask import Flask\nimport os\n\napp = Flask(__name__)\n",
    "app/models.py": "from flask_sqlalchemy import SQLAlchemy\n\ndb = SQLAlchemy()\n",
    "requirements.txt": "Flask==2.0.1\nSQLAlchemy==1.4.23"
}}

Build it with:
- Flask
- SQLite
- Flask-SQLAlchemy
- Basic HTML/CSS

Include every file the application needs: Python modules, HTML templates, CSS stylesheets, database models, configuration files and requirements.txt.

FORMAT RULES:
1. Return ONLY the JSON object.
2. No explanations and no markdown.
3. Use double quotes for every string.
4. Escape newlines as \n and quotes as \".
5. No trailing commas.
6. The output must be valid JSON."#
    )
}
