use crate::config::types::Project;
use crate::config::validation::validate_project;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Project file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFormat {
    Json,
    Toml,
}

impl ProjectFormat {
    /// Picks the format from the file extension; anything but `.toml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Parses project file content
///
/// The options are normalized and the whole project validated.
pub fn parse_project(content: &str, format: ProjectFormat) -> Result<Project, ConfigError> {
    let mut project: Project = match format {
        ProjectFormat::Json => serde_json::from_str(content)?,
        ProjectFormat::Toml => toml::from_str(content)?,
    };

    project.options.normalize();
    validate_project(&project)?;

    Ok(project)
}

/// Loads and parses a project file from the given path
///
/// # Arguments
///
/// * `path` - Path to a JSON or TOML project file
///
/// # Returns
///
/// * `Ok(Project)` - Successfully loaded and validated project
/// * `Err(ConfigError)` - Failed to load, parse, or validate the project
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use visitor::config::load_project;
///
/// let project = load_project(Path::new("visitor.json")).unwrap();
/// println!("Crawling {}", project.start_url);
/// ```
pub fn load_project(path: &Path) -> Result<Project, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_project(&content, ProjectFormat::from_path(path))
}

/// Computes a SHA-256 hash of the project file content
pub fn compute_project_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a project and returns both the project and its hash
pub fn load_project_with_hash(path: &Path) -> Result<(Project, String), ConfigError> {
    let project = load_project(path)?;
    let hash = compute_project_hash(path)?;
    Ok((project, hash))
}
