mod config;

pub use config::{ApiConfig, Config, LlmConfig, SurveyConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/survey-wizard[-dev]/` based on SURVEY_WIZARD_ENV.
///
/// Set SURVEY_WIZARD_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SURVEY_WIZARD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("survey-wizard-dev")
    } else {
        base_dir.join("survey-wizard")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
