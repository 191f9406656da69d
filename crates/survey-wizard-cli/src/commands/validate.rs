use survey_wizard_core::{SurveyBackend, ValidationError};

use super::{client, load_config, CliResult};

pub async fn run(api_url: Option<&str>, code: &str) -> CliResult {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::EmptyUserCode.into());
    }
    let config = load_config(api_url)?;
    if client(&config)?.validate_user_code(code).await? {
        println!("valid");
    } else {
        println!("invalid");
        std::process::exit(1);
    }
    Ok(())
}
