pub mod completions;
pub mod config;
pub mod distribution;
pub mod questions;
pub mod run;
pub mod validate;

use survey_wizard_core::{Config, RemoteSurveyClient};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config file, letting `--api-url` win over file and environment.
pub fn load_config(api_url: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(url) = api_url {
        config.api.base_url = url.to_string();
        config.validate()?;
    }
    Ok(config)
}

pub fn client(config: &Config) -> Result<RemoteSurveyClient, Box<dyn std::error::Error>> {
    Ok(RemoteSurveyClient::new((&config.api).into())?)
}
