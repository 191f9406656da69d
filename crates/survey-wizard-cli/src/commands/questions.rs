use survey_wizard_core::SurveyBackend;

use super::{client, load_config, CliResult};

pub async fn run(api_url: Option<&str>, json: bool) -> CliResult {
    let config = load_config(api_url)?;
    let backend = client(&config)?;
    let mut questions = backend.fetch_questions().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load questions");
        Vec::new()
    });
    questions.truncate(config.survey.max_questions);

    if json {
        println!("{}", serde_json::to_string_pretty(&questions)?);
    } else if questions.is_empty() {
        println!("No questions available");
    } else {
        for (i, q) in questions.iter().enumerate() {
            println!("{:>2}. [{}] {}", i + 1, q.id, q.text);
        }
    }
    Ok(())
}
