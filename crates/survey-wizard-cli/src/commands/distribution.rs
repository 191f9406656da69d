use survey_wizard_core::error::ValidationError;
use survey_wizard_core::{Answer, Distribution, DistributionView, SurveyBackend};

use super::{client, load_config, CliResult};

const BAR_WIDTH: usize = 30;

pub async fn run(api_url: Option<&str>, question_id: &str, answer: Option<i64>, json: bool) -> CliResult {
    let config = load_config(api_url)?;
    let answer = chosen_answer(answer, config.default_answer())?;
    let distribution = client(&config)?
        .fetch_answer_distribution(question_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(question = question_id, error = %e, "distribution unavailable");
            Distribution::default()
        });
    let view = distribution.view(answer);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for line in render(&view) {
            println!("{line}");
        }
    }
    Ok(())
}

/// The `--answer` flag must be on the scale; without it the default is used.
fn chosen_answer(flag: Option<i64>, default: Answer) -> Result<Answer, ValidationError> {
    flag.map(Answer::new).transpose().map(|a| a.unwrap_or(default))
}

/// Plain-text comparison panel, shared with the interactive wizard.
pub fn render(view: &DistributionView) -> Vec<String> {
    match view {
        DistributionView::NotRequested => Vec::new(),
        DistributionView::Loading => vec!["Loading answers from other participants...".to_string()],
        DistributionView::NoDataYet { .. } => {
            vec!["No data available yet. Be the first to answer this question!".to_string()]
        }
        DistributionView::Summary {
            total,
            counts,
            your_answer,
            your_count,
            your_percentage,
        } => {
            let peak = counts.iter().copied().max().unwrap_or(0).max(1);
            let mut lines = vec![format!("Total responses: {total}")];
            for (answer, count) in Answer::all().zip(counts.iter().copied()) {
                let marker = if answer == *your_answer { '>' } else { ' ' };
                lines.push(format!(
                    "{marker} {} {:<17} {:>4} {}",
                    answer.value(),
                    answer.label(),
                    count,
                    "#".repeat(count * BAR_WIDTH / peak)
                ));
            }
            lines.push(format!(
                "{your_count} of {total} ({your_percentage}%) answered {} ({}) like you.",
                your_answer.value(),
                your_answer.label()
            ));
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_distribution_renders_no_data_line() {
        let view = Distribution::default().view(Answer::MIDPOINT);
        assert_eq!(
            render(&view),
            vec!["No data available yet. Be the first to answer this question!"]
        );
    }

    #[test]
    fn answer_flag_is_checked_not_clamped() {
        assert_eq!(chosen_answer(None, Answer::MIDPOINT), Ok(Answer::MIDPOINT));
        assert_eq!(chosen_answer(Some(5), Answer::MIDPOINT).map(Answer::value), Ok(5));
        assert!(matches!(
            chosen_answer(Some(9), Answer::MIDPOINT),
            Err(ValidationError::AnswerOutOfRange { value: 9, .. })
        ));
        assert!(chosen_answer(Some(0), Answer::MIDPOINT).is_err());
    }

    #[test]
    fn summary_marks_the_users_answer() {
        let dist = Distribution::new(vec![Answer::clamped(2), Answer::clamped(2), Answer::clamped(5)]);
        let lines = render(&dist.view(Answer::clamped(2)));
        assert_eq!(lines[0], "Total responses: 3");
        assert!(lines[2].starts_with("> 2 Disagree"));
        assert!(lines[2].ends_with(&"#".repeat(BAR_WIDTH)));
        assert_eq!(lines.last().unwrap(), "2 of 3 (67%) answered 2 (Disagree) like you.");
    }
}
