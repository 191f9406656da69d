//! Interactive plain-text wizard.
//!
//! Renders the current page, reads one line, and forwards it to the
//! controller as an intent. Errors from intents are shown inline; only I/O
//! and setup failures end the session.

use std::io::Write;
use std::sync::Arc;

use survey_wizard_core::error::CoreError;
use survey_wizard_core::{
    Answer, ChatRole, ControllerSettings, Demographics, Page, StepFlowController,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::distribution::render;
use super::{client, load_config, CliResult};

const DEMOGRAPHIC_FIELDS: [&str; 6] = [
    "Age",
    "Gender",
    "Country",
    "Education",
    "Field of study",
    "Years of study",
];

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on end of input.
    async fn ask(&mut self, label: &str) -> std::io::Result<Option<String>> {
        print!("{label} > ");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

fn show_error(e: &CoreError) {
    match e {
        CoreError::Flow(inner) => println!("  ! {inner}"),
        CoreError::Validation(inner) => println!("  ! {inner}"),
        other => println!("  ! {other}"),
    }
}

fn report(result: Result<(), CoreError>) {
    if let Err(e) = result {
        show_error(&e);
    }
}

pub async fn run(api_url: Option<&str>) -> CliResult {
    let config = load_config(api_url)?;
    let backend = Arc::new(client(&config)?);
    let mut controller = StepFlowController::new(backend, ControllerSettings::from(&config));
    let mut prompt = Prompt::new();

    controller.load_questions().await;

    loop {
        controller.poll_completions();
        for event in controller.drain_events() {
            tracing::debug!(?event, "wizard event");
        }
        println!();
        let keep_going = match controller.state().page() {
            Page::Front => front(&mut controller, &mut prompt).await?,
            Page::Description => description(&mut controller, &mut prompt).await?,
            Page::UserCheck => user_check(&mut controller, &mut prompt).await?,
            Page::ReturnCode => return_code(&mut controller, &mut prompt).await?,
            Page::Demographics => demographics(&mut controller, &mut prompt).await?,
            Page::Instructions => instructions(&mut controller, &mut prompt).await?,
            Page::Wizard => wizard(&mut controller, &mut prompt).await?,
            Page::Completion => completion(&mut controller, &mut prompt).await?,
        };
        if !keep_going {
            return Ok(());
        }
    }
}

async fn front(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("Welcome to the survey.");
    match p.ask("[s]tart, [q]uit").await?.as_deref() {
        None | Some("q") => return Ok(false),
        Some("s") => report(c.start()),
        Some(_) => println!("  ? unknown choice"),
    }
    Ok(true)
}

async fn description(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("This survey asks how much you agree with a series of statements.");
    println!("Answers are stored under an anonymous code. Do you consent to take part?");
    match p.ask("[a]ccept, [d]ecline, [b]ack, [h]ome").await?.as_deref() {
        None => return Ok(false),
        Some("a") => report(c.accept_consent()),
        Some("d") => report(c.decline_consent()),
        Some("b") => report(c.back()),
        Some("h") => report(c.home()),
        Some(_) => println!("  ? unknown choice"),
    }
    Ok(true)
}

async fn user_check(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("Is it your first time here?");
    match p.ask("[f]irst time, [r]eturning, [b]ack, [h]ome").await?.as_deref() {
        None => return Ok(false),
        Some("f") => report(c.first_visit()),
        Some("r") => report(c.returning_visit()),
        Some("b") => report(c.back()),
        Some("h") => report(c.home()),
        Some(_) => println!("  ? unknown choice"),
    }
    Ok(true)
}

async fn return_code(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("Enter the code you received on your first visit.");
    match p.ask("code, or :b to go back, :h for home").await?.as_deref() {
        None => return Ok(false),
        Some(":b") => report(c.back()),
        Some(":h") => report(c.home()),
        Some(code) => report(c.submit_return_code(code).await),
    }
    Ok(true)
}

async fn demographics(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("Tell us a little about yourself (:b to go back).");
    let mut values = Vec::with_capacity(DEMOGRAPHIC_FIELDS.len());
    for field in DEMOGRAPHIC_FIELDS {
        match p.ask(field).await? {
            None => return Ok(false),
            Some(v) if v == ":b" => {
                report(c.back());
                return Ok(true);
            }
            Some(v) => values.push(v),
        }
    }
    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    let form = Demographics {
        age: next(),
        gender: next(),
        country: next(),
        education: next(),
        field: next(),
        years_of_study: next(),
    };
    report(c.submit_demographics(form));
    Ok(true)
}

async fn instructions(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("For each statement, pick a value from 1 (Strongly Disagree) to 6 (Strongly Agree)");
    println!("and submit it before moving on. You can ask questions about each statement.");
    match p.ask("[c]ontinue, [b]ack, [h]ome").await?.as_deref() {
        None => return Ok(false),
        Some("c") => {
            report(c.accept_instructions().await);
            if let Some(code) = c.state().usercode() {
                println!("Your code is {code}. Keep it to return later.");
            }
        }
        Some("b") => report(c.back()),
        Some("h") => report(c.home()),
        Some(_) => println!("  ? unknown choice"),
    }
    Ok(true)
}

fn render_step(c: &StepFlowController) {
    let state = c.state();
    let step = state.step();
    let Some(question) = state.current_question() else {
        return;
    };
    println!("Question {} of {}: {}", step + 1, state.step_count(), question.text);
    for answer in Answer::all() {
        let selected = state.answer(step) == Some(answer);
        println!(
            "  {} {} {}",
            if selected { '*' } else { ' ' },
            answer.value(),
            answer.label()
        );
    }
    if state.is_submitted(step) {
        println!("  (submitted)");
    }
    for line in render(&state.distribution_view(step)) {
        println!("  | {line}");
    }
    for message in state.chat(step) {
        let who = match message.role {
            ChatRole::Ai => "AI",
            ChatRole::User => "You",
        };
        println!("  {who}: {}", message.text);
    }
}

async fn wizard(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    if c.state().has_no_questions() {
        println!("No questions available");
        return Ok(!matches!(p.ask("[q]uit").await?.as_deref(), None | Some("q")));
    }

    render_step(c);
    let last = c.state().is_last_step();
    let hint = if last {
        "1-6 answer, [s]ubmit, [p]rev, [f]inish, or :ask <message>"
    } else {
        "1-6 answer, [s]ubmit, [n]ext, [p]rev, or :ask <message>"
    };
    let Some(line) = p.ask(hint).await? else {
        return Ok(false);
    };
    wizard_intent(c, &line, last).await;
    Ok(true)
}

/// Forward one wizard line. Only `:ask` waits for its reply; distribution and
/// feedback results are merged on a later turn.
async fn wizard_intent(c: &mut StepFlowController, line: &str, last: bool) {
    match line {
        "s" => report(c.on_submit_answer()),
        "n" => {
            let before = c.state().step();
            report(c.on_next());
            if c.state().step() == before && !last {
                println!("  ! Submit your answer before moving on.");
            }
        }
        "p" => report(c.on_back()),
        "f" if last => match c.finish().await {
            Ok(true) => {}
            Ok(false) => println!("  ! Your answers could not be saved on the server."),
            Err(e) => show_error(&e),
        },
        other => {
            if let Some(message) = other.strip_prefix(":ask") {
                report(c.on_send_chat(message));
                c.settle().await;
            } else if let Ok(value) = other.parse::<i64>() {
                report(c.on_answer_change(value));
            } else {
                println!("  ? unknown choice");
            }
        }
    }
}

async fn completion(c: &mut StepFlowController, p: &mut Prompt) -> std::io::Result<bool> {
    println!("Thank you for completing the survey!");
    if let Some(code) = c.state().usercode() {
        println!("Your code: {code}");
    }
    if let Some(feedback) = c.state().final_feedback() {
        println!();
        println!("{feedback}");
    }
    match p.ask("[h]ome, [q]uit").await?.as_deref() {
        None | Some("q") => return Ok(false),
        Some("h") => report(c.home()),
        Some(_) => println!("  ? unknown choice"),
    }
    Ok(true)
}
