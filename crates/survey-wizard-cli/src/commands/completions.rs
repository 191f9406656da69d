use clap_complete::{generate, Shell};

use super::CliResult;

pub fn run(shell: Shell, mut command: clap::Command) -> CliResult {
    let name = command.get_name().to_string();
    generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}
