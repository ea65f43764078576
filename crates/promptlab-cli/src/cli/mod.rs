pub mod args;
pub mod commands;

use args::{Cli, Command};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Run(run_args) => commands::run::execute(&cli.db, run_args).await,
        Command::Runs => commands::runs::execute(&cli.db),
        Command::Show(show_args) => commands::show::execute(&cli.db, show_args),
        Command::Validate(validate_args) => commands::validate::execute(validate_args),
    }
}
