use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bayun")]
#[command(author, version, about = "Conversational Telegram bot with localized command dispatch", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Print the command registry (every spelling and required level) and exit
    Registry,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
