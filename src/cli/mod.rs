pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "company-registration-api")]
#[command(about = "Company registration and job board API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Apply embedded database migrations and exit")]
    Migrate,

    #[command(about = "Insert the sample user and company")]
    Seed,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle().await,
        Commands::Migrate => commands::migrate::handle().await,
        Commands::Seed => commands::seed::handle().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::parse_from(["company-registration-api"]);
        assert_eq!(cli.command, None);

        let cli = Cli::parse_from(["company-registration-api", "seed"]);
        assert_eq!(cli.command, Some(Commands::Seed));
    }
}
