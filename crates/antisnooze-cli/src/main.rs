use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "antisnooze-cli", version, about = "AntiSnooze CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm settings and status
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmCmd,
    },
    /// Alarm history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryCmd,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigCmd,
    },
    /// Replay a recorded sensor trace through the engine
    Run(commands::run::RunArgs),
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run(args) => commands::run::run(args),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "antisnooze-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
