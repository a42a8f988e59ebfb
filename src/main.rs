use clap::Parser;
use marquee::cli::{self, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        None => cli::print_help()?,
        Some(Command::Version) => cli::handle_version(),
        Some(Command::Config(ConfigCommand::Show)) => cli::handle_config_show()?,
        Some(Command::Config(ConfigCommand::Path)) => cli::handle_config_path(),
        Some(command) => cli::handle_movie_command(command).await?,
    }
    Ok(())
}
