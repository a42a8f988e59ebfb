//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `suggest|unsuggest|suggestions|genre|clear` -- manage a guild's list
//! - `vote start|stop|cancel|status` -- run the reaction vote
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Args, CommandFactory, Parser, Subcommand};

/// Movie night suggestions and reaction votes for Discord guilds.
#[derive(Parser, Debug)]
#[command(
    name = "marquee",
    version = env!("CARGO_PKG_VERSION"),
    about = "Marquee, movie night suggestions and reaction votes for Discord"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Guild the command applies to.
#[derive(Args, Debug, Clone)]
pub struct GuildArgs {
    /// Guild (server) id.
    #[arg(short, long)]
    pub guild: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a movie to the suggestion list.
    Suggest {
        #[command(flatten)]
        guild: GuildArgs,

        /// Movie title (quote titles with spaces).
        title: String,

        /// Genre of the movie.
        #[arg(long)]
        genre: Option<String>,
    },

    /// Remove a suggestion by list number or title.
    Unsuggest {
        #[command(flatten)]
        guild: GuildArgs,

        /// 1-based list number or title.
        selector: String,
    },

    /// Show the suggestion list.
    Suggestions {
        #[command(flatten)]
        guild: GuildArgs,
    },

    /// Set the genre of a suggestion.
    Genre {
        #[command(flatten)]
        guild: GuildArgs,

        /// 1-based list number or title.
        selector: String,

        /// New genre.
        genre: String,
    },

    /// Clear the suggestion list.
    Clear {
        #[command(flatten)]
        guild: GuildArgs,
    },

    /// Run the vote for the next movie.
    #[command(subcommand)]
    Vote(VoteCommand),

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum VoteCommand {
    /// Post a vote over the current suggestions.
    Start {
        #[command(flatten)]
        guild: GuildArgs,

        /// Channel to post the vote in.
        #[arg(short, long)]
        channel: String,
    },

    /// Close the vote and announce the winner.
    Stop {
        #[command(flatten)]
        guild: GuildArgs,
    },

    /// Abandon the vote without a winner.
    Cancel {
        #[command(flatten)]
        guild: GuildArgs,
    },

    /// Show the current counts.
    Status {
        #[command(flatten)]
        guild: GuildArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::channels::DiscordClient;
use crate::commands::{MovieNight, Suggested};
use crate::config::{self, Config};
use crate::election::{Candidate, CandidateCount, Resolution};
use crate::logging;
use crate::suggestions::{Selector, SuggestionStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["token", "secret", "password", "apikey"];

/// Print top-level help (no subcommand given).
pub fn print_help() -> Result<(), Box<dyn std::error::Error>> {
    Cli::command().print_help()?;
    println!();
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    let redacted = redact_secrets(serde_json::to_value(&cfg)?);
    let pretty = serde_json::to_string_pretty(&redacted)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("marquee {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("MARQUEE_BUILD_DATE"));
    println!("  Git commit: {}", env!("MARQUEE_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

/// Connect to Discord and open the store.
async fn build_service(cfg: &Config) -> Result<MovieNight, Box<dyn std::error::Error>> {
    let client = DiscordClient::new(cfg.discord.clone())?;
    client.connect().await?;
    let store = SuggestionStore::open(cfg.store.resolved_path()).await?;
    Ok(MovieNight::new(
        Arc::new(client),
        Arc::new(store),
        cfg.suggestions.max_suggestions,
    ))
}

/// Run a guild-scoped subcommand.
pub async fn handle_movie_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    logging::init_logging(&cfg.logging)?;
    let night = build_service(&cfg).await?;
    info!(command = ?command, "Running command");

    let output = match command {
        Command::Suggest {
            guild,
            title,
            genre,
        } => {
            let suggested = night.suggest(&guild.guild, &title, genre.as_deref()).await?;
            format_suggested(&suggested, &guild.guild)
        }
        Command::Unsuggest { guild, selector } => {
            let removed = night
                .unsuggest(&guild.guild, &Selector::parse(&selector))
                .await?;
            format!(
                "\"{}\" has been removed from the list of movie suggestions.",
                removed.title
            )
        }
        Command::Suggestions { guild } => {
            let list = night.suggestions(&guild.guild).await;
            let next = night.next_movie(&guild.guild).await;
            format_suggestions(&list, next.as_deref())
        }
        Command::Genre {
            guild,
            selector,
            genre,
        } => {
            let updated = night
                .set_genre(&guild.guild, &Selector::parse(&selector), &genre)
                .await?;
            format!(
                "The genre of \"{}\" has been changed to \"{}\".",
                updated.title, updated.genre
            )
        }
        Command::Clear { guild } => {
            let count = night.clear_suggestions(&guild.guild).await?;
            format!("Suggestions list has been cleared! ({} removed)", count)
        }
        Command::Vote(VoteCommand::Start { guild, channel }) => {
            let started = night.start_vote(&guild.guild, &channel).await?;
            format!(
                "Voting has started! (message {})\n{}",
                started.message_id, started.legend
            )
        }
        Command::Vote(VoteCommand::Stop { guild }) => {
            let resolution = night.stop_vote(&guild.guild).await?;
            format_resolution(&resolution)
        }
        Command::Vote(VoteCommand::Cancel { guild }) => {
            night.cancel_vote(&guild.guild).await?;
            "Voting cancelled!".to_string()
        }
        Command::Vote(VoteCommand::Status { guild }) => {
            let counts = night.vote_status(&guild.guild).await?;
            format_counts(&counts)
        }
        Command::Config(_) | Command::Version => return Ok(()),
    };

    println!("{}", output);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn format_suggested(suggested: &Suggested, guild_id: &str) -> String {
    let title = &suggested.candidate.title;
    let mut out = if suggested.candidate.has_genre() {
        format!(
            "\"{} ({})\" has been added to the list of movie suggestions.",
            title, suggested.candidate.genre
        )
    } else {
        format!(
            "\"{}\" has been added to the list of movie suggestions.\nUnfortunately, I don't know the genre of {}! Feel free to help me out with: `marquee genre --guild {} {} <genre>`.",
            title, title, guild_id, suggested.position
        )
    };
    if let Some(symbol) = suggested.live_symbol {
        out.push_str(&format!("\nIt has joined the running vote as {}.", symbol));
    }
    out
}

fn format_suggestions(list: &[Candidate], next_movie: Option<&str>) -> String {
    let mut lines = vec!["Movie Suggestions:".to_string()];
    if list.is_empty() {
        lines.push("  (none yet)".to_string());
    }
    for (i, candidate) in list.iter().enumerate() {
        if candidate.has_genre() {
            lines.push(format!("{}. {} ({})", i + 1, candidate.title, candidate.genre));
        } else {
            lines.push(format!("{}. {}", i + 1, candidate.title));
        }
    }
    if let Some(next) = next_movie {
        lines.push(format!("Next movie: {}", next));
    }
    lines.join("\n")
}

fn format_counts(counts: &[CandidateCount]) -> String {
    counts
        .iter()
        .map(|c| format!("{} {}: {}", c.symbol, c.title, c.votes))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_resolution(resolution: &Resolution) -> String {
    let mut out = format!("The winner is \"{}\"!", resolution.winner);
    if !resolution.bad_votes.is_empty() {
        out.push_str(&format!(
            "\nRemoved for multiple votes: {}",
            resolution.bad_votes.join(", ")
        ));
    }
    out.push('\n');
    out.push_str(&format_counts(&resolution.counts));
    out
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args_defaults_to_none() {
        let cli = Cli::try_parse_from(["marquee"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_version_subcommand() {
        let cli = Cli::try_parse_from(["marquee", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_suggest_with_genre() {
        let cli = Cli::try_parse_from([
            "marquee", "suggest", "--guild", "42", "Shrek 2", "--genre", "Comedy",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Suggest {
                ref guild,
                ref title,
                ref genre,
            }) => {
                assert_eq!(guild.guild, "42");
                assert_eq!(title, "Shrek 2");
                assert_eq!(genre.as_deref(), Some("Comedy"));
            }
            other => panic!("Expected Suggest, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_guild_is_required() {
        assert!(Cli::try_parse_from(["marquee", "suggestions"]).is_err());
        assert!(Cli::try_parse_from(["marquee", "suggestions", "-g", "42"]).is_ok());
    }

    #[test]
    fn test_cli_vote_start() {
        let cli =
            Cli::try_parse_from(["marquee", "vote", "start", "-g", "42", "-c", "7"]).unwrap();
        match cli.command {
            Some(Command::Vote(VoteCommand::Start {
                ref guild,
                ref channel,
            })) => {
                assert_eq!(guild.guild, "42");
                assert_eq!(channel, "7");
            }
            other => panic!("Expected Vote(Start), got {:?}", other),
        }
        assert!(Cli::try_parse_from(["marquee", "vote", "start", "-g", "42"]).is_err());
    }

    #[test]
    fn test_cli_vote_stop_and_genre() {
        let cli = Cli::try_parse_from(["marquee", "vote", "stop", "-g", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Vote(VoteCommand::Stop { .. }))
        ));

        let cli =
            Cli::try_parse_from(["marquee", "genre", "-g", "42", "2", "Horror"]).unwrap();
        match cli.command {
            Some(Command::Genre {
                ref selector,
                ref genre,
                ..
            }) => {
                assert_eq!(selector, "2");
                assert_eq!(genre, "Horror");
            }
            other => panic!("Expected Genre, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_config_show() {
        let cli = Cli::try_parse_from(["marquee", "config", "show"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand::Show)) => {}
            other => panic!("Expected Config(Show), got {:?}", other),
        }
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::try_parse_from(["marquee", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Path))
        ));
    }

    #[test]
    fn test_redact_secrets() {
        let mut cfg = Config::default();
        cfg.discord.bot_token = "super-secret".to_string();
        let redacted = redact_secrets(serde_json::to_value(&cfg).unwrap());
        assert_eq!(redacted["discord"]["botToken"], "[REDACTED]");
        assert_eq!(redacted["discord"]["requestTimeoutSecs"], 30);
        assert_eq!(redacted["suggestions"]["maxSuggestions"], 20);
    }

    #[test]
    fn test_redact_secrets_array() {
        let val = serde_json::json!([{"apiKey": "secret"}, {"safe": "ok"}]);
        let redacted = redact_secrets(val);
        assert_eq!(redacted[0]["apiKey"], "[REDACTED]");
        assert_eq!(redacted[1]["safe"], "ok");
    }

    #[test]
    fn test_format_suggestions() {
        let list = vec![
            Candidate::new("Alien").with_genre("Horror"),
            Candidate::new("Heat"),
        ];
        assert_eq!(
            format_suggestions(&list, Some("Up")),
            "Movie Suggestions:\n1. Alien (Horror)\n2. Heat\nNext movie: Up"
        );
        assert_eq!(format_suggestions(&[], None), "Movie Suggestions:\n  (none yet)");
    }

    #[test]
    fn test_format_resolution_lists_bad_votes() {
        let resolution = Resolution {
            winner: "C".to_string(),
            bad_votes: vec!["A".to_string(), "B".to_string()],
            counts: vec![CandidateCount {
                title: "C".to_string(),
                symbol: "x".to_string(),
                votes: 1,
            }],
        };
        assert_eq!(
            format_resolution(&resolution),
            "The winner is \"C\"!\nRemoved for multiple votes: A, B\nx C: 1"
        );
    }

    #[test]
    fn test_format_suggested_asks_for_genre() {
        let suggested = Suggested {
            candidate: Candidate::new("Heat"),
            position: 3,
            live_symbol: None,
        };
        let text = format_suggested(&suggested, "42");
        assert!(text.contains("marquee genre --guild 42 3 <genre>"));
    }
}
