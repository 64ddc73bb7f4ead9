mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    annotate, format, replace, search, stats, AnnotateArgs, FormatArgs, ReplaceArgs, SearchArgs,
    StatsArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Novella CLI - manuscript chapter tools
#[derive(Parser, Debug)]
#[command(name = "novella")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Auto-format every text run of a chapter
    Format(FormatArgs),

    /// List matches with plain-text markers
    Search(SearchArgs),

    /// Replace every match
    Replace(ReplaceArgs),

    /// Wrap a range of a block's text in an annotation
    Annotate(AnnotateArgs),

    /// Block count, word count, annotations and referenced entities
    Stats(StatsArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;

    match cli.command {
        Command::Format(args) => format(args, &config),
        Command::Search(args) => search(args, &config),
        Command::Replace(args) => replace(args, &config),
        Command::Annotate(args) => annotate(args, &config),
        Command::Stats(args) => stats(args, &config),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_replace_positionals() {
        let cli = Cli::try_parse_from([
            "novella", "replace", "ch.json", "rain", "snow", "--regex", "--write",
        ])
        .unwrap();
        match cli.command {
            Command::Replace(args) => {
                assert_eq!(args.query.query, "rain");
                assert_eq!(args.replacement, "snow");
                assert!(args.query.regex);
                assert!(args.write);
            }
            other => panic!("expected replace, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_annotate() {
        let cli = Cli::try_parse_from([
            "novella", "annotate", "ch.json", "--block", "1", "--start", "2", "--end", "5",
            "--id", "idea-9",
        ])
        .unwrap();
        match cli.command {
            Command::Annotate(args) => {
                assert_eq!((args.block, args.start, args.end), (1, 2, 5));
                assert_eq!(args.id, "idea-9");
                assert!(!args.write);
            }
            other => panic!("expected annotate, got {:?}", other),
        }
    }
}
