use super::search::QueryArgs;
use super::Chapter;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplaceArgs {
    /// Chapter .json file
    pub file: PathBuf,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Literal replacement text
    pub replacement: String,

    /// Write the chapter back instead of printing it
    #[arg(short, long)]
    pub write: bool,
}

pub fn replace(args: ReplaceArgs, config: &Config) -> Result<()> {
    let mut chapter = Chapter::open(&args.file, config)?;
    let count = chapter.session.search(args.query.to_query()).len();

    let Some(commit) = chapter.session.replace_all(&args.replacement)? else {
        println!("{} No matches for {:?}", "✗".yellow(), args.query.query);
        return Ok(());
    };

    if args.write {
        chapter.save()?;
        println!(
            "{} Replaced {} in {}",
            "✓".green(),
            count,
            chapter.path.display()
        );
    } else {
        println!("{}", commit.document.plain_text());
        println!();
        println!("{} {} replacements (not written)", "✓".green(), count);
    }
    Ok(())
}
