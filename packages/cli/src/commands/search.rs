use super::Chapter;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use novella_editor::{MarkerProjector, SearchQuery};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Text to look for
    pub query: String,

    /// Match case exactly
    #[arg(short, long)]
    pub case_sensitive: bool,

    /// Treat the query as a regular expression
    #[arg(short, long)]
    pub regex: bool,
}

impl QueryArgs {
    pub fn to_query(&self) -> SearchQuery {
        let query = if self.regex {
            SearchQuery::pattern(self.query.clone())
        } else {
            SearchQuery::literal(self.query.clone())
        };
        query.case_sensitive(self.case_sensitive)
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Chapter .json file
    pub file: PathBuf,

    #[command(flatten)]
    pub query: QueryArgs,
}

pub fn search(args: SearchArgs, config: &Config) -> Result<()> {
    let mut chapter = Chapter::open(&args.file, config)?;
    let count = chapter.session.search(args.query.to_query()).len();

    if count == 0 {
        println!("{} No matches for {:?}", "✗".yellow(), args.query.query);
        return Ok(());
    }

    let mut projector = MarkerProjector::new();
    chapter.session.search_engine().project(&mut projector);
    println!("{}", projector.render(chapter.session.document()));
    println!();
    println!(
        "{} {} {}",
        "✓".green(),
        count,
        if count == 1 { "match" } else { "matches" }
    );
    Ok(())
}
