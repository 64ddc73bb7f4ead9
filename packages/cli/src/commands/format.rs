use super::{chapter_files, Chapter};
use crate::config::Config;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use novella_editor::Language;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Chapter .json file or directory of chapters
    pub input: PathBuf,

    /// Formatting rules; defaults to the configured language
    #[arg(short, long, value_enum)]
    pub language: Option<LanguageArg>,

    /// Write formatted chapters back instead of printing them
    #[arg(short, long)]
    pub write: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanguageArg {
    Zh,
    En,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Zh => Language::Zh,
            LanguageArg::En => Language::En,
        }
    }
}

pub fn format(args: FormatArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if let Some(language) = args.language {
        config.editor.language = Language::from(language).code().to_string();
    }

    let files = chapter_files(&args.input)?;
    let mut changed = 0;

    for file in &files {
        if format_file(file, &config, args.write)? {
            changed += 1;
        }
    }

    if files.len() > 1 || args.write {
        println!();
        println!(
            "✨ {} {} of {} chapters {}",
            "Done".green().bold(),
            changed,
            files.len(),
            if args.write { "reformatted" } else { "need formatting" }
        );
    }

    Ok(())
}

/// Returns whether the chapter changed
fn format_file(path: &Path, config: &Config, write: bool) -> Result<bool> {
    let mut chapter = Chapter::open(path, config)?;
    let commit = chapter.session.auto_format()?;

    if write {
        if commit.changed {
            chapter.save()?;
            println!("{} {}", "✓".green(), path.display());
        }
    } else if commit.changed {
        println!("{}", path.display().to_string().bold());
        println!("{}", commit.document.plain_text());
    }

    tracing::debug!(path = %path.display(), changed = commit.changed, "formatted chapter");
    Ok(commit.changed)
}
