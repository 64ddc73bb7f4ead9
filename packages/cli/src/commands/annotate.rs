use super::Chapter;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use novella_editor::{Document, Mutation, Selection};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Chapter .json file
    pub file: PathBuf,

    /// Zero-based block index
    #[arg(long)]
    pub block: usize,

    /// Start position inside the block, in characters
    #[arg(long)]
    pub start: usize,

    /// End position inside the block, in characters
    #[arg(long)]
    pub end: usize,

    /// Annotation id to attach
    #[arg(long)]
    pub id: String,

    /// Write the chapter back instead of printing it
    #[arg(short, long)]
    pub write: bool,
}

pub fn annotate(args: AnnotateArgs, config: &Config) -> Result<()> {
    let mut chapter = Chapter::open(&args.file, config)?;
    let selection = block_selection(chapter.session.document(), args.block, args.start, args.end)?;

    let commit = chapter.session.dispatch_immediate(Mutation::WrapAnnotation {
        selection,
        id: args.id.clone(),
    })?;
    if !commit.changed {
        return Err(anyhow!("Nothing to annotate in block {}", args.block));
    }

    if args.write {
        chapter.save()?;
        println!(
            "{} Annotated {} in {}",
            "✓".green(),
            args.id.bold(),
            chapter.path.display()
        );
    } else {
        println!("{}", commit.document.to_json_pretty()?);
    }
    Ok(())
}

/// Selection covering `[start, end)` of one block's linear positions
fn block_selection(doc: &Document, block: usize, start: usize, end: usize) -> Result<Selection> {
    let target = doc
        .block(block)
        .ok_or_else(|| anyhow!("Block {} out of range (chapter has {})", block, doc.block_count()))?;
    if start >= end {
        return Err(anyhow!("Empty range {}..{}", start, end));
    }
    let len = target.position_len();
    let point = |position: usize| {
        target
            .point_at(position)
            .ok_or_else(|| anyhow!("Position {} out of range (block has {})", position, len))
    };
    Ok(Selection::new(point(start)?, point(end)?))
}
