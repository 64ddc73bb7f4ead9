use super::Chapter;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use novella_document::{EntityKind, Reference, Visitor};
use novella_editor::{count_words, Document};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Chapter .json file
    pub file: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterStats {
    pub blocks: usize,
    pub words: usize,
    pub annotation_ids: Vec<String>,
    pub entities: Vec<EntityUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUsage {
    pub entity_id: String,
    pub name: String,
    pub kind: EntityKind,
    pub references: usize,
}

impl ChapterStats {
    pub fn collect(doc: &Document) -> Self {
        struct Entities(Vec<EntityUsage>);
        impl<'a> Visitor<'a> for Entities {
            fn visit_reference(&mut self, reference: &'a Reference) {
                match self.0.iter_mut().find(|e| e.entity_id == reference.entity_id) {
                    Some(usage) => usage.references += 1,
                    None => self.0.push(EntityUsage {
                        entity_id: reference.entity_id.clone(),
                        name: reference.display_name.clone(),
                        kind: reference.entity_kind,
                        references: 1,
                    }),
                }
            }
        }

        let mut entities = Entities(Vec::new());
        entities.visit_document(doc);
        Self {
            blocks: doc.block_count(),
            words: count_words(doc),
            annotation_ids: doc.annotation_ids(),
            entities: entities.0,
        }
    }
}

pub fn stats(args: StatsArgs, config: &Config) -> Result<()> {
    let chapter = Chapter::open(&args.file, config)?;
    let stats = ChapterStats::collect(chapter.session.document());

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", chapter.path.display().to_string().bold());
    println!("   Blocks: {}", stats.blocks);
    println!("   Words:  {}", stats.words);

    if stats.annotation_ids.is_empty() {
        println!("   Annotations: {}", "none".dimmed());
    } else {
        println!("   Annotations: {}", stats.annotation_ids.join(", "));
    }

    if stats.entities.is_empty() {
        println!("   Entities: {}", "none".dimmed());
    } else {
        println!("   Entities:");
        for usage in &stats.entities {
            println!(
                "     {} {} ({}) × {}",
                "@".cyan(),
                usage.name,
                usage.kind.as_str(),
                usage.references
            );
        }
    }
    Ok(())
}
