// src/cli/handlers/import.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    core::{clipboard, serializer::project_file_to_string},
    models::{CmdItemJson, ProjectDataJson},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Converts tab-indented argument text into a project file."
)]
struct ImportArgs {
    /// Text file with one item per line. Tabs nest, a trailing ':' opens a group.
    input: PathBuf,

    /// Where to write the project file. Prints to stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

/// Builds the project data for the text `content`. Every item gets a fresh id.
fn project_from_text(content: &str) -> ProjectDataJson {
    let items: Vec<CmdItemJson> = clipboard::parse_lines(content.lines())
        .iter()
        .map(clipboard::ClipboardItemJson::to_record)
        .collect();
    let mut data = ProjectDataJson::empty_project(Uuid::new_v4());
    data.items = Some(items);
    data
}

pub fn handle(args: Vec<String>) -> Result<()> {
    // 1. Parse this handler's specific arguments.
    let import_args = ImportArgs::try_parse_from(&args)?;

    // 2. Read and convert.
    let content = fs::read_to_string(&import_args.input)
        .with_context(|| format!("Failed to read '{}'", import_args.input.display()))?;
    let data = project_from_text(&content);
    let json = project_file_to_string(&data).context("Failed to serialize the project file")?;

    // 3. Write.
    match &import_args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write '{}'", path.display()))?;
            println!(
                "{} {} items to '{}'.",
                "Imported".green(),
                data.all_items().len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
