// src/cli/handlers/export.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::{
    cli::handlers::commons,
    core::{clipboard, node::NodeId, tree::Tree},
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Prints the items of a project file as text.")]
struct ExportArgs {
    /// The `*.args.json` file to export.
    file: PathBuf,

    /// Print the clipboard JSON form instead of tab-indented text.
    #[arg(long)]
    json: bool,
}

fn export_text(tree: &Tree, project: NodeId) -> String {
    let items = clipboard::items_json(tree, tree.children(project));
    clipboard::items_to_lines(&items).join("\n")
}

pub fn handle(args: Vec<String>) -> Result<()> {
    let export_args = ExportArgs::try_parse_from(&args)?;
    let loaded = commons::load_project_file(&export_args.file)?;

    if export_args.json {
        let items = clipboard::items_json(&loaded.tree, loaded.tree.children(loaded.project));
        let json = serde_json::to_string_pretty(&items).context("Failed to serialize the items")?;
        println!("{json}");
    } else {
        println!("{}", export_text(&loaded.tree, loaded.project));
    }
    Ok(())
}
