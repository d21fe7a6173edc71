// src/cli/handlers/tree.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    cli::handlers::commons,
    core::{
        node::{Node, NodeId},
        tree::Tree,
    },
    models::ParamType,
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Displays the argument tree of a project file.")]
struct TreeArgs {
    /// The `*.args.json` file to display.
    file: PathBuf,

    /// Show the id of each item.
    #[arg(long, short)]
    ids: bool,

    /// Limit the depth of the tree display.
    #[arg(long, short)]
    depth: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct DisplayOptions {
    show_ids: bool,
    max_depth: Option<usize>,
}

pub fn handle(args: Vec<String>) -> Result<()> {
    // 1. Parse this handler's specific arguments.
    let tree_args = TreeArgs::try_parse_from(&args)?;

    // 2. Load the file into a tree.
    let loaded = commons::load_project_file(&tree_args.file)?;
    let options = DisplayOptions {
        show_ids: tree_args.ids,
        max_depth: tree_args.depth,
    };

    // 3. Render.
    println!("\n{} {}", "Project".bold(), loaded.info.name.cyan());
    for line in render(&loaded.tree, loaded.project, &options) {
        println!("{line}");
    }
    Ok(())
}

fn render(tree: &Tree, project: NodeId, options: &DisplayOptions) -> Vec<String> {
    let mut lines = Vec::new();
    let children = tree.children(project);
    if children.is_empty() {
        lines.push("  (no items)".dimmed().to_string());
    }
    for (i, child) in children.iter().enumerate() {
        render_node(tree, *child, "", i + 1 == children.len(), 1, options, &mut lines);
    }
    lines
}

fn render_node(
    tree: &Tree,
    id: NodeId,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &DisplayOptions,
    lines: &mut Vec<String>,
) {
    let Some(node) = tree.get(id) else {
        return;
    };
    let connector = if is_last { "└─" } else { "├─" };
    lines.push(format!("{prefix}{connector}{}", describe(node, options)));

    if options.max_depth.is_some_and(|max| depth >= max) {
        return;
    }
    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    let children = tree.children(id);
    for (i, child) in children.iter().enumerate() {
        render_node(tree, *child, &child_prefix, i + 1 == children.len(), depth + 1, options, lines);
    }
}

/// One line of the tree: check mark, value and the non-default attributes.
fn describe(node: &Node, options: &DisplayOptions) -> String {
    let mut line = format!("{} ", node.check());

    match node.param_type() {
        Some(param_type) => {
            line.push_str(node.value());
            if param_type != ParamType::CmdArg {
                line.push_str(&format!(" {}", format!("<{param_type:?}>").dimmed()));
            }
            if node.default_checked() == Some(true) {
                line.push_str(&format!(" {}", "(default)".dimmed()));
            }
        }
        None => {
            let name = if node.value().is_empty() { "(group)" } else { node.value() };
            line.push_str(&name.bold().to_string());
            let mut tags: Vec<String> = Vec::new();
            if let Some(container) = node.container() {
                if container.exclusive_mode {
                    tags.push("exclusive".to_string());
                }
                if container.delimiter != " " {
                    tags.push(format!("delimiter={:?}", container.delimiter));
                }
                if !container.prefix.is_empty() || !container.postfix.is_empty() {
                    tags.push(format!("wrap={:?}..{:?}", container.prefix, container.postfix));
                }
            }
            let filters = [
                ("config", node.project_config()),
                ("platform", node.project_platform()),
                ("profile", node.launch_profile()),
            ];
            for (label, value) in filters {
                if let Some(value) = value {
                    tags.push(format!("{label}={value}"));
                }
            }
            if !tags.is_empty() {
                line.push_str(&format!(" {}", format!("[{}]", tags.join(", ")).yellow()));
            }
        }
    }

    if options.show_ids {
        line.push_str(&format!(" {}", node.id().to_string().dimmed()));
    }
    line
}
