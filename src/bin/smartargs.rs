// src/bin/smartargs.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::*;
use smartargs::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// A command, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    summary: &'static str,
    handler: fn(Vec<String>) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "tree",
        aliases: &["ls"],
        summary: "Display the argument tree of a project file",
        handler: handlers::tree::handle,
    },
    CommandDefinition {
        name: "eval",
        aliases: &["run-config"],
        summary: "Print the launch configuration of the checked items",
        handler: handlers::eval::handle,
    },
    CommandDefinition {
        name: "import",
        aliases: &["from-text"],
        summary: "Convert tab-indented text into a project file",
        handler: handlers::import::handle,
    },
    CommandDefinition {
        name: "export",
        aliases: &["to-text"],
        summary: "Print the items of a project file as text",
        handler: handlers::export::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn print_usage() {
    let mut command = Cli::command();
    println!("{}", command.render_usage());
    println!("\n{}", "Commands:".yellow().bold());
    for cmd in COMMAND_REGISTRY {
        let aliases = if cmd.aliases.is_empty() {
            String::new()
        } else {
            format!(" ({})", cmd.aliases.join(", ")).dimmed().to_string()
        };
        println!("  {:<8}{}{}", cmd.name.cyan(), cmd.summary, aliases);
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(name) = cli.command else {
        print_usage();
        return Ok(());
    };

    match find_command(&name) {
        Some(command) => (command.handler)(cli.args),
        None => {
            print_usage();
            anyhow::bail!("Unknown command '{}'.", name)
        }
    }
}
