// src/cli/handlers/eval.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    cli::handlers::commons::{self, LoadedProject},
    constants::TARGET_DIR_PROPERTY,
    core::{
        aggregation::Aggregator,
        backend::{ActiveConfiguration, LaunchConfig, ManagedKinds, StaticProperties},
        evaluation::{Evaluator, env_vars_for_cmd, env_vars_for_powershell},
        node::Node,
        settings::{EffectiveSettings, GlobalOptions},
    },
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the launch configuration built from the checked items of a project file."
)]
struct EvalArgs {
    /// The `*.args.json` file to evaluate.
    file: PathBuf,

    /// Active project configuration (e.g. Debug).
    #[arg(long)]
    config: Option<String>,

    /// Active project platform (e.g. x64).
    #[arg(long)]
    platform: Option<String>,

    /// Active launch profile.
    #[arg(long)]
    profile: Option<String>,

    /// Items to check, by id or unique id prefix. Checking a group checks its items.
    #[arg(long, num_args = 1..)]
    check: Vec<String>,

    /// Check every item marked as checked by default.
    #[arg(long)]
    defaults: bool,

    /// Build properties used by `$(Name)` macros (e.g. "TargetDir=bin/").
    #[arg(long = "prop", num_args = 1..)]
    props: Vec<String>,

    /// Print env vars as a CMD `set` line instead of a PowerShell snippet.
    #[arg(long)]
    cmd: bool,
}

pub fn handle(args: Vec<String>) -> Result<()> {
    // 1. Parse this handler's specific arguments.
    let eval_args = EvalArgs::try_parse_from(&args)?;

    // 2. Load the project and apply the requested check states.
    let mut loaded = commons::load_project_file(&eval_args.file)?;
    apply_checks(&mut loaded, &eval_args)?;

    // 3. Resolve settings and properties.
    let global = GlobalOptions::load().unwrap_or_else(|e| {
        log::warn!("Failed to load options, using defaults: {}", e);
        GlobalOptions::default()
    });
    let settings = EffectiveSettings::resolve(&global, None);
    let mut properties: StaticProperties = eval_args
        .props
        .iter()
        .map(|prop| commons::parse_key_value(prop))
        .collect::<Result<_>>()?;
    properties
        .0
        .entry(TARGET_DIR_PROPERTY.to_string())
        .or_insert_with(|| loaded.info.dir.display().to_string());

    // 4. Aggregate every kind.
    let active = ActiveConfiguration {
        config: eval_args.config.clone(),
        platform: eval_args.platform.clone(),
        launch_profile: eval_args.profile.clone(),
    };
    let evaluator = Evaluator::new(&settings, &properties);
    let kinds = ManagedKinds {
        command_line: true,
        env_vars: true,
        work_dir: true,
        launch_app: true,
    };
    let config = Aggregator::new(&loaded.tree, loaded.project, &active).build_launch_config(kinds, &evaluator);

    // 5. Print.
    print_config(&config, eval_args.cmd);
    Ok(())
}

fn apply_checks(loaded: &mut LoadedProject, eval_args: &EvalArgs) -> Result<()> {
    if eval_args.defaults {
        let defaults: Vec<_> = loaded
            .tree
            .parameters(loaded.project)
            .into_iter()
            .filter(|id| loaded.tree.get(*id).and_then(Node::default_checked).unwrap_or(false))
            .collect();
        for id in defaults {
            loaded.tree.set_checked(id, true, false)?;
        }
    }
    for id in commons::resolve_items(&loaded.tree, loaded.project, &eval_args.check)? {
        loaded.tree.set_checked(id, true, false)?;
    }
    Ok(())
}

fn print_config(config: &LaunchConfig, as_cmd: bool) {
    let or_none = |value: &str| {
        if value.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            value.to_string()
        }
    };

    println!("{}: {}", "Command line".bold(), or_none(config.command_line.as_deref().unwrap_or_default()));
    if let Some(vars) = config.env_vars.as_ref().filter(|vars| !vars.is_empty()) {
        let rendered = if as_cmd { env_vars_for_cmd(vars) } else { env_vars_for_powershell(vars) };
        println!("{}: {}", "Environment".bold(), rendered);
    } else {
        println!("{}: {}", "Environment".bold(), or_none(""));
    }
    println!("{}: {}", "Working directory".bold(), or_none(config.work_dir.as_deref().unwrap_or_default()));
    println!("{}: {}", "Launch application".bold(), or_none(config.launch_app.as_deref().unwrap_or_default()));
}
