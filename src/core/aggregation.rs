// src/core/aggregation.rs

//! Flattens a project's tree into the launch configuration: command line,
//! environment variables, working directory and launch application.

use crate::core::backend::{ActiveConfiguration, LaunchConfig, ManagedKinds, ProjectConfigBackend, PropertyLookup};
use crate::core::evaluation::{Evaluator, try_parse_env_var};
use crate::core::node::{Node, NodeId};
use crate::core::settings::{EffectiveSettings, InactiveDisableMode};
use crate::core::tree::Tree;
use crate::models::ParamType;
use std::collections::{BTreeMap, HashMap, HashSet};

/// `None` on either side means "no constraint".
fn filter_matches(used: Option<&str>, active: Option<&str>) -> bool {
    match (used, active) {
        (Some(used), Some(active)) => used == active,
        _ => true,
    }
}

/// Read-only view over one project for a given active configuration.
#[derive(Debug)]
pub struct Aggregator<'a> {
    tree: &'a Tree,
    project: NodeId,
    active: &'a ActiveConfiguration,
}

impl<'a> Aggregator<'a> {
    pub fn new(tree: &'a Tree, project: NodeId, active: &'a ActiveConfiguration) -> Self {
        Self { tree, project, active }
    }

    /// Whether a checked or partially checked item passes the active filters.
    pub fn participates(&self, id: NodeId) -> bool {
        !self.tree.check_of(id).is_unchecked()
            && filter_matches(self.tree.used_project_config(id), self.active.config.as_deref())
            && filter_matches(self.tree.used_project_platform(id), self.active.platform.as_deref())
            && filter_matches(self.tree.used_launch_profile(id), self.active.launch_profile.as_deref())
    }

    fn participating_children(&self, container: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.tree
            .children(container)
            .iter()
            .copied()
            .filter(move |child| self.participates(*child))
    }

    /// Participating parameters of every type, in tree order.
    pub fn command_line_items(&self) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_items(self.project, &mut result);
        result
    }

    fn collect_items(&self, container: NodeId, result: &mut Vec<NodeId>) {
        for child in self.participating_children(container) {
            match self.tree.get(child) {
                Some(node) if node.is_parameter() => result.push(child),
                Some(_) => self.collect_items(child, result),
                None => {}
            }
        }
    }

    fn items_of_type(&self, param_type: ParamType) -> impl Iterator<Item = &'a Node> + '_ {
        self.command_line_items()
            .into_iter()
            .filter_map(|id| self.tree.get(id))
            .filter(move |node| node.param_type() == Some(param_type))
    }

    /// The command line of the project.
    ///
    /// Each container joins the strings of its participating children with its
    /// delimiter and wraps a non-empty result in its prefix and postfix. A child
    /// container contributes its own joined string as one part.
    pub fn create_command_line(&self, evaluator: &Evaluator<'_>) -> String {
        self.join_command_line(self.project, evaluator)
    }

    fn join_command_line(&self, container: NodeId, evaluator: &Evaluator<'_>) -> String {
        let Some(data) = self.tree.get(container).and_then(Node::container) else {
            return String::new();
        };

        let parts: Vec<String> = self
            .participating_children(container)
            .filter_map(|child| {
                let node = self.tree.get(child)?;
                match node.param_type() {
                    None => Some(self.join_command_line(child, evaluator)),
                    Some(ParamType::CmdArg) => Some(evaluator.evaluate_macros(node.value(), self.project)),
                    Some(_) => None,
                }
            })
            .filter(|part| !part.is_empty())
            .collect();

        let joined = parts.join(&data.delimiter);
        if joined.is_empty() {
            joined
        } else {
            format!("{}{}{}", data.prefix, joined, data.postfix)
        }
    }

    /// Environment variables of the project. Later items override earlier ones.
    pub fn env_vars(&self, evaluator: &Evaluator<'_>) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        for node in self.items_of_type(ParamType::EnvVar) {
            match try_parse_env_var(node.value()) {
                Some(var) => {
                    result.insert(var.name, evaluator.evaluate_macros(&var.value, self.project));
                }
                None => log::debug!("Skipping env var '{}' without '='.", node.value()),
            }
        }
        result
    }

    /// The last participating working directory, empty when there is none.
    pub fn work_dir(&self, evaluator: &Evaluator<'_>) -> String {
        self.items_of_type(ParamType::WorkDir)
            .last()
            .map(|node| evaluator.evaluate_macros(node.value(), self.project))
            .unwrap_or_default()
    }

    /// The last participating launch application, empty when there is none.
    pub fn launch_app(&self, evaluator: &Evaluator<'_>) -> String {
        self.items_of_type(ParamType::LaunchApp)
            .last()
            .map(|node| evaluator.evaluate_macros(node.value(), self.project))
            .unwrap_or_default()
    }

    /// Parameters that actually end up in the launch configuration for `kinds`.
    ///
    /// Every command line argument counts, but only the last env var per name
    /// and the last working directory or launch app.
    pub fn active_parameters(&self, kinds: ManagedKinds) -> HashSet<NodeId> {
        let mut result = HashSet::new();
        if !kinds.any() {
            return result;
        }

        let mut env_vars: HashMap<String, NodeId> = HashMap::new();
        let mut work_dir = None;
        let mut launch_app = None;

        for id in self.command_line_items() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            match node.param_type() {
                Some(ParamType::CmdArg) if kinds.command_line => {
                    result.insert(id);
                }
                Some(ParamType::EnvVar) if kinds.env_vars => {
                    if let Some(var) = try_parse_env_var(node.value()) {
                        env_vars.insert(var.name, id);
                    }
                }
                Some(ParamType::WorkDir) if kinds.work_dir => work_dir = Some(id),
                Some(ParamType::LaunchApp) if kinds.launch_app => launch_app = Some(id),
                _ => {}
            }
        }

        result.extend(env_vars.into_values());
        result.extend(work_dir);
        result.extend(launch_app);
        result
    }

    /// Builds the launch configuration, leaving unmanaged kinds as `None`.
    pub fn build_launch_config(&self, kinds: ManagedKinds, evaluator: &Evaluator<'_>) -> LaunchConfig {
        LaunchConfig {
            command_line: kinds.command_line.then(|| self.create_command_line(evaluator)),
            env_vars: kinds.env_vars.then(|| self.env_vars(evaluator)),
            work_dir: kinds.work_dir.then(|| self.work_dir(evaluator)),
            launch_app: kinds.launch_app.then(|| self.launch_app(evaluator)),
        }
    }
}

/// Recomputes the `is_active` flag of every parameter of every attached project.
///
/// Projects the mode doesn't apply to get all their parameters marked active.
pub fn update_is_active(tree: &mut Tree, settings: &EffectiveSettings, backend: &dyn ProjectConfigBackend) {
    let kinds = settings.managed_kinds();
    let mut updates: Vec<(NodeId, bool)> = Vec::new();

    for project in tree.projects().to_vec() {
        let applies = match settings.disable_inactive_items {
            InactiveDisableMode::Disabled => false,
            InactiveDisableMode::InStartupProject => tree.get(project).is_some_and(Node::is_startup_project),
            InactiveDisableMode::InAllProjects => true,
        };

        let parameters = tree.parameters(project);
        if applies {
            let active_config = backend.active_configuration(project);
            let active = Aggregator::new(tree, project, &active_config).active_parameters(kinds);
            updates.extend(parameters.into_iter().map(|id| (id, active.contains(&id))));
        } else {
            updates.extend(parameters.into_iter().map(|id| (id, true)));
        }
    }

    for (id, is_active) in updates {
        tree.set_active(id, is_active);
    }
}

/// Pushes the aggregated launch configuration of `project` to the backend.
///
/// Only the kinds enabled by the `manage_*` settings are computed. When none
/// is, nothing is pushed. Backend failures are logged.
///
/// # Returns
///
/// `true` if the backend accepted a configuration.
pub fn update_configuration_for_project(
    tree: &Tree,
    project: NodeId,
    settings: &EffectiveSettings,
    backend: &dyn ProjectConfigBackend,
    properties: &dyn PropertyLookup,
) -> bool {
    let kinds = settings.managed_kinds();
    if !kinds.any() {
        log::debug!("No launch configuration kind is managed, skipping project '{}'.", project);
        return false;
    }
    if !tree.is_attached(project) {
        log::debug!("Project '{}' is not loaded, skipping configuration update.", project);
        return false;
    }

    let active_config = backend.active_configuration(project);
    let evaluator = Evaluator::new(settings, properties);
    let config = Aggregator::new(tree, project, &active_config).build_launch_config(kinds, &evaluator);

    match backend.set_config(project, &config) {
        Ok(()) => {
            log::info!("Updated launch configuration for project '{}'.", project);
            true
        }
        Err(e) => {
            log::warn!("Failed to update launch configuration for project '{}': {}", project, e);
            false
        }
    }
}
