// src/core/reconcile.rs

//! Decides which source a project's items come from when it is (re)loaded:
//! the JSON file, the live tree, the solution state blob or the native
//! project configuration.

use crate::core::backend::{ProjectConfigBackend, ProjectInfo};
use crate::core::node::{CheckState, Node, NodeId};
use crate::core::serializer::populate_project;
use crate::core::settings::EffectiveSettings;
use crate::core::storage::FileStorage;
use crate::core::tree::{Tree, TreeResult};
use crate::models::{CmdItemJson, ProjectDataJson, SuoDataJson};
use std::collections::HashMap;

/// Where the items of a reconciled project came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The host reported a nil project id (unloaded mid-flight). Nothing done.
    Skipped,
    /// Loaded from the JSON file, merged with the live and saved UI state.
    JsonFile,
    /// No JSON file and the project is already in the tree. Nothing done.
    KeptLiveState,
    /// Loaded from the solution state blob.
    SolutionState,
    /// Seeded from the project's native configuration.
    ProjectConfig,
}

/// The collaborators consulted during reconciliation.
pub struct ReconcileSources<'a> {
    pub settings: &'a EffectiveSettings,
    pub suo: &'a SuoDataJson,
    pub storage: &'a dyn FileStorage,
    pub backend: &'a dyn ProjectConfigBackend,
}

impl std::fmt::Debug for ReconcileSources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileSources")
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

/// UI state of one live node.
#[derive(Debug, Clone, Copy)]
struct LiveState {
    check: CheckState,
    is_expanded: Option<bool>,
    is_selected: bool,
}

fn live_state(tree: &Tree, project: NodeId) -> Option<HashMap<NodeId, LiveState>> {
    if !tree.is_attached(project) {
        return None;
    }
    let ids = std::iter::once(project).chain(tree.descendants(project));
    Some(
        ids.filter_map(|id| tree.get(id))
            .map(|node: &Node| {
                let state = LiveState {
                    check: node.check(),
                    is_expanded: node.container().map(|c| c.is_expanded),
                    is_selected: node.is_selected(),
                };
                (node.id(), state)
            })
            .collect(),
    )
}

fn for_each_record(record: &mut CmdItemJson, f: &mut dyn FnMut(&mut CmdItemJson)) {
    for child in record.items.iter_mut().flatten() {
        f(child);
        for_each_record(child, f);
    }
}

/// Fills the UI bits of freshly read JSON data.
///
/// Priority is live tree, then the solution state blob. A parameter neither
/// knows about starts at its default check state, unless the blob has data
/// for the project at all.
fn merge_json_state(data: &mut ProjectDataJson, live: Option<&HashMap<NodeId, LiveState>>, suo: &SuoDataJson, project: NodeId) {
    let project_in_suo = suo.project_arguments.contains_key(&project);
    let lookup = |id: &NodeId| live.and_then(|live| live.get(id)).copied();

    for_each_record(data, &mut |record| {
        let live = lookup(&record.id);
        if record.is_container() {
            record.expanded = live
                .and_then(|state| state.is_expanded)
                .unwrap_or_else(|| suo.expanded_container.contains(&record.id));
        } else {
            record.enabled = match live {
                Some(state) => state.check.is_checked(),
                None if project_in_suo => suo.checked_arguments.contains(&record.id),
                None => record.default_checked,
            };
        }
        record.selected = live.map_or_else(|| suo.selected_items.contains(&record.id), |state| state.is_selected);
    });

    let live_project = lookup(&project);
    data.expanded = live_project
        .and_then(|state| state.is_expanded)
        .unwrap_or_else(|| suo.expanded_container.contains(&project));
    data.selected = live_project.map_or_else(|| suo.selected_items.contains(&project), |state| state.is_selected);
}

/// Applies only the blob's UI bits to data taken from the blob itself.
fn apply_suo_state(data: &mut ProjectDataJson, suo: &SuoDataJson, project: NodeId) {
    for_each_record(data, &mut |record| {
        if record.is_container() {
            record.expanded = suo.expanded_container.contains(&record.id);
        } else {
            record.enabled = suo.checked_arguments.contains(&record.id);
        }
        record.selected = suo.selected_items.contains(&record.id);
    });
    data.expanded = suo.expanded_container.contains(&project);
    data.selected = suo.selected_items.contains(&project);
}

/// Reconciles one project and pushes the result into the tree.
///
/// # Arguments
///
/// * `tree` - The live tree.
/// * `project` - The host's description of the project.
/// * `sources` - Settings, solution state, file store and native config backend.
///
/// # Errors
///
/// Only tree invariant violations are returned. Collaborator failures are
/// logged and fall through to the next source.
pub fn reconcile_project(tree: &mut Tree, project: &ProjectInfo, sources: &ReconcileSources<'_>) -> TreeResult<ReconcileOutcome> {
    let settings = sources.settings;
    let suo = sources.suo;

    log::info!(
        "Reconciling project '{}'. VCS support: {}. Projects in solution state: {}.",
        project.name,
        settings.vcs_support_enabled,
        suo.project_arguments.len()
    );

    // 1. A nil id means the host unloaded the project while we were queued.
    if project.id.is_nil() {
        log::info!("Skipping project '{}' because its id is nil.", project.name);
        return Ok(ReconcileOutcome::Skipped);
    }

    // 2. The JSON file wins whenever VCS support is on and it exists.
    let json_data = if settings.vcs_support_enabled {
        sources.storage.read_project_data(project)
    } else {
        None
    };

    let (data, outcome) = if let Some(mut data) = json_data {
        if data.items.is_some() {
            let live = live_state(tree, project.id);
            merge_json_state(&mut data, live.as_ref(), suo, project.id);
            log::info!("Using {} items from the JSON file for project '{}'.", data.children().len(), project.name);
        } else {
            log::info!("JSON file of project '{}' has no items.", project.name);
            data = ProjectDataJson::empty_project(project.id);
        }
        (data, ReconcileOutcome::JsonFile)
    }
    // 3. Without a file the live tree keeps its state.
    else if tree.is_attached(project.id) {
        log::info!("Keeping the live items of project '{}'.", project.name);
        return Ok(ReconcileOutcome::KeptLiveState);
    }
    // 4. Without VCS support the blob holds the structure as well.
    else if let Some(mut data) = suo
        .project_arguments
        .get(&project.id)
        .filter(|_| !settings.vcs_support_enabled)
        .cloned()
    {
        log::info!("Using items from the solution state for project '{}'.", project.name);
        apply_suo_state(&mut data, suo, project.id);
        (data, ReconcileOutcome::SolutionState)
    }
    // 5. Last resort: seed from the native configuration.
    else {
        log::info!("Gathering items from the configuration of project '{}'.", project.name);
        let mut data = ProjectDataJson::empty_project(project.id);
        if sources.backend.is_supported(project) {
            match sources.backend.get_items(project, settings.managed_kinds()) {
                Ok(items) => data.items = Some(items),
                Err(e) => log::warn!("Failed to read the configuration of project '{}': {}", project.name, e),
            }
        }
        (data, ReconcileOutcome::ProjectConfig)
    };

    populate_project(tree, project.id, project.kind, &project.name, &data)?;
    log::info!("Updated items of project '{}' ({:?}).", project.name, outcome);
    Ok(outcome)
}
