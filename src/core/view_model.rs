// src/core/view_model.rs

//! The owner-thread façade over the tree.
//!
//! [`TreeViewModel`] runs the editing commands of the tool window, drains the
//! tree's event outbox into coarse notifications, records undo snapshots and
//! schedules the per-project debounced notifications that drive persistence.

use crate::constants::{DEBOUNCE_WINDOW, STARTUP_SETTLE_DELAY};
use crate::core::aggregation::{update_configuration_for_project, update_is_active};
use crate::core::backend::{ProjectConfigBackend, ProjectInfo, PropertyLookup};
use crate::core::clipboard::{self, ClipboardPayload};
use crate::core::debounce::{DebouncerTable, DelayedAction};
use crate::core::evaluation::split_argument;
use crate::core::events::{EventClass, ThrottledNotification, TreeEventKind, TreeNotification};
use crate::core::history::History;
use crate::core::node::{CheckState, ItemFilter, Node, NodeId};
use crate::core::reconcile::{ReconcileOutcome, ReconcileSources, reconcile_project};
use crate::core::serializer::{build_suo_data, project_to_data, repopulate_project};
use crate::core::settings::EffectiveSettings;
use crate::core::storage::{ChangeScope, FileStorage, FileStorageChanged};
use crate::core::tree::{FilterAttribute, MoveDirection, Tree, TreeResult};
use crate::models::{ParamType, ProjectDataJson, SettingsJson, SuoDataJson};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// The collaborators the view model hands work to.
pub struct Services<'a> {
    pub settings: &'a EffectiveSettings,
    pub storage: &'a dyn FileStorage,
    pub backend: &'a dyn ProjectConfigBackend,
    pub properties: &'a dyn PropertyLookup,
}

impl std::fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

/// Tree plus everything the tool window keeps around it.
#[derive(Debug)]
pub struct TreeViewModel {
    tree: Tree,
    history: History<SuoDataJson>,
    show_all_projects: bool,
    focused_item: Option<NodeId>,
    /// Value of each node at the moment it entered edit mode.
    pre_edit_values: HashMap<NodeId, String>,
    project_infos: HashMap<NodeId, ProjectInfo>,
    solution_settings: Option<SettingsJson>,
    notifications: Vec<TreeNotification>,
    throttle: Option<DebouncerTable<ThrottledNotification, ThrottledNotification>>,
    startup_change: DelayedAction,
}

impl Default for TreeViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeViewModel {
    /// Creates a view model without debounced notifications.
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            history: History::default(),
            show_all_projects: false,
            focused_item: None,
            pre_edit_values: HashMap::new(),
            project_infos: HashMap::new(),
            solution_settings: None,
            notifications: Vec::new(),
            throttle: None,
            startup_change: DelayedAction::new(),
        }
    }

    /// Creates a view model that delivers debounced notifications on `sender`.
    ///
    /// Must be used from within a tokio runtime.
    pub fn with_throttle(sender: UnboundedSender<ThrottledNotification>) -> Self {
        Self {
            throttle: Some(DebouncerTable::new(DEBOUNCE_WINDOW, sender)),
            ..Self::new()
        }
    }

    // --- Accessors ---

    /// The tree behind the view.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Direct tree access. Call [`TreeViewModel::flush`] after mutating.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The undo history.
    pub fn history(&self) -> &History<SuoDataJson> {
        &self.history
    }

    /// Whether every project is listed, not only startup projects.
    pub fn show_all_projects(&self) -> bool {
        self.show_all_projects
    }

    /// The focused item, if it still exists.
    pub fn focused_item(&self) -> Option<NodeId> {
        self.focused_item.filter(|id| self.tree.contains(*id))
    }

    /// Host description of a loaded project.
    pub fn project_info(&self, project: NodeId) -> Option<&ProjectInfo> {
        self.project_infos.get(&project)
    }

    /// Whether some item is being edited.
    pub fn is_in_edit_mode(&self) -> bool {
        self.tree.editing_item().is_some()
    }

    /// Drains the immediate notifications produced since the last call.
    pub fn take_notifications(&mut self) -> Vec<TreeNotification> {
        std::mem::take(&mut self.notifications)
    }

    /// Solution settings carried along in snapshots and the state blob.
    pub fn set_solution_settings(&mut self, settings: Option<SettingsJson>) {
        self.solution_settings = settings;
    }

    /// The items shown at the top level of the tool window.
    ///
    /// With "show all projects" every project is listed, startup projects
    /// first, each part sorted by name ignoring case. Otherwise a single
    /// startup project shows its items directly and several are listed.
    pub fn tree_items(&self) -> Vec<NodeId> {
        let name_of = |id: &NodeId| self.tree.get(*id).map(|node| node.value().to_lowercase()).unwrap_or_default();

        if self.show_all_projects {
            let mut projects = self.tree.projects().to_vec();
            projects.sort_by_cached_key(|id| {
                let is_startup = self.tree.get(*id).is_some_and(Node::is_startup_project);
                (!is_startup, name_of(id))
            });
            return projects;
        }

        match self.tree.startup_projects().as_slice() {
            [single] => self.tree.children(*single).to_vec(),
            startup => startup.to_vec(),
        }
    }

    // --- Dispatch ---

    /// Dispatches every event that reached an attached project.
    ///
    /// Selection changes become notifications, will-change events take a
    /// snapshot, changes notify immediately and arm the debounced
    /// notifications of their project, and edit mode transitions bracket an
    /// undo step that is dropped again when the value didn't change.
    pub fn flush(&mut self) {
        for event in self.tree.take_events() {
            log::debug!("Dispatching {:?} from '{}' in project '{}'.", event.kind, event.sender, event.project);
            match event.kind.class() {
                EventClass::Selection => {
                    self.notifications
                        .push(TreeNotification::ItemSelectionChanged { item: event.sender });
                }
                EventClass::WillChange => self.save_state(),
                EventClass::TreeChanged => self.fire_tree_changed(event.sender, event.project),
                EventClass::ContentChanged => {
                    self.notifications.push(TreeNotification::TreeContentChanged {
                        source: event.sender,
                        project: event.project,
                    });
                    self.debounce(ThrottledNotification::TreeContentChanged(event.project));
                    self.fire_tree_changed(event.sender, event.project);
                }
                EventClass::EditMode => {
                    if let TreeEventKind::EditModeChanged { is_in_edit_mode } = event.kind {
                        self.on_edit_mode_changed(event.sender, is_in_edit_mode);
                    }
                }
            }
        }
    }

    fn fire_tree_changed(&mut self, source: NodeId, project: NodeId) {
        self.notifications
            .push(TreeNotification::TreeChanged { source, project });
        self.debounce(ThrottledNotification::TreeChanged(project));
    }

    fn debounce(&mut self, notification: ThrottledNotification) {
        if let Some(throttle) = &mut self.throttle {
            throttle.debounce(notification, notification);
        }
    }

    fn on_edit_mode_changed(&mut self, id: NodeId, is_in_edit_mode: bool) {
        let value = self.tree.get(id).map(|node| node.value().to_string());
        if is_in_edit_mode {
            if let Some(value) = value {
                self.pre_edit_values.insert(id, value);
            }
            self.save_state();
        } else if let Some(before) = self.pre_edit_values.remove(&id) {
            if value.as_deref() == Some(before.as_str()) {
                log::debug!("Edit of '{}' left the value unchanged, dropping its undo step.", id);
                self.history.delete_newest();
            }
        }
    }

    // --- History ---

    /// Snapshot of every attached project, UI bits included.
    pub fn suo_data(&self) -> SuoDataJson {
        build_suo_data(&self.tree, self.show_all_projects, self.solution_settings.clone())
    }

    /// Records the current state as an undo step.
    pub fn save_state(&mut self) {
        let tree = &self.tree;
        let show_all = self.show_all_projects;
        let settings = &self.solution_settings;
        self.history
            .save_state_with(|| build_suo_data(tree, show_all, settings.clone()));
    }

    /// Whether an undo step is available. Never while editing.
    pub fn can_undo(&self) -> bool {
        !self.is_in_edit_mode() && self.history.can_undo()
    }

    /// Whether a redo step is available. Never while editing.
    pub fn can_redo(&self) -> bool {
        !self.is_in_edit_mode() && self.history.can_redo()
    }

    /// Steps back one undo step. Returns whether a state was restored.
    pub fn undo(&mut self) -> TreeResult<bool> {
        if self.is_in_edit_mode() {
            return Ok(false);
        }
        let tree = &self.tree;
        let show_all = self.show_all_projects;
        let settings = &self.solution_settings;
        match self
            .history
            .restore_last_state(|| build_suo_data(tree, show_all, settings.clone()))
        {
            Some(state) => self.restore(&state).map(|()| true),
            None => Ok(false),
        }
    }

    /// Steps forward one undo step. Returns whether a state was restored.
    pub fn redo(&mut self) -> TreeResult<bool> {
        if self.is_in_edit_mode() {
            return Ok(false);
        }
        match self.history.restore_prev_state() {
            Some(state) => self.restore(&state).map(|()| true),
            None => Ok(false),
        }
    }

    /// Re-populates every attached project the snapshot knows about.
    fn restore(&mut self, state: &SuoDataJson) -> TreeResult<()> {
        let _pause = self.history.pause();
        self.show_all_projects = state.show_all_projects;
        let projects: Vec<NodeId> = self
            .tree
            .projects()
            .iter()
            .copied()
            .filter(|project| state.project_arguments.contains_key(project))
            .collect();

        // 1. Items may have moved between projects, so free every id before rebuilding.
        for project in &projects {
            self.tree.discard_children(*project);
        }

        // 2. Rebuild.
        for project in projects {
            if let Some(data) = state.project_arguments.get(&project) {
                repopulate_project(&mut self.tree, project, data)?;
            }
        }
        self.flush();
        Ok(())
    }

    // --- Projects ---

    /// Reconciles a (re)loaded project and records its host description.
    ///
    /// # Errors
    ///
    /// Only tree invariant violations are returned.
    pub fn load_project(
        &mut self,
        project: &ProjectInfo,
        suo: &SuoDataJson,
        services: &Services<'_>,
    ) -> TreeResult<ReconcileOutcome> {
        // Reloading over existing items is one undo step.
        if !self.tree.children(project.id).is_empty() || !self.history.is_empty() {
            self.save_state();
        }
        self.reconcile(project, suo, services)
    }

    /// Reconciles the projects whose JSON file changed on disk.
    ///
    /// Ignored without VCS support, or when the file isn't the one the
    /// `use_solution_dir` setting selects. A solution file change reloads
    /// every known project, a project file change only that project. Projects
    /// the host hasn't loaded (yet) are skipped.
    pub fn on_file_storage_changed(
        &mut self,
        change: &FileStorageChanged,
        suo: &SuoDataJson,
        services: &Services<'_>,
    ) -> TreeResult<()> {
        let settings = services.settings;
        if !settings.vcs_support_enabled {
            log::debug!("Ignoring {:?}: VCS support is disabled.", change);
            return Ok(());
        }

        let projects: Vec<ProjectInfo> = match change.scope {
            ChangeScope::Settings => {
                match services.storage.read_settings() {
                    Ok(settings) => self.solution_settings = settings,
                    Err(e) => log::warn!("Failed to reload the solution settings: {}", e),
                }
                return Ok(());
            }
            ChangeScope::Solution if settings.use_solution_dir => self
                .tree
                .projects()
                .iter()
                .filter_map(|id| self.project_infos.get(id))
                .cloned()
                .collect(),
            ChangeScope::Project(id) if !settings.use_solution_dir => self
                .project_infos
                .get(&id)
                .filter(|_| self.tree.is_attached(id))
                .cloned()
                .into_iter()
                .collect(),
            _ => {
                log::debug!("Ignoring {:?}: not the file in use.", change);
                return Ok(());
            }
        };
        if projects.is_empty() {
            log::info!("Ignoring {:?}: no loaded project matches.", change);
            return Ok(());
        }

        self.save_state();
        for project in &projects {
            self.reconcile(project, suo, services)?;
        }
        Ok(())
    }

    fn reconcile(
        &mut self,
        project: &ProjectInfo,
        suo: &SuoDataJson,
        services: &Services<'_>,
    ) -> TreeResult<ReconcileOutcome> {
        let _pause = self.history.pause();
        let sources = ReconcileSources {
            settings: services.settings,
            suo,
            storage: services.storage,
            backend: services.backend,
        };
        let outcome = reconcile_project(&mut self.tree, project, &sources)?;
        if outcome != ReconcileOutcome::Skipped {
            self.project_infos.insert(project.id, project.clone());
        }
        self.flush();
        Ok(outcome)
    }

    /// Detaches a project that the host unloaded.
    pub fn unload_project(&mut self, project: NodeId) {
        self.tree.remove_project(project);
        self.project_infos.remove(&project);
        if let Some(throttle) = &mut self.throttle {
            throttle.cancel(&ThrottledNotification::TreeChanged(project));
            throttle.cancel(&ThrottledNotification::TreeContentChanged(project));
        }
    }

    /// Updates the display name of a project after the host renamed it.
    pub fn rename_project(&mut self, project: &ProjectInfo) -> TreeResult<()> {
        if !self.tree.is_attached(project.id) {
            return Ok(());
        }
        self.tree.set_value(project.id, &project.name)?;
        self.project_infos.insert(project.id, project.clone());
        self.flush();
        Ok(())
    }

    /// Clears every project and the undo history (extension disabled or
    /// solution closed).
    pub fn reset(&mut self) {
        self.show_all_projects = false;
        self.focused_item = None;
        self.pre_edit_values.clear();
        self.project_infos.clear();
        self.tree.clear();
        self.history.clear();
        self.startup_change.cancel();
        if let Some(throttle) = &mut self.throttle {
            throttle.cancel_all();
        }
    }

    /// Lists every project instead of the startup projects. One undo step.
    pub fn set_show_all_projects(&mut self, value: bool) {
        if self.show_all_projects != value {
            self.save_state();
            self.show_all_projects = value;
        }
    }

    /// Marks exactly `projects` as startup projects.
    pub fn set_startup_projects(&mut self, projects: &[NodeId]) -> TreeResult<()> {
        for project in self.tree.projects().to_vec() {
            self.tree.set_startup_project(project, projects.contains(&project))?;
        }
        Ok(())
    }

    /// Reports `projects` on `sender` once the host's startup selection has
    /// settled. A later call supersedes a pending one.
    pub fn schedule_startup_projects(
        &mut self,
        projects: Vec<NodeId>,
        sender: UnboundedSender<Vec<NodeId>>,
    ) -> JoinHandle<()> {
        self.startup_change.schedule(STARTUP_SETTLE_DELAY, move || {
            if sender.send(projects).is_err() {
                log::debug!("Startup project change dropped: receiver is gone.");
            }
        })
    }

    /// Installs a search filter on every project. An empty string clears it.
    pub fn set_filter(&mut self, needle: &str, match_case: bool) -> TreeResult<()> {
        let filter = (!needle.is_empty()).then(|| ItemFilter {
            needle: needle.to_string(),
            match_case,
        });
        for project in self.tree.projects().to_vec() {
            self.tree.set_search_filter(project, filter.clone())?;
        }
        Ok(())
    }

    // --- Selection ---

    /// Selects only `id` and focuses it.
    pub fn select_item(&mut self, id: NodeId) -> TreeResult<()> {
        self.select_items(&[id])
    }

    /// Selects exactly `items`, focusing the first.
    pub fn select_items(&mut self, items: &[NodeId]) -> TreeResult<()> {
        for selected in self.tree.selected_items() {
            if !items.contains(&selected) {
                self.tree.set_selected(selected, false)?;
            }
        }
        for item in items {
            self.tree.set_selected(*item, true)?;
        }
        self.focused_item = items.first().copied();
        self.flush();
        Ok(())
    }

    /// Selected items without descendants of other selected items. Projects
    /// are replaced by their items when `expand_projects` is set, otherwise
    /// dropped.
    fn selected_roots(&self, expand_projects: bool) -> Vec<NodeId> {
        self.tree
            .selected_root_items()
            .into_iter()
            .flat_map(|id| match self.tree.get(id) {
                Some(node) if node.is_project() && expand_projects => node.items().to_vec(),
                Some(node) if node.is_project() => Vec::new(),
                _ => vec![id],
            })
            .collect()
    }

    fn selected_parameters(&self) -> Vec<NodeId> {
        self.tree
            .selected_items()
            .into_iter()
            .filter(|id| self.tree.get(*id).is_some_and(Node::is_parameter))
            .collect()
    }

    /// The first selected node, if it is the only one.
    fn single_selected(&self) -> Option<NodeId> {
        match self.tree.selected_items().as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    // --- Checking ---

    /// User check change: snapshot first, then apply and propagate.
    pub fn set_checked(&mut self, id: NodeId, checked: bool, exclusive_modifier: bool) -> TreeResult<()> {
        self.tree.announce_check_change(id)?;
        self.flush();
        self.tree.apply_check(id, CheckState::from(checked), exclusive_modifier)?;
        self.flush();
        Ok(())
    }

    /// Flips the check state of `id`. Indeterminate counts as checked.
    pub fn toggle_checked(&mut self, id: NodeId) -> TreeResult<()> {
        let target = self.tree.node(id)?.check().toggled();
        self.set_checked(id, target.is_checked(), false)
    }

    /// Checks every selected root item if all of them are unchecked,
    /// otherwise unchecks them all. One undo step.
    pub fn toggle_selected(&mut self) -> TreeResult<()> {
        let items = self.selected_roots(false);
        if items.is_empty() {
            return Ok(());
        }
        let check = items.iter().all(|id| self.tree.check_of(*id).is_unchecked());

        self.save_state();
        let _pause = self.history.pause();
        for item in items {
            self.tree.set_checked(item, check, false)?;
        }
        self.flush();
        Ok(())
    }

    /// Sets the selected parameters, and every parameter below selected
    /// containers, to their default check state. One undo step.
    pub fn reset_to_default_checked(&mut self) -> TreeResult<()> {
        let mut parameters: Vec<NodeId> = Vec::new();
        for id in self.tree.selected_items() {
            let candidates = match self.tree.get(id) {
                Some(node) if node.is_parameter() => vec![id],
                Some(_) => self.tree.parameters(id),
                None => Vec::new(),
            };
            for candidate in candidates {
                if !parameters.contains(&candidate) {
                    parameters.push(candidate);
                }
            }
        }

        self.save_state();
        let _pause = self.history.pause();
        for parameter in parameters {
            let default = self.tree.node(parameter)?.default_checked().unwrap_or(false);
            self.tree.set_checked(parameter, default, false)?;
        }
        self.flush();
        Ok(())
    }

    // --- Editing ---

    /// Enters edit mode on `id`, optionally replacing the value right away.
    pub fn begin_edit(&mut self, id: NodeId, initial_value: Option<&str>) -> TreeResult<()> {
        self.tree.begin_edit(id, None)?;
        self.flush();
        if let Some(value) = initial_value {
            self.tree.set_value(id, value)?;
            self.flush();
        }
        Ok(())
    }

    /// Changes the value of `id` outside of edit mode.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> TreeResult<()> {
        self.tree.set_value(id, value)?;
        self.flush();
        Ok(())
    }

    /// Leaves edit mode keeping the new value.
    pub fn commit_edit(&mut self, id: NodeId) -> TreeResult<()> {
        self.tree.commit_edit(id)?;
        self.flush();
        Ok(())
    }

    /// Leaves edit mode restoring the value from before the edit.
    pub fn cancel_edit(&mut self, id: NodeId) -> TreeResult<()> {
        self.tree.cancel_edit(id)?;
        self.flush();
        Ok(())
    }

    // --- Structure commands ---

    /// Where new items go: to the top of the focused container when it is a
    /// project or expanded, otherwise right after the focused item. Without a
    /// focus the first startup project is used.
    fn insertion_point(&self) -> Option<(NodeId, usize)> {
        let target = self
            .focused_item()
            .or_else(|| self.tree.startup_projects().first().copied())?;
        let node = self.tree.get(target)?;
        let opens = node.is_project() || node.container().is_some_and(|container| container.is_expanded);
        if opens {
            return Some((target, 0));
        }
        let parent = node.parent()?;
        let index = self.tree.index_of(parent, target)?;
        Some((parent, index + 1))
    }

    fn insert_and_select(&mut self, parent: NodeId, index: usize, items: Vec<NodeId>) -> TreeResult<()> {
        self.tree.set_expanded(parent, true)?;
        self.tree.insert_range(parent, index, items.clone())?;
        self.select_items(&items)
    }

    /// Adds a new, checked parameter at the focused item and selects it.
    ///
    /// Returns `None` when there is no place to put it.
    pub fn add_parameter(&mut self, param_type: ParamType, value: &str) -> TreeResult<Option<NodeId>> {
        let Some((parent, index)) = self.insertion_point() else {
            log::debug!("No container to add a parameter to.");
            return Ok(None);
        };
        self.save_state();
        let item = self.tree.create_parameter(param_type, value, true);
        self.insert_and_select(parent, index, vec![item])?;
        Ok(Some(item))
    }

    /// Adds a new group at the focused item and selects it.
    pub fn add_group(&mut self, name: &str) -> TreeResult<Option<NodeId>> {
        let Some((parent, index)) = self.insertion_point() else {
            log::debug!("No container to add a group to.");
            return Ok(None);
        };
        self.save_state();
        let group = self.tree.create_group(name);
        self.insert_and_select(parent, index, vec![group])?;
        Ok(Some(group))
    }

    /// Removes the selected items and selects the item that took the place of
    /// the first one.
    pub fn remove_selected(&mut self) -> TreeResult<()> {
        let items = self.selected_roots(false);
        let Some(first) = items.first().copied() else {
            return Ok(());
        };
        let anchor = self
            .tree
            .get(first)
            .and_then(Node::parent)
            .and_then(|parent| self.tree.index_of(parent, first).map(|index| (parent, index)));

        self.save_state();
        for item in items {
            self.tree.remove(item)?;
        }

        let next = anchor.and_then(|(parent, index)| {
            let siblings = self.tree.children(parent);
            siblings
                .get(index)
                .or_else(|| siblings.last())
                .copied()
                .or_else(|| Some(parent).filter(|p| self.tree.get(*p).is_some_and(|node| !node.is_project())))
        });
        match next {
            Some(next) => self.select_item(next)?,
            None => {
                self.focused_item = None;
                self.flush();
            }
        }
        Ok(())
    }

    /// Moves the selected items one slot in their containers.
    pub fn move_selected(&mut self, direction: MoveDirection) -> TreeResult<()> {
        if self.tree.selected_items().is_empty() {
            return Ok(());
        }
        self.save_state();
        for project in self.tree.projects().to_vec() {
            self.tree.move_selected_entries(project, direction)?;
        }
        self.flush();
        Ok(())
    }

    /// Replaces the single selected command line argument by one parameter
    /// per shell word.
    pub fn split_selected_argument(&mut self) -> TreeResult<Vec<NodeId>> {
        let Some(id) = self.single_selected() else {
            return Ok(Vec::new());
        };
        let node = self.tree.node(id)?;
        if node.param_type() != Some(ParamType::CmdArg) {
            return Ok(Vec::new());
        }
        let (Some(parent), Some(default_checked)) = (node.parent(), node.default_checked()) else {
            return Ok(Vec::new());
        };
        let checked = node.check().is_checked();
        let words = split_argument(node.value());
        let index = self.tree.index_of(parent, id).unwrap_or_default();

        self.save_state();
        let items: Vec<NodeId> = words
            .iter()
            .map(|word| {
                self.tree.create_parameter_with_id(
                    uuid::Uuid::new_v4(),
                    ParamType::CmdArg,
                    word,
                    checked,
                    default_checked,
                )
            })
            .collect();
        self.tree.insert_range(parent, index + 1, items.clone())?;
        self.tree.remove(id)?;
        self.select_items(&items)?;
        Ok(items)
    }

    /// Wraps the selected sibling items into a new group placed where the
    /// first of them was. Selected projects stand for their items.
    ///
    /// Returns `None` when nothing is selected or the items have different parents.
    pub fn group_selected(&mut self, name: &str) -> TreeResult<Option<NodeId>> {
        let items = self.selected_roots(true);
        let parents: Vec<Option<NodeId>> = items
            .iter()
            .map(|id| self.tree.get(*id).and_then(Node::parent))
            .collect();
        let Some(Some(parent)) = parents.first().copied() else {
            return Ok(None);
        };
        if parents.iter().any(|p| *p != Some(parent)) {
            log::debug!("Selected items have different parents, not grouping.");
            return Ok(None);
        }

        let mut ordered: Vec<(usize, NodeId)> = items
            .iter()
            .filter_map(|id| self.tree.index_of(parent, *id).map(|index| (index, *id)))
            .collect();
        ordered.sort_unstable();
        let Some(&(first_index, _)) = ordered.first() else {
            return Ok(None);
        };

        self.save_state();
        let group = self.tree.create_group(name);
        self.tree.insert(parent, first_index, group)?;
        let members: Vec<NodeId> = ordered.into_iter().map(|(_, id)| id).collect();
        for member in &members {
            self.tree.set_selected(*member, false)?;
        }
        self.tree.add_range(group, members)?;
        self.select_item(group)?;
        Ok(Some(group))
    }

    // --- Attribute commands ---

    /// Sets a config, platform or launch profile filter on a group.
    pub fn set_filter_attribute(&mut self, id: NodeId, attribute: FilterAttribute, value: Option<&str>) -> TreeResult<()> {
        self.save_state();
        self.tree.set_filter_attribute(id, attribute, value)?;
        self.flush();
        Ok(())
    }

    /// Flips exclusive mode of a container. One undo step.
    pub fn toggle_exclusive_mode(&mut self, id: NodeId) -> TreeResult<()> {
        let exclusive = self
            .tree
            .node(id)?
            .container()
            .is_some_and(|container| container.exclusive_mode);
        self.save_state();
        self.tree.set_exclusive_mode(id, !exclusive)?;
        self.flush();
        Ok(())
    }

    /// Sets the delimiter of a container. One undo step unless unchanged.
    pub fn set_delimiter(&mut self, id: NodeId, delimiter: &str) -> TreeResult<()> {
        let unchanged = self
            .tree
            .node(id)?
            .container()
            .is_some_and(|container| container.delimiter == delimiter);
        if unchanged {
            return Ok(());
        }
        self.save_state();
        self.tree.set_delimiter(id, delimiter)?;
        self.flush();
        Ok(())
    }

    /// Sets the prefix of a container. One undo step.
    pub fn set_prefix(&mut self, id: NodeId, prefix: &str) -> TreeResult<()> {
        self.save_state();
        self.tree.set_prefix(id, prefix)?;
        self.flush();
        Ok(())
    }

    /// Sets the postfix of a container. One undo step.
    pub fn set_postfix(&mut self, id: NodeId, postfix: &str) -> TreeResult<()> {
        self.save_state();
        self.tree.set_postfix(id, postfix)?;
        self.flush();
        Ok(())
    }

    /// Changes the type of every selected parameter.
    pub fn set_selected_param_type(&mut self, param_type: ParamType) -> TreeResult<()> {
        for id in self.selected_parameters() {
            self.tree.set_param_type(id, param_type)?;
        }
        self.flush();
        Ok(())
    }

    /// Clears the default check of every selected parameter if any has it,
    /// otherwise sets it on all of them.
    pub fn toggle_default_checked(&mut self) -> TreeResult<()> {
        let parameters = self.selected_parameters();
        let any_set = parameters
            .iter()
            .any(|id| self.tree.get(*id).and_then(Node::default_checked).unwrap_or(false));
        for id in parameters {
            self.tree.set_default_checked(id, !any_set)?;
        }
        self.flush();
        Ok(())
    }

    // --- Clipboard ---

    /// Payload for the selected items. Selected projects stand for their items.
    pub fn copy_selected(&self) -> Option<ClipboardPayload> {
        let items = self.selected_roots(true);
        (!items.is_empty()).then(|| clipboard::generate(&self.tree, &items, true))
    }

    /// Copies the selected non-project items, then removes them.
    pub fn cut_selected(&mut self) -> TreeResult<Option<ClipboardPayload>> {
        let items = self.selected_roots(false);
        if items.is_empty() {
            return Ok(None);
        }
        let payload = clipboard::generate(&self.tree, &items, true);
        self.remove_selected()?;
        Ok(Some(payload))
    }

    /// Pastes copies of the payload's items at the focused item and selects them.
    pub fn paste(&mut self, payload: &ClipboardPayload) -> TreeResult<Vec<NodeId>> {
        let Some((parent, index)) = self.insertion_point() else {
            return Ok(Vec::new());
        };
        let Some(items) = clipboard::extract(&mut self.tree, payload, false)? else {
            return Ok(Vec::new());
        };
        if items.is_empty() {
            return Ok(items);
        }
        self.save_state();
        self.insert_and_select(parent, index, items.clone())?;
        Ok(items)
    }

    /// Drops a payload at `index` of `parent`. Live nodes of the same tree are
    /// moved, anything else is inserted as copies. One undo step.
    pub fn drop_payload(&mut self, payload: &ClipboardPayload, parent: NodeId, index: usize) -> TreeResult<Vec<NodeId>> {
        let Some(mut items) = clipboard::extract(&mut self.tree, payload, true)? else {
            return Ok(Vec::new());
        };
        items.retain(|id| self.tree.get(*id).is_some_and(|node| !node.is_project()));
        if items.is_empty() {
            return Ok(items);
        }

        self.save_state();
        let _pause = self.history.pause();
        self.tree.insert_range(parent, index, items.clone())?;
        self.select_items(&items)?;
        Ok(items)
    }

    // --- Persistence driving ---

    /// Handles a debounced notification: content changes are written to the
    /// project's JSON file, any change refreshes the active flags and pushes
    /// the launch configuration.
    pub fn on_throttled(&mut self, notification: ThrottledNotification, services: &Services<'_>) {
        match notification {
            ThrottledNotification::TreeContentChanged(project) => self.save_project(project, services),
            ThrottledNotification::TreeChanged(project) => {
                update_is_active(&mut self.tree, services.settings, services.backend);
                update_configuration_for_project(
                    &self.tree,
                    project,
                    services.settings,
                    services.backend,
                    services.properties,
                );
            }
        }
    }

    fn all_project_data(&self) -> Vec<(ProjectInfo, ProjectDataJson)> {
        self.tree
            .projects()
            .iter()
            .filter_map(|id| {
                let info = self.project_infos.get(id)?;
                let data = project_to_data(&self.tree, *id).ok()?;
                Some((info.clone(), data))
            })
            .collect()
    }

    /// Writes one project's JSON file when VCS support is on. Failures are logged.
    pub fn save_project(&self, project: NodeId, services: &Services<'_>) {
        if !services.settings.vcs_support_enabled {
            return;
        }
        let Some(info) = self.project_infos.get(&project) else {
            log::debug!("Project '{}' has no host description, not saving.", project);
            return;
        };
        let data = match project_to_data(&self.tree, project) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to collect data of project '{}': {}", info.name, e);
                return;
            }
        };
        let all: Vec<ProjectDataJson> = self.all_project_data().into_iter().map(|(_, data)| data).collect();
        if let Err(e) = services.storage.save_project_data(info, &data, &all) {
            log::warn!("Failed to save project '{}': {}", info.name, e);
        }
    }

    /// Writes every project. Used when VCS support gets turned on.
    pub fn save_all_projects(&self, services: &Services<'_>) {
        if !services.settings.vcs_support_enabled {
            return;
        }
        if let Err(e) = services.storage.save_all_projects(&self.all_project_data()) {
            log::warn!("Failed to save projects: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregation::tests::FakeBackend;
    use crate::core::backend::NoProperties;
    use crate::core::reconcile::tests::{MemoryStorage, project_info};
    use crate::core::storage::ChangeKind;
    use crate::models::CmdItemJson;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Fixture {
        settings: EffectiveSettings,
        storage: MemoryStorage,
        backend: FakeBackend,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                settings: EffectiveSettings::default(),
                storage: MemoryStorage::default(),
                backend: FakeBackend::default(),
            }
        }

        fn services(&self) -> Services<'_> {
            Services {
                settings: &self.settings,
                storage: &self.storage,
                backend: &self.backend,
                properties: &NoProperties,
            }
        }
    }

    /// Loads project "App" with the given CmdArg parameters and makes it the
    /// only startup project.
    fn loaded(vm: &mut TreeViewModel, fixture: &Fixture, values: &[(&str, bool)]) -> (NodeId, Vec<NodeId>) {
        let info = project_info(Uuid::new_v4());
        let items: Vec<CmdItemJson> = values
            .iter()
            .map(|(value, checked)| CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, value, *checked))
            .collect();
        let ids = items.iter().map(|item| item.id).collect();
        let mut data = ProjectDataJson::empty_project(info.id);
        data.items = Some(items);
        let mut suo = SuoDataJson::default();
        suo.checked_arguments = data.all_parameters().iter().filter(|p| p.enabled).map(|p| p.id).collect();
        suo.project_arguments.insert(info.id, data);
        let mut settings = fixture.settings.clone();
        settings.vcs_support_enabled = false;
        let services = Services {
            settings: &settings,
            ..fixture.services()
        };
        vm.load_project(&info, &suo, &services).unwrap();
        vm.set_startup_projects(&[info.id]).unwrap();
        vm.take_notifications();
        (info.id, ids)
    }

    fn check(vm: &TreeViewModel, id: NodeId) -> CheckState {
        vm.tree().node(id).unwrap().check()
    }

    #[test]
    fn test_undo_and_redo_of_a_check_change() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (_, params) = loaded(&mut vm, &fixture, &[("a", false)]);

        // --- Execute ---
        vm.set_checked(params[0], true, false).unwrap();
        let after_check = check(&vm, params[0]);
        let undone = vm.undo().unwrap();
        let after_undo = check(&vm, params[0]);
        let redone = vm.redo().unwrap();

        // --- Assert ---
        assert_eq!(after_check, CheckState::Checked);
        assert!(undone && redone);
        assert_eq!(after_undo, CheckState::Unchecked);
        assert_eq!(check(&vm, params[0]), CheckState::Checked);
        assert!(!vm.can_redo());
    }

    #[test]
    fn test_unchanged_edit_leaves_no_undo_step() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (_, params) = loaded(&mut vm, &fixture, &[("a", false)]);
        let before = vm.history().len();

        // --- Execute ---
        vm.begin_edit(params[0], None).unwrap();
        let during = vm.history().len();
        vm.commit_edit(params[0]).unwrap();

        // --- Assert ---
        assert_eq!(during, before + 1);
        assert_eq!(vm.history().len(), before);
    }

    #[test]
    fn test_changed_edit_keeps_undo_step() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (_, params) = loaded(&mut vm, &fixture, &[("a", false)]);

        // --- Execute ---
        vm.begin_edit(params[0], Some("b")).unwrap();
        vm.commit_edit(params[0]).unwrap();
        vm.undo().unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().node(params[0]).unwrap().value(), "a");
    }

    #[test]
    fn test_events_become_notifications() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false)]);

        // --- Execute ---
        vm.select_item(params[0]).unwrap();
        vm.set_value(params[0], "b").unwrap();
        let notifications = vm.take_notifications();

        // --- Assert ---
        assert!(notifications.contains(&TreeNotification::ItemSelectionChanged { item: params[0] }));
        assert!(notifications.contains(&TreeNotification::TreeContentChanged {
            source: params[0],
            project
        }));
        assert!(notifications.contains(&TreeNotification::TreeChanged {
            source: params[0],
            project
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_burst_is_debounced_per_project() {
        // --- Setup ---
        let fixture = Fixture::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut vm = TreeViewModel::with_throttle(tx);
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false), ("b", false)]);
        tokio::time::sleep(Duration::from_millis(200)).await;
        while rx.try_recv().is_ok() {}

        // --- Execute ---
        vm.set_checked(params[0], true, false).unwrap();
        vm.set_checked(params[1], true, false).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // --- Assert ---
        assert_eq!(rx.try_recv().ok(), Some(ThrottledNotification::TreeChanged(project)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_add_parameter_at_focused_item() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false), ("b", false)]);

        // --- Execute ---
        let at_top = vm.add_parameter(ParamType::EnvVar, "X=1").unwrap().unwrap();
        vm.select_item(params[0]).unwrap();
        let after_a = vm.add_parameter(ParamType::CmdArg, "c").unwrap().unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(project), &[at_top, params[0], after_a, params[1]]);
        assert_eq!(check(&vm, after_a), CheckState::Checked);
        assert_eq!(vm.tree().selected_items(), vec![after_a]);
        assert_eq!(vm.tree_items(), vm.tree().children(project).to_vec());
    }

    #[test]
    fn test_remove_selected_selects_next_item() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false), ("b", false), ("c", false)]);
        vm.select_items(&[params[0], params[1]]).unwrap();

        // --- Execute ---
        vm.remove_selected().unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(project), &[params[2]]);
        assert_eq!(vm.tree().selected_items(), vec![params[2]]);
        assert!(vm.undo().unwrap());
        assert_eq!(vm.tree().children(project).len(), 3);
    }

    #[test]
    fn test_split_argument_into_words() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("-a \"b c\" d", true)]);
        vm.select_item(params[0]).unwrap();

        // --- Execute ---
        let items = vm.split_selected_argument().unwrap();

        // --- Assert ---
        let values: Vec<&str> = items.iter().map(|id| vm.tree().node(*id).unwrap().value()).collect();
        assert_eq!(values, vec!["-a", "\"b c\"", "d"]);
        assert_eq!(vm.tree().children(project), items.as_slice());
        assert!(items.iter().all(|id| check(&vm, *id).is_checked()));
    }

    #[test]
    fn test_group_selected_keeps_position_and_order() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false), ("b", true), ("c", true)]);
        vm.select_items(&[params[2], params[1]]).unwrap();

        // --- Execute ---
        let group = vm.group_selected("G").unwrap().unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(project), &[params[0], group]);
        assert_eq!(vm.tree().children(group), &[params[1], params[2]]);
        assert_eq!(check(&vm, group), CheckState::Checked);
        assert_eq!(vm.tree().selected_items(), vec![group]);
    }

    #[test]
    fn test_toggle_selected_is_one_undo_step() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (_, params) = loaded(&mut vm, &fixture, &[("a", false), ("b", false)]);
        vm.select_items(&params).unwrap();
        let before = vm.history().len();

        // --- Execute ---
        vm.toggle_selected().unwrap();

        // --- Assert ---
        assert!(params.iter().all(|id| check(&vm, *id).is_checked()));
        assert_eq!(vm.history().len(), before + 1);
    }

    #[test]
    fn test_reset_and_toggle_default_checked() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (_, params) = loaded(&mut vm, &fixture, &[("a", true), ("b", false)]);
        vm.select_item(params[1]).unwrap();
        vm.toggle_default_checked().unwrap();
        vm.select_items(&params).unwrap();

        // --- Execute ---
        vm.reset_to_default_checked().unwrap();

        // --- Assert ---
        assert_eq!(check(&vm, params[0]), CheckState::Unchecked);
        assert_eq!(check(&vm, params[1]), CheckState::Checked);
    }

    #[test]
    fn test_copy_and_paste_inserts_fresh_items() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", true), ("b", false)]);
        vm.select_item(params[0]).unwrap();
        let payload = vm.copy_selected().unwrap();

        // --- Execute ---
        let pasted = vm.paste(&payload).unwrap();

        // --- Assert ---
        assert_eq!(pasted.len(), 1);
        assert_eq!(vm.tree().children(project), &[params[0], pasted[0], params[1]]);
        assert_eq!(vm.tree().node(pasted[0]).unwrap().value(), "a");
        assert_eq!(vm.tree().selected_items(), pasted);
    }

    #[test]
    fn test_drop_moves_live_items() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false), ("b", false), ("c", false)]);
        vm.select_item(params[0]).unwrap();
        let payload = vm.copy_selected().unwrap();

        // --- Execute ---
        let moved = vm.drop_payload(&payload, project, 3).unwrap();

        // --- Assert ---
        assert_eq!(moved, vec![params[0]]);
        assert_eq!(vm.tree().children(project), &[params[1], params[2], params[0]]);
    }

    /// Puts a project file with the given CmdArg values into the store.
    fn write_json(fixture: &Fixture, project: NodeId, values: &[&str]) -> Vec<NodeId> {
        let items: Vec<CmdItemJson> = values
            .iter()
            .map(|value| CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, value, false))
            .collect();
        let ids = items.iter().map(|item| item.id).collect();
        let mut data = ProjectDataJson::empty_project(project);
        data.items = Some(items);
        fixture.storage.files.borrow_mut().insert(project, data);
        ids
    }

    #[test]
    fn test_reload_of_project_can_be_undone() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", true)]);
        let from_file = write_json(&fixture, project, &["x"]);

        // --- Execute ---
        let outcome = vm
            .load_project(&project_info(project), &SuoDataJson::default(), &fixture.services())
            .unwrap();
        let after_reload = vm.tree().children(project).to_vec();
        let undone = vm.undo().unwrap();

        // --- Assert ---
        assert_eq!(outcome, ReconcileOutcome::JsonFile);
        assert_eq!(after_reload, from_file);
        assert!(undone);
        assert_eq!(vm.tree().children(project), params.as_slice());
        assert_eq!(check(&vm, params[0]), CheckState::Checked);
    }

    #[test]
    fn test_project_file_change_reloads_only_that_project() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (changed, _) = loaded(&mut vm, &fixture, &[("a", false)]);
        let (other, other_params) = loaded(&mut vm, &fixture, &[("b", false)]);
        let from_file = write_json(&fixture, changed, &["x", "y"]);
        write_json(&fixture, other, &["z"]);
        let change = FileStorageChanged {
            scope: ChangeScope::Project(changed),
            kind: ChangeKind::Modified,
        };

        // --- Execute ---
        vm.on_file_storage_changed(&change, &SuoDataJson::default(), &fixture.services())
            .unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(changed), from_file.as_slice());
        assert_eq!(vm.tree().children(other), other_params.as_slice());
        assert!(vm.can_undo());
    }

    #[test]
    fn test_solution_file_change_reloads_every_project() {
        // --- Setup ---
        let mut fixture = Fixture::new();
        fixture.settings.use_solution_dir = true;
        let mut vm = TreeViewModel::new();
        let (first, _) = loaded(&mut vm, &fixture, &[("a", false)]);
        let (second, _) = loaded(&mut vm, &fixture, &[("b", false)]);
        let first_file = write_json(&fixture, first, &["x"]);
        let second_file = write_json(&fixture, second, &["y"]);
        let change = FileStorageChanged {
            scope: ChangeScope::Solution,
            kind: ChangeKind::Modified,
        };

        // --- Execute ---
        vm.on_file_storage_changed(&change, &SuoDataJson::default(), &fixture.services())
            .unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(first), first_file.as_slice());
        assert_eq!(vm.tree().children(second), second_file.as_slice());
        assert_eq!(vm.history().len(), 1);
    }

    #[test]
    fn test_file_change_for_file_not_in_use_is_ignored() {
        // --- Setup ---
        let mut fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false)]);
        write_json(&fixture, project, &["x"]);
        let solution_change = FileStorageChanged {
            scope: ChangeScope::Solution,
            kind: ChangeKind::Modified,
        };
        let project_change = FileStorageChanged {
            scope: ChangeScope::Project(project),
            kind: ChangeKind::Modified,
        };

        // --- Execute ---
        vm.on_file_storage_changed(&solution_change, &SuoDataJson::default(), &fixture.services())
            .unwrap();
        fixture.settings.use_solution_dir = true;
        vm.on_file_storage_changed(&project_change, &SuoDataJson::default(), &fixture.services())
            .unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(project), params.as_slice());
        assert!(vm.history().is_empty());
    }

    #[test]
    fn test_file_change_without_vcs_support_is_ignored() {
        // --- Setup ---
        let mut fixture = Fixture::new();
        fixture.settings.vcs_support_enabled = false;
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false)]);
        write_json(&fixture, project, &["x"]);
        let change = FileStorageChanged {
            scope: ChangeScope::Project(project),
            kind: ChangeKind::Created,
        };

        // --- Execute ---
        vm.on_file_storage_changed(&change, &SuoDataJson::default(), &fixture.services())
            .unwrap();

        // --- Assert ---
        assert_eq!(vm.tree().children(project), params.as_slice());
        assert!(vm.history().is_empty());
    }

    #[test]
    fn test_file_change_for_unknown_project_is_ignored() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", false)]);
        let unknown = Uuid::new_v4();
        write_json(&fixture, unknown, &["x"]);
        let change = FileStorageChanged {
            scope: ChangeScope::Project(unknown),
            kind: ChangeKind::Modified,
        };

        // --- Execute ---
        let result = vm.on_file_storage_changed(&change, &SuoDataJson::default(), &fixture.services());

        // --- Assert ---
        assert!(result.is_ok());
        assert!(!vm.tree().contains(unknown));
        assert_eq!(vm.tree().children(project), params.as_slice());
        assert!(vm.history().is_empty());
    }

    #[test]
    fn test_undo_of_drop_into_other_project_keeps_ids() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (first, first_params) = loaded(&mut vm, &fixture, &[("a", true)]);
        let (second, second_params) = loaded(&mut vm, &fixture, &[("b", false)]);
        vm.select_item(first_params[0]).unwrap();
        let payload = vm.copy_selected().unwrap();
        vm.drop_payload(&payload, second, 0).unwrap();
        let after_drop = vm.tree().children(second).to_vec();

        // --- Execute ---
        let undone = vm.undo().unwrap();

        // --- Assert ---
        assert!(undone);
        assert_eq!(after_drop, vec![first_params[0], second_params[0]]);
        assert_eq!(vm.tree().children(first), first_params.as_slice());
        assert_eq!(vm.tree().children(second), second_params.as_slice());
        assert_eq!(check(&vm, first_params[0]), CheckState::Checked);
        assert_eq!(vm.tree().node(first_params[0]).unwrap().parent(), Some(first));
    }

    #[test]
    fn test_tree_items_with_all_projects() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (first, _) = loaded(&mut vm, &fixture, &[]);
        let (second, _) = loaded(&mut vm, &fixture, &[]);
        vm.rename_project(&ProjectInfo {
            name: "beta".into(),
            ..project_info(first)
        })
        .unwrap();
        vm.rename_project(&ProjectInfo {
            name: "Alpha".into(),
            ..project_info(second)
        })
        .unwrap();
        vm.set_startup_projects(&[first]).unwrap();

        // --- Execute ---
        vm.set_show_all_projects(true);
        let all = vm.tree_items();
        vm.set_startup_projects(&[first, second]).unwrap();
        vm.set_show_all_projects(false);
        let startup = vm.tree_items();

        // --- Assert ---
        assert_eq!(all, vec![first, second], "Startup project comes first");
        assert_eq!(startup.len(), 2);
    }

    #[test]
    fn test_content_change_saves_and_pushes_config() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (project, params) = loaded(&mut vm, &fixture, &[("a", true)]);
        vm.set_value(params[0], "b").unwrap();

        // --- Execute ---
        vm.on_throttled(ThrottledNotification::TreeContentChanged(project), &fixture.services());
        vm.on_throttled(ThrottledNotification::TreeChanged(project), &fixture.services());

        // --- Assert ---
        let saved = fixture.storage.files.borrow().get(&project).cloned().unwrap();
        assert_eq!(saved.children()[0].command.as_deref(), Some("b"));
        let pushed = fixture.backend.pushed.borrow();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].1.command_line.as_deref(), Some("b"));
    }

    #[test]
    fn test_reset_clears_projects_and_history() {
        // --- Setup ---
        let fixture = Fixture::new();
        let mut vm = TreeViewModel::new();
        let (_, params) = loaded(&mut vm, &fixture, &[("a", false)]);
        vm.set_checked(params[0], true, false).unwrap();

        // --- Execute ---
        vm.reset();

        // --- Assert ---
        assert!(vm.tree().projects().is_empty());
        assert!(vm.history().is_empty());
        assert!(!vm.can_undo());
    }
}
