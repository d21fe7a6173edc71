// src/core/tree/mod.rs

//! The argument tree: an arena of nodes addressed by stable id.
//!
//! Every mutator updates local state, then bubbles a typed [`TreeEvent`] up the
//! parent links. Events reaching an attached project are queued in an outbox
//! that the owner drains with [`Tree::take_events`]; events from nodes that no
//! attached project owns are dropped.

mod checking;
mod structure;

pub use structure::MoveDirection;

use crate::core::events::{TreeEvent, TreeEventKind};
use crate::core::node::{CheckState, ContainerData, ItemFilter, Node, NodeId, NodeKind};
use crate::models::ParamType;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Represents invalid operations on the tree. These point at caller bugs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The id is not part of the arena.
    #[error("Node '{id}' not found in tree.")]
    NodeNotFound {
        /// The missing id.
        id: NodeId,
    },
    /// An edit operation was attempted on a project node.
    #[error("Can't execute edit operation on the not editable item '{id}'.")]
    NotEditable {
        /// The project id.
        id: NodeId,
    },
    /// A container operation was attempted on a parameter.
    #[error("Node '{id}' is not a container.")]
    NotAContainer {
        /// The parameter id.
        id: NodeId,
    },
    /// Projects can't be copied.
    #[error("Can't copy the project '{id}'.")]
    CannotCopyProject {
        /// The project id.
        id: NodeId,
    },
    /// Projects are roots and can't be inserted into a container.
    #[error("Can't insert the project '{id}' into another container.")]
    CannotNestProject {
        /// The project id.
        id: NodeId,
    },
    /// Inserting the node would make it its own ancestor.
    #[error("Inserting '{id}' into '{parent}' would create a cycle.")]
    WouldCreateCycle {
        /// The node being inserted.
        id: NodeId,
        /// The target container.
        parent: NodeId,
    },
    /// The index lies past the end of the child list.
    #[error("Index {index} is out of range for '{parent}' with {len} items.")]
    IndexOutOfRange {
        /// The container.
        parent: NodeId,
        /// The requested index.
        index: usize,
        /// The current number of children.
        len: usize,
    },
    /// The attribute doesn't exist on this kind of node.
    #[error("Attribute '{attribute}' is not supported on node '{id}'.")]
    UnsupportedAttribute {
        /// The node id.
        id: NodeId,
        /// Name of the attribute.
        attribute: &'static str,
    },
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Which inherited filter to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAttribute {
    ProjectConfig,
    ProjectPlatform,
    LaunchProfile,
}

/// Arena of nodes plus the list of projects attached to the view.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    projects: Vec<NodeId>,
    events: Vec<TreeEvent>,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Queries ---

    /// Looks up a node, attached or not.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Like [`Tree::get`] but failing with [`TreeError::NodeNotFound`].
    pub fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound { id })
    }

    fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound { id })
    }

    /// Whether `id` is part of the arena.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attached projects, in attach order.
    pub fn projects(&self) -> &[NodeId] {
        &self.projects
    }

    /// Whether `project` is attached and so raises events.
    pub fn is_attached(&self, project: NodeId) -> bool {
        self.projects.contains(&project)
    }

    /// Children of a container, empty for parameters and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::items).unwrap_or_default()
    }

    /// Position of `child` among the children of `parent`.
    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|item| *item == child)
    }

    /// The nearest project ancestor (or `id` itself), attached or not.
    pub fn project_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            let node = self.get(current)?;
            if node.is_project() {
                return Some(current);
            }
            current = node.parent?;
        }
        None
    }

    /// Pre-order list of every node below `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    /// Pre-order list of the parameters below `id`.
    pub fn parameters(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|item| self.get(*item).is_some_and(Node::is_parameter))
            .collect()
    }

    /// Checked parameters below `id`.
    pub fn checked_parameters(&self, id: NodeId) -> Vec<NodeId> {
        self.parameters(id)
            .into_iter()
            .filter(|item| self.check_of(*item).is_checked())
            .collect()
    }

    /// Every selected node of every attached project, projects included.
    pub fn selected_items(&self) -> Vec<NodeId> {
        self.projects
            .iter()
            .flat_map(|project| std::iter::once(*project).chain(self.descendants(*project)))
            .filter(|item| self.get(*item).is_some_and(Node::is_selected))
            .collect()
    }

    /// Selected nodes whose parent is not selected as well.
    pub fn selected_root_items(&self) -> Vec<NodeId> {
        let selected = self.selected_items();
        selected
            .iter()
            .copied()
            .filter(|item| {
                self.get(*item)
                    .and_then(Node::parent)
                    .is_none_or(|parent| !selected.contains(&parent))
            })
            .collect()
    }

    /// Attached projects flagged as startup projects, in attach order.
    pub fn startup_projects(&self) -> Vec<NodeId> {
        self.projects
            .iter()
            .copied()
            .filter(|project| self.get(*project).is_some_and(Node::is_startup_project))
            .collect()
    }

    pub(crate) fn check_of(&self, id: NodeId) -> CheckState {
        self.get(id).map(Node::check).unwrap_or_default()
    }

    /// Whether the node's parent is a container in exclusive mode.
    pub fn is_in_exclusive_container(&self, id: NodeId) -> bool {
        self.get(id)
            .and_then(Node::parent)
            .and_then(|parent| self.get(parent))
            .and_then(Node::container)
            .is_some_and(|container| container.exclusive_mode)
    }

    /// The node's own filter value or the nearest ancestor's.
    pub fn used_filter(&self, id: NodeId, attribute: FilterAttribute) -> Option<&str> {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            let node = self.get(current)?;
            let own = match attribute {
                FilterAttribute::ProjectConfig => node.project_config(),
                FilterAttribute::ProjectPlatform => node.project_platform(),
                FilterAttribute::LaunchProfile => node.launch_profile(),
            };
            if own.is_some() {
                return own;
            }
            current = node.parent?;
        }
        None
    }

    /// Configuration filter of `id` or of its closest ancestor that sets one.
    pub fn used_project_config(&self, id: NodeId) -> Option<&str> {
        self.used_filter(id, FilterAttribute::ProjectConfig)
    }

    /// Platform filter of `id` or of its closest ancestor that sets one.
    pub fn used_project_platform(&self, id: NodeId) -> Option<&str> {
        self.used_filter(id, FilterAttribute::ProjectPlatform)
    }

    /// Launch profile filter of `id` or of its closest ancestor that sets one.
    pub fn used_launch_profile(&self, id: NodeId) -> Option<&str> {
        self.used_filter(id, FilterAttribute::LaunchProfile)
    }

    /// Whether the node passes its project's search filter.
    /// Containers are visible when any descendant is.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let filter = self
            .project_of(id)
            .and_then(|project| self.get(project))
            .and_then(|project| match &project.kind {
                NodeKind::Project { filter, .. } => filter.as_ref(),
                _ => None,
            });
        match filter {
            None => true,
            Some(filter) => self.matches_filter(id, filter),
        }
    }

    fn matches_filter(&self, id: NodeId, filter: &ItemFilter) -> bool {
        match self.get(id) {
            Some(node) if node.is_project() => true,
            Some(node) if node.is_parameter() => filter.matches(node.value()),
            Some(node) => node
                .items()
                .iter()
                .any(|child| self.matches_filter(*child, filter)),
            None => false,
        }
    }

    /// Node currently in edit mode, if any.
    pub fn editing_item(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.is_in_edit_mode())
            .map(Node::id)
    }

    // --- Event outbox ---

    /// Drains the events that reached an attached project since the last call.
    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queues `kind` for the attached project that owns `receiver`.
    fn bubble_to(&mut self, sender: NodeId, receiver: NodeId, kind: TreeEventKind) {
        match self.project_of(receiver) {
            Some(project) if self.is_attached(project) => {
                self.events.push(TreeEvent {
                    sender,
                    project,
                    kind,
                });
            }
            _ => log::trace!("Dropping {:?} from detached node '{}'.", kind, sender),
        }
    }

    fn bubble(&mut self, sender: NodeId, kind: TreeEventKind) {
        self.bubble_to(sender, sender, kind);
    }

    // --- Creation ---

    /// Creates a detached parameter with a fresh id.
    pub fn create_parameter(&mut self, param_type: ParamType, value: &str, checked: bool) -> NodeId {
        self.create_parameter_with_id(Uuid::new_v4(), param_type, value, checked, false)
    }

    /// Creates a detached parameter with the given identity.
    pub fn create_parameter_with_id(
        &mut self,
        id: NodeId,
        param_type: ParamType,
        value: &str,
        checked: bool,
        default_checked: bool,
    ) -> NodeId {
        let mut node = Node::new(
            id,
            value.to_string(),
            NodeKind::Parameter {
                param_type,
                default_checked,
                is_active: false,
            },
        );
        node.check = checked.into();
        self.nodes.insert(id, node);
        id
    }

    /// Creates a detached, expanded, empty group with a fresh id.
    pub fn create_group(&mut self, name: &str) -> NodeId {
        let attributes = ContainerData {
            is_expanded: true,
            ..ContainerData::default()
        };
        self.create_group_with_id(Uuid::new_v4(), name, attributes)
    }

    /// Creates a detached group. Any ids in `attributes.items` are ignored.
    pub fn create_group_with_id(&mut self, id: NodeId, name: &str, attributes: ContainerData) -> NodeId {
        let container = ContainerData {
            items: Vec::new(),
            ..attributes
        };
        self.nodes
            .insert(id, Node::new(id, name.to_string(), NodeKind::Group { container }));
        id
    }

    /// Creates a detached project root, replacing a previous project with the same id.
    ///
    /// The replaced project's subtree is discarded; its startup flag carries over.
    pub fn create_project(&mut self, id: NodeId, kind: Uuid, name: &str, attributes: ContainerData) -> NodeId {
        let was_startup = self.get(id).is_some_and(Node::is_startup_project);
        if self.contains(id) {
            log::debug!("Replacing project '{}' ({}).", name, id);
            self.projects.retain(|project| *project != id);
            self.purge(id);
        }
        let container = ContainerData {
            items: Vec::new(),
            ..attributes
        };
        let node = Node::new(
            id,
            name.to_string(),
            NodeKind::Project {
                container,
                kind,
                is_startup: was_startup,
                filter: None,
            },
        );
        self.nodes.insert(id, node);
        id
    }

    /// Attaches a project to the view. From now on its events reach the outbox.
    pub fn attach_project(&mut self, id: NodeId) -> TreeResult<()> {
        if !self.node(id)?.is_project() {
            return Err(TreeError::UnsupportedAttribute {
                id,
                attribute: "attach",
            });
        }
        if !self.is_attached(id) {
            self.projects.push(id);
        }
        Ok(())
    }

    /// Detaches a project and discards its nodes. Returns whether it existed.
    pub fn remove_project(&mut self, id: NodeId) -> bool {
        let existed = self.get(id).is_some_and(Node::is_project);
        if existed {
            self.projects.retain(|project| *project != id);
            self.purge(id);
        }
        existed
    }

    /// Drops every node and project.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.projects.clear();
        self.events.clear();
    }

    /// Drops every child of `parent` without events, ahead of a repopulation
    /// that reuses their ids.
    pub(crate) fn discard_children(&mut self, parent: NodeId) {
        let children = self
            .nodes
            .get_mut(&parent)
            .and_then(Node::container_mut)
            .map(|container| std::mem::take(&mut container.items))
            .unwrap_or_default();
        for child in children {
            self.purge(child);
        }
    }

    /// Removes `id` and its whole subtree from the arena, without events.
    fn purge(&mut self, id: NodeId) {
        for item in self.descendants(id) {
            self.nodes.remove(&item);
        }
        self.nodes.remove(&id);
    }

    // --- Attributes ---

    /// Changes the node's value. No event when the value is unchanged.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        if node.value == value {
            return Ok(());
        }
        let old = std::mem::replace(&mut node.value, value.to_string());
        self.bubble(
            id,
            TreeEventKind::ValueChanged {
                old,
                new: value.to_string(),
            },
        );
        Ok(())
    }

    /// Selects or deselects a node. No event when nothing changes.
    pub fn set_selected(&mut self, id: NodeId, is_selected: bool) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        if node.is_selected == is_selected {
            return Ok(());
        }
        node.is_selected = is_selected;
        self.bubble(id, TreeEventKind::SelectionChanged { is_selected });
        Ok(())
    }

    /// Sets the selection on every descendant. Returns `true` if anything changed.
    pub fn set_selected_on_children(&mut self, id: NodeId, is_selected: bool) -> TreeResult<bool> {
        let mut changed = false;
        for item in self.descendants(id) {
            if self.get(item).is_some_and(|node| node.is_selected != is_selected) {
                self.set_selected(item, is_selected)?;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Expands or collapses a container. Collapsing deselects the children.
    pub fn set_expanded(&mut self, id: NodeId, is_expanded: bool) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        let editing = node.is_in_edit_mode();
        let container = node.container_mut().ok_or(TreeError::NotAContainer { id })?;
        container.is_expanded = is_expanded;
        if editing {
            self.commit_edit(id)?;
        }
        if !is_expanded {
            self.set_selected_on_children(id, false)?;
        }
        Ok(())
    }

    /// Sets the string joining the items of a container.
    pub fn set_delimiter(&mut self, id: NodeId, delimiter: &str) -> TreeResult<()> {
        let container = self.container_mut(id)?;
        if container.delimiter == delimiter {
            return Ok(());
        }
        let old = std::mem::replace(&mut container.delimiter, delimiter.to_string());
        self.bubble(
            id,
            TreeEventKind::DelimiterChanged {
                old,
                new: delimiter.to_string(),
            },
        );
        Ok(())
    }

    /// Sets the text put in front of a container's joined items.
    pub fn set_prefix(&mut self, id: NodeId, prefix: &str) -> TreeResult<()> {
        let container = self.container_mut(id)?;
        if container.prefix == prefix {
            return Ok(());
        }
        let old = std::mem::replace(&mut container.prefix, prefix.to_string());
        self.bubble(
            id,
            TreeEventKind::PrefixChanged {
                old,
                new: prefix.to_string(),
            },
        );
        Ok(())
    }

    /// Sets the text put after a container's joined items.
    pub fn set_postfix(&mut self, id: NodeId, postfix: &str) -> TreeResult<()> {
        let container = self.container_mut(id)?;
        if container.postfix == postfix {
            return Ok(());
        }
        let old = std::mem::replace(&mut container.postfix, postfix.to_string());
        self.bubble(
            id,
            TreeEventKind::PostfixChanged {
                old,
                new: postfix.to_string(),
            },
        );
        Ok(())
    }

    fn container_mut(&mut self, id: NodeId) -> TreeResult<&mut ContainerData> {
        self.node_mut(id)?
            .container_mut()
            .ok_or(TreeError::NotAContainer { id })
    }

    /// Sets one of the config/platform/profile filters. Only groups carry them.
    pub fn set_filter_attribute(
        &mut self,
        id: NodeId,
        attribute: FilterAttribute,
        value: Option<&str>,
    ) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        if !node.is_group() {
            return Err(TreeError::UnsupportedAttribute {
                id,
                attribute: match attribute {
                    FilterAttribute::ProjectConfig => "project config",
                    FilterAttribute::ProjectPlatform => "project platform",
                    FilterAttribute::LaunchProfile => "launch profile",
                },
            });
        }
        let slot = match attribute {
            FilterAttribute::ProjectConfig => &mut node.project_config,
            FilterAttribute::ProjectPlatform => &mut node.project_platform,
            FilterAttribute::LaunchProfile => &mut node.launch_profile,
        };
        let new = value.map(str::to_string);
        if *slot == new {
            return Ok(());
        }
        let old = std::mem::replace(slot, new.clone());
        let kind = match attribute {
            FilterAttribute::ProjectConfig => TreeEventKind::ProjectConfigChanged { old, new },
            FilterAttribute::ProjectPlatform => TreeEventKind::ProjectPlatformChanged { old, new },
            FilterAttribute::LaunchProfile => TreeEventKind::LaunchProfileChanged { old, new },
        };
        self.bubble(id, kind);
        Ok(())
    }

    /// Marks a parameter as checked by default.
    pub fn set_default_checked(&mut self, id: NodeId, value: bool) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        let NodeKind::Parameter {
            default_checked, ..
        } = &mut node.kind
        else {
            return Err(TreeError::UnsupportedAttribute {
                id,
                attribute: "default checked",
            });
        };
        if *default_checked == value {
            return Ok(());
        }
        let old = std::mem::replace(default_checked, value);
        self.bubble(id, TreeEventKind::DefaultCheckedChanged { old, new: value });
        Ok(())
    }

    /// Changes what a parameter contributes to the launch configuration.
    pub fn set_param_type(&mut self, id: NodeId, value: ParamType) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        let NodeKind::Parameter { param_type, .. } = &mut node.kind else {
            return Err(TreeError::UnsupportedAttribute {
                id,
                attribute: "parameter type",
            });
        };
        if *param_type == value {
            return Ok(());
        }
        let old = std::mem::replace(param_type, value);
        self.bubble(id, TreeEventKind::ParamTypeChanged { old, new: value });
        Ok(())
    }

    /// Written back by aggregation. Not an event: it is derived state.
    pub fn set_active(&mut self, id: NodeId, value: bool) {
        if let Some(Node {
            kind: NodeKind::Parameter { is_active, .. },
            ..
        }) = self.nodes.get_mut(&id)
        {
            *is_active = value;
        }
    }

    /// Flags a project as startup project.
    pub fn set_startup_project(&mut self, id: NodeId, value: bool) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        let NodeKind::Project { is_startup, .. } = &mut node.kind else {
            return Err(TreeError::UnsupportedAttribute {
                id,
                attribute: "startup project",
            });
        };
        *is_startup = value;
        Ok(())
    }

    /// Installs (or clears) the project's search filter.
    pub fn set_search_filter(&mut self, project: NodeId, value: Option<ItemFilter>) -> TreeResult<()> {
        let node = self.node_mut(project)?;
        let NodeKind::Project { filter, .. } = &mut node.kind else {
            return Err(TreeError::UnsupportedAttribute {
                id: project,
                attribute: "search filter",
            });
        };
        *filter = value;
        Ok(())
    }

    // --- Edit mode ---

    fn editable_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        let node = self.node_mut(id)?;
        if !node.is_editable() {
            return Err(TreeError::NotEditable { id });
        }
        Ok(node)
    }

    /// Enters edit mode, saving the current value for [`Tree::cancel_edit`].
    /// Does nothing if the node is already being edited.
    pub fn begin_edit(&mut self, id: NodeId, initial_value: Option<&str>) -> TreeResult<()> {
        let node = self.editable_mut(id)?;
        if node.is_in_edit_mode() {
            return Ok(());
        }
        node.edit_backup = Some(node.value.clone());
        self.bubble(
            id,
            TreeEventKind::EditModeChanged {
                is_in_edit_mode: true,
            },
        );
        if let Some(value) = initial_value {
            self.set_value(id, value)?;
        }
        Ok(())
    }

    /// Leaves edit mode restoring the value saved by [`Tree::begin_edit`].
    pub fn cancel_edit(&mut self, id: NodeId) -> TreeResult<()> {
        let node = self.editable_mut(id)?;
        let Some(backup) = node.edit_backup.take() else {
            return Ok(());
        };
        self.set_value(id, &backup)?;
        self.bubble(
            id,
            TreeEventKind::EditModeChanged {
                is_in_edit_mode: false,
            },
        );
        Ok(())
    }

    /// Leaves edit mode keeping the live value.
    pub fn commit_edit(&mut self, id: NodeId) -> TreeResult<()> {
        let node = self.editable_mut(id)?;
        if node.edit_backup.take().is_none() {
            return Ok(());
        }
        self.bubble(
            id,
            TreeEventKind::EditModeChanged {
                is_in_edit_mode: false,
            },
        );
        Ok(())
    }

    // --- Copy ---

    /// Deep-copies a group or parameter into a detached node with fresh ids.
    pub fn copy(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let node = self.node(id)?.clone();
        match node.kind {
            NodeKind::Project { .. } => Err(TreeError::CannotCopyProject { id }),
            NodeKind::Parameter {
                param_type,
                default_checked,
                ..
            } => Ok(self.create_parameter_with_id(
                Uuid::new_v4(),
                param_type,
                &node.value,
                node.check.is_checked(),
                default_checked,
            )),
            NodeKind::Group { container } => {
                let copy = self.create_group_with_id(Uuid::new_v4(), &node.value, container.clone());
                if let Some(copied) = self.nodes.get_mut(&copy) {
                    copied.project_config = node.project_config.clone();
                    copied.project_platform = node.project_platform.clone();
                    copied.launch_profile = node.launch_profile.clone();
                }
                let children = container
                    .items
                    .iter()
                    .map(|child| self.copy(*child))
                    .collect::<TreeResult<Vec<_>>>()?;
                self.add_range(copy, children)?;
                Ok(copy)
            }
        }
    }
}
