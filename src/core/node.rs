// src/core/node.rs

use crate::constants::DEFAULT_DELIMITER;
use crate::models::ParamType;
use std::fmt;
use uuid::Uuid;

/// Stable identity of a tree node. Project nodes reuse their project GUID.
pub type NodeId = Uuid;

/// Tri-state checkbox value.
///
/// `Indeterminate` only ever appears on containers and means "mixed children".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    Checked,
    Indeterminate,
}

impl CheckState {
    /// `true` only for `Checked`.
    pub fn is_checked(self) -> bool {
        self == Self::Checked
    }

    /// `true` only for `Unchecked`.
    pub fn is_unchecked(self) -> bool {
        self == Self::Unchecked
    }

    /// `Some(bool)` for a definite state, `None` for indeterminate.
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Checked => Some(true),
            Self::Unchecked => Some(false),
            Self::Indeterminate => None,
        }
    }

    /// The value a toggle leads to: indeterminate toggles to unchecked.
    pub fn toggled(self) -> Self {
        match self {
            Self::Unchecked => Self::Checked,
            Self::Checked | Self::Indeterminate => Self::Unchecked,
        }
    }

    /// Derives a container state from its children's states.
    pub fn from_children<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut any_checked = false;
        let mut any_unchecked = false;
        for state in children {
            match state {
                Self::Checked => any_checked = true,
                Self::Unchecked => any_unchecked = true,
                Self::Indeterminate => return Self::Indeterminate,
            }
            if any_checked && any_unchecked {
                return Self::Indeterminate;
            }
        }
        if any_checked {
            Self::Checked
        } else {
            Self::Unchecked
        }
    }
}

impl From<bool> for CheckState {
    fn from(value: bool) -> Self {
        if value { Self::Checked } else { Self::Unchecked }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self {
            Self::Checked => "[x]",
            Self::Unchecked => "[ ]",
            Self::Indeterminate => "[-]",
        };
        f.write_str(mark)
    }
}

/// Attributes shared by projects and groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerData {
    /// Ordered children. Order drives serialization and join order.
    pub items: Vec<NodeId>,
    pub is_expanded: bool,
    /// When set, at most one child is checked at a time.
    pub exclusive_mode: bool,
    pub delimiter: String,
    pub prefix: String,
    pub postfix: String,
}

impl Default for ContainerData {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_expanded: false,
            exclusive_mode: false,
            delimiter: DEFAULT_DELIMITER.to_string(),
            prefix: String::new(),
            postfix: String::new(),
        }
    }
}

/// Search filter applied to a project's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub needle: String,
    pub match_case: bool,
}

impl ItemFilter {
    /// Returns whether a parameter value passes the filter.
    pub fn matches(&self, value: &str) -> bool {
        if self.match_case {
            value.contains(&self.needle)
        } else {
            value.to_lowercase().contains(&self.needle.to_lowercase())
        }
    }
}

/// Behavioral variant of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of one project's tree.
    Project {
        container: ContainerData,
        /// Project-type GUID.
        kind: Uuid,
        is_startup: bool,
        filter: Option<ItemFilter>,
    },
    /// User-created sub-grouping.
    Group { container: ContainerData },
    /// Leaf value.
    Parameter {
        param_type: ParamType,
        default_checked: bool,
        /// Whether the parameter takes part in the current launch configuration.
        is_active: bool,
    },
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) value: String,
    pub(crate) check: CheckState,
    pub(crate) is_selected: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) project_config: Option<String>,
    pub(crate) project_platform: Option<String>,
    pub(crate) launch_profile: Option<String>,
    /// Value saved by `begin_edit`, present while the node is in edit mode.
    pub(crate) edit_backup: Option<String>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, value: String, kind: NodeKind) -> Self {
        Self {
            id,
            value,
            check: CheckState::Unchecked,
            is_selected: false,
            parent: None,
            project_config: None,
            project_platform: None,
            launch_profile: None,
            edit_backup: None,
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn check(&self) -> CheckState {
        self.check
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn project_config(&self) -> Option<&str> {
        self.project_config.as_deref()
    }

    pub fn project_platform(&self) -> Option<&str> {
        self.project_platform.as_deref()
    }

    pub fn launch_profile(&self) -> Option<&str> {
        self.launch_profile.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_in_edit_mode(&self) -> bool {
        self.edit_backup.is_some()
    }

    pub fn is_project(&self) -> bool {
        matches!(self.kind, NodeKind::Project { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter { .. })
    }

    /// Groups and parameters can be renamed; projects take their name from the host.
    pub fn is_editable(&self) -> bool {
        !self.is_project()
    }

    pub fn container(&self) -> Option<&ContainerData> {
        match &self.kind {
            NodeKind::Project { container, .. } | NodeKind::Group { container } => Some(container),
            NodeKind::Parameter { .. } => None,
        }
    }

    pub(crate) fn container_mut(&mut self) -> Option<&mut ContainerData> {
        match &mut self.kind {
            NodeKind::Project { container, .. } | NodeKind::Group { container } => Some(container),
            NodeKind::Parameter { .. } => None,
        }
    }

    /// Children ids, empty for parameters.
    pub fn items(&self) -> &[NodeId] {
        self.container().map(|c| c.items.as_slice()).unwrap_or_default()
    }

    pub fn param_type(&self) -> Option<ParamType> {
        match self.kind {
            NodeKind::Parameter { param_type, .. } => Some(param_type),
            _ => None,
        }
    }

    pub fn default_checked(&self) -> Option<bool> {
        match self.kind {
            NodeKind::Parameter {
                default_checked, ..
            } => Some(default_checked),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter { is_active: true, .. })
    }

    pub fn is_startup_project(&self) -> bool {
        matches!(self.kind, NodeKind::Project { is_startup: true, .. })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NodeKind::Project { .. } => "Project",
            NodeKind::Group { .. } => "Group",
            NodeKind::Parameter { .. } => "Parameter",
        };
        write!(f, "{kind}{{{}:{}}}", self.value, self.check)
    }
}
