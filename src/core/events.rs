// src/core/events.rs

use crate::core::node::{CheckState, NodeId};
use crate::models::ParamType;

/// Structural diff of a container's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemsChange {
    Add { items: Vec<NodeId>, index: usize },
    Remove { items: Vec<NodeId>, index: usize },
    Replace {
        old_items: Vec<NodeId>,
        new_items: Vec<NodeId>,
        index: usize,
    },
    Move {
        item: NodeId,
        old_index: usize,
        new_index: usize,
    },
    /// The whole list was swapped out.
    Reset,
}

/// What changed on the sender node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEventKind {
    ParentChanged {
        old: Option<NodeId>,
        new: Option<NodeId>,
    },
    ValueChanged {
        old: String,
        new: String,
    },
    /// Raised before a checkbox mutation so the pre-state can be recorded.
    CheckStateWillChange,
    CheckStateChanged {
        old: CheckState,
        new: CheckState,
    },
    SelectionChanged {
        is_selected: bool,
    },
    ItemsChanged(ItemsChange),
    EditModeChanged {
        is_in_edit_mode: bool,
    },
    ProjectConfigChanged {
        old: Option<String>,
        new: Option<String>,
    },
    ProjectPlatformChanged {
        old: Option<String>,
        new: Option<String>,
    },
    LaunchProfileChanged {
        old: Option<String>,
        new: Option<String>,
    },
    ExclusiveModeChanged {
        old: bool,
        new: bool,
    },
    DelimiterChanged {
        old: String,
        new: String,
    },
    PrefixChanged {
        old: String,
        new: String,
    },
    PostfixChanged {
        old: String,
        new: String,
    },
    DefaultCheckedChanged {
        old: bool,
        new: bool,
    },
    ParamTypeChanged {
        old: ParamType,
        new: ParamType,
    },
}

/// How the dispatcher reacts to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// UI selection only; never persisted.
    Selection,
    /// Snapshot the tree before the mutation happens.
    WillChange,
    /// Cheap change (checkbox): launch config must be refreshed, files untouched.
    TreeChanged,
    /// Structural or value change: the project data has to be persisted.
    ContentChanged,
    /// Entering or leaving edit mode.
    EditMode,
}

impl TreeEventKind {
    /// Classifies the event for dispatch.
    pub fn class(&self) -> EventClass {
        match self {
            Self::SelectionChanged { .. } => EventClass::Selection,
            Self::CheckStateWillChange => EventClass::WillChange,
            Self::CheckStateChanged { .. } => EventClass::TreeChanged,
            Self::EditModeChanged { .. } => EventClass::EditMode,
            Self::ParentChanged { .. }
            | Self::ValueChanged { .. }
            | Self::ItemsChanged(_)
            | Self::ProjectConfigChanged { .. }
            | Self::ProjectPlatformChanged { .. }
            | Self::LaunchProfileChanged { .. }
            | Self::ExclusiveModeChanged { .. }
            | Self::DelimiterChanged { .. }
            | Self::PrefixChanged { .. }
            | Self::PostfixChanged { .. }
            | Self::DefaultCheckedChanged { .. }
            | Self::ParamTypeChanged { .. } => EventClass::ContentChanged,
        }
    }
}

/// An event that bubbled up to an attached project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEvent {
    /// Node whose state changed.
    pub sender: NodeId,
    /// Project the event bubbled up to.
    pub project: NodeId,
    pub kind: TreeEventKind,
}

/// Coarse notifications produced by the dispatcher for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNotification {
    ItemSelectionChanged { item: NodeId },
    TreeChanged { source: NodeId, project: NodeId },
    TreeContentChanged { source: NodeId, project: NodeId },
}

/// Debounced notifications, delivered once per project after a quiet window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottledNotification {
    TreeChanged(NodeId),
    TreeContentChanged(NodeId),
}

impl ThrottledNotification {
    pub fn project(&self) -> NodeId {
        match self {
            Self::TreeChanged(id) | Self::TreeContentChanged(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        assert_eq!(
            TreeEventKind::SelectionChanged { is_selected: true }.class(),
            EventClass::Selection
        );
        assert_eq!(TreeEventKind::CheckStateWillChange.class(), EventClass::WillChange);
        assert_eq!(
            TreeEventKind::CheckStateChanged {
                old: CheckState::Unchecked,
                new: CheckState::Checked
            }
            .class(),
            EventClass::TreeChanged
        );
        assert_eq!(
            TreeEventKind::ItemsChanged(ItemsChange::Reset).class(),
            EventClass::ContentChanged
        );
        assert_eq!(
            TreeEventKind::ProjectPlatformChanged {
                old: None,
                new: Some("x64".into())
            }
            .class(),
            EventClass::ContentChanged
        );
    }
}
