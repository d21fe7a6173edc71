// src/core/tree/checking.rs

//! Tri-state checkbox propagation.
//!
//! A check change travels in both directions: an explicit change on a container
//! is pushed down to its children, and every change is folded back up into the
//! parent's derived state. Exclusive containers keep at most one child checked.

use super::{Tree, TreeResult};
use crate::core::events::TreeEventKind;
use crate::core::node::{CheckState, Node, NodeId};

impl Tree {
    /// Announces an upcoming check change of `id` without touching any state.
    ///
    /// Owners that record snapshots drain the outbox between this call and
    /// [`Tree::apply_check`].
    pub fn announce_check_change(&mut self, id: NodeId) -> TreeResult<()> {
        self.node(id)?;
        self.bubble(id, TreeEventKind::CheckStateWillChange);
        Ok(())
    }

    /// Applies a user check change.
    ///
    /// Inside an exclusive container (or with the exclusive modifier held) a
    /// request to check runs the exclusive rule: every checked sibling is cleared
    /// and the target becomes checked, unless it already was the only checked
    /// item, in which case it ends up unchecked.
    ///
    /// # Arguments
    ///
    /// * `id` - The node whose checkbox changed.
    /// * `value` - The requested state.
    /// * `exclusive_modifier` - Treat the parent as exclusive for this change.
    pub fn apply_check(&mut self, id: NodeId, value: CheckState, exclusive_modifier: bool) -> TreeResult<()> {
        let node = self.node(id)?;
        let exclusive = exclusive_modifier || self.is_in_exclusive_container(id);
        if exclusive && node.parent.is_some() && value.is_checked() {
            self.exclusive_checked(id);
        } else {
            self.change_checked(id, value, true);
        }
        Ok(())
    }

    /// Announces and applies a check change in one go.
    pub fn set_checked(&mut self, id: NodeId, checked: bool, exclusive_modifier: bool) -> TreeResult<()> {
        self.announce_check_change(id)?;
        self.apply_check(id, checked.into(), exclusive_modifier)
    }

    /// Indeterminate and checked toggle to unchecked, unchecked to checked.
    pub fn toggle_checked(&mut self, id: NodeId) -> TreeResult<()> {
        let target = self.node(id)?.check.toggled();
        self.set_checked(id, target.is_checked(), false)
    }

    /// Turns exclusive mode on or off.
    ///
    /// Turning it on keeps the first non-unchecked child and clears the rest.
    pub fn set_exclusive_mode(&mut self, id: NodeId, exclusive: bool) -> TreeResult<()> {
        let container = self.container_mut(id)?;
        let old = std::mem::replace(&mut container.exclusive_mode, exclusive);
        if exclusive {
            let mut found = false;
            for item in self.children(id).to_vec() {
                if self.check_of(item).is_unchecked() {
                    continue;
                }
                if found {
                    self.change_checked(item, CheckState::Unchecked, true);
                } else {
                    found = true;
                }
            }
        }
        if old != exclusive {
            self.bubble(id, TreeEventKind::ExclusiveModeChanged { old, new: exclusive });
        }
        Ok(())
    }

    // --- Propagation engine ---

    fn exclusive_checked(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).and_then(Node::parent) else {
            return;
        };
        let checked_items: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|item| !self.check_of(*item).is_unchecked())
            .collect();
        let target = checked_items.len() != 1 || !self.check_of(id).is_checked();
        for item in checked_items {
            self.change_checked(item, CheckState::Unchecked, false);
        }
        self.change_checked(id, target.into(), true);
    }

    /// Explicit change of a node's state, dispatched on its kind.
    pub(super) fn change_checked(&mut self, id: NodeId, value: CheckState, notify_parent: bool) {
        let is_container = self.get(id).and_then(Node::container).is_some();
        if is_container {
            self.change_container_checked(id, value, notify_parent);
        } else {
            let value = match value {
                CheckState::Indeterminate => CheckState::Unchecked,
                other => other,
            };
            self.set_check_and_propagate(id, value, notify_parent);
        }
    }

    /// Pushes an explicit container change down, then derives the container's own
    /// state from the result. An empty container therefore stays unchecked.
    fn change_container_checked(&mut self, id: NodeId, value: CheckState, notify_parent: bool) {
        let value = match value {
            CheckState::Indeterminate => CheckState::Unchecked,
            other => other,
        };
        let items = self.children(id).to_vec();
        let exclusive = self
            .get(id)
            .and_then(Node::container)
            .is_some_and(|container| container.exclusive_mode);

        if exclusive {
            for item in items.iter().skip(1) {
                self.change_checked(*item, CheckState::Unchecked, false);
            }
            if let Some(first) = items.first() {
                self.change_checked(*first, value, false);
            }
        } else {
            for item in &items {
                self.change_checked(*item, value, false);
            }
        }

        let derived = self.derived_state(id);
        self.set_check_and_propagate(id, derived, notify_parent);
    }

    /// Stores the value, folds it into the parent, enforces exclusivity among the
    /// siblings and raises `CheckStateChanged` if the value moved.
    fn set_check_and_propagate(&mut self, id: NodeId, value: CheckState, notify_parent: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let old = std::mem::replace(&mut node.check, value);
        let parent = node.parent;

        if let Some(parent) = parent.filter(|_| notify_parent) {
            self.on_child_checked_changed(parent, value);
        }

        if !self.check_of(id).is_unchecked() && self.is_in_exclusive_container(id) {
            let others: Vec<NodeId> = parent
                .map(|parent| self.children(parent).to_vec())
                .unwrap_or_default()
                .into_iter()
                .filter(|item| *item != id && !self.check_of(*item).is_unchecked())
                .collect();
            for other in others {
                self.change_checked(other, CheckState::Unchecked, true);
            }
        }

        if old != value {
            self.bubble(id, TreeEventKind::CheckStateChanged { old, new: value });
        }
    }

    fn on_child_checked_changed(&mut self, container: NodeId, value: CheckState) {
        let children: Vec<CheckState> = self
            .children(container)
            .iter()
            .map(|item| self.check_of(*item))
            .collect();
        let state = if value.is_checked() {
            if children.iter().all(|state| state.is_checked()) {
                CheckState::Checked
            } else {
                CheckState::Indeterminate
            }
        } else if children.iter().any(|state| !state.is_unchecked()) {
            CheckState::Indeterminate
        } else {
            CheckState::Unchecked
        };
        self.set_check_and_propagate(container, state, true);
    }

    /// Re-derives a container's state after its child list changed.
    pub(super) fn update_checked_state(&mut self, container: NodeId) {
        let derived = self.derived_state(container);
        self.set_check_and_propagate(container, derived, true);
    }

    fn derived_state(&self, container: NodeId) -> CheckState {
        CheckState::from_children(self.children(container).iter().map(|item| self.check_of(*item)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::project_with_group;
    use super::*;
    use crate::core::node::ContainerData;
    use crate::models::ParamType;
    use uuid::Uuid;

    /// Asserts that every container state matches its children and that no
    /// exclusive container has more than one non-unchecked child.
    fn assert_consistent(tree: &Tree, id: NodeId) {
        let node = tree.node(id).unwrap();
        let Some(container) = node.container() else {
            return;
        };
        let expected = CheckState::from_children(container.items.iter().map(|item| tree.check_of(*item)));
        assert_eq!(node.check(), expected, "Inconsistent state on {node}");
        if container.exclusive_mode {
            let active = container
                .items
                .iter()
                .filter(|item| !tree.check_of(**item).is_unchecked())
                .count();
            assert!(active <= 1, "Exclusive container {node} has {active} active items");
        }
        for item in &container.items {
            assert_consistent(tree, *item);
        }
    }

    #[test]
    fn test_checking_all_children_checks_container() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", false), ("b", false)]);

        // --- Execute ---
        tree.set_checked(params[0], true, false).unwrap();
        let halfway = tree.check_of(group);
        tree.set_checked(params[1], true, false).unwrap();

        // --- Assert ---
        assert_eq!(halfway, CheckState::Indeterminate);
        assert_eq!(tree.check_of(group), CheckState::Checked);
        assert_eq!(tree.check_of(project), CheckState::Checked);
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_container_check_propagates_down() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", true), ("b", false)]);

        // --- Execute ---
        tree.toggle_checked(group).unwrap();

        // --- Assert ---
        assert!(params.iter().all(|param| tree.check_of(*param).is_unchecked()));
        assert_eq!(tree.check_of(group), CheckState::Unchecked);
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_checking_empty_container_keeps_it_unchecked() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, _) = project_with_group(&mut tree, &[]);

        // --- Execute ---
        tree.set_checked(group, true, false).unwrap();

        // --- Assert ---
        assert_eq!(tree.check_of(group), CheckState::Unchecked);
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_exclusive_container_keeps_one_checked() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", false), ("b", false), ("c", false)]);
        tree.set_exclusive_mode(group, true).unwrap();

        // --- Execute ---
        tree.set_checked(params[0], true, false).unwrap();
        tree.set_checked(params[2], true, false).unwrap();

        // --- Assert ---
        assert!(tree.check_of(params[0]).is_unchecked());
        assert!(tree.check_of(params[2]).is_checked());
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_exclusive_recheck_of_sole_item_toggles_off() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", false), ("b", false)]);
        tree.set_exclusive_mode(group, true).unwrap();
        tree.set_checked(params[1], true, false).unwrap();

        // --- Execute ---
        tree.set_checked(params[1], true, false).unwrap();

        // --- Assert ---
        assert!(tree.check_of(params[1]).is_unchecked());
        assert_eq!(tree.check_of(group), CheckState::Unchecked);
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_exclusive_modifier_clears_siblings() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, _, params) = project_with_group(&mut tree, &[("a", true), ("b", true), ("c", false)]);

        // --- Execute ---
        tree.set_checked(params[2], true, true).unwrap();

        // --- Assert ---
        assert!(tree.check_of(params[0]).is_unchecked());
        assert!(tree.check_of(params[1]).is_unchecked());
        assert!(tree.check_of(params[2]).is_checked());
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_enabling_exclusive_mode_keeps_first_checked() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", false), ("b", true), ("c", true)]);

        // --- Execute ---
        tree.set_exclusive_mode(group, true).unwrap();

        // --- Assert ---
        assert!(tree.check_of(params[1]).is_checked());
        assert!(tree.check_of(params[2]).is_unchecked());
        assert_consistent(&tree, project);
        assert!(tree.take_events().iter().any(|event| event.kind
            == TreeEventKind::ExclusiveModeChanged {
                old: false,
                new: true
            }));
    }

    #[test]
    fn test_checking_exclusive_container_checks_only_first_child() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", false), ("b", false)]);
        tree.set_exclusive_mode(group, true).unwrap();

        // --- Execute ---
        tree.set_checked(group, true, false).unwrap();

        // --- Assert ---
        assert!(tree.check_of(params[0]).is_checked());
        assert!(tree.check_of(params[1]).is_unchecked());
        assert_eq!(tree.check_of(group), CheckState::Indeterminate);
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_nested_groups_stay_consistent() {
        // --- Setup ---
        let mut tree = Tree::new();
        let project = tree.create_project(Uuid::new_v4(), Uuid::nil(), "P", ContainerData::default());
        tree.attach_project(project).unwrap();
        let outer = tree.create_group("outer");
        let inner = tree.create_group("inner");
        let a = tree.create_parameter(ParamType::CmdArg, "a", false);
        let b = tree.create_parameter(ParamType::CmdArg, "b", false);
        tree.add(inner, a).unwrap();
        tree.add_range(outer, vec![inner, b]).unwrap();
        tree.add(project, outer).unwrap();

        // --- Execute & Assert ---
        tree.set_checked(a, true, false).unwrap();
        assert_eq!(tree.check_of(inner), CheckState::Checked);
        assert_eq!(tree.check_of(outer), CheckState::Indeterminate);
        assert_consistent(&tree, project);

        tree.set_checked(project, true, false).unwrap();
        assert!(tree.check_of(b).is_checked());
        assert_eq!(tree.check_of(project), CheckState::Checked);
        assert_consistent(&tree, project);

        tree.set_checked(b, false, false).unwrap();
        assert_eq!(tree.check_of(outer), CheckState::Indeterminate);
        assert_eq!(tree.check_of(project), CheckState::Indeterminate);
        assert_consistent(&tree, project);
    }

    #[test]
    fn test_will_change_precedes_state_change() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, _, params) = project_with_group(&mut tree, &[("a", false)]);

        // --- Execute ---
        tree.set_checked(params[0], true, false).unwrap();

        // --- Assert ---
        let events = tree.take_events();
        assert_eq!(events[0].kind, TreeEventKind::CheckStateWillChange);
        assert!(events.iter().skip(1).any(|event| event.sender == params[0]
            && event.kind
                == TreeEventKind::CheckStateChanged {
                    old: CheckState::Unchecked,
                    new: CheckState::Checked
                }));
    }
}
