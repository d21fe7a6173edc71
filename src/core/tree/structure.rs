// src/core/tree/structure.rs

//! Child-list mutations: insert, remove, replace and move.

use super::{Tree, TreeError, TreeResult};
use crate::core::events::{ItemsChange, TreeEventKind};
use crate::core::node::{CheckState, Node, NodeId};

/// Direction for [`Tree::move_selected_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl Tree {
    /// Whether `candidate` is `id` or one of its ancestors.
    fn is_self_or_ancestor(&self, candidate: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            match current {
                Some(node) if node == candidate => return true,
                Some(node) => current = self.get(node).and_then(Node::parent),
                None => return false,
            }
        }
        false
    }

    fn validate_insert(&self, parent: NodeId, items: &[NodeId]) -> TreeResult<()> {
        if self.node(parent)?.container().is_none() {
            return Err(TreeError::NotAContainer { id: parent });
        }
        for item in items {
            if self.node(*item)?.is_project() {
                return Err(TreeError::CannotNestProject { id: *item });
            }
            if self.is_self_or_ancestor(*item, parent) {
                return Err(TreeError::WouldCreateCycle {
                    id: *item,
                    parent,
                });
            }
        }
        Ok(())
    }

    /// Inserts `items` at `index` of `parent`.
    ///
    /// Items that already have a parent are moved: they are removed from their old
    /// container first. In an exclusive container only the first checked newcomer
    /// keeps its check; if there is one, the existing children are unchecked.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a container, an item is a project, the
    /// insert would create a cycle, or `index` is past the end.
    pub fn insert_range(&mut self, parent: NodeId, index: usize, items: Vec<NodeId>) -> TreeResult<()> {
        self.validate_insert(parent, &items)?;
        let mut items = items;
        items.dedup();

        // 1. Detach items that live somewhere else, fixing the target index.
        let mut index = index;
        for item in &items {
            if let Some(old_parent) = self.get(*item).and_then(Node::parent) {
                if old_parent == parent && self.index_of(parent, *item).is_some_and(|old| old < index) {
                    index -= 1;
                }
                self.detach(*item)?;
            }
        }
        let len = self.children(parent).len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { parent, index, len });
        }

        // 2. Keep the exclusive cardinality.
        let exclusive = self
            .get(parent)
            .and_then(Node::container)
            .is_some_and(|container| container.exclusive_mode);
        if exclusive {
            let mut found = false;
            for item in &items {
                if self.check_of(*item).is_unchecked() {
                    continue;
                }
                if found {
                    self.change_checked(*item, CheckState::Unchecked, false);
                } else {
                    found = true;
                }
            }
            if found {
                for existing in self.children(parent).to_vec() {
                    self.change_checked(existing, CheckState::Unchecked, false);
                }
            }
        }

        // 3. Splice and re-parent.
        let container = self.container_mut(parent)?;
        let tail = container.items.split_off(index);
        container.items.extend(items.iter().copied());
        container.items.extend(tail);
        for item in &items {
            if let Some(node) = self.nodes.get_mut(item) {
                node.parent = Some(parent);
            }
            self.bubble_to(
                *item,
                parent,
                TreeEventKind::ParentChanged {
                    old: None,
                    new: Some(parent),
                },
            );
        }

        // 4. Derive the container state and announce the change.
        self.update_checked_state(parent);
        self.bubble(parent, TreeEventKind::ItemsChanged(ItemsChange::Add { items, index }));
        Ok(())
    }

    /// Inserts `item` into `parent` at `index`.
    pub fn insert(&mut self, parent: NodeId, index: usize, item: NodeId) -> TreeResult<()> {
        self.insert_range(parent, index, vec![item])
    }

    /// Appends `item` to `parent`.
    pub fn add(&mut self, parent: NodeId, item: NodeId) -> TreeResult<()> {
        let index = self.children(parent).len();
        self.insert_range(parent, index, vec![item])
    }

    /// Appends `items` to `parent`.
    pub fn add_range(&mut self, parent: NodeId, items: Vec<NodeId>) -> TreeResult<()> {
        let index = self.children(parent).len();
        self.insert_range(parent, index, items)
    }

    /// Unlinks `id` from its parent without discarding it.
    pub(crate) fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        let container = self.container_mut(parent)?;
        let Some(index) = container.items.iter().position(|item| *item == id) else {
            return Ok(());
        };
        container.items.remove(index);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
        self.bubble_to(
            id,
            parent,
            TreeEventKind::ParentChanged {
                old: Some(parent),
                new: None,
            },
        );
        self.update_checked_state(parent);
        self.bubble(
            parent,
            TreeEventKind::ItemsChanged(ItemsChange::Remove {
                items: vec![id],
                index,
            }),
        );
        Ok(())
    }

    /// Removes `id` from its container and discards its subtree.
    ///
    /// Removing an attached project detaches it from the view.
    pub fn remove(&mut self, id: NodeId) -> TreeResult<()> {
        if self.node(id)?.is_project() {
            self.remove_project(id);
            return Ok(());
        }
        self.detach(id)?;
        self.purge(id);
        Ok(())
    }

    /// Replaces every child of `parent` with `items`, raising a single reset.
    ///
    /// The old children are discarded.
    pub fn replace_items(&mut self, parent: NodeId, items: Vec<NodeId>) -> TreeResult<()> {
        self.validate_insert(parent, &items)?;
        let mut items = items;
        items.dedup();
        for item in &items {
            if self.get(*item).and_then(Node::parent).is_some_and(|p| p != parent) {
                self.detach(*item)?;
            }
        }

        // 1. Only the first checked newcomer survives in exclusive mode.
        let exclusive = self
            .get(parent)
            .and_then(Node::container)
            .is_some_and(|container| container.exclusive_mode);
        if exclusive {
            let mut found = false;
            for item in &items {
                if self.check_of(*item).is_unchecked() {
                    continue;
                }
                if found {
                    self.change_checked(*item, CheckState::Unchecked, false);
                } else {
                    found = true;
                }
            }
        }

        // 2. Swap the lists.
        let container = self.container_mut(parent)?;
        let old_items = std::mem::replace(&mut container.items, items.clone());
        for old in old_items {
            if !items.contains(&old) {
                self.purge(old);
            }
        }
        for item in &items {
            if let Some(node) = self.nodes.get_mut(item) {
                node.parent = Some(parent);
            }
            self.bubble_to(
                *item,
                parent,
                TreeEventKind::ParentChanged {
                    old: None,
                    new: Some(parent),
                },
            );
        }

        // 3. Derive and announce.
        self.update_checked_state(parent);
        self.bubble(parent, TreeEventKind::ItemsChanged(ItemsChange::Reset));
        Ok(())
    }

    /// Moves a child inside its container. The check state is unaffected.
    pub fn move_item(&mut self, parent: NodeId, old_index: usize, new_index: usize) -> TreeResult<()> {
        let container = self.container_mut(parent)?;
        let len = container.items.len();
        if old_index >= len || new_index >= len {
            return Err(TreeError::IndexOutOfRange {
                parent,
                index: old_index.max(new_index),
                len,
            });
        }
        if old_index == new_index {
            return Ok(());
        }
        let item = container.items.remove(old_index);
        container.items.insert(new_index, item);
        self.bubble(
            parent,
            TreeEventKind::ItemsChanged(ItemsChange::Move {
                item,
                old_index,
                new_index,
            }),
        );
        Ok(())
    }

    /// Moves the selected children of `container` (recursively) one slot.
    ///
    /// Nothing moves in a container whose selection already touches the edge.
    pub fn move_selected_entries(&mut self, container: NodeId, direction: MoveDirection) -> TreeResult<()> {
        let items = self.children(container).to_vec();
        let selected: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.get(**item).is_some_and(Node::is_selected))
            .map(|(index, _)| index)
            .collect();

        if let (Some(&first), Some(&last)) = (selected.first(), selected.last()) {
            match direction {
                MoveDirection::Up if first > 0 => {
                    for index in &selected {
                        self.move_item(container, *index, index - 1)?;
                    }
                }
                MoveDirection::Down if last + 1 < items.len() => {
                    for index in selected.iter().rev() {
                        self.move_item(container, *index, index + 1)?;
                    }
                }
                _ => {}
            }
        }

        for item in items {
            if self.get(item).and_then(Node::container).is_some() {
                self.move_selected_entries(item, direction)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::project_with_group;
    use super::*;
    use crate::core::node::ContainerData;
    use crate::models::ParamType;
    use uuid::Uuid;

    fn values(tree: &Tree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .iter()
            .map(|id| tree.node(*id).unwrap().value().to_string())
            .collect()
    }

    #[test]
    fn test_insert_into_parameter_fails() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, _, params) = project_with_group(&mut tree, &[("a", false)]);
        let other = tree.create_parameter(ParamType::CmdArg, "b", false);

        // --- Execute & Assert ---
        assert_eq!(
            tree.add(params[0], other),
            Err(TreeError::NotAContainer { id: params[0] })
        );
    }

    #[test]
    fn test_insert_ancestor_is_rejected() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, _) = project_with_group(&mut tree, &[]);
        let inner = tree.create_group("Inner");
        tree.add(group, inner).unwrap();

        // --- Execute & Assert ---
        assert_eq!(
            tree.add(inner, group),
            Err(TreeError::WouldCreateCycle { id: group, parent: inner })
        );
        assert_eq!(
            tree.add(group, group),
            Err(TreeError::WouldCreateCycle { id: group, parent: group })
        );
    }

    #[test]
    fn test_insert_moves_node_from_old_parent() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", true), ("b", false)]);

        // --- Execute ---
        tree.add(project, params[0]).unwrap();

        // --- Assert ---
        assert_eq!(values(&tree, group), vec!["b"]);
        assert_eq!(tree.children(project), &[group, params[0]]);
        assert_eq!(tree.node(params[0]).unwrap().parent(), Some(project));
        assert_eq!(tree.node(group).unwrap().check(), CheckState::Unchecked);
        assert_eq!(tree.node(project).unwrap().check(), CheckState::Indeterminate);
    }

    #[test]
    fn test_reinsert_in_same_container_adjusts_index() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, params) = project_with_group(&mut tree, &[("a", false), ("b", false), ("c", false)]);

        // --- Execute ---
        tree.insert(group, 3, params[0]).unwrap();

        // --- Assert ---
        assert_eq!(values(&tree, group), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove_purges_subtree() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (project, group, params) = project_with_group(&mut tree, &[("a", true)]);

        // --- Execute ---
        tree.remove(group).unwrap();

        // --- Assert ---
        assert!(!tree.contains(group));
        assert!(!tree.contains(params[0]));
        assert!(tree.children(project).is_empty());
        assert_eq!(tree.node(project).unwrap().check(), CheckState::Unchecked);
        let events = tree.take_events();
        assert!(events.iter().any(|event| event.kind
            == TreeEventKind::ItemsChanged(ItemsChange::Remove {
                items: vec![group],
                index: 0
            })));
    }

    #[test]
    fn test_replace_items_raises_single_reset() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, params) = project_with_group(&mut tree, &[("a", false)]);
        let fresh = tree.create_parameter(ParamType::CmdArg, "z", true);

        // --- Execute ---
        tree.replace_items(group, vec![fresh]).unwrap();

        // --- Assert ---
        assert!(!tree.contains(params[0]));
        assert_eq!(values(&tree, group), vec!["z"]);
        assert_eq!(tree.node(group).unwrap().check(), CheckState::Checked);
        let resets = tree
            .take_events()
            .into_iter()
            .filter(|event| matches!(event.kind, TreeEventKind::ItemsChanged(_)))
            .count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_move_item_keeps_check_state() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, _) = project_with_group(&mut tree, &[("a", true), ("b", false)]);

        // --- Execute ---
        tree.move_item(group, 0, 1).unwrap();

        // --- Assert ---
        assert_eq!(values(&tree, group), vec!["b", "a"]);
        assert_eq!(tree.node(group).unwrap().check(), CheckState::Indeterminate);
        assert!(matches!(
            tree.move_item(group, 0, 2),
            Err(TreeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_move_selected_entries_stops_at_edges() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, params) = project_with_group(&mut tree, &[("a", false), ("b", false), ("c", false)]);
        tree.set_selected(params[1], true).unwrap();
        tree.set_selected(params[2], true).unwrap();

        // --- Execute ---
        tree.move_selected_entries(group, MoveDirection::Down).unwrap();
        let after_down = values(&tree, group);
        tree.move_selected_entries(group, MoveDirection::Up).unwrap();

        // --- Assert ---
        assert_eq!(after_down, vec!["a", "b", "c"]);
        assert_eq!(values(&tree, group), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_exclusive_insert_keeps_single_checked() {
        // --- Setup ---
        let mut tree = Tree::new();
        let project = tree.create_project(Uuid::new_v4(), Uuid::nil(), "P", ContainerData::default());
        tree.attach_project(project).unwrap();
        let group = tree.create_group("G");
        tree.add(project, group).unwrap();
        tree.set_exclusive_mode(group, true).unwrap();
        let existing = tree.create_parameter(ParamType::CmdArg, "old", true);
        tree.add(group, existing).unwrap();
        let first = tree.create_parameter(ParamType::CmdArg, "x", true);
        let second = tree.create_parameter(ParamType::CmdArg, "y", true);

        // --- Execute ---
        tree.add_range(group, vec![first, second]).unwrap();

        // --- Assert ---
        assert_eq!(tree.check_of(existing), CheckState::Unchecked);
        assert_eq!(tree.check_of(first), CheckState::Checked);
        assert_eq!(tree.check_of(second), CheckState::Unchecked);
        assert_eq!(tree.check_of(group), CheckState::Indeterminate);
    }
}
