// src/core/clipboard.rs

//! Clipboard and drag-and-drop payloads: an in-process id list, an id-less
//! JSON item list and a tab-indented plain text fallback.

use crate::core::node::{Node, NodeId, NodeKind};
use crate::core::serializer::build_items;
use crate::core::tree::{Tree, TreeResult};
use crate::models::{CmdItemJson, ParamType, default_delimiter, is_default_delimiter, is_false};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One copied item. Ids are not carried: pasted items always get fresh ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ClipboardItemJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_profile: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_mode: bool,
    #[serde(default = "default_delimiter", skip_serializing_if = "is_default_delimiter")]
    pub delimiter: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub postfix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub default_checked: bool,
    #[serde(rename = "Type", default, skip_serializing_if = "ParamType::is_cmd_arg")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ClipboardItemJson>>,
}

impl Default for ClipboardItemJson {
    fn default() -> Self {
        Self {
            enabled: None,
            value: None,
            project_config: None,
            project_platform: None,
            launch_profile: None,
            exclusive_mode: false,
            delimiter: default_delimiter(),
            prefix: String::new(),
            postfix: String::new(),
            default_checked: false,
            param_type: ParamType::CmdArg,
            items: None,
        }
    }
}

impl ClipboardItemJson {
    fn parameter(value: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    fn group(name: &str) -> Self {
        Self {
            value: Some(name.to_string()),
            items: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Converts into a persisted record with fresh ids throughout.
    pub fn to_record(&self) -> CmdItemJson {
        CmdItemJson {
            id: Uuid::new_v4(),
            command: self.value.clone(),
            project_config: self.project_config.clone(),
            project_platform: self.project_platform.clone(),
            launch_profile: self.launch_profile.clone(),
            exclusive_mode: self.exclusive_mode,
            delimiter: self.delimiter.clone(),
            prefix: self.prefix.clone(),
            postfix: self.postfix.clone(),
            default_checked: self.default_checked,
            param_type: self.param_type,
            enabled: self.enabled.unwrap_or(false),
            items: self.items.as_ref().map(|items| items.iter().map(Self::to_record).collect()),
            ..CmdItemJson::default()
        }
    }
}

/// Everything put on (or taken from) the clipboard for one copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    /// Live node ids, only meaningful inside the same process.
    pub objects: Option<Vec<NodeId>>,
    pub json: Option<String>,
    pub text: Option<String>,
    /// Paths dropped from a file manager.
    pub files: Vec<String>,
}

impl ClipboardPayload {
    pub fn has_extractable_data(&self) -> bool {
        self.objects.is_some() || self.json.is_some() || self.text.is_some() || !self.files.is_empty()
    }
}

// --- COPY ---

fn item_json(tree: &Tree, node: &Node) -> Option<ClipboardItemJson> {
    match node.kind() {
        NodeKind::Parameter {
            param_type,
            default_checked,
            ..
        } => Some(ClipboardItemJson {
            enabled: Some(node.check().is_checked()),
            value: Some(node.value().to_string()),
            default_checked: *default_checked,
            param_type: *param_type,
            ..ClipboardItemJson::default()
        }),
        NodeKind::Group { container } => Some(ClipboardItemJson {
            value: Some(node.value().to_string()),
            project_config: node.project_config().map(str::to_string),
            project_platform: node.project_platform().map(str::to_string),
            launch_profile: node.launch_profile().map(str::to_string),
            exclusive_mode: container.exclusive_mode,
            delimiter: container.delimiter.clone(),
            prefix: container.prefix.clone(),
            postfix: container.postfix.clone(),
            items: Some(items_json(tree, &container.items)),
            ..ClipboardItemJson::default()
        }),
        NodeKind::Project { .. } => None,
    }
}

/// JSON items for `ids`. A project stands for its items.
pub fn items_json(tree: &Tree, ids: &[NodeId]) -> Vec<ClipboardItemJson> {
    let mut result = Vec::new();
    for node in ids.iter().filter_map(|id| tree.get(*id)) {
        if node.is_project() {
            result.extend(items_json(tree, node.items()));
        } else {
            result.extend(item_json(tree, node));
        }
    }
    result
}

/// Tab-indented lines; groups end with `:`.
pub fn items_to_lines(items: &[ClipboardItemJson]) -> Vec<String> {
    fn walk(items: &[ClipboardItemJson], level: usize, lines: &mut Vec<String>) {
        let indent = "\t".repeat(level);
        for item in items {
            let value = item.value.as_deref().unwrap_or_default();
            match &item.items {
                Some(children) => {
                    lines.push(format!("{indent}{value}:"));
                    walk(children, level + 1, lines);
                }
                None => lines.push(format!("{indent}{value}")),
            }
        }
    }

    let mut lines = Vec::new();
    walk(items, 0, &mut lines);
    lines
}

/// Builds the payload for copying `ids`.
pub fn generate(tree: &Tree, ids: &[NodeId], include_objects: bool) -> ClipboardPayload {
    let items = items_json(tree, ids);
    let json = match serde_json::to_string(&items) {
        Ok(json) => Some(json),
        Err(e) => {
            log::warn!("Failed to serialize copied items: {}", e);
            None
        }
    };
    ClipboardPayload {
        objects: include_objects.then(|| ids.to_vec()),
        json,
        text: Some(items_to_lines(&items).join("\n")),
        files: Vec::new(),
    }
}

// --- PASTE ---

fn close_group(stack: &mut Vec<ClipboardItemJson>) {
    if let Some(group) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.items.get_or_insert_with(Vec::new).push(group);
        }
    }
}

/// Parses tab-indented lines. The indent is clamped to one level deeper than
/// the current group, and a trailing `:` opens a group.
pub fn parse_lines<'a, I>(lines: I) -> Vec<ClipboardItemJson>
where
    I: IntoIterator<Item = &'a str>,
{
    // The bottom entry is a pseudo root collecting the top-level items.
    let mut stack = vec![ClipboardItemJson::group("")];

    for line in lines.into_iter().filter(|line| !line.is_empty()) {
        let depth = stack.len().saturating_sub(1);
        let level = line.chars().take_while(|c| *c == '\t').count().min(depth);
        while stack.len().saturating_sub(1) > level {
            close_group(&mut stack);
        }

        let trimmed = line.get(level..).unwrap_or_default();
        match trimmed.strip_suffix(':') {
            Some(name) => stack.push(ClipboardItemJson::group(name)),
            None => {
                if let Some(top) = stack.last_mut() {
                    top.items
                        .get_or_insert_with(Vec::new)
                        .push(ClipboardItemJson::parameter(trimmed));
                }
            }
        }
    }

    while stack.len() > 1 {
        close_group(&mut stack);
    }
    stack.pop().and_then(|root| root.items).unwrap_or_default()
}

/// Items described by the payload, trying each format in priority order.
///
/// Returns `None` when nothing usable is present.
pub fn extract_items(payload: &ClipboardPayload) -> Option<Vec<ClipboardItemJson>> {
    if let Some(json) = &payload.json {
        match serde_json::from_str::<Vec<ClipboardItemJson>>(json) {
            Ok(items) => return Some(items),
            Err(e) => log::warn!("Ignoring malformed clipboard JSON: {}", e),
        }
    }
    if let Some(text) = &payload.text {
        return Some(parse_lines(text.lines()));
    }
    if !payload.files.is_empty() {
        let quoted: Vec<String> = payload.files.iter().map(|file| format!("\"{file}\"")).collect();
        return Some(parse_lines(quoted.iter().map(String::as_str)));
    }
    None
}

/// Resolves a paste or drop into detached nodes ready for insertion.
///
/// With `include_objects` the in-process id list wins; those nodes are
/// returned as they are, so inserting them moves them.
pub fn extract(tree: &mut Tree, payload: &ClipboardPayload, include_objects: bool) -> TreeResult<Option<Vec<NodeId>>> {
    if include_objects {
        if let Some(objects) = &payload.objects {
            let alive: Vec<NodeId> = objects.iter().copied().filter(|id| tree.contains(*id)).collect();
            if !alive.is_empty() {
                return Ok(Some(alive));
            }
        }
    }

    let Some(items) = extract_items(payload) else {
        return Ok(None);
    };
    let records: Vec<CmdItemJson> = items.iter().map(ClipboardItemJson::to_record).collect();
    build_items(tree, &records).map(Some)
}
