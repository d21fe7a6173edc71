// src/cli/handlers/commons.rs

// Shared functions used by multiple handlers.

use anyhow::{Context, Result, anyhow, bail};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{
    constants::PROJECT_FILE_SUFFIX,
    core::{
        backend::ProjectInfo,
        node::NodeId,
        serializer::{parse_project_file, populate_project},
        tree::Tree,
    },
};

/// A project file loaded into a fresh tree.
#[derive(Debug)]
pub struct LoadedProject {
    pub tree: Tree,
    pub project: NodeId,
    pub info: ProjectInfo,
}

/// `App.args.json` -> `App`. Other names lose only their extension.
pub fn project_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.strip_suffix(PROJECT_FILE_SUFFIX) {
        Some(name) => name.to_string(),
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or(file_name),
    }
}

/// Reads a project file and builds its tree. The project takes the file's
/// directory as its own.
pub fn load_project_file(path: &Path) -> Result<LoadedProject> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let data = parse_project_file(&content).with_context(|| format!("'{}' is not a valid project file", path.display()))?;

    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));
    let info = ProjectInfo {
        id: if data.id.is_nil() { Uuid::new_v4() } else { data.id },
        kind: Uuid::nil(),
        name: project_name(path),
        dir: dunce::canonicalize(&dir).unwrap_or(dir),
    };

    let mut tree = Tree::new();
    populate_project(&mut tree, info.id, info.kind, &info.name, &data)?;
    log::debug!("Loaded {} items from '{}'.", tree.descendants(info.id).len(), path.display());
    Ok(LoadedProject {
        tree,
        project: info.id,
        info,
    })
}

/// Resolves item selectors (full ids or unique id prefixes) below `project`.
pub fn resolve_items(tree: &Tree, project: NodeId, selectors: &[String]) -> Result<Vec<NodeId>> {
    let candidates = tree.descendants(project);
    let mut result = Vec::new();
    for selector in selectors {
        let needle = selector.trim().to_lowercase();
        let matches: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|id| id.to_string().starts_with(&needle))
            .collect();
        match matches.as_slice() {
            [single] => result.push(*single),
            [] => bail!("No item matches '{}'.", selector),
            _ => bail!("'{}' matches {} items. Use a longer prefix.", selector, matches.len()),
        }
    }
    Ok(result)
}

/// Parses `KEY=VALUE`.
pub fn parse_key_value(value: &str) -> Result<(String, String)> {
    value
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'.", value))
}
