// src/core/serializer.rs

//! Conversions between the live tree and the persisted records.

use crate::constants::FILE_VERSION;
use crate::core::node::{ContainerData, NodeId, NodeKind};
use crate::core::tree::{FilterAttribute, Tree, TreeError, TreeResult};
use crate::models::{CmdItemJson, ProjectDataJson, ProjectFileJson, SettingsJson, SolutionDataJson, SuoDataJson};
use uuid::Uuid;

// --- TREE -> RECORDS ---

/// Converts a node and its subtree into a record, UI bits included.
pub fn item_to_record(tree: &Tree, id: NodeId) -> TreeResult<CmdItemJson> {
    let node = tree.node(id)?;
    let mut record = CmdItemJson {
        id,
        command: Some(node.value().to_string()),
        project_config: node.project_config().map(str::to_string),
        project_platform: node.project_platform().map(str::to_string),
        launch_profile: node.launch_profile().map(str::to_string),
        selected: node.is_selected(),
        ..CmdItemJson::default()
    };

    match node.kind() {
        NodeKind::Parameter {
            param_type,
            default_checked,
            ..
        } => {
            record.param_type = *param_type;
            record.default_checked = *default_checked;
            record.enabled = node.check().is_checked();
        }
        NodeKind::Group { container } | NodeKind::Project { container, .. } => {
            record.exclusive_mode = container.exclusive_mode;
            record.delimiter = container.delimiter.clone();
            record.prefix = container.prefix.clone();
            record.postfix = container.postfix.clone();
            record.expanded = container.is_expanded;
            record.items = Some(
                container
                    .items
                    .iter()
                    .map(|child| item_to_record(tree, *child))
                    .collect::<TreeResult<Vec<_>>>()?,
            );
        }
    }
    Ok(record)
}

/// Converts a project into its persisted data. Projects carry no name or filters.
pub fn project_to_data(tree: &Tree, project: NodeId) -> TreeResult<ProjectDataJson> {
    if !tree.node(project)?.is_project() {
        return Err(TreeError::UnsupportedAttribute {
            id: project,
            attribute: "project data",
        });
    }
    let mut data = item_to_record(tree, project)?;
    data.command = None;
    data.project_config = None;
    data.project_platform = None;
    data.launch_profile = None;
    Ok(data)
}

/// Builds the solution state blob from every attached project.
pub fn build_suo_data(tree: &Tree, show_all_projects: bool, settings: Option<SettingsJson>) -> SuoDataJson {
    let mut data = SuoDataJson {
        show_all_projects,
        settings,
        ..SuoDataJson::default()
    };

    for project in tree.projects() {
        let Ok(project_data) = project_to_data(tree, *project) else {
            continue;
        };
        let records = std::iter::once(&project_data).chain(project_data.all_items());
        for record in records {
            if record.selected {
                data.selected_items.insert(record.id);
            }
            if record.is_container() && record.expanded {
                data.expanded_container.insert(record.id);
            }
            if !record.is_container() && record.enabled {
                data.checked_arguments.insert(record.id);
            }
        }
        data.project_arguments.insert(*project, project_data);
    }
    data
}

// --- RECORDS -> TREE ---

/// Creates detached nodes for `records`, keeping their ids and UI bits.
///
/// An id that already lives in the arena is replaced by a fresh one.
pub fn build_items(tree: &mut Tree, records: &[CmdItemJson]) -> TreeResult<Vec<NodeId>> {
    let mut result = Vec::with_capacity(records.len());
    for record in records {
        let id = if tree.contains(record.id) {
            log::warn!("Duplicate item id '{}', assigning a new one.", record.id);
            Uuid::new_v4()
        } else {
            record.id
        };
        let value = record.command.as_deref().unwrap_or_default();

        match &record.items {
            None => {
                tree.create_parameter_with_id(id, record.param_type, value, record.enabled, record.default_checked);
            }
            Some(items) => {
                tree.create_group_with_id(id, value, container_attributes(record));
                tree.set_filter_attribute(id, FilterAttribute::ProjectConfig, record.project_config.as_deref())?;
                tree.set_filter_attribute(id, FilterAttribute::ProjectPlatform, record.project_platform.as_deref())?;
                tree.set_filter_attribute(id, FilterAttribute::LaunchProfile, record.launch_profile.as_deref())?;
                let children = build_items(tree, items)?;
                tree.add_range(id, children)?;
            }
        }
        tree.set_selected(id, record.selected)?;
        result.push(id);
    }
    Ok(result)
}

fn container_attributes(record: &CmdItemJson) -> ContainerData {
    ContainerData {
        items: Vec::new(),
        is_expanded: record.expanded,
        exclusive_mode: record.exclusive_mode,
        delimiter: record.delimiter.clone(),
        prefix: record.prefix.clone(),
        postfix: record.postfix.clone(),
    }
}

/// Loads `data` into the project `id`.
///
/// An attached project keeps its node and gets its items replaced in one reset.
/// Otherwise a fresh project is built silently and attached afterwards.
///
/// # Arguments
///
/// * `tree` - The tree to populate.
/// * `id` - The project GUID.
/// * `kind` - The project-type GUID, used when the project is created.
/// * `name` - The display name, used when the project is created.
/// * `data` - The reconciled project data.
pub fn populate_project(tree: &mut Tree, id: NodeId, kind: Uuid, name: &str, data: &ProjectDataJson) -> TreeResult<()> {
    if tree.is_attached(id) {
        return repopulate_project(tree, id, data);
    }

    // 1. Build the project while it's detached, so no events are raised.
    tree.create_project(id, kind, name, container_attributes(data));
    let items = build_items(tree, data.children())?;
    tree.add_range(id, items)?;
    tree.set_selected(id, data.selected)?;

    // 2. Hand it over to the view.
    tree.attach_project(id)?;
    log::debug!("Populated project '{}' with {} items.", name, data.children().len());
    Ok(())
}

/// Replaces the items and container attributes of an attached project.
pub fn repopulate_project(tree: &mut Tree, id: NodeId, data: &ProjectDataJson) -> TreeResult<()> {
    tree.discard_children(id);
    tree.set_exclusive_mode(id, data.exclusive_mode)?;
    tree.set_delimiter(id, &data.delimiter)?;
    tree.set_prefix(id, &data.prefix)?;
    tree.set_postfix(id, &data.postfix)?;
    tree.set_expanded(id, data.expanded)?;
    tree.set_selected(id, data.selected)?;
    let items = build_items(tree, data.children())?;
    tree.replace_items(id, items)
}

// --- TEXT FORMATS ---

/// Parses a project file. Missing `Items` are left as `None` for the caller to decide.
pub fn parse_project_file(json: &str) -> serde_json::Result<ProjectDataJson> {
    let file: ProjectFileJson = serde_json::from_str(json)?;
    if file.file_version != FILE_VERSION {
        log::info!("Project file has version {}, reading it as version {}.", file.file_version, FILE_VERSION);
    }
    Ok(file.data)
}

pub fn project_file_to_string(data: &ProjectDataJson) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ProjectFileJson::from(data.clone()))
}

pub fn parse_solution_file(json: &str) -> serde_json::Result<SolutionDataJson> {
    serde_json::from_str(json)
}

pub fn solution_file_to_string(data: &SolutionDataJson) -> serde_json::Result<String> {
    serde_json::to_string_pretty(data)
}

/// Parses the solution state blob.
///
/// Empty input, malformed input and the legacy unversioned format all yield an
/// empty blob; the latter two are logged.
pub fn parse_suo_data(json: &str) -> SuoDataJson {
    if json.trim().is_empty() {
        log::info!("Got empty solution state. Using empty data.");
        return SuoDataJson::default();
    }

    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Failed to parse solution state: {}", e);
            return SuoDataJson::default();
        }
    };

    let version = value.get("FileVersion").and_then(serde_json::Value::as_u64).unwrap_or(0);
    if version < u64::from(FILE_VERSION) {
        log::warn!("Solution state has the unsupported legacy format (version {}). Ignoring it.", version);
        return SuoDataJson::default();
    }

    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("Failed to read solution state: {}", e);
        SuoDataJson::default()
    })
}

/// Serializes the solution state blob. The in-memory UI bits of the project
/// records are not part of it; they live in the id sets.
pub fn suo_data_to_string(data: &SuoDataJson) -> serde_json::Result<String> {
    serde_json::to_string(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::CheckState;
    use crate::models::ParamType;

    fn sample_data(project: Uuid) -> ProjectDataJson {
        let mut group = CmdItemJson::group(
            Uuid::new_v4(),
            "Group",
            vec![
                CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, "--a", true),
                CmdItemJson::parameter(Uuid::new_v4(), ParamType::EnvVar, "X=1", false),
            ],
        );
        group.prefix = "(".into();
        group.postfix = ")".into();
        group.delimiter = ",".into();
        group.project_config = Some("Debug".into());
        group.expanded = true;
        let mut data = ProjectDataJson::empty_project(project);
        data.items = Some(vec![group, CmdItemJson::parameter(Uuid::new_v4(), ParamType::WorkDir, "C:/w", true)]);
        data
    }

    #[test]
    fn test_populate_and_serialize_round_trip() {
        // --- Setup ---
        let mut tree = Tree::new();
        let project = Uuid::new_v4();
        let data = sample_data(project);

        // --- Execute ---
        populate_project(&mut tree, project, Uuid::nil(), "App", &data).unwrap();
        let back = project_to_data(&tree, project).unwrap();

        // --- Assert ---
        assert_eq!(back, data);
        assert!(tree.is_attached(project));
        assert!(tree.take_events().is_empty(), "Building a new project is silent");
    }

    #[test]
    fn test_repopulate_attached_project_fires_single_reset() {
        // --- Setup ---
        let mut tree = Tree::new();
        let project = Uuid::new_v4();
        let data = sample_data(project);
        populate_project(&mut tree, project, Uuid::nil(), "App", &data).unwrap();
        let first_id = data.children()[0].id;

        // --- Execute ---
        populate_project(&mut tree, project, Uuid::nil(), "App", &data).unwrap();

        // --- Assert ---
        assert_eq!(tree.children(project)[0], first_id, "Ids are kept across repopulation");
        let resets = tree
            .take_events()
            .into_iter()
            .filter(|event| matches!(event.kind, crate::core::events::TreeEventKind::ItemsChanged(_)))
            .count();
        assert_eq!(resets, 1);
        assert_eq!(project_to_data(&tree, project).unwrap(), data);
    }

    #[test]
    fn test_duplicate_ids_are_replaced() {
        // --- Setup ---
        let mut tree = Tree::new();
        let shared = Uuid::new_v4();
        let records = vec![
            CmdItemJson::parameter(shared, ParamType::CmdArg, "a", false),
            CmdItemJson::parameter(shared, ParamType::CmdArg, "b", false),
        ];

        // --- Execute ---
        let ids = build_items(&mut tree, &records).unwrap();

        // --- Assert ---
        assert_eq!(ids[0], shared);
        assert_ne!(ids[1], shared);
        assert_eq!(tree.node(ids[1]).unwrap().value(), "b");
    }

    #[test]
    fn test_build_suo_data_collects_ui_bits() {
        // --- Setup ---
        let mut tree = Tree::new();
        let project = Uuid::new_v4();
        let data = sample_data(project);
        populate_project(&mut tree, project, Uuid::nil(), "App", &data).unwrap();
        let group = data.children()[0].id;
        let checked = data.children()[0].children()[0].id;

        // --- Execute ---
        let suo = build_suo_data(&tree, true, None);

        // --- Assert ---
        assert!(suo.show_all_projects);
        assert!(suo.checked_arguments.contains(&checked));
        assert!(suo.expanded_container.contains(&group));
        assert_eq!(suo.checked_arguments.len(), 2);
        assert!(suo.project_arguments.contains_key(&project));
    }

    #[test]
    fn test_exclusive_record_loads_single_checked() {
        // --- Setup ---
        let mut tree = Tree::new();
        let mut group = CmdItemJson::group(
            Uuid::new_v4(),
            "G",
            vec![
                CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, "a", true),
                CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, "b", true),
            ],
        );
        group.exclusive_mode = true;

        // --- Execute ---
        let ids = build_items(&mut tree, &[group]).unwrap();

        // --- Assert ---
        let children = tree.children(ids[0]).to_vec();
        assert_eq!(tree.node(children[0]).unwrap().check(), CheckState::Checked);
        assert_eq!(tree.node(children[1]).unwrap().check(), CheckState::Unchecked);
    }

    #[test]
    fn test_parse_suo_data_degrades_to_empty() {
        assert_eq!(parse_suo_data(""), SuoDataJson::default());
        assert_eq!(parse_suo_data("{ not json"), SuoDataJson::default());
        assert_eq!(parse_suo_data(r#"{"MyProject": {"DataCollection": []}}"#), SuoDataJson::default());
    }

    #[test]
    fn test_parse_suo_data_reads_current_format() {
        // --- Setup ---
        let id = Uuid::new_v4();
        let json = format!(r#"{{"FileVersion":2,"ShowAllProjects":true,"CheckedArguments":["{id}"]}}"#);

        // --- Execute ---
        let suo = parse_suo_data(&json);

        // --- Assert ---
        assert!(suo.show_all_projects);
        assert!(suo.checked_arguments.contains(&id));
    }

    #[test]
    fn test_project_file_round_trip_through_text() {
        // --- Setup ---
        let data = sample_data(Uuid::new_v4());

        // --- Execute ---
        let text = project_file_to_string(&data).unwrap();
        let parsed = parse_project_file(&text).unwrap();

        // --- Assert ---
        assert!(text.contains("\"FileVersion\": 2"));
        assert!(!text.contains("Enabled"));
        assert_eq!(parsed.all_items().len(), data.all_items().len());
        assert_eq!(parsed.children()[0].prefix, "(");
        assert_eq!(parsed.children()[0].project_config.as_deref(), Some("Debug"));
    }
}
