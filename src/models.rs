// src/models.rs

use crate::constants::{DEFAULT_DELIMITER, FILE_VERSION};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// --- PARAMETER TYPES ---

/// What a leaf parameter contributes to the launch configuration.
///
/// Persisted as its integer discriminant so existing `*.args.json` files stay readable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum ParamType {
    /// A command line argument.
    #[default]
    CmdArg,
    /// An environment variable in `NAME=value` form.
    EnvVar,
    /// A working directory override.
    WorkDir,
    /// A launch application override.
    LaunchApp,
}

impl ParamType {
    /// All variants in their persisted order.
    pub const ALL: [Self; 4] = [Self::CmdArg, Self::EnvVar, Self::WorkDir, Self::LaunchApp];

    pub(crate) fn is_cmd_arg(&self) -> bool {
        *self == Self::CmdArg
    }
}

impl From<ParamType> for u8 {
    fn from(value: ParamType) -> Self {
        match value {
            ParamType::CmdArg => 0,
            ParamType::EnvVar => 1,
            ParamType::WorkDir => 2,
            ParamType::LaunchApp => 3,
        }
    }
}

impl TryFrom<u8> for ParamType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::CmdArg),
            1 => Ok(Self::EnvVar),
            2 => Ok(Self::WorkDir),
            3 => Ok(Self::LaunchApp),
            other => Err(format!("unknown parameter type '{other}'")),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CmdArg => "arg",
            Self::EnvVar => "env",
            Self::WorkDir => "workdir",
            Self::LaunchApp => "app",
        };
        f.write_str(name)
    }
}

// --- ITEM RECORDS (PROJECT JSON / SOLUTION STATE) ---

/// One persisted tree item. Containers carry `items`, leaves don't.
///
/// `enabled`, `expanded` and `selected` never reach the project file: they are
/// UI state that travels in memory and through the solution state blob.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CmdItemJson {
    #[serde(default = "Uuid::new_v4", deserialize_with = "deserialize_id_or_new")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
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
    pub postfix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CmdItemJson>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub default_checked: bool,
    #[serde(rename = "Type", default, skip_serializing_if = "ParamType::is_cmd_arg")]
    pub param_type: ParamType,

    #[serde(skip)]
    pub enabled: bool,
    #[serde(skip)]
    pub expanded: bool,
    #[serde(skip)]
    pub selected: bool,
}

/// Project data shares the item shape; its `items` is always `Some`.
pub type ProjectDataJson = CmdItemJson;

impl Default for CmdItemJson {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            command: None,
            project_config: None,
            project_platform: None,
            launch_profile: None,
            exclusive_mode: false,
            delimiter: default_delimiter(),
            postfix: String::new(),
            prefix: String::new(),
            items: None,
            default_checked: false,
            param_type: ParamType::CmdArg,
            enabled: false,
            expanded: false,
            selected: false,
        }
    }
}

impl CmdItemJson {
    /// Creates a leaf record.
    pub fn parameter(id: Uuid, param_type: ParamType, command: &str, enabled: bool) -> Self {
        Self {
            id,
            param_type,
            command: Some(command.to_string()),
            enabled,
            ..Self::default()
        }
    }

    /// Creates a container record holding `items`.
    pub fn group(id: Uuid, name: &str, items: Vec<Self>) -> Self {
        Self {
            id,
            command: Some(name.to_string()),
            items: Some(items),
            ..Self::default()
        }
    }

    /// Creates empty project data for the project `id`.
    pub fn empty_project(id: Uuid) -> Self {
        Self {
            id,
            items: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Returns `true` for groups and projects.
    pub fn is_container(&self) -> bool {
        self.items.is_some()
    }

    /// Children of a container, empty for leaves.
    pub fn children(&self) -> &[Self] {
        self.items.as_deref().unwrap_or_default()
    }

    /// All descendants in pre-order, without `self`.
    pub fn all_items(&self) -> Vec<&Self> {
        let mut result = Vec::new();
        let mut stack: Vec<&Self> = self.children().iter().rev().collect();
        while let Some(item) = stack.pop() {
            result.push(item);
            stack.extend(item.children().iter().rev());
        }
        result
    }

    /// All leaf descendants in pre-order.
    pub fn all_parameters(&self) -> Vec<&Self> {
        self.all_items()
            .into_iter()
            .filter(|item| !item.is_container())
            .collect()
    }

    /// All container descendants in pre-order.
    pub fn all_containers(&self) -> Vec<&Self> {
        self.all_items()
            .into_iter()
            .filter(|item| item.is_container())
            .collect()
    }
}

/// On-disk shape of a project file: the project record plus its format version.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectFileJson {
    #[serde(default)]
    pub file_version: u32,
    #[serde(flatten)]
    pub data: ProjectDataJson,
}

impl From<ProjectDataJson> for ProjectFileJson {
    fn from(data: ProjectDataJson) -> Self {
        Self {
            file_version: FILE_VERSION,
            data,
        }
    }
}

/// On-disk shape of the solution-wide `<solution>.args.json`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct SolutionDataJson {
    #[serde(default = "file_version")]
    pub file_version: u32,
    #[serde(default)]
    pub project_arguments: Vec<ProjectDataJson>,
}

impl Default for SolutionDataJson {
    fn default() -> Self {
        Self {
            file_version: FILE_VERSION,
            project_arguments: Vec::new(),
        }
    }
}

// --- SETTINGS ---

/// Solution-level settings. Every `Some` overrides the matching global option.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SettingsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_command_line_args: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_environment_vars: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_working_directories: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_launch_application: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_custom_json_root: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_root_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_support_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_solution_dir: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_evaluation_enabled: Option<bool>,
}

// --- SOLUTION STATE ("suo" blob) ---

/// Per-user solution state: UI bits keyed by item id plus a full copy of every
/// project's data for when VCS support is off.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SuoDataJson {
    #[serde(default)]
    pub file_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub show_all_projects: bool,
    #[serde(default)]
    pub selected_items: BTreeSet<Uuid>,
    #[serde(default)]
    pub checked_arguments: BTreeSet<Uuid>,
    #[serde(default)]
    pub expanded_container: BTreeSet<Uuid>,
    #[serde(default)]
    pub project_arguments: BTreeMap<Uuid, ProjectDataJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsJson>,
}

impl Default for SuoDataJson {
    fn default() -> Self {
        Self {
            file_version: FILE_VERSION,
            is_enabled: None,
            show_all_projects: false,
            selected_items: BTreeSet::new(),
            checked_arguments: BTreeSet::new(),
            expanded_container: BTreeSet::new(),
            project_arguments: BTreeMap::new(),
            settings: None,
        }
    }
}

// --- SERDE HELPERS ---

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

pub(crate) fn is_default_delimiter(value: &str) -> bool {
    value == DEFAULT_DELIMITER
}

fn file_version() -> u32 {
    FILE_VERSION
}

/// A malformed or null id gets replaced instead of failing the whole file.
fn deserialize_id_or_new<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let parsed = raw.as_str().and_then(|s| Uuid::parse_str(s).ok());
    if parsed.is_none() {
        log::warn!("Item id '{}' is not a valid GUID, assigning a new one.", raw);
    }
    Ok(parsed.unwrap_or_else(Uuid::new_v4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_defaults_are_omitted_when_serializing() {
        // --- Setup ---
        let id = Uuid::new_v4();
        let item = CmdItemJson::parameter(id, ParamType::CmdArg, "--verbose", true);

        // --- Execute ---
        let json = serde_json::to_value(&item).unwrap();

        // --- Assert ---
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2, "Only Id and Command expected, got {json}");
        assert_eq!(object["Command"], "--verbose");
        assert_eq!(object["Id"], id.to_string());
    }

    #[test]
    fn test_param_type_is_persisted_as_integer() {
        // --- Setup ---
        let item = CmdItemJson::parameter(Uuid::new_v4(), ParamType::EnvVar, "A=1", false);

        // --- Execute ---
        let json = serde_json::to_value(&item).unwrap();
        let back: CmdItemJson = serde_json::from_value(json.clone()).unwrap();

        // --- Assert ---
        assert_eq!(json["Type"], 1);
        assert_eq!(back.param_type, ParamType::EnvVar);
    }

    #[test]
    fn test_invalid_id_is_replaced_with_fresh_one() {
        // --- Setup ---
        let json = r#"{ "Id": "not-a-guid", "Command": "x" }"#;

        // --- Execute ---
        let item: CmdItemJson = serde_json::from_str(json).unwrap();

        // --- Assert ---
        assert!(!item.id.is_nil());
        assert_eq!(item.command.as_deref(), Some("x"));
        assert_eq!(item.delimiter, " ");
    }

    #[test]
    fn test_project_file_carries_version_and_flattened_data() {
        // --- Setup ---
        let project_id = Uuid::new_v4();
        let mut data = CmdItemJson::empty_project(project_id);
        data.items = Some(vec![CmdItemJson::parameter(
            Uuid::new_v4(),
            ParamType::CmdArg,
            "a",
            false,
        )]);

        // --- Execute ---
        let json = serde_json::to_string(&ProjectFileJson::from(data)).unwrap();
        let back: ProjectFileJson = serde_json::from_str(&json).unwrap();

        // --- Assert ---
        assert!(json.contains("\"FileVersion\":2"));
        assert_eq!(back.file_version, 2);
        assert_eq!(back.data.id, project_id);
        assert_eq!(back.data.children().len(), 1);
    }

    #[test]
    fn test_all_items_walks_in_pre_order() {
        // --- Setup ---
        let leaf = |name: &str| CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, name, false);
        let mut project = CmdItemJson::empty_project(Uuid::new_v4());
        project.items = Some(vec![
            CmdItemJson::group(Uuid::new_v4(), "g", vec![leaf("a"), leaf("b")]),
            leaf("c"),
        ]);

        // --- Execute ---
        let names: Vec<_> = project
            .all_items()
            .iter()
            .map(|item| item.command.clone().unwrap_or_default())
            .collect();

        // --- Assert ---
        assert_eq!(names, vec!["g", "a", "b", "c"]);
        assert_eq!(project.all_parameters().len(), 3);
        assert_eq!(project.all_containers().len(), 1);
    }
}
