// src/core/evaluation.rs

//! Value-level helpers: macro expansion, env var parsing, shell-word splitting
//! and path extraction from parameters.

use crate::constants::TARGET_DIR_PROPERTY;
use crate::core::backend::PropertyLookup;
use crate::core::node::NodeId;
use crate::core::settings::{EffectiveSettings, RelativePathRoot};
use crate::core::tree::Tree;
use crate::models::ParamType;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

lazy_static! {
    // Innermost `$(Name)`: the name holds neither `)` nor the start of another macro.
    static ref MACRO_RE: Regex =
        Regex::new(r"\$\(((?:[^)$]|\$[^()])*)\)").expect("macro regex is valid");
    // A shell word: quoted runs (with `""` or `\"` escapes) glued to unquoted runs.
    static ref ARGUMENT_RE: Regex =
        Regex::new(r#"(?:"(?:""|\\"|[^"])*"?|[^\s"]+)+"#).expect("argument regex is valid");
    static ref CMD_ESCAPE_RE: Regex = Regex::new(r"([&|(=<>^])").expect("cmd escape regex is valid");
}

/// An environment variable parsed from a `NAME=value` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Splits `NAME=value` at the first `=`. Returns `None` when there is no `=`.
pub fn try_parse_env_var(value: &str) -> Option<EnvVar> {
    value.split_once('=').map(|(name, value)| EnvVar {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Splits an argument string into shell words, keeping the quotes.
pub fn split_argument(argument: &str) -> Vec<String> {
    ARGUMENT_RE
        .find_iter(argument)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Renders env vars as PowerShell assignments: `$env:A = '1'; $env:B = '2';`.
pub fn env_vars_for_powershell(vars: &BTreeMap<String, String>) -> String {
    vars.iter()
        .map(|(name, value)| format!("$env:{} = '{}';", name, value.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders env vars as CMD `set` commands chained with `&&`.
pub fn env_vars_for_cmd(vars: &BTreeMap<String, String>) -> String {
    vars.iter()
        .map(|(name, value)| format!("set {}={}", name, CMD_ESCAPE_RE.replace_all(value, "^$1")))
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Collapses `.` and `..` components without touching the file system.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            other => result.push(other),
        }
    }
    result
}

/// Evaluates parameter values against the build properties of their project.
pub struct Evaluator<'a> {
    settings: &'a EffectiveSettings,
    properties: &'a dyn PropertyLookup,
}

impl std::fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator").field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(settings: &'a EffectiveSettings, properties: &'a dyn PropertyLookup) -> Self {
        Self { settings, properties }
    }

    /// Replaces every resolvable `$(Name)` in `value`. Unknown names stay verbatim.
    pub fn evaluate_macros(&self, value: &str, project: NodeId) -> String {
        if !self.settings.macro_evaluation_enabled {
            return value.to_string();
        }

        MACRO_RE
            .replace_all(value, |caps: &Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                caps.get(1)
                    .and_then(|name| self.properties.property(project, name.as_str()))
                    .unwrap_or_else(|| whole.to_string())
            })
            .into_owned()
    }

    /// Makes `path` absolute against the configured root.
    ///
    /// # Arguments
    ///
    /// * `path` - The path, possibly relative.
    /// * `project` - The project whose properties are consulted.
    /// * `project_dir` - Directory of the project file, if known.
    /// * `build_config` - Explicit configuration for the target dir lookup.
    ///
    /// Returns `None` when the path is relative and no base directory is known.
    pub fn make_path_absolute(
        &self,
        path: &str,
        project: NodeId,
        project_dir: Option<&Path>,
        build_config: Option<&str>,
    ) -> Option<PathBuf> {
        let path = Path::new(path);
        if path.is_absolute() {
            return Some(dunce::simplified(&normalize_lexically(path)).to_path_buf());
        }

        let base = match self.settings.relative_path_root {
            RelativePathRoot::ProjectDirectory => project_dir.map(Path::to_path_buf),
            RelativePathRoot::BuildTargetDirectory => match build_config {
                Some(config) => self.properties.property_for_config(project, TARGET_DIR_PROPERTY, config),
                None => self.properties.property(project, TARGET_DIR_PROPERTY),
            }
            .map(PathBuf::from),
        }?;

        Some(dunce::simplified(&normalize_lexically(&base.join(path))).to_path_buf())
    }

    /// Paths mentioned by a parameter, made absolute.
    ///
    /// Command line arguments contribute each shell word, env vars their value
    /// and working directories the whole value. Launch apps contribute nothing.
    pub fn extract_paths(&self, tree: &Tree, item: NodeId, project_dir: Option<&Path>) -> Vec<PathBuf> {
        let (Some(node), Some(project)) = (tree.get(item), tree.project_of(item)) else {
            return Vec::new();
        };
        if project.is_nil() {
            return Vec::new();
        }

        let parts = match node.param_type() {
            Some(ParamType::CmdArg) => split_argument(&self.evaluate_macros(node.value(), project)),
            Some(ParamType::EnvVar) => try_parse_env_var(node.value())
                .map(|var| vec![self.evaluate_macros(&var.value, project)])
                .unwrap_or_default(),
            Some(ParamType::WorkDir) => vec![self.evaluate_macros(node.value(), project)],
            Some(ParamType::LaunchApp) | None => Vec::new(),
        };

        let build_config = tree.used_project_config(item);
        parts
            .iter()
            .map(|part| part.trim_matches('"'))
            .filter(|part| !part.is_empty())
            .filter(|part| !part.chars().any(|c| matches!(c, '"' | '<' | '>' | '|') || c.is_control()))
            .filter_map(|part| self.make_path_absolute(part, project, project_dir, build_config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{NoProperties, StaticProperties};
    use crate::core::tree::tests::project_with_group;

    fn properties() -> StaticProperties {
        [
            ("PropertyName".to_string(), "PropertyValue".to_string()),
            ("TargetDir".to_string(), "/build/out".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_env_var_parsing() {
        assert_eq!(try_parse_env_var("InvalidString"), None);
        assert_eq!(
            try_parse_env_var("Name=Value=2"),
            Some(EnvVar {
                name: "Name".into(),
                value: "Value=2".into()
            })
        );
    }

    #[test]
    fn test_macros_resolve_or_stay_verbatim() {
        // --- Setup ---
        let settings = EffectiveSettings::default();
        let props = properties();
        let evaluator = Evaluator::new(&settings, &props);
        let project = NodeId::new_v4();

        // --- Execute & Assert ---
        assert_eq!(evaluator.evaluate_macros("$(PropertyName)", project), "PropertyValue");
        assert_eq!(evaluator.evaluate_macros("$(Missing)", project), "$(Missing)");
        assert_eq!(
            evaluator.evaluate_macros("$(A$(PropertyName))", project),
            "$(APropertyValue)",
            "Only the innermost macro is expanded"
        );
    }

    #[test]
    fn test_macros_disabled() {
        // --- Setup ---
        let settings = EffectiveSettings {
            macro_evaluation_enabled: false,
            ..EffectiveSettings::default()
        };
        let props = properties();
        let evaluator = Evaluator::new(&settings, &props);

        // --- Execute ---
        let result = evaluator.evaluate_macros("$(PropertyName)", NodeId::new_v4());

        // --- Assert ---
        assert_eq!(result, "$(PropertyName)");
    }

    #[test]
    fn test_split_argument_keeps_quoted_words() {
        assert_eq!(split_argument("\"Arg1 Arg2\" Arg3"), vec!["\"Arg1 Arg2\"", "Arg3"]);
        assert_eq!(split_argument("Arg1 Arg2 Arg3"), vec!["Arg1", "Arg2", "Arg3"]);
        assert_eq!(split_argument("--out=\"a b\""), vec!["--out=\"a b\""]);
        assert!(split_argument("").is_empty());
    }

    #[test]
    fn test_env_var_formatters() {
        // --- Setup ---
        let vars: BTreeMap<String, String> = [
            ("A".to_string(), "it's".to_string()),
            ("B".to_string(), "x&y=1".to_string()),
        ]
        .into_iter()
        .collect();

        // --- Execute & Assert ---
        assert_eq!(env_vars_for_powershell(&vars), "$env:A = 'it''s'; $env:B = 'x&y=1';");
        assert_eq!(env_vars_for_cmd(&vars), "set A=it's && set B=x^&y^=1");
    }

    #[test]
    fn test_extract_paths_per_parameter_type() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, _) = project_with_group(&mut tree, &[]);
        let arg = tree.create_parameter(ParamType::CmdArg, "-i \"$(PropertyName)\"", true);
        let env = tree.create_parameter(ParamType::EnvVar, "Name=\"data/../in.txt\"", true);
        let app = tree.create_parameter(ParamType::LaunchApp, "tool.exe", true);
        tree.add_range(group, vec![arg, env, app]).unwrap();
        let settings = EffectiveSettings::default();
        let props = properties();
        let evaluator = Evaluator::new(&settings, &props);

        // --- Execute ---
        let arg_paths = evaluator.extract_paths(&tree, arg, None);
        let env_paths = evaluator.extract_paths(&tree, env, None);
        let app_paths = evaluator.extract_paths(&tree, app, None);

        // --- Assert ---
        assert_eq!(
            arg_paths,
            vec![PathBuf::from("/build/out/-i"), PathBuf::from("/build/out/PropertyValue")]
        );
        assert_eq!(env_paths, vec![PathBuf::from("/build/out/in.txt")]);
        assert!(app_paths.is_empty());
    }

    #[test]
    fn test_extract_paths_relative_to_project_dir() {
        // --- Setup ---
        let mut tree = Tree::new();
        let (_, group, _) = project_with_group(&mut tree, &[]);
        let workdir = tree.create_parameter(ParamType::WorkDir, "./run", true);
        let invalid = tree.create_parameter(ParamType::CmdArg, "some<Arg", true);
        tree.add_range(group, vec![workdir, invalid]).unwrap();
        let settings = EffectiveSettings {
            relative_path_root: RelativePathRoot::ProjectDirectory,
            ..EffectiveSettings::default()
        };
        let evaluator = Evaluator::new(&settings, &NoProperties);

        // --- Execute ---
        let with_dir = evaluator.extract_paths(&tree, workdir, Some(Path::new("/src/app")));
        let without_dir = evaluator.extract_paths(&tree, workdir, None);
        let invalid_paths = evaluator.extract_paths(&tree, invalid, Some(Path::new("/src/app")));

        // --- Assert ---
        assert_eq!(with_dir, vec![PathBuf::from("/src/app/run")]);
        assert!(without_dir.is_empty());
        assert!(invalid_paths.is_empty());
    }
}
