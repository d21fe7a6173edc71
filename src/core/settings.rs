// src/core/settings.rs

//! Two-layer configuration: user-wide options in a TOML file, optionally
//! overridden per solution by a `<solution>.ArgsCfg.json` file.

use crate::constants::{CONFIG_DIR_NAME, OPTIONS_FILENAME, SOLUTION_SETTINGS_EXTENSION};
use crate::core::backend::ManagedKinds;
use crate::models::SettingsJson;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse options file '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize options: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Failed to read solution settings '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SettingsError + '_ {
    move |source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Returns the configuration directory (`~/.config/smartargs`), creating it if needed.
///
/// The path is computed once and cached for the rest of the process.
pub fn config_dir() -> SettingsResult<PathBuf> {
    let mut cached = CONFIG_DIR.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    // 1. Locate the system config directory.
    let path = dirs::config_dir()
        .ok_or(SettingsError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);

    // 2. Make sure it exists.
    if !path.exists() {
        fs::create_dir_all(&path).map_err(io_error(&path))?;
    }

    // 3. Cache it.
    *cached = Some(path.clone());
    Ok(path)
}

/// Path of the global options file.
pub fn options_path() -> SettingsResult<PathBuf> {
    config_dir().map(|dir| dir.join(OPTIONS_FILENAME))
}

// --- GLOBAL OPTIONS ---

/// Base directory for relative paths found in parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelativePathRoot {
    #[default]
    BuildTargetDirectory,
    ProjectDirectory,
}

/// Where parameters that don't take part in the launch get greyed out.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InactiveDisableMode {
    Disabled,
    #[default]
    InStartupProject,
    InAllProjects,
}

/// User-wide options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalOptions {
    pub vcs_support_enabled: bool,
    pub macro_evaluation_enabled: bool,
    pub use_solution_dir: bool,
    pub manage_command_line_args: bool,
    pub manage_environment_vars: bool,
    pub manage_working_directories: bool,
    pub manage_launch_application: bool,
    pub delete_empty_files_automatically: bool,
    pub save_settings_to_json: bool,
    pub relative_path_root: RelativePathRoot,
    pub disable_inactive_items: InactiveDisableMode,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            vcs_support_enabled: true,
            macro_evaluation_enabled: true,
            use_solution_dir: false,
            manage_command_line_args: true,
            manage_environment_vars: false,
            manage_working_directories: false,
            manage_launch_application: false,
            delete_empty_files_automatically: true,
            save_settings_to_json: false,
            relative_path_root: RelativePathRoot::default(),
            disable_inactive_items: InactiveDisableMode::default(),
        }
    }
}

impl GlobalOptions {
    /// Loads the options from the user config dir. A missing file yields the defaults.
    pub fn load() -> SettingsResult<Self> {
        Self::load_from(&options_path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load_from(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            log::debug!("No options file at '{}', using defaults.", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(io_error(path))?;
        toml::from_str(&content).map_err(|source| SettingsError::TomlParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self) -> SettingsResult<()> {
        self.save_to(&options_path()?)
    }

    pub fn save_to(&self, path: &Path) -> SettingsResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_error(path))
    }
}

// --- SOLUTION SETTINGS ---

/// `<solution dir>/<solution name>.ArgsCfg.json` for a solution file.
pub fn solution_settings_path(solution_file: &Path) -> PathBuf {
    solution_file.with_extension(SOLUTION_SETTINGS_EXTENSION)
}

/// Reads the solution settings. A missing file yields `None`.
pub fn read_solution_settings(path: &Path) -> SettingsResult<Option<SettingsJson>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| SettingsError::Json {
            path: path.display().to_string(),
            source,
        })
}

/// Writes the solution settings, or deletes the file when nothing is overridden.
pub fn save_solution_settings(path: &Path, settings: &SettingsJson) -> SettingsResult<()> {
    let content = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Json {
        path: path.display().to_string(),
        source,
    })?;

    if content == "{}" {
        if path.exists() {
            log::info!("Solution settings are all defaults, deleting '{}'.", path.display());
            fs::remove_file(path).map_err(io_error(path))?;
        }
        return Ok(());
    }
    fs::write(path, content).map_err(io_error(path))
}

// --- EFFECTIVE SETTINGS ---

/// Settings after applying the solution overrides to the global options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub vcs_support_enabled: bool,
    pub macro_evaluation_enabled: bool,
    pub use_solution_dir: bool,
    pub manage_command_line_args: bool,
    pub manage_environment_vars: bool,
    pub manage_working_directories: bool,
    pub manage_launch_application: bool,
    pub delete_empty_files_automatically: bool,
    pub relative_path_root: RelativePathRoot,
    pub disable_inactive_items: InactiveDisableMode,
    /// Directory the JSON files are stored in instead of next to the projects.
    pub json_root_path: Option<PathBuf>,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self::resolve(&GlobalOptions::default(), None)
    }
}

impl EffectiveSettings {
    /// Resolves both layers. Every `Some` of the solution layer wins.
    pub fn resolve(global: &GlobalOptions, solution: Option<&SettingsJson>) -> Self {
        let empty = SettingsJson::default();
        let solution = solution.unwrap_or(&empty);
        Self {
            vcs_support_enabled: solution.vcs_support_enabled.unwrap_or(global.vcs_support_enabled),
            macro_evaluation_enabled: solution
                .macro_evaluation_enabled
                .unwrap_or(global.macro_evaluation_enabled),
            use_solution_dir: solution.use_solution_dir.unwrap_or(global.use_solution_dir),
            manage_command_line_args: solution
                .manage_command_line_args
                .unwrap_or(global.manage_command_line_args),
            manage_environment_vars: solution
                .manage_environment_vars
                .unwrap_or(global.manage_environment_vars),
            manage_working_directories: solution
                .manage_working_directories
                .unwrap_or(global.manage_working_directories),
            manage_launch_application: solution
                .manage_launch_application
                .unwrap_or(global.manage_launch_application),
            delete_empty_files_automatically: global.delete_empty_files_automatically,
            relative_path_root: global.relative_path_root,
            disable_inactive_items: global.disable_inactive_items,
            json_root_path: solution
                .json_root_path
                .as_ref()
                .filter(|path| solution.use_custom_json_root && !path.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Launch configuration parts this crate is allowed to manage.
    pub fn managed_kinds(&self) -> ManagedKinds {
        ManagedKinds {
            command_line: self.manage_command_line_args,
            env_vars: self.manage_environment_vars,
            work_dir: self.manage_working_directories,
            launch_app: self.manage_launch_application,
        }
    }
}
