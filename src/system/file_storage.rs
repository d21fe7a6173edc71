// src/system/file_storage.rs

//! [`FileStorage`] on the real file system.
//!
//! Project data lives either in one `<project>.args.json` per project or, with
//! `use_solution_dir`, in a single `<solution>.args.json` next to the solution
//! file. A custom JSON root moves both into another directory.

use crate::constants::{JSON_FILE_PROPERTY, PROJECT_FILE_SUFFIX};
use crate::core::backend::{ProjectInfo, PropertyLookup};
use crate::core::node::NodeId;
use crate::core::serializer::{parse_project_file, parse_solution_file, project_file_to_string, solution_file_to_string};
use crate::core::settings::{EffectiveSettings, read_solution_settings, save_solution_settings, solution_settings_path};
use crate::core::storage::{
    FileStorage, StorageError, StorageResult, project_file_path, should_write, solution_file_path,
};
use crate::models::{ProjectDataJson, SettingsJson, SolutionDataJson};
use crate::system::watcher::Suppressor;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> StorageError + '_ {
    move |source| StorageError::Json {
        path: path.display().to_string(),
        source,
    }
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    if path.exists() {
        log::info!("Deleting '{}' because it holds no items.", path.display());
        fs::remove_file(path).map_err(io_error(path))?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct JsonFileStorage {
    solution_file: Option<PathBuf>,
    settings: EffectiveSettings,
    /// Per-project file locations set through the JSON file property.
    overrides: HashMap<NodeId, PathBuf>,
    suppressor: Suppressor,
}

impl JsonFileStorage {
    pub fn new(solution_file: Option<PathBuf>, settings: EffectiveSettings, suppressor: Suppressor) -> Self {
        Self {
            solution_file,
            settings,
            overrides: HashMap::new(),
            suppressor,
        }
    }

    pub fn set_settings(&mut self, settings: EffectiveSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &EffectiveSettings {
        &self.settings
    }

    pub fn solution_dir(&self) -> Option<&Path> {
        self.solution_file.as_deref().and_then(Path::parent)
    }

    /// Re-reads the JSON file property of `project`. A relative value is taken
    /// relative to the project directory.
    pub fn refresh_override(&mut self, project: &ProjectInfo, properties: &dyn PropertyLookup) {
        let value = properties
            .property(project.id, JSON_FILE_PROPERTY)
            .filter(|value| !value.trim().is_empty());
        match value {
            Some(value) => {
                let path = project.dir.join(value.trim());
                let path = dunce::simplified(&path).to_path_buf();
                log::info!(
                    "'{}' property of project '{}' redirects its JSON file to '{}'.",
                    JSON_FILE_PROPERTY,
                    project.name,
                    path.display()
                );
                self.overrides.insert(project.id, path);
            }
            None => {
                self.overrides.remove(&project.id);
            }
        }
    }

    /// Directory that replaces the default locations, resolved against the
    /// solution directory.
    fn json_root(&self) -> Option<PathBuf> {
        let root = self.settings.json_root_path.as_ref()?;
        if root.is_absolute() {
            return Some(root.clone());
        }
        self.solution_dir().map(|dir| dir.join(root))
    }

    /// Where the JSON file of `project` lives.
    pub fn project_file(&self, project: &ProjectInfo) -> PathBuf {
        if let Some(path) = self.overrides.get(&project.id) {
            return path.clone();
        }
        match self.json_root() {
            Some(root) => root.join(format!("{}{PROJECT_FILE_SUFFIX}", project.name)),
            None => project_file_path(&project.dir, &project.name),
        }
    }

    /// Where the solution-wide JSON file lives.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSolution`] when no solution is open.
    pub fn solution_data_file(&self) -> StorageResult<PathBuf> {
        let solution_file = self.solution_file.as_deref().ok_or(StorageError::NoSolution)?;
        let default = solution_file_path(solution_file);
        match (self.json_root(), default.file_name()) {
            (Some(root), Some(name)) => Ok(root.join(name)),
            _ => Ok(default),
        }
    }

    pub fn settings_file(&self) -> Option<PathBuf> {
        self.solution_file.as_deref().map(solution_settings_path)
    }

    fn read_solution_data(&self) -> StorageResult<Option<SolutionDataJson>> {
        let path = self.solution_data_file()?;
        if !path.exists() {
            log::info!("JSON file '{}' doesn't exist.", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(io_error(&path))?;
        parse_solution_file(&content).map(Some).map_err(json_error(&path))
    }

    fn read_project_file(path: &Path) -> StorageResult<Option<ProjectDataJson>> {
        if !path.exists() {
            log::info!("JSON file '{}' doesn't exist.", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(io_error(path))?;
        parse_project_file(&content).map(Some).map_err(json_error(path))
    }

    fn write_project_file(&self, path: &Path, data: &ProjectDataJson) -> StorageResult<()> {
        let _quiet = self.suppressor.suppress();
        if !should_write(data, self.settings.delete_empty_files_automatically) {
            return remove_if_exists(path);
        }
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_error(dir))?;
        }
        let content = project_file_to_string(data).map_err(json_error(path))?;
        fs::write(path, content).map_err(io_error(path))?;
        log::debug!("Wrote {} items to '{}'.", data.children().len(), path.display());
        Ok(())
    }

    fn write_solution_file(&self, projects: Vec<ProjectDataJson>) -> StorageResult<()> {
        let path = self.solution_data_file()?;
        let _quiet = self.suppressor.suppress();
        let any_items = projects.iter().any(|data| !data.children().is_empty());
        if !any_items && self.settings.delete_empty_files_automatically {
            return remove_if_exists(&path);
        }
        let data = SolutionDataJson {
            project_arguments: projects,
            ..SolutionDataJson::default()
        };
        let content = solution_file_to_string(&data).map_err(json_error(&path))?;
        fs::write(&path, content).map_err(io_error(&path))?;
        log::debug!("Wrote {} projects to '{}'.", data.project_arguments.len(), path.display());
        Ok(())
    }

    /// Deletes the files of the layout that is not in use, if empty-file
    /// deletion is on.
    pub fn delete_unused_files(&self, projects: &[ProjectInfo]) {
        if !self.settings.delete_empty_files_automatically {
            return;
        }
        let unused: Vec<PathBuf> = if self.settings.use_solution_dir {
            projects.iter().map(|project| self.project_file(project)).collect()
        } else {
            self.solution_data_file().into_iter().collect()
        };
        let _quiet = self.suppressor.suppress();
        for path in unused {
            if let Err(e) = remove_if_exists(&path) {
                log::warn!("Couldn't delete '{}': {}", path.display(), e);
            }
        }
    }
}

impl FileStorage for JsonFileStorage {
    fn read_project_data(&self, project: &ProjectInfo) -> Option<ProjectDataJson> {
        let result = if self.settings.use_solution_dir {
            self.read_solution_data().map(|solution| {
                solution.and_then(|solution| {
                    solution
                        .project_arguments
                        .into_iter()
                        .find(|data| data.id == project.id)
                })
            })
        } else {
            Self::read_project_file(&self.project_file(project))
        };

        match result {
            Ok(data) => {
                if let Some(data) = &data {
                    log::info!("Read {} items for project '{}'.", data.children().len(), project.name);
                }
                data
            }
            Err(e) => {
                log::warn!("Failed to read data of project '{}': {}", project.name, e);
                None
            }
        }
    }

    fn save_project_data(
        &self,
        project: &ProjectInfo,
        data: &ProjectDataJson,
        all_projects: &[ProjectDataJson],
    ) -> StorageResult<()> {
        if !self.settings.vcs_support_enabled {
            return Ok(());
        }
        if self.settings.use_solution_dir {
            self.write_solution_file(all_projects.to_vec())
        } else {
            self.write_project_file(&self.project_file(project), data)
        }
    }

    fn save_all_projects(&self, projects: &[(ProjectInfo, ProjectDataJson)]) -> StorageResult<()> {
        if !self.settings.vcs_support_enabled {
            return Ok(());
        }
        if self.settings.use_solution_dir {
            return self.write_solution_file(projects.iter().map(|(_, data)| data.clone()).collect());
        }
        for (info, data) in projects {
            self.write_project_file(&self.project_file(info), data)?;
        }
        Ok(())
    }

    fn rename_project(&self, project: &ProjectInfo, old_dir: &Path, old_name: &str) -> StorageResult<()> {
        if self.settings.use_solution_dir {
            return Ok(());
        }
        let new_file = self.project_file(project);
        let old_file = match self.json_root() {
            Some(root) if !self.overrides.contains_key(&project.id) => {
                root.join(format!("{old_name}{PROJECT_FILE_SUFFIX}"))
            }
            _ => project_file_path(old_dir, old_name),
        };
        if old_file == new_file {
            return Ok(());
        }

        log::info!("Renaming JSON file '{}' to '{}'.", old_file.display(), new_file.display());
        let _quiet = self.suppressor.suppress();
        if new_file.exists() {
            // The new name already has data. It wins over the stale file.
            remove_if_exists(&old_file)
        } else if old_file.exists() {
            fs::rename(&old_file, &new_file).map_err(io_error(&old_file))
        } else {
            Ok(())
        }
    }

    fn read_settings(&self) -> StorageResult<Option<SettingsJson>> {
        match self.settings_file() {
            Some(path) => Ok(read_solution_settings(&path)?),
            None => Ok(None),
        }
    }

    fn save_settings(&self, settings: &SettingsJson) -> StorageResult<()> {
        let path = self.settings_file().ok_or(StorageError::NoSolution)?;
        let _quiet = self.suppressor.suppress();
        Ok(save_solution_settings(&path, settings)?)
    }
}
