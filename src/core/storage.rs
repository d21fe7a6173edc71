// src/core/storage.rs

//! The shared JSON store: where project data lives on disk and how changes to
//! it are reported back.

use crate::constants::{PROJECT_FILE_SUFFIX, SOLUTION_FILE_EXTENSION};
use crate::core::backend::ProjectInfo;
use crate::core::node::NodeId;
use crate::core::settings::SettingsError;
use crate::models::{ProjectDataJson, SettingsJson};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No solution file is open.")]
    NoSolution,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which file a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeScope {
    /// The JSON file of one project.
    Project(NodeId),
    /// The solution-wide JSON file.
    Solution,
    /// The solution settings file.
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
}

/// Raised when a watched file changed on disk by someone other than the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStorageChanged {
    pub scope: ChangeScope,
    pub kind: ChangeKind,
}

impl FileStorageChanged {
    pub fn is_solution_wide(&self) -> bool {
        self.scope == ChangeScope::Solution
    }
}

/// Persistent store for project data and solution settings.
pub trait FileStorage {
    /// Reads the data of `project`. Missing or unreadable files yield `None`.
    fn read_project_data(&self, project: &ProjectInfo) -> Option<ProjectDataJson>;

    /// Persists one project. With the solution-wide file every project in
    /// `all_projects` is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be written or deleted.
    fn save_project_data(
        &self,
        project: &ProjectInfo,
        data: &ProjectDataJson,
        all_projects: &[ProjectDataJson],
    ) -> StorageResult<()>;

    /// Persists every project.
    fn save_all_projects(&self, projects: &[(ProjectInfo, ProjectDataJson)]) -> StorageResult<()>;

    /// Moves the project file after the project was renamed or moved.
    fn rename_project(&self, project: &ProjectInfo, old_dir: &Path, old_name: &str) -> StorageResult<()>;

    fn read_settings(&self) -> StorageResult<Option<SettingsJson>>;

    fn save_settings(&self, settings: &SettingsJson) -> StorageResult<()>;
}

/// `<dir>/<name>.args.json`.
pub fn project_file_path(project_dir: &Path, project_name: &str) -> PathBuf {
    project_dir.join(format!("{project_name}{PROJECT_FILE_SUFFIX}"))
}

/// `<solution dir>/<solution name>.args.json`.
pub fn solution_file_path(solution_file: &Path) -> PathBuf {
    solution_file.with_extension(SOLUTION_FILE_EXTENSION)
}

/// Whether a project with `data` should have a file at all.
pub fn should_write(data: &ProjectDataJson, delete_empty_files: bool) -> bool {
    !data.children().is_empty() || !delete_empty_files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CmdItemJson, ParamType};
    use uuid::Uuid;

    #[test]
    fn test_file_names() {
        assert_eq!(
            project_file_path(Path::new("/src/app"), "App"),
            PathBuf::from("/src/app/App.args.json")
        );
        assert_eq!(
            solution_file_path(Path::new("/src/Big.sln")),
            PathBuf::from("/src/Big.args.json")
        );
    }

    #[test]
    fn test_empty_projects_are_only_written_when_kept() {
        // --- Setup ---
        let empty = CmdItemJson::empty_project(Uuid::new_v4());
        let mut filled = empty.clone();
        filled.items = Some(vec![CmdItemJson::parameter(Uuid::new_v4(), ParamType::CmdArg, "a", false)]);

        // --- Execute & Assert ---
        assert!(!should_write(&empty, true));
        assert!(should_write(&empty, false));
        assert!(should_write(&filled, true));
    }
}
