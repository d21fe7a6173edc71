// src/core/backend.rs

//! Interfaces of the host collaborators: the project system that owns the native
//! debug configuration, and the build-property lookup used for macros and paths.

use crate::core::node::NodeId;
use crate::models::CmdItemJson;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a host collaborator. Always logged, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The project is not known to the host (unloaded or mid-reload).
    #[error("Project '{0}' is not available.")]
    ProjectUnavailable(Uuid),
    /// The project type has no handler for debug settings.
    #[error("Project '{0}' is not a supported project type.")]
    Unsupported(Uuid),
    /// Any other failure, with the host's message.
    #[error("Project config backend failed: {0}")]
    Failed(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Host-side description of a loaded project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Project GUID. Nil while the host is unloading the project.
    pub id: Uuid,
    /// Project-type GUID.
    pub kind: Uuid,
    pub name: String,
    /// Directory containing the project file.
    pub dir: PathBuf,
}

/// Currently active build selection of a project. `None` means the host has no
/// such notion for this project and the matching filter is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveConfiguration {
    pub config: Option<String>,
    pub platform: Option<String>,
    pub launch_profile: Option<String>,
}

/// Which parts of the launch configuration are read from or pushed to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagedKinds {
    pub command_line: bool,
    pub env_vars: bool,
    pub work_dir: bool,
    pub launch_app: bool,
}

impl ManagedKinds {
    pub fn any(&self) -> bool {
        self.command_line || self.env_vars || self.work_dir || self.launch_app
    }
}

/// Aggregated launch configuration. `None` fields are left untouched by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchConfig {
    pub command_line: Option<String>,
    pub env_vars: Option<BTreeMap<String, String>>,
    pub work_dir: Option<String>,
    pub launch_app: Option<String>,
}

impl LaunchConfig {
    pub fn is_empty(&self) -> bool {
        self.command_line.is_none() && self.env_vars.is_none() && self.work_dir.is_none() && self.launch_app.is_none()
    }
}

/// The project system that stores the native debug settings.
pub trait ProjectConfigBackend {
    /// Whether the project type can carry debug settings at all.
    fn is_supported(&self, project: &ProjectInfo) -> bool;

    /// Active configuration, platform and launch profile of the project.
    fn active_configuration(&self, project: NodeId) -> ActiveConfiguration;

    /// Reads the native settings of the project as parameter records, used to
    /// seed a project that has no other data.
    ///
    /// # Errors
    ///
    /// Returns an error if the host can't read the project's settings.
    fn get_items(&self, project: &ProjectInfo, kinds: ManagedKinds) -> BackendResult<Vec<CmdItemJson>>;

    /// Writes the aggregated configuration into the project's native settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the write.
    fn set_config(&self, project: NodeId, config: &LaunchConfig) -> BackendResult<()>;
}

/// Build-property lookup (MSBuild-style `$(Name)` values).
pub trait PropertyLookup {
    /// Value of `name` for the project's active configuration.
    fn property(&self, project: NodeId, name: &str) -> Option<String>;

    /// Value of `name` for an explicit configuration.
    fn property_for_config(&self, project: NodeId, name: &str, config: &str) -> Option<String> {
        let _ = config;
        self.property(project, name)
    }
}

/// Lookup that knows no properties. Every macro stays verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProperties;

impl PropertyLookup for NoProperties {
    fn property(&self, _project: NodeId, _name: &str) -> Option<String> {
        None
    }
}

/// Lookup backed by a fixed map, shared by every project.
#[derive(Debug, Default, Clone)]
pub struct StaticProperties(pub BTreeMap<String, String>);

impl PropertyLookup for StaticProperties {
    fn property(&self, _project: NodeId, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

impl FromIterator<(String, String)> for StaticProperties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
