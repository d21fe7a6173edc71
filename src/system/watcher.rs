// src/system/watcher.rs

//! File system watchers on the JSON files of the store.
//!
//! Each watched file gets its own `notify` watcher on the containing directory,
//! filtered to the file name, so that files which don't exist yet are picked up
//! once created. Changes are forwarded as [`FileStorageChanged`] over a
//! `std::sync::mpsc` channel. Writes done by the store itself run under a
//! [`Suppressor`] guard and are not reported.

use crate::core::node::NodeId;
use crate::core::storage::{ChangeKind, ChangeScope, FileStorageChanged};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

pub type SuppressGuard = scopeguard::ScopeGuard<Arc<AtomicUsize>, fn(Arc<AtomicUsize>)>;

fn release(counter: Arc<AtomicUsize>) {
    counter.fetch_sub(1, Ordering::SeqCst);
}

/// Shared switch that mutes the watchers while the store writes.
#[derive(Debug, Clone, Default)]
pub struct Suppressor(Arc<AtomicUsize>);

impl Suppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutes every watcher sharing this suppressor until the guard drops. Nests.
    pub fn suppress(&self) -> SuppressGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        scopeguard::guard(Arc::clone(&self.0), release as fn(Arc<AtomicUsize>))
    }

    pub fn is_suppressed(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

/// Maps a raw `notify` event kind onto the changes the store cares about.
fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// Watches the project files, the solution file and the settings file.
#[derive(Debug)]
pub struct StorageWatcher {
    sender: Sender<FileStorageChanged>,
    suppressor: Suppressor,
    projects: HashMap<NodeId, RecommendedWatcher>,
    solution: Option<RecommendedWatcher>,
    settings: Option<RecommendedWatcher>,
}

impl StorageWatcher {
    pub fn new(sender: Sender<FileStorageChanged>, suppressor: Suppressor) -> Self {
        Self {
            sender,
            suppressor,
            projects: HashMap::new(),
            solution: None,
            settings: None,
        }
    }

    /// Starts watching the JSON file of `project`, replacing an older watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory of `file` can't be watched.
    pub fn watch_project(&mut self, project: NodeId, file: &Path) -> notify::Result<()> {
        let watcher = self.spawn(file, ChangeScope::Project(project))?;
        self.projects.insert(project, watcher);
        log::info!("Watching '{}' for project '{}'.", file.display(), project);
        Ok(())
    }

    pub fn unwatch_project(&mut self, project: NodeId) {
        if self.projects.remove(&project).is_some() {
            log::info!("Stopped watching the file of project '{}'.", project);
        }
    }

    /// Starts watching the solution-wide JSON file. Keeps an existing watcher.
    pub fn watch_solution(&mut self, file: &Path) -> notify::Result<()> {
        if self.solution.is_none() {
            self.solution = Some(self.spawn(file, ChangeScope::Solution)?);
            log::info!("Watching '{}' for the solution.", file.display());
        }
        Ok(())
    }

    /// Starts watching the solution settings file. Keeps an existing watcher.
    pub fn watch_settings(&mut self, file: &Path) -> notify::Result<()> {
        if self.settings.is_none() {
            self.settings = Some(self.spawn(file, ChangeScope::Settings)?);
            log::info!("Watching '{}' for settings.", file.display());
        }
        Ok(())
    }

    /// Drops every watcher (solution closed).
    pub fn unwatch_all(&mut self) {
        self.projects.clear();
        self.solution = None;
        self.settings = None;
    }

    pub fn is_watching_project(&self, project: NodeId) -> bool {
        self.projects.contains_key(&project)
    }

    fn spawn(&self, file: &Path, scope: ChangeScope) -> notify::Result<RecommendedWatcher> {
        // 1. Watch the real directory so symlinked files report their own events.
        let dir = file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let dir: PathBuf = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let name: Option<OsString> = file.file_name().map(OsString::from);

        // 2. Forward matching events unless the store itself is writing.
        let sender = self.sender.clone();
        let suppressor = self.suppressor.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        log::warn!("File watcher error: {}", e);
                        return;
                    }
                };
                let Some(kind) = classify(&event.kind) else {
                    return;
                };
                let touches_file = event.paths.iter().any(|path| path.file_name() == name.as_deref());
                if !touches_file {
                    return;
                }
                if suppressor.is_suppressed() {
                    log::debug!("Ignoring {:?} of {:?} during our own write.", kind, event.paths);
                    return;
                }
                log::info!("File {:?} changed on disk ({:?}).", event.paths, kind);
                if sender.send(FileStorageChanged { scope, kind }).is_err() {
                    log::debug!("File change dropped: receiver is gone.");
                }
            },
            Config::default(),
        )?;

        // 3. Non-recursive: the file lives directly in `dir`.
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}
