use std::path::PathBuf;
use std::sync::RwLock;

/// Workspace view provided by the debugging host.
pub trait WorkspaceHost: Send + Sync {
    /// Currently open workspace folders, in host order.
    fn workspace_folders(&self) -> Vec<PathBuf>;
}

/// Folder list owned by the embedding application.
///
/// The application updates it with [`WorkspaceFolders::set`] and then notifies
/// the logger through `on_workspace_folders_changed`.
#[derive(Debug, Default)]
pub struct WorkspaceFolders {
    folders: RwLock<Vec<PathBuf>>,
}

impl WorkspaceFolders {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders: RwLock::new(folders),
        }
    }

    pub fn set(&self, folders: Vec<PathBuf>) {
        match self.folders.write() {
            Ok(mut guard) => *guard = folders,
            Err(poisoned) => *poisoned.into_inner() = folders,
        }
    }
}

impl WorkspaceHost for WorkspaceFolders {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        match self.folders.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
