//! Session output logger.
//!
//! The host owns a single [`SessionOutputLogger`] for its whole lifetime and
//! forwards its callbacks into it:
//!
//! * workspace folder changes - [`SessionOutputLogger::on_workspace_folders_changed`],
//! * a new debugging session - [`SessionOutputLogger::on_debug_session_tracker_created`],
//! * every adapter message of that session - [`SessionTracker::on_did_send_message`].
//!
//! No callback ever returns an error: all file system failures are handed to a
//! [`FailurePolicy`] and the failed operation is skipped.

pub mod config;
pub mod error;
pub mod fs;
pub mod host;
pub mod policy;

pub use config::{Config, Placement};
pub use error::Error;
pub use fs::{LogFs, TokioFs};
pub use host::{WorkspaceFolders, WorkspaceHost};
pub use policy::{FailurePolicy, LogOnly};

use crate::dap::protocol::AdapterMessage;
use crate::{tap_debug, tap_info, tap_warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct State {
    workspace_root: Option<PathBuf>,
    log_file: Option<PathBuf>,
    dir_ensured: bool,
    /// Bumped on every `log_file` change.
    generation: u64,
}

impl State {
    fn set_log_file(&mut self, log_file: Option<PathBuf>) {
        self.log_file = log_file;
        self.dir_ensured = false;
        self.generation += 1;
    }

    /// Log file path, only if its directory is known to exist.
    fn ready_log_file(&self) -> Option<PathBuf> {
        if self.dir_ensured {
            self.log_file.clone()
        } else {
            None
        }
    }
}

pub struct SessionOutputLogger {
    host: Arc<dyn WorkspaceHost>,
    fs: Arc<dyn LogFs>,
    policy: Arc<dyn FailurePolicy>,
    config: Config,
    state: Mutex<State>,
}

impl SessionOutputLogger {
    /// Create a logger that writes through `tokio::fs` and logs failures.
    pub fn new(host: Arc<dyn WorkspaceHost>, config: Config) -> Self {
        Self::with_parts(host, config, Arc::new(TokioFs), Arc::new(LogOnly))
    }

    pub fn with_parts(
        host: Arc<dyn WorkspaceHost>,
        config: Config,
        fs: Arc<dyn LogFs>,
        policy: Arc<dyn FailurePolicy>,
    ) -> Self {
        Self {
            host,
            fs,
            policy,
            config,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // state is plain data, a panicked holder can't leave it half-updated
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current workspace root, if any.
    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.state().workspace_root.clone()
    }

    /// Current log file path, `None` while logging is paused.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.state().log_file.clone()
    }

    /// Return true if log file directory is known to exist.
    pub fn is_dir_ensured(&self) -> bool {
        self.state().dir_ensured
    }

    /// Start the logger.
    ///
    /// Directory creation runs as a detached task, the returned handle may be
    /// dropped. Must be called within a tokio runtime.
    pub fn activate(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        tap_info!(
            "output logger activated, log placement: {}",
            self.config.placement
        );
        let handle = self.refresh_workspace();
        if handle.is_none() {
            tap_warn!("no workspace folder is open, output logging paused until one appears");
        }
        handle
    }

    /// Host callback: the list of workspace folders changed.
    pub fn on_workspace_folders_changed(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let handle = self.refresh_workspace();
        if handle.is_none() {
            tap_info!("workspace closed, output logging paused");
        }
        handle
    }

    /// Host callback: a new debugging session started.
    ///
    /// Resets the log file and returns the tracker that receives the session's
    /// adapter messages.
    pub async fn on_debug_session_tracker_created(self: &Arc<Self>) -> SessionTracker {
        self.reset_log_file().await;
        SessionTracker {
            logger: Arc::clone(self),
        }
    }

    /// Append raw text to the log file.
    pub async fn append_output(&self, text: &str) {
        if self.log_file().is_none() && !self.resolve_workspace() {
            self.policy.on_failure(&Error::NoWorkspace);
            return;
        }

        if let Err(e) = self.ensure_dir().await {
            self.policy.on_failure(&e);
            return;
        }

        let ready = self.state().ready_log_file();
        let Some(log_file) = ready else {
            // workspace moved while the directory was being created
            self.report_not_ensured();
            return;
        };

        if let Err(source) = self.fs.append(&log_file, text).await {
            self.policy.on_failure(&Error::Append {
                path: log_file,
                source,
            });
        }
    }

    /// Host callback: extension shuts down.
    pub fn deactivate(&self) {
        tap_info!("output logger deactivated");
    }

    async fn reset_log_file(&self) {
        if self.log_file().is_none() {
            tap_warn!("debug session started without a workspace, output will not be captured");
            return;
        }

        if let Err(e) = self.ensure_dir().await {
            self.policy.on_failure(&e);
            return;
        }

        let ready = self.state().ready_log_file();
        let Some(log_file) = ready else {
            self.report_not_ensured();
            return;
        };

        match self.fs.truncate(&log_file).await {
            Ok(()) => tap_debug!("log file {} reset", log_file.display()),
            Err(source) => self.policy.on_failure(&Error::Truncate {
                path: log_file,
                source,
            }),
        }
    }

    fn report_not_ensured(&self) {
        if let Some(path) = self.log_file() {
            self.policy.on_failure(&Error::DirNotEnsured { path });
        } else {
            self.policy.on_failure(&Error::NoWorkspace);
        }
    }

    /// Re-read the workspace root and derive the log file path from it.
    ///
    /// Return true if the path is set after the call.
    fn resolve_workspace(&self) -> bool {
        let root = self.host.workspace_folders().into_iter().next();
        let log_file = root.as_deref().map(|r| self.config.log_file_path(r));

        let mut state = self.state();
        state.workspace_root = root;
        state.set_log_file(log_file);
        match &state.log_file {
            Some(path) => {
                tap_debug!("log file path: {}", path.display());
                true
            }
            None => false,
        }
    }

    fn refresh_workspace(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.resolve_workspace() {
            return None;
        }

        let logger = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = logger.ensure_dir().await {
                logger.policy.on_failure(&e);
            }
        }))
    }

    /// Create the log file directory unless it is already known to exist.
    ///
    /// The ensured flag is set only if the log file path is still the one
    /// the directory was created for.
    async fn ensure_dir(&self) -> Result<(), Error> {
        let (dir, generation) = {
            let state = self.state();
            if state.dir_ensured {
                return Ok(());
            }
            let Some(log_file) = state.log_file.as_deref() else {
                return Ok(());
            };
            (log_dir(log_file), state.generation)
        };

        self.fs
            .create_dir_all(&dir)
            .await
            .map_err(|source| Error::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let mut state = self.state();
        if state.generation == generation {
            state.dir_ensured = true;
        } else {
            tap_debug!(
                "log file path changed while creating {}, result discarded",
                dir.display()
            );
        }
        Ok(())
    }
}

fn log_dir(log_file: &Path) -> PathBuf {
    log_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Per session message handler, created by
/// [`SessionOutputLogger::on_debug_session_tracker_created`].
#[derive(Clone)]
pub struct SessionTracker {
    logger: Arc<SessionOutputLogger>,
}

impl SessionTracker {
    /// Host callback: the adapter sent a message toward the client.
    pub async fn on_did_send_message(&self, message: &Value) {
        if let AdapterMessage::Output { category, output } = AdapterMessage::classify(message) {
            // DAP treats a missing category as `console`
            tap_debug!(
                "capture {} bytes of {} output",
                output.len(),
                category.unwrap_or("console")
            );
            self.logger.append_output(output).await;
        }
    }
}
