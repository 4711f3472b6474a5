//! User commands, independent of any particular front-end.
//!
//! The controller owns the folder registry and is the only place it is
//! mutated: commands change it directly, worker progress arrives through
//! [`AppController::handle_event`].

use crate::album::{AlbumRecord, ManualEntry};
use crate::config::Config;
use crate::export::{export_spreadsheet, ExportError};
use crate::library::{
    BatchRenameReport, FolderEntry, FolderRegistry, RegistryError, RenameOutcome,
};
use crate::matcher::{MatchError, MatchHandle, SelectionPrompt, WorkflowEvent};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("No directory scanned yet")]
    NoRoot,
    #[error("A batch is already running")]
    BatchRunning,
    #[error("No pending folders to match")]
    NothingPending,
    #[error("Folder no longer exists: {0}")]
    FolderMissing(PathBuf),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// What the front-end should surface after a worker event
#[derive(Debug)]
pub enum Notice {
    Status(String),
    Prompt(SelectionPrompt),
}

pub struct AppController {
    registry: FolderRegistry,
    matcher: MatchHandle,
    config: Config,
    batch_running: bool,
}

impl AppController {
    pub fn new(matcher: MatchHandle, config: Config) -> Self {
        Self {
            registry: FolderRegistry::default(),
            matcher,
            config,
            batch_running: false,
        }
    }

    pub fn registry(&self) -> &FolderRegistry {
        &self.registry
    }

    pub fn is_batch_running(&self) -> bool {
        self.batch_running
    }

    /// Replace the registry with a fresh scan of `root`
    pub fn scan(&mut self, root: &Path) -> Result<usize, CommandError> {
        if self.batch_running || self.registry.is_busy() {
            return Err(CommandError::BatchRunning);
        }

        self.registry = FolderRegistry::scan(root)?;
        Ok(self.registry.len())
    }

    /// Queue every pending folder for matching
    pub fn start_batch(&mut self) -> Result<usize, CommandError> {
        if self.registry.root().is_none() {
            return Err(CommandError::NoRoot);
        }
        if self.batch_running {
            return Err(CommandError::BatchRunning);
        }

        let jobs = self.registry.jobs_for_batch();
        if jobs.is_empty() {
            return Err(CommandError::NothingPending);
        }

        let total = jobs.len();
        if let Err(e) = self.matcher.start_batch(jobs) {
            self.registry.release_queued();
            return Err(e.into());
        }
        self.batch_running = true;
        Ok(total)
    }

    /// Queue one folder for matching again, whatever its status
    pub fn research(&mut self, index: usize) -> Result<(), CommandError> {
        let job = self.registry.job_for(index)?;
        info!("Re-search requested for {}", job.folder_name());
        if let Err(e) = self.matcher.research(job) {
            self.registry.release_queued();
            return Err(e.into());
        }
        Ok(())
    }

    pub fn manual(&mut self, index: usize, entry: ManualEntry) -> Result<(), CommandError> {
        self.registry.set_manual(index, AlbumRecord::manual(entry))?;
        Ok(())
    }

    pub fn rename(&mut self, index: usize) -> Result<RenameOutcome, CommandError> {
        Ok(self.registry.rename(index)?)
    }

    pub fn rename_all(&mut self) -> BatchRenameReport {
        self.registry.rename_all()
    }

    /// Export matched folders; without a path, to the default export location
    pub fn export(&self, path: Option<&Path>) -> Result<(usize, PathBuf), CommandError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.default_export_path());
        let rows = export_spreadsheet(self.registry.completed_entries(), &path)?;
        Ok((rows, path))
    }

    pub fn open_folder(&self, index: usize) -> Result<(), CommandError> {
        let entry = self.entry(index)?;
        if !entry.path().is_dir() {
            return Err(CommandError::FolderMissing(entry.path().to_path_buf()));
        }
        showfile::show_path_in_file_manager(entry.path());
        Ok(())
    }

    /// Details text for one entry; `None` when it has no record yet
    pub fn details(&self, index: usize) -> Result<Option<String>, CommandError> {
        Ok(self.entry(index)?.album().map(AlbumRecord::details_text))
    }

    fn entry(&self, index: usize) -> Result<&FolderEntry, CommandError> {
        self.registry
            .get(index)
            .ok_or(CommandError::Registry(RegistryError::NoSuchEntry(index)))
    }

    fn folder_label(&self, index: usize, path: &Path) -> String {
        self.registry
            .get(index)
            .map(|e| e.name().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// Apply a worker event to the registry and describe it for the user
    pub fn handle_event(&mut self, event: WorkflowEvent) -> Option<Notice> {
        if let WorkflowEvent::SelectionRequired(prompt) = event {
            return Some(Notice::Prompt(prompt));
        }

        if !self.registry.apply(&event) {
            return None;
        }

        let status = match event {
            WorkflowEvent::BatchStarted { total } => {
                format!("Matching {} folder(s)", total)
            }
            WorkflowEvent::Progress {
                current,
                total,
                folder,
            } => format!("[{}/{}] {}", current, total, folder),
            WorkflowEvent::Searching { .. } => return None,
            WorkflowEvent::Matched { index, path, album } => {
                format!("✓ {} → {}", self.folder_label(index, &path), album.title)
            }
            WorkflowEvent::NotFound { index, path } => {
                format!("✗ No match for {}", self.folder_label(index, &path))
            }
            WorkflowEvent::Reverted { index, path } => {
                format!("{} left unchanged", self.folder_label(index, &path))
            }
            WorkflowEvent::Failed {
                index,
                path,
                message,
            } => {
                warn!("Match failed for {}: {}", path.display(), message);
                format!("✗ {}: {}", self.folder_label(index, &path), message)
            }
            WorkflowEvent::BatchFinished {
                matched,
                not_found,
                total,
            } => {
                self.batch_running = false;
                format!(
                    "Batch finished: {} matched, {} not found, {} total",
                    matched, not_found, total
                )
            }
            WorkflowEvent::SelectionRequired(_) => return None,
        };

        Some(Notice::Status(status))
    }
}
