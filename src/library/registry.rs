//! Scanned album folders under one root directory.
//!
//! The registry is the single source of truth for folder state. It is owned
//! by the UI loop; the match worker reports through [`WorkflowEvent`]s that
//! the loop applies here.

use crate::album::{read_album_info, write_album_info, AlbumRecord, PersistError};
use crate::matcher::{MatchJob, WorkflowEvent};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No folder at index {0}")]
    NoSuchEntry(usize),
    #[error("No suggested name for {0}")]
    NoSuggestion(String),
    #[error("Target folder already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("{0} is being searched")]
    Busy(String),
    #[error("{0} is queued for matching")]
    Queued(String),
    #[error("Failed to rename {from_path} to {to_path}: {source}")]
    Rename {
        from_path: PathBuf,
        to_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Pending,
    Searching,
    Completed,
    NotFound,
}

impl FolderStatus {
    pub fn label(self) -> &'static str {
        match self {
            FolderStatus::Pending => "pending",
            FolderStatus::Searching => "searching",
            FolderStatus::Completed => "completed",
            FolderStatus::NotFound => "not found",
        }
    }
}

/// One immediate subdirectory of the scanned root.
///
/// Outside `Searching`, the status is `Completed` exactly when a record is
/// attached. A re-search keeps the prior record attached while searching.
/// From the moment a job is handed to the worker until its outcome arrives
/// the entry is queued, and only worker events may change it.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderEntry {
    path: PathBuf,
    name: String,
    status: FolderStatus,
    album: Option<AlbumRecord>,
    queued: bool,
    /// Status to restore when the search ends in a file-system failure
    before_search: FolderStatus,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FolderEntry {
    fn new(path: PathBuf, album: Option<AlbumRecord>) -> Self {
        let status = if album.is_some() {
            FolderStatus::Completed
        } else {
            FolderStatus::Pending
        };

        Self {
            name: display_name(&path),
            path,
            status,
            album,
            queued: false,
            before_search: status,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> FolderStatus {
        self.status
    }

    pub fn album(&self) -> Option<&AlbumRecord> {
        self.album.as_ref()
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    fn ensure_idle(&self) -> Result<(), RegistryError> {
        if self.status == FolderStatus::Searching {
            Err(RegistryError::Busy(self.name.clone()))
        } else if self.queued {
            Err(RegistryError::Queued(self.name.clone()))
        } else {
            Ok(())
        }
    }

    pub fn suggested_name(&self) -> Option<String> {
        self.album
            .as_ref()
            .map(AlbumRecord::suggested_folder_name)
            .filter(|name| !name.is_empty())
    }

    fn begin_search(&mut self) {
        if self.status != FolderStatus::Searching {
            self.before_search = self.status;
        }
        self.status = FolderStatus::Searching;
    }

    fn complete(&mut self, album: AlbumRecord) {
        self.album = Some(album);
        self.status = FolderStatus::Completed;
        self.queued = false;
    }

    fn mark_not_found(&mut self) {
        self.status = if self.album.is_some() {
            FolderStatus::Completed
        } else {
            FolderStatus::NotFound
        };
        self.queued = false;
    }

    /// Cancelled: pending, or completed with the untouched prior record
    fn revert(&mut self) {
        self.status = if self.album.is_some() {
            FolderStatus::Completed
        } else {
            FolderStatus::Pending
        };
        self.queued = false;
    }

    /// Failed to persist: back to exactly where the search started
    fn restore(&mut self) {
        self.status = self.before_search;
        self.queued = false;
    }

    fn relocate(&mut self, path: PathBuf) {
        self.name = display_name(&path);
        self.path = path;
    }
}

/// Result of renaming one entry
#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    Renamed { from_name: String, to_name: String },
    /// Already carries its suggested name
    Unchanged,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchRenameReport {
    pub renamed: usize,
    /// Destination already existed, or the entry was queued or mid-search
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FolderRegistry {
    root: Option<PathBuf>,
    entries: Vec<FolderEntry>,
}

impl FolderRegistry {
    /// Scan the immediate subdirectories of `root`, sorted by name.
    ///
    /// Folders holding a readable album_info.json come back completed; a
    /// malformed one is logged and the folder stays pending.
    pub fn scan(root: &Path) -> Result<Self, RegistryError> {
        let scan_error = |source| RegistryError::Scan {
            path: root.to_path_buf(),
            source,
        };

        let mut dirs = Vec::new();
        for entry in fs::read_dir(root).map_err(scan_error)? {
            let path = entry.map_err(scan_error)?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let entries: Vec<FolderEntry> = dirs
            .into_iter()
            .map(|path| {
                let album = match read_album_info(&path) {
                    Ok(album) => album,
                    Err(e) => {
                        warn!("Ignoring album info: {}", e);
                        None
                    }
                };
                FolderEntry::new(path, album)
            })
            .collect();

        info!(
            "Scanned {}: {} folder(s), {} already matched",
            root.display(),
            entries.len(),
            entries.iter().filter(|e| e.album.is_some()).count()
        );

        Ok(Self {
            root: Some(root.to_path_buf()),
            entries,
        })
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn entries(&self) -> &[FolderEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&FolderEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut FolderEntry, RegistryError> {
        self.entries
            .get_mut(index)
            .ok_or(RegistryError::NoSuchEntry(index))
    }

    pub fn completed_entries(&self) -> impl Iterator<Item = &FolderEntry> {
        self.entries.iter().filter(|e| e.album.is_some())
    }

    /// True while any entry is queued or being searched
    pub fn is_busy(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.queued || e.status == FolderStatus::Searching)
    }

    /// Jobs for every entry that has not been attempted yet, in registry
    /// order. The entries stay queued until the worker reports on them.
    pub fn jobs_for_batch(&mut self) -> Vec<MatchJob> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter(|(_, e)| e.status == FolderStatus::Pending && !e.queued)
            .map(|(index, e)| {
                e.queued = true;
                Self::job(index, e)
            })
            .collect()
    }

    /// Job for re-searching one entry, whatever its current status
    pub fn job_for(&mut self, index: usize) -> Result<MatchJob, RegistryError> {
        let entry = self.entry_mut(index)?;
        entry.ensure_idle()?;
        entry.queued = true;
        Ok(Self::job(index, entry))
    }

    /// Forget every queued job; for when the worker never received them
    pub fn release_queued(&mut self) {
        for entry in &mut self.entries {
            entry.queued = false;
        }
    }

    fn job(index: usize, entry: &FolderEntry) -> MatchJob {
        MatchJob {
            index,
            path: entry.path.clone(),
            query: entry.name.clone(),
            prior: entry.album.clone(),
        }
    }

    /// Apply a worker event. Returns false when it refers to no current entry.
    pub fn apply(&mut self, event: &WorkflowEvent) -> bool {
        let (index, path) = match event {
            WorkflowEvent::Searching { index, path }
            | WorkflowEvent::Matched { index, path, .. }
            | WorkflowEvent::Reverted { index, path }
            | WorkflowEvent::NotFound { index, path }
            | WorkflowEvent::Failed { index, path, .. } => (*index, path),
            WorkflowEvent::BatchStarted { .. }
            | WorkflowEvent::Progress { .. }
            | WorkflowEvent::SelectionRequired(_)
            | WorkflowEvent::BatchFinished { .. } => return true,
        };

        let Some(entry) = self.entries.get_mut(index).filter(|e| &e.path == path) else {
            warn!(
                "Dropping event for {} (index {}): registry changed",
                path.display(),
                index
            );
            return false;
        };

        match event {
            WorkflowEvent::Searching { .. } => entry.begin_search(),
            WorkflowEvent::Matched { album, .. } => entry.complete(album.clone()),
            WorkflowEvent::NotFound { .. } => entry.mark_not_found(),
            WorkflowEvent::Reverted { .. } => entry.revert(),
            WorkflowEvent::Failed { .. } => entry.restore(),
            _ => {}
        }
        true
    }

    /// Attach a hand-entered record, writing album_info.json first
    pub fn set_manual(&mut self, index: usize, album: AlbumRecord) -> Result<(), RegistryError> {
        let entry = self.entry_mut(index)?;
        entry.ensure_idle()?;

        write_album_info(&entry.path, &album)?;
        info!("Saved manual metadata for {}", entry.name);
        entry.complete(album);
        Ok(())
    }

    /// Rename one entry's folder to its suggested name, never overwriting
    pub fn rename(&mut self, index: usize) -> Result<RenameOutcome, RegistryError> {
        let entry = self.entry_mut(index)?;
        entry.ensure_idle()?;

        let suggested = entry
            .suggested_name()
            .ok_or_else(|| RegistryError::NoSuggestion(entry.name.clone()))?;
        if suggested == entry.name {
            return Ok(RenameOutcome::Unchanged);
        }

        let target = entry
            .path
            .parent()
            .map(|parent| parent.join(&suggested))
            .unwrap_or_else(|| PathBuf::from(&suggested));

        if target.exists() {
            return Err(RegistryError::DestinationExists(target));
        }

        fs::rename(&entry.path, &target).map_err(|source| RegistryError::Rename {
            from_path: entry.path.clone(),
            to_path: target.clone(),
            source,
        })?;

        let from_name = entry.name.clone();
        entry.relocate(target);
        debug!("Renamed {} -> {}", from_name, entry.name);

        Ok(RenameOutcome::Renamed {
            from_name,
            to_name: suggested,
        })
    }

    /// Rename every matched entry whose suggested name differs from its current one
    pub fn rename_all(&mut self) -> BatchRenameReport {
        let mut report = BatchRenameReport::default();

        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.suggested_name()
                    .is_some_and(|suggested| suggested != e.name)
            })
            .map(|(index, _)| index)
            .collect();

        for index in candidates {
            match self.rename(index) {
                Ok(RenameOutcome::Renamed { .. }) => report.renamed += 1,
                Ok(RenameOutcome::Unchanged) => {}
                Err(RegistryError::DestinationExists(target)) => {
                    debug!("Skipping rename, {} exists", target.display());
                    report.skipped += 1;
                }
                Err(RegistryError::Busy(_) | RegistryError::Queued(_)) => report.skipped += 1,
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                    report.errors.push(e.to_string());
                }
            }
        }

        info!(
            "Batch rename: {} renamed, {} skipped, {} failed",
            report.renamed, report.skipped, report.failed
        );
        report
    }
}
