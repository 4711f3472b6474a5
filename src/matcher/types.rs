use crate::album::AlbumRecord;
use crate::discogs::SearchResult;
use crate::matcher::decision::DecisionResponder;
use std::path::PathBuf;

/// Snapshot of one registry entry, handed to the worker
#[derive(Debug, Clone, PartialEq)]
pub struct MatchJob {
    /// Registry index the job was taken from
    pub index: usize,
    pub path: PathBuf,
    /// Search text, normally the folder's display name
    pub query: String,
    /// Record attached before a re-search; left untouched unless the re-search succeeds
    pub prior: Option<AlbumRecord>,
}

impl MatchJob {
    pub fn folder_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Requests to the match worker
#[derive(Debug)]
pub enum MatchRequest {
    Batch(Vec<MatchJob>),
    Single(MatchJob),
}

/// A suspended match waiting for the user's pick
#[derive(Debug)]
pub struct SelectionPrompt {
    pub index: usize,
    pub path: PathBuf,
    pub folder_name: String,
    /// Query this candidate list came from
    pub query: String,
    pub candidates: Vec<SearchResult>,
    pub responder: DecisionResponder,
}

/// Updates from the worker. Registry state only changes when the UI loop applies these.
#[derive(Debug)]
pub enum WorkflowEvent {
    BatchStarted {
        total: usize,
    },
    Progress {
        current: usize,
        total: usize,
        folder: String,
    },
    Searching {
        index: usize,
        path: PathBuf,
    },
    SelectionRequired(SelectionPrompt),
    Matched {
        index: usize,
        path: PathBuf,
        album: AlbumRecord,
    },
    /// Back to the pre-search state: pending, or completed with the prior record
    Reverted {
        index: usize,
        path: PathBuf,
    },
    NotFound {
        index: usize,
        path: PathBuf,
    },
    Failed {
        index: usize,
        path: PathBuf,
        message: String,
    },
    BatchFinished {
        matched: usize,
        not_found: usize,
        total: usize,
    },
}

/// How a single job ended, for batch tallies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Matched,
    NotFound,
    Reverted,
    Failed,
}
