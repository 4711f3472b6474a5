#![allow(dead_code)]

use async_trait::async_trait;
use discmatch::config::Config;
use discmatch::discogs::{Catalog, ReleaseDetails, SearchResult};
use discmatch::library::FolderRegistry;
use discmatch::matcher::{SelectionPrompt, WorkflowEvent};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// No inter-request delay, short prompt timeout
pub fn fast_config() -> Config {
    Config {
        request_delay: Duration::ZERO,
        selection_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

pub fn release(id: u64, title: &str, year: &str) -> SearchResult {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "year": year,
        "type": "release",
    }))
    .unwrap()
}

pub fn release_with_cover(id: u64, title: &str, year: &str, cover: &str) -> SearchResult {
    SearchResult {
        cover_image: Some(cover.to_string()),
        ..release(id, title, year)
    }
}

/// In-memory catalog: search answers by query, details by id, downloads
/// write a placeholder file unless the URI is marked as failing
#[derive(Default)]
pub struct ScriptedCatalog {
    searches: HashMap<String, Vec<SearchResult>>,
    details: HashMap<u64, ReleaseDetails>,
    failing_downloads: HashSet<String>,
    pub queries: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.searches.insert(query.to_string(), results);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        let details: ReleaseDetails = serde_json::from_value(details).unwrap();
        self.details.insert(details.id, details);
        self
    }

    pub fn failing_download(mut self, uri: &str) -> Self {
        self.failing_downloads.insert(uri.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Catalog for ScriptedCatalog {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.queries.lock().unwrap().push(query.to_string());
        self.searches.get(query).cloned().unwrap_or_default()
    }

    async fn release_details(&self, id: u64) -> Option<ReleaseDetails> {
        self.details.get(&id).cloned()
    }

    async fn download_image(&self, uri: &str, destination: &Path) -> bool {
        self.downloads
            .lock()
            .unwrap()
            .push((uri.to_string(), destination.to_path_buf()));
        if self.failing_downloads.contains(uri) {
            return false;
        }
        std::fs::write(destination, b"image").is_ok()
    }
}

/// Apply worker events to `registry` until `done` matches one, answering
/// prompts with `answer`. Returns how many prompts were shown.
pub async fn drive_until<A, D>(
    events: &mut UnboundedReceiver<WorkflowEvent>,
    registry: &mut FolderRegistry,
    mut answer: A,
    done: D,
) -> usize
where
    A: FnMut(SelectionPrompt),
    D: Fn(&WorkflowEvent) -> bool,
{
    let mut prompts = 0;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("worker went quiet")
            .expect("worker stopped");

        match event {
            WorkflowEvent::SelectionRequired(prompt) => {
                prompts += 1;
                answer(prompt);
            }
            event => {
                let finished = done(&event);
                registry.apply(&event);
                if finished {
                    return prompts;
                }
            }
        }
    }
}

pub fn batch_finished(event: &WorkflowEvent) -> bool {
    matches!(event, WorkflowEvent::BatchFinished { .. })
}

/// End of a single job, for re-search requests
pub fn job_finished(event: &WorkflowEvent) -> bool {
    matches!(
        event,
        WorkflowEvent::Matched { .. }
            | WorkflowEvent::Reverted { .. }
            | WorkflowEvent::NotFound { .. }
            | WorkflowEvent::Failed { .. }
    )
}
