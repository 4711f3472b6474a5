// # Match Service
//
// One worker task that matches folders against the catalog, strictly in
// request order:
//
//   search → one result:      accept
//          → none or several: suspend on the decision gate until the user
//                             chooses, re-queries, or cancels
//   accept → details → images → album_info.json → `Matched`
//
// The worker never touches the folder registry. Every state change goes out
// as a `WorkflowEvent` for the UI loop to apply.

use crate::album::{
    image_file_name, remove_stale_images, write_album_info, AlbumRecord, PersistError,
};
use crate::config::Config;
use crate::discogs::{Catalog, SearchResult};
use crate::matcher::decision::{Decision, DecisionGate};
use crate::matcher::types::{JobOutcome, MatchJob, MatchRequest, SelectionPrompt, WorkflowEvent};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("Match worker is not running")]
    WorkerStopped,
}

/// Handle for queueing match requests
#[derive(Clone)]
pub struct MatchHandle {
    requests_tx: mpsc::UnboundedSender<MatchRequest>,
}

impl MatchHandle {
    /// Queue a batch; jobs run in the given order
    pub fn start_batch(&self, jobs: Vec<MatchJob>) -> Result<(), MatchError> {
        self.requests_tx
            .send(MatchRequest::Batch(jobs))
            .map_err(|_| MatchError::WorkerStopped)
    }

    /// Queue a re-search of one entry behind anything already queued
    pub fn research(&self, job: MatchJob) -> Result<(), MatchError> {
        self.requests_tx
            .send(MatchRequest::Single(job))
            .map_err(|_| MatchError::WorkerStopped)
    }
}

/// How a disambiguation ended
enum Resolution {
    Chosen(SearchResult),
    Cancelled,
}

pub struct MatchService {
    catalog: Arc<dyn Catalog>,
    gate: DecisionGate,
    request_delay: Duration,
    events_tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl MatchService {
    /// Start the match worker on the given runtime, returning the request
    /// handle and the event stream for the UI loop
    pub fn start(
        runtime_handle: &tokio::runtime::Handle,
        catalog: Arc<dyn Catalog>,
        config: &Config,
    ) -> (MatchHandle, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let service = MatchService {
            catalog,
            gate: DecisionGate::new(config.selection_timeout),
            request_delay: config.request_delay,
            events_tx,
        };

        runtime_handle.spawn(service.listen_for_match_requests(requests_rx));

        (MatchHandle { requests_tx }, events_rx)
    }

    async fn listen_for_match_requests(
        self,
        mut requests_rx: mpsc::UnboundedReceiver<MatchRequest>,
    ) {
        info!("MatchService: Worker started");

        while let Some(request) = requests_rx.recv().await {
            match request {
                MatchRequest::Batch(jobs) => self.run_batch(jobs).await,
                MatchRequest::Single(job) => {
                    self.run_job(&job).await;
                    self.pause().await;
                }
            }
        }

        info!("MatchService: Channel closed, worker exiting");
    }

    fn emit(&self, event: WorkflowEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("MatchService: UI event receiver dropped");
        }
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    async fn run_batch(&self, jobs: Vec<MatchJob>) {
        let total = jobs.len();
        let mut matched = 0;
        let mut not_found = 0;

        info!("MatchService: Starting batch of {} folder(s)", total);
        self.emit(WorkflowEvent::BatchStarted { total });

        for (position, job) in jobs.iter().enumerate() {
            self.emit(WorkflowEvent::Progress {
                current: position + 1,
                total,
                folder: job.folder_name(),
            });

            match self.run_job(job).await {
                JobOutcome::Matched => matched += 1,
                JobOutcome::NotFound => not_found += 1,
                JobOutcome::Reverted | JobOutcome::Failed => {}
            }

            self.pause().await;
        }

        info!(
            "MatchService: Batch finished: {} matched, {} not found, {} total",
            matched, not_found, total
        );
        self.emit(WorkflowEvent::BatchFinished {
            matched,
            not_found,
            total,
        });
    }

    async fn run_job(&self, job: &MatchJob) -> JobOutcome {
        self.emit(WorkflowEvent::Searching {
            index: job.index,
            path: job.path.clone(),
        });

        let mut results = self.catalog.search(&job.query).await;
        let original_was_empty = results.is_empty();

        let resolution = if results.len() == 1 {
            debug!("Single result for '{}', auto-accepting", job.query);
            Resolution::Chosen(results.remove(0))
        } else {
            self.disambiguate(job, results).await
        };

        match resolution {
            Resolution::Chosen(candidate) => match self.accept(job, &candidate).await {
                Ok(album) => {
                    info!(
                        "✓ Matched '{}' to '{}'",
                        job.folder_name(),
                        album.title
                    );
                    self.emit(WorkflowEvent::Matched {
                        index: job.index,
                        path: job.path.clone(),
                        album,
                    });
                    JobOutcome::Matched
                }
                Err(e) => {
                    error!("Failed to save match for {}: {}", job.path.display(), e);
                    self.emit(WorkflowEvent::Failed {
                        index: job.index,
                        path: job.path.clone(),
                        message: e.to_string(),
                    });
                    JobOutcome::Failed
                }
            },
            Resolution::Cancelled if original_was_empty && job.prior.is_none() => {
                info!("No match for '{}'", job.folder_name());
                self.emit(WorkflowEvent::NotFound {
                    index: job.index,
                    path: job.path.clone(),
                });
                JobOutcome::NotFound
            }
            Resolution::Cancelled => {
                self.emit(WorkflowEvent::Reverted {
                    index: job.index,
                    path: job.path.clone(),
                });
                JobOutcome::Reverted
            }
        }
    }

    /// Prompt the user until they choose or cancel; a re-query searches again
    /// and re-prompts inside the same suspension
    async fn disambiguate(&self, job: &MatchJob, results: Vec<SearchResult>) -> Resolution {
        let mut suspension = self.gate.suspend().await;
        let mut query = job.query.clone();
        let mut candidates = results;

        loop {
            let prompt_candidates = std::mem::take(&mut candidates);
            let prompt_query = query.clone();
            let decision = suspension
                .ask(|responder| {
                    self.events_tx
                        .send(WorkflowEvent::SelectionRequired(SelectionPrompt {
                            index: job.index,
                            path: job.path.clone(),
                            folder_name: job.folder_name(),
                            query: prompt_query,
                            candidates: prompt_candidates,
                            responder,
                        }))
                        .is_ok()
                })
                .await;

            match decision {
                Decision::Choose(candidate) => return Resolution::Chosen(candidate),
                Decision::Cancel => return Resolution::Cancelled,
                Decision::Requery(new_query) => {
                    info!("Re-querying '{}' as '{}'", job.folder_name(), new_query);
                    candidates = self.catalog.search(&new_query).await;
                    query = new_query;
                }
            }
        }
    }

    /// Build the record, fetch details and images, persist album_info.json.
    ///
    /// Images are written before the metadata and are not rolled back when
    /// persisting fails.
    async fn accept(
        &self,
        job: &MatchJob,
        candidate: &SearchResult,
    ) -> Result<AlbumRecord, PersistError> {
        let mut album = AlbumRecord::from_search_result(candidate);

        if let Some(id) = album.discogs_id {
            match self.catalog.release_details(id).await {
                Some(details) => album.apply_details(details),
                None => warn!("No release details for {}, keeping search fields", id),
            }
        }

        let mut saved = Vec::new();
        for uri in album.image_uris() {
            let name = image_file_name(saved.len(), &uri);
            if self.catalog.download_image(&uri, &job.path.join(&name)).await {
                saved.push(name);
            }
        }
        debug!("Saved {} image(s) into {}", saved.len(), job.path.display());

        write_album_info(&job.path, &album)?;

        // Artwork from the replaced match goes only once new artwork is in place
        if job.prior.is_some() && !saved.is_empty() {
            match remove_stale_images(&job.path, &saved) {
                Ok(0) => {}
                Ok(removed) => debug!(
                    "Removed {} stale image(s) from {}",
                    removed,
                    job.path.display()
                ),
                Err(e) => warn!("Failed to clear old images: {}", e),
            }
        }

        Ok(album)
    }
}
