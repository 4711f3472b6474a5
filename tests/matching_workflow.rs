mod support;

use discmatch::album::{read_album_info, AlbumRecord, ALBUM_INFO_FILE};
use discmatch::library::{FolderRegistry, FolderStatus, RegistryError};
use discmatch::matcher::{MatchService, WorkflowEvent};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::*;
use tempfile::TempDir;

const BOC: &str = "Boards of Canada - Music Has the Right to Children";

fn library(folders: &[&str]) -> (TempDir, FolderRegistry) {
    let root = TempDir::new().unwrap();
    for folder in folders {
        std::fs::create_dir(root.path().join(folder)).unwrap();
    }
    let registry = FolderRegistry::scan(root.path()).unwrap();
    (root, registry)
}

fn start(
    catalog: Arc<ScriptedCatalog>,
) -> (
    discmatch::matcher::MatchHandle,
    tokio::sync::mpsc::UnboundedReceiver<WorkflowEvent>,
) {
    tracing_init();
    MatchService::start(&tokio::runtime::Handle::current(), catalog, &fast_config())
}

#[tokio::test]
async fn test_single_result_is_accepted_without_prompt() {
    let (root, mut registry) = library(&[BOC]);
    let catalog = Arc::new(
        ScriptedCatalog::new()
            .with_search(
                BOC,
                vec![release_with_cover(42, BOC, "1998", "https://img/front.jpeg")],
            )
            .with_details(json!({
                "id": 42,
                "notes": "Reissue",
                "labels": [{"name": "Warp Records", "catno": "WARPCD55"}],
                "genres": ["Electronic"],
                "tracklist": [
                    {"position": "1", "title": "Wildlife Analysis", "duration": "1:17"},
                    {"position": "2", "title": "An Eagle in Your Mind", "duration": "6:23"}
                ],
                "images": [
                    {"type": "primary", "uri": "https://img/front.jpeg"},
                    {"type": "secondary", "uri": "https://img/back.png"}
                ]
            })),
    );
    let (handle, mut events) = start(catalog.clone());

    handle.start_batch(registry.jobs_for_batch()).unwrap();
    let prompts = drive_until(
        &mut events,
        &mut registry,
        |_| panic!("single result must not prompt"),
        batch_finished,
    )
    .await;
    assert_eq!(prompts, 0);

    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Completed);
    let album = entry.album().unwrap();
    assert_eq!(album.artist, "Boards of Canada");
    assert_eq!(album.catalog_number, "WARPCD55");
    assert_eq!(album.tracklist.len(), 2);
    assert_eq!(
        entry.suggested_name().as_deref(),
        Some("Boards of Canada - 1998 - Music Has the Right to Children")
    );

    let folder = root.path().join(BOC);
    let persisted = read_album_info(&folder).unwrap().unwrap();
    assert_eq!(persisted.labels, vec!["Warp Records".to_string()]);
    assert_eq!(persisted.notes, "Reissue");

    let downloads = catalog.downloads();
    assert_eq!(
        downloads,
        vec![
            ("https://img/front.jpeg".to_string(), folder.join("cover.jpg")),
            ("https://img/back.png".to_string(), folder.join("image_1.png")),
        ]
    );
}

#[tokio::test]
async fn test_cancel_on_first_match_leaves_entry_pending() {
    let (root, mut registry) = library(&["live bootleg"]);
    let catalog = Arc::new(ScriptedCatalog::new().with_search(
        "live bootleg",
        vec![release(1, "A - Live", "1990"), release(2, "B - Live", "1991")],
    ));
    let (handle, mut events) = start(catalog);

    handle.start_batch(registry.jobs_for_batch()).unwrap();
    let prompts = drive_until(
        &mut events,
        &mut registry,
        |prompt| {
            assert_eq!(prompt.candidates.len(), 2);
            prompt.responder.cancel();
        },
        batch_finished,
    )
    .await;

    assert_eq!(prompts, 1);
    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Pending);
    assert!(entry.album().is_none());
    assert!(!root.path().join("live bootleg").join(ALBUM_INFO_FILE).exists());
}

#[tokio::test]
async fn test_cancel_on_research_keeps_prior_record() {
    let (_root, mut registry) = library(&["kid a"]);
    let prior = radiohead_kid_a();
    registry.set_manual(0, prior.clone()).unwrap();

    let catalog = Arc::new(ScriptedCatalog::new().with_search(
        "kid a",
        vec![release(1, "Radiohead - Kid A", "2000"), release(2, "Kid A - Demo", "")],
    ));
    let (handle, mut events) = start(catalog);

    handle.research(registry.job_for(0).unwrap()).unwrap();
    drive_until(
        &mut events,
        &mut registry,
        |prompt| prompt.responder.cancel(),
        job_finished,
    )
    .await;

    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Completed);
    assert_eq!(entry.album(), Some(&prior));
}

fn radiohead_kid_a() -> AlbumRecord {
    AlbumRecord {
        title: "Radiohead - Kid A".to_string(),
        artist: "Radiohead".to_string(),
        album: "Kid A".to_string(),
        year: "2000".to_string(),
        ..AlbumRecord::default()
    }
}

#[tokio::test]
async fn test_research_single_result_replaces_prior_record_and_artwork() {
    let (root, mut registry) = library(&["kid a"]);
    registry.set_manual(0, radiohead_kid_a()).unwrap();

    let folder = root.path().join("kid a");
    for name in ["cover.png", "image_1.jpg", "image_2.jpg", "booklet.jpg"] {
        std::fs::write(folder.join(name), b"old").unwrap();
    }

    let catalog = Arc::new(ScriptedCatalog::new().with_search(
        "kid a",
        vec![release_with_cover(
            77,
            "Radiohead - Kid A",
            "2000",
            "https://img/kid-a.jpg",
        )],
    ));
    let (handle, mut events) = start(catalog);

    handle.research(registry.job_for(0).unwrap()).unwrap();
    let prompts = drive_until(
        &mut events,
        &mut registry,
        |_| panic!("single result must not prompt"),
        job_finished,
    )
    .await;
    assert_eq!(prompts, 0);

    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Completed);
    assert_eq!(entry.album().unwrap().discogs_id, Some(77));
    assert!(!entry.is_queued());

    let persisted = read_album_info(&folder).unwrap().unwrap();
    assert_eq!(persisted.discogs_id, Some(77));

    assert!(folder.join("cover.jpg").is_file());
    assert!(folder.join("booklet.jpg").is_file());
    for stale in ["cover.png", "image_1.jpg", "image_2.jpg"] {
        assert!(!folder.join(stale).exists(), "{} should be removed", stale);
    }
}

#[tokio::test]
async fn test_research_with_no_results_and_cancel_keeps_prior_record() {
    let (root, mut registry) = library(&["kid a"]);
    registry.set_manual(0, radiohead_kid_a()).unwrap();
    let (handle, mut events) = start(Arc::new(ScriptedCatalog::new()));

    handle.research(registry.job_for(0).unwrap()).unwrap();

    let outcome = Arc::new(Mutex::new(None));
    let seen = outcome.clone();
    drive_until(
        &mut events,
        &mut registry,
        |prompt| {
            assert!(prompt.candidates.is_empty());
            prompt.responder.cancel();
        },
        move |event| {
            let finished = job_finished(event);
            if finished {
                *seen.lock().unwrap() = Some(matches!(event, WorkflowEvent::Reverted { .. }));
            }
            finished
        },
    )
    .await;

    assert_eq!(*outcome.lock().unwrap(), Some(true));
    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Completed);
    assert_eq!(entry.album(), Some(&radiohead_kid_a()));
    assert_eq!(
        read_album_info(&root.path().join("kid a")).unwrap(),
        Some(radiohead_kid_a())
    );
}

#[tokio::test]
async fn test_queued_entries_refuse_manual_entry_until_batch_reports() {
    let (root, mut registry) = library(&["a", "b"]);
    let catalog = Arc::new(
        ScriptedCatalog::new()
            .with_search("a", vec![release(1, "Wrong - Record", "")])
            .with_search("b", vec![release(2, "Other - Record", "")]),
    );
    let (handle, mut events) = start(catalog);

    handle.start_batch(registry.jobs_for_batch()).unwrap();

    assert!(matches!(
        registry.set_manual(1, radiohead_kid_a()),
        Err(RegistryError::Queued(_))
    ));
    assert!(matches!(registry.job_for(0), Err(RegistryError::Queued(_))));
    assert!(registry.is_busy());

    drive_until(&mut events, &mut registry, |_| {}, batch_finished).await;

    assert!(!registry.is_busy());
    assert_eq!(registry.get(1).unwrap().album().unwrap().discogs_id, Some(2));

    // Once the worker has reported, a manual record may replace the match
    registry.set_manual(1, radiohead_kid_a()).unwrap();
    assert_eq!(
        read_album_info(&root.path().join("b")).unwrap(),
        Some(radiohead_kid_a())
    );
}

#[tokio::test]
async fn test_zero_results_and_cancel_is_not_found() {
    let (_root, mut registry) = library(&["unknown demo"]);
    let (handle, mut events) = start(Arc::new(ScriptedCatalog::new()));

    handle.start_batch(registry.jobs_for_batch()).unwrap();

    let finished = Arc::new(Mutex::new(None));
    let seen = finished.clone();
    drive_until(
        &mut events,
        &mut registry,
        |prompt| {
            assert!(prompt.candidates.is_empty());
            prompt.responder.cancel();
        },
        move |event| {
            if let WorkflowEvent::BatchFinished {
                matched,
                not_found,
                total,
            } = event
            {
                *seen.lock().unwrap() = Some((*matched, *not_found, *total));
                true
            } else {
                false
            }
        },
    )
    .await;

    assert_eq!(registry.get(0).unwrap().status(), FolderStatus::NotFound);
    assert_eq!(*finished.lock().unwrap(), Some((0, 1, 1)));
}

#[tokio::test]
async fn test_requery_then_choose() {
    let (_root, mut registry) = library(&["cd1_rip_final"]);
    let catalog = Arc::new(ScriptedCatalog::new().with_search(
        "Portishead Dummy",
        vec![
            release(10, "Portishead - Dummy", "1994"),
            release(11, "Portishead - Dummy (Deluxe)", "2014"),
        ],
    ));
    let (handle, mut events) = start(catalog.clone());

    handle.start_batch(registry.jobs_for_batch()).unwrap();
    let prompts = drive_until(
        &mut events,
        &mut registry,
        |mut prompt| {
            if prompt.candidates.is_empty() {
                assert_eq!(prompt.query, "cd1_rip_final");
                prompt.responder.requery("Portishead Dummy");
            } else {
                assert_eq!(prompt.query, "Portishead Dummy");
                let chosen = prompt.candidates.remove(0);
                prompt.responder.choose(chosen);
            }
        },
        batch_finished,
    )
    .await;

    assert_eq!(prompts, 2);
    assert_eq!(catalog.queries(), vec!["cd1_rip_final", "Portishead Dummy"]);

    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Completed);
    assert_eq!(entry.album().unwrap().discogs_id, Some(10));
    assert_eq!(
        entry.suggested_name().as_deref(),
        Some("Portishead - 1994 - Dummy")
    );
}

#[tokio::test]
async fn test_unanswered_prompt_times_out_as_cancel() {
    let (_root, mut registry) = library(&["ambiguous"]);
    let catalog = Arc::new(ScriptedCatalog::new().with_search(
        "ambiguous",
        vec![release(1, "X - One", ""), release(2, "X - Two", "")],
    ));
    let config = discmatch::config::Config {
        selection_timeout: Duration::from_millis(50),
        ..fast_config()
    };
    let (handle, mut events) =
        MatchService::start(&tokio::runtime::Handle::current(), catalog, &config);

    handle.start_batch(registry.jobs_for_batch()).unwrap();
    let mut ignored = Vec::new();
    drive_until(
        &mut events,
        &mut registry,
        |prompt| ignored.push(prompt),
        batch_finished,
    )
    .await;

    assert_eq!(ignored.len(), 1);
    assert!(ignored[0].responder.is_abandoned());
    assert_eq!(registry.get(0).unwrap().status(), FolderStatus::Pending);
}

#[tokio::test]
async fn test_persist_failure_reverts_entry() {
    let (root, mut registry) = library(&["vanishing"]);
    let catalog = Arc::new(
        ScriptedCatalog::new().with_search("vanishing", vec![release(5, "V - Gone", "2002")]),
    );
    let (handle, mut events) = start(catalog);

    let jobs = registry.jobs_for_batch();
    std::fs::remove_dir(root.path().join("vanishing")).unwrap();
    handle.start_batch(jobs).unwrap();

    let failed = Arc::new(Mutex::new(false));
    let seen = failed.clone();
    drive_until(&mut events, &mut registry, |_| {}, move |event| {
        if matches!(event, WorkflowEvent::Failed { .. }) {
            *seen.lock().unwrap() = true;
        }
        batch_finished(event)
    })
    .await;

    assert!(*failed.lock().unwrap());
    let entry = registry.get(0).unwrap();
    assert_eq!(entry.status(), FolderStatus::Pending);
    assert!(entry.album().is_none());
}

#[tokio::test]
async fn test_images_deduplicated_and_numbered_by_success() {
    let (root, mut registry) = library(&["artwork"]);
    let catalog = Arc::new(
        ScriptedCatalog::new()
            .with_search(
                "artwork",
                vec![release_with_cover(7, "Art - Work", "", "https://img/a.jpg")],
            )
            .with_details(json!({
                "id": 7,
                "images": [
                    {"uri": "https://img/a.jpg"},
                    {"uri": "https://img/b.webp"},
                    {"uri": "https://img/a.jpg"},
                    {"uri": "https://img/c.gif"}
                ]
            }))
            .failing_download("https://img/a.jpg"),
    );
    let (handle, mut events) = start(catalog.clone());

    handle.start_batch(registry.jobs_for_batch()).unwrap();
    drive_until(&mut events, &mut registry, |_| {}, batch_finished).await;

    let folder = root.path().join("artwork");
    let attempted: Vec<String> = catalog.downloads().into_iter().map(|(uri, _)| uri).collect();
    assert_eq!(
        attempted,
        vec!["https://img/a.jpg", "https://img/b.webp", "https://img/c.gif"]
    );
    assert!(folder.join("cover.webp").is_file());
    assert!(folder.join("image_1.gif").is_file());
    assert_eq!(registry.get(0).unwrap().status(), FolderStatus::Completed);
}

#[tokio::test]
async fn test_batch_processes_folders_in_registry_order() {
    let (_root, mut registry) = library(&["b", "a", "c"]);
    let catalog = Arc::new(
        ScriptedCatalog::new()
            .with_search("a", vec![release(1, "A - A", "")])
            .with_search("b", vec![release(2, "B - B", "")])
            .with_search("c", vec![release(3, "C - C", "")]),
    );
    let (handle, mut events) = start(catalog.clone());

    handle.start_batch(registry.jobs_for_batch()).unwrap();

    let progress = Arc::new(Mutex::new(Vec::new()));
    let seen = progress.clone();
    drive_until(&mut events, &mut registry, |_| {}, move |event| {
        if let WorkflowEvent::Progress { current, total, .. } = event {
            seen.lock().unwrap().push((*current, *total));
        }
        batch_finished(event)
    })
    .await;

    assert_eq!(catalog.queries(), vec!["a", "b", "c"]);
    assert_eq!(*progress.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    assert!(registry
        .entries()
        .iter()
        .all(|e| e.status() == FolderStatus::Completed));
}
