//! Album metadata for one matched folder.
//!
//! An [`AlbumRecord`] is built from a Discogs search result (optionally
//! enriched with release details), rebuilt from a folder's `album_info.json`,
//! or typed in by hand. It owns the folder naming rule.

use crate::discogs::{DiscogsTrack, ReleaseDetails, SearchResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Metadata file written into every matched folder
pub const ALBUM_INFO_FILE: &str = "album_info.json";

const TITLE_SEPARATOR: &str = " - ";
const LIST_SEPARATOR: &str = ", ";

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed album info in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub position: String,
    pub title: String,
    pub duration: String,
}

impl From<DiscogsTrack> for Track {
    fn from(track: DiscogsTrack) -> Self {
        Self {
            position: track.position,
            title: track.title,
            duration: track.duration,
        }
    }
}

/// On-disk form shared by the JSON store and the spreadsheet export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedAlbum {
    pub artist: String,
    pub album: String,
    pub year: String,
    pub label: String,
    pub catalog_number: String,
    pub genre: String,
    pub style: String,
    pub notes: String,
    pub discogs_id: Option<u64>,
    pub country: String,
    pub tracklist: Vec<Track>,
}

/// User-typed metadata for a folder the catalog could not match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualEntry {
    pub artist: String,
    pub album: String,
    pub year: String,
    pub label: String,
    pub catalog_number: String,
    pub genre: String,
    pub style: String,
    pub country: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumRecord {
    pub discogs_id: Option<u64>,
    /// Title as the catalog sent it, normally "Artist - Album"
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub labels: Vec<String>,
    pub catalog_number: String,
    pub country: String,
    pub genres: Vec<String>,
    pub styles: Vec<String>,
    pub formats: Vec<String>,
    pub notes: String,
    pub tracklist: Vec<Track>,
    /// Cover URI from the search result
    pub cover_image: Option<String>,
    /// Image URIs from release details
    pub images: Vec<String>,
}

/// Split a catalog title at the first " - " into (artist, album)
pub fn split_title(title: &str) -> (String, String) {
    match title.split_once(TITLE_SEPARATOR) {
        Some((artist, album)) => (artist.trim().to_string(), album.trim().to_string()),
        None => (String::new(), title.trim().to_string()),
    }
}

fn join_title(artist: &str, album: &str) -> String {
    if artist.is_empty() {
        album.to_string()
    } else {
        format!("{}{}{}", artist, TITLE_SEPARATOR, album)
    }
}

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"))
}

fn underscore_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid regex"))
}

/// Make a string safe as a Windows folder name.
///
/// Replaces `<>:"/\|?*` with `_`, trims spaces and periods from both ends,
/// then collapses runs of `_`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = illegal_chars().replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    underscore_runs().replace_all(trimmed, "_").into_owned()
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extension for an image URI: png, gif and webp win in that order, jpg otherwise
pub fn image_extension(uri: &str) -> &'static str {
    let lower = uri.to_lowercase();
    if lower.contains(".png") {
        "png"
    } else if lower.contains(".gif") {
        "gif"
    } else if lower.contains(".webp") {
        "webp"
    } else {
        "jpg"
    }
}

/// File name for the nth saved image: the first is the cover
pub fn image_file_name(ordinal: usize, uri: &str) -> String {
    let ext = image_extension(uri);
    if ordinal == 0 {
        format!("cover.{}", ext)
    } else {
        format!("image_{}.{}", ordinal, ext)
    }
}

fn saved_image_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(cover|image_[0-9]+)\.(png|gif|webp|jpg)$").expect("valid regex")
    })
}

/// Delete images named like [`image_file_name`] output that are not in `kept`.
/// Other files in the folder are left alone. Returns how many were removed.
pub fn remove_stale_images(folder: &Path, kept: &[String]) -> Result<usize, PersistError> {
    let io_error = |source: std::io::Error| PersistError::Io {
        path: folder.to_path_buf(),
        source,
    };

    let mut removed = 0;
    for entry in fs::read_dir(folder).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !saved_image_name().is_match(&name) || kept.contains(&name) {
            continue;
        }

        let path = entry.path();
        fs::remove_file(&path).map_err(|source| PersistError::Io { path, source })?;
        removed += 1;
    }
    Ok(removed)
}

impl AlbumRecord {
    pub fn from_search_result(result: &SearchResult) -> Self {
        let (artist, album) = split_title(&result.title);

        Self {
            discogs_id: result.id,
            title: result.title.clone(),
            artist,
            album,
            year: result.year.clone(),
            labels: result.label.clone(),
            catalog_number: result.catno.clone(),
            country: result.country.clone(),
            genres: result.genre.clone(),
            styles: result.style.clone(),
            formats: result.format.clone(),
            notes: String::new(),
            tracklist: Vec::new(),
            cover_image: result.cover_image.clone().filter(|uri| !uri.is_empty()),
            images: Vec::new(),
        }
    }

    /// Merge extended release metadata; base fields only fill in where blank
    pub fn apply_details(&mut self, details: ReleaseDetails) {
        self.images = details.image_uris();
        self.notes = details.notes;
        self.tracklist = details.tracklist.into_iter().map(Track::from).collect();

        if self.labels.is_empty() {
            self.labels = details
                .labels
                .iter()
                .map(|l| l.name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
        }
        if self.catalog_number.is_empty() {
            if let Some(label) = details.labels.iter().find(|l| !l.catno.is_empty()) {
                self.catalog_number = label.catno.clone();
            }
        }
        if self.genres.is_empty() {
            self.genres = details.genres;
        }
        if self.styles.is_empty() {
            self.styles = details.styles;
        }
        if self.country.is_empty() {
            self.country = details.country;
        }
        if self.year.is_empty() {
            self.year = details.year;
        }
    }

    pub fn manual(entry: ManualEntry) -> Self {
        let artist = entry.artist.trim().to_string();
        let album = entry.album.trim().to_string();

        Self {
            title: join_title(&artist, &album),
            artist,
            album,
            year: entry.year.trim().to_string(),
            labels: split_list(&entry.label),
            catalog_number: entry.catalog_number.trim().to_string(),
            country: entry.country.trim().to_string(),
            genres: split_list(&entry.genre),
            styles: split_list(&entry.style),
            notes: entry.notes.trim().to_string(),
            ..Self::default()
        }
    }

    /// Folder name: "Artist - Year - Album", each part sanitized, then the whole
    pub fn suggested_folder_name(&self) -> String {
        if self.artist.is_empty() && self.album.is_empty() {
            return sanitize_filename(&self.title);
        }

        // A part is kept when present, even if it sanitizes to nothing
        let parts: Vec<String> = [
            (&self.artist, true),
            (&self.year, false),
            (&self.album, true),
        ]
        .into_iter()
        .filter(|(part, _)| !part.is_empty())
        .map(|(part, sanitize)| {
            if sanitize {
                sanitize_filename(part)
            } else {
                part.clone()
            }
        })
        .collect();

        sanitize_filename(&parts.join(TITLE_SEPARATOR))
    }

    /// Every image URI to fetch, cover first, each exactly once
    pub fn image_uris(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.cover_image
            .iter()
            .chain(self.images.iter())
            .filter(|uri| !uri.is_empty())
            .filter(|uri| seen.insert((*uri).clone()))
            .cloned()
            .collect()
    }

    pub fn to_persisted(&self) -> PersistedAlbum {
        PersistedAlbum {
            artist: self.artist.clone(),
            album: self.album.clone(),
            year: self.year.clone(),
            label: self.labels.join(LIST_SEPARATOR),
            catalog_number: self.catalog_number.clone(),
            genre: self.genres.join(LIST_SEPARATOR),
            style: self.styles.join(LIST_SEPARATOR),
            notes: self.notes.clone(),
            discogs_id: self.discogs_id,
            country: self.country.clone(),
            tracklist: self.tracklist.clone(),
        }
    }

    /// Inverse of [`to_persisted`](Self::to_persisted). Images are not restored.
    pub fn from_persisted(record: PersistedAlbum) -> Self {
        Self {
            discogs_id: record.discogs_id,
            title: join_title(&record.artist, &record.album),
            artist: record.artist,
            album: record.album,
            year: record.year,
            labels: split_list(&record.label),
            catalog_number: record.catalog_number,
            country: record.country,
            genres: split_list(&record.genre),
            styles: split_list(&record.style),
            formats: Vec::new(),
            notes: record.notes,
            tracklist: record.tracklist,
            cover_image: None,
            images: Vec::new(),
        }
    }

    /// Multi-line summary for a details view
    pub fn details_text(&self) -> String {
        let mut text = format!(
            "Artist: {}\nAlbum: {}\nYear: {}\nLabel: {}\nCatalog Number: {}\nGenre: {}\nStyle: {}\nCountry: {}\nDiscogs ID: {}\n",
            self.artist,
            self.album,
            self.year,
            self.labels.join(LIST_SEPARATOR),
            self.catalog_number,
            self.genres.join(LIST_SEPARATOR),
            self.styles.join(LIST_SEPARATOR),
            self.country,
            self.discogs_id.map(|id| id.to_string()).unwrap_or_default(),
        );

        if !self.tracklist.is_empty() {
            text.push_str("\nTracklist:\n");
            for track in &self.tracklist {
                text.push_str(&format!("  {}. {}", track.position, track.title));
                if !track.duration.is_empty() {
                    text.push_str(&format!(" ({})", track.duration));
                }
                text.push('\n');
            }
        }

        text.push_str("\nNotes:\n");
        if self.notes.is_empty() {
            text.push_str("none");
        } else {
            text.push_str(&self.notes);
        }
        text
    }
}

/// Write `album_info.json` into `folder`
pub fn write_album_info(folder: &Path, album: &AlbumRecord) -> Result<PathBuf, PersistError> {
    let path = folder.join(ALBUM_INFO_FILE);
    let json = serde_json::to_string_pretty(&album.to_persisted()).map_err(|source| {
        PersistError::Json {
            path: path.clone(),
            source,
        }
    })?;

    fs::write(&path, json).map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Read `album_info.json` from `folder`; `Ok(None)` when the folder has none
pub fn read_album_info(folder: &Path) -> Result<Option<AlbumRecord>, PersistError> {
    let path = folder.join(ALBUM_INFO_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;
    let record: PersistedAlbum =
        serde_json::from_str(&content).map_err(|source| PersistError::Json { path, source })?;

    Ok(Some(AlbumRecord::from_persisted(record)))
}
