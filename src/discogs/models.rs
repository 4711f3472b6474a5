use serde::{Deserialize, Deserializer, Serialize};

/// Entry in a Discogs name list: search results send bare strings, release
/// details send objects with a `name` field
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum NameEntry {
    Name(String),
    Named { name: String },
}

impl NameEntry {
    fn into_name(self) -> String {
        match self {
            NameEntry::Name(name) => name,
            NameEntry::Named { name } => name,
        }
    }
}

/// A field Discogs sends either as one value or as a list of values
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<NameEntry>),
    One(NameEntry),
}

/// Deserialize a list-or-scalar field into a list of non-empty names
fn names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    let entries = match value {
        None => Vec::new(),
        Some(OneOrMany::Many(entries)) => entries,
        Some(OneOrMany::One(entry)) => vec![entry],
    };

    Ok(entries
        .into_iter()
        .map(NameEntry::into_name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum YearValue {
    Number(i64),
    Text(String),
}

/// Year arrives as "1998" from search and as 1998 from release details; 0 means unknown
fn year<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<YearValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(YearValue::Number(n)) if n > 0 => n.to_string(),
        Some(YearValue::Text(s)) if s.trim() != "0" => s.trim().to_string(),
        _ => String::new(),
    })
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Individual search result from `/database/search`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "year")]
    pub year: String,
    #[serde(default, deserialize_with = "names")]
    pub label: Vec<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub catno: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub country: String,
    #[serde(default, deserialize_with = "names")]
    pub genre: Vec<String>,
    #[serde(default, deserialize_with = "names")]
    pub style: Vec<String>,
    #[serde(default, deserialize_with = "names")]
    pub format: Vec<String>,
    pub cover_image: Option<String>,
    pub thumb: Option<String>,
    #[serde(rename = "type", default)]
    pub result_type: Option<String>,
}

impl SearchResult {
    /// One-line description for candidate lists: "Title (Year) - Label A, Label B"
    pub fn display_line(&self) -> String {
        let labels = self
            .label
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} ({}) - {}", self.title, self.year, labels)
    }
}

/// Search response wrapper
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// Label credit in release details
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LabelCredit {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub catno: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReleaseImage {
    #[serde(rename = "type", default)]
    pub image_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub uri: String,
    pub uri150: Option<String>,
}

/// Represents a track from Discogs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscogsTrack {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub position: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub duration: String, // Duration as string from Discogs (e.g., "3:45"), blank when unknown
}

/// Extended metadata from `/releases/{id}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReleaseDetails {
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub notes: String,
    #[serde(default)]
    pub tracklist: Vec<DiscogsTrack>,
    #[serde(default)]
    pub images: Vec<ReleaseImage>,
    #[serde(default)]
    pub labels: Vec<LabelCredit>,
    #[serde(default, deserialize_with = "names")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "names")]
    pub styles: Vec<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub country: String,
    #[serde(default, deserialize_with = "year")]
    pub year: String,
}

impl ReleaseDetails {
    /// Image URIs in API order, blanks removed
    pub fn image_uris(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|img| img.uri.trim())
            .filter(|uri| !uri.is_empty())
            .map(str::to_string)
            .collect()
    }
}
