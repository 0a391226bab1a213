use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    WantToRead,
    Reading,
    Finished,
    Abandoned,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::WantToRead => "want_to_read",
            BookStatus::Reading => "reading",
            BookStatus::Finished => "finished",
            BookStatus::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BookStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "want_to_read" => Ok(BookStatus::WantToRead),
            "reading" => Ok(BookStatus::Reading),
            "finished" => Ok(BookStatus::Finished),
            "abandoned" => Ok(BookStatus::Abandoned),
            other => Err(format!("unsupported book status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookSource {
    Manual,
    Import,
}

impl BookSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookSource::Manual => "manual",
            BookSource::Import => "import",
        }
    }
}

impl TryFrom<&str> for BookSource {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "manual" => Ok(BookSource::Manual),
            "import" => Ok(BookSource::Import),
            other => Err(format!("unsupported book source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page_count: Option<i64>,
    pub current_page: i64,
    pub cover_url: Option<String>,
    pub status: BookStatus,
    pub rating: Option<i64>,
    pub source: BookSource,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreateInput {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page_count: Option<i64>,
    pub cover_url: Option<String>,
    pub status: Option<BookStatus>,
    pub rating: Option<i64>,
}

/// Metadata the host already fetched from a catalogue lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookImportInput {
    pub title: String,
    pub authors: Vec<String>,
    pub isbn: Option<String>,
    pub page_count: Option<i64>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdateInput {
    pub title: Option<String>,
    pub author: Option<Option<String>>,
    pub page_count: Option<Option<i64>>,
    pub current_page: Option<i64>,
    pub cover_url: Option<Option<String>>,
    pub status: Option<BookStatus>,
    pub rating: Option<Option<i64>>,
}
