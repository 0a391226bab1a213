use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSessionRecord {
    pub id: String,
    pub book_id: Option<String>,
    pub started_at: String,
    pub ended_at: String,
    pub duration_minutes: i64,
    pub pages_read: Option<i64>,
    pub end_page: Option<i64>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogInput {
    pub book_id: Option<String>,
    pub started_at: String,
    pub ended_at: String,
    pub pages_read: Option<i64>,
    pub end_page: Option<i64>,
    pub notes: Option<String>,
}
