use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::record_id;

/// A normalized entry in a trending-item feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendItem {
    pub id: String,
    pub source_id: String,
    pub native_id: String,
    /// Position within the trend tab as reported by the source.
    pub rank: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    /// Source-specific popularity score, 0 when the source reports none.
    pub heat: i64,
    pub fetched_at: DateTime<Utc>,
}

impl TrendItem {
    pub fn new(source_id: &str, native_id: &str, rank: i64) -> Self {
        Self {
            id: record_id(source_id, native_id),
            source_id: source_id.to_string(),
            native_id: native_id.to_string(),
            rank,
            title: None,
            summary: None,
            link: None,
            heat: 0,
            fetched_at: Utc::now(),
        }
    }
}
