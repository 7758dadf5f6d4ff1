use serde::{Deserialize, Serialize};

use crate::domain::Topic;

/// A board or section listed by a source, outside the paging path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forum {
    pub native_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Group header the source files this forum under, if any.
    pub group: Option<String>,
}

/// Thread metadata fetched for a single topic, outside the paging path.
#[derive(Debug, Clone)]
pub struct ThreadDetail {
    pub topic: Topic,
    /// Highest reply page the source reports for this thread.
    pub max_page: i64,
}
