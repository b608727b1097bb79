use serde::Deserialize;

use super::services::SortOrder;

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub author_id: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ListQuery {
    /// A value that is not a user id means no filter.
    pub fn author_filter(&self) -> Option<u64> {
        self.author_id.as_deref().and_then(|a| a.trim().parse().ok())
    }
}
