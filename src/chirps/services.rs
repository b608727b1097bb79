use tracing::info;

use crate::{error::ApiError, state::AppState, store::Chirp};

pub const MAX_CHIRP_LEN: usize = 140;

const DENYLIST: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const MASK: &str = "****";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Masks denylisted words. Words are split on whitespace and compared
/// case-insensitively as a whole; the whitespace between them is kept as is.
pub fn clean_body(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for piece in body.split_inclusive(char::is_whitespace) {
        let word = piece.trim_end_matches(char::is_whitespace);
        let sep = &piece[word.len()..];
        let lower = word.to_lowercase();
        if DENYLIST.contains(&lower.as_str()) {
            out.push_str(MASK);
        } else {
            out.push_str(word);
        }
        out.push_str(sep);
    }
    out
}

/// Trims, length-checks and masks a chirp body.
pub fn validate_body(body: &str) -> Result<String, ApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ApiError::BadInput("Chirp is empty".into()));
    }
    if body.chars().count() > MAX_CHIRP_LEN {
        return Err(ApiError::BadInput("Chirp is too long".into()));
    }
    Ok(clean_body(body))
}

pub async fn create_chirp(state: &AppState, body: &str, author_id: u64) -> Result<Chirp, ApiError> {
    let body = validate_body(body)?;
    let chirp = state
        .store
        .with_lock(|db| Ok::<_, ApiError>(db.add_chirp(body, author_id)))
        .await?;
    info!(chirp_id = chirp.id, author_id, "chirp created");
    Ok(chirp)
}

pub async fn list_chirps(
    state: &AppState,
    author_id: Option<u64>,
    order: SortOrder,
) -> Result<Vec<Chirp>, ApiError> {
    let db = state.store.snapshot().await?;
    // BTreeMap iterates in ascending id order
    let mut chirps: Vec<Chirp> = db
        .chirps
        .into_values()
        .filter(|c| author_id.map_or(true, |a| c.author_id == a))
        .collect();
    if order == SortOrder::Desc {
        chirps.reverse();
    }
    Ok(chirps)
}

pub async fn get_chirp(state: &AppState, id: u64) -> Result<Chirp, ApiError> {
    let db = state.store.snapshot().await?;
    db.chirps
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Chirp not found".into()))
}

/// Only the author may delete. Lookup, ownership check and removal happen
/// under one lock.
pub async fn delete_chirp(state: &AppState, id: u64, requester_id: u64) -> Result<(), ApiError> {
    state
        .store
        .with_lock(|db| {
            let chirp = db
                .chirps
                .get(&id)
                .ok_or_else(|| ApiError::NotFound("Chirp not found".into()))?;
            if chirp.author_id != requester_id {
                return Err(ApiError::Forbidden("Not the author of this chirp".into()));
            }
            db.delete_chirp(id);
            Ok(())
        })
        .await?;
    info!(chirp_id = id, requester_id, "chirp deleted");
    Ok(())
}
