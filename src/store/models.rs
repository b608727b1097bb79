use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A short post. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    pub id: u64,
    pub body: String,
    pub author_id: u64,
}

/// User record as persisted. Use `PublicUser` for anything sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String, // argon2 PHC string
    #[serde(default)]
    pub is_chirpy_red: bool,
}

/// The whole dataset, stored as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub chirps: BTreeMap<u64, Chirp>,
    #[serde(default)]
    pub users: BTreeMap<u64, User>,
    #[serde(default)]
    pub revoked_tokens: BTreeSet<String>,
    #[serde(default)]
    last_chirp_id: u64,
    #[serde(default)]
    last_user_id: u64,
}

/// Hands out the next id from a persisted counter. Documents written before
/// the counters existed start from the largest key still present.
fn next_id<V>(last: &mut u64, records: &BTreeMap<u64, V>) -> u64 {
    let floor = records.keys().next_back().copied().unwrap_or(0);
    let id = (*last).max(floor) + 1;
    *last = id;
    id
}

impl Database {
    pub fn add_chirp(&mut self, body: String, author_id: u64) -> Chirp {
        let id = next_id(&mut self.last_chirp_id, &self.chirps);
        let chirp = Chirp { id, body, author_id };
        self.chirps.insert(id, chirp.clone());
        chirp
    }

    pub fn delete_chirp(&mut self, id: u64) -> Option<Chirp> {
        self.chirps.remove(&id)
    }

    pub fn add_user(&mut self, email: String, password_hash: String) -> User {
        let id = next_id(&mut self.last_user_id, &self.users);
        let user = User {
            id,
            email,
            password_hash,
            is_chirpy_red: false,
        };
        self.users.insert(id, user.clone());
        user
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    /// Applies whichever fields are present. Returns `None` for an unknown id.
    pub fn update_user(
        &mut self,
        id: u64,
        email: Option<String>,
        password_hash: Option<String>,
    ) -> Option<User> {
        let user = self.users.get_mut(&id)?;
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        Some(user.clone())
    }

    /// One-way upgrade; there is no operation that clears the flag.
    pub fn set_membership(&mut self, id: u64) -> Option<User> {
        let user = self.users.get_mut(&id)?;
        user.is_chirpy_red = true;
        Some(user.clone())
    }

    /// Returns `true` if the token was not already revoked.
    pub fn revoke_token(&mut self, raw: &str) -> bool {
        self.revoked_tokens.insert(raw.to_string())
    }

    pub fn is_revoked(&self, raw: &str) -> bool {
        self.revoked_tokens.contains(raw)
    }
}
